// Startup module - displays banner and module loading status
//
// This module provides a professional startup experience showing:
// - Version info and branding
// - Configuration loaded from file
// - Module status with checkmarks

use crate::config::{Config, VERSION};
use crate::relay::MidStreamPolicy;

/// ANSI color codes for terminal output
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GREEN: &str = "\x1b[32m";
    pub const MAGENTA: &str = "\x1b[35m";
}

/// Module loading result for display
pub struct ModuleStatus {
    pub name: &'static str,
    pub enabled: bool,
    pub description: &'static str,
}

/// Print the startup banner and module status
pub fn print_startup(config: &Config) {
    use colors::*;

    // Banner
    println!();
    println!("  {BOLD}{CYAN}Parley{RESET} {DIM}v{VERSION}{RESET}");
    println!("  {DIM}Chat completion gateway{RESET}");
    println!();

    // Config file status
    if let Some(path) = Config::config_path() {
        if path.exists() {
            println!("  {DIM}Config:{RESET} {GREEN}+{RESET} {}", path.display());
        } else {
            println!("  {DIM}Config:{RESET} {DIM}(using defaults){RESET}");
        }
    }
    println!();

    // Module status
    println!("  {DIM}Loading modules...{RESET}");

    let modules = get_module_status(config);
    for module in &modules {
        print_module_status(module);
    }

    println!();

    // Gateway info
    println!(
        "  {MAGENTA}>{RESET} Gateway listening on {BOLD}{}{RESET}",
        config.bind_addr
    );
    println!(
        "  {MAGENTA}>{RESET} Upstream {BOLD}{}{RESET}",
        config.api_url
    );
    println!();
}

/// Get status of all modules based on config
fn get_module_status(config: &Config) -> Vec<ModuleStatus> {
    vec![
        ModuleStatus {
            name: "gateway",
            enabled: true, // Core, always on
            description: "HTTP chat routes",
        },
        ModuleStatus {
            name: "relay",
            enabled: true, // Core, always on
            description: match config.mid_stream_failure {
                MidStreamPolicy::SynthesizeAndClose => "Stream dispatch (synthesize on failure)",
                MidStreamPolicy::Raise => "Stream dispatch (raise on failure)",
            },
        },
        ModuleStatus {
            name: "precheck",
            enabled: config.precheck_api_key,
            description: "Credential precheck",
        },
        ModuleStatus {
            name: "blocked-4xx",
            enabled: config.raise_4xx_when_blocked,
            description: "HTTP 400 on content-filter blocks",
        },
        ModuleStatus {
            name: "file-log",
            enabled: config.logging.file_enabled,
            description: "JSON file logging",
        },
    ]
}

/// Print a single module's status
fn print_module_status(module: &ModuleStatus) {
    use colors::*;

    let (icon, style) = if module.enabled {
        (format!("{GREEN}+{RESET}"), "")
    } else {
        (format!("{DIM}o{RESET}"), DIM)
    };

    println!(
        "    {icon} {style}{:<12}{RESET} {DIM}{}{RESET}",
        module.name, module.description
    );
}

/// Mirror the startup status into the log stream
pub fn log_startup(config: &Config) {
    tracing::info!("PARLEY v{}", VERSION);

    let modules = get_module_status(config);
    for module in &modules {
        let icon = if module.enabled { "+" } else { "o" };
        tracing::info!("  {} {} - {}", icon, module.name, module.description);
    }

    tracing::info!("> Listening on {}", config.bind_addr);
    tracing::info!("Ready. Waiting for chat traffic...");
}
