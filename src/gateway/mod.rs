// Gateway module - HTTP server that fronts the upstream chat provider
//
// This module implements the client-facing HTTP layer using Axum. It
// exposes one route per dialect, extracts credentials, and wires the
// relay's dispatcher between the upstream client and the response body.

mod auth;
mod error;
mod handlers;
mod server;
mod state;

pub use error::GatewayError;
pub use server::start_gateway;
pub use state::GatewayState;
