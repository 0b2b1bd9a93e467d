//! First-success gate - one pull decides HTTP error vs streaming response
//!
//! An upstream failure is only mappable to an HTTP status while no response
//! bytes have been committed. The gate pulls exactly one element from the
//! upstream event sequence before anyone promises the client a stream:
//!
//! - the pull yields an element: streaming is on, and the caller gets the
//!   element back together with the untouched remainder of the sequence;
//! - the pull yields an error: the caller still holds a plain error it can
//!   turn into a synchronous HTTP response;
//! - the sequence is empty: the caller decides (parley answers with an
//!   empty body).
//!
//! Nothing beyond that single element is buffered, nothing is re-pulled,
//! and errors after the first successful pull are out of the gate's hands -
//! they travel down the returned remainder.

use std::pin::Pin;

use futures::{Stream, StreamExt};

/// Outcome of pulling the first element of an upstream sequence
pub enum FirstPull<T, E, S> {
    /// First pull succeeded: the element, plus the rest of the sequence
    Ok(T, S),
    /// The sequence ended before producing anything
    Empty,
    /// The very first pull failed
    Err(E),
}

/// Pull one element from `source` and classify the outcome.
///
/// The returned remainder is the same cursor the pull advanced; chaining the
/// first element back in front of it reproduces the original sequence
/// exactly (no drops, no duplicates, no second evaluation).
pub async fn split_first<S, T, E>(source: S) -> FirstPull<T, E, Pin<Box<S>>>
where
    S: Stream<Item = Result<T, E>>,
{
    let mut source = Box::pin(source);
    match source.next().await {
        None => FirstPull::Empty,
        Some(Err(err)) => FirstPull::Err(err),
        Some(Ok(first)) => FirstPull::Ok(first, source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_gate_preserves_every_element() {
        let source = stream::iter(vec![Ok::<_, String>(1), Ok(2), Ok(3)]);

        let FirstPull::Ok(first, rest) = split_first(source).await else {
            panic!("expected a successful first pull");
        };

        let mut seen = vec![first];
        seen.extend(
            rest.collect::<Vec<_>>()
                .await
                .into_iter()
                .map(Result::unwrap),
        );
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_gate_pulls_the_source_exactly_once() {
        let pulls = Arc::new(AtomicUsize::new(0));
        let counter = pulls.clone();
        let source = stream::iter(0..3).map(move |n| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(n)
        });

        let FirstPull::Ok(first, rest) = split_first(source).await else {
            panic!("expected a successful first pull");
        };

        // Only the first element has been evaluated so far
        assert_eq!(first, 0);
        assert_eq!(pulls.load(Ordering::SeqCst), 1);

        // Draining the remainder evaluates each remaining element once
        let remaining: Vec<_> = rest.collect().await;
        assert_eq!(remaining.len(), 2);
        assert_eq!(pulls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gate_classifies_first_pull_failure() {
        let source = stream::iter(vec![Err::<i32, _>("denied".to_string()), Ok(1)]);

        match split_first(source).await {
            FirstPull::Err(err) => assert_eq!(err, "denied"),
            _ => panic!("expected the error branch"),
        }
    }

    #[tokio::test]
    async fn test_gate_reports_empty_sequences() {
        let source = stream::iter(Vec::<Result<i32, String>>::new());

        assert!(matches!(split_first(source).await, FirstPull::Empty));
    }

    #[tokio::test]
    async fn test_errors_after_first_pull_stay_in_the_remainder() {
        let source = stream::iter(vec![Ok::<_, String>(1), Err("late".to_string())]);

        let FirstPull::Ok(first, rest) = split_first(source).await else {
            panic!("expected a successful first pull");
        };

        assert_eq!(first, 1);
        let remaining: Vec<_> = rest.collect().await;
        assert_eq!(remaining, vec![Err("late".to_string())]);
    }
}
