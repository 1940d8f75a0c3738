#![allow(dead_code)]

pub use procstream_test_utils::builders;
pub use procstream_test_utils::{eventually, init_tracing, with_timeout};

use futures::{Stream, StreamExt};
use procstream::exec::{EventItem, OutputEvent};
use procstream::errors::ProcessError;

/// Drain a stream into its output events and terminal error, if any.
pub async fn drain<S>(stream: S) -> (Vec<OutputEvent>, Option<ProcessError>)
where
    S: Stream<Item = EventItem>,
{
    let mut stream = std::pin::pin!(stream);
    let mut events = Vec::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(event) => events.push(event),
            Err(err) => return (events, Some(err)),
        }
    }
    (events, None)
}

/// Concatenated text of `events`.
pub fn text(events: &[OutputEvent]) -> String {
    events.iter().map(|e| e.text.as_str()).collect()
}
