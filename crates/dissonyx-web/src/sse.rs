//! Server-Sent Events activity feed.
//!
//! Each frame is named after the [`AppEvent`] kind (`paper_added`,
//! `topic_progress`, ...) and numbered per connection. A subscriber that
//! falls behind the broadcast buffer gets one `lagged` frame carrying the
//! number of dropped events instead of a silent gap.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::Stream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use crate::state::{AppEvent, SharedState};

const KEEP_ALIVE: Duration = Duration::from_secs(15);

/// GET /api/events
pub async fn sse_handler(State(state): State<SharedState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.subscribe();
    debug!(subscribers = state.event_tx.receiver_count(), "Activity feed subscriber joined");

    let mut seq = 0usize;
    let stream = BroadcastStream::new(rx).filter_map(move |item| {
        let frame = feed_frame(seq, item);
        seq += 1;
        frame.map(Ok)
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE).text("keep-alive"))
}

fn feed_frame(seq: usize, item: Result<AppEvent, BroadcastStreamRecvError>) -> Option<Event> {
    match item {
        Ok(event) => match Event::default().id(seq.to_string()).event(event.kind()).json_data(&event) {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!(error = %e, "Dropping unserialisable feed event");
                None
            }
        },
        Err(BroadcastStreamRecvError::Lagged(missed)) => {
            warn!(missed, "Activity feed subscriber lagged");
            Some(Event::default().id(seq.to_string()).event("lagged").data(missed.to_string()))
        }
    }
}
