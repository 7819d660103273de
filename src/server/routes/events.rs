use crate::server::router::RegistryAppState;
use crate::sync::ChangeEvent;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use std::convert::Infallible;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::warn;

/// GET /api/events
///
/// One `change` event with data `data-updated` per notification on this session's channel.
pub async fn change_events(
    State(state): State<RegistryAppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.session.notifier().listen();
    let stream = BroadcastStream::new(rx).map(|item| {
        let event = match item {
            Ok(event) => event,
            Err(lagged) => {
                warn!(error = %lagged, "SSE listener lagged");
                ChangeEvent::DataUpdated
            }
        };
        Ok(Event::default().event("change").data(event.as_str()))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
