//! Server-Sent Events (SSE) transport for realtime updates
//!
//! Same registry and wire format as the WebSocket endpoints, for clients
//! that only need to listen.

use crate::error::ApiResult;
use crate::AppState;
use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use pollwatch_common::{EventType, Topic};
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    pub topic: Option<String>,
}

fn event_name(event_type: EventType) -> &'static str {
    match event_type {
        EventType::Created => "created",
        EventType::StatusChanged => "status_changed",
    }
}

/// GET /api/events?topic=... - SSE event stream (default topic `global`)
pub async fn event_stream(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let topic: Topic = query.topic.as_deref().unwrap_or("global").parse()?;

    let mut client = state.broadcaster.connect();
    client.subscribe(topic.clone());
    debug!("New SSE client {} on {}", client.id(), topic);

    // The connection (and its registry entry) lives as long as the stream
    let stream = async_stream::stream! {
        while let Some(delivery) = client.recv().await {
            match Event::default()
                .event(event_name(delivery.event.event_type))
                .json_data(delivery.message())
            {
                Ok(event) => yield Ok(event),
                Err(e) => warn!("Failed to serialize SSE event: {}", e),
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}
