use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dto::cycle::{CycleSnapshot, WinnerSummary},
    state::state_machine::CycleStatus,
};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    /// Optional event name; unnamed events arrive as plain messages.
    pub event: Option<String>,
    /// Serialized data field.
    pub data: String,
}

impl ServerEvent {
    /// Build an event from an already serialized data field.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Identifier of the SSE stream (`public` or `operator`).
    pub stream: String,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the backend is running without a storage backend connection.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Token grant sent to the single operator stream on connect.
pub struct OperatorHandshake {
    /// Token identifying the active operator connection.
    pub token: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    /// Current degraded flag.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast with the full cycle document every time it changes.
pub struct CycleUpdatedEvent(pub CycleSnapshot);

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast whenever the cycle phase advances.
pub struct StatusChangedEvent {
    /// New status.
    pub status: CycleStatus,
    /// Winner, carried once the status reaches reveal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winning_movie: Option<WinnerSummary>,
}
