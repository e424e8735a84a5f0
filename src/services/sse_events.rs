use serde::Serialize;
use tracing::warn;

use crate::{
    dao::models::CycleEntity,
    dto::sse::{CycleUpdatedEvent, ServerEvent, StatusChangedEvent, SystemStatus},
    state::SharedState,
};

const EVENT_CYCLE_UPDATED: &str = "cycle.updated";
const EVENT_STATUS_CHANGED: &str = "status_changed";
const EVENT_SYSTEM_STATUS: &str = "system_status";

/// Broadcast the full cycle snapshot after an observed change.
pub fn broadcast_cycle_updated(state: &SharedState, cycle: &CycleEntity) {
    let payload = CycleUpdatedEvent(cycle.clone().into());
    send_public_event(state, EVENT_CYCLE_UPDATED, &payload);
    send_operator_event(state, EVENT_CYCLE_UPDATED, &payload);
}

/// Broadcast a phase change, carrying the winner once revealed.
pub fn broadcast_status_changed(state: &SharedState, cycle: &CycleEntity) {
    let payload = StatusChangedEvent {
        status: cycle.current_status,
        winning_movie: cycle.winning_movie.map(Into::into),
    };
    send_public_event(state, EVENT_STATUS_CHANGED, &payload);
    send_operator_event(state, EVENT_STATUS_CHANGED, &payload);
}

/// Broadcast that the backend entered or left degraded mode.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    let payload = SystemStatus { degraded };
    send_public_event(state, EVENT_SYSTEM_STATUS, &payload);
    send_operator_event(state, EVENT_SYSTEM_STATUS, &payload);
}

fn send_public_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.public_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize public SSE payload"),
    }
}

fn send_operator_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.operator_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize operator SSE payload"),
    }
}
