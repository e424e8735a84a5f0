/// Automatic phase advancement for the daily cycle.
pub mod cycle_engine;
/// Participation operations against today's cycle.
pub mod cycle_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Per-user movie library operations and shared-pool reads.
pub mod library_service;
/// Viewing schedule calculation.
pub mod schedule;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Storage connection supervision with degraded-mode handling.
pub mod storage_supervisor;
/// Ranked-choice winner calculation.
pub mod winner;
