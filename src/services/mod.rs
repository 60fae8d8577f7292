/// Discussion lifecycle, roster and phase progression logic.
pub mod discussion_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Session registration and token lookup.
pub mod identity_service;
/// Message posting, listing and like handling.
pub mod message_service;
/// Per-discussion deadline scheduling.
pub mod phase_timer;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Storage connection supervisor with reconnection.
pub mod storage_supervisor;
/// Final vote collection and tallying.
pub mod vote_service;
