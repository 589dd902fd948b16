/// OpenAPI documentation generation.
pub mod documentation;
/// Live game flow on top of the session registry.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Room creation, lookup, joins and deletion.
pub mod room_service;
/// Room event forwarding onto SSE channels.
pub mod sse_events;
/// Server-Sent Events streaming service.
pub mod sse_service;
