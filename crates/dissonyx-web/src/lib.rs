//! dissonyx-web: HTTP and websocket front end.
//!   - `/ws` submission channel streaming conflict events back to the client
//!   - `/api/events` server-sent activity feed across all sessions
//!   - read-only graph API and Turtle export

pub mod router;
pub mod handlers;
pub mod state;
pub mod sse;
pub mod ws;
