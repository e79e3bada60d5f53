//! HTTP API handlers for pollwatch-server

pub mod auth;
pub mod buildinfo;
pub mod elections;
pub mod health;
pub mod media;
pub mod sse;
pub mod submissions;
pub mod ws;

pub use buildinfo::get_build_info;
pub use health::health_routes;
pub use sse::event_stream;
