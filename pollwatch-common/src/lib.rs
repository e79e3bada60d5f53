//! # PollWatch Common Library
//!
//! Shared code for the PollWatch election-monitoring service:
//! - Database initialization and schema
//! - Domain models (submissions, verifications, media, live streams, actors)
//! - Realtime event and topic types
//! - Configuration loading
//! - Time helpers

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod models;
pub mod time;

pub use error::{Error, Result};
pub use events::{EventType, RealtimeEvent, Topic};
