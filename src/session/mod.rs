//! Call session management
//!
//! This module provides the `CallSession` abstraction that manages:
//! - Audio ingress from the call transport
//! - The turn controller lifecycle (idle, running, stopped)
//! - Outbound audio hand-off to the transport
//! - Conversation transcript and session statistics

mod config;
mod session;
mod stats;

pub use config::SessionConfig;
pub use session::{CallSession, SessionComponents};
pub use stats::{SessionStats, TranscriptEntry};
