//! HTTP API server for call control
//!
//! This module provides a REST API driven by the telephony transport:
//! - POST /calls/start - Create a call session
//! - POST /calls/:id/audio - Push a raw PCM frame
//! - POST /calls/:id/shutdown - Tear a call down
//! - GET /calls/:id/status - Query session stats
//! - GET /calls/:id/transcript - Get the conversation so far
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
