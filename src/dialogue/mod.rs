//! Dialogue backend access
//!
//! `DialogueClient` owns the per-call session token; `DialogueTransport` is
//! the wire seam, implemented over HTTP by `HttpDialogueTransport`.

mod client;
pub mod messages;
mod transport;

pub use client::DialogueClient;
pub use messages::{GenericItem, MessageRequest, MessageResponse, SessionResponse};
pub use transport::{DialogueTransport, HttpDialogueTransport};
