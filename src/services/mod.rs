//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! `reply` turns one user message into one reply and knows nothing about
//! sessions. `chat` drives the session state machine in `AppState` and calls
//! `reply` for each accepted submit.

pub mod chat;
pub mod reply;
