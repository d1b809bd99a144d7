//! Backend access: server profiles, CSRF lifecycle, authenticated client
//!
//! One [`BackendClient`] is live at a time, bound to exactly one
//! [`ServerProfile`]. A profile switch destroys and rebuilds the client
//! rather than mutating it; in-flight calls keep the snapshot they captured
//! at call time.

mod client;
mod csrf;
mod profile;

pub use client::{BackendClient, RequestTrace, redact_header_value};
pub use csrf::{CSRF_FETCH_SENTINEL, CSRF_HEADER, CsrfState, CsrfTokenManager};
pub use profile::{ServerProfile, ServerProfileStore};
