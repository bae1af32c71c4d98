//! Inbound adapters that translate external requests into domain service
//! calls while keeping transport details at the edge.
//!
//! [`envelope`] holds the response shape every front end reports; [`cli`]
//! is the command-line front end used by the `research-backend` binary.

pub mod cli;
pub mod envelope;

pub use envelope::{ResponseEnvelope, status_for};
