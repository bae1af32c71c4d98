//! Research content backend core.
//!
//! Hexagonal layout: [`domain`] holds entities, services and the ports they
//! depend on; [`outbound`] implements those ports; [`inbound`] turns external
//! requests into service calls; [`app`] wires everything from [`settings`].

pub mod app;
pub mod domain;
pub mod inbound;
pub mod outbound;
pub mod settings;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use app::{Backend, BootstrapError, Storage};
