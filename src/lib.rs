//! Resource synchronization core of the HR and payroll admin console.
//!
//! Screens load remote collections through a [`store::CollectionStore`],
//! derive their views with [`derive`], and run destructive actions through a
//! [`confirm::ConfirmationGate`] and a [`mutation::MutationCoordinator`].

pub mod config;
pub mod confirm;
pub mod derive;
pub mod error;
pub mod forms;
pub mod gateway;
pub mod model;
pub mod mutation;
pub mod screen;
pub mod session;
pub mod shell;
pub mod store;

pub use config::Config;
pub use error::{FieldError, FormError, GatewayError, MutationError, Surface};
pub use screen::{Screen, ScreenKind};
pub use session::Session;

#[cfg(test)]
#[path = "tests/fixtures.rs"]
pub(crate) mod fixtures;
