//! Identity provider settings (data), the error-code table, and failure classification
//! (behavior).
//!
//! `settings` exposes [`AadSettings`], the immutable endpoint/scope/transport configuration
//! built once at startup and injected into the broker. `error_table` holds the verbatim
//! provider error-code table. `strategy` defines [`ProviderStrategy`], the hook flows use to
//! decorate token requests and turn failed attempts into user-facing messages.

pub mod error_table;
pub mod settings;
pub mod strategy;

pub use error_table::*;
pub use settings::*;
pub use strategy::*;
