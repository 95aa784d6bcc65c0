// ABOUTME: Root library module exposing the builtin commands and console gateway.
// ABOUTME: Re-exports the platform-agnostic runtime from warble-core.

pub mod builtin;
pub mod console;

// Re-export the runtime core
pub use warble_core::config;
pub use warble_core::continuation;
pub use warble_core::dispatcher;
pub use warble_core::errors;
pub use warble_core::events;
pub use warble_core::presence;
pub use warble_core::roster;
pub use warble_core::router;
pub use warble_core::testing;
pub use warble_core::traits;

pub use warble_core::{BotConfig, Dispatcher};
