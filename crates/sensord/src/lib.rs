//! sensord library - exposes modules for testing.

pub mod auth;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;
