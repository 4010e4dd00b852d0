//! Viva daemon library - exposes modules for testing.

pub mod config;
pub mod document;
pub mod examiner;
pub mod routes;
pub mod server;
pub mod session;
