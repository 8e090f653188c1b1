//! olcli - Overleaf from the command line
//!
//! Logs in to an Overleaf-compatible service, lists projects and documents,
//! compiles on the server with a local result cache, and downloads outputs.

pub mod auth;
pub mod cli;
pub mod client;
pub mod compile;
pub mod config;
pub mod download;
pub mod error;
pub mod projects;
pub mod session;
pub mod storage;
pub mod ui;

pub use error::{OlError, OlResult};
