//! Core types for gcalendar-mcp.
//!
//! This crate holds everything that does not need the network:
//! - `credentials` for the persisted OAuth token record
//! - `token_store` for locating, reading and writing that record
//! - `settings` for environment-driven configuration
//! - `protocol` for the MCP JSON-RPC messages and tool descriptors

pub mod credentials;
pub mod error;
pub mod protocol;
pub mod settings;
pub mod token_store;

pub use credentials::CredentialRecord;
pub use error::{GcalError, GcalResult};
pub use settings::Settings;
pub use token_store::{TokenPaths, TokenStore};
