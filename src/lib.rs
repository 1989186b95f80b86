//! Google Calendar MCP server.
//!
//! Exposes Google Calendar operations as MCP tools over stdio and ships an
//! interactive OAuth setup (`--setup`) that writes the token file the server
//! reads.

pub mod auth;
pub mod callback;
pub mod dispatch;
pub mod google;
pub mod server;
pub mod setup;
pub mod tools;

#[cfg(test)]
mod testing;
