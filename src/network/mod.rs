//! Network Module
//!
//! HTTP server and request handling.
//!
//! ## Architecture
//! - Single non-blocking acceptor loop
//! - One thread per connection, bounded by `max_connections`
//! - Every request goes through the shared `Engine` handle

mod server;
mod connection;
pub mod handlers;

pub use server::Server;
pub use connection::Connection;
