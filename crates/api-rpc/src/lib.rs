//! JSON-RPC API Layer
//!
//! Exposes the queue operations over JSON-RPC 2.0 (HTTP and WebSocket on the
//! same localhost port). The watch subscription needs WebSocket.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use handler::RpcHandler;
pub use server::{RpcServer, RpcServerConfig};
