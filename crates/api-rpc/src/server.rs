//! JSON-RPC Server
//!
//! Serves HTTP and WebSocket on one TCP port bound to localhost.

use crate::handler::RpcHandler;
use crate::types::{EnrollRequest, QueueRequest};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::{ErrorObjectOwned, Params};
use jsonrpsee::RpcModule;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9528;

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, handler: RpcHandler) -> Self {
        Self {
            config,
            handler: Arc::new(handler),
        }
    }

    /// Start the JSON-RPC server
    ///
    /// Returns the bound address (useful with port 0) and the server handle.
    pub async fn start(self) -> Result<(SocketAddr, ServerHandle), String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        info!(
            host = %self.config.host,
            port = %self.config.port,
            "Starting JSON-RPC server"
        );

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| format!("Failed to build server on {}: {}", addr, e))?;
        let local_addr = server
            .local_addr()
            .map_err(|e| format!("Failed to read bound address: {}", e))?;

        let module = build_module(self.handler)?;

        info!(addr = %local_addr, "JSON-RPC server started successfully");

        let handle = server.start(module);
        Ok((local_addr, handle))
    }
}

/// Register every queue method on a fresh module
pub fn build_module(handler: Arc<RpcHandler>) -> Result<RpcModule<()>, String> {
    let mut module = RpcModule::new(());

    let h = handler.clone();
    module
        .register_async_method("queue.enroll.v1", move |params, _, _| {
            let handler = h.clone();
            async move {
                let req: EnrollRequest = params.parse()?;
                handler.enroll(req).await
            }
        })
        .map_err(|e| e.to_string())?;

    let h = handler.clone();
    module
        .register_async_method("queue.advance.v1", move |params, _, _| {
            let handler = h.clone();
            async move {
                let req: QueueRequest = parse_queue_request(params)?;
                handler.advance(req).await
            }
        })
        .map_err(|e| e.to_string())?;

    let h = handler.clone();
    module
        .register_async_method("queue.view.v1", move |params, _, _| {
            let handler = h.clone();
            async move {
                let req: QueueRequest = parse_queue_request(params)?;
                handler.view(req).await
            }
        })
        .map_err(|e| e.to_string())?;

    let h = handler;
    module
        .register_subscription(
            "queue.watch.v1",
            "queue.view.changed",
            "queue.unwatch.v1",
            move |params, pending, _, _| {
                let handler = h.clone();
                async move {
                    match parse_queue_request(params) {
                        Ok(req) => handler.watch(req, pending).await,
                        Err(err) => {
                            pending.reject(err).await;
                            Ok(())
                        }
                    }
                }
            },
        )
        .map_err(|e| e.to_string())?;

    Ok(module)
}

/// Missing params select the default queue
fn parse_queue_request(params: Params<'static>) -> Result<QueueRequest, ErrorObjectOwned> {
    Ok(params.parse::<Option<QueueRequest>>()?.unwrap_or_default())
}
