use super::commands::CommandHandler;
use super::config::ConsoleConfig;
use super::error::ConsoleError;
use super::session::Session;
use crate::aggregator::{Dispatcher, FanOutExecutor};
use crate::stats::{Flusher, Receiver};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Listens for telnet-style connections and serves each one a console
/// session over the shared dispatcher and collaborators.
pub struct ConsoleServer {
    config: Arc<ConsoleConfig>,
    handler: Arc<CommandHandler>,
}

impl ConsoleServer {
    pub fn new(
        config: ConsoleConfig,
        dispatcher: Dispatcher,
        receiver: Arc<dyn Receiver>,
        flusher: Arc<dyn Flusher>,
    ) -> Self {
        let executor = FanOutExecutor::with_result_buffer(dispatcher, config.result_buffer);
        ConsoleServer {
            config: Arc::new(config),
            handler: Arc::new(CommandHandler::new(executor, receiver, flusher)),
        }
    }

    /// Bind the configured address and serve until `shutdown` fires
    pub async fn listen_and_serve(self, shutdown: CancellationToken) -> Result<(), ConsoleError> {
        let listener = TcpListener::bind(self.config.addr()).await?;
        info!("Console listening on {}", self.config.addr());
        self.serve(listener, shutdown).await
    }

    /// Accept connections on `listener`, one session task per connection.
    ///
    /// An accept failure stops the server and is returned. Cancelling
    /// `shutdown` stops accepting and cancels every open session.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<(), ConsoleError> {
        loop {
            let (stream, peer_addr) = tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Console server shutting down");
                    return Ok(());
                }
                accepted = listener.accept() => accepted?,
            };

            debug!("Console client connected: {}", peer_addr);
            let session = Session::new(
                stream,
                self.handler.clone(),
                &self.config,
                shutdown.child_token(),
            );
            tokio::spawn(async move {
                match session.run().await {
                    Ok(()) => debug!("Console client disconnected: {}", peer_addr),
                    Err(e) if e.is_normal_termination() => {
                        debug!("Console session {} ended: {}", peer_addr, e)
                    }
                    Err(e) => info!("Problem with console connection {}: {}", peer_addr, e),
                }
            });
        }
    }
}
