//! Per-connection command loop
//!
//! ```text
//! AwaitingLine ──► ParsingCommand ──► ExecutingCommand ──┐
//!      ▲                 │ blank / protocol error        │
//!      └─────────────────┴───────────────────────────────┘
//!   any state ──► Closed (EOF, I/O error, quit, cancel, idle deadline)
//! ```

use super::command::{ConsoleCommand, FAREWELL};
use super::commands::CommandHandler;
use super::config::ConsoleConfig;
use super::error::ConsoleError;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio_util::codec::{AnyDelimiterCodec, FramedRead};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct Session<S> {
    lines: FramedRead<ReadHalf<S>, AnyDelimiterCodec>,
    writer: WriteHalf<S>,
    handler: Arc<CommandHandler>,
    prompt: String,
    idle_timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    pub fn new(
        stream: S,
        handler: Arc<CommandHandler>,
        config: &ConsoleConfig,
        cancel: CancellationToken,
    ) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Session {
            lines: FramedRead::new(
                reader,
                AnyDelimiterCodec::new_with_max_length(
                    b"\n".to_vec(),
                    b"\n".to_vec(),
                    config.max_line_length,
                ),
            ),
            writer,
            handler,
            prompt: config.prompt.clone(),
            idle_timeout: config.idle_timeout(),
            cancel,
        }
    }

    /// Serve commands until the connection ends.
    ///
    /// Returns `Ok(())` on EOF. Quit, cancellation and the idle deadline come
    /// back as errors for which [`ConsoleError::is_normal_termination`] holds.
    pub async fn run(mut self) -> Result<(), ConsoleError> {
        let cancel = self.cancel.clone();
        loop {
            if cancel.is_cancelled() {
                return Err(ConsoleError::Cancelled);
            }
            write_text(&mut self.writer, &self.prompt).await?;

            let line = tokio::select! {
                _ = cancel.cancelled() => return Err(ConsoleError::Cancelled),
                line = self.next_line() => line?,
            };
            let Some(line) = line else {
                debug!("console client closed the connection");
                return Ok(());
            };

            match handle_line(&self.handler, &cancel, &line).await {
                Ok(response) => write_text(&mut self.writer, &response).await?,
                Err(e) if e.is_protocol() => {
                    write_text(&mut self.writer, &format!("error: {}\n", e)).await?
                }
                Err(ConsoleError::Quit) => {
                    write_text(&mut self.writer, FAREWELL).await?;
                    return Err(ConsoleError::Quit);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Next input line, `None` on EOF. Bytes that are not UTF-8 are
    /// replaced rather than rejected.
    async fn next_line(&mut self) -> Result<Option<String>, ConsoleError> {
        let next = match self.idle_timeout {
            Some(limit) => tokio::time::timeout(limit, self.lines.next())
                .await
                .map_err(|_| ConsoleError::DeadlineExceeded)?,
            None => self.lines.next().await,
        };
        Ok(next.transpose()?.map(|frame| decode_line(&frame)))
    }
}

fn decode_line(frame: &[u8]) -> String {
    let frame = frame.strip_suffix(b"\r").unwrap_or(frame);
    String::from_utf8_lossy(frame).into_owned()
}

async fn handle_line(
    handler: &CommandHandler,
    cancel: &CancellationToken,
    line: &str,
) -> Result<String, ConsoleError> {
    match ConsoleCommand::parse(line)? {
        Some(cmd) => {
            debug!(command = cmd.name(), "executing console command");
            handler.execute(cancel, cmd).await
        }
        None => Ok(String::new()),
    }
}

async fn write_text<W: AsyncWrite + Unpin>(writer: &mut W, text: &str) -> Result<(), ConsoleError> {
    if text.is_empty() {
        return Ok(());
    }
    writer.write_all(text.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
