use super::command::{ConsoleCommand, HELP_TEXT};
use super::error::ConsoleError;
use crate::aggregator::FanOutExecutor;
use crate::stats::{Flusher, Receiver};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Executes parsed console commands against the shared collaborators.
/// One instance is shared by every session of a server.
pub struct CommandHandler {
    executor: FanOutExecutor,
    receiver: Arc<dyn Receiver>,
    flusher: Arc<dyn Flusher>,
}

impl CommandHandler {
    pub fn new(
        executor: FanOutExecutor,
        receiver: Arc<dyn Receiver>,
        flusher: Arc<dyn Flusher>,
    ) -> Self {
        CommandHandler {
            executor,
            receiver,
            flusher,
        }
    }

    /// Run `cmd` and return the text to send back.
    /// `quit` is returned as [`ConsoleError::Quit`].
    pub async fn execute(
        &self,
        cancel: &CancellationToken,
        cmd: ConsoleCommand,
    ) -> Result<String, ConsoleError> {
        match cmd {
            ConsoleCommand::Help => Ok(HELP_TEXT.to_string()),
            ConsoleCommand::Stats => Ok(self.stats()),
            ConsoleCommand::List(kind) => Ok(self.executor.collect_all(cancel, kind).await?),
            ConsoleCommand::Delete(kind, keys) => {
                let deleted = self.executor.delete_all(cancel, kind, &keys).await?;
                Ok(format!("deleted {} {}\n", deleted, kind))
            }
            ConsoleCommand::Quit => Err(ConsoleError::Quit),
        }
    }

    fn stats(&self) -> String {
        let receiver = self.receiver.stats();
        let flusher = self.flusher.stats();
        format!(
            "Invalid messages received: {}\n\
             Metrics received: {}\n\
             Packets received: {}\n\
             Last packet received: {}\n\
             Last flush to backends: {}\n\
             Last error from backends: {}\n",
            receiver.bad_lines,
            receiver.metrics_received,
            receiver.packets_received,
            format_time(receiver.last_packet),
            format_time(flusher.last_flush),
            flusher.last_flush_error.as_deref().unwrap_or("none"),
        )
    }
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    match time {
        Some(t) => t.to_rfc3339(),
        None => "never".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::Dispatcher;
    use crate::metrics::{Metric, MetricKind, TagSet};
    use crate::stats::{FlushStatsTracker, ReceiverStatsTracker};

    fn build_handler(
        dispatcher: Dispatcher,
    ) -> (
        CommandHandler,
        Arc<ReceiverStatsTracker>,
        Arc<FlushStatsTracker>,
    ) {
        let receiver = Arc::new(ReceiverStatsTracker::new());
        let flusher = Arc::new(FlushStatsTracker::new());
        let handler = CommandHandler::new(
            FanOutExecutor::new(dispatcher),
            receiver.clone(),
            flusher.clone(),
        );
        (handler, receiver, flusher)
    }

    #[tokio::test]
    async fn test_stats_before_any_traffic() {
        let (handler, _, _) = build_handler(Dispatcher::new(1));
        let out = handler
            .execute(&CancellationToken::new(), ConsoleCommand::Stats)
            .await
            .unwrap();
        assert!(out.contains("Invalid messages received: 0\n"));
        assert!(out.contains("Last packet received: never\n"));
        assert!(out.contains("Last error from backends: none\n"));
    }

    #[tokio::test]
    async fn test_stats_reflect_collaborators() {
        let (handler, receiver, flusher) = build_handler(Dispatcher::new(1));
        receiver.record_packet(4);
        receiver.record_bad_line();
        flusher.record_flush(Err("connection refused"));

        let out = handler
            .execute(&CancellationToken::new(), ConsoleCommand::Stats)
            .await
            .unwrap();
        assert!(out.contains("Invalid messages received: 1\n"));
        assert!(out.contains("Metrics received: 4\n"));
        assert!(out.contains("Packets received: 1\n"));
        assert!(!out.contains("Last packet received: never"));
        assert!(out.contains("Last error from backends: connection refused\n"));
    }

    #[tokio::test]
    async fn test_delete_response() {
        let dispatcher = Dispatcher::new(2);
        dispatcher.dispatch_to(0, Metric::set("u", TagSet::empty(), "a")).unwrap();
        dispatcher.dispatch_to(1, Metric::set("u", TagSet::empty(), "b")).unwrap();
        let (handler, _, _) = build_handler(dispatcher);

        let out = handler
            .execute(
                &CancellationToken::new(),
                ConsoleCommand::Delete(MetricKind::Set, vec!["u".to_string()]),
            )
            .await
            .unwrap();
        assert_eq!(out, "deleted 2 sets\n");
    }

    #[tokio::test]
    async fn test_quit_and_help() {
        let (handler, _, _) = build_handler(Dispatcher::new(1));
        let cancel = CancellationToken::new();
        assert!(matches!(
            handler.execute(&cancel, ConsoleCommand::Quit).await,
            Err(ConsoleError::Quit)
        ));
        assert_eq!(
            handler.execute(&cancel, ConsoleCommand::Help).await.unwrap(),
            HELP_TEXT
        );
    }
}
