//! Console command table
//!
//! A line is split on whitespace; the first token names the command and the
//! rest are its arguments.

use super::error::ConsoleError;
use crate::metrics::MetricKind;

pub const HELP_TEXT: &str = "Commands: help, stats, counters, timers, gauges, sets, \
delcounters, deltimers, delgauges, delsets, quit\n";

pub const FAREWELL: &str = "goodbye\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Help,
    Stats,
    /// Dump every metric of one kind across all shards
    List(MetricKind),
    /// Delete metrics of one kind by name across all shards
    Delete(MetricKind, Vec<String>),
    Quit,
}

impl ConsoleCommand {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<ConsoleCommand>, ConsoleError> {
        let mut tokens = line.split_whitespace();
        let Some(name) = tokens.next() else {
            return Ok(None);
        };
        let args: Vec<String> = tokens.map(str::to_string).collect();

        let cmd = match name {
            "help" => ConsoleCommand::Help,
            "stats" => ConsoleCommand::Stats,
            "quit" => ConsoleCommand::Quit,
            _ => {
                if let Some(kind) = MetricKind::from_plural(name) {
                    ConsoleCommand::List(kind)
                } else if let Some(kind) =
                    name.strip_prefix("del").and_then(MetricKind::from_plural)
                {
                    if args.is_empty() {
                        return Err(ConsoleError::InvalidArguments {
                            command: delete_command_name(kind),
                            reason: "expected at least one metric name",
                        });
                    }
                    return Ok(Some(ConsoleCommand::Delete(kind, args)));
                } else {
                    return Err(ConsoleError::UnknownCommand(name.to_string()));
                }
            }
        };

        if !args.is_empty() {
            return Err(ConsoleError::InvalidArguments {
                command: cmd.name(),
                reason: "takes no arguments",
            });
        }
        Ok(Some(cmd))
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConsoleCommand::Help => "help",
            ConsoleCommand::Stats => "stats",
            ConsoleCommand::List(kind) => kind.plural(),
            ConsoleCommand::Delete(kind, _) => delete_command_name(*kind),
            ConsoleCommand::Quit => "quit",
        }
    }
}

fn delete_command_name(kind: MetricKind) -> &'static str {
    match kind {
        MetricKind::Counter => "delcounters",
        MetricKind::Timer => "deltimers",
        MetricKind::Gauge => "delgauges",
        MetricKind::Set => "delsets",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Option<ConsoleCommand> {
        ConsoleCommand::parse(line).unwrap()
    }

    #[test]
    fn test_blank_lines() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("   \t "), None);
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse("help"), Some(ConsoleCommand::Help));
        assert_eq!(parse("  stats  "), Some(ConsoleCommand::Stats));
        assert_eq!(parse("quit"), Some(ConsoleCommand::Quit));
        assert_eq!(parse("gauges"), Some(ConsoleCommand::List(MetricKind::Gauge)));
        assert_eq!(parse("sets"), Some(ConsoleCommand::List(MetricKind::Set)));
    }

    #[test]
    fn test_delete_commands() {
        assert_eq!(
            parse("delcounters a b  a"),
            Some(ConsoleCommand::Delete(
                MetricKind::Counter,
                vec!["a".to_string(), "b".to_string(), "a".to_string()]
            ))
        );
        assert_eq!(
            parse("deltimers t").map(|c| c.name()),
            Some("deltimers")
        );

        let err = ConsoleCommand::parse("delsets").unwrap_err();
        assert!(err.is_protocol());
        assert_eq!(err.to_string(), "delsets: expected at least one metric name");
    }

    #[test]
    fn test_unknown_and_malformed() {
        assert!(matches!(
            ConsoleCommand::parse("frobnicate now"),
            Err(ConsoleError::UnknownCommand(name)) if name == "frobnicate"
        ));
        assert!(matches!(
            ConsoleCommand::parse("delwidgets x"),
            Err(ConsoleError::UnknownCommand(_))
        ));
        assert!(matches!(
            ConsoleCommand::parse("counters extra"),
            Err(ConsoleError::InvalidArguments { command: "counters", .. })
        ));
        // Command names are case sensitive
        assert!(ConsoleCommand::parse("HELP").is_err());
    }
}
