use crate::aggregator::DispatchError;
use tokio_util::codec::AnyDelimiterCodecError;

/// Everything that can end or interrupt a console command
#[derive(Debug)]
pub enum ConsoleError {
    /// Connection or listener I/O failure
    Io(std::io::Error),
    /// Input line exceeded the configured maximum length
    LineTooLong,
    /// A shard could not be reached
    Dispatch(DispatchError),
    /// First token did not name a command
    UnknownCommand(String),
    /// Command exists but its arguments are wrong
    InvalidArguments {
        command: &'static str,
        reason: &'static str,
    },
    /// Client asked to end the session
    Quit,
    /// Session or server cancellation
    Cancelled,
    /// Session was idle past its deadline
    DeadlineExceeded,
}

impl ConsoleError {
    /// Errors that are reported to the client while the session continues
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            ConsoleError::UnknownCommand(_) | ConsoleError::InvalidArguments { .. }
        )
    }

    /// Endings that are not failures and must not be logged as such
    pub fn is_normal_termination(&self) -> bool {
        matches!(
            self,
            ConsoleError::Quit | ConsoleError::Cancelled | ConsoleError::DeadlineExceeded
        )
    }
}

impl std::fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsoleError::Io(e) => write!(f, "I/O error: {}", e),
            ConsoleError::LineTooLong => write!(f, "line too long"),
            ConsoleError::Dispatch(e) => write!(f, "dispatch failed: {}", e),
            ConsoleError::UnknownCommand(name) => write!(f, "unknown command {:?}", name),
            ConsoleError::InvalidArguments { command, reason } => {
                write!(f, "{}: {}", command, reason)
            }
            ConsoleError::Quit => write!(f, "client quit"),
            ConsoleError::Cancelled => write!(f, "session cancelled"),
            ConsoleError::DeadlineExceeded => write!(f, "session idle deadline exceeded"),
        }
    }
}

impl std::error::Error for ConsoleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConsoleError::Io(e) => Some(e),
            ConsoleError::Dispatch(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConsoleError {
    fn from(e: std::io::Error) -> Self {
        ConsoleError::Io(e)
    }
}

impl From<DispatchError> for ConsoleError {
    fn from(e: DispatchError) -> Self {
        ConsoleError::Dispatch(e)
    }
}

impl From<AnyDelimiterCodecError> for ConsoleError {
    fn from(e: AnyDelimiterCodecError) -> Self {
        match e {
            AnyDelimiterCodecError::MaxChunkLengthExceeded => ConsoleError::LineTooLong,
            AnyDelimiterCodecError::Io(e) => ConsoleError::Io(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(ConsoleError::UnknownCommand("x".into()).is_protocol());
        assert!(!ConsoleError::UnknownCommand("x".into()).is_normal_termination());
        assert!(ConsoleError::Quit.is_normal_termination());
        assert!(ConsoleError::Cancelled.is_normal_termination());
        assert!(ConsoleError::DeadlineExceeded.is_normal_termination());

        let io = ConsoleError::from(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert!(!io.is_protocol());
        assert!(!io.is_normal_termination());
    }

    #[test]
    fn test_codec_errors_map() {
        assert!(matches!(
            ConsoleError::from(AnyDelimiterCodecError::MaxChunkLengthExceeded),
            ConsoleError::LineTooLong
        ));
    }

    #[test]
    fn test_display() {
        let err = ConsoleError::InvalidArguments {
            command: "delcounters",
            reason: "expected at least one key",
        };
        assert_eq!(err.to_string(), "delcounters: expected at least one key");
        assert_eq!(
            ConsoleError::UnknownCommand("frob".into()).to_string(),
            "unknown command \"frob\""
        );
    }
}
