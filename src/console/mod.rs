//! Operator console
//!
//! A line-oriented TCP interface for inspecting and editing live aggregator
//! state. Each connection gets its own [`Session`]; every command that
//! touches metrics goes through the [`FanOutExecutor`](crate::aggregator::FanOutExecutor)
//! so ingestion keeps running while the console works.

mod command;
mod commands;
mod config;
mod error;
mod server;
mod session;

pub use command::{ConsoleCommand, FAREWELL, HELP_TEXT};
pub use commands::CommandHandler;
pub use config::{ConfigError, ConsoleConfig, DEFAULT_CONSOLE_ADDR, DEFAULT_PROMPT};
pub use error::ConsoleError;
pub use server::ConsoleServer;
pub use session::Session;
