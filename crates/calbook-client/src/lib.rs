//! Command-line client for checking, booking and releasing calendar time.
//!
//! This crate provides the `calbook` binary. [`Agenda`] holds the calendar
//! operations; the `commands` module renders them for the terminal.

pub mod agenda;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use agenda::{Agenda, BookingPolicy, Release};
pub use cli::Cli;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
