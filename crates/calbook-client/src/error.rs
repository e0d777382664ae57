//! Client error types.

use calbook_core::{DateRange, Event, TimeError};
use calbook_providers::ProviderError;
use thiserror::Error;

/// Errors surfaced by the calbook CLI.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("invalid time: {0}")]
    Time(#[from] TimeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A booking was refused because the range already holds events.
    #[error("{range} is not free ({} conflicting event(s)), use --force to book anyway", conflicts.len())]
    RangeBusy { range: DateRange, conflicts: Vec<Event> },
}

pub type ClientResult<T> = Result<T, ClientError>;
