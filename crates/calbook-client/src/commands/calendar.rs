//! Calendar commands: free, events, book, release, upcoming.

use std::io::Write;

use calbook_core::{DateRange, event_line};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::agenda::{Agenda, BookingPolicy};
use crate::cli::{Command, RangeArgs};
use crate::config::ClientConfig;
use crate::error::ClientResult;

/// A calendar command with its arguments parsed.
#[derive(Debug, Clone, PartialEq)]
pub enum CalendarCommand {
    Free(DateRange),
    Events(DateRange),
    Book {
        summary: String,
        range: DateRange,
        force: bool,
    },
    Release(DateRange),
    Upcoming(usize),
}

/// How a calendar command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    /// `free` found events in the range.
    Busy,
}

impl CalendarCommand {
    /// Validates `config` and parses `command` in the configured timezone.
    ///
    /// Returns the command with the timezone the agenda should use, or
    /// `None` for subcommands that do not touch the calendar.
    pub fn prepare(command: Command, config: &ClientConfig) -> ClientResult<Option<(Self, Tz)>> {
        config.validate()?;
        let timezone = config.calendar.tz()?;
        Ok(Self::from_cli(command, &timezone)?.map(|parsed| (parsed, timezone)))
    }

    /// Parses the time arguments of a calendar subcommand.
    ///
    /// Returns `None` for subcommands that do not touch the calendar.
    pub fn from_cli(command: Command, tz: &Tz) -> ClientResult<Option<Self>> {
        let parsed = match command {
            Command::Free { range } => Self::Free(parse_range(&range, tz)?),
            Command::Events { range } => Self::Events(parse_range(&range, tz)?),
            Command::Book {
                summary,
                range,
                force,
            } => Self::Book {
                summary,
                range: parse_range(&range, tz)?,
                force,
            },
            Command::Release { range } => Self::Release(parse_range(&range, tz)?),
            Command::Upcoming { count } => Self::Upcoming(count),
            Command::Auth { .. } | Command::Config { .. } => return Ok(None),
        };
        Ok(Some(parsed))
    }

    /// Runs the command against `agenda`, writing its output to `out`.
    pub async fn run<W: Write>(
        self,
        agenda: &Agenda<'_>,
        now: DateTime<Utc>,
        out: &mut W,
    ) -> ClientResult<Outcome> {
        match self {
            Self::Free(range) => {
                if !free(agenda, &range, out).await? {
                    return Ok(Outcome::Busy);
                }
            }
            Self::Events(range) => events(agenda, &range, out).await?,
            Self::Book {
                summary,
                range,
                force,
            } => book(agenda, &summary, &range, force, out).await?,
            Self::Release(range) => release(agenda, &range, out).await?,
            Self::Upcoming(count) => upcoming(agenda, count, now, out).await?,
        }
        Ok(Outcome::Done)
    }
}

/// Parses the range arguments as local times in `tz`.
pub fn parse_range(args: &RangeArgs, tz: &Tz) -> ClientResult<DateRange> {
    Ok(DateRange::parse(&args.start, &args.end, tz)?)
}

/// Prints `free` or `busy (N events)` and returns whether the range is free.
pub async fn free<W: Write>(agenda: &Agenda<'_>, range: &DateRange, out: &mut W) -> ClientResult<bool> {
    let conflicts = agenda.conflicts(range).await?;
    if conflicts.is_empty() {
        writeln!(out, "free")?;
        return Ok(true);
    }

    let noun = if conflicts.len() == 1 { "event" } else { "events" };
    writeln!(out, "busy ({} {})", conflicts.len(), noun)?;
    Ok(false)
}

/// Lists the events in a range.
pub async fn events<W: Write>(agenda: &Agenda<'_>, range: &DateRange, out: &mut W) -> ClientResult<()> {
    agenda.write_events(range, out).await
}

/// Books an event and prints what was created.
pub async fn book<W: Write>(
    agenda: &Agenda<'_>,
    summary: &str,
    range: &DateRange,
    force: bool,
    out: &mut W,
) -> ClientResult<()> {
    let policy = if force {
        BookingPolicy::Unchecked
    } else {
        BookingPolicy::RequireFree
    };

    let event = agenda.book(summary, range, policy).await?;
    writeln!(out, "Event created: {}", event_line(&event))?;
    if let Some(ref link) = event.html_link {
        writeln!(out, "{}", link)?;
    }
    Ok(())
}

/// Deletes the events inside a range and reports what was left alone.
pub async fn release<W: Write>(agenda: &Agenda<'_>, range: &DateRange, out: &mut W) -> ClientResult<()> {
    let release = agenda.release(range).await?;

    if release.deleted.is_empty() && release.kept.is_empty() {
        writeln!(out, "{}", calbook_core::format::NO_EVENTS_IN_RANGE_TEXT)?;
        return Ok(());
    }
    for event in &release.deleted {
        writeln!(out, "Deleted: {}", event_line(event))?;
    }
    for event in &release.kept {
        writeln!(out, "Kept: {}", event_line(event))?;
    }
    Ok(())
}

/// Lists the next `count` events from `now`.
pub async fn upcoming<W: Write>(
    agenda: &Agenda<'_>,
    count: usize,
    now: DateTime<Utc>,
    out: &mut W,
) -> ClientResult<()> {
    agenda.write_upcoming(count, now, out).await
}
