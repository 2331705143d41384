use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::Min;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    NotFound(Ulid),
    AlreadyExists(Ulid),
    Conflict(Ulid),
    InvalidSpan { start: Min, end: Min },
    InvalidClock(String),
    InvalidSlotDuration(Min),
    OutOfRange(NaiveDate),
    Forbidden(&'static str),
    InvalidMutation(&'static str),
    LimitExceeded(&'static str),
    Source(String),
    JournalError(String),
    Config(String),
}

impl std::fmt::Display for CalendarError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalendarError::NotFound(id) => write!(f, "not found: {id}"),
            CalendarError::AlreadyExists(id) => write!(f, "already exists: {id}"),
            CalendarError::Conflict(id) => write!(f, "conflict with event: {id}"),
            CalendarError::InvalidSpan { start, end } => {
                write!(f, "invalid interval [{start}, {end})")
            }
            CalendarError::InvalidClock(s) => write!(f, "invalid time of day: {s:?}"),
            CalendarError::InvalidSlotDuration(d) => write!(f, "invalid slot duration: {d} min"),
            CalendarError::OutOfRange(date) => write!(f, "date {date} outside loaded range"),
            CalendarError::Forbidden(msg) => write!(f, "forbidden: {msg}"),
            CalendarError::InvalidMutation(msg) => write!(f, "invalid mutation: {msg}"),
            CalendarError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            CalendarError::Source(e) => write!(f, "source error: {e}"),
            CalendarError::JournalError(e) => write!(f, "journal error: {e}"),
            CalendarError::Config(e) => write!(f, "config error: {e}"),
        }
    }
}

impl std::error::Error for CalendarError {}

impl From<std::io::Error> for CalendarError {
    fn from(e: std::io::Error) -> Self {
        CalendarError::JournalError(e.to_string())
    }
}
