mod classify;
mod day;
mod span;

pub use classify::{classify_slot, overlapping_bookings, Classification};
pub use day::{project_day, Cell, DayGrid};
pub use span::{event_span, is_suppressed, suppressing_event};

use std::time::Instant;

use chrono::NaiveDate;
use ulid::Ulid;

use crate::error::CalendarError;
use crate::grid::generate_slots;
use crate::snapshot::Snapshot;

/// Generate the court's grid and project the snapshot's events onto it.
pub fn project_court_day(
    snapshot: &Snapshot,
    court_id: Ulid,
    date: NaiveDate,
) -> Result<DayGrid<'_>, CalendarError> {
    if !snapshot.range().contains(date) {
        return Err(CalendarError::OutOfRange(date));
    }
    let facility = snapshot.facility();
    let court = facility
        .court(court_id)
        .ok_or(CalendarError::NotFound(court_id))?;
    let slots = generate_slots(&facility.hours, court.slot_duration)?;

    let started = Instant::now();
    let grid = project_day(snapshot.day(court_id, date), court_id, date, &slots);
    metrics::counter!(crate::observability::PROJECTIONS_TOTAL).increment(1);
    metrics::histogram!(crate::observability::PROJECTION_DURATION_SECONDS)
        .record(started.elapsed().as_secs_f64());
    Ok(grid)
}
