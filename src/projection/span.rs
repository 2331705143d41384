use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::*;

/// The earlier-starting event of `category` whose interior contains the
/// slot's start, if any. Such a slot is drawn as part of that event.
pub fn suppressing_event<'a>(
    events: &'a [CalendarEvent],
    court_id: Ulid,
    date: NaiveDate,
    slot: &Span,
    category: Category,
) -> Option<&'a CalendarEvent> {
    events
        .iter()
        .filter(|e| {
            e.is_on(court_id, date)
                && e.category() == category
                && e.span.start < slot.start
                && e.span.end > slot.start
        })
        .min_by_key(|e| e.span.start)
}

pub fn is_suppressed(
    events: &[CalendarEvent],
    court_id: Ulid,
    date: NaiveDate,
    slot: &Span,
    category: Category,
) -> bool {
    suppressing_event(events, court_id, date, slot, category).is_some()
}

/// Number of consecutive grid cells, starting at `start_index`, that `event`
/// reaches into. Counting stops at the first cell the event does not
/// overlap. Never less than 1; degenerate events and grids count as 1.
pub fn event_span(event: &Span, slot_duration: Min, slot_starts: &[Min], start_index: usize) -> usize {
    if slot_duration <= 0 {
        return 1;
    }
    slot_starts
        .iter()
        .skip(start_index)
        .take_while(|&&start| event.start < start + slot_duration && start < event.end)
        .count()
        .max(1)
}
