use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::*;

/// Effective status of one cell and the event that decided it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification<'a> {
    pub status: SlotStatus,
    pub event: Option<&'a CalendarEvent>,
}

impl<'a> Classification<'a> {
    pub const NONE: Self = Classification {
        status: SlotStatus::None,
        event: None,
    };
}

/// Earliest-starting event of `category` on the court and date whose span passes `hit`.
fn first_match<'a>(
    events: &'a [CalendarEvent],
    court_id: Ulid,
    date: NaiveDate,
    category: Category,
    hit: impl Fn(&Span) -> bool,
) -> Option<&'a CalendarEvent> {
    events
        .iter()
        .filter(|e| e.is_on(court_id, date) && e.category() == category && hit(&e.span))
        .min_by_key(|e| e.span.start)
}

/// Classify a slot with fixed precedence: blocked, booked, available, none.
///
/// Blocks and bookings match when they intersect the slot at all. An
/// availability window only matches when it fully contains the slot, so a
/// cell is never offered for booking on the strength of a partial overlap.
pub fn classify_slot<'a>(
    events: &'a [CalendarEvent],
    court_id: Ulid,
    date: NaiveDate,
    slot: &Span,
) -> Classification<'a> {
    if let Some(event) = first_match(events, court_id, date, Category::Blocked, |s| s.overlaps(slot)) {
        return Classification {
            status: SlotStatus::Blocked,
            event: Some(event),
        };
    }
    if let Some(event) = first_match(events, court_id, date, Category::Booked, |s| s.overlaps(slot)) {
        return Classification {
            status: SlotStatus::Booked,
            event: Some(event),
        };
    }
    if let Some(event) = first_match(events, court_id, date, Category::Available, |s| {
        s.contains_span(slot)
    }) {
        return Classification {
            status: SlotStatus::Available,
            event: Some(event),
        };
    }
    Classification::NONE
}

/// Every booking intersecting the slot, in start order.
pub fn overlapping_bookings<'a>(
    events: &'a [CalendarEvent],
    court_id: Ulid,
    date: NaiveDate,
    slot: &Span,
) -> Vec<&'a CalendarEvent> {
    let mut hits: Vec<&CalendarEvent> = events
        .iter()
        .filter(|e| {
            e.is_on(court_id, date) && e.category() == Category::Booked && e.span.overlaps(slot)
        })
        .collect();
    hits.sort_by_key(|e| e.span.start);
    hits
}
