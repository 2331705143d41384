use chrono::NaiveDate;
use ulid::Ulid;

use crate::grid::{slot_starts, GridSlot};
use crate::model::*;

use super::classify::{classify_slot, overlapping_bookings};
use super::span::event_span;

/// One projected grid cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell<'a> {
    pub slot: GridSlot,
    pub status: SlotStatus,
    /// Event that decided the status. Suppressed cells repeat their anchor's event.
    pub event: Option<&'a CalendarEvent>,
    /// Cells this one occupies when drawn; 0 for suppressed cells.
    pub span: usize,
    /// Index of the anchor cell whose event already covers this one.
    pub covered_by: Option<usize>,
    /// All bookings intersecting the cell, only filled for booked anchors.
    pub bookings: Vec<&'a CalendarEvent>,
}

impl Cell<'_> {
    pub fn is_suppressed(&self) -> bool {
        self.covered_by.is_some()
    }

    pub fn is_multi_booking(&self) -> bool {
        self.bookings.len() > 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayGrid<'a> {
    pub court_id: Ulid,
    pub date: NaiveDate,
    pub cells: Vec<Cell<'a>>,
}

impl<'a> DayGrid<'a> {
    /// Cells that are drawn, i.e. not covered by an earlier anchor.
    pub fn visible(&self) -> impl Iterator<Item = &Cell<'a>> {
        self.cells.iter().filter(|c| !c.is_suppressed())
    }

    pub fn cell_at(&self, start: Min) -> Option<&Cell<'a>> {
        self.cells.iter().find(|c| c.slot.span.start == start)
    }
}

/// Project one court's day onto an ordered grid.
///
/// Blocked cells and cells holding exactly one booking anchor their event
/// across every following cell it reaches; those cells come back
/// suppressed and point at the anchor. A booking's run stops early at the
/// first cell that another block or booking touches, so precedence and the
/// multi-booking indicator still apply there.
pub fn project_day<'a>(
    events: &'a [CalendarEvent],
    court_id: Ulid,
    date: NaiveDate,
    slots: &[GridSlot],
) -> DayGrid<'a> {
    let starts = slot_starts(slots);
    let slot_duration = slots.first().map_or(0, |s| s.span.duration());

    let mut cells: Vec<Cell<'a>> = Vec::with_capacity(slots.len());
    // (anchor index, first index past its run)
    let mut anchor: Option<(usize, usize)> = None;

    for (i, slot) in slots.iter().enumerate() {
        if let Some((a, run_end)) = anchor {
            if i < run_end {
                let (status, event) = (cells[a].status, cells[a].event);
                cells.push(Cell {
                    slot: *slot,
                    status,
                    event,
                    span: 0,
                    covered_by: Some(a),
                    bookings: Vec::new(),
                });
                continue;
            }
            anchor = None;
        }

        let class = classify_slot(events, court_id, date, &slot.span);
        let mut cell = Cell {
            slot: *slot,
            status: class.status,
            event: class.event,
            span: 1,
            covered_by: None,
            bookings: Vec::new(),
        };

        match (class.status, class.event) {
            (SlotStatus::Blocked, Some(event)) => {
                cell.span = event_span(&event.span, slot_duration, &starts, i);
            }
            (SlotStatus::Booked, Some(event)) => {
                cell.bookings = overlapping_bookings(events, court_id, date, &slot.span);
                if cell.bookings.len() == 1 {
                    let full = event_span(&event.span, slot_duration, &starts, i);
                    cell.span = clear_run(events, court_id, date, slots, i, full, event);
                }
            }
            _ => {}
        }

        if cell.span > 1 {
            anchor = Some((i, i + cell.span));
        }
        cells.push(cell);
    }

    DayGrid {
        court_id,
        date,
        cells,
    }
}

/// Length of a booking's run before a later cell is touched by a block or
/// by a different booking.
fn clear_run(
    events: &[CalendarEvent],
    court_id: Ulid,
    date: NaiveDate,
    slots: &[GridSlot],
    start_index: usize,
    full: usize,
    booking: &CalendarEvent,
) -> usize {
    for offset in 1..full {
        let Some(slot) = slots.get(start_index + offset) else {
            return offset;
        };
        let contested = events.iter().any(|e| {
            e.is_on(court_id, date)
                && e.span.overlaps(&slot.span)
                && match e.category() {
                    Category::Blocked => true,
                    Category::Booked => e != booking,
                    Category::Available => false,
                }
        });
        if contested {
            return offset;
        }
    }
    full
}
