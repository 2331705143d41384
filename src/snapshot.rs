use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use tracing::warn;
use ulid::Ulid;

use crate::error::CalendarError;
use crate::model::*;
use crate::pending::Mutation;
use crate::source::EventRow;

/// Immutable event set for one facility over one date range.
///
/// Events are indexed per `(court, date)` and kept sorted by `span.start`.
/// A snapshot is replaced wholesale on refetch; the only in-place changes
/// are the ones the pending buffer folds into its private overlay copy.
#[derive(Debug, Clone)]
pub struct Snapshot {
    facility: Facility,
    range: DateRange,
    days: HashMap<(Ulid, NaiveDate), Vec<CalendarEvent>>,
    rejected: usize,
}

impl Snapshot {
    pub fn empty(facility: Facility, range: DateRange) -> Self {
        Self {
            facility,
            range,
            days: HashMap::new(),
            rejected: 0,
        }
    }

    /// Validate backend rows and index them. Malformed rows and repeated
    /// booking or block ids are dropped; the first row with an id wins.
    pub fn build(
        facility: Facility,
        range: DateRange,
        rows: impl IntoIterator<Item = EventRow>,
    ) -> Self {
        let mut snapshot = Self::empty(facility, range);
        let mut seen: HashSet<Ulid> = HashSet::new();
        for row in rows {
            match row.into_event() {
                Ok(event) => {
                    if let Err(e) = snapshot.check_placement(&event) {
                        warn!("dropping event on court {}: {e}", event.court_id);
                        snapshot.rejected += 1;
                        continue;
                    }
                    if let Some(id) = event.id() {
                        if !seen.insert(id) {
                            warn!("dropping duplicate event {id}");
                            snapshot.rejected += 1;
                            continue;
                        }
                    }
                    snapshot.insert(event);
                }
                Err(e) => {
                    warn!("dropping malformed row: {e}");
                    snapshot.rejected += 1;
                }
            }
        }
        if snapshot.rejected > 0 {
            metrics::counter!(crate::observability::EVENTS_REJECTED_TOTAL)
                .increment(snapshot.rejected as u64);
        }
        snapshot
    }

    pub fn from_events(
        facility: Facility,
        range: DateRange,
        events: impl IntoIterator<Item = CalendarEvent>,
    ) -> Self {
        let mut snapshot = Self::empty(facility, range);
        for event in events {
            snapshot.insert(event);
        }
        snapshot
    }

    pub fn facility(&self) -> &Facility {
        &self.facility
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    /// Rows dropped during `build`.
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    pub fn len(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.days.values().all(Vec::is_empty)
    }

    /// All events for a court on a date, sorted by start.
    pub fn day(&self, court_id: Ulid, date: NaiveDate) -> &[CalendarEvent] {
        self.days
            .get(&(court_id, date))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Return only events whose span overlaps `query`.
    /// Uses binary search to skip events starting at or after `query.end`.
    pub fn overlapping(
        &self,
        court_id: Ulid,
        date: NaiveDate,
        query: &Span,
    ) -> impl Iterator<Item = &CalendarEvent> {
        let events = self.day(court_id, date);
        let right_bound = events.partition_point(|e| e.span.start < query.end);
        events[..right_bound]
            .iter()
            .filter(move |e| e.span.end > query.start)
    }

    pub fn find(&self, id: Ulid) -> Option<&CalendarEvent> {
        self.days
            .values()
            .flat_map(|events| events.iter())
            .find(|e| e.id() == Some(id))
    }

    pub fn events(&self) -> impl Iterator<Item = &CalendarEvent> {
        self.days.values().flat_map(|events| events.iter())
    }

    /// Apply a single mutation in place.
    pub fn apply(&mut self, mutation: &Mutation) -> Result<(), CalendarError> {
        match mutation {
            Mutation::PlaceBooking(event) | Mutation::PlaceBlock(event) => {
                let id = event
                    .id()
                    .ok_or(CalendarError::InvalidMutation("event carries no id"))?;
                if self.find(id).is_some() {
                    return Err(CalendarError::AlreadyExists(id));
                }
                self.check_placement(event)?;
                self.insert(event.clone());
                Ok(())
            }
            Mutation::CancelBooking { id } => self.remove(*id, Category::Booked).map(|_| ()),
            Mutation::RemoveBlock { id } => self.remove(*id, Category::Blocked).map(|_| ()),
        }
    }

    fn check_placement(&self, event: &CalendarEvent) -> Result<(), CalendarError> {
        if !self.range.contains(event.date) {
            return Err(CalendarError::OutOfRange(event.date));
        }
        if self.facility.court(event.court_id).is_none() {
            return Err(CalendarError::NotFound(event.court_id));
        }
        Ok(())
    }

    /// Insert maintaining sort order by span.start.
    fn insert(&mut self, event: CalendarEvent) {
        let events = self.days.entry((event.court_id, event.date)).or_default();
        let pos = events
            .binary_search_by_key(&event.span.start, |e| e.span.start)
            .unwrap_or_else(|e| e);
        events.insert(pos, event);
    }

    fn remove(&mut self, id: Ulid, category: Category) -> Result<CalendarEvent, CalendarError> {
        for events in self.days.values_mut() {
            if let Some(pos) = events
                .iter()
                .position(|e| e.id() == Some(id) && e.category() == category)
            {
                return Ok(events.remove(pos));
            }
        }
        Err(CalendarError::NotFound(id))
    }
}
