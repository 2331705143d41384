use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::CalendarError;
use crate::limits::{MAX_COURTS_PER_FACILITY, MAX_NOTE_LEN};
use crate::model::*;

/// One row as the backend returns it, tagged by table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EventRow {
    Available {
        court_id: Ulid,
        date: NaiveDate,
        #[serde(with = "clock")]
        start_time: Min,
        #[serde(with = "clock")]
        end_time: Min,
        price_cents: i64,
    },
    Booked {
        id: Ulid,
        court_id: Ulid,
        date: NaiveDate,
        #[serde(with = "clock")]
        start_time: Min,
        #[serde(with = "clock")]
        end_time: Min,
        #[serde(default)]
        customer_name: Option<String>,
        #[serde(default)]
        customer_email: Option<String>,
    },
    Blocked {
        id: Ulid,
        court_id: Ulid,
        date: NaiveDate,
        #[serde(with = "clock")]
        start_time: Min,
        #[serde(with = "clock")]
        end_time: Min,
        reason: BlockReason,
        #[serde(default)]
        note: Option<String>,
    },
}

impl EventRow {
    pub fn category(&self) -> Category {
        match self {
            EventRow::Available { .. } => Category::Available,
            EventRow::Booked { .. } => Category::Booked,
            EventRow::Blocked { .. } => Category::Blocked,
        }
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            EventRow::Available { date, .. }
            | EventRow::Booked { date, .. }
            | EventRow::Blocked { date, .. } => *date,
        }
    }

    /// Validate the interval and convert to the in-memory event.
    pub fn into_event(self) -> Result<CalendarEvent, CalendarError> {
        match self {
            EventRow::Available {
                court_id,
                date,
                start_time,
                end_time,
                price_cents,
            } => {
                if price_cents < 0 {
                    return Err(CalendarError::InvalidMutation("negative price"));
                }
                Ok(CalendarEvent {
                    court_id,
                    date,
                    span: Span::try_new(start_time, end_time)?,
                    kind: EventKind::Available { price_cents },
                })
            }
            EventRow::Booked {
                id,
                court_id,
                date,
                start_time,
                end_time,
                customer_name,
                customer_email,
            } => Ok(CalendarEvent {
                court_id,
                date,
                span: Span::try_new(start_time, end_time)?,
                kind: EventKind::Booked {
                    id,
                    customer_name,
                    customer_email,
                },
            }),
            EventRow::Blocked {
                id,
                court_id,
                date,
                start_time,
                end_time,
                reason,
                note,
            } => {
                if note.as_ref().is_some_and(|n| n.len() > MAX_NOTE_LEN) {
                    return Err(CalendarError::LimitExceeded("block note too long"));
                }
                Ok(CalendarEvent {
                    court_id,
                    date,
                    span: Span::try_new(start_time, end_time)?,
                    kind: EventKind::Blocked { id, reason, note },
                })
            }
        }
    }
}

/// Where a view's facility and events come from.
///
/// Each fetch is scoped to one facility and one date range. Implementations
/// must not return partial results: a fetch either yields every row in
/// range or fails.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn facility(&self, facility_id: Ulid) -> Result<Facility, CalendarError>;

    async fn available(
        &self,
        facility_id: Ulid,
        range: DateRange,
    ) -> Result<Vec<EventRow>, CalendarError>;

    async fn bookings(
        &self,
        facility_id: Ulid,
        range: DateRange,
    ) -> Result<Vec<EventRow>, CalendarError>;

    async fn blocks(
        &self,
        facility_id: Ulid,
        range: DateRange,
    ) -> Result<Vec<EventRow>, CalendarError>;
}

/// Seed file layout: facilities with their rows inline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Seed {
    pub facilities: Vec<SeedFacility>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedFacility {
    #[serde(flatten)]
    pub facility: Facility,
    #[serde(default)]
    pub events: Vec<EventRow>,
}

/// Source held entirely in memory. Backs tests and the seed-file CLI.
pub struct InMemorySource {
    facilities: DashMap<Ulid, Facility>,
    rows: DashMap<Ulid, Vec<EventRow>>,
}

impl Default for InMemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySource {
    pub fn new() -> Self {
        Self {
            facilities: DashMap::new(),
            rows: DashMap::new(),
        }
    }

    pub fn from_seed(seed: Seed) -> Result<Self, CalendarError> {
        let source = Self::new();
        for entry in seed.facilities {
            let id = entry.facility.id;
            source.insert_facility(entry.facility)?;
            for row in entry.events {
                source.insert_row(id, row)?;
            }
        }
        Ok(source)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, CalendarError> {
        let bytes = std::fs::read(path)
            .map_err(|e| CalendarError::Source(format!("{}: {e}", path.display())))?;
        let seed: Seed = serde_json::from_slice(&bytes)
            .map_err(|e| CalendarError::Source(format!("{}: {e}", path.display())))?;
        Self::from_seed(seed)
    }

    pub fn insert_facility(&self, facility: Facility) -> Result<(), CalendarError> {
        if facility.courts.len() > MAX_COURTS_PER_FACILITY {
            return Err(CalendarError::LimitExceeded("too many courts in facility"));
        }
        if self.facilities.contains_key(&facility.id) {
            return Err(CalendarError::AlreadyExists(facility.id));
        }
        self.rows.entry(facility.id).or_default();
        self.facilities.insert(facility.id, facility);
        Ok(())
    }

    /// Rows are stored as given; validation happens when a snapshot is built.
    pub fn insert_row(&self, facility_id: Ulid, row: EventRow) -> Result<(), CalendarError> {
        let mut rows = self
            .rows
            .get_mut(&facility_id)
            .ok_or(CalendarError::NotFound(facility_id))?;
        rows.push(row);
        Ok(())
    }

    pub fn facility_ids(&self) -> Vec<Ulid> {
        let mut ids: Vec<Ulid> = self.facilities.iter().map(|e| *e.key()).collect();
        ids.sort();
        ids
    }

    fn rows_matching(
        &self,
        facility_id: Ulid,
        range: DateRange,
        category: Category,
    ) -> Result<Vec<EventRow>, CalendarError> {
        let rows = self
            .rows
            .get(&facility_id)
            .ok_or(CalendarError::NotFound(facility_id))?;
        Ok(rows
            .iter()
            .filter(|r| r.category() == category && range.contains(r.date()))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl EventSource for InMemorySource {
    async fn facility(&self, facility_id: Ulid) -> Result<Facility, CalendarError> {
        self.facilities
            .get(&facility_id)
            .map(|e| e.value().clone())
            .ok_or(CalendarError::NotFound(facility_id))
    }

    async fn available(
        &self,
        facility_id: Ulid,
        range: DateRange,
    ) -> Result<Vec<EventRow>, CalendarError> {
        self.rows_matching(facility_id, range, Category::Available)
    }

    async fn bookings(
        &self,
        facility_id: Ulid,
        range: DateRange,
    ) -> Result<Vec<EventRow>, CalendarError> {
        self.rows_matching(facility_id, range, Category::Booked)
    }

    async fn blocks(
        &self,
        facility_id: Ulid,
        range: DateRange,
    ) -> Result<Vec<EventRow>, CalendarError> {
        self.rows_matching(facility_id, range, Category::Blocked)
    }
}
