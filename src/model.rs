use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::CalendarError;
use crate::limits::{MAX_RANGE_DAYS, MINUTES_PER_DAY};

/// Minutes since midnight. The only time-of-day type.
pub type Min = i32;

/// Half-open interval `[start, end)` within one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: Min,
    pub end: Min,
}

impl Span {
    pub fn new(start: Min, end: Min) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    /// Checked constructor for spans arriving from rows, seed files and mutations.
    pub fn try_new(start: Min, end: Min) -> Result<Self, CalendarError> {
        if start < 0 || end > MINUTES_PER_DAY || start >= end {
            return Err(CalendarError::InvalidSpan { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> Min {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_instant(&self, t: Min) -> bool {
        self.start <= t && t < self.end
    }

    /// Returns true if `self` fully contains `other`.
    pub fn contains_span(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// `HH:MM` clock text, as the backend's `time` columns carry it.
pub mod clock {
    use chrono::{NaiveTime, Timelike};
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Min;
    use crate::error::CalendarError;
    use crate::limits::MINUTES_PER_DAY;

    pub fn parse(s: &str) -> Result<Min, CalendarError> {
        let s = s.trim();
        if s == "24:00" || s == "24:00:00" {
            return Ok(MINUTES_PER_DAY);
        }
        let time = NaiveTime::parse_from_str(s, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
            .map_err(|_| CalendarError::InvalidClock(s.to_string()))?;
        if time.second() != 0 {
            return Err(CalendarError::InvalidClock(s.to_string()));
        }
        Ok((time.hour() * 60 + time.minute()) as Min)
    }

    pub fn format(m: Min) -> String {
        format!("{:02}:{:02}", m / 60, m % 60)
    }

    pub fn serialize<S: Serializer>(m: &Min, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(*m))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Min, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    Maintenance,
    PrivateEvent,
    Weather,
    Other,
}

impl BlockReason {
    pub fn label(&self) -> &'static str {
        match self {
            BlockReason::Maintenance => "maintenance",
            BlockReason::PrivateEvent => "private event",
            BlockReason::Weather => "weather",
            BlockReason::Other => "other",
        }
    }
}

/// What an event represents on a court.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// Bookable time offered at a price.
    Available { price_cents: i64 },
    /// A reservation, possibly made on behalf of a walk-in customer.
    Booked {
        id: Ulid,
        customer_name: Option<String>,
        customer_email: Option<String>,
    },
    /// Time taken out of service.
    Blocked {
        id: Ulid,
        reason: BlockReason,
        note: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Available,
    Booked,
    Blocked,
}

/// A single availability-relevant record for one court on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub court_id: Ulid,
    pub date: NaiveDate,
    pub span: Span,
    pub kind: EventKind,
}

impl CalendarEvent {
    pub fn category(&self) -> Category {
        match self.kind {
            EventKind::Available { .. } => Category::Available,
            EventKind::Booked { .. } => Category::Booked,
            EventKind::Blocked { .. } => Category::Blocked,
        }
    }

    /// Booking or block id. Availability templates have none.
    pub fn id(&self) -> Option<Ulid> {
        match &self.kind {
            EventKind::Available { .. } => None,
            EventKind::Booked { id, .. } | EventKind::Blocked { id, .. } => Some(*id),
        }
    }

    pub fn is_on(&self, court_id: Ulid, date: NaiveDate) -> bool {
        self.court_id == court_id && self.date == date
    }
}

/// Effective status of a grid cell. Variant order is display precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    None,
    Available,
    Booked,
    Blocked,
}

impl SlotStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SlotStatus::None => "none",
            SlotStatus::Available => "available",
            SlotStatus::Booked => "booked",
            SlotStatus::Blocked => "blocked",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatingHours {
    #[serde(with = "clock")]
    pub open: Min,
    #[serde(with = "clock")]
    pub close: Min,
}

impl OperatingHours {
    pub fn window(&self) -> Result<Span, CalendarError> {
        Span::try_new(self.open, self.close)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Court {
    pub id: Ulid,
    pub name: String,
    /// Length of one bookable grid slot in minutes.
    pub slot_duration: Min,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facility {
    pub id: Ulid,
    pub organization_id: Ulid,
    pub name: String,
    pub hours: OperatingHours,
    pub courts: Vec<Court>,
}

impl Facility {
    pub fn court(&self, court_id: Ulid) -> Option<&Court> {
        self.courts.iter().find(|c| c.id == court_id)
    }
}

/// Inclusive range of calendar dates a view covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, CalendarError> {
        if end < start {
            return Err(CalendarError::LimitExceeded("date range ends before it starts"));
        }
        if (end - start).num_days() + 1 > MAX_RANGE_DAYS {
            return Err(CalendarError::LimitExceeded("date range too wide"));
        }
        Ok(Self { start, end })
    }

    pub fn single(date: NaiveDate) -> Self {
        Self { start: date, end: date }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    Day,
    Week,
    Month,
}

impl ViewMode {
    /// Dates shown when the calendar is anchored at `anchor`.
    /// Weeks run Monday to Sunday.
    pub fn range(&self, anchor: NaiveDate) -> Result<DateRange, CalendarError> {
        match self {
            ViewMode::Day => Ok(DateRange::single(anchor)),
            ViewMode::Week => {
                let back = anchor.weekday().num_days_from_monday() as u64;
                let start = anchor
                    .checked_sub_days(Days::new(back))
                    .ok_or(CalendarError::OutOfRange(anchor))?;
                let end = start
                    .checked_add_days(Days::new(6))
                    .ok_or(CalendarError::OutOfRange(anchor))?;
                DateRange::new(start, end)
            }
            ViewMode::Month => {
                let start = anchor.with_day(1).ok_or(CalendarError::OutOfRange(anchor))?;
                let end = start
                    .checked_add_months(Months::new(1))
                    .and_then(|d| d.pred_opt())
                    .ok_or(CalendarError::OutOfRange(anchor))?;
                DateRange::new(start, end)
            }
        }
    }
}

impl std::str::FromStr for ViewMode {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(ViewMode::Day),
            "week" => Ok(ViewMode::Week),
            "month" => Ok(ViewMode::Month),
            other => Err(CalendarError::Config(format!("unknown view mode: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_basics() {
        let s = Span::new(540, 600);
        assert_eq!(s.duration(), 60);
        assert!(s.contains_instant(540));
        assert!(s.contains_instant(599));
        assert!(!s.contains_instant(600)); // half-open
    }

    #[test]
    fn span_overlap() {
        let a = Span::new(540, 600);
        let b = Span::new(570, 630);
        let c = Span::new(600, 660);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c)); // adjacent, not overlapping
    }

    #[test]
    fn span_contains_span() {
        let outer = Span::new(480, 600);
        let inner = Span::new(510, 570);
        let partial = Span::new(450, 540);
        assert!(outer.contains_span(&inner));
        assert!(outer.contains_span(&outer)); // self-containment
        assert!(!outer.contains_span(&partial));
    }

    #[test]
    fn try_new_rejects_malformed() {
        assert!(Span::try_new(600, 600).is_err());
        assert!(Span::try_new(600, 540).is_err());
        assert!(Span::try_new(-30, 60).is_err());
        assert!(Span::try_new(1380, 1441).is_err());
        assert_eq!(Span::try_new(1380, 1440), Ok(Span::new(1380, 1440)));
    }

    #[test]
    fn clock_parse_and_format() {
        assert_eq!(clock::parse("09:30"), Ok(570));
        assert_eq!(clock::parse("09:30:00"), Ok(570));
        assert_eq!(clock::parse("24:00"), Ok(1440));
        assert!(clock::parse("09:30:15").is_err());
        assert!(clock::parse("nine").is_err());
        assert_eq!(clock::format(570), "09:30");
        assert_eq!(clock::format(0), "00:00");
    }

    #[test]
    fn status_precedence_order() {
        assert!(SlotStatus::Blocked > SlotStatus::Booked);
        assert!(SlotStatus::Booked > SlotStatus::Available);
        assert!(SlotStatus::Available > SlotStatus::None);
    }

    #[test]
    fn event_category_and_id() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let court = Ulid::new();
        let available = CalendarEvent {
            court_id: court,
            date,
            span: Span::new(480, 540),
            kind: EventKind::Available { price_cents: 2500 },
        };
        assert_eq!(available.category(), Category::Available);
        assert_eq!(available.id(), None);

        let id = Ulid::new();
        let blocked = CalendarEvent {
            court_id: court,
            date,
            span: Span::new(480, 540),
            kind: EventKind::Blocked {
                id,
                reason: BlockReason::Weather,
                note: None,
            },
        };
        assert_eq!(blocked.category(), Category::Blocked);
        assert_eq!(blocked.id(), Some(id));
        assert!(blocked.is_on(court, date));
        assert!(!blocked.is_on(Ulid::new(), date));
    }

    #[test]
    fn operating_hours_serialize_as_clock_text() {
        let hours = OperatingHours { open: 420, close: 1260 };
        let json = serde_json::to_string(&hours).unwrap();
        assert_eq!(json, r#"{"open":"07:00","close":"21:00"}"#);
        let back: OperatingHours = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hours);
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn week_runs_monday_to_sunday() {
        // 2026-10-22 is a Thursday
        let range = ViewMode::Week.range(date(2026, 10, 22)).unwrap();
        assert_eq!(range.start, date(2026, 10, 19));
        assert_eq!(range.end, date(2026, 10, 25));
        assert_eq!(range.len_days(), 7);
    }

    #[test]
    fn month_covers_calendar_month() {
        let range = ViewMode::Month.range(date(2028, 2, 17)).unwrap();
        assert_eq!(range.start, date(2028, 2, 1));
        assert_eq!(range.end, date(2028, 2, 29)); // leap year
        assert_eq!(range.days().count(), 29);
    }

    #[test]
    fn date_range_limits() {
        assert!(DateRange::new(date(2026, 10, 2), date(2026, 10, 1)).is_err());
        assert!(DateRange::new(date(2026, 1, 1), date(2026, 2, 1)).is_err());
        let r = DateRange::new(date(2026, 1, 1), date(2026, 1, 31)).unwrap();
        assert!(r.contains(date(2026, 1, 31)));
        assert!(!r.contains(date(2026, 2, 1)));
    }

    #[test]
    fn view_mode_from_str() {
        assert_eq!("Week".parse::<ViewMode>(), Ok(ViewMode::Week));
        assert!("year".parse::<ViewMode>().is_err());
    }
}
