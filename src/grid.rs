use crate::error::CalendarError;
use crate::limits::{MAX_SLOT_DURATION, MIN_SLOT_DURATION};
use crate::model::{Min, OperatingHours, Span};

/// One generated display cell. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSlot {
    pub index: usize,
    pub span: Span,
}

/// Tile the operating window with slots of exactly `slot_duration` minutes.
/// A trailing remainder shorter than one slot is not emitted.
pub fn generate_slots(
    hours: &OperatingHours,
    slot_duration: Min,
) -> Result<Vec<GridSlot>, CalendarError> {
    if !(MIN_SLOT_DURATION..=MAX_SLOT_DURATION).contains(&slot_duration) {
        return Err(CalendarError::InvalidSlotDuration(slot_duration));
    }
    let window = hours.window()?;

    let mut slots = Vec::with_capacity((window.duration() / slot_duration) as usize);
    let mut start = window.start;
    while start + slot_duration <= window.end {
        slots.push(GridSlot {
            index: slots.len(),
            span: Span::new(start, start + slot_duration),
        });
        start += slot_duration;
    }
    Ok(slots)
}

pub fn slot_starts(slots: &[GridSlot]) -> Vec<Min> {
    slots.iter().map(|s| s.span.start).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hours(open: Min, close: Min) -> OperatingHours {
        OperatingHours { open, close }
    }

    #[test]
    fn tiles_whole_window() {
        let slots = generate_slots(&hours(7 * 60, 21 * 60), 60).unwrap();
        assert_eq!(slots.len(), 14);
        assert_eq!(slots[0].span, Span::new(420, 480));
        assert_eq!(slots[13].span, Span::new(1200, 1260));
        assert!(slots.iter().enumerate().all(|(i, s)| s.index == i));
    }

    #[test]
    fn drops_short_tail() {
        // 07:00–08:45 with 30-minute slots leaves a 15-minute remainder
        let slots = generate_slots(&hours(420, 525), 30).unwrap();
        assert_eq!(slots.len(), 3);
        assert_eq!(slots.last().unwrap().span, Span::new(480, 510));
    }

    #[test]
    fn window_shorter_than_one_slot_is_empty() {
        let slots = generate_slots(&hours(420, 450), 60).unwrap();
        assert!(slots.is_empty());
    }

    #[test]
    fn rejects_bad_duration() {
        assert_eq!(
            generate_slots(&hours(420, 1260), 0),
            Err(CalendarError::InvalidSlotDuration(0))
        );
        assert!(generate_slots(&hours(420, 1260), MAX_SLOT_DURATION + 1).is_err());
    }

    #[test]
    fn rejects_inverted_window() {
        assert!(matches!(
            generate_slots(&hours(1260, 420), 60),
            Err(CalendarError::InvalidSpan { .. })
        ));
    }

    #[test]
    fn starts_follow_grid() {
        let slots = generate_slots(&hours(600, 720), 30).unwrap();
        assert_eq!(slot_starts(&slots), vec![600, 630, 660, 690]);
    }
}
