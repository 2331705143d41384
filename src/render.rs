use std::fmt::Write;

use crate::model::{clock, EventKind, SlotStatus};
use crate::projection::{Cell, DayGrid};

/// Plain-text rendering of one court-day, one line per cell. Prices are
/// printed in major units without a currency symbol.
///
/// ```text
/// Court 1 · 2026-10-19
/// 07:00-08:00  available  30.00
/// 09:00-10:00  booked     x2  Ana
/// 10:00-11:00  ┊
/// ```
pub fn render_day(grid: &DayGrid<'_>, court_name: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{court_name} · {}", grid.date);
    for cell in &grid.cells {
        let _ = writeln!(out, "{}", render_cell(cell));
    }
    out
}

fn render_cell(cell: &Cell<'_>) -> String {
    let label = format!(
        "{}-{}",
        clock::format(cell.slot.span.start),
        clock::format(cell.slot.span.end)
    );
    if cell.is_suppressed() {
        return format!("{label}  ┊");
    }

    let mut line = format!("{label}  {:<9}", cell.status.label());
    if cell.span > 1 {
        let _ = write!(line, "  x{}", cell.span);
    }
    match (cell.status, cell.event.map(|e| &e.kind)) {
        (SlotStatus::Available, Some(EventKind::Available { price_cents })) => {
            let _ = write!(line, "  {}.{:02}", price_cents / 100, price_cents % 100);
        }
        (SlotStatus::Booked, Some(EventKind::Booked { customer_name, .. })) => {
            if cell.is_multi_booking() {
                let _ = write!(line, "  {} bookings", cell.bookings.len());
            } else if let Some(name) = customer_name {
                let _ = write!(line, "  {name}");
            }
        }
        (SlotStatus::Blocked, Some(EventKind::Blocked { reason, note, .. })) => {
            let _ = write!(line, "  {}", reason.label());
            if let Some(note) = note {
                let _ = write!(line, " ({note})");
            }
        }
        _ => {}
    }
    line.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ulid::Ulid;

    use crate::grid::generate_slots;
    use crate::model::*;
    use crate::projection::project_day;

    #[test]
    fn renders_booking_run_and_block() {
        let court = Ulid::new();
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let on = |start, end, kind| CalendarEvent {
            court_id: court,
            date,
            span: Span::new(start, end),
            kind,
        };
        let events = vec![
            on(420, 480, EventKind::Available { price_cents: 3050 }),
            on(
                540,
                630,
                EventKind::Booked {
                    id: Ulid::new(),
                    customer_name: Some("Ana".into()),
                    customer_email: None,
                },
            ),
            on(
                660,
                720,
                EventKind::Blocked {
                    id: Ulid::new(),
                    reason: BlockReason::Maintenance,
                    note: Some("nets".into()),
                },
            ),
        ];
        let slots = generate_slots(&OperatingHours { open: 420, close: 720 }, 60).unwrap();
        let grid = project_day(&events, court, date, &slots);

        let text = render_day(&grid, "Court 1");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Court 1 · 2026-10-19",
                "07:00-08:00  available  30.50",
                "08:00-09:00  none",
                "09:00-10:00  booked     x2  Ana",
                "10:00-11:00  ┊",
                "11:00-12:00  blocked    maintenance (nets)",
            ]
        );
    }
}
