use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;
use ulid::Ulid;

use crate::error::CalendarError;
use crate::model::ViewMode;

/// Runtime settings, read from `COURTGRID_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub seed: PathBuf,
    /// Restrict the view to this organization's facilities.
    pub organization: Option<Ulid>,
    /// Show only this facility; all seeded facilities otherwise.
    pub facility: Option<Ulid>,
    pub date: NaiveDate,
    pub view: ViewMode,
    pub journal: Option<PathBuf>,
    pub compact_threshold: u64,
    /// Watch mode period. Unset means render once and exit.
    pub refresh: Option<Duration>,
    pub metrics_port: Option<u16>,
}

impl Config {
    pub fn from_env() -> Result<Self, CalendarError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CalendarError> {
        let date = match lookup("COURTGRID_DATE") {
            Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map_err(|e| CalendarError::Config(format!("COURTGRID_DATE={s:?}: {e}")))?,
            None => chrono::Local::now().date_naive(),
        };
        let refresh_secs: Option<u64> = parsed(&lookup, "COURTGRID_REFRESH_SECS")?;
        if refresh_secs == Some(0) {
            return Err(CalendarError::Config(
                "COURTGRID_REFRESH_SECS must be positive".into(),
            ));
        }

        Ok(Self {
            seed: lookup("COURTGRID_SEED")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./seed.json")),
            organization: parsed(&lookup, "COURTGRID_ORGANIZATION")?,
            facility: parsed(&lookup, "COURTGRID_FACILITY")?,
            date,
            view: parsed(&lookup, "COURTGRID_VIEW")?.unwrap_or(ViewMode::Day),
            journal: lookup("COURTGRID_JOURNAL").map(PathBuf::from),
            compact_threshold: parsed(&lookup, "COURTGRID_COMPACT_THRESHOLD")?.unwrap_or(1000),
            refresh: refresh_secs.map(Duration::from_secs),
            metrics_port: parsed(&lookup, "COURTGRID_METRICS_PORT")?,
        })
    }
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, CalendarError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(s) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| CalendarError::Config(format!("{key}={s:?}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.seed, PathBuf::from("./seed.json"));
        assert_eq!(config.view, ViewMode::Day);
        assert_eq!(config.compact_threshold, 1000);
        assert!(config.facility.is_none());
        assert!(config.journal.is_none());
        assert!(config.refresh.is_none());
        assert!(config.metrics_port.is_none());
    }

    #[test]
    fn explicit_values() {
        let facility = Ulid::new();
        let facility_text = facility.to_string();
        let config = Config::from_lookup(lookup(&[
            ("COURTGRID_SEED", "/srv/seed.json"),
            ("COURTGRID_FACILITY", facility_text.as_str()),
            ("COURTGRID_DATE", "2026-10-19"),
            ("COURTGRID_VIEW", "week"),
            ("COURTGRID_JOURNAL", "/var/lib/courtgrid/pending.journal"),
            ("COURTGRID_COMPACT_THRESHOLD", "50"),
            ("COURTGRID_REFRESH_SECS", "30"),
            ("COURTGRID_METRICS_PORT", "9100"),
        ]))
        .unwrap();
        assert_eq!(config.seed, PathBuf::from("/srv/seed.json"));
        assert_eq!(config.facility, Some(facility));
        assert_eq!(config.date, NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        assert_eq!(config.view, ViewMode::Week);
        assert_eq!(config.compact_threshold, 50);
        assert_eq!(config.refresh, Some(Duration::from_secs(30)));
        assert_eq!(config.metrics_port, Some(9100));
    }

    #[test]
    fn malformed_values_rejected() {
        for (key, value) in [
            ("COURTGRID_DATE", "19/10/2026"),
            ("COURTGRID_VIEW", "fortnight"),
            ("COURTGRID_FACILITY", "not-a-ulid"),
            ("COURTGRID_METRICS_PORT", "70000"),
            ("COURTGRID_REFRESH_SECS", "0"),
        ] {
            let result = Config::from_lookup(lookup(&[(key, value)]));
            assert!(
                matches!(result, Err(CalendarError::Config(_))),
                "{key}={value} should be rejected"
            );
        }
    }
}
