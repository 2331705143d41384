use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::CalendarError;
use crate::model::DateRange;
use crate::session::SessionContext;
use crate::snapshot::Snapshot;
use crate::source::EventSource;

#[derive(Debug, Clone)]
pub enum LoadOutcome {
    Fresh(Arc<Snapshot>),
    /// A newer load started while this one was in flight; its result was dropped.
    Superseded,
}

/// Loads and holds the current snapshot for one facility view.
///
/// Every `load` takes a new generation number. Only the newest generation
/// may install its result, so a slow response for a range the user has
/// already navigated away from never overwrites the newer one.
pub struct CalendarLoader<S: EventSource> {
    source: Arc<S>,
    generation: AtomicU64,
    current: RwLock<Option<Arc<Snapshot>>>,
}

impl<S: EventSource> CalendarLoader<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            generation: AtomicU64::new(0),
            current: RwLock::new(None),
        }
    }

    /// Last snapshot that loaded successfully.
    pub async fn current(&self) -> Option<Arc<Snapshot>> {
        self.current.read().await.clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Fetch facility, availability, bookings and blocks for `range`.
    ///
    /// All four fetches must succeed. On failure the previous snapshot stays
    /// current and the error is returned; there is no retry.
    pub async fn load(
        &self,
        session: &SessionContext,
        range: DateRange,
    ) -> Result<LoadOutcome, CalendarError> {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let facility_id = session.facility_id;
        let started = Instant::now();

        let fetched = tokio::try_join!(
            self.source.facility(facility_id),
            self.source.available(facility_id, range),
            self.source.bookings(facility_id, range),
            self.source.blocks(facility_id, range),
        )
        .and_then(|fetched| {
            if fetched.0.organization_id != session.organization_id {
                // Facilities of other organizations are invisible, not forbidden.
                return Err(CalendarError::NotFound(facility_id));
            }
            Ok(fetched)
        });

        if self.generation() != generation {
            debug!("load {generation} for facility {facility_id} superseded");
            record_load("superseded", started);
            return Ok(LoadOutcome::Superseded);
        }

        let (facility, available, bookings, blocks) = match fetched {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!("load for facility {facility_id} failed: {e}");
                record_load("error", started);
                return Err(e);
            }
        };

        let snapshot = Arc::new(Snapshot::build(
            facility,
            range,
            available.into_iter().chain(bookings).chain(blocks),
        ));

        let mut current = self.current.write().await;
        if self.generation() != generation {
            debug!("load {generation} for facility {facility_id} superseded");
            record_load("superseded", started);
            return Ok(LoadOutcome::Superseded);
        }
        *current = Some(snapshot.clone());
        drop(current);

        info!(
            "loaded {} events for facility {facility_id} ({} to {})",
            snapshot.len(),
            range.start,
            range.end
        );
        record_load("ok", started);
        Ok(LoadOutcome::Fresh(snapshot))
    }
}

fn record_load(status: &'static str, started: Instant) {
    metrics::counter!(crate::observability::LOADS_TOTAL, "status" => status).increment(1);
    metrics::histogram!(crate::observability::LOAD_DURATION_SECONDS)
        .record(started.elapsed().as_secs_f64());
}
