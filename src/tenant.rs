use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;
use ulid::Ulid;

use crate::error::CalendarError;
use crate::limits::MAX_LOADERS;
use crate::loader::CalendarLoader;
use crate::session::SessionContext;
use crate::source::EventSource;

/// Manages per-facility loaders. Each `(organization, facility)` pair gets
/// its own loader, so views of different facilities never share a snapshot
/// or a generation counter.
pub struct TenantCalendars<S: EventSource> {
    loaders: DashMap<(Ulid, Ulid), Arc<CalendarLoader<S>>>,
    source: Arc<S>,
}

impl<S: EventSource> TenantCalendars<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self {
            loaders: DashMap::new(),
            source,
        }
    }

    /// Get or lazily create the loader for the session's facility.
    pub fn get_or_create(
        &self,
        session: &SessionContext,
    ) -> Result<Arc<CalendarLoader<S>>, CalendarError> {
        let key = (session.organization_id, session.facility_id);
        if let Some(loader) = self.loaders.get(&key) {
            return Ok(loader.value().clone());
        }
        if self.loaders.len() >= MAX_LOADERS {
            return Err(CalendarError::LimitExceeded("too many facility loaders"));
        }

        let loader = self
            .loaders
            .entry(key)
            .or_insert_with(|| {
                debug!("new loader for facility {}", session.facility_id);
                Arc::new(CalendarLoader::new(self.source.clone()))
            })
            .value()
            .clone();
        metrics::gauge!(crate::observability::LOADERS_ACTIVE).set(self.loaders.len() as f64);
        Ok(loader)
    }

    pub fn loaders(&self) -> usize {
        self.loaders.len()
    }
}
