use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::loader::{CalendarLoader, LoadOutcome};
use crate::model::DateRange;
use crate::session::SessionContext;
use crate::snapshot::Snapshot;
use crate::source::EventSource;

/// One load, with its outcome logged. Returns the snapshot if it was installed.
pub async fn refresh_once<S: EventSource>(
    loader: &CalendarLoader<S>,
    session: &SessionContext,
    range: DateRange,
) -> Option<Arc<Snapshot>> {
    match loader.load(session, range).await {
        Ok(LoadOutcome::Fresh(snapshot)) => Some(snapshot),
        Ok(LoadOutcome::Superseded) => {
            debug!("refresh of facility {} superseded", session.facility_id);
            None
        }
        Err(e) => {
            warn!("refresh of facility {} failed: {e}", session.facility_id);
            None
        }
    }
}

/// Load several facility views concurrently. Results come back in input order.
pub async fn refresh_all<S: EventSource>(
    views: &[(Arc<CalendarLoader<S>>, SessionContext)],
    range: DateRange,
) -> Vec<Option<Arc<Snapshot>>> {
    join_all(
        views
            .iter()
            .map(|(loader, session)| refresh_once(loader, session, range)),
    )
    .await
}

/// Background task that reloads the view every `every` and hands each fresh
/// snapshot to `on_fresh`. Failed refreshes are logged and skipped.
pub async fn run_refresher<S, F>(
    loader: Arc<CalendarLoader<S>>,
    session: SessionContext,
    range: DateRange,
    every: Duration,
    mut on_fresh: F,
) where
    S: EventSource,
    F: FnMut(Arc<Snapshot>) + Send,
{
    info!(
        "refreshing facility {} every {}s",
        session.facility_id,
        every.as_secs_f64()
    );
    let mut interval = tokio::time::interval(every);
    // The first tick completes immediately; the caller has just loaded.
    interval.tick().await;
    loop {
        interval.tick().await;
        if let Some(snapshot) = refresh_once(&loader, &session, range).await {
            on_fresh(snapshot);
        }
    }
}
