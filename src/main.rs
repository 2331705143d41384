use std::sync::Arc;

use tracing::{error, info, warn};

use courtgrid::config::Config;
use courtgrid::pending::PendingBuffer;
use courtgrid::projection::project_court_day;
use courtgrid::refresh::{refresh_all, run_refresher};
use courtgrid::render::render_day;
use courtgrid::session::{Role, SessionContext};
use courtgrid::snapshot::Snapshot;
use courtgrid::source::{EventSource, InMemorySource};
use courtgrid::tenant::TenantCalendars;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    courtgrid::observability::init(config.metrics_port);

    let source = Arc::new(InMemorySource::from_json_file(&config.seed)?);
    let range = config.view.range(config.date)?;

    let calendars = TenantCalendars::new(source.clone());
    let mut views = Vec::new();
    for facility_id in source.facility_ids() {
        if config.facility.is_some_and(|id| id != facility_id) {
            continue;
        }
        let facility = source.facility(facility_id).await?;
        if config
            .organization
            .is_some_and(|org| org != facility.organization_id)
        {
            continue;
        }
        let session = SessionContext::new(facility.organization_id, facility_id, Role::Owner);
        views.push((calendars.get_or_create(&session)?, session));
    }
    if views.is_empty() {
        return Err(format!("no facility in {} matches", config.seed.display()).into());
    }

    let pending = Arc::new(match &config.journal {
        Some(path) => PendingBuffer::open(path, config.compact_threshold)?,
        None => PendingBuffer::new(),
    });

    info!("courtgrid {} to {}", range.start, range.end);
    info!("  seed: {}", config.seed.display());
    info!("  facilities: {}", views.len());
    info!("  pending mutations: {}", pending.len());
    info!(
        "  watch: {}",
        config
            .refresh
            .map_or("disabled".to_string(), |d| format!("every {}s", d.as_secs()))
    );

    for snapshot in refresh_all(&views, range).await.into_iter().flatten() {
        print_snapshot(&pending.overlay(&snapshot));
    }

    let Some(every) = config.refresh else {
        return Ok(());
    };

    let mut tasks = Vec::with_capacity(views.len());
    for (loader, session) in views {
        let pending = pending.clone();
        tasks.push(tokio::spawn(run_refresher(
            loader,
            session,
            range,
            every,
            move |snapshot| print_snapshot(&pending.overlay(&snapshot)),
        )));
    }

    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!("failed to register SIGTERM handler: {e}");
                ctrl_c.await.ok();
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }

    info!("shutdown signal received, stopping refreshers");
    for task in tasks {
        task.abort();
    }
    info!("courtgrid stopped");
    Ok(())
}

fn print_snapshot(snapshot: &Snapshot) {
    let facility = snapshot.facility();
    println!("== {} ==", facility.name);
    for date in snapshot.range().days() {
        for court in &facility.courts {
            match project_court_day(snapshot, court.id, date) {
                Ok(grid) => println!("{}", render_day(&grid, &court.name)),
                Err(e) => error!("cannot project {} on {date}: {e}", court.name),
            }
        }
    }
}
