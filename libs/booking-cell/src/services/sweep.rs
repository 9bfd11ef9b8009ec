use chrono::{DateTime, Utc};
use shared_models::appointment::AppointmentStatus;
use shared_store::{AppState, MemoryStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::services::booking::AppointmentBookingService;

/// Background maintenance: advisory auto-completion of elapsed
/// consultations and pruning of slot locks for dates already behind us.
/// The system is correct without it; it keeps dashboards and the lock
/// registry tidy.
pub async fn run_sweeper(state: AppState) {
    let interval = Duration::from_secs(state.config.sweep_interval_seconds);
    info!("Slot sweeper running every {:?}", interval);

    let mut ticker = tokio::time::interval(interval);
    // The first tick fires immediately; skip it so startup stays quiet.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let now = Utc::now();

        let completed = auto_complete_elapsed(&state.store, now).await;
        if completed > 0 {
            info!("Auto-completed {} elapsed appointments", completed);
        }

        let pruned = state.store.prune_past_slots(now).await;
        if pruned > 0 {
            debug!("Pruned {} stale slot locks", pruned);
        }
    }
}

/// Moves confirmed appointments whose scheduled end has passed to
/// completed. Returns how many were transitioned.
pub async fn auto_complete_elapsed(store: &Arc<MemoryStore>, now: DateTime<Utc>) -> usize {
    let booking = AppointmentBookingService::new(store.clone());

    let elapsed = store
        .appointments_where(|a| {
            a.status == AppointmentStatus::Confirmed && a.scheduled_end() < now
        })
        .await;

    let mut completed = 0;
    for appointment in elapsed {
        match booking.complete_appointment(appointment.id, None, now).await {
            Ok(_) => completed += 1,
            Err(e) => warn!("Could not auto-complete appointment {}: {}", appointment.id, e),
        }
    }
    completed
}
