//! Live prayer status updates
//!
//! Open pages subscribe to a Server-Sent Events stream that pushes the rows
//! again on every tick, and immediately whenever the cached timings of the
//! selected mosque change.

use crate::cache::QuerySnapshot;
use crate::feed::MosqueData;
use crate::index::load_today;
use crate::schedule::PrayerRow;
use crate::server::AppState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, error, info};

/// One message of the live stream
#[derive(Debug, Clone, Serialize, Default)]
pub struct LiveUpdate {
    pub mosque_slug: Option<String>,
    pub rows: Vec<PrayerRow>,
    pub next_prayer: Option<String>,
    pub error: Option<String>,
}

/// Builds the update for whatever mosque is selected right now
pub async fn current_update(state: &AppState) -> LiveUpdate {
    let Some(slug) = state.preferences.selected_mosque() else {
        return LiveUpdate::default();
    };

    match load_today(state, &slug).await {
        Ok(today) => LiveUpdate {
            next_prayer: today.next_prayer_label(),
            rows: today.schedule.map(|schedule| schedule.rows).unwrap_or_default(),
            mosque_slug: Some(slug),
            error: None,
        },
        Err(e) => {
            error!("Live update for {slug} failed: {e}");
            LiveUpdate {
                mosque_slug: Some(slug),
                error: Some("Failed to load prayer times. Please check your connection.".to_string()),
                ..LiveUpdate::default()
            }
        }
    }
}

/// Handles the live status stream endpoint
pub async fn prayer_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

    tokio::spawn(async move {
        info!("Starting live prayer stream");

        let period = match state.config() {
            Ok(config) => config.live_update_interval(),
            Err(e) => {
                error!("{e}");
                return;
            }
        };
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        let mut watched: Option<(String, watch::Receiver<QuerySnapshot<MosqueData>>)> = None;

        loop {
            let selected = state.preferences.selected_mosque();
            if watched.as_ref().map(|(slug, _)| slug) != selected.as_ref() {
                watched = selected.and_then(|slug| {
                    let changes = state.feed.subscribe_mosque(&slug).ok()?;
                    Some((slug, changes))
                });
            }

            let update = current_update(&state).await;
            // the fetch above may itself have changed the cache
            if let Some((_, changes)) = watched.as_mut() {
                changes.borrow_and_update();
            }

            if tx.send(update).is_err() {
                debug!("Live prayer stream closed by client");
                break;
            }

            tokio::select! {
                () = state.shutdown_token.cancelled() => break,
                _ = interval.tick() => {}
                () = wait_for_change(watched.as_mut().map(|(_, changes)| changes)) => {
                    debug!("Cached timings changed, pushing update");
                }
            }
        }
    });

    let stream = UnboundedReceiverStream::new(rx).map(|update| {
        if let Ok(event) = Event::default().json_data(&update) {
            Ok(event)
        } else {
            error!("Failed to serialize live update for SSE");
            Ok(Event::default().data("Error"))
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn wait_for_change<T>(changes: Option<&mut watch::Receiver<T>>) {
    if let Some(changes) = changes {
        if changes.changed().await.is_ok() {
            return;
        }
    }
    std::future::pending::<()>().await;
}
