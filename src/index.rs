use crate::error::Result;
use crate::jummah::{week_jummah, JummahView};
use crate::picker::render_picker;
use crate::preferences::Theme;
use crate::schedule::{day_schedule_at, DaySchedule, PrayerRow};
use crate::server::{render_page, AppState};
use askama_axum::Template;
use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Local;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, warn};

const LOAD_FAILED: &str = "Failed to load prayer times. Please check your connection.";
const NO_DATA: &str = "No prayer time data available.";

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    site_name: String,
    theme: Theme,
    mosque_name: String,
    date_label: String,
    rows: Vec<PrayerRow>,
    next_prayer: Option<String>,
    jummah: Vec<JummahView>,
    message: Option<String>,
}

/// Everything the prayer times page shows for the selected mosque
#[derive(Debug, Clone, Serialize)]
pub struct TodayView {
    pub mosque_slug: String,
    pub mosque_name: String,
    pub schedule: Option<DaySchedule>,
    pub jummah: Vec<JummahView>,
}

impl TodayView {
    #[must_use]
    pub fn next_prayer_label(&self) -> Option<String> {
        let next = self.schedule.as_ref()?.next_prayer()?;
        Some(match &next.countdown {
            Some(countdown) => format!("{} in {countdown}", next.name),
            None => next.name.to_string(),
        })
    }
}

/// Loads the selected mosque's timings and Jummah slots for today
///
/// A missing or unreachable index only costs the Jummah section; the
/// timings themselves must load.
///
/// # Errors
///
/// Returns an error if the mosque's timings cannot be fetched
pub async fn load_today(state: &AppState, slug: &str) -> Result<TodayView> {
    let config = state.config()?;
    let data = state.feed.mosque_data(slug).await?;
    let now = Local::now();

    let (mosque_name, jummah) = match state.feed.mosque_by_slug(slug).await {
        Ok(Some(entry)) => {
            let jummah = week_jummah(&entry, now.date_naive(), config.clock);
            (entry.name, jummah)
        }
        Ok(None) => {
            warn!("Mosque {slug} is not listed in the index");
            (data.mosque_name.clone(), Vec::new())
        }
        Err(e) => {
            warn!("Showing {slug} without Jummah times, index unavailable: {e}");
            (data.mosque_name.clone(), Vec::new())
        }
    };

    Ok(TodayView {
        mosque_slug: slug.to_string(),
        mosque_name,
        schedule: day_schedule_at(&data, config.clock, config.show_seconds, &now),
        jummah,
    })
}

/// Prayer times page, or the mosque picker until a mosque is chosen
pub async fn generate_index(State(state): State<Arc<AppState>>) -> Response {
    debug!("Generating index template");

    let preferences = state.preferences.snapshot();
    let Some(slug) = preferences.selected_mosque else {
        return render_picker(&state, true).await;
    };

    let site_name = match state.config() {
        Ok(config) => config.site_name,
        Err(e) => {
            error!("{e}");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    let template = match load_today(&state, &slug).await {
        Ok(today) => {
            let next_prayer = today.next_prayer_label();
            match today.schedule {
                Some(schedule) => IndexTemplate {
                    site_name,
                    theme: preferences.theme,
                    mosque_name: today.mosque_name,
                    date_label: schedule.date_label,
                    rows: schedule.rows,
                    next_prayer,
                    jummah: today.jummah,
                    message: None,
                },
                None => message_page(site_name, preferences.theme, today.mosque_name, NO_DATA),
            }
        }
        Err(e) => {
            error!("Failed to load prayer times for {slug}: {e}");
            message_page(site_name, preferences.theme, String::new(), LOAD_FAILED)
        }
    };

    render_page(&template)
}

fn message_page(site_name: String, theme: Theme, mosque_name: String, message: &str) -> IndexTemplate {
    IndexTemplate {
        site_name,
        theme,
        mosque_name,
        date_label: String::new(),
        rows: Vec::new(),
        next_prayer: None,
        jummah: Vec::new(),
        message: Some(message.to_string()),
    }
}

/// Today's rows for the selected mosque as JSON
pub async fn today_prayers(State(state): State<Arc<AppState>>) -> Response {
    let Some(slug) = state.preferences.selected_mosque() else {
        return (StatusCode::NOT_FOUND, "No mosque selected").into_response();
    };

    match load_today(&state, &slug).await {
        Ok(today) => Json(today).into_response(),
        Err(e) => {
            error!("Failed to load prayer times for {slug}: {e}");
            (StatusCode::BAD_GATEWAY, LOAD_FAILED).into_response()
        }
    }
}

/// Refetches the index and the selected mosque's timings
///
/// Both refetches run even when the other fails; either failure answers 502.
pub async fn refresh(State(state): State<Arc<AppState>>) -> Response {
    let index_result = state.feed.refetch_mosque_index().await.map(|_| ());
    let data_result = match state.preferences.selected_mosque() {
        Some(slug) => state.feed.refetch_mosque_data(&slug).await.map(|_| ()),
        None => Ok(()),
    };

    let mut failed = false;
    for (what, result) in [("mosque index", index_result), ("prayer times", data_result)] {
        if let Err(e) = result {
            error!("Refreshing {what} failed: {e}");
            failed = true;
        }
    }

    if failed {
        (StatusCode::BAD_GATEWAY, LOAD_FAILED).into_response()
    } else {
        (StatusCode::OK, "Prayer times refreshed").into_response()
    }
}
