use crate::config::Clock;
use crate::feed::MosqueIndexEntry;
use crate::preferences::Theme;
use crate::schedule::jummah_for_week;
use crate::server::{render_page, AppState};
use crate::utils::{format_date_short, format_time};
use askama_axum::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

/// Friday prayer slots of one date, formatted for display
#[derive(Debug, Clone, Serialize)]
pub struct JummahView {
    pub date: String,
    pub date_label: String,
    pub times: Vec<String>,
}

#[derive(Template)]
#[template(path = "jummah.html")]
pub struct JummahTemplate {
    site_name: String,
    theme: Theme,
    mosque_name: String,
    slots: Vec<JummahView>,
    message: Option<String>,
}

/// This week's Jummah slots of `mosque`
#[must_use]
pub fn week_jummah(mosque: &MosqueIndexEntry, today: NaiveDate, clock: Clock) -> Vec<JummahView> {
    jummah_for_week(&mosque.jummah_schedule, today)
        .into_iter()
        .map(|slot| JummahView {
            date: slot.date.clone(),
            date_label: format_date_short(&slot.date),
            times: slot
                .times
                .iter()
                .map(|time| format_time(time, false, clock.is_24_hour()))
                .collect(),
        })
        .collect()
}

/// Jummah page for the selected mosque
pub async fn generate_jummah(State(state): State<Arc<AppState>>) -> Response {
    let preferences = state.preferences.snapshot();
    let Some(slug) = preferences.selected_mosque else {
        return Redirect::to("/").into_response();
    };

    let config = match state.config() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    let (mosque_name, slots, message) = match state.feed.mosque_by_slug(&slug).await {
        Ok(Some(mosque)) => {
            let slots = week_jummah(&mosque, Local::now().date_naive(), config.clock);
            let message = slots
                .is_empty()
                .then(|| "No Jummah times published for this week.".to_string());
            (mosque.name, slots, message)
        }
        Ok(None) => (
            slug.clone(),
            Vec::new(),
            Some("This mosque is no longer listed.".to_string()),
        ),
        Err(e) => {
            error!("Failed to load mosque index: {e}");
            (
                slug.clone(),
                Vec::new(),
                Some("Failed to load Jummah times. Please check your connection.".to_string()),
            )
        }
    };

    render_page(&JummahTemplate {
        site_name: config.site_name,
        theme: preferences.theme,
        mosque_name,
        slots,
        message,
    })
}
