use crate::preferences::Theme;
use crate::server::{render_page, AppState};
use askama_axum::Template;
use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error};

/// A mosque the user can choose
#[derive(Debug, Clone, Serialize)]
pub struct MosqueOption {
    pub name: String,
    pub slug: String,
    pub selected: bool,
}

#[derive(Template)]
#[template(path = "picker.html")]
pub struct PickerTemplate {
    site_name: String,
    theme: Theme,
    /// Shown full page with a greeting before anything else is available
    first_run: bool,
    mosques: Vec<MosqueOption>,
    message: Option<String>,
}

async fn mosque_options(state: &AppState) -> crate::error::Result<Vec<MosqueOption>> {
    let selected = state.preferences.selected_mosque();
    Ok(state
        .feed
        .available_mosques()
        .await?
        .into_iter()
        .map(|mosque| MosqueOption {
            selected: selected.as_deref() == Some(mosque.slug.as_str()),
            name: mosque.name,
            slug: mosque.slug,
        })
        .collect())
}

/// Renders the mosque picker
pub async fn render_picker(state: &AppState, first_run: bool) -> Response {
    debug!("Generating picker template (first run: {first_run})");

    let site_name = match state.config() {
        Ok(config) => config.site_name,
        Err(e) => {
            error!("{e}");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    let (mosques, message) = match mosque_options(state).await {
        Ok(mosques) if mosques.is_empty() => (mosques, Some("No mosques found.".to_string())),
        Ok(mosques) => (mosques, None),
        Err(e) => {
            error!("Failed to load mosque list: {e}");
            (
                Vec::new(),
                Some(
                    "Failed to load mosque list. Please check your internet connection."
                        .to_string(),
                ),
            )
        }
    };

    render_page(&PickerTemplate {
        site_name,
        theme: state.preferences.theme(),
        first_run,
        mosques,
        message,
    })
}

/// Change-mosque page
pub async fn generate_picker(State(state): State<Arc<AppState>>) -> Response {
    let first_run = state.preferences.selected_mosque().is_none();
    render_picker(&state, first_run).await
}

/// Mosques with published timings as JSON
pub async fn list_mosques(State(state): State<Arc<AppState>>) -> Response {
    match mosque_options(&state).await {
        Ok(mosques) => Json(mosques).into_response(),
        Err(e) => {
            error!("Failed to load mosque list: {e}");
            (
                StatusCode::BAD_GATEWAY,
                "Failed to load mosque list. Please check your internet connection.",
            )
                .into_response()
        }
    }
}
