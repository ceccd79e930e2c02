use crate::config::Clock;
use crate::error::{MosqueTimesError, Result};
use crate::feed::validate_slug;
use crate::preferences::Theme;
use crate::server::{render_page, AppState};
use askama_axum::Template;
use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

// Template structure for the settings page
#[derive(Template)]
#[template(path = "settings.html")]
pub struct SettingsTemplate {
    site_name: String,
    theme: Theme,
    clock: Clock,
    mosque_name: Option<String>,
}

/// Generates the settings template with the current preferences
pub async fn generate_settings(State(state): State<Arc<AppState>>) -> Response {
    tracing::debug!("Generating settings template");

    let config = match state.config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    let preferences = state.preferences.snapshot();
    let mosque_name = match &preferences.selected_mosque {
        Some(slug) => match state.feed.mosque_by_slug(slug).await {
            Ok(Some(mosque)) => Some(mosque.name),
            _ => Some(slug.clone()),
        },
        None => None,
    };

    render_page(&SettingsTemplate {
        site_name: config.site_name,
        theme: preferences.theme,
        clock: config.clock,
        mosque_name,
    })
}

/// Structure to receive a mosque selection from the API
#[derive(Deserialize, Serialize, Clone)]
pub struct MosqueSelection {
    pub slug: String,
}

impl MosqueSelection {
    /// Validates the selection against the cached mosque index
    ///
    /// The selection is only checked against the index once it has been
    /// loaded; before that any well-formed slug is accepted.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed slugs or mosques the index does not
    /// list with published timings
    pub fn validate(&self, state: &AppState) -> Result<()> {
        validate_slug(&self.slug)?;

        if let Some(index) = state.feed.index_snapshot().data {
            let listed = index.find(&self.slug).is_some_and(|mosque| mosque.has_data);
            if !listed {
                return Err(MosqueTimesError::from(format!("Unknown mosque: {}", self.slug)));
            }
        }

        Ok(())
    }
}

/// Structure to receive a theme change from the API
#[derive(Deserialize, Serialize, Clone)]
pub struct ThemeUpdate {
    pub theme: String,
}

/// Saves the selected mosque
///
/// # Returns
///
/// `400` for an invalid selection, `500` when it could not be persisted
pub async fn select_mosque(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<MosqueSelection>,
) -> Response {
    info!("Saving mosque selection");

    if let Err(e) = payload.validate(&state) {
        return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
    }

    match state.preferences.set_selected_mosque(&payload.slug).await {
        Ok(()) => (StatusCode::OK, "Mosque selection saved").into_response(),
        Err(e) => {
            error!("Error saving mosque selection: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to save mosque selection. Please try again.",
            )
                .into_response()
        }
    }
}

/// Forgets the selected mosque so the picker shows again
pub async fn clear_mosque(State(state): State<Arc<AppState>>) -> Response {
    match state.preferences.clear_selected_mosque().await {
        Ok(()) => (StatusCode::OK, "Mosque selection cleared").into_response(),
        Err(e) => {
            error!("Error clearing mosque selection: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to clear mosque selection. Please try again.",
            )
                .into_response()
        }
    }
}

/// Saves the display theme
pub async fn save_theme(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ThemeUpdate>,
) -> Response {
    let theme: Theme = match payload.theme.parse() {
        Ok(theme) => theme,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    match state.preferences.set_theme(theme).await {
        Ok(()) => (StatusCode::OK, "Theme saved").into_response(),
        Err(e) => {
            error!("Error saving theme: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to save theme. Please try again.",
            )
                .into_response()
        }
    }
}

/// Switches between light and dark, answering with the new theme
pub async fn toggle_theme(State(state): State<Arc<AppState>>) -> Response {
    match state.preferences.toggle_theme().await {
        Ok(theme) => Json(ThemeUpdate {
            theme: theme.to_string(),
        })
        .into_response(),
        Err(e) => {
            error!("Error saving theme: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to save theme. Please try again.",
            )
                .into_response()
        }
    }
}
