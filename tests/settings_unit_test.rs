use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use http_body_util::BodyExt; // For .collect()
use mosque_times::config::Config;
use mosque_times::error::{MosqueTimesError, Result};
use mosque_times::preferences::{KeyValueStore, MemoryStore, StoreFuture, Theme};
use mosque_times::server::AppState;
use mosque_times::settings::{MosqueSelection, ThemeUpdate};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

// Store whose writes always fail, as when the disk is full
struct FailingStore;

impl KeyValueStore for FailingStore {
    fn get<'a>(&'a self, _key: &'a str) -> StoreFuture<'a, Option<String>> {
        Box::pin(async { Ok(None) })
    }

    fn set<'a>(&'a self, _key: &'a str, _value: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async { Err(MosqueTimesError::Storage("disk full".to_string())) })
    }

    fn remove<'a>(&'a self, _key: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async { Err(MosqueTimesError::Storage("disk full".to_string())) })
    }
}

// Nothing listens on the discard port, so feed requests fail fast
fn offline_config() -> Config {
    Config {
        site_name: "Test Mosques".to_string(),
        feed_base_url: "http://127.0.0.1:9".to_string(),
        preferences_file: None,
        fetch_retries: 0,
        request_timeout_secs: 1,
        ..Config::default()
    }
}

fn create_test_state(store: Arc<dyn KeyValueStore>) -> Result<Arc<AppState>> {
    Ok(Arc::new(AppState::with_store(
        offline_config(),
        store,
        CancellationToken::new(),
    )?))
}

async fn into_parts(response: Response) -> (StatusCode, String) {
    let (parts, body) = response.into_response().into_parts();
    let body_bytes = body
        .collect()
        .await
        .expect("Failed to collect response body")
        .to_bytes();
    (
        parts.status,
        String::from_utf8(body_bytes.to_vec()).expect("Response body is not UTF-8"),
    )
}

fn selection(slug: &str) -> Json<MosqueSelection> {
    Json(MosqueSelection {
        slug: slug.to_string(),
    })
}

#[tokio::test]
async fn test_selection_validate_accepts_slug_before_index_loads() {
    let state = create_test_state(Arc::new(MemoryStore::default())).expect("state");
    let payload = MosqueSelection {
        slug: "central-mosque".to_string(),
    };

    assert!(payload.validate(&state).is_ok());
}

#[tokio::test]
async fn test_selection_validate_rejects_malformed_slug() {
    let state = create_test_state(Arc::new(MemoryStore::default())).expect("state");
    let payload = MosqueSelection {
        slug: "../secrets".to_string(),
    };

    let err = payload.validate(&state).unwrap_err();
    assert_eq!(
        err.to_string(),
        MosqueTimesError::from("Invalid mosque slug: ../secrets").to_string()
    );
}

#[tokio::test]
async fn test_select_mosque_success() {
    let state = create_test_state(Arc::new(MemoryStore::default())).expect("state");
    state.preferences.load_initial_data().await;

    let response =
        mosque_times::settings::select_mosque(State(state.clone()), selection("central-mosque"))
            .await;
    let (status, body) = into_parts(response).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Mosque selection saved");
    assert_eq!(
        state.preferences.selected_mosque().as_deref(),
        Some("central-mosque")
    );
}

#[tokio::test]
async fn test_select_mosque_empty_slug() {
    let state = create_test_state(Arc::new(MemoryStore::default())).expect("state");

    let response = mosque_times::settings::select_mosque(State(state.clone()), selection("")).await;
    let (status, body) = into_parts(response).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Error: Mosque slug cannot be empty");
    assert_eq!(state.preferences.selected_mosque(), None);
}

#[tokio::test]
async fn test_select_mosque_store_failure_keeps_previous_selection() {
    let state = create_test_state(Arc::new(FailingStore)).expect("state");
    state.preferences.load_initial_data().await;

    let response =
        mosque_times::settings::select_mosque(State(state.clone()), selection("central-mosque"))
            .await;
    let (status, body) = into_parts(response).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Failed to save mosque selection. Please try again.");
    assert_eq!(state.preferences.selected_mosque(), None);
}

#[tokio::test]
async fn test_clear_mosque() {
    let state = create_test_state(Arc::new(MemoryStore::default())).expect("state");
    state
        .preferences
        .set_selected_mosque("central-mosque")
        .await
        .expect("Failed to seed selection");

    let response = mosque_times::settings::clear_mosque(State(state.clone())).await;
    let (status, body) = into_parts(response).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Mosque selection cleared");
    assert_eq!(state.preferences.selected_mosque(), None);
}

#[tokio::test]
async fn test_save_theme_success() {
    let state = create_test_state(Arc::new(MemoryStore::default())).expect("state");

    let payload = ThemeUpdate {
        theme: "light".to_string(),
    };
    let response = mosque_times::settings::save_theme(State(state.clone()), Json(payload)).await;
    let (status, body) = into_parts(response).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Theme saved");
    assert_eq!(state.preferences.theme(), Theme::Light);
}

#[tokio::test]
async fn test_save_theme_invalid_value() {
    let state = create_test_state(Arc::new(MemoryStore::default())).expect("state");

    let payload = ThemeUpdate {
        theme: "sepia".to_string(),
    };
    let response = mosque_times::settings::save_theme(State(state.clone()), Json(payload)).await;
    let (status, body) = into_parts(response).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Error: Invalid theme: sepia");
    assert_eq!(state.preferences.theme(), Theme::Dark);
}

#[tokio::test]
async fn test_save_theme_store_failure() {
    let state = create_test_state(Arc::new(FailingStore)).expect("state");

    let payload = ThemeUpdate {
        theme: "light".to_string(),
    };
    let response = mosque_times::settings::save_theme(State(state.clone()), Json(payload)).await;
    let (status, body) = into_parts(response).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Failed to save theme. Please try again.");
    assert_eq!(state.preferences.theme(), Theme::Dark);
}

#[tokio::test]
async fn test_toggle_theme_returns_new_theme() {
    let state = create_test_state(Arc::new(MemoryStore::default())).expect("state");

    let response = mosque_times::settings::toggle_theme(State(state.clone())).await;
    let (status, body) = into_parts(response).await;
    assert_eq!(status, StatusCode::OK);
    let update: serde_json::Value = serde_json::from_str(&body).expect("Body is not JSON");
    assert_eq!(update["theme"], "light");

    let response = mosque_times::settings::toggle_theme(State(state.clone())).await;
    let (_, body) = into_parts(response).await;
    let update: serde_json::Value = serde_json::from_str(&body).expect("Body is not JSON");
    assert_eq!(update["theme"], "dark");
    assert_eq!(state.preferences.theme(), Theme::Dark);
}

#[tokio::test]
async fn test_settings_page_without_mosque() {
    let state = create_test_state(Arc::new(MemoryStore::default())).expect("state");
    state.preferences.load_initial_data().await;

    let response = mosque_times::settings::generate_settings(State(state)).await;
    let (status, body) = into_parts(response).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("No mosque selected"));
    assert!(body.contains("theme-dark"));
    assert!(body.contains("12hour"));
}

#[tokio::test]
async fn test_settings_page_falls_back_to_slug_when_offline() {
    let state = create_test_state(Arc::new(MemoryStore::default())).expect("state");
    state
        .preferences
        .set_selected_mosque("central-mosque")
        .await
        .expect("Failed to seed selection");

    let response = mosque_times::settings::generate_settings(State(state)).await;
    let (status, body) = into_parts(response).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("central-mosque"));
}
