use crate::config::Config;
use crate::error::{MosqueTimesError, Result};
use crate::feed::FeedService;
use crate::preferences::{FileStore, KeyValueStore, MemoryStore, Preferences};
use crate::{index, jummah, live, picker, settings};
use askama_axum::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;
use tracing::{debug, error, info};

const CACHE_MAINTENANCE_INTERVAL: Duration = Duration::from_secs(60);

/// State shared by every handler
pub struct AppState {
    pub config: Arc<RwLock<Config>>,
    pub preferences: Preferences,
    pub feed: FeedService,
    pub shutdown_token: CancellationToken,
}

impl AppState {
    /// Builds the state from `config`, choosing the preference store it names
    ///
    /// # Errors
    ///
    /// Returns an error if the feed client cannot be built
    pub fn new(config: Config, shutdown_token: CancellationToken) -> Result<Self> {
        let store: Arc<dyn KeyValueStore> = match &config.preferences_file {
            Some(path) => Arc::new(FileStore::new(path.clone())),
            None => Arc::new(MemoryStore::default()),
        };
        Self::with_store(config, store, shutdown_token)
    }

    /// Builds the state around an existing preference store
    ///
    /// # Errors
    ///
    /// Returns an error if the feed client cannot be built
    pub fn with_store(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        shutdown_token: CancellationToken,
    ) -> Result<Self> {
        Ok(Self {
            feed: FeedService::new(&config)?,
            preferences: Preferences::new(store),
            config: Arc::new(RwLock::new(config)),
            shutdown_token,
        })
    }

    /// Copy of the current configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration lock is poisoned
    pub fn config(&self) -> Result<Config> {
        self.config
            .read()
            .map(|config| config.clone())
            .map_err(|_| MosqueTimesError::from("Configuration read lock error"))
    }
}

/// Renders a page template, answering 500 if rendering fails
pub(crate) fn render_page<T: Template>(template: &T) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("Template rendering error: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Template rendering error").into_response()
        }
    }
}

/// Routes of the dashboard
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index::generate_index))
        .route("/mosques", get(picker::generate_picker))
        .route("/jummah", get(jummah::generate_jummah))
        .route("/settings", get(settings::generate_settings))
        .route("/api/mosques", get(picker::list_mosques))
        .route("/api/prayers", get(index::today_prayers))
        .route("/api/prayers/stream", get(live::prayer_stream))
        .route(
            "/api/mosque",
            post(settings::select_mosque).delete(settings::clear_mosque),
        )
        .route("/api/theme", post(settings::save_theme))
        .route("/api/theme/toggle", post(settings::toggle_theme))
        .route("/api/refresh", post(index::refresh))
        .nest_service("/static", ServeDir::new("static"))
        .with_state(state)
}

/// Run the web server on the specified port.
///
/// # Arguments
///
/// * `port` - The port number to bind the server to
/// * `config_path` - Configuration file; `None` uses `config.json5` if present
/// * `cancel_token` - Cancelling it shuts the server down gracefully
///
/// # Errors
///
/// Returns an error if:
/// - The configuration cannot be loaded
/// - The address string cannot be parsed into a valid `SocketAddr`
/// - The server fails to bind to the specified address
pub async fn run(
    port: u16,
    config_path: Option<PathBuf>,
    cancel_token: CancellationToken,
) -> Result<()> {
    tracing::info!("Initializing server");

    let config = Config::load(config_path.as_deref())?;
    let state = Arc::new(AppState::new(config, cancel_token.clone())?);
    state.preferences.load_initial_data().await;

    spawn_cache_maintenance(state.clone());

    let app = router(state);
    debug!("Routes configured");

    let address: SocketAddr = format!("0.0.0.0:{port}").parse()?;
    info!("Binding server to address: {address}");
    let listener = tokio::net::TcpListener::bind(address).await?;

    info!("Site launched on: http://{address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel_token.cancelled().await })
        .await
        .map_err(|e| {
            error!("Server error: {e}");
            MosqueTimesError::Generic(format!("Server error: {e}"))
        })?;

    info!("Server shutdown complete");
    Ok(())
}

fn spawn_cache_maintenance(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CACHE_MAINTENANCE_INTERVAL);
        loop {
            tokio::select! {
                () = state.shutdown_token.cancelled() => break,
                _ = interval.tick() => {
                    let evicted = state.feed.collect_garbage();
                    if evicted > 0 {
                        debug!("Evicted {evicted} idle cache entries");
                    }
                }
            }
        }
        debug!("Cache maintenance stopped");
    });
}
