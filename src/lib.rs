//! # Mosque Times Library
//!
//! This library provides the core functionality for the mosque times dashboard.
//! The dashboard shows the daily prayer times a mosque publishes to a static
//! JSON feed, marks which prayer is upcoming, current or passed, counts down
//! to the next one and lists this week's Friday (Jummah) prayers.
//!
//! ## Overview
//!
//! - `config`: Handles application configuration
//! - `error`: Defines custom error types for consistent error handling
//! - `utils`: Formats feed times and dates for display
//! - `status`: Classifies prayers against the clock and computes countdowns
//! - `feed`: Fetches the mosque index and timings from the feed
//! - `cache`: Caches fetched data per request key
//! - `preferences`: Persists the selected mosque and theme
//! - `schedule`: Builds today's prayer rows and the week's Jummah slots
//! - `index`, `picker`, `jummah`, `settings`: Pages and API handlers
//! - `live`: Streams status updates to open pages
//! - `server`: Runs the web server and manages routes
//!
//! ## Getting Started
//!
//! ```no_run
//! use mosque_times::{config::CONFIG_FILE, server};
//! use std::path::PathBuf;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), mosque_times::error::MosqueTimesError> {
//!     let cancel_token = CancellationToken::new();
//!     let config_path = Some(PathBuf::from(CONFIG_FILE));
//!
//!     server::run(3000, config_path, cancel_token).await
//! }
//! ```
//!
//! The formatting and status helpers are plain functions and can be used on
//! their own:
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use mosque_times::status::{prayer_status_at, time_until_at, PrayerStatus};
//! use mosque_times::utils::format_time;
//!
//! let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
//! assert_eq!(prayer_status_at("12:10", None, &now), PrayerStatus::CurrentSoon);
//! assert_eq!(time_until_at("15:00", &now), "3h 0m");
//! assert_eq!(format_time("15:00", false, false), "03:00 PM");
//! ```

/// Custom error types module
///
/// Defines the `MosqueTimesError` enum used across the application.
pub mod error;

/// Configuration management module
///
/// Loads settings from a JSON5 file and validates them.
pub mod config;

/// Time and date formatting helpers
pub mod utils;

/// Prayer status classification and countdowns
pub mod status;

/// Feed data model and HTTP client
pub mod feed;

/// Keyed cache with staleness windows and subscriptions
pub mod cache;

/// Selected mosque and theme persistence
pub mod preferences;

/// Prayer rows and weekly Jummah selection
pub mod schedule;

/// Prayer times page
pub mod index;

/// Mosque picker page
pub mod picker;

/// Jummah page
pub mod jummah;

/// Settings page and preference API
pub mod settings;

/// Live status stream
pub mod live;

/// Server operations module
///
/// Contains the Axum router, shared state and the server lifecycle.
pub mod server;
