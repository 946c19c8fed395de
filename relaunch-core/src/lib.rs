//! relaunch core library: settings model, configuration file, errors.
//!
//! - [`config`]: `relaunch.json` schema and loader
//! - [`settings`]: validated [`Settings`] with defaults applied
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod settings;

pub use config::{ConfigFile, CONFIG_FILE_NAME};
pub use error::ConfigError;
pub use settings::{Extension, Settings, DEFAULT_DEBOUNCE, DEFAULT_EXTENSION, VCS_DIR};
