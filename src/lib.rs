//! ScalerKit - upscaler and frame-generation mod manager
//!
//! Library crate shared by the CLI and any other front end: game discovery,
//! transactional install/uninstall, INI options, version tracking and (behind
//! the `updater` feature) the release updater.

#[macro_use]
pub mod paths;

pub mod config;
pub mod error;
pub mod game_finder;
pub mod ini;
pub mod installers;
pub mod logging;
pub mod manager;
pub mod mod_source;
pub mod utils;
pub mod version;

#[cfg(feature = "updater")]
pub mod archive;
#[cfg(feature = "updater")]
pub mod github;
#[cfg(feature = "updater")]
pub mod updater;

pub use error::{Result, ScalerError};
pub use manager::ModManager;
