//! Steam shortcut management for cloud-gaming kiosk pages.
//!
//! The binary is a thin shell over these modules; other front-ends can drive
//! the same store, launch builder and batch importer directly.

pub mod batch;
pub mod cli;
pub mod commands;
pub mod config;
pub mod host;
pub mod launch;
pub mod paths;
pub mod shortcuts;
pub mod ui;
