//! Starforge CLI library.
//!
//! Argument handling, logging setup and summary formatting for the
//! `starforge` binary. Rendering itself lives in `starforge-lib`.

pub mod commands;
pub mod logging;
pub mod output;
pub mod terminal;
