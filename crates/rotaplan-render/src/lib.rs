//! # rotaplan-render
//!
//! Rendering backends for rotaplan schedules.
//!
//! Currently one renderer: [`IcsRenderer`], producing an RFC 5545 ICS
//! calendar with one all-day event per (physician, task) assignment.

mod ics;

pub use ics::IcsRenderer;

use thiserror::Error;

/// Rendering error
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
