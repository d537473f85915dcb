//! # Shorts-Factory
//!
//! Assemble vertical short-form videos from a rotating pool of background
//! clips, a random music track, a fixed outro and two captions.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shorts_factory::{composition::ShortsEngine, config::Config};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = Config::default();
//! let engine = ShortsEngine::new(config);
//! engine
//!     .run(
//!         "Dogs can smell your feelings.",
//!         "Fear and stress change your scent.",
//!         "quote_1700000000.mp4".as_ref(),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`video`] - Asset selection, media handles, probing and rendering
//! - [`composition`] - Timeline layout and the end-to-end engine
//! - [`audio`] - Fitting music to the composed duration
//! - [`state`] - The persisted background rotation cursor
//! - [`content`] - Caption generation, fact log and publishing
//! - [`config`] - Configuration management
//!
//! Only one run may use a background directory at a time: the rotation
//! cursor file is not locked.

pub mod audio;
pub mod composition;
pub mod config;
pub mod content;
pub mod error;
pub mod state;
pub mod video;

// Re-export commonly used types for convenience
pub use crate::{
    composition::ShortsEngine,
    config::Config,
    content::ShortsFactory,
    error::{Result, ShortsError},
};
