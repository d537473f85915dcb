//! # Composition
//!
//! Builds the layered timeline of a short and drives the end-to-end
//! pipeline from asset selection to the final render.

pub mod compositor;
pub mod engine;
pub mod text;
pub mod timeline;

pub use compositor::Compositor;
pub use engine::ShortsEngine;
pub use timeline::{
    ColorBox, CropGeometry, LayerContent, NormalizedClip, Position, Segment, TextBlock, TimedLayer,
    Timeline,
};
