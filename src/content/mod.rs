//! # Content
//!
//! Caption generation, the fact log, publishing and the run-once factory
//! that ties them to the render pipeline.

pub mod facts;
pub mod factory;
pub mod generator;
pub mod publish;

pub use facts::{FactRecord, FactStore, JsonlFactStore};
pub use factory::{output_file_name, RunReport, RunStatus, ShortsFactory};
pub use generator::{generate_unique, CaptionPair, ContentGenerator, FixedContent};
pub use publish::{build_publish_request, merge_tags, PublishRequest, PublishedVideo, Publisher, Visibility};
