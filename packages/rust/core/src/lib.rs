//! Pipeline orchestration for TrackTect.
//!
//! This crate sequences scraping, summarization, classification, landing
//! page watching, social collection, and knowledge-store publishing into a
//! single tracking run (see [`pipeline::Pipeline`]).

pub mod aggregator;
pub mod collaborators;
pub mod live;
pub mod llm;
pub mod notion;
pub mod pipeline;
pub mod publisher;
pub mod resolver;

pub use collaborators::Collaborators;
pub use pipeline::{Pipeline, PipelineInput, PipelineOptions, ProgressReporter, SilentProgress};
