//! Cache simulation sweeps and the hit-rate analysis of their result tables:
//! selection, first-occurrence deduplication, chart ordering and summary.

pub mod cache;
pub mod charts;
pub mod error;
pub mod experiments;
pub mod pipeline;
pub mod render;
pub mod results;
pub mod summary;
pub mod trace;
