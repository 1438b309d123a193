//! MLB player metrics service
//!
//! Player lookups and Statcast pitch data over HTTP, plus a swing-outcome
//! classifier trained and served in-process.
//!
//! ## Architecture
//!
//! ```text
//! Stats API / Savant → client::StatsProvider → api (axum) ← metrics
//!                                               ↓
//!          ml: FeatureSelector → DatasetSplitter → Pipeline → ModelRegistry
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod ml;
pub mod types;
