//! Golden-example retrieval for the Mindhaven chat pipeline.
//!
//! Curated high-quality exchanges are loaded into a process-wide cache with
//! a refresh TTL and retrieved per turn by keyword-overlap scoring. This is
//! a deliberate low-cost design: no embeddings, and an *asymmetric*
//! coverage score (|Q∩T| / |Q|, not Jaccard) that favors candidates fully
//! covering the query's intent words over candidates merely sharing a few.

mod cache;
mod keywords;

pub use cache::{Clock, ExampleCache, SystemClock};
pub use keywords::{coverage_score, extract_keywords};
