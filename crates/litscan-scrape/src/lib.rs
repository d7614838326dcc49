//! litscan-scrape: Term co-occurrence counting and article harvesting against
//! the E-utilities literature search service.
//!
//! - Request target construction (einfo / esearch / efetch)
//! - Remote client with a scoped, throttled session
//! - Term group registries for the A and B dimensions
//! - Co-occurrence sweep with square-mode symmetry
//! - Cursor-paged article retrieval into per-term accumulators
//! - Field extraction from article XML
//! - Storage of finished results

pub mod articles;
pub mod counts;
pub mod document;
pub mod extract;
pub mod matrix;
pub mod query;
pub mod requester;
pub mod scraper;
pub mod store;
pub mod summary;
pub mod terms;
pub mod text;
pub mod urls;
pub mod words;

pub use litscan_common::{LitscanError, Result};
