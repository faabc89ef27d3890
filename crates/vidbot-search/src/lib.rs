//! Resilient search across interchangeable video mirrors.
//!
//! This crate provides:
//! - Latency-based backend selection with a sticky cached choice
//! - A mirror HTTP client with explicit timeouts and request metrics
//! - A tolerant decoder for heterogeneous result shapes
//! - The search aggregator: cursor pagination, id dedup, relaxed-filter fallback

pub mod aggregator;
pub mod client;
pub mod config;
pub mod decode;
pub mod error;
pub mod metrics;
pub mod selector;


pub use aggregator::SearchAggregator;
pub use client::{MirrorClient, SearchFilter};
pub use config::SearchConfig;
pub use decode::{parse_duration, parse_view_count, DecodedPage, ItemParseError, StreamInfo};
pub use error::{SearchError, SearchResult};
pub use selector::{pick_fastest, Backend, BackendHandle, BackendSelector};
