//! # Is It Safe?
//!
//! A Telegram bot that looks up food products by barcode and checks their
//! ingredient list against each user's personal blacklist.
//!
//! The analysis engine ([`text_processing`], [`analyzer`]) is pure and has no
//! I/O. Blacklist persistence and product lookup sit behind the
//! [`blacklist::BlacklistStore`] and [`lookup::ProductLookup`] traits.

pub mod analyzer;
pub mod blacklist;
pub mod bot;
pub mod cache;
pub mod circuit_breaker;
pub mod config;
pub mod db;
pub mod deduplication;
pub mod dialogue;
pub mod errors;
pub mod file_store;
pub mod localization;
pub mod lookup;
pub mod observability;
pub mod observability_config;
pub mod product;
pub mod text_processing;
pub mod validation;

// Re-export types for easier access
pub use analyzer::{analyze, extract_ingredients, is_safe_quick, AnalysisResult};
pub use blacklist::{BlacklistItem, BlacklistStore};
pub use lookup::{LookupError, ProductLookup};
pub use product::ProductRecord;
pub use text_processing::{matches, normalize};
