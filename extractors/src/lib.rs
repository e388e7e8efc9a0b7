//! Extractors Crate
//!
//! Turns unstructured BNPL provider notifications into normalized payment
//! items. Input is plain text (markup already stripped by the caller); the
//! crate performs no I/O.
//!
//! # Architecture
//!
//! - **Types**: `Item`, `Issue` and `ExtractionResult` live in the `shared-types` crate
//! - **Providers**: ordered registry of per-provider pattern tables
//! - **Dates**: strict multi-format parsing anchored to an IANA timezone
//! - **Orchestration**: batch extraction, deduplication, suspicious-date flags
//!
//! # Example
//!
//! ```rust,ignore
//! use extractors::{extract_items, ExtractionOptions};
//!
//! let result = extract_items(&emails, "America/New_York", &ExtractionOptions::default());
//! for issue in &result.issues {
//!     eprintln!("{}: {}", issue.id, issue.reason);
//! }
//! ```

pub mod date_parser;
pub mod extractor;
pub mod orchestrator;
pub mod providers;
pub mod redact;

// Re-export commonly used types
pub use date_parser::{is_suspicious, parse, parse_timezone, DateParser};
pub use extractor::{FieldError, FieldExtractor, FieldMatches};
pub use orchestrator::{dedupe_items, detect_locale, extract_items, ExtractionOptions};
pub use providers::{Money, PaymentProvider, Provider, ProviderRegistry};
pub use redact::redact_snippet;

// Re-export the pipeline types from shared-types for convenience
pub use shared_types::{DateError, DateLocale, ExtractionResult, Issue, Item};
