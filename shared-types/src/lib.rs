//! Shared data model for the payplan BNPL pipeline.
//!
//! Every stage of the pipeline (extraction, business-day shifting, risk
//! detection, calendar export) consumes and produces the types defined here.
//! They are serde-serializable so the UI and storage layers can persist them,
//! and they derive `TS` so `generate_api_types` can emit matching TypeScript.

pub mod extraction;
pub mod payment;
pub mod risk;

pub use extraction::{DateError, DateLocale, ExtractionResult, Issue};
pub use payment::{Item, MovedDate, ShiftReason};
pub use risk::{Risk, RiskType, Severity};

