//! `payadj-recon`: payroll adjustment reconciliation engine.
//!
//! Pure engine crate: receives ingested records and a [`ReferenceStore`],
//! returns re-sheeted output records plus a summary. No file or database IO.
//!
//! Pipeline: normalize → dedup → resolve (active employees, grade code) →
//! group (payclass → store) → rates → amount → assemble.

pub mod amount;
pub mod assemble;
pub mod config;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod group;
pub mod model;
pub mod normalize;
pub mod rates;
pub mod resolve;
pub mod store;

pub use config::AdjustmentConfig;
pub use engine::run;
pub use error::{AdjustError, ErrorKind, RecordDetail};
pub use model::{AdjustmentResult, OutputRecord, OutputSheet, RawRecord, Summary, Value};
pub use store::{MemoryStore, ReferenceStore, StoreError};
