//! Ingestion sources for issuer financials and news sentiment.
//!
//! Every source implements [`credit_core::DataSource`]; the pipeline never
//! knows whether it is reading the built-in stub, a fixed batch or a JSON
//! snapshot on disk.

pub mod snapshot;
pub mod stub;

pub use snapshot::{JsonSnapshotSource, StaticSource};
pub use stub::StubDataSource;
