//! The three pipeline drivers (§4.G): `batch_enrichment`, `csv_import`, `shelf_scan`.
//! Each composes `shelfscribe_enrich`/`shelfscribe_providers` with a `SessionHandle` to
//! drive one job from acceptance to a terminal state, catching every error at its own
//! top frame and converting it into `SendError` + `FailJobState` (§7).

pub mod batch_enrichment;
pub mod collaborators;
pub mod csv_import;
mod error;
mod fault;
pub mod shelf_scan;
pub mod validate;

pub use collaborators::{BlobStore, ImageScanner, LlmProvider, ParsedBookCandidate, ScannedBook};
pub use error::DriverError;
