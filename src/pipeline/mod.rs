//! The artifact relay pipeline.
//!
//! ```text
//! upload body ──> demux ──> aggregator (per check suite)
//!                                │ suite completed
//!                                v
//!                 manifest resolver (per job, via job log)
//!                                │
//!                                v
//!                 publisher (per artifact x target) ──> report (per suite)
//! ```
//!
//! Failures are isolated at each stage's own granularity: a bad upload is
//! rejected on its request, a bad job is skipped within its suite, a bad
//! storage target is skipped for that artifact only.

/// Upload admission and suite lookup
pub mod admission;

/// Per-suite buffering of accepted uploads
pub mod aggregator;

/// Splitting an upload body into hashed artifacts
pub mod demux;

/// Manifest extraction and hash-to-filename resolution
pub mod manifest;

/// Fan-out of resolved artifacts to storage targets
pub mod publisher;

/// Consolidated URL report
pub mod report;

/// Processing of a drained suite batch
pub mod suite;

/// Storage path templates
pub mod template;

pub use admission::{resolve_suite, UploadGate};
pub use aggregator::SuiteAggregator;
pub use demux::{checked_total, demultiplex, StreamDemultiplexer};
pub use manifest::{Manifest, ManifestEntry, ManifestResolver};
pub use publisher::{PublisherRegistry, StorageBackend, StoragePublisher};
pub use report::{PublishReport, ReportAggregator};
pub use suite::{JobOutcome, SuiteProcessor, SuiteSummary};
