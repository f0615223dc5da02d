//! Processor pipeline for fetch repositories.
//!
//! Every add, update and delete runs through two stages: a pre-stage that
//! may veto the operation before storage is touched, and a post-stage that
//! observes the committed result. Each stage invokes its registered
//! [`Processor`]s in order, handing them a stage-specific [`EntityPackage`].
//!
//! # Quick Start
//!
//! ```rust
//! use fetch_processors::{
//!     GuardProcessor, EntityPackage, PipelineConfig, ProcessorPipeline, ProcessorRegistry, Stage,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! # tokio_test_block(async {
//! let registry = ProcessorRegistry::new().with(
//!     Stage::Deleting,
//!     GuardProcessor::new("no-admin", |p: &EntityPackage<'_, String>| {
//!         if p.entity() == "admin" { Err("admin is protected".into()) } else { Ok(()) }
//!     }),
//! );
//! let pipeline = ProcessorPipeline::new(&registry, PipelineConfig::default());
//! let report = pipeline
//!     .deleting(&"admin".to_string(), &CancellationToken::new())
//!     .await
//!     .unwrap();
//! assert!(report.is_cancelled());
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod processors;
pub mod registry;
pub mod stage;

// Re-exports for convenience.
pub use config::PipelineConfig;
pub use error::{ProcessorError, ProcessorResult};
pub use pipeline::{PipelineOutcome, PipelineReport, ProcessorPipeline};
pub use processors::audit::{AuditEntry, AuditProcessor, AuditTrail};
pub use processors::guard::GuardProcessor;
pub use registry::{ProcessorProvider, ProcessorRegistry};
pub use stage::{EntityPackage, Processor, ProcessorDecision, ProcessorRecord, Stage};
