//! clearread - article retrieval through paywalls, bot walls and client-side
//! rendering.
//!
//! A [`Retriever`] escalates through acquisition strategies (direct fetch,
//! an external reader proxy, a headless browser and the public archive),
//! cleans every page with the [`ContentExtractor`] and returns the first
//! result the [`QualityGate`] accepts.

pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod http_client;
pub mod identity;
pub mod models;
pub mod orchestrator;
pub mod quality;
pub mod strategies;

pub use config::{Config, StepPolicy};
pub use error::{AcquisitionError, AttemptFailure, AttemptReport, RetrieveError, SetupError};
pub use extract::{ContentExtractor, ExtractedContent};
pub use models::{AcquisitionOutcome, Method, RetrievalRequest, RetrievalResult};
pub use orchestrator::{Retriever, RetrieverBuilder};
pub use quality::{QualityGate, QualityPolicy, Rejection};
pub use strategies::Strategy;
