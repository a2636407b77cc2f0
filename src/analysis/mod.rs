//! Request orchestration
//!
//! - [`resolver`] extracts the molecule from free text
//! - [`invoker`] runs one worker call through the cache, the shared pool and
//!   failure isolation
//! - [`scheduler`] fans the independent workers out and waits for all of them
//! - [`synthesis`] runs the dependent worker over a settled batch
//! - [`coordinator`] ties the stages together for one request

pub mod coordinator;
pub mod invoker;
pub mod resolver;
pub mod scheduler;
pub mod synthesis;

pub use coordinator::AnalysisCoordinator;
pub use invoker::{CachedInvoker, InvokerConfig};
pub use resolver::SubjectResolver;
pub use scheduler::{cache_params, FanOutScheduler, SettledBatch};
pub use synthesis::{presence_fingerprint, SynthesisStage};
