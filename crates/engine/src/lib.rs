//! The generation engine: turn state machine, retry orchestration, key
//! rotation, quotas, cancellation, and stream metrics.
//!
//! `sw-providers` knows how to talk to each provider; this crate decides
//! when to talk to them, how many times, with which key, and what happens
//! to the chunks that come back.

pub mod accum;
pub mod keys;
pub mod metrics;
pub mod ops;
pub mod orchestrator;
pub mod quota;
pub mod traits;
pub mod turn;

pub use accum::ToolCallAccumulator;
pub use keys::KeyPool;
pub use metrics::{MetricsAggregator, MetricsSweeper};
pub use ops::{CancelToken, OperationRegistry};
pub use orchestrator::{ClientRegistry, Orchestrator};
pub use quota::QuotaTracker;
pub use traits::{ApiKey, KeyManager, NotificationSink, NullSink, QuotaService, ToolExecutor};
pub use turn::{TurnEngine, TurnOutcome};
