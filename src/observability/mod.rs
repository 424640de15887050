//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Flow orchestrator and chain client produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges via the metrics facade)
//!
//! Consumers:
//!     → Log output (stderr, filtered by EnvFilter)
//!     → Whatever metrics recorder the host application installs
//! ```
//!
//! # Design Decisions
//! - Every log line carries the flow id and generation when emitted by a flow
//! - Metrics are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
