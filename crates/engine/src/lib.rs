//! Query execution and trace correlation for invoscope
//!
//! - [`QueryEngine`]: overview and detail queries over a shared
//!   [`TraceBuffer`](invoscope_storage::TraceBuffer)
//! - [`ScanPlan`]: narrowest-index selection for an overview filter
//! - [`CancellationToken`]: cooperative cancellation of long scans
//! - [`TraceCorrelator`]: presentation trees over hydrated records

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cancel;
pub mod correlator;
pub mod plan;
pub mod query;

pub use cancel::CancellationToken;
pub use correlator::{InvocationTree, NodeId, SpanDetails, SpanLookup, TraceCorrelator, TreeNode};
pub use plan::{IndexScan, ScanPlan, ShardScope};
pub use query::{QueryEngine, DEFAULT_CHECK_INTERVAL};
