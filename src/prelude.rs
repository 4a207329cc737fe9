//! Convenient imports for invoscope.
//!
//! ```
//! use invoscope::prelude::*;
//!
//! let collector = Collector::new();
//! collector.insert(InvocationSequence::new(1, 1, 1, Timestamp::now()));
//! ```

// Main entry point
pub use crate::collector::{Collector, CollectorBuilder};
pub use crate::config::CollectorConfig;

// Error handling
pub use crate::error::{Error, Result};

// Records and queries
pub use invoscope_core::{
    fields, DetailTemplate, InvocationSequence, InvocationSummary, OverviewFilter,
    ResultComparator, SortDirection, SortKey, TimerData,
};

// Core types
pub use invoscope_core::{SensorTypeConfig, SpanIdent, Timestamp, ANY};

// Queries and trees
pub use invoscope_engine::{CancellationToken, InvocationTree, SpanDetails, SpanLookup};

// Remote calls
pub use invoscope_remote::{RemoteCallGateway, ServiceRef};
