//! # Invoscope
//!
//! In-memory invocation sequence repository for APM collectors.
//!
//! Agents register their sensor types and stream nested call-tree records
//! (invocation sequences) into a bounded, per-platform buffer. Presentation
//! and automation callers query that buffer through overview and detail
//! queries, and build call trees or cross-platform trace forests from the
//! results.
//!
//! ## Quick Start
//!
//! ```
//! use invoscope::prelude::*;
//!
//! let collector = Collector::new();
//!
//! // Ingestion
//! for ms in [100, 200, 300] {
//!     collector.insert(InvocationSequence::new(1, 10, 1, Timestamp::from_millis(ms)));
//! }
//!
//! // Newest first by default
//! let rows = collector.overview(&OverviewFilter::platform(1), Some(2), None)?;
//! assert_eq!(rows[0].timestamp, Timestamp::from_millis(300));
//!
//! // Agent-side registration through the gateway
//! let service = collector.service();
//! let sensor = collector.gateway().register_sensor_type(
//!     &service,
//!     1,
//!     &SensorTypeConfig::new("com.foo.Bar", ["int", "string"]),
//! )?;
//! assert!(sensor > 0);
//! # Ok::<(), invoscope::Error>(())
//! ```
//!
//! ## Crates
//!
//! - `invoscope-core`: records, filters, comparators, layer errors
//! - `invoscope-storage`: the trace buffer
//! - `invoscope-registry`: sensor type registrations
//! - `invoscope-engine`: query engine and trace correlator
//! - `invoscope-remote`: agent-side remote call gateway

#![warn(missing_docs)]

mod collector;
mod config;
mod error;
mod service;

pub mod prelude;

pub use collector::{Collector, CollectorBuilder};
pub use config::{CollectorConfig, ConfigError};
pub use error::{Error, Result};
pub use service::CollectorService;
