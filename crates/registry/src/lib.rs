//! Sensor type registration for invoscope
//!
//! Agents register each instrumentation point (class name plus parameter
//! signature) once per platform and receive a stable id. The
//! [`RegistrationTable`] makes that idempotent under concurrent callers.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod table;

pub use table::RegistrationTable;
