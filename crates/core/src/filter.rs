//! Overview filter and detail template
//!
//! [`OverviewFilter`] is the single filter shape behind every overview query.
//! Fields left at their defaults mean "any". The narrower constructors mirror
//! the historical query signatures and only populate a subset of the fields.
//!
//! All populated predicates are conjunctive. In particular a non-zero
//! `platform_id` combined with an explicit `ids` set only matches ids that
//! also belong to that platform.

use crate::error::QueryError;
use crate::record::InvocationSequence;
use crate::types::{
    ApplicationId, BusinessTransactionId, InvocationId, MethodId, PlatformId, SensorTypeId,
    Timestamp, TraceId, ANY,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Filter consumed by overview queries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverviewFilter {
    /// Platform to search (0 = all platforms)
    pub platform_id: PlatformId,
    /// Method to match
    pub method_id: Option<MethodId>,
    /// Inclusive lower time bound
    pub from: Option<Timestamp>,
    /// Inclusive upper time bound
    pub to: Option<Timestamp>,
    /// Explicit id set to search within
    pub ids: Option<BTreeSet<InvocationId>>,
    /// Only ids greater than or equal to this bound
    pub min_id: Option<InvocationId>,
    /// Business transaction (0 = any)
    pub business_transaction_id: BusinessTransactionId,
    /// Application (0 = any)
    pub application_id: ApplicationId,
    /// Trace correlation key
    pub trace_id: Option<TraceId>,
}

impl OverviewFilter {
    /// Filter matching everything
    pub fn any() -> Self {
        Self::default()
    }

    /// All invocations of one platform
    pub fn platform(platform_id: PlatformId) -> Self {
        Self {
            platform_id,
            ..Self::default()
        }
    }

    /// Invocations of one method on one platform
    pub fn method(platform_id: PlatformId, method_id: MethodId) -> Self {
        Self {
            platform_id,
            method_id: Some(method_id),
            ..Self::default()
        }
    }

    /// Invocations with the given ids (platform 0 = any)
    pub fn ids<I>(platform_id: PlatformId, ids: I) -> Self
    where
        I: IntoIterator<Item = InvocationId>,
    {
        Self {
            platform_id,
            ids: Some(ids.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Restrict to an inclusive time range (either bound optional)
    pub fn between(mut self, from: Option<Timestamp>, to: Option<Timestamp>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    /// Restrict to ids at or above `min_id`
    pub fn min_id(mut self, min_id: InvocationId) -> Self {
        self.min_id = Some(min_id);
        self
    }

    /// Restrict to a business context (0 = any for either id)
    pub fn business_context(
        mut self,
        application_id: ApplicationId,
        business_transaction_id: BusinessTransactionId,
    ) -> Self {
        self.application_id = application_id;
        self.business_transaction_id = business_transaction_id;
        self
    }

    /// Restrict to one trace
    pub fn trace(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    /// Reject filters that cannot match by construction
    ///
    /// Runs before any scan.
    pub fn validate(&self) -> Result<(), QueryError> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(QueryError::inverted_range(from, to));
            }
        }
        Ok(())
    }

    /// Whether the record satisfies every populated predicate
    pub fn matches(&self, record: &InvocationSequence) -> bool {
        if self.platform_id != ANY && record.platform_id != self.platform_id {
            return false;
        }
        if let Some(method_id) = self.method_id {
            if record.method_id != method_id {
                return false;
            }
        }
        if let Some(from) = self.from {
            if record.timestamp < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if record.timestamp > to {
                return false;
            }
        }
        if let Some(ids) = &self.ids {
            if !ids.contains(&record.id) {
                return false;
            }
        }
        if let Some(min_id) = self.min_id {
            if record.id < min_id {
                return false;
            }
        }
        if self.business_transaction_id != ANY
            && record.business_transaction_id != self.business_transaction_id
        {
            return false;
        }
        if self.application_id != ANY && record.application_id != self.application_id {
            return false;
        }
        if let Some(trace_id) = self.trace_id {
            if record.trace_id != trace_id {
                return false;
            }
        }
        true
    }
}

/// Exact-match template for detail lookups
///
/// Platform, sensor type and method must all match. When `id` is set only
/// that record is considered; otherwise the most recently inserted match is
/// returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailTemplate {
    /// Platform the record belongs to
    pub platform_id: PlatformId,
    /// Sensor type that produced it
    pub sensor_type_id: SensorTypeId,
    /// Instrumented method
    pub method_id: MethodId,
    /// Specific record id, if known
    pub id: Option<InvocationId>,
}

impl DetailTemplate {
    /// Template without a specific id
    pub fn new(platform_id: PlatformId, sensor_type_id: SensorTypeId, method_id: MethodId) -> Self {
        Self {
            platform_id,
            sensor_type_id,
            method_id,
            id: None,
        }
    }

    /// Pin the template to one record id
    pub fn with_id(mut self, id: InvocationId) -> Self {
        self.id = Some(id);
        self
    }

    /// Whether the record matches platform, sensor type, method (and id)
    pub fn matches(&self, record: &InvocationSequence) -> bool {
        record.platform_id == self.platform_id
            && record.sensor_type_id == self.sensor_type_id
            && record.method_id == self.method_id
            && self.id.map_or(true, |id| record.id == id)
    }
}

impl From<&InvocationSequence> for DetailTemplate {
    /// Template identifying exactly the given (inserted) record
    fn from(record: &InvocationSequence) -> Self {
        DetailTemplate::new(record.platform_id, record.sensor_type_id, record.method_id)
            .with_id(record.id)
    }
}
