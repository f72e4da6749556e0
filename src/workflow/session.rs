use crate::address::LocationCoordinate;
use crate::equipment::EquipmentRecord;
use crate::lifecycle::{self, EquipmentAction, LifecycleState};
use crate::telemetry::generate_correlation_id;

/// Context for one unit open in the rack view: the coordinate it was
/// looked up at plus the working copy of its record.
///
/// The working copy is read-only between requests. After a successful
/// mutating request the coordinator reloads it from the backend; after
/// a failed one the session is exactly as it was before the call.
///
/// Each session carries a correlation id so every log line emitted for
/// the same open unit can be tied together.
#[derive(Debug, Clone)]
pub struct WorkflowSession {
    coordinate: LocationCoordinate,
    record: EquipmentRecord,
    correlation_id: String,
}

impl WorkflowSession {
    pub fn new(coordinate: LocationCoordinate, record: EquipmentRecord) -> Self {
        Self {
            coordinate,
            record,
            correlation_id: generate_correlation_id(),
        }
    }

    pub fn coordinate(&self) -> &LocationCoordinate {
        &self.coordinate
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn record(&self) -> &EquipmentRecord {
        &self.record
    }

    /// Lifecycle state of the working copy, classified on demand so it
    /// can never drift from the record.
    pub fn state(&self) -> LifecycleState {
        lifecycle::classify(&self.record)
    }

    /// Actions the rack view should offer right now.
    pub fn actions(&self) -> Vec<EquipmentAction> {
        lifecycle::available_actions(&self.record)
    }

    pub(crate) fn replace_record(&mut self, record: EquipmentRecord) {
        self.record = record;
    }
}
