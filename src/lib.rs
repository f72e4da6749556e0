// Rackflow Library - Equipment Lifecycle & RMA Coordination
// This exposes the core components for testing and integration

pub mod address;
pub mod config;
pub mod equipment;
pub mod gateway;
pub mod lifecycle;
pub mod telemetry;
pub mod validation;
pub mod workflow;

// Re-export key types for easy access
pub use address::{ContainerSide, DisplayAddress, LocationCoordinate};
pub use config::{config, init_config, RackflowConfig};
pub use equipment::{EquipmentRecord, FaultCategory, ProcessState};
pub use gateway::{BackendClient, EquipmentStore, GatewayError, SearchOutcome};
pub use lifecycle::{EquipmentAction, LabAction, LabPhase, LifecycleState};
pub use telemetry::{create_workflow_span, generate_correlation_id, init_telemetry};
pub use validation::{FieldId, RmaForm, ValidationOutcome};
pub use workflow::{
    DiagnosisOutcome, LookupOutcome, WorkflowCoordinator, WorkflowError, WorkflowSession,
};
pub use workflow::requests::{
    ConciliationTarget, DiagnosisResolution, ScrapKind, WorkflowRequest,
};
