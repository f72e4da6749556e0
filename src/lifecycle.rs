// Lifecycle State Machine - classification and admissibility
//
// The backend is the sole writer of persisted state; this module only
// reads a record and answers two questions: which of the six lifecycle
// states is the unit in, and which actions may legally be requested
// from that state. Classification is an explicit ordered predicate
// list, so precedence is never implicit.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::equipment::{EquipmentRecord, ProcessState};

/// The six lifecycle states a racked unit can occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    Operational,
    /// A fault is recorded but no RMA has been opened.
    Diagnosed,
    /// RMA opened, or the unit is already routed through the lab.
    InRma,
    /// Locked: a transfer request awaits coordinator approval.
    PendingTransfer,
    /// Locked: a part conciliation is in progress.
    Reconciling,
    /// Terminal. Not re-enterable through this coordinator.
    Scrapped,
}

impl LifecycleState {
    /// Locked states offer informational display only.
    pub fn is_locked(&self) -> bool {
        matches!(
            self,
            LifecycleState::PendingTransfer | LifecycleState::Reconciling
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Scrapped)
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LifecycleState::Operational => "operational",
            LifecycleState::Diagnosed => "diagnosed",
            LifecycleState::InRma => "in-rma",
            LifecycleState::PendingTransfer => "pending-transfer",
            LifecycleState::Reconciling => "reconciling",
            LifecycleState::Scrapped => "scrapped",
        };
        write!(f, "{name}")
    }
}

/// Classify a record into exactly one lifecycle state.
///
/// Predicates are evaluated in order; the first match wins. A record
/// with both a diagnosis detail and `pendiente_traslado` is therefore
/// `PendingTransfer`, never `InRma`.
pub fn classify(record: &EquipmentRecord) -> LifecycleState {
    match record.process_state() {
        ProcessState::TransferPending => return LifecycleState::PendingTransfer,
        ProcessState::Reconciling => return LifecycleState::Reconciling,
        ProcessState::Retired | ProcessState::PartsDonor => return LifecycleState::Scrapped,
        ProcessState::InLab | ProcessState::InRepair => return LifecycleState::InRma,
        ProcessState::Operational
        | ProcessState::LabStock
        | ProcessState::PlacementPending
        | ProcessState::Vacant => {}
    }
    if record.has_diagnosis_detail() {
        LifecycleState::InRma
    } else if record.has_recorded_fault() {
        LifecycleState::Diagnosed
    } else {
        LifecycleState::Operational
    }
}

/// Actions available from the rack view. Scrap is lab-only and lives
/// with `LabAction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EquipmentAction {
    SubmitDiagnosis,
    SubmitRma,
    CancelRma,
    RequestTransfer,
    RequestConciliation,
}

impl std::fmt::Display for EquipmentAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EquipmentAction::SubmitDiagnosis => "submit-diagnosis",
            EquipmentAction::SubmitRma => "submit-rma",
            EquipmentAction::CancelRma => "cancel-rma",
            EquipmentAction::RequestTransfer => "request-transfer",
            EquipmentAction::RequestConciliation => "request-conciliation",
        };
        write!(f, "{name}")
    }
}

/// Why an action was refused locally, before any request went out.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionRefused {
    #[error("equipment is locked ({state}); only informational display is available")]
    Locked { state: LifecycleState },
    #[error("equipment is scrapped; no further transitions are modeled")]
    Scrapped,
    #[error("cancel refused: a transfer request is still pending; resolve it first")]
    TransferStillPending,
    #[error("a transfer request is already pending for this unit")]
    TransferAlreadyPending,
    #[error("{action} is not admissible from state {state}")]
    NotAdmissible {
        action: EquipmentAction,
        state: LifecycleState,
    },
}

/// Actions the current record admits, in presentation order.
pub fn available_actions(record: &EquipmentRecord) -> Vec<EquipmentAction> {
    use EquipmentAction::*;
    match classify(record) {
        LifecycleState::Operational | LifecycleState::Diagnosed => {
            vec![SubmitDiagnosis, SubmitRma, RequestConciliation]
        }
        LifecycleState::InRma => {
            let mut actions = Vec::new();
            if !record.pending_transfer {
                actions.push(CancelRma);
                actions.push(RequestTransfer);
            }
            actions.push(RequestConciliation);
            actions
        }
        LifecycleState::PendingTransfer
        | LifecycleState::Reconciling
        | LifecycleState::Scrapped => Vec::new(),
    }
}

/// Check a single action against the current record. This is the local
/// gate every orchestrator call runs before dispatching a request.
pub fn authorize(action: EquipmentAction, record: &EquipmentRecord) -> Result<(), ActionRefused> {
    let state = classify(record);
    if state.is_locked() {
        return Err(ActionRefused::Locked { state });
    }
    if state.is_terminal() {
        return Err(ActionRefused::Scrapped);
    }
    match (action, state) {
        (EquipmentAction::SubmitDiagnosis, LifecycleState::Operational)
        | (EquipmentAction::SubmitDiagnosis, LifecycleState::Diagnosed)
        | (EquipmentAction::SubmitRma, LifecycleState::Operational)
        | (EquipmentAction::SubmitRma, LifecycleState::Diagnosed) => Ok(()),
        (EquipmentAction::CancelRma, LifecycleState::InRma) => {
            if record.pending_transfer {
                Err(ActionRefused::TransferStillPending)
            } else {
                Ok(())
            }
        }
        (EquipmentAction::RequestTransfer, LifecycleState::InRma) => {
            if record.pending_transfer {
                Err(ActionRefused::TransferAlreadyPending)
            } else {
                Ok(())
            }
        }
        // Conciliation opens from any non-locked, non-terminal state.
        (EquipmentAction::RequestConciliation, _) => Ok(()),
        (action, state) => Err(ActionRefused::NotAdmissible { action, state }),
    }
}

/// Where a unit sits inside the lab once it has been routed there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabPhase {
    /// Arrived, waiting on the intake queue.
    Queued,
    /// On the workbench.
    InRepair,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabAction {
    Intake,
    Complete,
    Scrap,
}

/// Lab phase of a record, if it is in the lab queue at all.
pub fn lab_phase(record: &EquipmentRecord) -> Option<LabPhase> {
    match record.process_state() {
        ProcessState::InLab => Some(LabPhase::Queued),
        ProcessState::InRepair => Some(LabPhase::InRepair),
        _ => None,
    }
}

/// Intake moves Queued -> InRepair; completion returns InRepair units
/// to stock; scrap is allowed from either phase.
pub fn authorize_lab(action: LabAction, phase: LabPhase) -> bool {
    match (action, phase) {
        (LabAction::Intake, LabPhase::Queued) => true,
        (LabAction::Intake, LabPhase::InRepair) => false,
        (LabAction::Complete, LabPhase::InRepair) => true,
        (LabAction::Complete, LabPhase::Queued) => false,
        (LabAction::Scrap, _) => true,
    }
}
