use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::Local;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, info, instrument, warn, Instrument};

use crate::address::{AddressError, DisplayAddress, LocationCoordinate};
use crate::equipment::{EquipmentRecord, FaultCategory};
use crate::gateway::{EquipmentStore, GatewayError, SearchOutcome};
use crate::lifecycle::{self, ActionRefused, EquipmentAction, LabAction, LabPhase};
use crate::telemetry::{create_workflow_span, generate_correlation_id};
use crate::validation::{self, FieldId, RmaForm, ValidationOutcome};
use crate::workflow::requests::{
    ConciliationRequest, ConciliationTarget, DiagnosisResolution, DiagnosisSubmission,
    LabCompletion, LabIntake, LabScrap, RmaCancellation, RmaSubmission, ScrapKind,
    TransferDestination, TransferRequest, WorkflowRequest,
};
use crate::workflow::session::WorkflowSession;

/// "wh-rack-row-column", with `-`, `/` or spaces between the parts.
/// A query in this shape is a coordinate lookup, not a serial search.
static LOCATION_QUERY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+)[-/ ](\d+)[-/ ](\d+)[-/ ](\d+)\s*$").expect("location pattern is valid")
});

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error("RMA form is invalid: {message}")]
    ValidationFailed {
        invalid_fields: BTreeSet<FieldId>,
        message: String,
    },
    #[error(transparent)]
    Refused(#[from] ActionRefused),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("equipment record has no backend id; refresh and retry")]
    MissingEquipmentId,
    #[error("in-place conciliation is not available in a hydro warehouse")]
    ConciliationTargetUnavailable,
    #[error("{action:?} is not available while the unit is {phase:?}")]
    LabActionUnavailable { action: LabAction, phase: LabPhase },
    #[error("equipment is not in the lab queue")]
    NotInLab,
    #[error("no diagnosis recorded; record one before requesting a transfer")]
    NoDiagnosisRecorded,
}

/// What a coordinate lookup resolved to. An empty slot is a normal
/// outcome (the entry point for registering new equipment), distinct
/// from a record that exists but is blank.
#[derive(Debug, Clone)]
pub enum LookupOutcome {
    Found(Box<WorkflowSession>),
    Vacant,
}

/// Result of a diagnosis submission.
#[derive(Debug, Clone)]
pub enum DiagnosisOutcome {
    /// Persisted on the backend; the session has been reloaded.
    Recorded,
    /// Resolution was RMA: nothing was sent. The fault carries over
    /// into the pre-filled form and the RMA flow takes over.
    ContinueToRma { form: RmaForm },
}

/// Drives every equipment operation against a backend store.
///
/// Rack-view flows work on a `WorkflowSession`; on success the session
/// is reloaded from the backend, on failure it is left untouched. Lab
/// flows are keyed by equipment id since lab units have no coordinate.
pub struct WorkflowCoordinator<S> {
    store: S,
    hydro_warehouse_id: u32,
}

impl<S: EquipmentStore> WorkflowCoordinator<S> {
    pub fn new(store: S, hydro_warehouse_id: u32) -> Self {
        Self {
            store,
            hydro_warehouse_id,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// How a coordinate reads on screen. Hydro warehouses render as
    /// container/side, everything else as plain rack coordinates.
    pub fn display_address(
        &self,
        coord: &LocationCoordinate,
    ) -> Result<DisplayAddress, AddressError> {
        DisplayAddress::from_coordinate(coord, self.hydro_warehouse_id)
    }

    /// Open a session for the unit at a coordinate, if there is one.
    #[instrument(skip(self), fields(wh = coord.warehouse_id, rack = coord.rack))]
    pub async fn open_session(
        &self,
        coord: &LocationCoordinate,
    ) -> Result<LookupOutcome, WorkflowError> {
        match self.store.fetch_by_coordinate(coord).await? {
            Some(record) => Ok(LookupOutcome::Found(Box::new(WorkflowSession::new(
                *coord, record,
            )))),
            None => Ok(LookupOutcome::Vacant),
        }
    }

    /// Free-text search. A query shaped like a full coordinate is
    /// resolved as a direct lookup instead of going through the
    /// backend's serial matcher.
    pub async fn search(&self, query: &str) -> Result<SearchOutcome, WorkflowError> {
        if let Some(coord) = parse_location_query(query) {
            return match self.open_session(&coord).await? {
                LookupOutcome::Found(session) => Ok(SearchOutcome {
                    found: true,
                    total: 1,
                    results: vec![session.record().clone()],
                }),
                LookupOutcome::Vacant => Ok(SearchOutcome::default()),
            };
        }
        Ok(self.store.search(query).await?)
    }

    /// Record a field diagnosis. When the chosen resolution is RMA the
    /// diagnosis is never persisted on its own; the caller gets a
    /// pre-filled form and continues into `submit_rma`.
    #[instrument(skip(self, session), fields(equipment.id = session.record().id, correlation.id = %session.correlation_id()))]
    pub async fn submit_diagnosis(
        &self,
        session: &mut WorkflowSession,
        fault: FaultCategory,
        resolution: DiagnosisResolution,
        note: String,
        port_ip: String,
    ) -> Result<DiagnosisOutcome, WorkflowError> {
        lifecycle::authorize(EquipmentAction::SubmitDiagnosis, session.record())?;

        if resolution == DiagnosisResolution::Rma {
            let mut form = RmaForm::prefill(session.record());
            form.fault_category = Some(fault);
            form.fault_log = note;
            form.port_ip = port_ip;
            info!(
                fault = fault.as_wire(),
                "diagnosis resolved to RMA, short-circuiting"
            );
            return Ok(DiagnosisOutcome::ContinueToRma { form });
        }

        let record = session.record();
        let request = DiagnosisSubmission {
            equipment_id: record.id,
            coordinate: *session.coordinate(),
            fault,
            resolution,
            note,
            port_ip,
            sn_digital: record.digital_serial.clone(),
            sn_fisica: record.physical_serial.clone(),
        };
        self.store
            .submit(WorkflowRequest::Diagnosis(request))
            .await?;
        info!("diagnosis recorded");
        self.refresh(session).await;
        Ok(DiagnosisOutcome::Recorded)
    }

    /// Validate the form and submit the RMA. Validation failures stay
    /// local; nothing reaches the backend.
    #[instrument(skip(self, session, form), fields(equipment.id = session.record().id, correlation.id = %session.correlation_id()))]
    pub async fn submit_rma(
        &self,
        session: &mut WorkflowSession,
        form: &RmaForm,
    ) -> Result<(), WorkflowError> {
        lifecycle::authorize(EquipmentAction::SubmitRma, session.record())?;

        if let ValidationOutcome::Failed {
            invalid_fields,
            message,
        } = validation::validate(form)
        {
            warn!(invalid = invalid_fields.len(), "RMA form rejected locally");
            return Err(WorkflowError::ValidationFailed {
                invalid_fields,
                message,
            });
        }

        let request = RmaSubmission::from_form(
            *session.coordinate(),
            form,
            session.record().digital_serial.clone(),
        )
        .ok_or_else(|| WorkflowError::ValidationFailed {
            invalid_fields: BTreeSet::from([FieldId::FaultCategory]),
            message: "fault category is required".to_string(),
        })?;
        self.store.submit(WorkflowRequest::Rma(request)).await?;
        info!("RMA submitted");
        self.refresh(session).await;
        Ok(())
    }

    /// Cancel an open RMA. Refused while a transfer request is still
    /// pending; the transfer has to be resolved first.
    #[instrument(skip(self, session), fields(equipment.id = session.record().id, correlation.id = %session.correlation_id()))]
    pub async fn cancel_rma(&self, session: &mut WorkflowSession) -> Result<(), WorkflowError> {
        lifecycle::authorize(EquipmentAction::CancelRma, session.record())?;
        self.store
            .submit(WorkflowRequest::RmaCancel(RmaCancellation {
                coordinate: *session.coordinate(),
            }))
            .await?;
        info!("RMA cancelled");
        self.refresh(session).await;
        Ok(())
    }

    /// Ask for the unit to be moved to the lab. At most one request
    /// can be pending per unit.
    #[instrument(skip(self, session), fields(equipment.id = session.record().id, correlation.id = %session.correlation_id()))]
    pub async fn request_transfer(
        &self,
        session: &mut WorkflowSession,
        reason: Option<String>,
    ) -> Result<(), WorkflowError> {
        lifecycle::authorize(EquipmentAction::RequestTransfer, session.record())?;
        let equipment_id = session.record().id.ok_or(WorkflowError::MissingEquipmentId)?;
        let reason = match reason {
            Some(reason) => reason,
            // The move is motivated by the recorded diagnosis; without
            // one there is nothing to transfer the unit for.
            None => match session.record().fault_label() {
                Some(label) => format!("RMA: {label}"),
                None => return Err(WorkflowError::NoDiagnosisRecorded),
            },
        };
        let request = TransferRequest {
            equipment_id,
            destination: TransferDestination::Lab,
            reason,
        };
        self.store.submit(WorkflowRequest::Transfer(request)).await?;
        info!("transfer to lab requested");
        self.refresh(session).await;
        Ok(())
    }

    /// Conciliation targets offered for a unit at this coordinate.
    /// Hydro rigs cannot be part-swapped in the rack.
    pub fn conciliation_targets(&self, coord: &LocationCoordinate) -> Vec<ConciliationTarget> {
        if coord.warehouse_id == self.hydro_warehouse_id {
            vec![ConciliationTarget::Lab]
        } else {
            vec![ConciliationTarget::InPlace, ConciliationTarget::Lab]
        }
    }

    /// Open a part conciliation. The damaged cooler count is only
    /// meaningful for FAN and dropped otherwise.
    #[instrument(skip(self, session), fields(equipment.id = session.record().id, correlation.id = %session.correlation_id()))]
    pub async fn request_conciliation(
        &self,
        session: &mut WorkflowSession,
        target: ConciliationTarget,
        part: FaultCategory,
        note: String,
        damaged_coolers: Option<u32>,
    ) -> Result<(), WorkflowError> {
        lifecycle::authorize(EquipmentAction::RequestConciliation, session.record())?;
        let equipment_id = session.record().id.ok_or(WorkflowError::MissingEquipmentId)?;
        if target == ConciliationTarget::InPlace
            && session.coordinate().warehouse_id == self.hydro_warehouse_id
        {
            return Err(WorkflowError::ConciliationTargetUnavailable);
        }
        let request = ConciliationRequest {
            target,
            equipment_id,
            part,
            note,
            damaged_coolers: if part == FaultCategory::Fan {
                damaged_coolers
            } else {
                None
            },
        };
        self.store
            .submit(WorkflowRequest::Conciliation(request))
            .await?;
        info!(?target, "conciliation requested");
        self.refresh(session).await;
        Ok(())
    }

    /// Reload the working copy after a successful mutation. A slot
    /// that came back empty means the unit left the rack; the session
    /// keeps its last snapshot and the caller closes it.
    async fn refresh(&self, session: &mut WorkflowSession) {
        match self.store.fetch_by_coordinate(session.coordinate()).await {
            Ok(Some(record)) => session.replace_record(record),
            Ok(None) => debug!("slot empty after mutation; unit left the rack"),
            Err(err) => warn!(error = %err, "session refresh failed; keeping last snapshot"),
        }
    }

    /// Actions the lab board should offer for a queued or in-repair
    /// unit.
    pub fn lab_actions(&self, record: &EquipmentRecord) -> Vec<LabAction> {
        let Some(phase) = lifecycle::lab_phase(record) else {
            return Vec::new();
        };
        [LabAction::Intake, LabAction::Complete, LabAction::Scrap]
            .into_iter()
            .filter(|&action| lifecycle::authorize_lab(action, phase))
            .collect()
    }

    /// Pull a queued unit onto the workbench.
    pub async fn lab_intake(&self, record: &EquipmentRecord) -> Result<(), WorkflowError> {
        let correlation_id = generate_correlation_id();
        let span = create_workflow_span("lab_intake", record.id, Some(&correlation_id));
        async {
            let id = self.gate_lab(record, LabAction::Intake)?;
            self.store
                .submit(WorkflowRequest::LabIntake(LabIntake { id }))
                .await?;
            info!("lab intake recorded");
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Mark a repair finished; the unit returns to lab stock awaiting
    /// a slot. The note is date-stamped the way the repair history
    /// reads them.
    pub async fn lab_complete(
        &self,
        record: &EquipmentRecord,
        repair_note: String,
    ) -> Result<(), WorkflowError> {
        let correlation_id = generate_correlation_id();
        let span = create_workflow_span("lab_complete", record.id, Some(&correlation_id));
        async {
            let id = self.gate_lab(record, LabAction::Complete)?;
            let repair_note = format!("[{}] {repair_note}", Local::now().format("%Y-%m-%d"));
            self.store
                .submit(WorkflowRequest::LabComplete(LabCompletion { id, repair_note }))
                .await?;
            info!("lab repair completed");
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Write a unit off, either as a parts donor or for disposal.
    /// Terminal; there is no return path.
    pub async fn lab_scrap(
        &self,
        record: &EquipmentRecord,
        kind: ScrapKind,
        reason: String,
    ) -> Result<(), WorkflowError> {
        let correlation_id = generate_correlation_id();
        let span = create_workflow_span("lab_scrap", record.id, Some(&correlation_id));
        async {
            let id = self.gate_lab(record, LabAction::Scrap)?;
            let reason = format!("[BAJA {}] {reason}", Local::now().format("%Y-%m-%d"));
            self.store
                .submit(WorkflowRequest::LabScrap(LabScrap { id, kind, reason }))
                .await?;
            info!(?kind, "unit scrapped");
            Ok(())
        }
        .instrument(span)
        .await
    }

    fn gate_lab(&self, record: &EquipmentRecord, action: LabAction) -> Result<i64, WorkflowError> {
        let phase = lifecycle::lab_phase(record).ok_or(WorkflowError::NotInLab)?;
        if !lifecycle::authorize_lab(action, phase) {
            return Err(WorkflowError::LabActionUnavailable { action, phase });
        }
        record.id.ok_or(WorkflowError::MissingEquipmentId)
    }
}

/// Parse a query shaped like a full rack coordinate, if it is one.
pub fn parse_location_query(query: &str) -> Option<LocationCoordinate> {
    let caps = LOCATION_QUERY.captures(query)?;
    let part = |i: usize| caps.get(i)?.as_str().parse::<u32>().ok();
    Some(LocationCoordinate::new(
        part(1)?,
        part(2)?,
        part(3)?,
        part(4)?,
    ))
}
