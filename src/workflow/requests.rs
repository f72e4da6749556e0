// Workflow request payloads.
//
// Each request carries exactly the record subset its backend endpoint
// wants, under the backend's own field names. Requests are immutable
// once constructed and consumed on submission, so a confirmed action
// is sent at most once.

use serde::{Deserialize, Serialize};

use crate::address::LocationCoordinate;
use crate::equipment::FaultCategory;
use crate::validation::RmaForm;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosisResolution {
    /// Short-circuits into the RMA flow; never persisted on its own.
    #[serde(rename = "RMA")]
    Rma,
    #[serde(rename = "REPARADO")]
    RepairedOnSite,
    #[serde(rename = "EN_OBSERVACION")]
    UnderObservation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisSubmission {
    #[serde(rename = "id", skip_serializing_if = "Option::is_none")]
    pub equipment_id: Option<i64>,
    #[serde(flatten)]
    pub coordinate: LocationCoordinate,
    #[serde(rename = "falla")]
    pub fault: FaultCategory,
    #[serde(rename = "solucion")]
    pub resolution: DiagnosisResolution,
    #[serde(rename = "observacion")]
    pub note: String,
    #[serde(rename = "ip")]
    pub port_ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sn_digital: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sn_fisica: Option<String>,
}

/// Where a part conciliation happens. Hydro warehouses only ever get
/// the Lab path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConciliationTarget {
    /// Part swapped in the rack; the unit does not move.
    #[serde(rename = "WH")]
    InPlace,
    /// Unit leaves the rack and enters repair.
    #[serde(rename = "LAB")]
    Lab,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConciliationRequest {
    #[serde(rename = "tipo")]
    pub target: ConciliationTarget,
    #[serde(rename = "miner_id")]
    pub equipment_id: i64,
    #[serde(rename = "pieza")]
    pub part: FaultCategory,
    #[serde(rename = "comentario")]
    pub note: String,
    /// Only collected when the part is FAN.
    #[serde(rename = "cant_coolers", skip_serializing_if = "Option::is_none")]
    pub damaged_coolers: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferDestination {
    #[serde(rename = "LAB")]
    Lab,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    #[serde(rename = "miner_id")]
    pub equipment_id: i64,
    #[serde(rename = "destino")]
    pub destination: TransferDestination,
    #[serde(rename = "motivo")]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RmaSubmission {
    #[serde(flatten)]
    pub coordinate: LocationCoordinate,
    #[serde(rename = "sn_fisica")]
    pub physical_serial: String,
    #[serde(rename = "ip_rma")]
    pub port_ip: String,
    #[serde(rename = "mac")]
    pub mac_address: String,
    #[serde(rename = "ths")]
    pub hashrate_rating: String,
    #[serde(rename = "diagnostico_detalle")]
    pub fault: FaultCategory,
    #[serde(rename = "log_detalle")]
    pub fault_log: String,
    #[serde(rename = "psu_model")]
    pub power_supply_model: String,
    #[serde(rename = "psu_sn")]
    pub power_supply_serial: String,
    #[serde(rename = "cb_sn")]
    pub control_board_serial: String,
    #[serde(rename = "hb1_sn")]
    pub hashboard_serial_1: String,
    #[serde(rename = "hb2_sn")]
    pub hashboard_serial_2: String,
    #[serde(rename = "hb3_sn")]
    pub hashboard_serial_3: String,
    #[serde(rename = "sn_digital", skip_serializing_if = "Option::is_none")]
    pub digital_serial: Option<String>,
}

impl RmaSubmission {
    /// Build the wire payload from a validated form. The caller is
    /// responsible for running `validation::validate` first; `fault`
    /// is taken from the form and must be present by then.
    pub fn from_form(
        coordinate: LocationCoordinate,
        form: &RmaForm,
        digital_serial: Option<String>,
    ) -> Option<Self> {
        Some(Self {
            coordinate,
            physical_serial: form.physical_serial.clone(),
            port_ip: form.port_ip.clone(),
            mac_address: form.mac_address.clone(),
            hashrate_rating: form.hashrate_rating.clone(),
            fault: form.fault_category?,
            fault_log: form.fault_log.clone(),
            power_supply_model: form.power_supply_model.clone(),
            power_supply_serial: form.power_supply_serial.clone(),
            control_board_serial: form.control_board_serial.clone(),
            hashboard_serial_1: form.hashboard_serials[0].clone(),
            hashboard_serial_2: form.hashboard_serials[1].clone(),
            hashboard_serial_3: form.hashboard_serials[2].clone(),
            digital_serial,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RmaCancellation {
    #[serde(flatten)]
    pub coordinate: LocationCoordinate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabIntake {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabCompletion {
    pub id: i64,
    #[serde(rename = "solucion")]
    pub repair_note: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScrapKind {
    /// Kept on a shelf as a parts donor.
    #[serde(rename = "piezas")]
    PartsDonor,
    /// Disposed of outright.
    #[serde(rename = "basura")]
    Disposal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabScrap {
    pub id: i64,
    #[serde(rename = "tipo")]
    pub kind: ScrapKind,
    #[serde(rename = "motivo")]
    pub reason: String,
}

/// Every mutating request the coordinator can issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkflowRequest {
    Diagnosis(DiagnosisSubmission),
    Conciliation(ConciliationRequest),
    Transfer(TransferRequest),
    Rma(RmaSubmission),
    RmaCancel(RmaCancellation),
    LabIntake(LabIntake),
    LabComplete(LabCompletion),
    LabScrap(LabScrap),
}

impl WorkflowRequest {
    /// Backend path this request posts to.
    pub fn endpoint(&self) -> &'static str {
        match self {
            WorkflowRequest::Diagnosis(_) => "/diagnosis",
            WorkflowRequest::Conciliation(_) => "/conciliation",
            WorkflowRequest::Transfer(_) => "/transfer",
            WorkflowRequest::Rma(_) => "/rma",
            WorkflowRequest::RmaCancel(_) => "/rma/cancel",
            WorkflowRequest::LabIntake(_) => "/lab/intake",
            WorkflowRequest::LabComplete(_) => "/lab/complete",
            WorkflowRequest::LabScrap(_) => "/lab/scrap",
        }
    }

    /// Short name used in spans and log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkflowRequest::Diagnosis(_) => "diagnosis",
            WorkflowRequest::Conciliation(_) => "conciliation",
            WorkflowRequest::Transfer(_) => "transfer",
            WorkflowRequest::Rma(_) => "rma",
            WorkflowRequest::RmaCancel(_) => "rma-cancel",
            WorkflowRequest::LabIntake(_) => "lab-intake",
            WorkflowRequest::LabComplete(_) => "lab-complete",
            WorkflowRequest::LabScrap(_) => "lab-scrap",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conciliation_serializes_backend_field_names() {
        let request = ConciliationRequest {
            target: ConciliationTarget::InPlace,
            equipment_id: 42,
            part: FaultCategory::Fan,
            note: "two dead coolers".into(),
            damaged_coolers: Some(2),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["tipo"], "WH");
        assert_eq!(value["miner_id"], 42);
        assert_eq!(value["pieza"], "FAN");
        assert_eq!(value["cant_coolers"], 2);
    }

    #[test]
    fn cooler_count_omitted_when_absent() {
        let request = ConciliationRequest {
            target: ConciliationTarget::Lab,
            equipment_id: 7,
            part: FaultCategory::Psu,
            note: "psu swap".into(),
            damaged_coolers: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("cant_coolers").is_none());
        assert_eq!(value["tipo"], "LAB");
    }

    #[test]
    fn rma_submission_flattens_coordinate() {
        let form = RmaForm {
            physical_serial: "SN-9".into(),
            port_ip: "10.1.1.9".into(),
            mac_address: "AA:00".into(),
            hashrate_rating: "110".into(),
            fault_category: Some(FaultCategory::Hashboard),
            fault_log: "chain 1 missing".into(),
            hashboard_serials: ["HB-A".into(), String::new(), String::new()],
            ..Default::default()
        };
        let request = RmaSubmission::from_form(
            crate::address::LocationCoordinate::new(2, 7, 1, 4),
            &form,
            None,
        )
        .unwrap();
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["wh"], 2);
        assert_eq!(value["rack"], 7);
        assert_eq!(value["ip_rma"], "10.1.1.9");
        assert_eq!(value["diagnostico_detalle"], "HASHBOARD");
        assert_eq!(value["hb1_sn"], "HB-A");
    }

    #[test]
    fn endpoints_match_contract() {
        let cancel = WorkflowRequest::RmaCancel(RmaCancellation {
            coordinate: crate::address::LocationCoordinate::new(1, 1, 1, 1),
        });
        assert_eq!(cancel.endpoint(), "/rma/cancel");
        let intake = WorkflowRequest::LabIntake(LabIntake { id: 3 });
        assert_eq!(intake.endpoint(), "/lab/intake");
    }
}
