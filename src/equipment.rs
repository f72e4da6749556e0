// Equipment records as the backend serves them.
//
// Wire names follow the backend schema (sn_fisica, proceso_estado,
// hb1_sn, ...). The gateway hands these out untouched; classification
// and validation consume the typed accessors.

use serde::{Deserialize, Serialize};

use crate::address::LocationCoordinate;

/// Backend process state of a unit. The `Conciliando` casing is a wart
/// in the backend schema that we must preserve on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ProcessState {
    #[default]
    #[serde(rename = "operativo")]
    Operational,
    #[serde(rename = "en_laboratorio")]
    InLab,
    #[serde(rename = "en_reparacion")]
    InRepair,
    #[serde(rename = "pendiente_traslado")]
    TransferPending,
    #[serde(rename = "Conciliando")]
    Reconciling,
    #[serde(rename = "stock_lab")]
    LabStock,
    #[serde(rename = "baja_definitiva")]
    Retired,
    #[serde(rename = "donante_piezas")]
    PartsDonor,
    #[serde(rename = "pendiente_colocacion")]
    PlacementPending,
    #[serde(rename = "vacio")]
    Vacant,
}

/// Fault categories offered by the diagnosis and RMA forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultCategory {
    #[serde(rename = "PSU")]
    Psu,
    #[serde(rename = "CONTROL BOARD", alias = "CONTROL_BOARD")]
    ControlBoard,
    #[serde(rename = "HASHBOARD")]
    Hashboard,
    #[serde(rename = "FAN")]
    Fan,
    #[serde(rename = "CABLE")]
    Cable,
    #[serde(rename = "OTRO")]
    Other,
}

impl FaultCategory {
    pub fn as_wire(&self) -> &'static str {
        match self {
            FaultCategory::Psu => "PSU",
            FaultCategory::ControlBoard => "CONTROL BOARD",
            FaultCategory::Hashboard => "HASHBOARD",
            FaultCategory::Fan => "FAN",
            FaultCategory::Cable => "CABLE",
            FaultCategory::Other => "OTRO",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown fault category '{0}'; expected PSU, CONTROL BOARD, HASHBOARD, FAN, CABLE or OTRO")]
pub struct UnknownFaultCategory(String);

impl std::str::FromStr for FaultCategory {
    type Err = UnknownFaultCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PSU" => Ok(FaultCategory::Psu),
            "CONTROL BOARD" | "CONTROL_BOARD" => Ok(FaultCategory::ControlBoard),
            "HASHBOARD" => Ok(FaultCategory::Hashboard),
            "FAN" => Ok(FaultCategory::Fan),
            "CABLE" => Ok(FaultCategory::Cable),
            "OTRO" => Ok(FaultCategory::Other),
            _ => Err(UnknownFaultCategory(s.to_string())),
        }
    }
}

/// One unit as returned by coordinate lookup or search. Location is
/// absent while the unit sits in the lab (the backend nulls it out).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquipmentRecord {
    #[serde(default)]
    pub id: Option<i64>,

    #[serde(default, rename = "wh")]
    pub warehouse_id: Option<u32>,
    #[serde(default)]
    pub rack: Option<u32>,
    #[serde(default, rename = "fila")]
    pub row: Option<u32>,
    #[serde(default, rename = "columna")]
    pub column: Option<u32>,

    #[serde(default, rename = "modelo")]
    pub model: Option<String>,
    #[serde(default, rename = "ths")]
    pub hashrate_ths: Option<f64>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub mac_address: Option<String>,
    #[serde(default, rename = "sn_fisica", alias = "sn")]
    pub physical_serial: Option<String>,
    #[serde(default, rename = "sn_digital")]
    pub digital_serial: Option<String>,
    #[serde(default, rename = "psu_model")]
    pub power_supply_model: Option<String>,
    #[serde(default, rename = "psu_sn")]
    pub power_supply_serial: Option<String>,
    #[serde(default, rename = "cb_sn")]
    pub control_board_serial: Option<String>,
    #[serde(default, rename = "hb1_sn")]
    pub hashboard_serial_1: Option<String>,
    #[serde(default, rename = "hb2_sn")]
    pub hashboard_serial_2: Option<String>,
    #[serde(default, rename = "hb3_sn")]
    pub hashboard_serial_3: Option<String>,

    // The backend hands back "" and historically free-form text here,
    // so the raw label is kept; `fault_category()` parses it on demand.
    #[serde(default, rename = "diagnostico")]
    fault_label: Option<String>,
    #[serde(default, rename = "log")]
    pub fault_log: Option<String>,
    #[serde(default, rename = "diagnostico_detalle")]
    pub diagnosis_detail: Option<String>,

    // Lookup responses carry the state under `proceso_estado`, search
    // results under `estado` (sometimes both). Resolved by
    // `process_state()`.
    #[serde(default, rename = "proceso_estado")]
    process_state: Option<ProcessState>,
    #[serde(default, rename = "estado", skip_serializing)]
    search_state: Option<ProcessState>,

    #[serde(default, rename = "traslado_pendiente")]
    pub pending_transfer: bool,
}

impl EquipmentRecord {
    pub fn process_state(&self) -> ProcessState {
        self.process_state.or(self.search_state).unwrap_or_default()
    }

    pub fn set_process_state(&mut self, state: ProcessState) {
        self.process_state = Some(state);
    }

    /// Location, when the unit is racked. None while it is in the lab.
    pub fn location(&self) -> Option<LocationCoordinate> {
        Some(LocationCoordinate::new(
            self.warehouse_id?,
            self.rack?,
            self.row?,
            self.column?,
        ))
    }

    pub fn hashboard_serials(&self) -> [Option<&str>; 3] {
        [
            self.hashboard_serial_1.as_deref(),
            self.hashboard_serial_2.as_deref(),
            self.hashboard_serial_3.as_deref(),
        ]
    }

    pub fn has_diagnosis_detail(&self) -> bool {
        self.diagnosis_detail
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty())
    }

    /// The raw diagnosis label, when one is recorded. Free-form text
    /// counts; only a missing or blank field reads as None.
    pub fn fault_label(&self) -> Option<&str> {
        self.fault_label
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
    }

    /// The typed category, when the label matches one.
    pub fn fault_category(&self) -> Option<FaultCategory> {
        self.fault_label().and_then(|l| l.parse().ok())
    }

    pub fn set_fault_category(&mut self, category: FaultCategory) {
        self.fault_label = Some(category.as_wire().to_string());
    }

    pub fn has_recorded_fault(&self) -> bool {
        self.fault_label().is_some()
            || self
                .fault_log
                .as_deref()
                .is_some_and(|l| !l.trim().is_empty())
    }
}
