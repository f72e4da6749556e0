// Validation Rule Engine for RMA submissions.
//
// Pure function of the form snapshot: universal required fields first,
// then the per-fault-category additions, only once the universal set
// passes. Failing fields come back as a set so every one of them can
// be highlighted at once.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::equipment::{EquipmentRecord, FaultCategory};

/// Form fields an RMA submission can fail on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FieldId {
    PhysicalSerial,
    PortIp,
    MacAddress,
    HashrateRating,
    FaultCategory,
    FaultLog,
    PowerSupplyModel,
    PowerSupplySerial,
    ControlBoardSerial,
    HashboardSerial1,
    HashboardSerial2,
    HashboardSerial3,
}

/// Snapshot of the RMA form at submission time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RmaForm {
    pub physical_serial: String,
    /// IP of the port the unit is plugged into right now, captured at
    /// RMA time. Not the (stale) registered IP.
    pub port_ip: String,
    pub mac_address: String,
    pub hashrate_rating: String,
    pub fault_category: Option<FaultCategory>,
    pub fault_log: String,
    pub power_supply_model: String,
    pub power_supply_serial: String,
    pub control_board_serial: String,
    pub hashboard_serials: [String; 3],
}

impl RmaForm {
    /// Pre-fill from the current record, the way the rack view does.
    /// The port IP is always left for the operator to type in.
    pub fn prefill(record: &EquipmentRecord) -> Self {
        Self {
            physical_serial: record.physical_serial.clone().unwrap_or_default(),
            port_ip: String::new(),
            mac_address: record.mac_address.clone().unwrap_or_default(),
            hashrate_rating: record
                .hashrate_ths
                .map(|t| t.to_string())
                .unwrap_or_default(),
            fault_category: record.fault_category(),
            fault_log: record.fault_log.clone().unwrap_or_default(),
            power_supply_model: record.power_supply_model.clone().unwrap_or_default(),
            power_supply_serial: record.power_supply_serial.clone().unwrap_or_default(),
            control_board_serial: record.control_board_serial.clone().unwrap_or_default(),
            hashboard_serials: [
                record.hashboard_serial_1.clone().unwrap_or_default(),
                record.hashboard_serial_2.clone().unwrap_or_default(),
                record.hashboard_serial_3.clone().unwrap_or_default(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Ok,
    Failed {
        invalid_fields: BTreeSet<FieldId>,
        message: String,
    },
}

impl ValidationOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, ValidationOutcome::Ok)
    }
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Validate an RMA form snapshot. No I/O, idempotent.
pub fn validate(form: &RmaForm) -> ValidationOutcome {
    let mut invalid = BTreeSet::new();

    let universal = [
        (FieldId::PhysicalSerial, blank(&form.physical_serial)),
        (FieldId::PortIp, blank(&form.port_ip)),
        (FieldId::MacAddress, blank(&form.mac_address)),
        (FieldId::HashrateRating, blank(&form.hashrate_rating)),
        (FieldId::FaultCategory, form.fault_category.is_none()),
        (FieldId::FaultLog, blank(&form.fault_log)),
    ];
    for (field, missing) in universal {
        if missing {
            invalid.insert(field);
        }
    }

    if !invalid.is_empty() {
        return ValidationOutcome::Failed {
            invalid_fields: invalid,
            message: "Missing required basics (serial, current port IP, MAC, rated hashrate, \
                      fault category or fault log)."
                .to_string(),
        };
    }

    // Category-specific requirements only once the basics are in.
    let message = match form.fault_category {
        Some(FaultCategory::Psu) => {
            if blank(&form.power_supply_model) {
                invalid.insert(FieldId::PowerSupplyModel);
            }
            if blank(&form.power_supply_serial) {
                invalid.insert(FieldId::PowerSupplySerial);
            }
            "A PSU fault requires both the power supply model and serial."
        }
        Some(FaultCategory::ControlBoard) => {
            if blank(&form.control_board_serial) {
                invalid.insert(FieldId::ControlBoardSerial);
            }
            "A control board fault requires the control board serial."
        }
        Some(FaultCategory::Hashboard) => {
            if form.hashboard_serials.iter().all(|sn| blank(sn)) {
                invalid.insert(FieldId::HashboardSerial1);
                invalid.insert(FieldId::HashboardSerial2);
                invalid.insert(FieldId::HashboardSerial3);
            }
            "A hashboard fault requires at least one hashboard serial."
        }
        // FAN cooler counts are collected during conciliation, not RMA.
        Some(FaultCategory::Fan) | Some(FaultCategory::Cable) | Some(FaultCategory::Other)
        | None => "",
    };

    if invalid.is_empty() {
        ValidationOutcome::Ok
    } else {
        ValidationOutcome::Failed {
            invalid_fields: invalid,
            message: message.to_string(),
        }
    }
}
