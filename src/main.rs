use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};

use rackflow::workflow::requests::{ConciliationTarget, DiagnosisResolution, ScrapKind};
use rackflow::{
    config, init_telemetry, BackendClient, DiagnosisOutcome, EquipmentRecord, FaultCategory,
    LocationCoordinate, LookupOutcome, RmaForm, WorkflowCoordinator, WorkflowSession,
};

#[derive(Parser)]
#[command(name = "rackflow")]
#[command(about = "Equipment lifecycle and RMA workflow coordination")]
#[command(
    long_about = "Rackflow drives equipment diagnosis, RMA, transfer and lab repair \
                  workflows against the inventory backend. Every state shown is read \
                  fresh from the backend; nothing is cached locally."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the equipment at a rack coordinate, with its available actions
    Lookup {
        warehouse: u32,
        rack: u32,
        row: u32,
        column: u32,
    },
    /// Search equipment by serial, MAC or IP fragment
    Search {
        /// Query text; a full "wh-rack-row-col" pattern is resolved as a coordinate
        query: String,
    },
    /// Record a field diagnosis for the unit at a coordinate
    Diagnose {
        warehouse: u32,
        rack: u32,
        row: u32,
        column: u32,
        /// Fault category: PSU, CONTROL BOARD, HASHBOARD, FAN, CABLE, OTRO
        #[arg(long)]
        fault: FaultCategory,
        /// Resolution: rma, repaired, observation
        #[arg(long)]
        resolution: String,
        /// Free-form note describing what was observed
        #[arg(long, default_value = "")]
        note: String,
        /// IP of the port the unit is currently plugged into
        #[arg(long)]
        ip: String,
    },
    /// Submit an RMA for the unit at a coordinate
    Rma {
        warehouse: u32,
        rack: u32,
        row: u32,
        column: u32,
        /// IP of the port the unit is currently plugged into
        #[arg(long)]
        ip: String,
        /// Fault category; defaults to the one already on the record
        #[arg(long)]
        fault: Option<FaultCategory>,
        /// Fault log text; defaults to the one already on the record
        #[arg(long)]
        log: Option<String>,
        #[arg(long)]
        psu_model: Option<String>,
        #[arg(long)]
        psu_sn: Option<String>,
        #[arg(long)]
        cb_sn: Option<String>,
        #[arg(long)]
        hb1_sn: Option<String>,
        #[arg(long)]
        hb2_sn: Option<String>,
        #[arg(long)]
        hb3_sn: Option<String>,
    },
    /// Cancel the open RMA for the unit at a coordinate
    CancelRma {
        warehouse: u32,
        rack: u32,
        row: u32,
        column: u32,
    },
    /// Request a transfer to the lab for the unit at a coordinate
    Transfer {
        warehouse: u32,
        rack: u32,
        row: u32,
        column: u32,
        /// Reason shown to the logistics team; defaults to the recorded fault
        #[arg(long)]
        reason: Option<String>,
    },
    /// Open a part conciliation for the unit at a coordinate
    Conciliate {
        warehouse: u32,
        rack: u32,
        row: u32,
        column: u32,
        /// Where the swap happens: wh (in place) or lab
        #[arg(long)]
        target: String,
        /// Part being conciliated: PSU, CONTROL BOARD, HASHBOARD, FAN, CABLE, OTRO
        #[arg(long)]
        part: FaultCategory,
        #[arg(long, default_value = "")]
        note: String,
        /// Damaged cooler count; only meaningful when the part is FAN
        #[arg(long)]
        coolers: Option<u32>,
    },
    /// Lab workbench operations, keyed by physical serial
    #[command(subcommand)]
    Lab(LabCommands),
}

#[derive(Subcommand)]
enum LabCommands {
    /// Pull a queued unit onto the workbench
    Intake { serial: String },
    /// Mark a repair finished
    Complete {
        serial: String,
        /// What was done to the unit
        #[arg(long)]
        note: String,
    },
    /// Write a unit off as a parts donor or for disposal
    Scrap {
        serial: String,
        /// piezas (parts donor) or basura (disposal)
        #[arg(long)]
        kind: String,
        #[arg(long)]
        reason: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse first so --help and usage errors never touch telemetry or
    // the backend configuration.
    let cli = Cli::parse();

    init_telemetry()?;
    let config = config()?;
    let coordinator = WorkflowCoordinator::new(
        BackendClient::from_config()?,
        config.warehouses.hydro_warehouse_id,
    );
    match cli.command {
        Commands::Lookup {
            warehouse,
            rack,
            row,
            column,
        } => {
            let coord = LocationCoordinate::new(warehouse, rack, row, column);
            let address = coordinator.display_address(&coord)?;
            match coordinator.open_session(&coord).await? {
                LookupOutcome::Found(session) => {
                    println!("Address: {address}");
                    print_record(session.record());
                    let actions = session.actions();
                    if actions.is_empty() {
                        println!("No actions available in the current state.");
                    } else {
                        println!(
                            "Available actions: {}",
                            actions
                                .iter()
                                .map(ToString::to_string)
                                .collect::<Vec<_>>()
                                .join(", ")
                        );
                    }
                }
                LookupOutcome::Vacant => {
                    println!("Address: {address}");
                    println!("Slot is empty.");
                }
            }
        }
        Commands::Search { query } => {
            let outcome = coordinator.search(&query).await?;
            if !outcome.found || outcome.results.is_empty() {
                println!("No equipment matched '{query}'.");
            } else {
                println!("{} result(s):", outcome.total);
                for record in &outcome.results {
                    print_record(record);
                }
            }
        }
        Commands::Diagnose {
            warehouse,
            rack,
            row,
            column,
            fault,
            resolution,
            note,
            ip,
        } => {
            let coord = LocationCoordinate::new(warehouse, rack, row, column);
            let mut session = require_session(&coordinator, &coord).await?;
            let resolution = parse_resolution(&resolution)?;
            match coordinator
                .submit_diagnosis(&mut session, fault, resolution, note, ip)
                .await?
            {
                DiagnosisOutcome::Recorded => println!("Diagnosis recorded."),
                DiagnosisOutcome::ContinueToRma { .. } => {
                    println!(
                        "Resolution is RMA: nothing was recorded. \
                         Run `rackflow rma` to submit the RMA."
                    );
                }
            }
        }
        Commands::Rma {
            warehouse,
            rack,
            row,
            column,
            ip,
            fault,
            log,
            psu_model,
            psu_sn,
            cb_sn,
            hb1_sn,
            hb2_sn,
            hb3_sn,
        } => {
            let coord = LocationCoordinate::new(warehouse, rack, row, column);
            let mut session = require_session(&coordinator, &coord).await?;
            let mut form = RmaForm::prefill(session.record());
            form.port_ip = ip;
            if let Some(fault) = fault {
                form.fault_category = Some(fault);
            }
            if let Some(log) = log {
                form.fault_log = log;
            }
            if let Some(value) = psu_model {
                form.power_supply_model = value;
            }
            if let Some(value) = psu_sn {
                form.power_supply_serial = value;
            }
            if let Some(value) = cb_sn {
                form.control_board_serial = value;
            }
            for (slot, value) in [hb1_sn, hb2_sn, hb3_sn].into_iter().enumerate() {
                if let Some(value) = value {
                    form.hashboard_serials[slot] = value;
                }
            }
            coordinator.submit_rma(&mut session, &form).await?;
            println!("RMA submitted.");
        }
        Commands::CancelRma {
            warehouse,
            rack,
            row,
            column,
        } => {
            let coord = LocationCoordinate::new(warehouse, rack, row, column);
            let mut session = require_session(&coordinator, &coord).await?;
            coordinator.cancel_rma(&mut session).await?;
            println!("RMA cancelled.");
        }
        Commands::Transfer {
            warehouse,
            rack,
            row,
            column,
            reason,
        } => {
            let coord = LocationCoordinate::new(warehouse, rack, row, column);
            let mut session = require_session(&coordinator, &coord).await?;
            coordinator.request_transfer(&mut session, reason).await?;
            println!("Transfer to lab requested.");
        }
        Commands::Conciliate {
            warehouse,
            rack,
            row,
            column,
            target,
            part,
            note,
            coolers,
        } => {
            let coord = LocationCoordinate::new(warehouse, rack, row, column);
            let mut session = require_session(&coordinator, &coord).await?;
            let target = parse_target(&target)?;
            if !coordinator.conciliation_targets(&coord).contains(&target) {
                bail!("that conciliation target is not available at this coordinate");
            }
            coordinator
                .request_conciliation(&mut session, target, part, note, coolers)
                .await?;
            println!("Conciliation requested.");
        }
        Commands::Lab(lab) => match lab {
            LabCommands::Intake { serial } => {
                let record = find_by_serial(&coordinator, &serial).await?;
                coordinator.lab_intake(&record).await?;
                println!("Unit moved onto the workbench.");
            }
            LabCommands::Complete { serial, note } => {
                let record = find_by_serial(&coordinator, &serial).await?;
                coordinator.lab_complete(&record, note).await?;
                println!("Repair completed; unit returned to lab stock.");
            }
            LabCommands::Scrap {
                serial,
                kind,
                reason,
            } => {
                let record = find_by_serial(&coordinator, &serial).await?;
                let kind = parse_scrap_kind(&kind)?;
                coordinator.lab_scrap(&record, kind, reason).await?;
                println!("Unit scrapped.");
            }
        },
    }

    Ok(())
}

async fn require_session<S: rackflow::EquipmentStore>(
    coordinator: &WorkflowCoordinator<S>,
    coord: &LocationCoordinate,
) -> Result<WorkflowSession> {
    match coordinator.open_session(coord).await? {
        LookupOutcome::Found(session) => Ok(*session),
        LookupOutcome::Vacant => bail!(
            "no equipment at {}-{}-{}-{}; the slot is empty",
            coord.warehouse_id,
            coord.rack,
            coord.row,
            coord.column
        ),
    }
}

async fn find_by_serial<S: rackflow::EquipmentStore>(
    coordinator: &WorkflowCoordinator<S>,
    serial: &str,
) -> Result<EquipmentRecord> {
    let outcome = coordinator.search(serial).await?;
    match outcome.direct_hit() {
        Some(record) => Ok(record.clone()),
        None if outcome.total > 1 => bail!(
            "'{serial}' matched {} units; use the full serial",
            outcome.total
        ),
        None => bail!("no equipment matched '{serial}'"),
    }
}

fn print_record(record: &EquipmentRecord) {
    let serial = record.physical_serial.as_deref().unwrap_or("(no serial)");
    let model = record.model.as_deref().unwrap_or("unknown model");
    println!(
        "  {serial}  {model}  state={}  lifecycle={}",
        serde_json::to_value(record.process_state())
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_default(),
        rackflow::lifecycle::classify(record),
    );
    if let Some(detail) = &record.diagnosis_detail {
        println!("    open RMA: {detail}");
    }
    if record.pending_transfer {
        println!("    transfer to lab pending");
    }
}

fn parse_resolution(value: &str) -> Result<DiagnosisResolution> {
    match value.to_ascii_lowercase().as_str() {
        "rma" => Ok(DiagnosisResolution::Rma),
        "repaired" | "reparado" => Ok(DiagnosisResolution::RepairedOnSite),
        "observation" | "en_observacion" => Ok(DiagnosisResolution::UnderObservation),
        other => Err(anyhow!(
            "unknown resolution '{other}'; expected rma, repaired or observation"
        )),
    }
}

fn parse_target(value: &str) -> Result<ConciliationTarget> {
    match value.to_ascii_uppercase().as_str() {
        "WH" => Ok(ConciliationTarget::InPlace),
        "LAB" => Ok(ConciliationTarget::Lab),
        other => Err(anyhow!("unknown conciliation target '{other}'; expected wh or lab")),
    }
}

fn parse_scrap_kind(value: &str) -> Result<ScrapKind> {
    match value.to_ascii_lowercase().as_str() {
        "piezas" | "parts" => Ok(ScrapKind::PartsDonor),
        "basura" | "disposal" => Ok(ScrapKind::Disposal),
        other => Err(anyhow!("unknown scrap kind '{other}'; expected piezas or basura")),
    }
}
