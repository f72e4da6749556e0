//! End-to-end workflow tests against a mocked backend.
//!
//! These drive the coordinator through the real HTTP client so the
//! local gating, payload shapes and short-circuits are all checked at
//! the wire.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rackflow::config::RetryConfig;
use rackflow::workflow::requests::DiagnosisResolution;
use rackflow::{
    BackendClient, DiagnosisOutcome, EquipmentRecord, FaultCategory, LocationCoordinate,
    LookupOutcome, WorkflowCoordinator, WorkflowError, WorkflowSession,
};

const HYDRO_WH: u32 = 100;

async fn coordinator_for(server: &MockServer) -> WorkflowCoordinator<BackendClient> {
    let client = BackendClient::new(
        server.uri(),
        Duration::from_secs(5),
        RetryConfig {
            max_attempts: 2,
            base_delay_ms: 10,
            max_delay_ms: 50,
        },
    )
    .unwrap();
    WorkflowCoordinator::new(client, HYDRO_WH)
}

fn operational_record_json() -> serde_json::Value {
    json!({
        "id": 11,
        "wh": 2,
        "rack": 7,
        "fila": 1,
        "columna": 4,
        "sn_fisica": "SN-11",
        "mac_address": "AA:BB:CC",
        "ths": 110.0,
        "proceso_estado": "operativo",
        "traslado_pendiente": false
    })
}

async fn mount_lookup(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/equipment/2/7/1/4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn empty_slot_is_the_new_equipment_entry_point() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/equipment/2/7/1/4"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let coordinator = coordinator_for(&server).await;
    let outcome = coordinator
        .open_session(&LocationCoordinate::new(2, 7, 1, 4))
        .await
        .unwrap();
    assert!(matches!(outcome, LookupOutcome::Vacant));
}

#[tokio::test]
async fn rma_resolution_sends_no_diagnosis_then_rma_posts() {
    let server = MockServer::start().await;
    mount_lookup(&server, operational_record_json()).await;
    // The diagnosis endpoint must never be hit when the resolution is
    // RMA.
    Mock::given(method("POST"))
        .and(path("/diagnosis"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rma"))
        .and(body_partial_json(json!({
            "wh": 2,
            "rack": 7,
            "sn_fisica": "SN-11",
            "ip_rma": "10.0.0.4",
            "diagnostico_detalle": "PSU"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let coordinator = coordinator_for(&server).await;
    let coord = LocationCoordinate::new(2, 7, 1, 4);
    let LookupOutcome::Found(mut session) = coordinator.open_session(&coord).await.unwrap() else {
        panic!("expected a record");
    };

    let outcome = coordinator
        .submit_diagnosis(
            &mut session,
            FaultCategory::Psu,
            DiagnosisResolution::Rma,
            "no power at all".into(),
            "10.0.0.4".into(),
        )
        .await
        .unwrap();
    let DiagnosisOutcome::ContinueToRma { mut form } = outcome else {
        panic!("expected RMA continuation");
    };

    // Operator completes what the record could not pre-fill.
    form.power_supply_model = "APW121415".into();
    form.power_supply_serial = "PSU-9".into();
    coordinator.submit_rma(&mut session, &form).await.unwrap();
}

#[tokio::test]
async fn validation_failure_keeps_the_wire_quiet() {
    let server = MockServer::start().await;
    mount_lookup(&server, operational_record_json()).await;
    Mock::given(method("POST"))
        .and(path("/rma"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(0)
        .mount(&server)
        .await;

    let coordinator = coordinator_for(&server).await;
    let coord = LocationCoordinate::new(2, 7, 1, 4);
    let LookupOutcome::Found(mut session) = coordinator.open_session(&coord).await.unwrap() else {
        panic!("expected a record");
    };

    let form = rackflow::RmaForm::prefill(session.record());
    let err = coordinator.submit_rma(&mut session, &form).await.unwrap_err();
    assert!(matches!(err, WorkflowError::ValidationFailed { .. }));
}

#[tokio::test]
async fn pending_transfer_suppresses_cancel_and_retransfer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(0)
        .mount(&server)
        .await;

    let mut record: EquipmentRecord =
        serde_json::from_value(operational_record_json()).unwrap();
    record.diagnosis_detail = Some("PSU dead".into());
    record.pending_transfer = true;
    let mut session = WorkflowSession::new(LocationCoordinate::new(2, 7, 1, 4), record);

    let coordinator = coordinator_for(&server).await;
    assert!(coordinator.cancel_rma(&mut session).await.is_err());
    assert!(coordinator.request_transfer(&mut session, None).await.is_err());
    assert_eq!(
        session.actions(),
        vec![rackflow::EquipmentAction::RequestConciliation]
    );
}

#[tokio::test]
async fn lab_intake_then_complete_posts_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/lab/intake"))
        .and(body_partial_json(json!({"id": 11})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;
    let stamped_note = format!("[{}] psu replaced", chrono::Local::now().format("%Y-%m-%d"));
    Mock::given(method("POST"))
        .and(path("/lab/complete"))
        .and(body_partial_json(json!({"id": 11, "solucion": stamped_note})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let coordinator = coordinator_for(&server).await;

    let queued: EquipmentRecord =
        serde_json::from_value(json!({"id": 11, "sn": "SN-11", "estado": "en_laboratorio"}))
            .unwrap();
    coordinator.lab_intake(&queued).await.unwrap();

    let on_bench: EquipmentRecord =
        serde_json::from_value(json!({"id": 11, "sn": "SN-11", "estado": "en_reparacion"}))
            .unwrap();
    coordinator
        .lab_complete(&on_bench, "psu replaced".into())
        .await
        .unwrap();
}
