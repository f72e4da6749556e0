//! Backend gateway tests
//!
//! These use wiremock to pin down the gateway's degradation contract:
//! missing equipment is an empty slot, transport noise on lookups is
//! absorbed, and an expired session is always surfaced distinctly.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rackflow::config::RetryConfig;
use rackflow::workflow::requests::{TransferDestination, TransferRequest, WorkflowRequest};
use rackflow::{BackendClient, EquipmentStore, GatewayError, LocationCoordinate, ProcessState};

/// Mock inventory backend for deterministic gateway testing.
struct BackendMock {
    server: MockServer,
}

impl BackendMock {
    async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    fn client(&self) -> BackendClient {
        self.client_with_timeout(Duration::from_secs(5))
    }

    fn client_with_timeout(&self, timeout: Duration) -> BackendClient {
        BackendClient::new(
            self.server.uri(),
            timeout,
            RetryConfig {
                max_attempts: 3,
                base_delay_ms: 10,
                max_delay_ms: 50,
            },
        )
        .unwrap()
    }

    async fn mock_lookup(&self, coord: &LocationCoordinate, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(format!(
                "/equipment/{}/{}/{}/{}",
                coord.warehouse_id, coord.rack, coord.row, coord.column
            )))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }
}

fn coord() -> LocationCoordinate {
    LocationCoordinate::new(2, 7, 1, 4)
}

#[tokio::test]
async fn lookup_decodes_a_present_record() {
    let mock = BackendMock::new().await;
    mock.mock_lookup(
        &coord(),
        ResponseTemplate::new(200).set_body_json(json!({
            "id": 11,
            "wh": 2,
            "rack": 7,
            "fila": 1,
            "columna": 4,
            "sn_fisica": "SN-11",
            "proceso_estado": "operativo",
            "traslado_pendiente": false
        })),
    )
    .await;

    let record = mock
        .client()
        .fetch_by_coordinate(&coord())
        .await
        .unwrap()
        .expect("record should be present");
    assert_eq!(record.id, Some(11));
    assert_eq!(record.physical_serial.as_deref(), Some("SN-11"));
    assert_eq!(record.process_state(), ProcessState::Operational);
}

#[tokio::test]
async fn missing_equipment_is_an_empty_slot_not_an_error() {
    let mock = BackendMock::new().await;
    mock.mock_lookup(&coord(), ResponseTemplate::new(404)).await;

    let outcome = mock.client().fetch_by_coordinate(&coord()).await.unwrap();
    assert!(outcome.is_none());
}

#[tokio::test]
async fn empty_json_body_is_an_empty_slot() {
    let mock = BackendMock::new().await;
    mock.mock_lookup(&coord(), ResponseTemplate::new(200).set_body_json(json!({})))
        .await;

    let outcome = mock.client().fetch_by_coordinate(&coord()).await.unwrap();
    assert!(outcome.is_none());
}

#[tokio::test]
async fn server_errors_on_lookup_degrade_to_empty_after_retries() {
    let mock = BackendMock::new().await;
    mock.mock_lookup(&coord(), ResponseTemplate::new(500)).await;

    let outcome = mock.client().fetch_by_coordinate(&coord()).await.unwrap();
    assert!(outcome.is_none());
}

#[tokio::test]
async fn transient_server_error_is_retried_then_succeeds() {
    let mock = BackendMock::new().await;
    Mock::given(method("GET"))
        .and(path("/equipment/2/7/1/4"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&mock.server)
        .await;
    mock.mock_lookup(
        &coord(),
        ResponseTemplate::new(200).set_body_json(json!({"id": 11, "sn_fisica": "SN-11"})),
    )
    .await;

    let record = mock.client().fetch_by_coordinate(&coord()).await.unwrap();
    assert_eq!(record.unwrap().id, Some(11));
}

#[tokio::test]
async fn unauthorized_means_session_expired() {
    let mock = BackendMock::new().await;
    mock.mock_lookup(&coord(), ResponseTemplate::new(401)).await;

    let err = mock
        .client()
        .fetch_by_coordinate(&coord())
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::SessionExpired));
}

#[tokio::test]
async fn login_redirect_means_session_expired() {
    let mock = BackendMock::new().await;
    mock.mock_lookup(
        &coord(),
        ResponseTemplate::new(302).insert_header("Location", "/login?next=%2Fequipment"),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html>sign in</html>"),
        )
        .mount(&mock.server)
        .await;

    let err = mock
        .client()
        .fetch_by_coordinate(&coord())
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::SessionExpired));
}

#[tokio::test]
async fn search_results_pass_through_in_backend_order() {
    let mock = BackendMock::new().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "SN-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "found": true,
            "total": 3,
            "resultados": [
                {"id": 3, "sn": "SN-13"},
                {"id": 1, "sn": "SN-11"},
                {"id": 2, "sn": "SN-12"}
            ]
        })))
        .mount(&mock.server)
        .await;

    let outcome = mock.client().search("SN-1").await.unwrap();
    assert!(outcome.found);
    assert_eq!(outcome.total, 3);
    let ids: Vec<_> = outcome.results.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![Some(3), Some(1), Some(2)]);
}

#[tokio::test]
async fn submit_posts_wire_payload_and_accepts_ok_ack() {
    let mock = BackendMock::new().await;
    Mock::given(method("POST"))
        .and(path("/transfer"))
        .and(body_partial_json(json!({
            "miner_id": 11,
            "destino": "LAB",
            "motivo": "RMA: PSU"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&mock.server)
        .await;

    mock.client()
        .submit(WorkflowRequest::Transfer(TransferRequest {
            equipment_id: 11,
            destination: TransferDestination::Lab,
            reason: "RMA: PSU".into(),
        }))
        .await
        .unwrap();
}

#[tokio::test]
async fn timed_out_mutation_is_sent_exactly_once() {
    let mock = BackendMock::new().await;
    Mock::given(method("POST"))
        .and(path("/transfer"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": true}))
                .set_delay(Duration::from_millis(1500)),
        )
        .expect(1)
        .mount(&mock.server)
        .await;

    let err = mock
        .client_with_timeout(Duration::from_millis(200))
        .submit(WorkflowRequest::Transfer(TransferRequest {
            equipment_id: 11,
            destination: TransferDestination::Lab,
            reason: "RMA: PSU".into(),
        }))
        .await
        .unwrap_err();
    // The backend may already have applied the move, so the caller
    // must hear about the failure instead of a silent re-send.
    assert!(matches!(err, GatewayError::Transport(_)));
}

#[tokio::test]
async fn html_error_page_on_lookup_is_not_session_expiry() {
    let mock = BackendMock::new().await;
    mock.mock_lookup(
        &coord(),
        ResponseTemplate::new(500)
            .insert_header("content-type", "text/html")
            .set_body_string("<html>internal server error</html>"),
    )
    .await;

    let outcome = mock.client().fetch_by_coordinate(&coord()).await.unwrap();
    assert!(outcome.is_none());
}

#[tokio::test]
async fn backend_rejection_surfaces_its_message() {
    let mock = BackendMock::new().await;
    Mock::given(method("POST"))
        .and(path("/transfer"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "status": "error",
            "message": "ya existe un traslado pendiente"
        })))
        .mount(&mock.server)
        .await;

    let err = mock
        .client()
        .submit(WorkflowRequest::Transfer(TransferRequest {
            equipment_id: 11,
            destination: TransferDestination::Lab,
            reason: "RMA".into(),
        }))
        .await
        .unwrap_err();
    match err {
        GatewayError::ConflictRejected { message } => {
            assert_eq!(message, "ya existe un traslado pendiente");
        }
        other => panic!("expected ConflictRejected, got {other:?}"),
    }
}
