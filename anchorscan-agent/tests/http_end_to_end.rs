use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anchorscan_agent::infra::api_client::HttpAnchorApi;
use anchorscan_agent::infra::radio_bridge::{BridgeSinks, RadioBridge};
use anchorscan_core::AnchorError;
use anchorscan_core::beacon::{Namespace, UidFrame};
use anchorscan_core::orchestrator::{ControlCommand, Orchestrator, OrchestratorConfig};
use anchorscan_core::ports::AnchorApi;
use anchorscan_model::{AnchorId, RelationshipUpdate, ScanDataEntry};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::timeout;
use url::Url;

const TOKEN: &str = "test-token";
const INSTANCE_A: [u8; 6] = [0x0A, 0, 0, 0, 0, 0x01];
const INSTANCE_B: [u8; 6] = [0x0B, 0, 0, 0, 0, 0x02];

#[derive(Debug)]
struct Backend {
    jobs: Mutex<Vec<Value>>,
    posted: mpsc::UnboundedSender<(&'static str, Value)>,
    seen_queries: Mutex<Vec<HashMap<String, String>>>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

async fn jobs(
    State(backend): State<Arc<Backend>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    if !authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    backend.seen_queries.lock().unwrap().push(query);
    let mut queue = backend.jobs.lock().unwrap();
    let next = if queue.is_empty() {
        json!([])
    } else {
        json!([queue.remove(0)])
    };
    Ok(Json(next))
}

async fn roster(
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    if !authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    if query.get("event_id").map(String::as_str) != Some("77") {
        return Err(StatusCode::NOT_FOUND);
    }
    let ns = Namespace::DEFAULT.to_hex();
    Ok(Json(json!([
        {"tag_id": "T-A", "tag_uuid": format!("{ns}{}", hex::encode(INSTANCE_A)), "tag_db_id": 501},
        {"tag_id": "T-B", "tag_uuid": format!("{ns}{}", hex::encode(INSTANCE_B)).to_lowercase(), "tag_db_id": "502"},
    ])))
}

async fn scan_data(State(backend): State<Arc<Backend>>, Json(body): Json<Value>) -> &'static str {
    let _ = backend.posted.send(("scan_data", body));
    "{\"status\":\"ok\"}"
}

async fn relationship(State(backend): State<Arc<Backend>>, Json(body): Json<Value>) -> &'static str {
    let _ = backend.posted.send(("jet-rel", body));
    "{\"status\":\"ok\"}"
}

async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "database down")
}

async fn serve(
    queue: Vec<Value>,
) -> (SocketAddr, Arc<Backend>, mpsc::UnboundedReceiver<(&'static str, Value)>) {
    let (posted, posted_rx) = mpsc::unbounded_channel();
    let backend = Arc::new(Backend {
        jobs: Mutex::new(queue),
        posted,
        seen_queries: Mutex::new(Vec::new()),
    });
    let app = Router::new()
        .route("/api/scan-by-anchor/", get(jobs))
        .route("/api/get-tags-by-event/", get(roster))
        .route("/api/scan_data", post(scan_data))
        .route("/api/jet-rel/230", post(relationship))
        .route("/broken/scan_data", post(broken))
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, backend, posted_rx)
}

fn client(addr: SocketAddr, prefix: &str, token: Option<&str>) -> HttpAnchorApi {
    HttpAnchorApi::with_client(
        reqwest::Client::new(),
        Url::parse(&format!("http://{addr}/{prefix}")).unwrap(),
        token.map(str::to_string),
    )
}

fn job_json() -> Value {
    json!({
        "scan_id": 9001,
        "anchor_db_id": "12",
        "scan_duration": "30",
        "scan_timeout": null,
        "scan_min_rssi": "-90",
        "scan_created": "2024-05-01 10:00:00",
        "event.event_id": 77,
        "server_time": "2024-05-01 10:00:00"
    })
}

#[tokio::test]
async fn client_speaks_the_backend_protocol() {
    let (addr, backend, mut posted) = serve(vec![job_json()]).await;
    let api = client(addr, "api", Some(TOKEN));
    let anchor = AnchorId::parse("00aa11bb22cc").unwrap();

    let jobs = api.poll_jobs(&anchor).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].scan_id, "9001");
    assert_eq!(jobs[0].event_id, "77");
    assert_eq!(jobs[0].min_rssi, Some(-90));
    assert_eq!(jobs[0].timeout, None);
    assert_eq!(
        backend.seen_queries.lock().unwrap()[0].get("anchor_id").map(String::as_str),
        Some("00aa11bb22cc")
    );
    assert!(api.poll_jobs(&anchor).await.unwrap().is_empty());

    let roster = api.fetch_roster("77").await.unwrap();
    assert_eq!(roster.len(), 2);
    assert_eq!(roster[0].db_id, "501");

    let entries = vec![ScanDataEntry {
        scan_id: "9001".into(),
        scan_data_tag_id: "501".into(),
        scan_data_tag_rssi: -64,
        scan_data_anchor_id: "12".into(),
    }];
    let body = api.upload_scan_data(&entries).await.unwrap();
    assert!(body.contains("ok"));
    let (kind, payload) = posted.recv().await.unwrap();
    assert_eq!(kind, "scan_data");
    assert_eq!(
        payload,
        json!([{
            "scan_id": "9001",
            "scan_data_tag_id": "501",
            "scan_data_tag_rssi": -64,
            "scan_data_anchor_id": "12"
        }])
    );

    api.update_relationship(&RelationshipUpdate::parent_link("12", "9001"))
        .await
        .unwrap();
    let (kind, payload) = posted.recv().await.unwrap();
    assert_eq!(kind, "jet-rel");
    assert_eq!(
        payload,
        json!({"parent_id": "12", "child_id": "9001", "context": "parent", "store_items_type": "update"})
    );
}

#[tokio::test]
async fn client_maps_http_failures() {
    let (addr, _backend, _posted) = serve(Vec::new()).await;
    let anchor = AnchorId::parse("00aa11bb22cc").unwrap();

    let anonymous = client(addr, "api", None);
    assert!(matches!(
        anonymous.poll_jobs(&anchor).await,
        Err(AnchorError::Unauthorized(_))
    ));

    let broken = client(addr, "broken", Some(TOKEN));
    match broken.upload_scan_data(&[]).await {
        Err(AnchorError::Http { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "database down");
        }
        other => panic!("unexpected result: {other:?}"),
    }

    let missing = client(addr, "api", Some(TOKEN));
    assert!(matches!(
        missing.fetch_roster("unknown").await,
        Err(AnchorError::Http { status: 404, .. })
    ));

    let unreachable = HttpAnchorApi::with_client(
        reqwest::Client::new(),
        Url::parse("http://127.0.0.1:1/").unwrap(),
        None,
    );
    assert!(matches!(
        unreachable.poll_jobs(&anchor).await,
        Err(AnchorError::Network(_))
    ));
}

fn advertisement(instance: [u8; 6], rssi: i32) -> String {
    let frame = UidFrame {
        tx_power: -18,
        namespace: Namespace::DEFAULT,
        instance,
    };
    format!(
        "{{\"event\":\"observation\",\"device_id\":\"dev-{}\",\"service_data\":\"{}\",\"rssi\":{rssi}}}\n",
        hex::encode(instance),
        hex::encode(frame.to_bytes())
    )
}

#[tokio::test]
async fn job_runs_end_to_end_through_bridge_and_backend() {
    let (addr, _backend, mut posted) = serve(vec![job_json()]).await;
    let api = Arc::new(client(addr, "api/", Some(TOKEN)));

    let (mut helper_stdout, agent_stdout) = tokio::io::duplex(8192);
    let (agent_stdin, helper_stdin) = tokio::io::duplex(8192);
    let (observation_tx, observation_rx) = mpsc::channel(64);
    let (command_tx, mut command_rx) = mpsc::channel(8);
    let radio = RadioBridge::from_io(
        agent_stdout,
        agent_stdin,
        BridgeSinks {
            observations: observation_tx,
            commands: command_tx.clone(),
        },
    );

    helper_stdout
        .write_all(b"{\"event\":\"state\",\"ready\":true}\n")
        .await
        .unwrap();
    assert_eq!(
        command_rx.recv().await,
        Some(ControlCommand::RadioStateChanged { ready: true })
    );

    let config = OrchestratorConfig {
        poll_interval_ms: 50,
        ..OrchestratorConfig::default()
    };
    let orchestrator = Orchestrator::new(
        api,
        Box::new(radio),
        AnchorId::parse("00aa11bb22cc").unwrap(),
        config,
    );
    let run = tokio::spawn(orchestrator.run(observation_rx, command_rx));

    let mut helper_lines = BufReader::new(helper_stdin).lines();
    let start = timeout(Duration::from_secs(5), helper_lines.next_line())
        .await
        .expect("scan never started")
        .unwrap()
        .unwrap();
    assert_eq!(start, r#"{"command":"start","allow_duplicates":true}"#);

    for line in [
        advertisement(INSTANCE_A, -72),
        advertisement(INSTANCE_A, -95),
        advertisement([0xFF; 6], -30),
        advertisement(INSTANCE_B, -58),
    ] {
        helper_stdout.write_all(line.as_bytes()).await.unwrap();
    }

    let (kind, payload) = timeout(Duration::from_secs(5), posted.recv())
        .await
        .expect("no upload")
        .unwrap();
    assert_eq!(kind, "scan_data");
    assert_eq!(
        payload,
        json!([
            {"scan_id": "9001", "scan_data_tag_id": "502", "scan_data_tag_rssi": -58, "scan_data_anchor_id": "12"},
            {"scan_id": "9001", "scan_data_tag_id": "501", "scan_data_tag_rssi": -72, "scan_data_anchor_id": "12"}
        ])
    );
    let (kind, payload) = timeout(Duration::from_secs(5), posted.recv())
        .await
        .expect("no relationship update")
        .unwrap();
    assert_eq!(kind, "jet-rel");
    assert_eq!(payload["parent_id"], "12");
    assert_eq!(payload["child_id"], "9001");

    let stop = helper_lines.next_line().await.unwrap().unwrap();
    assert_eq!(stop, r#"{"command":"stop"}"#);

    command_tx.send(ControlCommand::Shutdown).await.unwrap();
    timeout(Duration::from_secs(5), run)
        .await
        .expect("orchestrator did not stop")
        .unwrap();
}
