// crates/dremio-module-dremio/tests/dremio_client.rs
// ============================================================================
// Module: Dremio Client Integration Tests
// Description: Drives the client against a scripted local HTTP server.
// Purpose: Verify endpoints, headers, job polling, and conflict handling.
// ============================================================================

//! ## Overview
//! A `tiny_http` server answers each request from a route table keyed by
//! method and raw URL. Requests are recorded for assertions.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    clippy::missing_docs_in_private_items,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use dremio_module_config::DremioSettings;
use dremio_module_config::ExtraUser;
use dremio_module_core::CatalogPath;
use dremio_module_core::DataFormat;
use dremio_module_core::MemoryLogSink;
use dremio_module_core::S3Credentials;
use dremio_module_dremio::Creation;
use dremio_module_dremio::DremioClient;
use dremio_module_dremio::DremioClientConfig;
use dremio_module_dremio::DremioError;
use dremio_module_dremio::JobId;
use dremio_module_dremio::JobPolling;
use dremio_module_dremio::Session;
use dremio_module_dremio::wait_ready;
use serde_json::Value;
use serde_json::json;
use tiny_http::Response;
use tiny_http::Server;
use tiny_http::StatusCode;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    url: String,
    authorization: Option<String>,
    body: String,
}

fn spawn_stub<F>(expected: usize, handler: F) -> (String, thread::JoinHandle<Vec<Recorded>>)
where
    F: Fn(&Recorded) -> (u16, String) + Send + 'static,
{
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let handle = thread::spawn(move || {
        let mut recorded = Vec::new();
        for _ in 0..expected {
            let Ok(Some(mut request)) = server.recv_timeout(Duration::from_secs(5)) else {
                break;
            };
            let mut body = String::new();
            let _ = request.as_reader().read_to_string(&mut body);
            let authorization = request
                .headers()
                .iter()
                .find(|header| header.field.equiv("Authorization"))
                .map(|header| header.value.as_str().to_string());
            let entry = Recorded {
                method: request.method().to_string(),
                url: request.url().to_string(),
                authorization,
                body,
            };
            let (status, payload) = handler(&entry);
            let response = Response::from_string(payload).with_status_code(StatusCode(status));
            let _ = request.respond(response);
            recorded.push(entry);
        }
        recorded
    });
    (format!("http://{addr}"), handle)
}

fn client(base_url: &str) -> DremioClient {
    DremioClient::new(DremioClientConfig {
        base_url: base_url.to_string(),
        timeout_ms: 5_000,
        ..DremioClientConfig::default()
    })
    .unwrap()
}

const fn fast_polling(attempts: u32) -> JobPolling {
    JobPolling {
        interval: Duration::from_millis(1),
        attempts,
    }
}

fn body_json(recorded: &Recorded) -> Value {
    serde_json::from_str(&recorded.body).unwrap()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn bootstrap_sends_null_authorization_and_tolerates_existing_user() {
    let (address, handle) = spawn_stub(1, |request: &Recorded| {
        if request.authorization.as_deref() == Some("_dremionull") {
            let message = "First user can only be created when no user is already registered";
            (400, json!({"errorMessage": message}).to_string())
        } else {
            (500, "{}".to_string())
        }
    });
    let result = client(&address).bootstrap_first_user(&DremioSettings::default()).unwrap();
    assert_eq!(result, Creation::AlreadyExists);
    let recorded = handle.join().unwrap();
    assert_eq!(recorded[0].method, "PUT");
    assert_eq!(recorded[0].url, "/apiv2/bootstrap/firstuser");
    assert_eq!(body_json(&recorded[0])["userName"], "adminUser");
}

#[test]
fn bootstrap_rejection_is_an_error() {
    let (address, handle) =
        spawn_stub(1, |_| (400, json!({"errorMessage": "bad email"}).to_string()));
    let err = client(&address).bootstrap_first_user(&DremioSettings::default()).unwrap_err();
    assert!(matches!(err, DremioError::Status { status: 400, .. }));
    handle.join().unwrap();
}

#[test]
fn login_builds_session_header() {
    let (address, handle) = spawn_stub(1, |request: &Recorded| {
        assert_eq!(request.url, "/apiv2/login");
        (200, json!({"token": "tok", "userName": "adminUser"}).to_string())
    });
    let session = client(&address).login("adminUser", "adminPwd1").unwrap();
    assert_eq!(session.authorization(), "_dremiotok");
    let recorded = handle.join().unwrap();
    assert_eq!(body_json(&recorded[0]), json!({"userName": "adminUser", "password": "adminPwd1"}));
}

#[test]
fn login_without_token_is_malformed() {
    let (address, handle) = spawn_stub(1, |_| (200, "{}".to_string()));
    assert!(matches!(client(&address).login("u", "p"), Err(DremioError::Malformed(_))));
    handle.join().unwrap();
}

#[test]
fn provisions_source_dataset_space_and_vds() {
    let job_polls = Arc::new(AtomicUsize::new(0));
    let polls = Arc::clone(&job_polls);
    let (address, handle) = spawn_stub(9, move |request: &Recorded| {
        match (request.method.as_str(), request.url.as_str()) {
            ("POST", "/api/v3/catalog") if request.body.contains("\"S3\"") => (200, String::new()),
            ("GET", "/api/v3/catalog/by-path/paysim/bucket/data") => {
                (200, json!({"entityType": "folder", "id": "f1"}).to_string())
            }
            ("POST", "/api/v3/catalog/dremio:%2Fpaysim%2Fbucket%2Fdata") => {
                (409, json!({"errorMessage": "already a dataset"}).to_string())
            }
            ("POST", "/api/v3/sql") => (200, json!({"id": "job-1"}).to_string()),
            ("GET", "/api/v3/job/job-1") => {
                let state = if polls.fetch_add(1, Ordering::SeqCst) == 0 {
                    "RUNNING"
                } else {
                    "COMPLETED"
                };
                (200, json!({"jobState": state}).to_string())
            }
            ("GET", "/api/v3/job/job-1/results") => (
                200,
                json!({"rowCount": 0, "schema": [{"name": "step"}, {"name": "nameOrig"}]})
                    .to_string(),
            ),
            ("POST", "/api/v3/catalog") => (200, json!({"id": "created"}).to_string()),
            _ => (404, "{}".to_string()),
        }
    });
    let dremio = client(&address);
    let session = Session::from_token("tok");
    let path = CatalogPath::from_source_and_path("paysim", "bucket/data");

    let source = dremio
        .create_s3_source(&session, "paysim", &S3Credentials::new("AK", "SK"), "minio:9000")
        .unwrap();
    assert_eq!(source, Creation::Created(None));
    let folder = dremio.catalog_by_path(&session, &path).unwrap();
    assert_eq!(folder["id"], "f1");
    assert_eq!(
        dremio.promote_folder(&session, &path, DataFormat::Parquet).unwrap(),
        Creation::AlreadyExists
    );
    let columns = dremio.table_columns(&session, &path, fast_polling(5)).unwrap();
    assert_eq!(columns, ["step", "nameOrig"]);
    assert!(matches!(
        dremio.create_space(&session, "Space-api").unwrap(),
        Creation::Created(Some(_))
    ));
    let sql = "SELECT \"step\" FROM x";
    dremio.create_virtual_dataset(&session, "Space-api", "paysim-vds", sql, &path).unwrap();

    let recorded = handle.join().unwrap();
    assert_eq!(recorded.len(), 9);
    assert!(recorded.iter().all(|request| request.authorization.as_deref() == Some("_dremiotok")));
    assert_eq!(
        body_json(&recorded[3]),
        json!({"sql": "SELECT * FROM \"paysim\".\"bucket\".\"data\" LIMIT 0"})
    );
    assert_eq!(job_polls.load(Ordering::SeqCst), 2);
    let vds = body_json(&recorded[8]);
    assert_eq!(vds["path"], json!(["Space-api", "paysim-vds"]));
    assert_eq!(vds["sqlContext"], json!(["paysim", "bucket", "data"]));
}

#[test]
fn failed_job_is_reported() {
    let (address, handle) = spawn_stub(1, |_| (200, json!({"jobState": "FAILED"}).to_string()));
    let dremio = client(&address);
    let job = JobId::from("job-9".to_string());
    let err = dremio.wait_for_job(&Session::from_token("t"), &job, fast_polling(3)).unwrap_err();
    assert!(matches!(err, DremioError::JobFailed { ref state, .. } if state == "FAILED"));
    handle.join().unwrap();
}

#[test]
fn job_polling_is_bounded() {
    let (address, handle) = spawn_stub(3, |_| (200, json!({"jobState": "RUNNING"}).to_string()));
    let dremio = client(&address);
    let job = JobId::from("job-7".to_string());
    let err = dremio.wait_for_job(&Session::from_token("t"), &job, fast_polling(3)).unwrap_err();
    assert!(matches!(err, DremioError::JobTimeout { attempts: 3, .. }));
    assert_eq!(handle.join().unwrap().len(), 3);
}

#[test]
fn create_user_posts_to_user_endpoint() {
    let (address, handle) = spawn_stub(1, |_| (200, json!({"id": "u1"}).to_string()));
    let user = ExtraUser {
        name: "analyst".to_string(),
        first_name: "Ana".to_string(),
        password: "pw".to_string(),
    };
    client(&address).create_user(&Session::from_token("t"), &user).unwrap();
    let recorded = handle.join().unwrap();
    assert_eq!(recorded[0].url, "/api/v3/user");
    assert_eq!(body_json(&recorded[0])["name"], "analyst");
}

#[test]
fn missing_catalog_entry_surfaces_status() {
    let (address, handle) =
        spawn_stub(1, |_| (404, json!({"errorMessage": "not found"}).to_string()));
    let err = client(&address)
        .catalog_by_path(&Session::from_token("t"), &CatalogPath::from_segments(["nope"]))
        .unwrap_err();
    let DremioError::Status {
        status,
        body,
    } = &err
    else {
        panic!("expected status error, got {err:?}");
    };
    assert_eq!(*status, 404);
    assert!(body.contains("not found"));
    handle.join().unwrap();
}

#[test]
fn existing_view_is_read_and_updated_with_its_tag() {
    let (address, handle) = spawn_stub(2, |request: &Recorded| match request.method.as_str() {
        "GET" => {
            let entity = json!({
                "type": "VIRTUAL_DATASET",
                "id": "vds-9",
                "tag": "t1",
                "path": ["Space-api", "sales-vds"],
                "sql": "SELECT * FROM \"sales\"",
            });
            (200, entity.to_string())
        }
        _ => (200, json!({"id": "vds-9", "tag": "t2"}).to_string()),
    });
    let dremio = client(&address);
    let session = Session::from_token("tok");
    let view = CatalogPath::from_segments(["Space-api", "sales-vds"]);
    let existing = dremio.virtual_dataset(&session, &view).unwrap();
    assert_eq!(existing.tag, "t1");
    assert_eq!(existing.sql, "SELECT * FROM \"sales\"");
    let context = CatalogPath::from_segments(["sales"]);
    let sql = "SELECT \"id\" FROM \"sales\"";
    dremio.update_virtual_dataset(&session, &existing, sql, &context).unwrap();

    let recorded = handle.join().unwrap();
    assert_eq!(recorded[0].url, "/api/v3/catalog/by-path/Space-api/sales-vds");
    assert_eq!(recorded[1].method, "PUT");
    assert_eq!(recorded[1].url, "/api/v3/catalog/vds-9");
    assert_eq!(recorded[1].authorization.as_deref(), Some("_dremiotok"));
    let update = body_json(&recorded[1]);
    assert_eq!(update["tag"], "t1");
    assert_eq!(update["path"], json!(["Space-api", "sales-vds"]));
    assert_eq!(update["sql"], "SELECT \"id\" FROM \"sales\"");
}

#[test]
fn folder_entry_is_not_a_view() {
    let (address, handle) = spawn_stub(1, |_: &Recorded| {
        (200, json!({"entityType": "folder", "id": "f-1"}).to_string())
    });
    let view = CatalogPath::from_segments(["Space-api", "sales-vds"]);
    let err = client(&address).virtual_dataset(&Session::from_token("t"), &view).unwrap_err();
    assert!(matches!(err, DremioError::Malformed(_)));
    handle.join().unwrap();
}

#[test]
fn readiness_probe_succeeds_on_listening_socket() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let log = MemoryLogSink::new();
    wait_ready(&address, 3, Duration::from_millis(1), &log).unwrap();
    assert!(log.contains_message("dremio accepts connections"));
}

#[test]
fn readiness_probe_gives_up() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap().to_string();
    drop(listener);
    let log = MemoryLogSink::new();
    let err = wait_ready(&address, 2, Duration::from_millis(1), &log).unwrap_err();
    assert!(matches!(err, DremioError::NotReady { attempts: 2, .. }));
    assert_eq!(log.events().iter().filter(|event| event.message == "wait dremio").count(), 2);
}
