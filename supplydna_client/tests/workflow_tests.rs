//! Lookup and registration workflow tests
//! Ledger access is a scripted wallet session; the relay and gateways are
//! real HTTP servers on loopback.

use async_trait::async_trait;
use axum::{extract::Path, http::StatusCode, routing::get, routing::post, Json, Router};
use chrono::Utc;
use image::{GrayImage, Luma};
use qrcode::{Color, QrCode};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use supplydna_client::{
    config::ClientConfig,
    errors::{LedgerError, UploadError, WorkflowError},
    history::{HistoryRepository, MemoryHistoryRepository, RecentLookup, MAX_RECENT},
    ipfs::{GatewayResolver, MetadataUploader, RelayUploader},
    ledger::{ComponentTuple, LedgerAccessor, LedgerReceipt, SessionError, WalletSession},
    stage::LifecycleStage,
    workflow::{
        CertificateResolver, LookupOutcome, LookupWorkflow, RegistrationForm, RegistrationPhase,
        RegistrationWorkflow,
    },
    ComponentRecord,
};

#[derive(Default)]
struct ScriptedSession {
    records: Mutex<Vec<ComponentRecord>>,
    writes: Mutex<Vec<(ComponentRecord, Option<String>)>>,
    reads: AtomicUsize,
    fail_reads: bool,
    revert_writes: Option<String>,
    hold_reads: Option<Arc<Notify>>,
}

impl ScriptedSession {
    fn with_records(records: Vec<ComponentRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Default::default()
        }
    }

    fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    fn write(&self, record: &ComponentRecord, uri: Option<&str>) -> Result<LedgerReceipt, SessionError> {
        if let Some(reason) = &self.revert_writes {
            return Err(SessionError::Reverted(reason.clone()));
        }
        self.writes
            .lock()
            .unwrap()
            .push((record.clone(), uri.map(str::to_string)));
        self.records.lock().unwrap().push(record.clone());
        Ok(LedgerReceipt {
            transaction_hash: format!("0xtx{}", self.write_count()),
            block_number: Some(10),
        })
    }
}

#[async_trait]
impl WalletSession for ScriptedSession {
    async fn request_accounts(&self) -> Result<String, SessionError> {
        Ok("0x00000000000000000000000000000000000000aa".to_string())
    }

    async fn components(&self, id: &str) -> Result<ComponentTuple, SessionError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(hold) = &self.hold_reads {
            hold.notified().await;
        }
        if self.fail_reads {
            return Err(SessionError::Transport("connection refused".to_string()));
        }
        let found = self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .unwrap_or_default();
        Ok((found.id, found.name, found.supplier, found.batch, found.date))
    }

    async fn register_component(&self, record: &ComponentRecord) -> Result<LedgerReceipt, SessionError> {
        self.write(record, None)
    }

    async fn register_component_with_metadata(
        &self,
        record: &ComponentRecord,
        metadata_uri: &str,
    ) -> Result<LedgerReceipt, SessionError> {
        self.write(record, Some(metadata_uri))
    }

    async fn token_id_of(&self, _id: &str) -> Result<String, SessionError> {
        Ok(self.write_count().to_string())
    }
}

struct FailingUploader {
    calls: AtomicUsize,
}

#[async_trait]
impl MetadataUploader for FailingUploader {
    async fn upload(&self, _payload: &Value) -> Result<String, UploadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(UploadError::UploadFailed("relay unreachable".to_string()))
    }
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Relay stub recording every POSTed payload
async fn relay(received: Arc<Mutex<Vec<Value>>>) -> String {
    let app = Router::new().route(
        "/upload",
        post(move |Json(body): Json<Value>| {
            let received = received.clone();
            async move {
                received.lock().unwrap().push(body);
                Json(serde_json::json!({ "IpfsHash": "QmCertificate" }))
            }
        }),
    );
    format!("{}/upload", serve(app).await)
}

/// JSON-RPC stand-in that answers every request with a chain id and counts hits
async fn counting_node(hits: Arc<AtomicUsize>) -> String {
    let app = Router::new().fallback(move || {
        let hits = hits.clone();
        async move {
            hits.fetch_add(1, Ordering::SeqCst);
            Json(serde_json::json!({ "jsonrpc": "2.0", "id": 1, "result": "0x7a69" }))
        }
    });
    serve(app).await
}

/// An address nothing listens on
async fn dead_node() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

fn wallet_config(rpc_url: String) -> ClientConfig {
    ClientConfig {
        rpc_url,
        contract_address: "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string(),
        private_key: Some(
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80".to_string(),
        ),
        ..ClientConfig::default()
    }
}

/// Write `text` as a QR code PNG into `dir`
fn qr_png(dir: &std::path::Path, text: &str) -> PathBuf {
    let code = QrCode::new(text.as_bytes()).unwrap();
    let width = code.width() as u32;
    let colors = code.to_colors();
    let (scale, quiet) = (8, 4);
    let size = (width + 2 * quiet) * scale;
    let image = GrayImage::from_fn(size, size, |x, y| {
        let (mx, my) = (x / scale, y / scale);
        let inside = (quiet..quiet + width).contains(&mx) && (quiet..quiet + width).contains(&my);
        if inside && colors[((my - quiet) * width + (mx - quiet)) as usize] == Color::Dark {
            Luma([0])
        } else {
            Luma([255])
        }
    });
    let path = dir.join("label.png");
    image.save(&path).unwrap();
    path
}

fn component(i: usize) -> ComponentRecord {
    ComponentRecord::new(
        format!("COMP-{}", i),
        format!("Part {}", i),
        "Acme",
        format!("DIST-{}", i),
        "2025-07-01",
    )
}

fn filled_form(password: &str) -> RegistrationForm {
    RegistrationForm {
        id: "COMP-NEW".to_string(),
        name: "Gearbox".to_string(),
        supplier: "Globex".to_string(),
        batch: "MFG-2025-07".to_string(),
        date: "2025-07-08".to_string(),
        password: password.to_string(),
    }
}

#[tokio::test]
async fn test_history_keeps_four_most_recent() {
    let session = Arc::new(ScriptedSession::with_records((1..=5).map(component).collect()));
    let repository = Arc::new(MemoryHistoryRepository::new());
    let workflow = LookupWorkflow::new(LedgerAccessor::new(session), repository.clone()).unwrap();

    for i in 1..=5 {
        let outcome = workflow.lookup(&format!("COMP-{}", i)).await;
        assert_eq!(outcome, LookupOutcome::Found(component(i)));
    }

    let ids: Vec<String> = workflow.history().into_iter().map(|e| e.id).collect();
    assert_eq!(ids, vec!["COMP-5", "COMP-4", "COMP-3", "COMP-2"]);
    assert_eq!(workflow.history().len(), MAX_RECENT);
    assert_eq!(workflow.history()[0].status, "Part 5");

    let persisted: Vec<String> = repository.load().unwrap().into_iter().map(|e| e.id).collect();
    assert_eq!(persisted, ids);
}

#[tokio::test]
async fn test_structured_qr_payload_is_looked_up_by_id() {
    let session = Arc::new(ScriptedSession::with_records(vec![component(1)]));
    let workflow = LookupWorkflow::new(
        LedgerAccessor::new(session),
        Arc::new(MemoryHistoryRepository::new()),
    )
    .unwrap();

    let outcome = workflow
        .lookup("{'id':'COMP-1','name':'Part 1'}")
        .await;
    assert_eq!(outcome, LookupOutcome::Found(component(1)));

    let view = workflow.view();
    assert_eq!(view.input, "COMP-1");
    assert_eq!(view.stage(), Some(LifecycleStage::Distribution));
    assert!(view.error.is_none());
}

#[tokio::test]
async fn test_zero_valued_record_is_not_found() {
    let session = Arc::new(ScriptedSession::default());
    let repository = Arc::new(MemoryHistoryRepository::new());
    let workflow = LookupWorkflow::new(LedgerAccessor::new(session), repository.clone()).unwrap();

    let outcome = workflow.lookup("COMP-404").await;
    assert_eq!(
        outcome,
        LookupOutcome::NotFound {
            id: "COMP-404".to_string()
        }
    );

    let view = workflow.view();
    assert!(view.component.is_none());
    assert_eq!(view.error.as_deref(), Some("Component not found for this UUID!"));
    assert_eq!(view.stage_index(), -1);
    assert!(workflow.history().is_empty());
    assert!(repository.load().unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_lookup_clears_previous_component() {
    let session = Arc::new(ScriptedSession::with_records(vec![component(1)]));
    let workflow = LookupWorkflow::new(
        LedgerAccessor::new(session),
        Arc::new(MemoryHistoryRepository::new()),
    )
    .unwrap();
    workflow.lookup("COMP-1").await;
    assert!(workflow.view().component.is_some());

    workflow.lookup("COMP-2").await;
    assert!(workflow.view().component.is_none());
    assert_eq!(workflow.history().len(), 1);
}

#[tokio::test]
async fn test_ledger_errors_surface_as_messages() {
    let unavailable = LookupWorkflow::new(
        LedgerAccessor::unavailable(),
        Arc::new(MemoryHistoryRepository::new()),
    )
    .unwrap();
    assert_eq!(
        unavailable.lookup("COMP-1").await,
        LookupOutcome::Failed {
            message: "Please install MetaMask to use this feature!".to_string()
        }
    );

    let broken = Arc::new(ScriptedSession {
        fail_reads: true,
        ..Default::default()
    });
    let workflow = LookupWorkflow::new(
        LedgerAccessor::new(broken),
        Arc::new(MemoryHistoryRepository::new()),
    )
    .unwrap();
    assert_eq!(
        workflow.lookup("COMP-1").await,
        LookupOutcome::Failed {
            message: "Error during lookup, please try again.".to_string()
        }
    );
    assert!(workflow.view().component.is_none());
    assert!(workflow.history().is_empty());
}

#[tokio::test]
async fn test_blank_input_skips_ledger() {
    let session = Arc::new(ScriptedSession::default());
    let workflow = LookupWorkflow::new(
        LedgerAccessor::new(session.clone()),
        Arc::new(MemoryHistoryRepository::new()),
    )
    .unwrap();

    assert_eq!(workflow.lookup("   ").await, LookupOutcome::Skipped);
    assert_eq!(session.reads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_overlapping_lookup_is_refused() {
    let hold = Arc::new(Notify::new());
    let session = Arc::new(ScriptedSession {
        records: Mutex::new(vec![component(1)]),
        hold_reads: Some(hold.clone()),
        ..Default::default()
    });
    let workflow = Arc::new(
        LookupWorkflow::new(
            LedgerAccessor::new(session.clone()),
            Arc::new(MemoryHistoryRepository::new()),
        )
        .unwrap(),
    );

    let first = {
        let workflow = workflow.clone();
        tokio::spawn(async move { workflow.lookup("COMP-1").await })
    };
    while session.reads.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }
    assert!(workflow.is_busy());
    assert_eq!(workflow.lookup("COMP-1").await, LookupOutcome::Busy);

    hold.notify_one();
    assert_eq!(first.await.unwrap(), LookupOutcome::Found(component(1)));
    assert!(!workflow.is_busy());
    assert_eq!(session.reads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_registration_end_to_end() {
    let received: Arc<Mutex<Vec<Value>>> = Arc::default();
    let session = Arc::new(ScriptedSession::default());
    let uploader = Arc::new(RelayUploader::new(relay(received.clone()).await).unwrap());
    let workflow = RegistrationWorkflow::new(
        LedgerAccessor::new(session.clone()),
        uploader,
        true,
        "password",
    );

    let mut form = filled_form("");
    let success = workflow.submit(&mut form).await.unwrap();

    let bodies = received.lock().unwrap().clone();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["name"], "SupplyDNA Component - COMP-NEW");
    assert_eq!(bodies[0]["attributes"][2]["value"], "Globex");

    let writes = session.writes.lock().unwrap().clone();
    assert_eq!(writes.len(), 1);
    assert_eq!(
        writes[0].0,
        ComponentRecord::new("COMP-NEW", "Gearbox", "Globex", "MFG-2025-07", "2025-07-08")
    );
    assert_eq!(writes[0].1.as_deref(), Some("ipfs://QmCertificate"));

    assert_eq!(workflow.phase(), RegistrationPhase::Success);
    assert_eq!(success.token_id.as_deref(), Some("1"));
    assert_eq!(success.transaction_hash, "0xtx1");
    assert_eq!(success.metadata_uri.as_deref(), Some("ipfs://QmCertificate"));
    assert!(form.is_empty());
    assert_eq!(form.id, "");
}

#[tokio::test]
async fn test_registration_with_passphrase() {
    let received: Arc<Mutex<Vec<Value>>> = Arc::default();
    let session = Arc::new(ScriptedSession::default());
    let workflow = RegistrationWorkflow::new(
        LedgerAccessor::new(session.clone()),
        Arc::new(RelayUploader::new(relay(received.clone()).await).unwrap()),
        false,
        "password",
    );

    let mut form = filled_form("password");
    let success = workflow.submit(&mut form).await.unwrap();

    assert_eq!(success.message, "Component registered successfully!");
    assert!(success.token_id.is_none());
    assert_eq!(session.write_count(), 1);
    assert_eq!(session.writes.lock().unwrap()[0].1, None);
    assert!(received.lock().unwrap().is_empty());
    assert!(form.is_empty());
}

#[tokio::test]
async fn test_upload_failure_prevents_ledger_write() {
    let session = Arc::new(ScriptedSession::default());
    let uploader = Arc::new(FailingUploader {
        calls: AtomicUsize::new(0),
    });
    let workflow = RegistrationWorkflow::new(
        LedgerAccessor::new(session.clone()),
        uploader.clone(),
        true,
        "password",
    );

    let mut form = filled_form("");
    let err = workflow.submit(&mut form).await.unwrap_err();

    assert!(matches!(err, WorkflowError::Upload(_)));
    assert_eq!(uploader.calls.load(Ordering::SeqCst), 1);
    assert_eq!(session.write_count(), 0);
    assert_eq!(workflow.phase(), RegistrationPhase::Error);
    assert_eq!(form, filled_form(""));
}

#[tokio::test]
async fn test_validation_fails_locally() {
    let session = Arc::new(ScriptedSession::default());
    let uploader = Arc::new(FailingUploader {
        calls: AtomicUsize::new(0),
    });
    let workflow = RegistrationWorkflow::new(
        LedgerAccessor::new(session.clone()),
        uploader.clone(),
        false,
        "password",
    );

    let mut wrong_password = filled_form("letmein");
    let err = workflow.submit(&mut wrong_password).await.unwrap_err();
    assert_eq!(err.registration_message(), "Incorrect password.");

    let mut missing = filled_form("password");
    missing.batch = "  ".to_string();
    let err = workflow.submit(&mut missing).await.unwrap_err();
    assert_eq!(err.registration_message(), "All fields are required.");
    assert_eq!(missing.name, "Gearbox");

    assert_eq!(session.write_count(), 0);
    assert_eq!(uploader.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_rejected_write_keeps_form() {
    let session = Arc::new(ScriptedSession {
        revert_writes: Some("Component already exists".to_string()),
        ..Default::default()
    });
    let workflow = RegistrationWorkflow::new(
        LedgerAccessor::new(session),
        Arc::new(FailingUploader {
            calls: AtomicUsize::new(0),
        }),
        false,
        "password",
    );

    let mut form = filled_form("password");
    let err = workflow.submit(&mut form).await.unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Ledger(LedgerError::RegistrationFailed(_))
    ));
    assert_eq!(
        err.registration_message(),
        "Registration failed. Component already exists"
    );
    assert_eq!(form, filled_form("password"));
}

#[tokio::test]
async fn test_registration_without_wallet() {
    let workflow = RegistrationWorkflow::new(
        LedgerAccessor::unavailable(),
        Arc::new(FailingUploader {
            calls: AtomicUsize::new(0),
        }),
        false,
        "password",
    );
    let err = workflow.submit(&mut filled_form("password")).await.unwrap_err();
    assert_eq!(err.registration_message(), "MetaMask is required.");
}

#[tokio::test]
async fn test_certificate_resolves_through_mirrors() {
    let down = Router::new().route("/ipfs/:cid", get(|| async { StatusCode::BAD_GATEWAY }));
    let up = Router::new().route(
        "/ipfs/:cid",
        get(|Path(cid): Path<String>| async move {
            Json(serde_json::json!({
                "name": "SupplyDNA Component - COMP-NEW",
                "description": format!("pinned as {}", cid),
                "image": "https://via.placeholder.com/400x400/3498db/ffffff?text=SupplyDNA+Component",
                "attributes": [{ "trait_type": "Component ID", "value": "COMP-NEW" }],
                "external_url": "https://supplydna.com",
                "background_color": "3498db"
            }))
        }),
    );
    let gateway = GatewayResolver::new(
        vec![
            format!("{}/ipfs/", serve(down).await),
            format!("{}/ipfs/", serve(up).await),
        ],
        Duration::from_secs(2),
    )
    .unwrap();
    let resolver = CertificateResolver::new(gateway, "sepolia", "0xRegistry");

    let view = resolver
        .resolve("COMP-NEW", "ipfs://QmCertificate", "3")
        .await
        .unwrap();

    assert_eq!(view.explorer_url, "https://sepolia.etherscan.io/token/0xRegistry?a=3");
    let metadata = view.typed_metadata().unwrap();
    assert_eq!(metadata.description, "pinned as QmCertificate");
    assert_eq!(metadata.attribute("Component ID"), Some("COMP-NEW"));
}

#[tokio::test]
async fn test_local_validation_never_reaches_the_node() {
    let hits = Arc::new(AtomicUsize::new(0));
    let config = wallet_config(counting_node(hits.clone()).await);

    let workflow = RegistrationWorkflow::new(
        LedgerAccessor::from_config(&config),
        Arc::new(FailingUploader {
            calls: AtomicUsize::new(0),
        }),
        false,
        "password",
    );
    let err = workflow.submit(&mut filled_form("wrong")).await.unwrap_err();
    assert_eq!(err.registration_message(), "Incorrect password.");

    let mut missing = filled_form("password");
    missing.date.clear();
    let err = workflow.submit(&mut missing).await.unwrap_err();
    assert_eq!(err.registration_message(), "All fields are required.");

    let lookup = LookupWorkflow::new(
        LedgerAccessor::from_config(&config),
        Arc::new(MemoryHistoryRepository::new()),
    )
    .unwrap();
    assert_eq!(lookup.lookup("  ").await, LookupOutcome::Skipped);

    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unreachable_node_is_reported_by_the_workflow() {
    let config = wallet_config(dead_node().await);

    let lookup = LookupWorkflow::new(
        LedgerAccessor::from_config(&config),
        Arc::new(MemoryHistoryRepository::new()),
    )
    .unwrap();
    assert_eq!(
        lookup.lookup("COMP-1").await,
        LookupOutcome::Failed {
            message: "Error during lookup, please try again.".to_string()
        }
    );

    let registration = RegistrationWorkflow::new(
        LedgerAccessor::from_config(&config),
        Arc::new(FailingUploader {
            calls: AtomicUsize::new(0),
        }),
        false,
        "password",
    );
    let mut form = filled_form("password");
    let err = registration.submit(&mut form).await.unwrap_err();
    assert!(err
        .registration_message()
        .starts_with("Registration failed. Failed to get chain ID"));
    assert_eq!(form, filled_form("password"));
}

#[tokio::test]
async fn test_qr_image_lookup() {
    let session = Arc::new(ScriptedSession::with_records(vec![component(1)]));
    let workflow = LookupWorkflow::new(
        LedgerAccessor::new(session),
        Arc::new(MemoryHistoryRepository::new()),
    )
    .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = qr_png(dir.path(), "{'id':'COMP-1','name':'Part 1'}");

    assert_eq!(
        workflow.lookup_qr_image(&path).await,
        LookupOutcome::Found(component(1))
    );
    assert_eq!(workflow.view().input, "COMP-1");
    assert_eq!(workflow.history()[0].id, "COMP-1");
}

#[tokio::test]
async fn test_unreadable_qr_image() {
    let session = Arc::new(ScriptedSession::with_records(vec![component(1)]));
    let workflow = LookupWorkflow::new(
        LedgerAccessor::new(session.clone()),
        Arc::new(MemoryHistoryRepository::new()),
    )
    .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("photo.png");
    GrayImage::from_pixel(120, 120, Luma([255])).save(&path).unwrap();

    assert_eq!(
        workflow.lookup_qr_image(&path).await,
        LookupOutcome::Failed {
            message: "Could not scan QR from image.".to_string()
        }
    );
    assert_eq!(
        workflow.view().error.as_deref(),
        Some("Could not scan QR from image.")
    );
    assert_eq!(session.reads.load(Ordering::SeqCst), 0);
    assert!(workflow.history().is_empty());
}

#[tokio::test]
async fn test_persisted_history_is_bounded_on_load() {
    let stored: Vec<RecentLookup> = (1..=6)
        .rev()
        .map(|i| RecentLookup::for_record(&component(i), Utc::now()))
        .collect();
    let session = Arc::new(ScriptedSession::with_records(vec![component(7)]));
    let workflow = LookupWorkflow::new(
        LedgerAccessor::new(session),
        Arc::new(MemoryHistoryRepository::with_entries(stored)),
    )
    .unwrap();

    let ids: Vec<String> = workflow.history().into_iter().map(|e| e.id).collect();
    assert_eq!(ids, vec!["COMP-6", "COMP-5", "COMP-4", "COMP-3"]);

    workflow.lookup("COMP-7").await;
    let ids: Vec<String> = workflow.history().into_iter().map(|e| e.id).collect();
    assert_eq!(ids, vec!["COMP-7", "COMP-6", "COMP-5", "COMP-4"]);
}

#[tokio::test]
async fn test_fields_are_written_as_entered() {
    let session = Arc::new(ScriptedSession::default());
    let workflow = RegistrationWorkflow::new(
        LedgerAccessor::new(session.clone()),
        Arc::new(FailingUploader {
            calls: AtomicUsize::new(0),
        }),
        false,
        "password",
    );
    assert!(!workflow.mints_certificate());

    let mut form = filled_form("password");
    form.name = " Gearbox  ".to_string();
    workflow.submit(&mut form).await.unwrap();

    assert_eq!(session.writes.lock().unwrap()[0].0.name, " Gearbox  ");
    assert!(!workflow.is_busy());
}
