#![allow(clippy::unwrap_used)]
// End-to-end sync tests: MapSession over HttpRepository against a stateful
// wiremock marker service.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use waymark_core::{
    ChannelPositionSource, Coordinates, CoreError, DeviceIdentity, FileIdentityStore,
    HttpRepository, MapSession, MarkerId, MarkerRepository, PositionFix, ReporterState,
    SyncConfig,
};

// ── Stateful marker service ─────────────────────────────────────────

#[derive(Default)]
struct ServiceState {
    markers: Mutex<Vec<Value>>,
    locations: Mutex<Vec<Value>>,
    next_id: AtomicU64,
    fail_list: AtomicBool,
}

impl ServiceState {
    fn seeded(markers: Vec<Value>) -> Arc<Self> {
        Arc::new(Self {
            markers: Mutex::new(markers),
            ..Self::default()
        })
    }

    fn marker_ids(&self) -> Vec<String> {
        self.markers
            .lock()
            .unwrap()
            .iter()
            .map(|m| m["_id"].as_str().unwrap().to_owned())
            .collect()
    }
}

struct ListMarkers(Arc<ServiceState>);
struct CreateMarker(Arc<ServiceState>);
struct DeleteMarker(Arc<ServiceState>);
struct SaveLocation(Arc<ServiceState>);

impl Respond for ListMarkers {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        if self.0.fail_list.load(Ordering::SeqCst) {
            return ResponseTemplate::new(500).set_body_json(json!({ "message": "db offline" }));
        }
        ResponseTemplate::new(200).set_body_json(Value::Array(self.0.markers.lock().unwrap().clone()))
    }
}

impl Respond for CreateMarker {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let mut body: Value = serde_json::from_slice(&request.body).unwrap();
        let n = self.0.next_id.fetch_add(1, Ordering::SeqCst);
        body["_id"] = json!(format!("new-{n}"));
        self.0.markers.lock().unwrap().push(body.clone());
        ResponseTemplate::new(201).set_body_json(body)
    }
}

impl Respond for DeleteMarker {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let id = request.url.path_segments().unwrap().next_back().unwrap().to_owned();
        let mut markers = self.0.markers.lock().unwrap();
        let before = markers.len();
        markers.retain(|m| m["_id"] != json!(id));
        if markers.len() == before {
            ResponseTemplate::new(404).set_body_json(json!({ "message": "Marker not found" }))
        } else {
            ResponseTemplate::new(200).set_body_json(json!({ "message": "Marker deleted" }))
        }
    }
}

impl Respond for SaveLocation {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap();
        self.0.locations.lock().unwrap().push(body);
        ResponseTemplate::new(201).set_body_json(json!({ "success": true }))
    }
}

fn stored(id: &str, lat: f64, lng: f64) -> Value {
    json!({
        "_id": id,
        "title": format!("Marker {id}"),
        "latitude": lat,
        "longitude": lng,
        "markerType": "custom"
    })
}

async fn service(state: &Arc<ServiceState>) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/markers"))
        .respond_with(ListMarkers(Arc::clone(state)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/markers"))
        .respond_with(CreateMarker(Arc::clone(state)))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path_regex(r"^/api/markers/[^/]+$"))
        .respond_with(DeleteMarker(Arc::clone(state)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/locations"))
        .respond_with(SaveLocation(Arc::clone(state)))
        .mount(&server)
        .await;
    server
}

fn config(server: &MockServer) -> SyncConfig {
    SyncConfig {
        api_url: server.uri().parse().unwrap(),
        ..SyncConfig::default()
    }
}

fn rendered<M, L>(session: &MapSession<M, L>) -> Vec<MarkerId>
where
    M: waymark_core::MarkerRepository,
    L: waymark_core::LocationRepository,
{
    session.view().markers().ids()
}

// ── Scenarios ───────────────────────────────────────────────────────

#[tokio::test]
async fn click_then_popup_delete_tracks_server_state() {
    let state = ServiceState::seeded(vec![stored("A", 1.0, 1.0), stored("B", 2.0, 2.0)]);
    let server = service(&state).await;
    let session = MapSession::connect(&config(&server), "dev-1".into()).unwrap();

    session.open().await.unwrap();
    assert_eq!(rendered(&session), vec![MarkerId::new("A"), MarkerId::new("B")]);

    let c = session.sync().click(3.0, 3.0).await.unwrap();
    assert_eq!(c.title, "Marker at 3.0000, 3.0000");
    assert_eq!(
        rendered(&session),
        vec![MarkerId::new("A"), MarkerId::new("B"), c.id.clone()]
    );

    let request = session
        .view()
        .markers()
        .get(&MarkerId::new("A"))
        .and_then(|m| m.delete_request().cloned())
        .unwrap();
    session.sync().delete(request).await.unwrap();

    assert_eq!(rendered(&session), vec![MarkerId::new("B"), c.id.clone()]);
    assert_eq!(state.marker_ids(), vec!["B".to_owned(), c.id.to_string()]);
    session.close().await;
}

#[tokio::test]
async fn layer_survives_failed_reconciliation() {
    let state = ServiceState::seeded(vec![stored("A", 1.0, 1.0)]);
    let server = service(&state).await;
    let session = MapSession::connect(&config(&server), "dev-1".into()).unwrap();
    session.open().await.unwrap();

    state.fail_list.store(true, Ordering::SeqCst);
    let err = session.sync().refresh().await.unwrap_err();

    assert!(err.is_transport(), "got {err:?}");
    assert_eq!(rendered(&session), vec![MarkerId::new("A")]);
    session.close().await;
}

#[tokio::test]
async fn invalid_remote_markers_are_not_rendered() {
    let state = ServiceState::seeded(vec![stored("A", 1.0, 1.0), stored("bad", 200.0, 0.0)]);
    let server = service(&state).await;
    let session = MapSession::connect(&config(&server), "dev-1".into()).unwrap();

    let r = session.open().await.unwrap();

    assert_eq!(r.diff.total, 1);
    assert_eq!(rendered(&session), vec![MarkerId::new("A")]);
    session.close().await;
}

#[tokio::test]
async fn malformed_records_do_not_fail_reconciliation() {
    let mut virtual_id = stored("V", 4.0, 4.0);
    virtual_id["id"] = json!("V");
    let state = ServiceState::seeded(vec![
        stored("A", 1.0, 1.0),
        virtual_id,
        json!({ "_id": "no-lat", "title": "Broken", "longitude": 5.0 }),
    ]);
    let server = service(&state).await;
    let session = MapSession::connect(&config(&server), "dev-1".into()).unwrap();

    let r = session.open().await.unwrap();

    assert_eq!(r.diff.total, 2);
    assert_eq!(rendered(&session), vec![MarkerId::new("A"), MarkerId::new("V")]);

    session.sync().refresh().await.unwrap();
    assert_eq!(rendered(&session), vec![MarkerId::new("A"), MarkerId::new("V")]);
    session.close().await;
}

#[tokio::test]
async fn deleting_twice_is_not_found() {
    let state = ServiceState::seeded(vec![stored("A", 1.0, 1.0)]);
    let server = service(&state).await;
    let repo = HttpRepository::new(&config(&server)).unwrap();

    repo.remove(&MarkerId::new("A")).await.unwrap();
    let err = repo.remove(&MarkerId::new("A")).await.unwrap_err();

    assert_eq!(
        err,
        CoreError::NotFound {
            entity_type: "marker".into(),
            identifier: "A".into(),
        }
    );
}

#[tokio::test]
async fn created_marker_is_listed() {
    let state = ServiceState::seeded(vec![]);
    let server = service(&state).await;
    let repo = HttpRepository::new(&config(&server)).unwrap();

    let draft = waymark_core::MarkerDraft::at(Coordinates::new(-33.8688, 151.2093).unwrap())
        .with_title("Sydney");
    let created = repo.create(&draft).await.unwrap();
    let listed = repo.list().await.unwrap();

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, created.id);
    assert_eq!(listed[0].title, "Sydney");
    assert_eq!(listed[0].position, draft.position);
}

#[tokio::test]
async fn reports_carry_the_persisted_device_identity() {
    let dir = tempfile::tempdir().unwrap();
    let identity_path = dir.path().join("identity.json");
    let device_id = DeviceIdentity::new(FileIdentityStore::new(&identity_path)).get_or_create();

    let state = ServiceState::seeded(vec![]);
    let server = service(&state).await;
    let session = MapSession::connect(&config(&server), device_id.clone()).unwrap();
    session.open().await.unwrap();

    let (tx, source) = ChannelPositionSource::new();
    session.track(source).await.unwrap();
    tx.send_fix(PositionFix::new(Coordinates::new(48.8566, 2.3522).unwrap()))
        .await;
    session
        .reporter()
        .state()
        .wait_for(|s| matches!(s, ReporterState::Reporting { published: 1 }))
        .await
        .unwrap();
    session.close().await;

    let reports = state.locations.lock().unwrap().clone();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["deviceId"], json!(device_id.as_str()));

    // A fresh process reads the same identifier back.
    let reloaded = DeviceIdentity::new(FileIdentityStore::new(&identity_path)).get_or_create();
    assert_eq!(reloaded, device_id);
}
