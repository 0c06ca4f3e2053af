#![allow(clippy::unwrap_used)]
// Integration tests for `ApiClient` using wiremock.

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use waymark_api::types::{LocationCreate, MarkerCreate, MarkerUpdate, Record};
use waymark_api::{ApiClient, Error, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let client = ApiClient::new(&server.uri(), &TransportConfig::default()).unwrap();
    (server, client)
}

// ── Markers ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_markers() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/markers"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "_id": "a", "title": "A", "latitude": 1.0, "longitude": 1.0, "markerType": "custom" },
            { "_id": "b", "title": "B", "description": "second", "latitude": 2.0, "longitude": 2.0, "markerType": "custom" }
        ])))
        .mount(&server)
        .await;

    let markers: Vec<_> = client
        .list_markers()
        .await
        .unwrap()
        .into_iter()
        .filter_map(Record::ok)
        .collect();

    assert_eq!(markers.len(), 2);
    assert_eq!(markers[0].id, "a");
    assert_eq!(markers[1].description.as_deref(), Some("second"));
}

#[tokio::test]
async fn test_list_markers_isolates_malformed_records() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/markers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "_id": "a", "id": "a", "title": "A", "latitude": 1.0, "longitude": 1.0, "markerType": "custom" },
            { "_id": "b", "title": "B", "longitude": 2.0 },
            { "_id": "c", "title": "C", "latitude": 3.0, "longitude": 3.0 }
        ])))
        .mount(&server)
        .await;

    let records = client.list_markers().await.unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].as_valid().map(|m| m.id.as_str()), Some("a"));
    assert!(matches!(records[1], Record::Invalid { .. }), "got {:?}", records[1]);
    assert_eq!(records[2].as_valid().map(|m| m.id.as_str()), Some("c"));
}

#[tokio::test]
async fn test_create_marker_sends_camel_case_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/markers"))
        .and(body_json(json!({
            "title": "Marker at 3.0000, 3.0000",
            "latitude": 3.0,
            "longitude": 3.0,
            "markerType": "custom"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "_id": "c",
            "title": "Marker at 3.0000, 3.0000",
            "latitude": 3.0,
            "longitude": 3.0,
            "markerType": "custom"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = client
        .create_marker(&MarkerCreate {
            title: "Marker at 3.0000, 3.0000".into(),
            description: None,
            latitude: 3.0,
            longitude: 3.0,
            marker_type: "custom".into(),
        })
        .await
        .unwrap();

    assert_eq!(created.id, "c");
}

#[tokio::test]
async fn test_update_marker() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/api/markers/a"))
        .and(body_json(json!({ "title": "Renamed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "a", "title": "Renamed", "latitude": 1.0, "longitude": 1.0, "markerType": "custom"
        })))
        .mount(&server)
        .await;

    let updated = client
        .update_marker(
            "a",
            &MarkerUpdate {
                title: Some("Renamed".into()),
                ..MarkerUpdate::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.title, "Renamed");
}

#[tokio::test]
async fn test_delete_marker_ignores_ack_body() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/markers/a"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "message": "Marker deleted" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    client.delete_marker("a").await.unwrap();
}

// ── Error mapping ───────────────────────────────────────────────────

#[tokio::test]
async fn test_delete_missing_marker_is_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/markers/ghost"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "message": "Marker not found" })),
        )
        .mount(&server)
        .await;

    let err = client.delete_marker("ghost").await.unwrap_err();

    assert!(err.is_not_found(), "got {err:?}");
    match err {
        Error::Api { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Marker not found");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_create_rejected_is_validation() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/markers"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "error": "latitude is required" })),
        )
        .mount(&server)
        .await;

    let err = client
        .create_marker(&MarkerCreate {
            title: "x".into(),
            description: None,
            latitude: 0.0,
            longitude: 0.0,
            marker_type: "custom".into(),
        })
        .await
        .unwrap_err();

    assert!(err.is_validation(), "got {err:?}");
}

#[tokio::test]
async fn test_server_error_with_plain_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/markers"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client.list_markers().await.unwrap_err();

    assert!(
        matches!(&err, Error::Api { status: 500, message } if message == "boom"),
        "got {err:?}"
    );
}

#[tokio::test]
async fn test_malformed_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/markers"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
        .mount(&server)
        .await;

    let err = client.list_markers().await.unwrap_err();

    assert!(
        matches!(err, Error::Deserialization { ref body, .. } if body.contains("proxy")),
        "got {err:?}"
    );
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    // Bind a server, remember its address, then drop it so the port is closed.
    let uri = {
        let server = MockServer::start().await;
        server.uri()
    };
    let client = ApiClient::new(&uri, &TransportConfig::default()).unwrap();

    let err = client.list_markers().await.unwrap_err();

    assert!(matches!(err, Error::Transport(_)), "got {err:?}");
}

// ── Locations ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_save_location() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/locations"))
        .and(body_json(json!({
            "deviceId": "dev-1",
            "latitude": 48.8566,
            "longitude": 2.3522
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    client
        .save_location(&LocationCreate {
            device_id: "dev-1".into(),
            latitude: 48.8566,
            longitude: 2.3522,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_location_history_and_latest() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/locations/dev-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "deviceId": "dev-1", "latitude": 1.0, "longitude": 1.0, "timestamp": "2024-03-13T10:00:00Z" },
            { "deviceId": "dev-1", "latitude": 1.5, "longitude": 1.5, "timestamp": "2024-03-13T10:00:05Z" }
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/locations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "deviceId": "dev-1", "latitude": 1.5, "longitude": 1.5 },
            { "deviceId": "dev-2", "latitude": -3.0, "longitude": 7.0 }
        ])))
        .mount(&server)
        .await;

    let history = client.location_history("dev-1").await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(
        history
            .iter()
            .all(|l| l.as_valid().is_some_and(|l| l.device_id == "dev-1"))
    );

    let latest = client.latest_locations().await.unwrap();
    assert_eq!(latest.len(), 2);
    assert_eq!(latest[1].as_valid().map(|l| l.device_id.as_str()), Some("dev-2"));
}
