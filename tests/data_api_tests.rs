mod common;

use axum::http::{Request, StatusCode};
use common::{HUB_KEY, hub};
use serde_json::json;

#[tokio::test]
async fn requests_without_key_or_user_are_rejected() {
    let hub = hub("auth").await;

    let (status, body) = hub
        .send(Request::builder().uri("/api/rooms").header("x-user-id", "alice"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = hub
        .send(
            Request::builder()
                .uri("/api/rooms")
                .header("x-hub-key", "wrong")
                .header("x-user-id", "alice"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = hub
        .send(Request::builder().uri("/api/rooms").header("x-hub-key", HUB_KEY), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, _) = hub
        .send(
            Request::builder()
                .uri(format!("/api/rooms?key={HUB_KEY}"))
                .header("x-user-id", "alice"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn rooms_devices_and_cameras_round_trip() {
    let hub = hub("devices").await;

    let (status, room) = hub
        .call("POST", "/api/rooms", "alice", Some(json!({"name": "Sala", "icon": "sofa"})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let room_id = room["id"].as_i64().unwrap();

    let (status, lamp) = hub
        .call(
            "POST",
            "/api/devices",
            "alice",
            Some(json!({"name": "Luminária", "type": "light", "room_id": room_id})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(lamp["is_on"], false);
    let lamp_id = lamp["id"].as_i64().unwrap();

    let (status, cam) = hub
        .call(
            "POST",
            "/api/devices",
            "alice",
            Some(json!({"name": "Porta", "type": "camera", "stream_url": "rtsp://cam/1"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let cam_device_id = cam["id"].as_i64().unwrap();

    let (status, toggled) = hub
        .call("POST", &format!("/api/devices/{lamp_id}/toggle"), "alice", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(toggled["is_on"], true);

    let (_, patched) = hub
        .call(
            "PATCH",
            &format!("/api/devices/{lamp_id}"),
            "alice",
            Some(json!({"settings": {"brightness": 40}})),
        )
        .await;
    assert_eq!(patched["settings"]["brightness"], 40);
    assert_eq!(patched["room_id"], room_id);

    let (_, in_room) = hub
        .call("GET", &format!("/api/devices?room_id={room_id}"), "alice", None)
        .await;
    assert_eq!(in_room.as_array().unwrap().len(), 1);

    let (_, cameras) = hub.call("GET", "/api/cameras", "alice", None).await;
    let cameras = cameras.as_array().unwrap().clone();
    assert_eq!(cameras.len(), 1);
    assert_eq!(cameras[0]["device_name"], "Porta");
    assert_eq!(cameras[0]["status"], "offline");
    assert_eq!(cameras[0]["stream_url"], "rtsp://cam/1");

    let camera_id = cameras[0]["id"].as_i64().unwrap();
    let (status, camera) = hub
        .call(
            "PATCH",
            &format!("/api/cameras/{camera_id}"),
            "alice",
            Some(json!({"status": "online"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(camera["status"], "online");

    let (_, stats) = hub.call("GET", "/api/stats", "alice", None).await;
    assert_eq!(stats["devices_total"], 2);
    assert_eq!(stats["devices_on"], 1);
    assert_eq!(stats["lights_on"], 1);
    assert_eq!(stats["cameras_online"], 1);

    // another household sees none of it
    let (status, _) = hub
        .call("GET", &format!("/api/devices/{lamp_id}"), "bob", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = hub
        .call("DELETE", &format!("/api/rooms/{room_id}"), "alice", None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, lamp) = hub
        .call("GET", &format!("/api/devices/{lamp_id}"), "alice", None)
        .await;
    assert!(lamp["room_id"].is_null());

    let (status, _) = hub
        .call("DELETE", &format!("/api/devices/{cam_device_id}"), "alice", None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, cameras) = hub.call("GET", "/api/cameras", "alice", None).await;
    assert!(cameras.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn notifications_are_listed_newest_first_per_member() {
    let hub = hub("notifications").await;
    let (_, ana) = hub
        .call("POST", "/api/members", "alice", Some(json!({"name": "Ana"})))
        .await;
    let ana_id = ana["id"].as_i64().unwrap();

    for (member, title) in [(Some(ana_id), "remédio"), (None, "lixo")] {
        let (status, _) = hub
            .call(
                "POST",
                "/api/notifications",
                "alice",
                Some(json!({"member_id": member, "title": title, "message": "hoje", "type": "reminder"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, list) = hub
        .call("GET", &format!("/api/notifications?member_id={ana_id}"), "alice", None)
        .await;
    let list = list.as_array().unwrap().clone();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["title"], "lixo");
    assert_eq!(list[0]["source"], "manual");

    let id = list[1]["id"].as_i64().unwrap();
    let (_, read) = hub
        .call(
            "PATCH",
            &format!("/api/notifications/{id}"),
            "alice",
            Some(json!({"is_read": true})),
        )
        .await;
    assert_eq!(read["is_read"], true);

    let (_, stats) = hub.call("GET", "/api/stats", "alice", None).await;
    assert_eq!(stats["unread_notifications"], 1);

    // deleting the member takes its notifications along
    let (status, _) = hub
        .call("DELETE", &format!("/api/members/{ana_id}"), "alice", None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, list) = hub.call("GET", "/api/notifications", "alice", None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn integrations_can_be_activated_and_disconnected() {
    let hub = hub("integrations").await;
    let (status, integration) = hub
        .call(
            "POST",
            "/api/integrations",
            "alice",
            Some(json!({"type": "alexa", "name": "Amazon Alexa"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(integration["is_connected"], true);
    assert_eq!(integration["type"], "alexa");

    let (_, list) = hub.call("GET", "/api/integrations", "alice", None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, _) = hub
        .call("DELETE", "/api/integrations/alexa", "alice", None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = hub
        .call("DELETE", "/api/integrations/alexa", "alice", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn devices_cannot_attach_to_another_households_integration() {
    let hub = hub("integration-scope").await;
    let (_, integration) = hub
        .call(
            "POST",
            "/api/integrations",
            "alice",
            Some(json!({"type": "alexa", "name": "Amazon Alexa"})),
        )
        .await;
    let integration_id = integration["id"].as_i64().unwrap();

    let (status, body) = hub
        .call(
            "POST",
            "/api/devices",
            "bob",
            Some(json!({"name": "Abajur", "type": "light", "integration_id": integration_id})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = hub
        .call(
            "POST",
            "/api/devices",
            "alice",
            Some(json!({"name": "Eco", "type": "soundbar", "integration_id": 9999})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, bobs) = hub
        .call("POST", "/api/devices", "bob", Some(json!({"name": "Abajur", "type": "light"})))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = hub
        .call("DELETE", "/api/integrations/alexa", "alice", None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = hub
        .call("GET", &format!("/api/devices/{}", bobs["id"]), "bob", None)
        .await;
    assert_eq!(status, StatusCode::OK);
}
