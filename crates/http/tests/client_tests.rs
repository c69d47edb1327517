//! Integration tests for the Peerza HTTP client endpoints

use chrono::{TimeZone, Utc};
use peerza_http::types::{Decision, MeetingRequest, MeetingStatus, NewAvailability, ProfileUpdate};
use peerza_http::{ClientError, MemorySessionStore, PeerzaClient};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{
    body_json, body_string_contains, header, header_regex, method, path, query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn logged_in_client(server: &MockServer) -> PeerzaClient {
    PeerzaClient::builder()
        .base_url(format!("{}/api/", server.uri()))
        .session(Arc::new(MemorySessionStore::with_tokens(
            Some("A1"),
            Some("R1"),
        )))
        .build()
        .unwrap()
}

fn user(id: i64, username: &str) -> serde_json::Value {
    json!({"id": id, "username": username, "bio": null, "is_pro": false, "avatar": null})
}

#[tokio::test]
async fn test_client_builder() {
    let client = PeerzaClient::builder()
        .base_url("http://localhost:8000/api/")
        .build();

    assert!(client.is_ok());
    let client = client.unwrap();
    assert_eq!(client.base_url(), "http://localhost:8000/api");
}

#[tokio::test]
async fn test_client_builder_defaults_to_local_api() {
    let client = PeerzaClient::builder().build().unwrap();
    assert_eq!(client.base_url(), peerza_http::client::DEFAULT_BASE_URL);
}

#[tokio::test]
async fn test_client_builder_rejects_invalid_base_url() {
    let result = PeerzaClient::builder().base_url("not a url").build();
    assert!(matches!(result, Err(ClientError::Configuration(_))));
}

/// `set_var`/`remove_var` are not thread-safe; tests touching the environment
/// hold this lock.
static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[test]
fn test_from_env_reads_base_url() {
    let _guard = ENV_MUTEX.lock().unwrap();
    let store = Arc::new(MemorySessionStore::new());

    // SAFETY: serialized by ENV_MUTEX, no other test mutates env vars concurrently.
    unsafe { std::env::remove_var(peerza_http::client::BASE_URL_ENV) };
    let client = PeerzaClient::from_env(store.clone()).unwrap();
    assert_eq!(client.base_url(), "http://127.0.0.1:8000/api");

    unsafe { std::env::set_var(peerza_http::client::BASE_URL_ENV, "https://peerza.test/api/") };
    let client = PeerzaClient::from_env(store).unwrap();
    unsafe { std::env::remove_var(peerza_http::client::BASE_URL_ENV) };
    assert_eq!(client.base_url(), "https://peerza.test/api");
}

#[tokio::test]
async fn test_search_peers_sends_skill_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/search/"))
        .and(query_param("skill", "Python"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 10,
            "user": user(2, "sara"),
            "skill": {"id": 1, "name": "Python"},
            "proficiency": "Expert",
            "skill_type": "TEACH"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let client = logged_in_client(&server);
    let results = client.search_peers("  Python ").await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].skill.name, "Python");
    assert_eq!(results[0].user.as_ref().unwrap().username, "sara");
}

#[tokio::test]
async fn test_empty_inputs_are_rejected_locally() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server);

    assert!(matches!(
        client.search_peers("   ").await,
        Err(ClientError::InvalidInput(_))
    ));
    assert!(matches!(
        client.send_message(2, "  ").await,
        Err(ClientError::InvalidInput(_))
    ));

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_profile_patches_bio() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/api/profile/"))
        .and(body_json(json!({"bio": "Rust mentor"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1, "username": "umer", "bio": "Rust mentor", "is_pro": true, "avatar": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = logged_in_client(&server);
    let profile = client
        .update_profile(&ProfileUpdate::bio("Rust mentor"))
        .await
        .unwrap();

    assert_eq!(profile.bio.as_deref(), Some("Rust mentor"));
    assert!(profile.is_pro);
}

#[tokio::test]
async fn test_update_avatar_uploads_multipart_file() {
    let server = MockServer::start().await;
    let temp_dir = tempfile::TempDir::new().unwrap();
    let avatar = temp_dir.path().join("me.png");
    std::fs::write(&avatar, b"fake-png-bytes").unwrap();

    Mock::given(method("PATCH"))
        .and(path("/api/profile/"))
        .and(header("authorization", "Bearer A1"))
        .and(header_regex("content-type", "^multipart/form-data; boundary="))
        .and(body_string_contains("name=\"avatar\"; filename=\"me.png\""))
        .and(body_string_contains("fake-png-bytes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "username": "umer",
            "bio": null,
            "is_pro": false,
            "avatar": "/media/avatars/me.png"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = logged_in_client(&server);
    let profile = client.update_avatar(&avatar).await.unwrap();
    assert_eq!(profile.avatar.as_deref(), Some("/media/avatars/me.png"));
}

#[tokio::test]
async fn test_update_avatar_resends_form_after_refresh() {
    let server = MockServer::start().await;
    let temp_dir = tempfile::TempDir::new().unwrap();
    let avatar = temp_dir.path().join("me.jpg");
    std::fs::write(&avatar, b"fake-jpeg-bytes").unwrap();

    Mock::given(method("PATCH"))
        .and(path("/api/profile/"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "A2"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/api/profile/"))
        .and(header("authorization", "Bearer A2"))
        .and(body_string_contains("filename=\"me.jpg\""))
        .and(body_string_contains("fake-jpeg-bytes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user(1, "umer")))
        .expect(1)
        .mount(&server)
        .await;

    let client = logged_in_client(&server);
    assert_eq!(client.update_avatar(&avatar).await.unwrap().id, 1);
}

#[tokio::test]
async fn test_update_avatar_missing_file_is_rejected_locally() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server);

    let err = client
        .update_avatar("/definitely/not/here.png")
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidInput(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_public_profile_and_delete_skill() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users/2/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": user(2, "sara"),
            "skills": [{
                "id": 5,
                "user": user(2, "sara"),
                "skill": {"id": 3, "name": "Guitar"},
                "proficiency": "Beginner",
                "skill_type": "LEARN"
            }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/api/delete-skill/5/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/api/delete-skill/6/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "Skill not found"})))
        .mount(&server)
        .await;

    let client = logged_in_client(&server);
    let profile = client.public_profile(2).await.unwrap();
    assert_eq!(profile.skills.len(), 1);

    client.delete_skill(5).await.unwrap();
    assert!(matches!(
        client.delete_skill(6).await,
        Err(ClientError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_availability_roundtrip() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/availability/"))
        .and(body_json(json!({
            "day_of_week": "MONDAY",
            "start_time": "09:00",
            "end_time": "10:00"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 3,
            "day_of_week": "MONDAY",
            "start_time": "09:00:00",
            "end_time": "10:00:00"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/availability/2/user/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 9, "day_of_week": "FRIDAY", "start_time": "18:00:00", "end_time": "19:00:00", "is_booked": true}
        ])))
        .mount(&server)
        .await;

    let client = logged_in_client(&server);
    let slot = client
        .add_availability(NewAvailability {
            day_of_week: "monday".into(),
            start_time: "09:00".into(),
            end_time: "10:00".into(),
        })
        .await
        .unwrap();
    assert_eq!(slot.id, 3);
    assert!(!slot.is_booked);

    let peer_slots = client.peer_availability(2).await.unwrap();
    assert!(peer_slots[0].is_booked);
}

#[tokio::test]
async fn test_meeting_request_and_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/meetings/request/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 4,
            "host": 1,
            "guest": 2,
            "topic": "Rust basics",
            "start_datetime": "2025-03-01T10:00:00Z",
            "end_datetime": "2025-03-01T11:00:00Z",
            "status": "PENDING",
            "jitsi_room": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/meetings/4/respond/"))
        .and(body_json(json!({"response": "ACCEPT"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 4,
            "host": 1,
            "guest": 2,
            "topic": "Rust basics",
            "start_datetime": "2025-03-01T10:00:00Z",
            "end_datetime": "2025-03-01T11:00:00Z",
            "status": "ACCEPTED",
            "jitsi_room": "peerza-1-2-4"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = logged_in_client(&server);
    let start = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
    let request = MeetingRequest {
        guest_id: 2,
        topic: "Rust basics".into(),
        start_datetime: start,
        end_datetime: start + chrono::Duration::hours(1),
    };

    let meeting = client.request_meeting(&request).await.unwrap();
    assert_eq!(meeting.status, MeetingStatus::Pending);

    let meeting = client.respond_meeting(4, Decision::Accept).await.unwrap();
    assert_eq!(meeting.status, MeetingStatus::Accepted);
    assert_eq!(meeting.jitsi_room.as_deref(), Some("peerza-1-2-4"));

    let backwards = MeetingRequest {
        end_datetime: start - chrono::Duration::hours(1),
        ..request
    };
    assert!(matches!(
        client.request_meeting(&backwards).await,
        Err(ClientError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_chat_send_and_friend_respond() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chats/2/send/"))
        .and(body_json(json!({"content": "hello"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 77, "sender": 1, "receiver": 2, "content": "hello",
            "timestamp": "2025-03-01T10:00:00Z", "is_read": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/friends/request/respond/8/"))
        .and(body_json(json!({"action": "DECLINE"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = logged_in_client(&server);
    let message = client.send_message(2, " hello ").await.unwrap();
    assert_eq!(message.id, 77);

    let ack = client
        .respond_friend_request(8, Decision::Decline)
        .await
        .unwrap();
    assert!(ack.ok);
}

#[tokio::test]
async fn test_poll_messages_until_cancelled() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/chats/2/messages/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 1, "sender": 2, "receiver": 1, "content": "hi",
            "timestamp": "2025-03-01T10:00:00Z", "is_read": false
        }])))
        .mount(&server)
        .await;

    let client = logged_in_client(&server);
    let cancel = CancellationToken::new();
    let mut updates = client.poll_messages(2, Some(Duration::from_millis(20)), cancel.clone());

    let first = updates.recv().await.unwrap().unwrap();
    assert_eq!(first[0].content, "hi");
    let second = updates.recv().await.unwrap().unwrap();
    assert_eq!(second.len(), 1);

    cancel.cancel();
    while updates.recv().await.is_some() {}
}

#[tokio::test]
async fn test_poll_notifications_stops_when_session_expires() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/notifications/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = PeerzaClient::builder()
        .base_url(format!("{}/api", server.uri()))
        .session(Arc::new(MemorySessionStore::with_tokens(Some("A1"), None)))
        .build()
        .unwrap();

    let mut updates =
        client.poll_notifications(Some(Duration::from_millis(10)), CancellationToken::new());

    let first = updates.recv().await.unwrap();
    assert!(first.unwrap_err().is_session_expired());
    assert!(updates.recv().await.is_none());
}
