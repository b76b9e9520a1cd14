//! WebSocket integration tests

use accessctl::access_control::{AccessControlFormData, ResourceControl, ResourceType};
use accessctl::models::{
    CreateTeamRequest, CreateUserRequest, EnvironmentAccessRequest, EnvironmentId, Role, TeamId,
    UserId,
};
use accessctl::AppState;
use futures::{SinkExt, StreamExt};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

async fn setup_server() -> (SocketAddr, Arc<AppState>, SqlitePool) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    let state = AppState::new(pool.clone());
    state
        .store
        .migrate()
        .await
        .expect("Failed to run migrations");

    // admin (1), alice (2) in ops+dev, bob (3) in ops
    for (username, role) in [
        ("admin", Role::Administrator),
        ("alice", Role::Standard),
        ("bob", Role::Standard),
    ] {
        state
            .store
            .create_user(CreateUserRequest {
                username: username.to_string(),
                role,
            })
            .await
            .unwrap();
    }
    state
        .store
        .create_team(CreateTeamRequest {
            name: "ops".to_string(),
            member_ids: vec![UserId(2), UserId(3)],
        })
        .await
        .unwrap();
    state
        .store
        .create_team(CreateTeamRequest {
            name: "dev".to_string(),
            member_ids: vec![UserId(2)],
        })
        .await
        .unwrap();

    let app = accessctl::api::router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start
    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

    (addr, state, pool)
}

async fn connect(addr: SocketAddr) -> Socket {
    let url = format!("ws://{}/ws", addr);
    let (ws_stream, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
    ws_stream
}

async fn send(ws: &mut Socket, msg: serde_json::Value) {
    ws.send(Message::Text(msg.to_string())).await.unwrap();
}

async fn recv(ws: &mut Socket) -> serde_json::Value {
    let response = tokio::time::timeout(tokio::time::Duration::from_secs(5), ws.next())
        .await
        .expect("Timed out waiting for message")
        .unwrap()
        .unwrap();
    match response {
        Message::Text(text) => serde_json::from_str(&text).unwrap(),
        other => panic!("Expected text message, got {:?}", other),
    }
}

async fn open(ws: &mut Socket, actor_id: u64, is_public_visible: bool) -> serde_json::Value {
    send(
        ws,
        serde_json::json!({
            "type": "open",
            "actor_id": actor_id,
            "is_public_visible": is_public_visible
        }),
    )
    .await;
    let reply = recv(ws).await;
    assert_eq!(reply["type"], "view", "unexpected reply: {}", reply);
    reply
}

#[tokio::test]
async fn test_websocket_requires_open_session() {
    let (addr, _state, _pool) = setup_server().await;
    let mut ws = connect(addr).await;

    send(
        &mut ws,
        serde_json::json!({"type": "select_ownership", "ownership": "private"}),
    )
    .await;

    let reply = recv(&mut ws).await;
    assert_eq!(reply["type"], "error");
    assert!(reply["message"].as_str().unwrap().contains("No open session"));
}

#[tokio::test]
async fn test_websocket_invalid_message() {
    let (addr, _state, _pool) = setup_server().await;
    let mut ws = connect(addr).await;

    ws.send(Message::Text("not json".to_string())).await.unwrap();

    let reply = recv(&mut ws).await;
    assert_eq!(reply["type"], "error");
    assert!(reply["message"]
        .as_str()
        .unwrap()
        .starts_with("Invalid message"));
}

#[tokio::test]
async fn test_websocket_open_unknown_actor() {
    let (addr, _state, _pool) = setup_server().await;
    let mut ws = connect(addr).await;

    send(&mut ws, serde_json::json!({"type": "open", "actor_id": 42})).await;

    let reply = recv(&mut ws).await;
    assert_eq!(reply["type"], "error");
}

#[tokio::test]
async fn test_websocket_open_renders_default_view() {
    let (addr, _state, _pool) = setup_server().await;
    let mut ws = connect(addr).await;

    let reply = open(&mut ws, 1, false).await;
    let view = &reply["view"];
    assert_eq!(view["selected"], "administrators");
    assert_eq!(view["options"].as_array().unwrap().len(), 3);
    assert!(view.get("users_field").is_none());
    assert!(view.get("teams_field").is_none());
}

#[tokio::test]
async fn test_websocket_select_private_notifies_change() {
    let (addr, _state, _pool) = setup_server().await;
    let mut ws = connect(addr).await;
    open(&mut ws, 3, true).await;

    send(
        &mut ws,
        serde_json::json!({"type": "select_ownership", "ownership": "private"}),
    )
    .await;

    let changed = recv(&mut ws).await;
    assert_eq!(changed["type"], "changed");
    assert_eq!(changed["values"]["ownership"], "private");
    assert_eq!(changed["values"]["authorizedUsers"], serde_json::json!([3]));
    assert_eq!(changed["values"]["authorizedTeams"], serde_json::json!([]));

    let view = recv(&mut ws).await;
    assert_eq!(view["type"], "view");
    assert_eq!(view["view"]["selected"], "private");
}

#[tokio::test]
async fn test_websocket_restricted_admin_sees_both_selectors() {
    let (addr, _state, _pool) = setup_server().await;
    let mut ws = connect(addr).await;
    open(&mut ws, 1, false).await;

    send(
        &mut ws,
        serde_json::json!({"type": "select_ownership", "ownership": "restricted"}),
    )
    .await;
    assert_eq!(recv(&mut ws).await["type"], "changed");

    let reply = recv(&mut ws).await;
    let view = &reply["view"];
    assert_eq!(view["users_field"]["users"].as_array().unwrap().len(), 3);
    assert_eq!(view["teams_field"]["teams"].as_array().unwrap().len(), 2);
    assert_eq!(view["teams_field"]["tooltip"], "default");
}

#[tokio::test]
async fn test_websocket_single_team_member_has_no_selectors() {
    let (addr, _state, _pool) = setup_server().await;
    let mut ws = connect(addr).await;
    open(&mut ws, 3, false).await;

    send(
        &mut ws,
        serde_json::json!({"type": "select_ownership", "ownership": "restricted"}),
    )
    .await;
    assert_eq!(recv(&mut ws).await["type"], "changed");

    let reply = recv(&mut ws).await;
    assert!(reply["view"].get("users_field").is_none());
    assert!(reply["view"].get("teams_field").is_none());
}

#[tokio::test]
async fn test_websocket_submit_invalid_restricted() {
    let (addr, _state, _pool) = setup_server().await;
    let mut ws = connect(addr).await;
    open(&mut ws, 1, false).await;

    send(
        &mut ws,
        serde_json::json!({"type": "select_ownership", "ownership": "restricted"}),
    )
    .await;
    recv(&mut ws).await;
    recv(&mut ws).await;

    send(
        &mut ws,
        serde_json::json!({"type": "submit", "resource_id": "web", "resource_type": "container"}),
    )
    .await;

    let reply = recv(&mut ws).await;
    assert_eq!(reply["type"], "invalid");
    assert_eq!(
        reply["errors"]["object"],
        "You must specify at least one team or user."
    );
    assert_eq!(
        reply["view"]["error_banner"],
        "You must specify at least one team or user."
    );
}

#[tokio::test]
async fn test_websocket_submit_restricted_persists() {
    let (addr, state, _pool) = setup_server().await;
    let mut ws = connect(addr).await;
    open(&mut ws, 2, false).await;

    send(
        &mut ws,
        serde_json::json!({"type": "select_ownership", "ownership": "restricted"}),
    )
    .await;
    recv(&mut ws).await;
    recv(&mut ws).await;

    send(
        &mut ws,
        serde_json::json!({"type": "set_authorized_teams", "team_ids": [2]}),
    )
    .await;
    let changed = recv(&mut ws).await;
    assert_eq!(changed["values"]["authorizedTeams"], serde_json::json!([2]));
    recv(&mut ws).await;

    send(
        &mut ws,
        serde_json::json!({"type": "submit", "resource_id": "db", "resource_type": "volume"}),
    )
    .await;

    let reply = recv(&mut ws).await;
    assert_eq!(reply["type"], "submitted", "unexpected reply: {}", reply);
    assert_eq!(
        reply["resource_control"]["access_control"]["ownership"],
        "restricted"
    );

    let stored = state
        .store
        .find_resource_control("db", ResourceType::Volume)
        .await
        .unwrap()
        .expect("resource control should be stored");
    assert_eq!(stored.created_by, UserId(2));
    assert!(!stored.public);
}

#[tokio::test]
async fn test_websocket_second_open_rejected() {
    let (addr, _state, _pool) = setup_server().await;
    let mut ws = connect(addr).await;
    open(&mut ws, 1, false).await;

    send(&mut ws, serde_json::json!({"type": "open", "actor_id": 2})).await;

    let reply = recv(&mut ws).await;
    assert_eq!(reply["type"], "error");
    assert!(reply["message"]
        .as_str()
        .unwrap()
        .contains("Session already open"));

    // The first session is still live
    send(
        &mut ws,
        serde_json::json!({"type": "select_ownership", "ownership": "private"}),
    )
    .await;
    let changed = recv(&mut ws).await;
    assert_eq!(changed["values"]["authorizedUsers"], serde_json::json!([1]));
}

#[tokio::test]
async fn test_websocket_open_seeds_from_resource_control() {
    let (addr, state, _pool) = setup_server().await;

    let declared = AccessControlFormData::restricted([UserId(2)], []);
    let control =
        ResourceControl::declare("web", ResourceType::Container, &declared, UserId(1));
    state.store.create_resource_control(&control).await.unwrap();

    let mut ws = connect(addr).await;
    send(
        &mut ws,
        serde_json::json!({
            "type": "open",
            "actor_id": 1,
            "resource_control_id": control.id
        }),
    )
    .await;

    let reply = recv(&mut ws).await;
    assert_eq!(reply["type"], "view", "unexpected reply: {}", reply);
    assert_eq!(reply["view"]["selected"], "restricted");
    assert_eq!(
        reply["view"]["users_field"]["selected"],
        serde_json::json!([2])
    );

    // Submitting the seeded value unchanged is accepted
    send(
        &mut ws,
        serde_json::json!({"type": "submit", "resource_id": "web-2", "resource_type": "container"}),
    )
    .await;
    let reply = recv(&mut ws).await;
    assert_eq!(reply["type"], "submitted", "unexpected reply: {}", reply);
    assert_eq!(
        reply["resource_control"]["access_control"],
        serde_json::to_value(&declared).unwrap()
    );
}

#[tokio::test]
async fn test_websocket_reload_scopes_to_environment() {
    let (addr, state, _pool) = setup_server().await;
    state
        .store
        .set_environment_access(
            EnvironmentId(4),
            EnvironmentAccessRequest {
                user_ids: vec![],
                team_ids: vec![TeamId(2)],
            },
        )
        .await
        .unwrap();

    let mut ws = connect(addr).await;
    open(&mut ws, 1, false).await;
    send(
        &mut ws,
        serde_json::json!({"type": "select_ownership", "ownership": "restricted"}),
    )
    .await;
    recv(&mut ws).await;
    let reply = recv(&mut ws).await;
    assert_eq!(reply["view"]["users_field"]["users"].as_array().unwrap().len(), 3);

    send(&mut ws, serde_json::json!({"type": "reload", "environment_id": 4})).await;

    let reply = recv(&mut ws).await;
    assert_eq!(reply["type"], "view", "unexpected reply: {}", reply);
    let names: Vec<_> = reply["view"]["users_field"]["users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["admin", "alice"]);
    assert_eq!(reply["view"]["teams_field"]["teams"][0]["name"], "dev");
}

#[tokio::test]
async fn test_websocket_failed_load_keeps_session_loading() {
    let (addr, _state, pool) = setup_server().await;
    let mut ws = connect(addr).await;
    open(&mut ws, 3, false).await;

    // Revoke bob so his directory can no longer be listed
    sqlx::query("DELETE FROM team_memberships WHERE user_id = 3")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("DELETE FROM users WHERE id = 3")
        .execute(&pool)
        .await
        .unwrap();

    send(&mut ws, serde_json::json!({"type": "reload"})).await;

    let error = recv(&mut ws).await;
    assert_eq!(error["type"], "error");
    assert!(error["message"]
        .as_str()
        .unwrap()
        .starts_with("Failed to load users and teams"));

    let loading = recv(&mut ws).await;
    assert_eq!(loading["type"], "loading");
    assert!(loading["environment_id"].is_null());

    send(
        &mut ws,
        serde_json::json!({"type": "select_ownership", "ownership": "private"}),
    )
    .await;
    let reply = recv(&mut ws).await;
    assert_eq!(reply["type"], "error");
    assert!(reply["message"]
        .as_str()
        .unwrap()
        .contains("Directory is still loading"));
}

#[tokio::test]
async fn test_websocket_close() {
    let (addr, _state, _pool) = setup_server().await;
    let mut ws = connect(addr).await;

    ws.close(None).await.unwrap();
}
