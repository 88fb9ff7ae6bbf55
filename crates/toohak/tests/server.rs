//! End-to-end tests: real WebSocket clients driving a running server
//! with JSON text frames, the way the quiz web client does.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;

use toohak::ToohakServer;
use toohak::prelude::{GameOptions, Question, QuestionBank};

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

// =========================================================================
// Helpers
// =========================================================================

/// Starts a server with default settings on a random port.
async fn start_server() -> String {
    let server = ToohakServer::builder()
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("server should build");
    spawn_server(server).await
}

/// Starts a server with one-round games, compressed timers, and a bank
/// where option 0 is always correct.
async fn start_quiz_server() -> String {
    let mut options = GameOptions::default();
    options.total_questions = 1;
    options.trivia_questions = 1;
    options.round_time = Duration::from_millis(200);
    options.settle_time = Duration::from_millis(20);

    let bank = Arc::new(
        QuestionBank::new(vec![
            Question::new("One?", ["yes", "no"], 0),
            Question::new("Two?", ["yes", "no"], 0),
            Question::new("Three?", ["yes", "no"], 0),
        ])
        .unwrap(),
    );

    let server = ToohakServer::builder()
        .bind("127.0.0.1:0")
        .game_options(options)
        .question_bank(bank)
        .build()
        .await
        .expect("server should build");
    spawn_server(server).await
}

async fn spawn_server(server: ToohakServer<toohak::prelude::JsonCodec>) -> String {
    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    addr
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send_json(ws: &mut ClientWs, value: Value) {
    ws.send(Message::text(value.to_string()))
        .await
        .expect("send should succeed");
}

/// Receives the next JSON frame, failing the test after two seconds.
async fn next_json(ws: &mut ClientWs) -> Value {
    let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("timed out waiting for a frame")
        .expect("stream ended")
        .expect("websocket error");
    serde_json::from_str(msg.into_text().expect("text frame").as_str()).expect("json frame")
}

/// Reads frames until one satisfies `pred`, skipping the rest.
async fn next_matching(ws: &mut ClientWs, pred: impl Fn(&Value) -> bool) -> Value {
    loop {
        let frame = next_json(ws).await;
        if pred(&frame) {
            return frame;
        }
    }
}

fn is_ack_for(frame: &Value, cmd: &str) -> bool {
    frame["event"] == "ack" && frame["cmd"] == cmd
}

/// Joins a room and returns the ack frame.
async fn join(ws: &mut ClientWs, room: &str, name: &str) -> Value {
    send_json(
        ws,
        json!({"cmd": "joinRoom", "roomId": room, "displayName": name}),
    )
    .await;
    next_matching(ws, |frame| is_ack_for(frame, "joinRoom")).await
}

// =========================================================================
// Joining
// =========================================================================

#[tokio::test]
async fn test_join_creates_room_and_acks() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    let ack = join(&mut ws, "quiz", "Alice").await;
    assert_eq!(ack["success"], true);
    assert_eq!(
        ack["message"],
        "Room \"quiz\" created and joined successfully."
    );

    let room = &ack["data"];
    assert_eq!(room["roomId"], "quiz");
    assert_eq!(room["players"][0]["displayName"], "Alice");
    assert_eq!(room["adminId"], room["players"][0]["id"]);
    assert_eq!(room["status"], "waiting to start");
    assert_eq!(room["maxPlayers"], 4);
}

#[tokio::test]
async fn test_second_join_notifies_first_player() {
    let addr = start_server().await;
    let mut ws1 = connect(&addr).await;
    let mut ws2 = connect(&addr).await;

    join(&mut ws1, "quiz", "Alice").await;
    let ack = join(&mut ws2, "quiz", "Bob").await;
    assert_eq!(ack["success"], true);
    assert_eq!(ack["message"], "Successfully joined room \"quiz\".");
    assert_eq!(ack["data"]["status"], "ready");

    let joined = next_matching(&mut ws1, |frame| frame["event"] == "playerJoined").await;
    assert_eq!(joined["player"]["displayName"], "Bob");
    let state = next_matching(&mut ws1, |frame| frame["event"] == "gameStateChanged").await;
    assert_eq!(state["newState"], "ready");
}

#[tokio::test]
async fn test_rejoin_same_connection_resyncs() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    join(&mut ws, "quiz", "Alice").await;
    let ack = join(&mut ws, "quiz", "Alice").await;
    assert_eq!(ack["success"], true);
    assert_eq!(ack["message"], "You are already in room \"quiz\".");
    assert_eq!(ack["data"]["players"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_blank_display_name_gets_a_default() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    let ack = join(&mut ws, "quiz", "   ").await;
    assert_eq!(ack["success"], true);
    let name = ack["data"]["players"][0]["displayName"].as_str().unwrap();
    assert!(name.starts_with("Player_"), "got {name:?}");
}

#[tokio::test]
async fn test_blank_room_id_rejected() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    let ack = join(&mut ws, "  ", "Alice").await;
    assert_eq!(ack["success"], false);
    assert_eq!(ack["message"], "Invalid room ID provided.");
}

#[tokio::test]
async fn test_join_full_room_rejected() {
    let addr = start_server().await;
    let mut ws1 = connect(&addr).await;
    let mut ws2 = connect(&addr).await;
    let mut ws3 = connect(&addr).await;

    send_json(
        &mut ws1,
        json!({"cmd": "joinRoom", "roomId": "duo", "displayName": "Alice", "maxPlayers": 2}),
    )
    .await;
    next_matching(&mut ws1, |frame| is_ack_for(frame, "joinRoom")).await;
    join(&mut ws2, "duo", "Bob").await;

    let ack = join(&mut ws3, "duo", "Carol").await;
    assert_eq!(ack["success"], false);
    assert_eq!(ack["message"], "Room \"duo\" is full (2 players max).");
}

// =========================================================================
// Game flow
// =========================================================================

#[tokio::test]
async fn test_full_round_flow() {
    let addr = start_quiz_server().await;
    let mut ws1 = connect(&addr).await;
    let mut ws2 = connect(&addr).await;

    join(&mut ws1, "quiz", "Alice").await;
    join(&mut ws2, "quiz", "Bob").await;
    // Clear the join traffic so the start sequence can be read in order.
    next_matching(&mut ws1, |frame| frame["event"] == "gameStateChanged").await;
    next_matching(&mut ws2, |frame| frame["event"] == "gameStateChanged").await;

    // The admin starts: the state change and first question are
    // broadcast before the ack lands.
    send_json(&mut ws1, json!({"cmd": "startGame", "roomId": "quiz"})).await;
    let state = next_json(&mut ws1).await;
    assert_eq!(state["event"], "gameStateChanged");
    assert_eq!(state["newState"], "in game");
    let question = next_json(&mut ws1).await;
    assert_eq!(question["event"], "newQuestion");
    assert_eq!(question["questionRef"], 0);
    assert_eq!(question["deadlineMs"], 200);
    assert_eq!(question["options"].as_array().unwrap().len(), 2);
    let ack = next_json(&mut ws1).await;
    assert!(is_ack_for(&ack, "startGame"));
    assert_eq!(ack["success"], true);
    assert_eq!(ack["message"], "Game started in room \"quiz\".");
    assert_eq!(ack["data"]["status"], "in game");

    // The other player sees the same broadcasts.
    next_matching(&mut ws2, |frame| {
        frame["event"] == "gameStateChanged" && frame["newState"] == "in game"
    })
    .await;
    next_matching(&mut ws2, |frame| frame["event"] == "newQuestion").await;

    // Alice answers correctly, Bob wrongly; the round closes early.
    send_json(
        &mut ws1,
        json!({"cmd": "submitAnswer", "roomId": "quiz", "questionRef": 0, "optionIndex": 0}),
    )
    .await;
    let ack = next_matching(&mut ws1, |frame| is_ack_for(frame, "submitAnswer")).await;
    assert_eq!(ack["success"], true);
    assert_eq!(ack["message"], "Answer submitted.");

    send_json(
        &mut ws2,
        json!({"cmd": "submitAnswer", "roomId": "quiz", "questionRef": 0, "optionIndex": 1}),
    )
    .await;

    // One question configured, so the reveal rolls into the conclusion.
    let reveal = next_matching(&mut ws2, |frame| frame["event"] == "roundEnded").await;
    assert_eq!(reveal["correctOptionIndex"], 0);
    let scores = reveal["scores"].as_array().unwrap();
    let score_of = |name: &str| {
        scores
            .iter()
            .find(|entry| entry["displayName"] == name)
            .unwrap()["score"]
            .as_u64()
            .unwrap()
    };
    assert_eq!(score_of("Alice"), 1);
    assert_eq!(score_of("Bob"), 0);

    let concluded = next_matching(&mut ws2, |frame| frame["event"] == "gameConcluded").await;
    assert_eq!(concluded["reason"], "All questions answered.");
    let state = next_matching(&mut ws2, |frame| frame["event"] == "gameStateChanged").await;
    assert_eq!(state["newState"], "concluded");

    // The admin's socket saw the same ending.
    next_matching(&mut ws1, |frame| frame["event"] == "gameConcluded").await;
}

#[tokio::test]
async fn test_start_game_requires_admin() {
    let addr = start_quiz_server().await;
    let mut ws1 = connect(&addr).await;
    let mut ws2 = connect(&addr).await;

    join(&mut ws1, "quiz", "Alice").await;
    join(&mut ws2, "quiz", "Bob").await;

    send_json(&mut ws2, json!({"cmd": "startGame", "roomId": "quiz"})).await;
    let ack = next_matching(&mut ws2, |frame| is_ack_for(frame, "startGame")).await;
    assert_eq!(ack["success"], false);
    assert_eq!(ack["message"], "Only the room admin can start the game.");
}

#[tokio::test]
async fn test_trivia_over_the_wire() {
    let addr = start_quiz_server().await;
    let mut ws1 = connect(&addr).await;
    let mut ws2 = connect(&addr).await;

    join(&mut ws1, "quiz", "Alice").await;
    join(&mut ws2, "quiz", "Bob").await;

    send_json(
        &mut ws1,
        json!({"cmd": "startGame", "roomId": "quiz", "gameKind": "trivia"}),
    )
    .await;
    let ack = next_matching(&mut ws1, |frame| is_ack_for(frame, "startGame")).await;
    assert_eq!(ack["success"], true);

    // Questions are dealt per player, on request, with no deadline.
    send_json(&mut ws1, json!({"cmd": "requestQuestion", "roomId": "quiz"})).await;
    let question = next_matching(&mut ws1, |frame| frame["event"] == "newQuestion").await;
    assert_eq!(question["questionRef"], 0);
    assert_eq!(question["deadlineMs"], Value::Null);
    next_matching(&mut ws1, |frame| is_ack_for(frame, "requestQuestion")).await;

    send_json(
        &mut ws1,
        json!({"cmd": "submitAnswer", "roomId": "quiz", "questionRef": 0, "optionIndex": 0}),
    )
    .await;

    // A one-question budget finishes Alice immediately: the personal
    // conclusion notice lands before her submit ack.
    let done = next_matching(&mut ws1, |frame| frame["event"] == "gameConcluded").await;
    assert_eq!(done["finalScores"].as_array().unwrap().len(), 1);
    assert_eq!(done["finalScores"][0]["displayName"], "Alice");

    let ack = next_matching(&mut ws1, |frame| is_ack_for(frame, "submitAnswer")).await;
    assert_eq!(ack["success"], true);
    assert_eq!(ack["data"]["correct"], true);
    assert_eq!(ack["data"]["questionsRemaining"], 0);
}

// =========================================================================
// Kick, chat, and cleanup
// =========================================================================

#[tokio::test]
async fn test_kick_flow() {
    let addr = start_server().await;
    let mut ws1 = connect(&addr).await;
    let mut ws2 = connect(&addr).await;

    join(&mut ws1, "quiz", "Alice").await;
    let ack = join(&mut ws2, "quiz", "Bob").await;
    let bob_id = ack["data"]["players"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["displayName"] == "Bob")
        .unwrap()["id"]
        .as_u64()
        .unwrap();

    send_json(
        &mut ws1,
        json!({"cmd": "kickPlayer", "roomId": "quiz", "targetId": bob_id}),
    )
    .await;

    let kicked = next_matching(&mut ws2, |frame| frame["event"] == "kicked").await;
    assert_eq!(kicked["roomId"], "quiz");

    let left = next_matching(&mut ws1, |frame| frame["event"] == "playerLeft").await;
    assert_eq!(left["playerId"].as_u64().unwrap(), bob_id);
    let ack = next_matching(&mut ws1, |frame| is_ack_for(frame, "kickPlayer")).await;
    assert_eq!(ack["success"], true);
    assert_eq!(ack["message"], "Player removed from room \"quiz\".");
}

#[tokio::test]
async fn test_kick_requires_admin() {
    let addr = start_server().await;
    let mut ws1 = connect(&addr).await;
    let mut ws2 = connect(&addr).await;

    join(&mut ws1, "quiz", "Alice").await;
    let ack = join(&mut ws2, "quiz", "Bob").await;
    let alice_id = ack["data"]["players"][0]["id"].as_u64().unwrap();

    send_json(
        &mut ws2,
        json!({"cmd": "kickPlayer", "roomId": "quiz", "targetId": alice_id}),
    )
    .await;
    let ack = next_matching(&mut ws2, |frame| is_ack_for(frame, "kickPlayer")).await;
    assert_eq!(ack["success"], false);
    assert_eq!(ack["message"], "Only the room admin can kick players.");
}

#[tokio::test]
async fn test_chat_flow() {
    let addr = start_server().await;
    let mut ws1 = connect(&addr).await;
    let mut ws2 = connect(&addr).await;

    join(&mut ws1, "quiz", "Alice").await;
    join(&mut ws2, "quiz", "Bob").await;

    send_json(
        &mut ws1,
        json!({"cmd": "sendMessage", "roomId": "quiz", "text": "  hello room  "}),
    )
    .await;

    // Both sockets get the broadcast, trimmed, sender included.
    for ws in [&mut ws1, &mut ws2] {
        let chat = next_matching(ws, |frame| frame["event"] == "chatMessage").await;
        assert_eq!(chat["displayName"], "Alice");
        assert_eq!(chat["text"], "hello room");
    }

    let ack = next_matching(&mut ws1, |frame| is_ack_for(frame, "sendMessage")).await;
    assert_eq!(ack["success"], true);
}

#[tokio::test]
async fn test_chat_rejects_empty_message() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    join(&mut ws, "quiz", "Alice").await;

    send_json(
        &mut ws,
        json!({"cmd": "sendMessage", "roomId": "quiz", "text": "   "}),
    )
    .await;
    let ack = next_matching(&mut ws, |frame| is_ack_for(frame, "sendMessage")).await;
    assert_eq!(ack["success"], false);
    assert_eq!(ack["message"], "Cannot send an empty message.");
}

#[tokio::test]
async fn test_malformed_frame_is_ignored() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    ws.send(Message::text("not json")).await.expect("send");

    // The connection survives and the next valid command is answered.
    let ack = join(&mut ws, "quiz", "Alice").await;
    assert_eq!(ack["success"], true);
}

#[tokio::test]
async fn test_leave_room_destroys_empty_room() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    join(&mut ws, "quiz", "Alice").await;
    send_json(&mut ws, json!({"cmd": "leaveRoom", "roomId": "quiz"})).await;
    let ack = next_matching(&mut ws, |frame| is_ack_for(frame, "leaveRoom")).await;
    assert_eq!(ack["success"], true);
    assert_eq!(ack["message"], "Successfully left room \"quiz\".");

    // The id is free again: rejoining creates a fresh room.
    let ack = join(&mut ws, "quiz", "Alice").await;
    assert_eq!(
        ack["message"],
        "Room \"quiz\" created and joined successfully."
    );
}

#[tokio::test]
async fn test_disconnect_cleans_up_membership() {
    let addr = start_server().await;
    let mut ws1 = connect(&addr).await;
    let mut ws2 = connect(&addr).await;

    join(&mut ws1, "quiz", "Alice").await;
    let ack = join(&mut ws2, "quiz", "Bob").await;
    let bob_id = ack["data"]["players"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["displayName"] == "Bob")
        .unwrap()["id"]
        .as_u64()
        .unwrap();

    ws2.close(None).await.expect("close");

    let left = next_matching(&mut ws1, |frame| frame["event"] == "playerLeft").await;
    assert_eq!(left["playerId"].as_u64().unwrap(), bob_id);
    let state = next_matching(&mut ws1, |frame| frame["event"] == "gameStateChanged").await;
    assert_eq!(state["newState"], "waiting to start");
}
