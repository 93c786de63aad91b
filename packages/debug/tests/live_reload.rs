use std::io::ErrorKind;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tungstenite::protocol::Message;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pilet_debug::{
    socket_url, ChannelState, DebugConfig, EmulatorRequester, LiveReloadChannel, ReloadConnector,
    ReloadTarget, SessionContext, TungsteniteConnector, LOAD_PILETS,
};
use pilet_feed::{FeedConfig, FeedRequester, PiletDescriptor, PiletRequester};

#[derive(Default)]
struct SpyTarget {
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl ReloadTarget for SpyTarget {
    async fn remove_pilet(&self, name: &str) {
        self.calls.lock().unwrap().push(format!("remove {name}"));
    }

    async fn add_pilet(&self, descriptor: PiletDescriptor) {
        self.calls.lock().unwrap().push(format!("add {}", descriptor.name));
    }

    async fn full_reload(&self) {
        self.calls.lock().unwrap().push("reload".to_string());
    }
}

/// Accept one socket client, push the given messages, then hang up.
fn serve_once(messages: Vec<String>) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    std::thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut socket = tungstenite::accept(stream).unwrap();
        for message in messages {
            socket.send(Message::Text(message.into())).unwrap();
        }
        let _ = socket.close(None);
        let _ = socket.flush();
    });

    Url::parse(&format!("http://127.0.0.1:{port}/$pilet-api")).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn websocket_messages_swap_pilets() {
    let api = serve_once(vec![
        json!({"name": "a", "version": "2"}).to_string(),
        "garbage".to_string(),
        json!({"name": "b", "version": "1"}).to_string(),
    ]);
    let channel = LiveReloadChannel::new(Arc::new(SessionContext::new()));
    let target = SpyTarget::default();

    channel
        .run(&TungsteniteConnector::new(), &socket_url(&api).unwrap(), &target)
        .await
        .unwrap();

    assert_eq!(
        *target.calls.lock().unwrap(),
        vec!["remove a", "add a", "remove b", "add b"]
    );
    assert_eq!(channel.state(), ChannelState::Closed);
}

#[tokio::test(flavor = "multi_thread")]
async fn dropping_the_receiver_closes_the_socket() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let (ended_tx, ended_rx) = std::sync::mpsc::channel();

    // The server never sends anything; it only watches for the client to leave.
    std::thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let mut socket = tungstenite::accept(stream).unwrap();
        let closed = loop {
            match socket.read() {
                Ok(Message::Close(_)) => break true,
                Ok(_) => {}
                Err(tungstenite::Error::Io(e))
                    if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    break false
                }
                Err(_) => break true,
            }
        };
        ended_tx.send(closed).unwrap();
    });

    let api = Url::parse(&format!("http://127.0.0.1:{port}/$pilet-api")).unwrap();
    let messages = TungsteniteConnector::new()
        .connect(&socket_url(&api).unwrap())
        .await
        .unwrap();
    drop(messages);

    let closed = tokio::task::spawn_blocking(move || ended_rx.recv_timeout(Duration::from_secs(3)))
        .await
        .unwrap();
    assert_eq!(closed, Ok(true));
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_socket_is_an_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let channel = LiveReloadChannel::new(Arc::new(SessionContext::new()));
    let url = Url::parse(&format!("ws://127.0.0.1:{port}/$pilet-api")).unwrap();

    let result = channel
        .run(&TungsteniteConnector::new(), &url, &SpyTarget::default())
        .await;

    assert!(result.is_err());
    assert_eq!(channel.state(), ChannelState::Closed);
}

#[tokio::test]
async fn emulator_merges_feed_and_pilet_api_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/pilet"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"name": "a", "version": "1"}, {"name": "b", "version": "1"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/$pilet-api"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "a", "version": "2"})))
        .mount(&server)
        .await;

    let session = Arc::new(SessionContext::new());
    session.set_flag(LOAD_PILETS, true);
    let feed = FeedRequester::new(&FeedConfig::new(format!("{}/api/v1/pilet", server.uri()))).unwrap();
    let requester = EmulatorRequester::new(feed, session, DebugConfig::with_origin(server.uri())).unwrap();

    let pilets = requester.request_pilets().await.unwrap();
    let versions: Vec<(&str, &str)> = pilets
        .iter()
        .map(|p| (p.name.as_str(), p.version.as_str()))
        .collect();
    assert_eq!(versions, vec![("a", "2"), ("b", "1")]);
}
