use super::*;
use crate::transport::ContextId;
use serde_json::json;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;
use textlens_protocols::event::{InferenceChunk, InferenceComplete};

fn pair() -> (EventStream, EventStream) {
    let (a, b) = Port::pair(
        "textlens-inference",
        SenderInfo::new(ContextId::Popup),
        SenderInfo::new(ContextId::Background),
    );
    (EventStream::spawn(a, "popup"), EventStream::spawn(b, "background"))
}

fn chunk(request_id: &str, token: &str) -> EventPayload {
    EventPayload::InferenceChunk(InferenceChunk {
        request_id: request_id.to_string(),
        token: token.to_string(),
    })
}

fn complete(request_id: &str) -> EventPayload {
    EventPayload::InferenceComplete(InferenceComplete {
        request_id: request_id.to_string(),
        full_response: "done".to_string(),
        usage: None,
    })
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

fn collect_tokens(stream: &EventStream) -> Arc<Mutex<Vec<String>>> {
    let tokens = Arc::new(Mutex::new(Vec::new()));
    let log = tokens.clone();
    stream.on_message(EventType::InferenceChunk, move |event| {
        if let EventPayload::InferenceChunk(chunk) = &event.payload {
            log.lock().push(chunk.token.clone());
        }
    });
    tokens
}

#[tokio::test]
async fn test_peer_and_name() {
    let (client, server) = pair();
    assert_eq!(client.name(), "textlens-inference");
    assert_eq!(client.peer().context, ContextId::Background);
    assert_eq!(server.peer().context, ContextId::Popup);
    assert_ne!(client.id(), server.id());
}

#[tokio::test]
async fn test_events_delivered_in_order() {
    let (client, server) = pair();
    let tokens = collect_tokens(&client);

    for i in 0..50 {
        assert!(server.send(chunk("r1", &i.to_string())));
    }

    wait_until(|| tokens.lock().len() == 50).await;
    let expected: Vec<String> = (0..50).map(|i| i.to_string()).collect();
    assert_eq!(*tokens.lock(), expected);
}

#[tokio::test]
async fn test_dispatch_filters_by_type() {
    let (client, server) = pair();
    let tokens = collect_tokens(&client);
    let completions = Arc::new(AtomicUsize::new(0));
    let counter = completions.clone();
    client.on_message(EventType::InferenceComplete, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    server.send(chunk("r1", "a"));
    server.send(complete("r1"));

    wait_until(|| completions.load(Ordering::SeqCst) == 1).await;
    assert_eq!(*tokens.lock(), vec!["a".to_string()]);
}

#[tokio::test]
async fn test_unsubscribed_handler_not_called() {
    let (client, server) = pair();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let sub = client.on_message(EventType::InferenceChunk, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let tokens = collect_tokens(&client);

    sub.unsubscribe();
    server.send(chunk("r1", "a"));

    wait_until(|| tokens.lock().len() == 1).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(client.handler_count(), 1);
}

#[tokio::test]
async fn test_close_is_reported_once() {
    let (client, server) = pair();
    let closes = Arc::new(AtomicUsize::new(0));
    let counter = closes.clone();
    client.on_close(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    assert!(client.close());
    assert!(!client.close());
    assert!(client.is_closed());
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert!(!client.send(chunk("r1", "late")));
    assert_eq!(client.handler_count(), 0);

    wait_until(|| server.is_closed()).await;
    assert!(!server.send(chunk("r1", "late")));
}

#[tokio::test]
async fn test_peer_disconnect_runs_close_callbacks() {
    let (client, server) = pair();
    let closed = Arc::new(AtomicUsize::new(0));
    let counter = closed.clone();
    server.on_close(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    drop(client);
    wait_until(|| closed.load(Ordering::SeqCst) == 1).await;
    assert!(server.is_closed());
    assert!(!server.close());
}

#[tokio::test]
async fn test_on_close_after_close_runs_immediately() {
    let (client, _server) = pair();
    client.close();

    let ran = Arc::new(AtomicUsize::new(0));
    let counter = ran.clone();
    client.on_close(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(ran.load(Ordering::SeqCst), 1);
    assert!(!client.on_message(EventType::InferenceChunk, |_| {}).is_active());
}

#[tokio::test]
async fn test_malformed_envelope_dropped() {
    let (raw, other) = Port::pair(
        "textlens-inference",
        SenderInfo::new(ContextId::Background),
        SenderInfo::new(ContextId::Popup),
    );
    let client = EventStream::spawn(other, "popup");
    let tokens = collect_tokens(&client);

    raw.tx.send(json!({"payload": {"token": "x"}})).unwrap();
    raw.tx.send(json!({"type": 42})).unwrap();
    raw.tx
        .send(json!({"type": "INFERENCE_CHUNK", "payload": {"wrong": true}}))
        .unwrap();
    let good = create_event(chunk("r1", "ok"), Some("background"))
        .to_value()
        .unwrap();
    raw.tx.send(good).unwrap();

    wait_until(|| tokens.lock().len() == 1).await;
    assert_eq!(*tokens.lock(), vec!["ok".to_string()]);
    assert!(!client.is_closed());
}

#[tokio::test]
async fn test_panicking_handler_isolated() {
    let (client, server) = pair();
    client.on_message(EventType::InferenceChunk, |_| panic!("handler bug"));
    let tokens = collect_tokens(&client);

    server.send(chunk("r1", "a"));
    server.send(chunk("r1", "b"));

    wait_until(|| tokens.lock().len() == 2).await;
    assert!(!client.is_closed());
}

#[tokio::test]
async fn test_handler_may_close_stream() {
    let (client, server) = pair();
    let tokens = collect_tokens(&client);
    let closer = client.clone();
    client.on_message(EventType::InferenceComplete, move |_| {
        closer.close();
    });

    server.send(chunk("r1", "a"));
    server.send(complete("r1"));
    server.send(chunk("r1", "after"));

    wait_until(|| client.is_closed()).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(*tokens.lock(), vec!["a".to_string()]);
}
