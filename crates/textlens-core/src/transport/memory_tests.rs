use super::*;
use crate::transport::MessageResponse;
use serde_json::json;

fn echo_listener(tag: &'static str) -> MessageListener {
    Arc::new(move |value: Value, _sender: SenderInfo| -> MessageResponse {
        Box::pin(async move { Some(json!({"from": tag, "echo": value})) })
    })
}

fn silent_listener() -> MessageListener {
    Arc::new(|_value: Value, _sender: SenderInfo| -> MessageResponse { Box::pin(async { None }) })
}

#[tokio::test]
async fn test_send_without_receiver() {
    let hub = MemoryHub::new();
    let popup = hub.context(ContextId::Popup);

    let result = popup.send_message(Target::Extension, json!({})).await;
    assert!(matches!(result, Err(TransportError::NoReceiver(_))));
}

#[tokio::test]
async fn test_send_to_background() {
    let hub = MemoryHub::new();
    let background = hub.context(ContextId::Background);
    let tab = hub.context(ContextId::tab(1));
    background.add_message_listener(echo_listener("bg"));

    let response = tab.send_message(Target::Extension, json!(5)).await.unwrap();
    assert_eq!(response, Some(json!({"from": "bg", "echo": 5})));
}

#[tokio::test]
async fn test_message_does_not_loop_back() {
    let hub = MemoryHub::new();
    let background = hub.context(ContextId::Background);
    background.add_message_listener(echo_listener("bg"));

    let result = background.send_message(Target::Extension, json!(1)).await;
    assert!(matches!(result, Err(TransportError::NoReceiver(_))));
}

#[tokio::test]
async fn test_first_response_wins() {
    let hub = MemoryHub::new();
    let background = hub.context(ContextId::Background);
    let popup = hub.context(ContextId::Popup);
    let tab = hub.context(ContextId::tab(2));
    background.add_message_listener(silent_listener());
    popup.add_message_listener(echo_listener("popup"));

    let response = tab.send_message(Target::Extension, json!("x")).await.unwrap();
    assert_eq!(response.unwrap()["from"], "popup");
}

#[tokio::test]
async fn test_no_response_is_none() {
    let hub = MemoryHub::new();
    let background = hub.context(ContextId::Background);
    let popup = hub.context(ContextId::Popup);
    background.add_message_listener(silent_listener());

    let response = popup.send_message(Target::Extension, json!(1)).await.unwrap();
    assert!(response.is_none());
}

#[tokio::test]
async fn test_send_to_specific_frame() {
    let hub = MemoryHub::new();
    let background = hub.context(ContextId::Background);
    let top = hub.context(ContextId::tab(4));
    let child = hub.context(ContextId::Tab {
        tab_id: 4,
        frame_id: 7,
    });
    top.add_message_listener(echo_listener("top"));
    child.add_message_listener(echo_listener("child"));

    let response = background
        .send_message(Target::frame(4, 7), json!(0))
        .await
        .unwrap();
    assert_eq!(response.unwrap()["from"], "child");
}

#[tokio::test]
async fn test_remove_message_listener() {
    let hub = MemoryHub::new();
    let background = hub.context(ContextId::Background);
    let popup = hub.context(ContextId::Popup);
    let id = background.add_message_listener(echo_listener("bg"));

    assert!(background.remove_message_listener(id));
    assert!(!background.remove_message_listener(id));
    let result = popup.send_message(Target::Extension, json!(1)).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_connect_without_listener() {
    let hub = MemoryHub::new();
    let popup = hub.context(ContextId::Popup);
    let result = popup.connect("inference", Target::Extension);
    assert!(matches!(result, Err(TransportError::NoReceiver(_))));
}

#[tokio::test]
async fn test_connect_delivers_remote_port() {
    let hub = MemoryHub::new();
    let background = hub.context(ContextId::Background);
    let tab = hub.context(ContextId::tab(11));

    let (port_tx, mut port_rx) = tokio::sync::mpsc::unbounded_channel();
    background.add_connect_listener(Arc::new(move |port: Port| {
        let _ = port_tx.send(port);
    }));

    let mut local = tab.connect("inference", Target::Extension).unwrap();
    assert_eq!(local.peer.context, ContextId::Background);

    let mut remote = port_rx.recv().await.unwrap();
    assert_eq!(remote.name, "inference");
    assert_eq!(remote.peer.tab_id(), Some(11));

    local.tx.send(json!("ping")).unwrap();
    assert_eq!(remote.rx.recv().await, Some(json!("ping")));
    remote.tx.send(json!("pong")).unwrap();
    assert_eq!(local.rx.recv().await, Some(json!("pong")));
}

#[tokio::test]
async fn test_listener_counts_and_remove_context() {
    let hub = MemoryHub::new();
    let background = hub.context(ContextId::Background);
    background.add_message_listener(silent_listener());
    background.add_connect_listener(Arc::new(|_port: Port| {}));
    assert_eq!(hub.listener_counts(ContextId::Background), (1, 1));

    assert!(hub.remove_context(ContextId::Background));
    assert_eq!(hub.listener_counts(ContextId::Background), (0, 0));
}
