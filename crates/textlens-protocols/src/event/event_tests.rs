use super::*;
use serde_json::json;

#[test]
fn test_event_type_round_trip_known() {
    for name in [
        "SETTINGS_UPDATE",
        "MODEL_LOAD_REQUEST",
        "MODEL_LOADING_PROGRESS",
        "REQUEST_ACTION",
        "INFERENCE_CHUNK",
        "INFERENCE_COMPLETE",
        "INFERENCE_ERROR",
        "INFERENCE_STOPPED",
        "STOP_INFERENCE",
    ] {
        let kind = EventType::from(name);
        assert!(kind.is_known(), "{} should be known", name);
        assert_eq!(kind.as_str(), name);
    }
}

#[test]
fn test_event_type_custom() {
    let kind = EventType::from("TAB_FOCUSED");
    assert_eq!(kind, EventType::Custom("TAB_FOCUSED".to_string()));
    assert!(!kind.is_known());
    assert_eq!(serde_json::to_string(&kind).unwrap(), "\"TAB_FOCUSED\"");
}

#[test]
fn test_create_event_defaults_source() {
    let event = create_event(
        EventPayload::StopInference(StopInference::default()),
        None,
    );
    assert_eq!(event.source, DEFAULT_SOURCE);
    assert!(event.timestamp > 0);
}

#[test]
fn test_create_event_with_source() {
    let event = create_event(
        EventPayload::InferenceChunk(InferenceChunk {
            request_id: "r1".to_string(),
            token: "Hi".to_string(),
        }),
        Some("background"),
    );
    assert_eq!(event.source, "background");
    assert_eq!(event.event_type(), EventType::InferenceChunk);
    assert_eq!(event.request_id(), Some("r1"));
}

#[test]
fn test_envelope_wire_shape() {
    let event = create_event(
        EventPayload::InferenceChunk(InferenceChunk {
            request_id: "r1".to_string(),
            token: "Hi".to_string(),
        }),
        Some("background"),
    );
    let value = event.to_value().unwrap();
    assert_eq!(value["type"], "INFERENCE_CHUNK");
    assert_eq!(value["payload"]["requestId"], "r1");
    assert_eq!(value["payload"]["token"], "Hi");
    assert_eq!(value["source"], "background");

    let decoded = Event::from_value(value).unwrap();
    assert_eq!(decoded, event);
}

#[test]
fn test_envelope_missing_type() {
    let result = Envelope::from_value(json!({"payload": {}}));
    assert_eq!(result, Err(ProtocolError::MissingType));
}

#[test]
fn test_envelope_non_string_type() {
    let result = Envelope::from_value(json!({"type": 5, "payload": {}}));
    assert!(matches!(result, Err(ProtocolError::InvalidType(_))));
}

#[test]
fn test_envelope_defaults() {
    let envelope = Envelope::from_value(json!({"type": "PING"})).unwrap();
    assert_eq!(envelope.source, DEFAULT_SOURCE);
    assert_eq!(envelope.timestamp, 0);
    assert!(envelope.payload.is_null());
}

#[test]
fn test_unknown_type_kept_as_other() {
    let event = Event::from_value(json!({
        "type": "PAGE_CATEGORY",
        "payload": {"category": "news", "requestId": "x"},
        "source": "content",
        "timestamp": 1,
    }))
    .unwrap();
    match &event.payload {
        EventPayload::Other { event_type, payload } => {
            assert_eq!(event_type, "PAGE_CATEGORY");
            assert_eq!(payload["category"], "news");
        }
        other => panic!("expected Other, got {:?}", other),
    }
    assert_eq!(event.request_id(), Some("x"));
}

#[test]
fn test_known_type_with_bad_payload() {
    let result = Event::from_value(json!({
        "type": "INFERENCE_CHUNK",
        "payload": {"token": "no id"},
    }));
    assert!(matches!(result, Err(ProtocolError::InvalidPayload { .. })));
}

#[test]
fn test_error_message_fallback() {
    let with_error = InferenceFailure::new("r", "boom");
    assert_eq!(with_error.message(), "boom");

    let legacy: InferenceFailure =
        serde_json::from_value(json!({"requestId": "r", "message": "legacy"})).unwrap();
    assert_eq!(legacy.message(), "legacy");

    let empty: InferenceFailure = serde_json::from_value(json!({"requestId": "r"})).unwrap();
    assert_eq!(empty.message(), "Unknown error");
}

#[test]
fn test_request_action_from_request() {
    let request = crate::types::InferenceRequest::new(vec![crate::types::ChatMessage::user("hello")])
        .with_action("summarize");
    let payload = RequestAction::from_request(request, "req-1");
    let value = serde_json::to_value(&payload).unwrap();
    assert_eq!(value["requestId"], "req-1");
    assert_eq!(value["action"], "summarize");
    assert_eq!(value["parameters"]["temperature"], serde_json::json!(0.7f32));
    assert!(value.get("modelId").is_none());
}

#[test]
fn test_stop_inference_empty_payload() {
    let payload = EventPayload::decode("STOP_INFERENCE", json!({})).unwrap();
    assert_eq!(payload, EventPayload::StopInference(StopInference::default()));
    assert_eq!(payload.request_id(), None);
}

#[test]
fn test_model_loading_progress_status() {
    let payload = EventPayload::decode(
        "MODEL_LOADING_PROGRESS",
        json!({"requestId": "r", "model": "m", "progress": 0.5, "status": "loading"}),
    )
    .unwrap();
    match payload {
        EventPayload::ModelLoadingProgress(p) => {
            assert_eq!(p.status, LoadStatus::Loading);
            assert_eq!(p.progress, 0.5);
        }
        other => panic!("unexpected {:?}", other),
    }
}
