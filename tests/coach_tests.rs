// Integration tests for the coaching requesters against a mock text endpoint

use reservation_trainer::coach::{
    BookingAccuracy, EvaluationRequester, GeminiTextClient, GenerationError, SuggestionOutcome,
    SuggestionRequester, TextGenerator, IDLE_SUGGESTION,
};
use reservation_trainer::trainer::BookingDraft;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENDPOINT: &str = "/v1beta/models/flash:generateContent";

fn reply(text: &str) -> serde_json::Value {
    json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] })
}

fn client(server: &MockServer) -> Arc<dyn TextGenerator> {
    Arc::new(GeminiTextClient::new(
        format!("{}/v1beta", server.uri()),
        "flash",
        "test-key",
    ))
}

#[tokio::test]
async fn test_client_sends_json_mode_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{ "parts": [{ "text": "Say hi" }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": { "type": "ARRAY" }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply(r#"["hi"]"#)))
        .expect(1)
        .mount(&server)
        .await;

    let text = client(&server)
        .generate_json("Say hi", &json!({ "type": "ARRAY" }))
        .await
        .unwrap();
    assert_eq!(text, r#"["hi"]"#);
}

#[tokio::test]
async fn test_client_reports_status_and_empty_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let generator = client(&server);
    let err = generator.generate_json("x", &json!({})).await.unwrap_err();
    assert!(matches!(err, GenerationError::Status { status: 429, ref body } if body == "quota exceeded"));

    let err = generator.generate_json("x", &json!({})).await.unwrap_err();
    assert!(matches!(err, GenerationError::EmptyResponse));
}

#[tokio::test]
async fn test_suggestions_replace_previous() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(reply(r#"["One", "Two", "Three", "Four"]"#)),
        )
        .mount(&server)
        .await;

    let requester = SuggestionRequester::new(client(&server));
    assert_eq!(requester.suggestions().await, vec![IDLE_SUGGESTION]);

    let outcome = requester.request("Customer: Hi").await;
    assert_eq!(
        outcome,
        SuggestionOutcome::Updated(vec!["One".into(), "Two".into(), "Three".into()])
    );
    assert_eq!(requester.suggestions().await, vec!["One", "Two", "Three"]);
    assert!(!requester.is_generating());
}

#[tokio::test]
async fn test_suggestions_are_single_flight() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(reply(r#"["Slow answer"]"#))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let requester = SuggestionRequester::new(client(&server));

    let (first, second) = tokio::join!(
        requester.request("Customer: Hi"),
        requester.request("Customer: Hi\nCustomer: Hello?")
    );

    assert_eq!(first, SuggestionOutcome::Updated(vec!["Slow answer".into()]));
    assert_eq!(second, SuggestionOutcome::Skipped);
    assert!(!requester.is_generating());
}

#[tokio::test]
async fn test_failed_suggestions_keep_previous_and_release_flag() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply("[]")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply(r#"["Recovered"]"#)))
        .mount(&server)
        .await;

    let requester = SuggestionRequester::new(client(&server));
    requester.set(vec!["Keep me".to_string()]).await;

    assert!(matches!(
        requester.request("t").await,
        SuggestionOutcome::Failed(_)
    ));
    assert_eq!(requester.suggestions().await, vec!["Keep me"]);

    // An empty list is a schema error, not an update
    assert!(matches!(
        requester.request("t").await,
        SuggestionOutcome::Failed(_)
    ));
    assert_eq!(requester.suggestions().await, vec!["Keep me"]);

    assert_eq!(
        requester.request("t").await,
        SuggestionOutcome::Updated(vec!["Recovered".into()])
    );
}

#[tokio::test]
async fn test_evaluation_includes_booking_and_is_stored() {
    let server = MockServer::start().await;
    let evaluation = json!({
        "score": 72,
        "summary": "Dates were right, room type was not.",
        "strengths": ["Friendly"],
        "areasForImprovement": ["Confirm the bed type"],
        "bookingAccuracy": "Good"
    });
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply(&evaluation.to_string())))
        .expect(1)
        .mount(&server)
        .await;

    let requester = EvaluationRequester::new(client(&server));
    let booking = BookingDraft {
        guest_name: "Maria Santos".to_string(),
        check_in: "2025-06-01".to_string(),
        check_out: "2025-06-03".to_string(),
        guests: 2,
        room_id: Some("204".to_string()),
        ..Default::default()
    };

    let result = requester
        .evaluate("Customer: I need a room for two, June 1 to June 3", &booking)
        .await
        .unwrap();
    assert_eq!(result.score, 72.0);
    assert_eq!(result.booking_accuracy, BookingAccuracy::Good);
    assert_eq!(requester.evaluation().await, Some(result));

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(prompt.contains("Customer: I need a room for two, June 1 to June 3"));
    assert!(prompt.contains(r#""roomId":"204""#));
    assert!(prompt.contains(r#""guestName":"Maria Santos""#));

    requester.clear().await;
    assert_eq!(requester.evaluation().await, None);
}

#[tokio::test]
async fn test_failed_evaluation_leaves_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply(r#"{"score": 50}"#)))
        .expect(1)
        .mount(&server)
        .await;

    let requester = EvaluationRequester::new(client(&server));
    requester
        .trigger("Agent: Hello".to_string(), BookingDraft::default())
        .await
        .unwrap();

    assert_eq!(requester.evaluation().await, None);
}
