use base64::{Engine as _, engine::general_purpose::STANDARD};
use gemini_client::http_client::ReqwestGeminiClient;
use gemini_client::{GeminiError, GenerationClient, ImageOptions};
use secrecy::SecretString;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ReqwestGeminiClient {
    ReqwestGeminiClient::new(&server.uri(), SecretString::new("tok".into()))
        .with_models("text-model", "image-model")
}

#[tokio::test]
async fn generate_text_sends_api_key_and_joins_parts() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": "{\"1\": "}, {"text": "{}}"}]},
            "finishReason": "STOP"
        }]
    });

    Mock::given(method("POST"))
        .and(path("/v1beta/models/text-model:generateContent"))
        .and(header("x-goog-api-key", "tok"))
        .and(body_partial_json(serde_json::json!({
            "contents": [{"role": "user", "parts": [{"text": "make a plan"}]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let text = client_for(&server)
        .generate_text("make a plan")
        .await
        .expect("text");
    assert_eq!(text, "{\"1\": {}}");
}

#[tokio::test]
async fn generate_text_without_candidates_is_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/text-model:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let err = client_for(&server).generate_text("p").await.unwrap_err();
    assert!(matches!(err, GeminiError::EmptyResponse));
}

#[tokio::test]
async fn quota_errors_surface_as_rate_limited_with_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/text-model:generateContent"))
        .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
            "error": {"code": 429, "message": "Quota exceeded. Please retry in 6.4s.", "status": "RESOURCE_EXHAUSTED"}
        })))
        .mount(&server)
        .await;

    let err = client_for(&server).generate_text("p").await.unwrap_err();
    match err {
        GeminiError::RateLimited(msg) => assert!(msg.contains("Quota exceeded")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn server_errors_keep_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/text-model:generateContent"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .mount(&server)
        .await;

    let err = client_for(&server).generate_text("p").await.unwrap_err();
    assert!(matches!(err, GeminiError::Api { status: 500, .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn generate_image_decodes_first_prediction() {
    let server = MockServer::start().await;
    let png = vec![0x89u8, b'P', b'N', b'G'];
    let body = serde_json::json!({
        "predictions": [
            {"bytesBase64Encoded": STANDARD.encode(&png), "mimeType": "image/png"}
        ]
    });

    Mock::given(method("POST"))
        .and(path("/v1beta/models/image-model:predict"))
        .and(body_partial_json(serde_json::json!({
            "parameters": {
                "sampleCount": 1,
                "aspectRatio": "1:1",
                "safetyFilterLevel": "block_some",
                "personGeneration": "allow_adult"
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let bytes = client_for(&server)
        .generate_image("a salad", &ImageOptions::default())
        .await
        .expect("image");
    assert_eq!(bytes, Some(png));
}

#[tokio::test]
async fn generate_image_without_predictions_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/image-model:predict"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"predictions": []})))
        .mount(&server)
        .await;

    let bytes = client_for(&server)
        .generate_image("a salad", &ImageOptions::default())
        .await
        .expect("ok");
    assert!(bytes.is_none());
}
