use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use skyprice_core::{format_price, render, Locale, Message};
use skyprice_tests::{reference_reply, Upstreams, API_KEY};
use tower::ServiceExt;

fn message_request(user_id: &str, text: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/messages")
        .header("content-type", "application/json")
        .header("x-api-key", API_KEY)
        .body(Body::from(
            json!({ "user_id": user_id, "text": text }).to_string(),
        ))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, parsed)
}

fn replies(payload: &Value) -> Vec<String> {
    payload["replies"]
        .as_array()
        .unwrap()
        .iter()
        .map(|reply| reply.as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn health_is_public() {
    let upstreams = Upstreams::start().await;
    let app = upstreams.app().expect("app should build");

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert!(response.headers().get("x-request-id").is_some());
}

#[tokio::test]
async fn messages_require_api_key() {
    let upstreams = Upstreams::start().await;
    let app = upstreams.app().expect("app should build");

    let request = Request::builder()
        .method("POST")
        .uri("/v1/messages")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "user_id": "1", "text": "/inicio" }).to_string(),
        ))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn description_is_extracted_validated_and_priced() {
    let upstreams = Upstreams::start().await;
    upstreams.extraction_replies(&reference_reply(), 1).await;
    upstreams
        .pricing_replies(
            json!({
                "random_forest": 4500000.0,
                "svm": "4200000.5",
                "neural_network": 4700000
            }),
            1,
        )
        .await;
    let app = upstreams.app().expect("app should build");

    let (status, body) = send(
        &app,
        message_request("100", "Departamento de 80 m2 en la Narvarte, 2 recámaras"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "priced");
    assert_eq!(body["locale"], "es");

    let replies = replies(&body);
    assert_eq!(replies.len(), 3);
    assert_eq!(replies[0], render(Locale::Es, &Message::Processing));
    assert!(replies[1].contains("Benito Juárez"));
    assert!(replies[2].contains(&format_price(4_500_000.0)));
    assert!(replies[2].contains(&format_price(4_200_000.5)));
    assert!(replies[2].contains(&format_price(4_700_000.0)));
}

#[tokio::test]
async fn unparseable_extraction_skips_pricing() {
    let upstreams = Upstreams::start().await;
    upstreams
        .extraction_replies("Lo siento, no encontré un departamento.", 1)
        .await;
    upstreams.pricing_replies(json!({}), 0).await;
    let app = upstreams.app().expect("app should build");

    let (status, body) = send(&app, message_request("101", "hola")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "extraction_failed");
    assert_eq!(
        replies(&body).last().unwrap(),
        &render(Locale::Es, &Message::ExtractionFailed)
    );
}

#[tokio::test]
async fn unknown_municipality_is_rejected_before_pricing() {
    let upstreams = Upstreams::start().await;
    let reply = reference_reply().replace("Benito Juárez", "Guadalajara");
    upstreams.extraction_replies(&reply, 1).await;
    upstreams.pricing_replies(json!({}), 0).await;
    let app = upstreams.app().expect("app should build");

    let (_, body) = send(&app, message_request("102", "Depa en Guadalajara")).await;

    assert_eq!(body["outcome"], "rejected");
    assert_eq!(
        replies(&body)[1],
        render(Locale::Es, &Message::InvalidMunicipality("Guadalajara"))
    );
}

#[tokio::test]
async fn language_switch_persists_for_the_user() {
    let upstreams = Upstreams::start().await;
    upstreams.extraction_replies(&reference_reply(), 1).await;
    upstreams
        .pricing_replies(
            json!({ "random_forest": 1, "svm": 2, "neural_network": 3 }),
            1,
        )
        .await;
    let app = upstreams.app().expect("app should build");

    let (_, welcome) = send(&app, message_request("103", "/english")).await;
    assert_eq!(welcome["outcome"], "command");
    assert_eq!(
        replies(&welcome),
        vec![render(Locale::En, &Message::Welcome)]
    );

    let (_, priced) = send(&app, message_request("103", "Apartment in Benito Juárez")).await;
    assert_eq!(priced["locale"], "en");
    assert_eq!(replies(&priced)[0], render(Locale::En, &Message::Processing));

    let request = Request::builder()
        .uri("/v1/users/103/language")
        .header("x-api-key", API_KEY)
        .body(Body::empty())
        .unwrap();
    let (status, language) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(language["locale"], "en");

    let request = Request::builder()
        .uri("/v1/users/someone-else/language")
        .header("x-api-key", API_KEY)
        .body(Body::empty())
        .unwrap();
    let (_, language) = send(&app, request).await;
    assert_eq!(language["locale"], "es");
    assert!(language["updated_at_utc"].is_null());
}

#[tokio::test]
async fn blank_user_id_is_a_bad_request() {
    let upstreams = Upstreams::start().await;
    let app = upstreams.app().expect("app should build");

    let (status, body) = send(&app, message_request("  ", "/inicio")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_user_id");
}

#[tokio::test]
async fn clients_are_rate_limited() {
    let upstreams = Upstreams::start().await;
    let app = upstreams.app_with_rate_limit(2).expect("app should build");

    for _ in 0..2 {
        let (status, _) = send(&app, message_request("104", "/inicio")).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(&app, message_request("104", "/inicio")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "rate_limited");
}
