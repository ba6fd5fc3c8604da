//! Status codes and JSON bodies at the HTTP boundary.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use chrono::Duration;
use serde_json::{json, Value};

use passport::http::{completion, healthz, login, router, sponsor_view, stamp, status, PassportQuery};
use passport::{Passport, TokenKeys};
use passport_auth::SigningKey;
use passport_testkit::{scenario, FailingLedger, TestFixture, FIXTURE_SECRET};

fn query(short_id: Option<&str>, jwt: Option<&str>) -> Query<PassportQuery> {
    Query(PassportQuery {
        short_id: short_id.map(str::to_string),
        jwt: jwt.map(str::to_string),
    })
}

fn error_body(message: &str) -> Value {
    json!({ "error": message })
}

async fn post_stamp(fixture: &TestFixture, body: Value) -> (StatusCode, Value) {
    let (code, body) = stamp(State(fixture.passport.clone()), body.to_string()).await;
    (code, body.0)
}

#[tokio::test]
async fn stamp_first_visit_then_update() {
    let fixture = scenario().await;
    let token = fixture.token_for("5");

    let (code, body) =
        post_stamp(&fixture, json!({ "short_id": "ABC123", "jwt": token })).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "message": "First visit registered",
            "visit_count": 1,
            "last_visit": "2024-05-01T10:00:00Z",
        })
    );

    fixture.clock.advance(Duration::minutes(5));
    let (code, body) = post_stamp(
        &fixture,
        json!({ "short_id": "ABC123", "jwt": token, "notes": "follow up", "register_visit": true }),
    )
    .await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body["message"], "Visit updated");
    assert_eq!(body["visit_count"], 2);
    assert_eq!(body["last_visit"], "2024-05-01T10:05:00Z");
    assert_eq!(body["previous_notes"], "follow up");
}

#[tokio::test]
async fn stamp_null_register_visit_counts() {
    let fixture = scenario().await;
    let token = fixture.token_for("5");
    post_stamp(&fixture, json!({ "short_id": "ABC123", "jwt": token })).await;

    let (code, body) = post_stamp(
        &fixture,
        json!({ "short_id": "ABC123", "jwt": token, "notes": "hello", "register_visit": null }),
    )
    .await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body["message"], "Visit updated");
    assert_eq!(body["visit_count"], 2);
}

#[tokio::test]
async fn stamp_bad_input_is_400() {
    let fixture = scenario().await;
    let token = fixture.token_for("5");

    let bodies = [
        "not json".to_string(),
        json!({ "jwt": token }).to_string(),
        json!({ "short_id": "ABC123" }).to_string(),
        json!({ "short_id": "", "jwt": token }).to_string(),
        json!({ "short_id": "ABC#123", "jwt": token }).to_string(),
        json!({ "short_id": "ABC123", "jwt": token, "register_visit": "yes" }).to_string(),
    ];

    for body in bodies {
        let (code, reply) = stamp(State(fixture.passport.clone()), body.clone()).await;
        assert_eq!(code, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(reply.0, error_body("Invalid input"), "{body}");
    }
    assert!(fixture.visit("u-1", "5").await.is_none());
}

#[tokio::test]
async fn stamp_bad_token_is_403() {
    let fixture = scenario().await;

    let (code, body) = post_stamp(
        &fixture,
        json!({ "short_id": "ABC123", "jwt": fixture.expired_token_for("5") }),
    )
    .await;
    assert_eq!(code, StatusCode::FORBIDDEN);
    assert_eq!(body, error_body("Invalid or expired token"));

    let (code, body) = post_stamp(
        &fixture,
        json!({ "short_id": "ABC123", "jwt": fixture.token_without_sponsor() }),
    )
    .await;
    assert_eq!(code, StatusCode::FORBIDDEN);
    assert_eq!(body, error_body("Token does not contain sponsor_id"));
}

#[tokio::test]
async fn stamp_unknown_attendee_is_404() {
    let fixture = scenario().await;
    let (code, body) = post_stamp(
        &fixture,
        json!({ "short_id": "NOPE00", "jwt": fixture.token_for("5") }),
    )
    .await;
    assert_eq!(code, StatusCode::NOT_FOUND);
    assert_eq!(body, error_body("User not found"));
}

#[tokio::test]
async fn store_outage_is_500_without_cause() {
    let fixture = scenario().await;
    let keys = TokenKeys::new(SigningKey::hs256(FIXTURE_SECRET.to_vec()), Duration::hours(12));
    let failing = Arc::new(Passport::new(FailingLedger, keys, fixture.clock.clone()));

    let body = json!({ "short_id": "ABC123", "jwt": fixture.token_for("5") }).to_string();
    let (code, reply) = stamp(State(failing.clone()), body).await;
    assert_eq!(code, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.0, error_body("Error accessing store"));

    let (code, reply) = status(State(failing), query(Some("ABC123"), None)).await;
    assert_eq!(code, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.0, error_body("Error accessing store"));
}

#[tokio::test]
async fn login_issues_a_usable_token() {
    let fixture = scenario().await;

    let body = json!({ "sponsor_id": "5", "sponsor_key": "booth-5-key" }).to_string();
    let (code, reply) = login(State(fixture.passport.clone()), body).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(reply.0["expires_at"], "2024-05-01T22:00:00Z");

    let token = reply.0["token"].as_str().unwrap().to_string();
    let (code, _) = post_stamp(&fixture, json!({ "short_id": "ABC123", "jwt": token })).await;
    assert_eq!(code, StatusCode::OK);
}

#[tokio::test]
async fn login_failures() {
    let fixture = scenario().await;

    for body in [
        json!({ "sponsor_id": "5", "sponsor_key": "wrong" }),
        json!({ "sponsor_id": "99", "sponsor_key": "booth-5-key" }),
    ] {
        let (code, reply) = login(State(fixture.passport.clone()), body.to_string()).await;
        assert_eq!(code, StatusCode::FORBIDDEN, "{body}");
        assert_eq!(reply.0, error_body("Invalid credentials"));
    }

    let (code, reply) = login(
        State(fixture.passport.clone()),
        json!({ "sponsor_id": "5" }).to_string(),
    )
    .await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
    assert_eq!(reply.0, error_body("Invalid input"));
}

#[tokio::test]
async fn sponsor_view_reports_own_history() {
    let fixture = scenario().await;
    let token = fixture.token_for("5");

    let (code, body) = sponsor_view(
        State(fixture.passport.clone()),
        query(Some("ABC123"), Some(&token)),
    )
    .await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body.0["visit_count"], 0);
    assert_eq!(body.0["last_visit"], Value::Null);

    post_stamp(
        &fixture,
        json!({ "short_id": "ABC123", "jwt": token, "notes": "met at booth" }),
    )
    .await;

    let (code, body) = sponsor_view(
        State(fixture.passport.clone()),
        query(Some("ABC123"), Some(&token)),
    )
    .await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(
        body.0,
        json!({
            "first_name": "Ada",
            "last_name": "Lovelace",
            "role": "Engineer",
            "company": "Analytical Engines",
            "visit_count": 1,
            "last_visit": "2024-05-01T10:00:00Z",
            "notes": "met at booth",
        })
    );

    let (code, _) = sponsor_view(State(fixture.passport.clone()), query(Some("ABC123"), None)).await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn attendee_status_and_completion() {
    let fixture = scenario().await;
    fixture.add_sponsor("8", "booth-8-key", true).await;

    let (code, body) = status(State(fixture.passport.clone()), query(Some("ABC123"), None)).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body.0["stamped_sponsors"], json!([]));

    post_stamp(
        &fixture,
        json!({ "short_id": "ABC123", "jwt": fixture.token_for("5") }),
    )
    .await;

    let (code, body) = status(State(fixture.passport.clone()), query(Some("ABC123"), None)).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(
        body.0,
        json!({
            "first_name": "Ada",
            "last_name": "Lovelace",
            "role": "Engineer",
            "company": "Analytical Engines",
            "stamped_sponsors": ["5"],
        })
    );

    let (code, body) =
        completion(State(fixture.passport.clone()), query(Some("ABC123"), None)).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(
        body.0,
        json!({ "required": ["5", "8"], "missing": ["8"], "complete": false })
    );

    let (code, body) = status(State(fixture.passport.clone()), query(None, None)).await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
    assert_eq!(body.0, error_body("Invalid input"));

    let (code, _) = completion(State(fixture.passport.clone()), query(Some("ZZZ999"), None)).await;
    assert_eq!(code, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn healthz_and_router() {
    let (code, body) = healthz().await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body.0, json!({ "status": "ok" }));

    let fixture = scenario().await;
    let _app = router(fixture.passport.clone());
}
