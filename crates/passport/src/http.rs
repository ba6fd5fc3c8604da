//! HTTP boundary.
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/sponsor/passport` | POST | Stamp an attendee's passport |
//! | `/sponsor/passport?short_id=&jwt=` | GET | Sponsor's view of an attendee |
//! | `/sponsor/auth` | POST | Sponsor login, returns a token |
//! | `/attendee/passport?short_id=` | GET | Attendee passport status |
//! | `/attendee/passport/completion?short_id=` | GET | Required sponsors still missing |
//! | `/healthz` | GET | Liveness |
//!
//! Every failure is `{ "error": "<message>" }` with the status of its
//! [`ErrorClass`]. Bodies are parsed here so a malformed one is reported
//! the same way as a missing field.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error};

use passport_core::ShortId;
use passport_store::Ledger;

use crate::engine::{parse_short_id, StampRequest};
use crate::error::{ErrorClass, PassportError, Result};
use crate::service::Passport;
use crate::sponsor::{LoginRequest, LoginResponse, SponsorView};

/// Status code plus JSON body.
pub type Reply = (StatusCode, Json<Value>);

/// Shared handler state.
pub type AppState<L> = Arc<Passport<L>>;

/// Query string for the GET endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct PassportQuery {
    pub short_id: Option<String>,
    pub jwt: Option<String>,
}

impl PassportQuery {
    fn short_id(&self) -> Result<ShortId> {
        let raw = self
            .short_id
            .as_deref()
            .ok_or_else(|| PassportError::Input("missing short_id".into()))?;
        parse_short_id(raw)
    }
}

/// Build the service router.
pub fn router<L: Ledger + 'static>(passport: AppState<L>) -> Router {
    Router::new()
        .route(
            "/sponsor/passport",
            post(stamp::<L>).get(sponsor_view::<L>),
        )
        .route("/sponsor/auth", post(login::<L>))
        .route("/attendee/passport", get(status::<L>))
        .route("/attendee/passport/completion", get(completion::<L>))
        .route("/healthz", get(healthz))
        .with_state(passport)
}

pub async fn stamp<L: Ledger>(State(passport): State<AppState<L>>, body: String) -> Reply {
    let result = match parse_body::<StampRequest>(&body) {
        Ok(request) => passport.stamp(request).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(outcome) => ok(outcome.to_response()),
        Err(err) => fail(err),
    }
}

pub async fn sponsor_view<L: Ledger>(
    State(passport): State<AppState<L>>,
    Query(query): Query<PassportQuery>,
) -> Reply {
    respond(view_for(&passport, query).await)
}

pub async fn login<L: Ledger>(State(passport): State<AppState<L>>, body: String) -> Reply {
    let result = match parse_body::<LoginRequest>(&body) {
        Ok(request) => passport.login(request).await.map(LoginResponse::from),
        Err(err) => Err(err),
    };

    respond(result)
}

pub async fn status<L: Ledger>(
    State(passport): State<AppState<L>>,
    Query(query): Query<PassportQuery>,
) -> Reply {
    let result = match query.short_id() {
        Ok(short_id) => passport.status(&short_id).await,
        Err(err) => Err(err),
    };

    respond(result)
}

pub async fn completion<L: Ledger>(
    State(passport): State<AppState<L>>,
    Query(query): Query<PassportQuery>,
) -> Reply {
    let result = match query.short_id() {
        Ok(short_id) => passport.completion(&short_id).await,
        Err(err) => Err(err),
    };

    respond(result)
}

async fn view_for<L: Ledger>(passport: &Passport<L>, query: PassportQuery) -> Result<SponsorView> {
    let short_id = query.short_id()?;
    let jwt = query
        .jwt
        .ok_or_else(|| PassportError::Input("missing jwt".into()))?;
    passport.sponsor_view(short_id.as_str(), &jwt).await
}

pub async fn healthz() -> Reply {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| PassportError::Input(e.to_string()))
}

fn respond<T: Serialize>(result: Result<T>) -> Reply {
    match result {
        Ok(value) => ok(value),
        Err(err) => fail(err),
    }
}

fn ok<T: Serialize>(value: T) -> Reply {
    match serde_json::to_value(value) {
        Ok(body) => (StatusCode::OK, Json(body)),
        Err(e) => {
            error!(error = %e, "response serialization failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal server error" })),
            )
        }
    }
}

fn fail(err: PassportError) -> Reply {
    let class = err.class();
    match class {
        ErrorClass::Internal => error!(error = %err, "request failed"),
        _ => debug!(error = %err, "request rejected"),
    }

    let status =
        StatusCode::from_u16(class.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({ "error": err.public_message() })))
}
