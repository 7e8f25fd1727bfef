use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use metrics::counter;
use serde::Deserialize;
use tracing::{error, info, warn};

use domdash_core::auth::AuthOutcome;

use crate::problem::ProblemResponse;
use crate::render;
use crate::router::AppState;

pub const MISSING_FIELDS: &str = "Username and password are required";

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

pub async fn form() -> Html<String> {
    Html(render::login_page("", None))
}

pub async fn submit(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, ProblemResponse> {
    if form.username.trim().is_empty() || form.password.is_empty() {
        counter!("login_attempts_total", "result" => "invalid").increment(1);
        return Ok(login_error(StatusCode::BAD_REQUEST, &form.username, MISSING_FIELDS));
    }

    let outcome = state
        .authenticator()
        .authenticate(&form.username, &form.password)
        .await;

    match outcome {
        AuthOutcome::Success => {
            let token = state
                .sessions()
                .issue(&form.username, state.now())
                .map_err(|err| {
                    error!(stage = "auth", error = %err, "failed to issue session");
                    ProblemResponse::internal("failed to issue session")
                })?;

            counter!("login_attempts_total", "result" => "success").increment(1);
            info!(stage = "auth", user = %form.username, "login succeeded");

            let cookie = state.sessions().cookie(&token);
            Ok(([(header::SET_COOKIE, cookie)], Redirect::to("/dashboard")).into_response())
        }
        failure @ AuthOutcome::Failure { .. } => {
            counter!("login_attempts_total", "result" => "failure").increment(1);
            let message = failure
                .error_message()
                .unwrap_or(domdash_core::GENERIC_AUTH_ERROR);
            warn!(stage = "auth", user = %form.username, reason = message, "login rejected");
            Ok(login_error(StatusCode::UNAUTHORIZED, &form.username, message))
        }
    }
}

pub async fn logout(State(state): State<AppState>) -> Response {
    info!(stage = "auth", "logout");
    (
        [(header::SET_COOKIE, state.sessions().clear_cookie())],
        Redirect::to("/"),
    )
        .into_response()
}

fn login_error(status: StatusCode, username: &str, message: &str) -> Response {
    (status, Html(render::login_page(username, Some(message)))).into_response()
}
