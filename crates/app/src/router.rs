use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use metrics::gauge;
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

use domdash_core::auth::Authenticator;
use domdash_core::types::DomainRecord;
use domdash_storage::RecordSource;
use domdash_util::AppConfig;

use crate::credentials::StaticCredentials;
use crate::session::SessionManager;
use crate::{dashboard, login, telemetry};

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Clone)]
pub struct AppState {
    metrics: PrometheusHandle,
    records: Arc<[DomainRecord]>,
    authenticator: Arc<dyn Authenticator>,
    sessions: SessionManager,
    clock: Clock,
}

impl AppState {
    pub fn new(
        metrics: PrometheusHandle,
        records: Arc<[DomainRecord]>,
        authenticator: Arc<dyn Authenticator>,
        sessions: SessionManager,
    ) -> Self {
        gauge!("record_source_rows").set(records.len() as f64);
        Self {
            metrics,
            records,
            authenticator,
            sessions,
            clock: Arc::new(Utc::now),
        }
    }

    /// Wires the production collaborators described by `config`.
    ///
    /// The dataset is read once here; every view is computed over this copy.
    pub async fn from_config(config: &AppConfig, metrics: PrometheusHandle) -> Self {
        let source = RecordSource::new(config.domains_csv_path.clone());
        let records: Arc<[DomainRecord]> = source.fetch_domains().await.into();
        info!(
            stage = "storage",
            path = %source.path().display(),
            rows = records.len(),
            "domain records loaded"
        );
        Self::new(
            metrics,
            records,
            Arc::new(StaticCredentials::new(config.credentials.clone())),
            SessionManager::new(
                &config.session_secret,
                config.session_ttl,
                config.environment.is_production(),
            ),
        )
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn metrics(&self) -> &PrometheusHandle {
        &self.metrics
    }

    pub fn records(&self) -> &[DomainRecord] {
        &self.records
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(login::form))
        .route("/login", post(login::submit))
        .route("/logout", post(login::logout))
        .route("/dashboard", get(dashboard::page))
        .route("/api/domains", get(dashboard::api))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = telemetry::render_metrics(state.metrics());
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{io::Write, time::Duration};

    use axum::{
        body::Body,
        http::{Request, Response},
    };
    use domdash_util::LoginCredentials;
    use http_body_util::BodyExt;
    use sha2::{Digest, Sha256};
    use tempfile::NamedTempFile;
    use tower::ServiceExt;

    use crate::session::SESSION_COOKIE;

    const HEADER: &str = "Domain,Niche 1,Niche 2,Traffic,DR,DA,Language,Price,Spam Score";

    struct TestApp {
        state: AppState,
        csv_file: NamedTempFile,
    }

    impl TestApp {
        fn router(&self) -> Router {
            app_router(self.state.clone())
        }

        fn session_cookie(&self) -> String {
            let token = self
                .state
                .sessions()
                .issue("demo", self.state.now())
                .expect("issue session");
            format!("{SESSION_COOKIE}={token}")
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    async fn setup(csv: &str) -> TestApp {
        let metrics = telemetry::init_metrics().expect("metrics init");

        let mut file = NamedTempFile::new().expect("temp csv");
        file.write_all(csv.as_bytes()).expect("write csv");

        let mut password_sha256 = [0u8; 32];
        password_sha256.copy_from_slice(&Sha256::digest(b"demo"));
        let credentials = StaticCredentials::new(LoginCredentials {
            username: "demo".to_string(),
            password_sha256,
        });

        let state = AppState::new(
            metrics,
            RecordSource::new(file.path()).fetch_domains().await.into(),
            Arc::new(credentials),
            SessionManager::new(b"test-secret", Duration::from_secs(3600), false),
        )
        .with_clock(Arc::new(fixed_now));

        TestApp { state, csv_file: file }
    }

    fn numbered_csv(count: usize) -> String {
        let mut csv = format!("{HEADER}\n");
        for idx in 1..=count {
            csv.push_str(&format!("site{idx:02}.com,Tech,,1K,{},{},English,$10,1%\n", idx % 7, idx));
        }
        csv
    }

    async fn body_text(response: Response<Body>) -> String {
        let collected = response
            .into_body()
            .collect()
            .await
            .expect("body should read");
        String::from_utf8(collected.to_bytes().to_vec()).expect("utf-8")
    }

    fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn login_request(username: &str, password: &str) -> Request<Body> {
        let body = serde_urlencoded::to_string([("username", username), ("password", password)])
            .expect("encode form");
        Request::builder()
            .method("POST")
            .uri("/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn healthz_returns_ok() {
        let app = setup(&numbered_csv(1)).await;
        let response = app
            .router()
            .oneshot(get("/healthz", None))
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_exports_build_info() {
        let app = setup(&numbered_csv(1)).await;
        let response = app
            .router()
            .oneshot(get("/metrics", None))
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("app_build_info"));
        assert!(body.contains("app_uptime_seconds"));
    }

    #[tokio::test]
    async fn entry_route_serves_login_form() {
        let app = setup(&numbered_csv(1)).await;
        let response = app
            .router()
            .oneshot(get("/", None))
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("name=\"username\""));
        assert!(body.contains("name=\"password\""));
    }

    #[tokio::test]
    async fn successful_login_redirects_to_dashboard_with_session() {
        let app = setup(&numbered_csv(1)).await;
        let response = app
            .router()
            .oneshot(login_request("demo", "demo"))
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/dashboard");

        let cookie = response.headers()[header::SET_COOKIE]
            .to_str()
            .expect("cookie header");
        let token = cookie
            .strip_prefix("domdash_session=")
            .and_then(|rest| rest.split(';').next())
            .expect("session token");
        let session = app
            .state
            .sessions()
            .validate(token, fixed_now())
            .expect("valid session");
        assert_eq!(session.username, "demo");
    }

    #[tokio::test]
    async fn rejected_login_stays_on_entry_route_with_error() {
        let app = setup(&numbered_csv(1)).await;
        let response = app
            .router()
            .oneshot(login_request("demo", "wrong"))
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::LOCATION).is_none());
        assert!(response.headers().get(header::SET_COOKIE).is_none());

        let body = body_text(response).await;
        assert!(body.contains("Invalid username or password"));
        assert!(body.contains("action=\"/login\""));
        assert!(body.contains("value=\"demo\""));
    }

    #[tokio::test]
    async fn blank_credentials_are_rejected_before_authentication() {
        let app = setup(&numbered_csv(1)).await;
        let response = app
            .router()
            .oneshot(login_request("  ", ""))
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_text(response).await;
        assert!(body.contains(login::MISSING_FIELDS));
    }

    #[tokio::test]
    async fn dashboard_without_session_redirects_to_entry() {
        let app = setup(&numbered_csv(1)).await;
        let response = app
            .router()
            .oneshot(get("/dashboard", None))
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");
    }

    #[tokio::test]
    async fn expired_session_is_not_accepted() {
        let app = setup(&numbered_csv(1)).await;
        let stale = app
            .state
            .sessions()
            .issue("demo", fixed_now() - chrono::Duration::hours(2))
            .expect("issue");

        let response = app
            .router()
            .oneshot(get("/dashboard", Some(&format!("{SESSION_COOKIE}={stale}"))))
            .await
            .expect("handler should respond");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn dashboard_paginates_records() {
        let app = setup(&numbered_csv(25)).await;
        let cookie = app.session_cookie();

        let response = app
            .router()
            .oneshot(get("/dashboard", Some(&cookie)))
            .await
            .expect("handler should respond");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Page 1 of 3"));
        assert!(body.contains("site01.com"));
        assert!(body.contains("site10.com"));
        assert!(!body.contains("site11.com"));

        let response = app
            .router()
            .oneshot(get("/dashboard?page=3", Some(&cookie)))
            .await
            .expect("handler should respond");
        let body = body_text(response).await;
        assert!(body.contains("Page 3 of 3"));
        assert!(body.contains("site21.com"));
        assert!(body.contains("site25.com"));
        assert!(!body.contains("site20.com"));
    }

    #[tokio::test]
    async fn dashboard_filters_case_insensitively() {
        let csv = format!(
            "{HEADER}\nbigshop.com,Retail,,1K,10,10,English,$5,1%\nstore.com,Retail,,1K,10,10,English,$5,1%\n"
        );
        let app = setup(&csv).await;
        let cookie = app.session_cookie();

        let response = app
            .router()
            .oneshot(get("/dashboard?q=SHOP", Some(&cookie)))
            .await
            .expect("handler should respond");
        let body = body_text(response).await;
        assert!(body.contains("bigshop.com"));
        assert!(!body.contains("store.com"));
    }

    #[tokio::test]
    async fn dashboard_ignores_unknown_sort_key() {
        let app = setup(&numbered_csv(3)).await;
        let cookie = app.session_cookie();

        let response = app
            .router()
            .oneshot(get("/dashboard?sort=rank&page=abc", Some(&cookie)))
            .await
            .expect("handler should respond");
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Page 1 of 1"));
    }

    #[tokio::test]
    async fn missing_csv_renders_empty_table() {
        let app = setup(&numbered_csv(3)).await;
        let cookie = app.session_cookie();
        let state = AppState::new(
            app.state.metrics().clone(),
            RecordSource::new("/definitely/not/here.csv")
                .fetch_domains()
                .await
                .into(),
            app.state.authenticator.clone(),
            app.state.sessions().clone(),
        )
        .with_clock(Arc::new(fixed_now));

        let response = app_router(state)
            .oneshot(get("/dashboard", Some(&cookie)))
            .await
            .expect("handler should respond");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Page 1 of 1"));
        assert!(body.contains("No results."));
    }

    #[tokio::test]
    async fn api_sorts_by_dr_in_both_directions() {
        let app = setup(&numbered_csv(12)).await;
        let cookie = app.session_cookie();

        for (dir, expected) in [("asc", vec![0, 1, 1, 2]), ("desc", vec![6, 5, 5, 4])] {
            let response = app
                .router()
                .oneshot(get(&format!("/api/domains?sort=dr&dir={dir}"), Some(&cookie)))
                .await
                .expect("handler should respond");
            assert_eq!(response.status(), StatusCode::OK);

            let value: serde_json::Value =
                serde_json::from_str(&body_text(response).await).expect("json");
            let dr: Vec<i64> = value["rows"]
                .as_array()
                .expect("rows")
                .iter()
                .take(4)
                .map(|row| row["dr"].as_i64().expect("dr"))
                .collect();
            assert_eq!(dr, expected);
            assert_eq!(value["pagination"]["totalPages"], 2);
            assert_eq!(value["state"]["sort"]["field"], "dr");
            assert_eq!(value["columns"][8]["label"], "Spam Score");
        }
    }

    #[tokio::test]
    async fn api_rejects_unknown_sort_field() {
        let app = setup(&numbered_csv(3)).await;
        let cookie = app.session_cookie();

        let response = app
            .router()
            .oneshot(get("/api/domains?sort=rank", Some(&cookie)))
            .await
            .expect("handler should respond");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/problem+json"
        );
    }

    #[tokio::test]
    async fn api_requires_session() {
        let app = setup(&numbered_csv(3)).await;
        let response = app
            .router()
            .oneshot(get("/api/domains", None))
            .await
            .expect("handler should respond");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn logout_clears_session_and_returns_to_entry() {
        let app = setup(&numbered_csv(1)).await;
        let cookie = app.session_cookie();
        let request = Request::builder()
            .method("POST")
            .uri("/logout")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap();

        let response = app
            .router()
            .oneshot(request)
            .await
            .expect("handler should respond");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");
        let cleared = response.headers()[header::SET_COOKIE]
            .to_str()
            .expect("cookie header");
        assert!(cleared.starts_with("domdash_session=;"));
        assert!(cleared.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn paging_uses_the_dataset_loaded_at_startup() {
        let app = setup(&numbered_csv(20)).await;
        let cookie = app.session_cookie();

        let response = app
            .router()
            .oneshot(get("/dashboard", Some(&cookie)))
            .await
            .expect("handler should respond");
        assert!(body_text(response).await.contains("Page 1 of 2"));

        let mut replacement = format!("{HEADER}\n");
        for idx in 1..=35 {
            replacement.push_str(&format!("other{idx:02}.com,Tech,,1K,1,1,English,$10,1%\n"));
        }
        std::fs::write(app.csv_file.path(), replacement).expect("rewrite csv");

        let response = app
            .router()
            .oneshot(get("/dashboard?page=2", Some(&cookie)))
            .await
            .expect("handler should respond");
        let body = body_text(response).await;
        assert!(body.contains("Page 2 of 2"));
        assert!(body.contains("site11.com"));
        assert!(body.contains("site20.com"));
        assert!(!body.contains("other11.com"));
    }

    #[tokio::test]
    async fn dashboard_tolerates_repeated_parameters() {
        let app = setup(&numbered_csv(3)).await;
        let cookie = app.session_cookie();

        let response = app
            .router()
            .oneshot(get("/dashboard?q=site01&q=site02&page=1&page=9", Some(&cookie)))
            .await
            .expect("handler should respond");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("site01.com"));
        assert!(!body.contains("site02.com"));
        assert!(body.contains("Page 1 of 1"));
    }

    #[tokio::test]
    async fn api_rejects_repeated_parameters_as_problem() {
        let app = setup(&numbered_csv(3)).await;
        let cookie = app.session_cookie();

        let response = app
            .router()
            .oneshot(get("/api/domains?sort=dr&sort=da", Some(&cookie)))
            .await
            .expect("handler should respond");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/problem+json"
        );
        let value: serde_json::Value =
            serde_json::from_str(&body_text(response).await).expect("json");
        assert_eq!(value["type"], "duplicate_parameter");
    }
}
