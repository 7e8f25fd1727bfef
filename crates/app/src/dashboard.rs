use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use metrics::counter;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use domdash_core::table::{compute_view, ParseDirectionError, SortDirection, SortSpec, ViewState};
use domdash_core::types::{Field, ParseFieldError};

use crate::problem::ProblemResponse;
use crate::render;
use crate::router::AppState;

const DASHBOARD_PATH: &str = "/dashboard";

/// Query string encoding of a [`ViewState`].
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct DashboardQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
}

#[derive(Debug, Error)]
pub enum InvalidQuery {
    #[error(transparent)]
    Field(#[from] ParseFieldError),
    #[error(transparent)]
    Direction(#[from] ParseDirectionError),
    #[error("page must be a positive integer (got {0})")]
    Page(String),
    #[error("query parameter {0} given more than once")]
    Duplicate(String),
}

impl InvalidQuery {
    fn problem_type(&self) -> &'static str {
        match self {
            Self::Field(_) => "invalid_sort",
            Self::Direction(_) => "invalid_direction",
            Self::Page(_) => "invalid_page",
            Self::Duplicate(_) => "duplicate_parameter",
        }
    }
}

impl DashboardQuery {
    /// Collects the recognised keys from raw query pairs; the first value of
    /// a key wins. Also returns the first key that was repeated, if any.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> (Self, Option<String>) {
        let mut query = Self::default();
        let mut repeated = None;
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "q" => &mut query.q,
                "sort" => &mut query.sort,
                "dir" => &mut query.dir,
                "page" => &mut query.page,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            } else if repeated.is_none() {
                repeated = Some(key);
            }
        }
        (query, repeated)
    }

    pub fn from_view_state(state: &ViewState) -> Self {
        Self {
            q: Some(state.filter_text.clone()).filter(|text| !text.is_empty()),
            sort: state.sort.map(|sort| sort.field.key().to_string()),
            dir: state.sort.map(|sort| sort.direction.as_str().to_string()),
            page: (state.page > 1).then(|| state.page.to_string()),
        }
    }

    /// Strict conversion used by the JSON API.
    pub fn to_view_state(&self) -> Result<ViewState, InvalidQuery> {
        Ok(ViewState {
            filter_text: self.q.clone().unwrap_or_default(),
            sort: self.sort_spec()?,
            page: self.page_number()?,
        })
    }

    /// Conversion used by the HTML dashboard: invalid parts fall back to defaults.
    pub fn to_view_state_lenient(&self) -> ViewState {
        let sort = self.sort_spec().unwrap_or_else(|err| {
            warn!(stage = "dashboard", error = %err, "ignoring sort parameters");
            None
        });
        let page = self.page_number().unwrap_or_else(|err| {
            warn!(stage = "dashboard", error = %err, "ignoring page parameter");
            1
        });
        ViewState {
            filter_text: self.q.clone().unwrap_or_default(),
            sort,
            page,
        }
    }

    fn sort_spec(&self) -> Result<Option<SortSpec>, InvalidQuery> {
        let Some(key) = non_empty(&self.sort) else {
            return Ok(None);
        };
        let field = key.parse::<Field>()?;
        let direction = match non_empty(&self.dir) {
            Some(raw) => raw.parse::<SortDirection>()?,
            None => SortDirection::Ascending,
        };
        Ok(Some(SortSpec { field, direction }))
    }

    fn page_number(&self) -> Result<usize, InvalidQuery> {
        match non_empty(&self.page) {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|_| InvalidQuery::Page(raw.to_string())),
            None => Ok(1),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|raw| !raw.is_empty())
}

/// Link target that reproduces `state` on the dashboard route.
pub fn dashboard_href(state: &ViewState) -> String {
    let query = serde_urlencoded::to_string(DashboardQuery::from_view_state(state))
        .unwrap_or_default();
    if query.is_empty() {
        DASHBOARD_PATH.to_string()
    } else {
        format!("{DASHBOARD_PATH}?{query}")
    }
}

pub async fn page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    let Some(session) = state.sessions().from_headers(&headers, state.now()) else {
        return Redirect::to("/").into_response();
    };

    let (query, repeated) = DashboardQuery::from_pairs(pairs);
    if let Some(key) = repeated {
        warn!(stage = "dashboard", key = %key, "ignoring repeated query parameter");
    }
    let view_state = query.to_view_state_lenient();
    let view = compute_view(state.records(), &view_state);
    counter!("dashboard_requests_total", "format" => "html").increment(1);
    debug!(
        stage = "dashboard",
        user = %session.username,
        session_expires_at = %session.expires_at,
        rows = view.pagination.total_rows,
        page = view.pagination.current_page,
        "rendered dashboard"
    );

    Html(render::dashboard_page(&view, &session.username)).into_response()
}

pub async fn api(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, ProblemResponse> {
    if state.sessions().from_headers(&headers, state.now()).is_none() {
        return Err(ProblemResponse::unauthorized());
    }

    let invalid =
        |err: InvalidQuery| ProblemResponse::bad_request(err.problem_type(), err.to_string());
    let (query, repeated) = DashboardQuery::from_pairs(pairs);
    if let Some(key) = repeated {
        return Err(invalid(InvalidQuery::Duplicate(key)));
    }
    let view_state = query.to_view_state().map_err(invalid)?;
    let view = compute_view(state.records(), &view_state);
    counter!("dashboard_requests_total", "format" => "json").increment(1);

    Ok(Json(view).into_response())
}
