use axum::http::StatusCode;
use axum::{Json, Router, routing::post};
use log::info;
use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::data::{SchoolConfig, SearchReport, TimetableSkeleton};
use crate::error::ConfigError;
use crate::generator::Strategy;
use crate::registry::ConstraintRegistry;
use crate::rules::Rule;
use crate::search::{self, SearchLimits, SearchOptions};
use crate::synthesis::{Presynthesized, bind_constraints};

pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Listen address, taken from `TIMETABLE_ADDR` when set.
pub fn bind_addr() -> String {
    std::env::var("TIMETABLE_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string())
}

/// A constraint text together with the rule synthesized for it.
#[derive(Debug, Clone, Deserialize)]
pub struct ConstraintInput {
    pub description: String,
    pub rule: Rule,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestOptions {
    pub strategy: Strategy,
    pub max_candidates: Option<u64>,
    pub timeout_ms: Option<u64>,
    pub max_results: Option<usize>,
    pub parallel: bool,
}

impl From<RequestOptions> for SearchOptions {
    fn from(o: RequestOptions) -> Self {
        SearchOptions {
            strategy: o.strategy,
            limits: SearchLimits {
                max_candidates: o.max_candidates,
                timeout: o.timeout_ms.map(Duration::from_millis),
                max_results: o.max_results,
            },
            cancel: None,
            parallel: o.parallel,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub config: SchoolConfig,
    #[serde(default)]
    pub constraints: Vec<ConstraintInput>,
    #[serde(default)]
    pub options: RequestOptions,
}

/// Raises the search's cancel flag once the request future is dropped.
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

fn run_search(
    request: SearchRequest,
    cancel: Arc<AtomicBool>,
) -> Result<SearchReport, ConfigError> {
    let SearchRequest {
        config,
        constraints,
        options,
    } = request;
    config.validate()?;
    let options = SearchOptions::from(options);
    // a disconnect flag is no bound on an independent-day search
    if options.strategy == Strategy::IndependentDays && options.limits.is_unbounded() {
        return Err(ConfigError::UnboundedSearch);
    }

    let (descriptions, rules): (Vec<String>, Vec<Rule>) = constraints
        .into_iter()
        .map(|c| (c.description, c.rule))
        .unzip();
    let predicates = bind_constraints(&config, &descriptions, &Presynthesized::new(rules))?;
    let mut registry = ConstraintRegistry::with_builtins(&config);
    registry.bind_external(&descriptions, predicates)?;

    search::search(&config, &registry, &options.with_cancel(cancel))
}

async fn search_handler(
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchReport>, (StatusCode, String)> {
    let cancel = Arc::new(AtomicBool::new(false));
    let _guard = CancelOnDrop(Arc::clone(&cancel));
    let outcome = tokio::task::spawn_blocking(move || run_search(request, cancel))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    match outcome {
        Ok(report) => Ok(Json(report)),
        Err(e) => Err((StatusCode::BAD_REQUEST, e.to_string())),
    }
}

async fn skeleton_handler(
    Json(config): Json<SchoolConfig>,
) -> Result<Json<TimetableSkeleton>, (StatusCode, String)> {
    config
        .validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    Ok(Json(TimetableSkeleton::empty(config.periods_per_day)))
}

pub fn router() -> Router {
    Router::new()
        .route("/v1/timetable/search", post(search_handler))
        .route("/v1/timetable/skeleton", post(skeleton_handler))
}

pub async fn run_server(addr: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server running at http://{}", listener.local_addr()?);
    axum::serve(listener, router()).await
}
