use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::aggregate::resolve_range;
use crate::config::Config;
use crate::report::{
    all_presets, catalog, day_report, run_query, DayReport, MetricDef, Preset, Query, QueryReport,
};
use crate::snapshot::{SnapshotStore, SourceStore};
use crate::source::conversion::{apply_conversion, category_balance, ConversionDirection};
use crate::source::{LogEntry, LogKind, RawSource, SideLogs};
use crate::types::Route;

#[derive(Clone)]
struct ApiState {
    config: Config,
    db_path: PathBuf,
}

#[derive(Debug, Serialize)]
struct ApiResponse<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    ok: bool,
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn internal(error: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ApiErrorBody {
            ok: false,
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct MetricsResponse {
    metrics: Vec<MetricDef>,
}

#[derive(Debug, Serialize)]
struct PresetsResponse {
    presets: Vec<Preset>,
}

#[derive(Debug, Deserialize)]
struct LogRequest {
    kind: LogKind,
    route: Route,
    quantity: u32,
    #[serde(default)]
    reason: String,
}

#[derive(Debug, Deserialize)]
struct ConversionRequest {
    direction: ConversionDirection,
    quantity: u32,
}

pub async fn run_server(config: Config, bind: SocketAddr) -> Result<()> {
    let state = ApiState {
        db_path: config.resolved_db_path(),
        config,
    };

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("REST API listening on http://{bind}");
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/v1/days/:date", get(get_day).put(put_day))
        .route("/v1/days/:date/logs", post(post_log))
        .route("/v1/days/:date/conversions", post(post_conversion))
        .route("/v1/query", post(query))
        .route("/v1/metrics", get(metrics))
        .route("/v1/presets", get(presets))
        .route("/v1/config", get(show_config))
        .layer(cors)
        .with_state(state)
}

async fn health() -> Json<ApiResponse<HealthResponse>> {
    ok(HealthResponse { status: "ok" })
}

async fn show_config(State(state): State<ApiState>) -> Json<ApiResponse<Config>> {
    ok(state.config)
}

async fn metrics() -> Json<ApiResponse<MetricsResponse>> {
    ok(MetricsResponse { metrics: catalog() })
}

async fn presets(State(state): State<ApiState>) -> Json<ApiResponse<PresetsResponse>> {
    ok(PresetsResponse {
        presets: all_presets(&state.config.presets),
    })
}

async fn get_day(
    State(state): State<ApiState>,
    Path(date): Path<String>,
) -> ApiResult<DayReport> {
    let date = parse_date(&date)?;
    let store = open_store(&state)?;
    let raw = store
        .load(date)
        .map_err(ApiError::internal)?
        .ok_or_else(|| ApiError::not_found(format!("no entries recorded for {date}")))?;
    Ok(ok(report_with_warnings(date, raw, &state.config)))
}

async fn put_day(
    State(state): State<ApiState>,
    Path(date): Path<String>,
    Json(raw): Json<RawSource>,
) -> ApiResult<DayReport> {
    let date = parse_date(&date)?;
    let store = open_store(&state)?;
    let raw = replace_entries(&store, date, raw)?;
    Ok(ok(report_with_warnings(date, raw, &state.config)))
}

async fn post_log(
    State(state): State<ApiState>,
    Path(date): Path<String>,
    Json(request): Json<LogRequest>,
) -> ApiResult<DayReport> {
    let date = parse_date(&date)?;
    let store = open_store(&state)?;
    let raw = append_log(&store, date, request)?;
    Ok(ok(report_with_warnings(date, raw, &state.config)))
}

async fn post_conversion(
    State(state): State<ApiState>,
    Path(date): Path<String>,
    Json(request): Json<ConversionRequest>,
) -> ApiResult<DayReport> {
    let date = parse_date(&date)?;
    let store = open_store(&state)?;
    let raw = record_conversion(&store, date, request)?;
    Ok(ok(report_with_warnings(date, raw, &state.config)))
}

/// Replaces the stage entries and counters. Stored side logs are kept: a
/// body may omit them or echo them back unchanged, anything else is refused.
fn replace_entries<S: SourceStore>(
    store: &S,
    date: NaiveDate,
    mut incoming: RawSource,
) -> std::result::Result<RawSource, ApiError> {
    let stored = store
        .load(date)
        .map_err(ApiError::internal)?
        .unwrap_or_default();
    if incoming.logs != SideLogs::default() && incoming.logs != stored.logs {
        return Err(ApiError::bad_request(format!(
            "side logs are append-only; POST new entries to /v1/days/{date}/logs"
        )));
    }
    incoming.logs = stored.logs;

    let balance = category_balance(&incoming);
    for (category, value) in [("general", balance.general), ("standalone", balance.standalone)] {
        if value < 0 {
            return Err(ApiError::bad_request(format!(
                "{category} fresh-bag balance would drop to {value}"
            )));
        }
    }
    store.save(date, &incoming).map_err(ApiError::internal)?;
    Ok(incoming)
}

fn append_log<S: SourceStore>(
    store: &S,
    date: NaiveDate,
    request: LogRequest,
) -> std::result::Result<RawSource, ApiError> {
    if request.quantity == 0 {
        return Err(ApiError::bad_request("log quantity must be positive"));
    }
    let entry = LogEntry::new(request.route, request.reason, request.quantity);
    store
        .append_log(date, request.kind, entry)
        .map_err(ApiError::internal)
}

fn record_conversion<S: SourceStore>(
    store: &S,
    date: NaiveDate,
    request: ConversionRequest,
) -> std::result::Result<RawSource, ApiError> {
    let mut raw = store
        .load(date)
        .map_err(ApiError::internal)?
        .unwrap_or_default();
    apply_conversion(&mut raw, request.direction, request.quantity)
        .map_err(|err| ApiError::bad_request(err.to_string()))?;
    store.save(date, &raw).map_err(ApiError::internal)?;
    Ok(raw)
}

async fn query(
    State(state): State<ApiState>,
    Json(request): Json<Query>,
) -> ApiResult<QueryReport> {
    let store = open_store(&state)?;
    let today = Local::now().date_naive();
    let range = resolve_range(&request.period, today, &state.config.settlement);
    let days = store
        .load_range(range.start, range.end)
        .map_err(ApiError::internal)?;
    Ok(ok(run_query(&request, &days, today, &state.config)))
}

fn report_with_warnings(date: NaiveDate, raw: RawSource, config: &Config) -> DayReport {
    let report = day_report(date, raw, config);
    for anomaly in &report.anomalies {
        warn!(%date, "{anomaly}");
    }
    if let Some(mismatch) = &report.partition_mismatch {
        warn!(%date, "{mismatch}");
    }
    report
}

fn parse_date(value: &str) -> std::result::Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ApiError::bad_request(format!("invalid date (expected YYYY-MM-DD): {value}")))
}

fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse { ok: true, data })
}

fn open_store(state: &ApiState) -> std::result::Result<SnapshotStore, ApiError> {
    SnapshotStore::open(&state.db_path).map_err(ApiError::internal)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use chrono::NaiveDate;

    use super::{
        append_log, parse_date, record_conversion, replace_entries, ConversionRequest, LogRequest,
    };
    use crate::snapshot::{SnapshotStore, SourceStore};
    use crate::source::conversion::ConversionDirection;
    use crate::source::{LogEntry, LogKind, RawSource};
    use crate::types::Route;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 13).unwrap()
    }

    fn allocated(general: u32, standalone: u32) -> RawSource {
        let mut raw = RawSource::default();
        raw.a.fb_gen = Some(general);
        raw.a.fb_solo = Some(standalone);
        raw
    }

    fn log(quantity: u32) -> LogRequest {
        LogRequest {
            kind: LogKind::ReturnNotCollected,
            route: Route::R206A,
            quantity,
            reason: "absent".to_string(),
        }
    }

    #[test]
    fn parses_iso_dates_only() {
        assert!(parse_date("2024-05-02").is_ok());
        let err = parse_date("05/02/2024").unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn replacing_entries_keeps_stored_logs() {
        let store = SnapshotStore::open_in_memory().unwrap();
        append_log(&store, day(), log(4)).unwrap();

        let mut body = allocated(20, 90);
        body.a.gift_r1_total = Some(230);
        let saved = replace_entries(&store, day(), body).unwrap();
        assert_eq!(saved.logs.returns_not_collected(), 4);

        let stored = store.load(day()).unwrap().unwrap();
        assert_eq!(stored.a.gift_r1_total, Some(230));
        assert_eq!(stored.logs.returns_not_collected(), 4);

        // Echoing the stored logs back is accepted.
        assert!(replace_entries(&store, day(), stored).is_ok());
    }

    #[test]
    fn replacing_entries_refuses_rewritten_logs() {
        let store = SnapshotStore::open_in_memory().unwrap();
        append_log(&store, day(), log(4)).unwrap();

        let mut body = store.load(day()).unwrap().unwrap();
        body.logs.return_not_collected.clear();
        body.logs.numbered.push(LogEntry::new(Route::R203D, "", 1));
        let err = replace_entries(&store, day(), body).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(store.load(day()).unwrap().unwrap().logs.returns_not_collected(), 4);
    }

    #[test]
    fn replacing_entries_refuses_negative_category_balance() {
        let store = SnapshotStore::open_in_memory().unwrap();
        let mut body = allocated(2, 10);
        body.d.fb_gen_to_solo = Some(3);
        let err = replace_entries(&store, day(), body).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(store.load(day()).unwrap().is_none());
    }

    #[test]
    fn conversions_go_through_the_balance_guard() {
        let store = SnapshotStore::open_in_memory().unwrap();
        store.save(day(), &allocated(20, 90)).unwrap();

        let raw = record_conversion(
            &store,
            day(),
            ConversionRequest {
                direction: ConversionDirection::StandaloneToGeneral,
                quantity: 5,
            },
        )
        .unwrap();
        assert_eq!(raw.d.fb_solo_to_gen, Some(5));

        let err = record_conversion(
            &store,
            day(),
            ConversionRequest {
                direction: ConversionDirection::GeneralToStandalone,
                quantity: 26,
            },
        )
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(store.load(day()).unwrap().unwrap().d.fb_gen_to_solo, None);
    }

    #[test]
    fn logs_append_and_reject_zero_quantity() {
        let store = SnapshotStore::open_in_memory().unwrap();
        append_log(&store, day(), log(2)).unwrap();
        let raw = append_log(&store, day(), log(3)).unwrap();
        assert_eq!(raw.logs.returns_not_collected(), 5);
        assert_eq!(append_log(&store, day(), log(0)).unwrap_err().status, StatusCode::BAD_REQUEST);
    }
}
