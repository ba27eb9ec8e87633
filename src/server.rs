//! HTTP surface: stat and rate endpoints plus healthcheck.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::DateTime;
use common::{Dataset, Error, Point, Timeframe};
use serde::Deserialize;
use statcache::StatCache;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::error;

pub fn app_router(cache: Arc<StatCache>) -> Router {
    Router::new()
        .route("/v1/stats/{stat}", get(stat_handler))
        .route("/v1/rates/{stata}/{statb}", get(rate_handler))
        .with_state(cache)
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, max-age=0, must-revalidate"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::PRAGMA,
            HeaderValue::from_static("no-cache"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::EXPIRES,
            HeaderValue::from_static("0"),
        ))
        // The healthcheck stays outside the no-cache layers.
        .route("/healthcheck", get(healthcheck))
}

async fn healthcheck() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct StatsQuery {
    t: Option<String>,
    start: Option<String>,
    format: Option<String>,
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(err: Error) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: err.to_string(),
        }
    }

    fn internal() -> Self {
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "internal server error".into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

fn fetch_error(err: Error, missing: &str) -> ApiError {
    match err {
        Error::NotFound(_) => ApiError {
            status: StatusCode::NOT_FOUND,
            message: format!("stat not found: {missing}"),
        },
        other => {
            error!("upstream fetch failed: {}", other);
            ApiError::internal()
        }
    }
}

fn timeframe_from_query(query: &StatsQuery) -> Result<Timeframe, ApiError> {
    let mut tf = match query.t.as_deref() {
        Some(raw) => raw.parse::<Timeframe>().map_err(ApiError::bad_request)?,
        None => Timeframe::default(),
    };

    if let Some(raw) = query.start.as_deref() {
        let secs = raw.trim().parse::<i64>().map_err(|_| {
            ApiError::bad_request(Error::Parse(format!("invalid start timestamp: {raw:?}")))
        })?;
        let start = DateTime::from_timestamp(secs, 0).ok_or_else(|| {
            ApiError::bad_request(Error::Parse(format!("start timestamp out of range: {secs}")))
        })?;
        tf.start = Some(start);
    }

    Ok(tf)
}

async fn stat_handler(
    State(cache): State<Arc<StatCache>>,
    Path(stat): Path<String>,
    Query(query): Query<StatsQuery>,
) -> Result<Response, ApiError> {
    let tf = timeframe_from_query(&query)?;
    let data = cache
        .get(&stat, &tf)
        .await
        .map_err(|e| fetch_error(e, &stat))?;
    render(&data, query.format.as_deref())
}

async fn rate_handler(
    State(cache): State<Arc<StatCache>>,
    Path((stata, statb)): Path<(String, String)>,
    Query(query): Query<StatsQuery>,
) -> Result<Response, ApiError> {
    let tf = timeframe_from_query(&query)?;
    let data = cache
        .get_rate(&stata, &statb, &tf)
        .await
        .map_err(|e| fetch_error(e, &format!("{stata} or {statb}")))?;
    render(&data, query.format.as_deref())
}

fn render(data: &Dataset, format: Option<&str>) -> Result<Response, ApiError> {
    match format {
        Some("csv") => Ok((
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            csv_body(&data.points)?,
        )
            .into_response()),
        Some("json") => Ok(Json(&data.points).into_response()),
        _ => Ok(data.to_string().into_response()),
    }
}

/// One row per point: value to six decimal places, then the timestamp.
fn csv_body(points: &[Point]) -> Result<String, ApiError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    for p in points {
        writer
            .write_record([format!("{:.6}", p.value), p.time.to_string()])
            .map_err(|e| {
                error!("csv rendering failed: {}", e);
                ApiError::internal()
            })?;
    }

    let buf = writer.into_inner().map_err(|e| {
        error!("csv rendering failed: {}", e);
        ApiError::internal()
    })?;

    String::from_utf8(buf).map_err(|e| {
        error!("csv rendering produced invalid utf-8: {}", e);
        ApiError::internal()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use common::config::CacheConfig;
    use statcache::StatFetcher;
    use tower::ServiceExt;

    struct StubFetcher;

    #[async_trait]
    impl StatFetcher for StubFetcher {
        async fn fetch(&self, name: &str, tf: &Timeframe) -> Result<Dataset, Error> {
            match name {
                "missing.stat" => Err(Error::NotFound(name.to_string())),
                "broken.stat" => Err(Error::Http("connection reset".into())),
                _ => Ok(Dataset {
                    name: name.to_string(),
                    timeframe: tf.clone(),
                    points: (0..60)
                        .map(|i| Point {
                            time: 1700000000 + i * 60,
                            value: 0.5,
                        })
                        .collect(),
                }),
            }
        }
    }

    fn test_app() -> Router {
        let cache = Arc::new(StatCache::new(Arc::new(StubFetcher), &CacheConfig::default()));
        app_router(cache)
    }

    async fn get_response(uri: &str) -> Response {
        test_app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_string(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn csv_renders_one_row_per_point_with_six_decimals() {
        let resp = get_response("/v1/stats/api.requests?t=1h1m&format=csv").await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = body_string(resp).await;
        let rows: Vec<&str> = body.lines().collect();
        assert_eq!(rows.len(), 60);
        assert_eq!(rows[0], "0.500000,1700000000");
        assert_eq!(rows[59], "0.500000,1700003540");
    }

    #[tokio::test]
    async fn json_renders_points_with_time_and_value_fields() {
        let resp = get_response("/v1/stats/api.requests?format=json").await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = body_string(resp).await;
        let points: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(points.as_array().unwrap().len(), 60);
        assert_eq!(points[0]["time"], 1700000000);
        assert_eq!(points[0]["value"], 0.5);
    }

    #[tokio::test]
    async fn default_format_is_readable_text() {
        let resp = get_response("/v1/stats/api.requests").await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = body_string(resp).await;
        assert!(body.starts_with("api.requests (1h@1m)"));
    }

    #[tokio::test]
    async fn missing_stat_is_404_naming_the_stat() {
        let resp = get_response("/v1/stats/missing.stat").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(resp).await, "stat not found: missing.stat");
    }

    #[tokio::test]
    async fn missing_rate_operand_is_404_naming_both() {
        let resp = get_response("/v1/rates/missing.stat/api.requests").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_string(resp).await,
            "stat not found: missing.stat or api.requests"
        );
    }

    #[tokio::test]
    async fn upstream_failure_is_500_without_detail() {
        let resp = get_response("/v1/stats/broken.stat").await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_string(resp).await, "internal server error");
    }

    #[tokio::test]
    async fn malformed_timeframe_is_400_with_parse_error() {
        let resp = get_response("/v1/stats/api.requests?t=bogus").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(resp).await.contains("invalid timeframe"));
    }

    #[tokio::test]
    async fn malformed_start_is_400_with_parse_error() {
        let resp = get_response("/v1/stats/api.requests?start=soon").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(resp).await.contains("invalid start timestamp"));
    }

    #[tokio::test]
    async fn rate_endpoint_returns_rates_in_csv() {
        let resp = get_response("/v1/rates/signup.start/signup.done?format=csv").await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = body_string(resp).await;
        // Identical stub series: every rate is exactly 1.
        assert_eq!(body.lines().count(), 60);
        assert!(body.lines().all(|row| row.starts_with("1.000000,")));
    }

    #[tokio::test]
    async fn responses_carry_no_cache_headers() {
        let resp = get_response("/v1/stats/api.requests").await;
        assert_eq!(
            resp.headers().get(header::CACHE_CONTROL).unwrap(),
            "no-cache, no-store, max-age=0, must-revalidate"
        );
        assert_eq!(resp.headers().get(header::PRAGMA).unwrap(), "no-cache");
        assert_eq!(resp.headers().get(header::EXPIRES).unwrap(), "0");
    }

    #[tokio::test]
    async fn healthcheck_responds_ok() {
        let resp = get_response("/healthcheck").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, "ok");
    }
}
