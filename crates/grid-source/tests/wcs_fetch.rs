//! WcsGridSource against a local fake GeoServer.

mod common;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use chrono::NaiveDate;
use grid_source::{GridDataSource, GridSourceConfig, GridSourceError, LayerRef, WcsGridSource};

#[derive(Clone)]
struct FakeServer {
    /// Dates (YYYY-MM-DD) that have a coverage.
    available: Arc<Vec<String>>,
    require_auth: bool,
    requests: Arc<AtomicUsize>,
    /// Time spent on each request before answering.
    latency: Duration,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

async fn ows(
    State(server): State<FakeServer>,
    Path(workspace): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    server.requests.fetch_add(1, Ordering::SeqCst);
    let now = server.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    server.peak_in_flight.fetch_max(now, Ordering::SeqCst);
    if !server.latency.is_zero() {
        tokio::time::sleep(server.latency).await;
    }

    let response = respond(&server, &workspace, &params, &headers);
    server.in_flight.fetch_sub(1, Ordering::SeqCst);
    response
}

fn respond(
    server: &FakeServer,
    workspace: &str,
    params: &HashMap<String, String>,
    headers: &HeaderMap,
) -> Response {

    if server.require_auth && !headers.contains_key(header::AUTHORIZATION) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if workspace != "climate_historical_daily"
        || params.get("service").map(String::as_str) != Some("WCS")
        || params.get("version").map(String::as_str) != Some("2.0.1")
        || params.get("coverageId").map(String::as_str) != Some("climate_historical_daily_co_prec")
    {
        return StatusCode::BAD_REQUEST.into_response();
    }

    // subset=Time("2001-01-02T00:00:00.000Z")
    let date = params
        .get("subset")
        .and_then(|s| s.strip_prefix("Time(\""))
        .and_then(|s| s.get(..10))
        .unwrap_or_default()
        .to_string();
    if !server.available.contains(&date) {
        return StatusCode::NOT_FOUND.into_response();
    }

    let day: f32 = date[8..10].parse().unwrap_or(0.0);
    let body = common::encode_geotiff(2, 1, &[day, day * 10.0], (-75.0, 5.0), 0.5, None);
    ([(header::CONTENT_TYPE, "image/geotiff")], body).into_response()
}

async fn spawn(server: FakeServer) -> SocketAddr {
    let app = Router::new()
        .route("/geoserver/:workspace/ows", get(ows))
        .with_state(server);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn source(addr: SocketAddr, credentials: bool) -> WcsGridSource {
    let mut config = GridSourceConfig::default();
    config.base_url = format!("http://{}/geoserver/rest", addr);
    config.max_parallel_downloads = 8;
    config.max_retries = 0;
    if credentials {
        config.user = Some("admin".to_string());
        config.password = Some("geoserver".to_string());
    }
    WcsGridSource::new(config).unwrap()
}

fn layer() -> LayerRef {
    LayerRef::for_country("climate_historical_daily", "CO", climate_common::InputVariable::Precipitation)
}

fn server(dates: &[&str], require_auth: bool) -> FakeServer {
    FakeServer {
        available: Arc::new(dates.iter().map(|d| d.to_string()).collect()),
        require_auth,
        requests: Arc::new(AtomicUsize::new(0)),
        latency: Duration::ZERO,
        in_flight: Arc::new(AtomicUsize::new(0)),
        peak_in_flight: Arc::new(AtomicUsize::new(0)),
    }
}

#[tokio::test]
async fn test_fetch_day_found_and_missing() {
    let addr = spawn(server(&["2001-01-02"], false)).await;
    let source = source(addr, false);

    let date = NaiveDate::from_ymd_opt(2001, 1, 2).unwrap();
    let grid = source.fetch_day(&layer(), date).await.unwrap().unwrap();
    assert_eq!(grid.date, date);
    assert_eq!(grid.data, vec![2.0, 20.0]);
    assert_eq!(grid.geometry.width, 2);

    let missing = NaiveDate::from_ymd_opt(2001, 1, 3).unwrap();
    assert!(source.fetch_day(&layer(), missing).await.unwrap().is_none());
}

#[tokio::test]
async fn test_fetch_year_assembles_available_days() {
    let fake = server(&["2001-03-01", "2001-01-15", "2001-12-31"], false);
    let requests = fake.requests.clone();
    let addr = spawn(fake).await;

    let cube = source(addr, false)
        .fetch_year(&layer(), 2001)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(requests.load(Ordering::SeqCst), 365);
    assert_eq!(
        cube.times(),
        &[
            NaiveDate::from_ymd_opt(2001, 1, 15).unwrap(),
            NaiveDate::from_ymd_opt(2001, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2001, 12, 31).unwrap(),
        ]
    );
    assert_eq!(cube.slice(0), &[15.0, 150.0]);
}

#[tokio::test]
async fn test_fetch_year_without_data_is_none() {
    let addr = spawn(server(&[], false)).await;
    assert!(source(addr, false)
        .fetch_year(&layer(), 1999)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_basic_auth() {
    let addr = spawn(server(&["2001-01-02"], true)).await;
    let date = NaiveDate::from_ymd_opt(2001, 1, 2).unwrap();

    let err = source(addr, false).fetch_day(&layer(), date).await.unwrap_err();
    assert!(matches!(err, GridSourceError::Status { status: 401, .. }));

    let grid = source(addr, true).fetch_day(&layer(), date).await.unwrap();
    assert!(grid.is_some());
}

#[tokio::test]
async fn test_download_limit_is_shared_between_callers() {
    let mut fake = server(&["2001-06-01", "2002-06-01"], false);
    fake.latency = Duration::from_millis(2);
    let peak = fake.peak_in_flight.clone();
    let requests = fake.requests.clone();
    let addr = spawn(fake).await;

    let mut config = GridSourceConfig::default();
    config.base_url = format!("http://{}/geoserver/rest", addr);
    config.max_parallel_downloads = 2;
    config.max_retries = 0;
    let source = WcsGridSource::new(config).unwrap();

    let layer = layer();
    let (first, second) = tokio::join!(
        source.fetch_year(&layer, 2001),
        source.fetch_year(&layer, 2002)
    );
    assert_eq!(first.unwrap().unwrap().times().len(), 1);
    assert_eq!(second.unwrap().unwrap().times().len(), 1);

    assert_eq!(requests.load(Ordering::SeqCst), 730);
    let peak = peak.load(Ordering::SeqCst);
    assert!((1..=2).contains(&peak), "peak in-flight requests {}", peak);
}
