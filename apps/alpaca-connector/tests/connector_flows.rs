//! Connector Integration Tests
//!
//! Drives the Alpaca-backed connector against a mock REST server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use alpaca_connector::{
    AlpacaConfig, AlpacaConnector, BarsRequest, ProviderError, Timeframe, TradableCriteria,
    connect,
};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn connector(server: &MockServer) -> AlpacaConnector {
    let config = AlpacaConfig::new("key", "secret", server.uri())
        .unwrap()
        .with_data_url(server.uri())
        .unwrap();
    connect(&config).unwrap()
}

fn bar(t: &str, close: f64, volume: u64) -> Value {
    json!({"t": t, "o": close, "h": close, "l": close, "c": close, "v": volume})
}

fn bars_body(symbol: &str, rows: Vec<Value>) -> Value {
    json!({"bars": {symbol: rows}, "next_page_token": null})
}

fn asset(symbol: &str, tradable: bool) -> Value {
    json!({
        "id": format!("id-{symbol}"),
        "class": "us_equity",
        "exchange": "NYSE",
        "symbol": symbol,
        "name": symbol,
        "status": "active",
        "tradable": tradable
    })
}

#[tokio::test]
async fn tradable_symbols_exclude_class_shares() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/assets"))
        .and(query_param("status", "active"))
        .and(query_param("asset_class", "us_equity"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([asset("AAPL", true), asset("BRK.B", true)])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/stocks/bars"))
        .and(query_param("symbols", "AAPL"))
        .and(query_param("limit", "5"))
        .and(query_param("sort", "desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bars_body(
            "AAPL",
            vec![
                bar("2024-01-02T15:30:00Z", 185.0, 900_000),
                bar("2024-01-02T15:31:00Z", 186.0, 1_100_000),
            ],
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/stocks/bars"))
        .and(query_param("symbols", "BRK.B"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bars_body("BRK.B", vec![])))
        .expect(0)
        .mount(&server)
        .await;

    let symbols = connector(&server)
        .get_tradable_symbols(&TradableCriteria::default())
        .await
        .unwrap();

    assert_eq!(symbols, ["AAPL"]);
}

#[tokio::test]
async fn ten_day_backfill_makes_two_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/stocks/bars"))
        .and(query_param("start", "2024-01-01T00:00:00Z"))
        .and(query_param("end", "2024-01-08T23:59:59Z"))
        .and(query_param("limit", "1000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bars_body(
            "AAPL",
            vec![bar("2024-01-02T15:30:00Z", 185.0, 100)],
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/stocks/bars"))
        .and(query_param("start", "2024-01-09T00:00:00Z"))
        .and(query_param("end", "2024-01-10T23:59:59Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bars_body(
            "AAPL",
            vec![bar("2024-01-09T15:30:00Z", 190.0, 100)],
        )))
        .expect(1)
        .mount(&server)
        .await;

    let bars = connector(&server)
        .backfill(
            &["AAPL".to_string()],
            Timeframe::MINUTE,
            Some("2024-01-01".into()),
            Some("2024-01-10".into()),
            None,
        )
        .await
        .unwrap();

    let closes: Vec<_> = bars.rows().iter().map(|b| b.close).collect();
    assert_eq!(closes, [Decimal::new(185, 0), Decimal::new(190, 0)]);
    assert!(bars.rows().iter().all(|b| b.source == "alpaca"));
}

#[tokio::test]
async fn rows_missing_close_yield_empty_table() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/stocks/bars"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bars_body(
            "AAPL",
            vec![json!({"t": "2024-01-02T15:30:00Z", "o": 1.0, "h": 1.0, "l": 1.0, "v": 10})],
        )))
        .mount(&server)
        .await;

    let bars = connector(&server)
        .fetch_bars(&BarsRequest::new(["AAPL"]))
        .await
        .unwrap();

    assert!(bars.is_empty());
}

#[tokio::test]
async fn backfill_failure_aborts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/stocks/bars"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let result = connector(&server)
        .backfill(
            &["AAPL".to_string()],
            Timeframe::DAY,
            Some("2024-01-01".into()),
            Some("2024-01-31".into()),
            None,
        )
        .await;

    assert_eq!(result, Err(ProviderError::AuthenticationFailed));
}

#[tokio::test]
async fn market_status_uses_clock() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/clock"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "timestamp": "2024-01-02T15:30:00-05:00",
            "is_open": true,
            "next_open": "2024-01-03T09:30:00-05:00",
            "next_close": "2024-01-02T16:00:00-05:00"
        })))
        .mount(&server)
        .await;

    assert_eq!(connector(&server).check_market_status().await, Ok(true));
}
