//! Yahoo Finance client and constituents download against a mock HTTP server

use assert_matches::assert_matches;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::logging;
use stock_trends::api::{fetch_constituents, MarketDataProvider, YahooClient};
use stock_trends::error::AnalysisError;
use stock_trends::models::{Config, DateRange};

const CHART_BODY: &str = r#"{
    "chart": {
        "result": [{
            "meta": {"symbol": "INFY.NS", "currency": "INR", "gmtoffset": 19800},
            "timestamp": [1704166500, 1704252900],
            "indicators": {
                "quote": [{
                    "open": [1500.0, 1510.0],
                    "high": [1520.0, 1530.0],
                    "low": [1490.0, 1505.0],
                    "close": [1510.0, 1525.0],
                    "volume": [5000000, 4200000]
                }],
                "adjclose": [{"adjclose": [1480.2, 1494.9]}]
            }
        }],
        "error": null
    }
}"#;

fn test_config(server: &MockServer) -> Config {
    Config {
        chart_base_url: server.uri(),
        quote_base_url: server.uri(),
        cookie_url: format!("{}/consent", server.uri()),
        universe_url: format!("{}/content/indices/ind_nifty50list.csv", server.uri()),
        rate_limit_per_minute: 0,
        request_timeout_secs: 5,
        ..Config::default()
    }
}

fn january() -> DateRange {
    DateRange::new(
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
    )
}

#[tokio::test]
async fn test_price_history_request_and_parsing() {
    logging::init_test_logging();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/INFY.NS"))
        .and(query_param("interval", "1d"))
        .and(query_param("period1", "1704067200"))
        .and(query_param("period2", "1704412800"))
        .and(query_param("includeAdjustedClose", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CHART_BODY))
        .expect(1)
        .mount(&server)
        .await;

    let client = YahooClient::new(&test_config(&server)).unwrap();
    let series = client.get_price_history("INFY.NS", january()).await.unwrap();

    assert_eq!(series.symbol, "INFY.NS");
    assert_eq!(series.len(), 2);
    assert_eq!(series.bars()[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    assert_eq!(series.bars()[1].date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
    assert_eq!(series.adj_closes(), vec![1480.2, 1494.9]);
    assert_eq!(series.bars()[1].volume, Some(4_200_000));
}

#[tokio::test]
async fn test_unknown_symbol_is_a_provider_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/NOPE.NS"))
        .respond_with(ResponseTemplate::new(404).set_body_string(
            r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#,
        ))
        .mount(&server)
        .await;

    let client = YahooClient::new(&test_config(&server)).unwrap();
    let err = client.get_price_history("NOPE.NS", january()).await.unwrap_err();

    assert_matches!(err, AnalysisError::ProviderFetch { ref symbol, ref reason }
        if symbol == "NOPE.NS" && reason.contains("delisted"));
}

#[tokio::test]
async fn test_malformed_body_is_a_provider_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/ODD.NS"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let client = YahooClient::new(&test_config(&server)).unwrap();
    let err = client.get_price_history("ODD.NS", january()).await.unwrap_err();

    assert_matches!(err, AnalysisError::ProviderFetch { ref reason, .. } if reason.starts_with("malformed response"));
}

/// Consent page that sets the session cookie, plus the crumb endpoint that
/// only answers when that cookie comes back
async fn mount_session(server: &MockServer, expected_crumb_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/consent"))
        .respond_with(ResponseTemplate::new(404).insert_header("set-cookie", "A3=d=abc; Path=/"))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/test/getcrumb"))
        .and(header("cookie", "A3=d=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string("crumb123"))
        .expect(expected_crumb_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_quote_metrics() {
    let server = MockServer::start().await;
    mount_session(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/v10/finance/quoteSummary/TCS.NS"))
        .and(query_param("modules", "summaryDetail,defaultKeyStatistics"))
        .and(query_param("crumb", "crumb123"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"quoteSummary":{"result":[{
                "summaryDetail":{"trailingPE":{"raw":31.7,"fmt":"31.70"}},
                "defaultKeyStatistics":{"pegRatio":{"raw":1.84,"fmt":"1.84"}}
            }],"error":null}}"#,
        ))
        .expect(2)
        .mount(&server)
        .await;

    let client = YahooClient::new(&test_config(&server)).unwrap();
    let metrics = client.get_quote_metrics("TCS.NS").await.unwrap();

    assert_eq!(metrics.symbol, "TCS.NS");
    assert_eq!(metrics.pe_ratio, Some(31.7));
    assert_eq!(metrics.peg_ratio, Some(1.84));

    // the crumb is reused, not fetched again
    let again = client.get_quote_metrics("TCS.NS").await.unwrap();
    assert_eq!(again.pe_ratio, Some(31.7));
}

#[tokio::test]
async fn test_rejected_crumb_is_a_provider_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/test/getcrumb"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v10/finance/quoteSummary/TCS.NS"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = YahooClient::new(&test_config(&server)).unwrap();
    let err = client.get_quote_metrics("TCS.NS").await.unwrap_err();

    assert_matches!(err, AnalysisError::ProviderFetch { ref symbol, ref reason }
        if symbol == "TCS.NS" && reason.contains("crumb"));
}

#[tokio::test]
async fn test_constituents_download() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/content/indices/ind_nifty50list.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "Company Name,Industry,Symbol,Series,ISIN Code\n\
             Reliance Industries Ltd.,Oil Gas & Consumable Fuels,RELIANCE,EQ,INE002A01018\n\
             Tata Consultancy Services Ltd.,Information Technology,TCS,EQ,INE467B01029\n\
             Infosys Ltd.,Information Technology,INFY,EQ,INE009A01021\n",
        ))
        .mount(&server)
        .await;

    let symbols = fetch_constituents(&test_config(&server)).await.unwrap();
    assert_eq!(symbols, vec!["RELIANCE", "TCS", "INFY"]);
}

#[tokio::test]
async fn test_constituents_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = fetch_constituents(&test_config(&server)).await.unwrap_err();
    assert_matches!(err, AnalysisError::ProviderFetch { .. });
}
