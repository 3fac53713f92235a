use super::*;
use rust_decimal::Decimal;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config() -> ScrapeConfig {
    ScrapeConfig {
        timeout_secs: 5,
        user_agent: "pricewatch-test/0.1".to_string(),
        max_retries: 0,
        backoff_base_secs: 0,
    }
}

fn test_input(base_url: &str) -> ScrapeInput {
    ScrapeInput {
        query: "smart tv".to_string(),
        source_id: 2,
        source_name: "falabella".to_string(),
        base_url: base_url.to_string(),
    }
}

#[tokio::test]
async fn parses_products_with_display_string_prices() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/s/browse/v1/search/cl"))
        .and(query_param("term", "smart tv"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {
                "results": [
                    {
                        "productId": "888",
                        "displayName": "Smart TV 55 pulgadas 4K",
                        "brand": "Acme",
                        "url": "https://www.falabella.com/product/888",
                        "prices": [
                            { "price": ["1.299.990"], "type": "internetPrice" }
                        ]
                    },
                    {
                        "productId": "999",
                        "displayName": "Smart TV 42 pulgadas",
                        "url": "https://www.falabella.com/product/999",
                        "prices": [
                            { "price": [] },
                            { "price": ["299.990"] }
                        ]
                    }
                ]
            }
        })))
        .mount(&server)
        .await;

    let items = scrape(&test_config(), &test_input(&server.uri()))
        .await
        .unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].product_name, "Smart TV 55 pulgadas 4K");
    assert_eq!(items[0].price, Decimal::new(1_299_990, 0));
    assert_eq!(items[0].currency, "CLP");
    assert_eq!(
        items[0].attributes,
        Some(serde_json::json!({"brand": "Acme"}))
    );
    // Second product falls through the empty first tier to the next one.
    assert_eq!(items[1].price, Decimal::new(299_990, 0));
    assert_eq!(items[1].attributes, None);
}

#[tokio::test]
async fn products_without_parseable_prices_are_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/s/browse/v1/search/cl"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {
                "results": [
                    {
                        "displayName": "Producto agotado",
                        "url": "https://www.falabella.com/product/777",
                        "prices": [ { "price": ["consultar"] } ]
                    }
                ]
            }
        })))
        .mount(&server)
        .await;

    let items = scrape(&test_config(), &test_input(&server.uri()))
        .await
        .unwrap();

    assert!(items.is_empty());
}

#[tokio::test]
async fn missing_data_envelope_yields_an_empty_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/s/browse/v1/search/cl"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let items = scrape(&test_config(), &test_input(&server.uri()))
        .await
        .unwrap();

    assert!(items.is_empty());
}

#[tokio::test]
async fn rate_limiting_surfaces_as_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/s/browse/v1/search/cl"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let result = scrape(&test_config(), &test_input(&server.uri())).await;

    assert!(matches!(result, Err(ScraperError::RateLimited { .. })));
}
