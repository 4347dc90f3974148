use {
    super::*,
    axum::{
        body::{self, Body},
        http::{header, Request},
    },
    geoip::{DatabaseManager, GeoData, LocalSnapshot},
    serde_json::{json, Value},
    std::sync::Arc,
    tower::ServiceExt,
};

fn locator() -> Locator<LocalSnapshot> {
    let snapshot = LocalSnapshot::new([
        (
            "1.2.3.4".parse().unwrap(),
            GeoData {
                continent: Some("North America".into()),
                country_name: Some("United States".into()),
                country_code: Some("US".into()),
                region_name: Some("Washington".into()),
                region_code: Some("WA".into()),
                city: Some("Seattle".into()),
                postal_code: Some("98101".into()),
                latitude: Some(47.5),
                longitude: Some(-122.25),
                metro_code: Some(819),
                time_zone: Some("America/Los_Angeles".into()),
            },
        ),
        (
            "5.6.7.8".parse().unwrap(),
            GeoData {
                country_code: Some("CU".into()),
                ..Default::default()
            },
        ),
    ]);

    Locator::new(Arc::new(DatabaseManager::with_snapshot(snapshot)))
}

async fn send(app: Router, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|value| value.to_str().unwrap().to_owned());
    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();

    (status, content_type, body)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let (status, content_type, body) = send(app, uri).await;

    assert_eq!(content_type.as_deref(), Some("application/json"));

    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn lookup_found() {
    let (status, body) = get_json(router("/geoip", locator()), "/geoip/json/1.2.3.4").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "ip": "1.2.3.4",
            "country_code": "US",
            "country_name": "United States",
            "continent": "North America",
            "region_code": "WA",
            "region_name": "Washington",
            "city": "Seattle",
            "zip_code": "98101",
            "time_zone": "America/Los_Angeles",
            "latitude": 47.5,
            "longitude": -122.25,
            "metro_code": 819,
        })
    );
}

#[tokio::test]
async fn lookup_without_optional_fields() {
    let (status, body) = get_json(router("/geoip", locator()), "/geoip/json/5.6.7.8").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["country_code"], "CU");
    assert_eq!(body["region_name"], "");
    assert_eq!(body["city"], "");
    assert_eq!(body["latitude"], 0.0);
}

#[tokio::test]
async fn bad_ip() {
    let (status, body) = get_json(router("/geoip", locator()), "/geoip/json/not-an-ip").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "err": "bad ip" }));
}

#[tokio::test]
async fn undecodable_ip_segment() {
    let (status, body) = get_json(router("/geoip", locator()), "/geoip/json/%FF").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "err": "bad ip" }));
}

#[tokio::test]
async fn unknown_ip() {
    let (status, body) = get_json(router("/geoip", locator()), "/geoip/json/9.9.9.9").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "err": "lookup error" }));
}

#[tokio::test]
async fn not_ready() {
    let locator = Locator::new(Arc::new(DatabaseManager::<LocalSnapshot>::new()));
    let (status, body) = get_json(router("/geoip", locator), "/geoip/json/1.2.3.4").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({ "err": "database not ready" }));
}

#[tokio::test]
async fn healthcheck_is_empty() {
    let (status, _, body) = send(router("/geoip", locator()), "/geoip/healthcheck").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
}

#[tokio::test]
async fn routes_outside_prefix_are_not_found() {
    let (status, _, _) = send(router("/geoip", locator()), "/json/1.2.3.4").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn custom_prefixes() {
    let (status, body) = get_json(router("api/v1/", locator()), "/api/v1/json/1.2.3.4").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["country_code"], "US");

    let (status, _, _) = send(router("", locator()), "/healthcheck").await;
    assert_eq!(status, StatusCode::OK);
}

#[test]
fn prefix_normalization() {
    assert_eq!(normalize_prefix("/geoip"), "/geoip");
    assert_eq!(normalize_prefix("geoip/"), "/geoip");
    assert_eq!(normalize_prefix("/api/v1/"), "/api/v1");
    assert_eq!(normalize_prefix("/"), "");
    assert_eq!(normalize_prefix(""), "");
}
