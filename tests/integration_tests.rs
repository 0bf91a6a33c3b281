mod common;

use common::*;
use holonet::build_rocket;
use rocket::http::{ContentType, Header, Status};
use rocket::local::asynchronous::Client;
use holonet::AppConfig;
use serde_json::{Value, json};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct TestApp {
    client: Client,
    upstream: MockServer,
    _temp_dir: TempDir, // Keep alive for cleanup
}

async fn create_test_app() -> TestApp {
    create_test_app_with(|_| {}).await
}

async fn create_test_app_with(configure: impl FnOnce(&mut AppConfig)) -> TestApp {
    let upstream = MockServer::start().await;

    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let database_url = temp_dir.path().join("test.db").to_string_lossy().to_string();
    let mut config = test_config(&upstream.uri(), &database_url);
    configure(&mut config);

    let rocket = build_rocket(config).expect("Failed to build rocket");
    let client = Client::tracked(rocket).await.expect("valid rocket instance");

    TestApp {
        client,
        upstream,
        _temp_dir: temp_dir,
    }
}

async fn json_body(response: rocket::local::asynchronous::LocalResponse<'_>) -> Value {
    let body = response.into_string().await.expect("Response body");
    serde_json::from_str(&body).expect("Valid JSON")
}

/// Polls a GET endpoint until `ready` accepts the response.
async fn poll_until(
    app: &TestApp,
    uri: &str,
    ready: impl Fn(Status, &Value) -> bool,
) -> Value {
    for _ in 0..100 {
        let response = app.client.get(uri).dispatch().await;
        let status = response.status();
        let json = json_body(response).await;
        if ready(status, &json) {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("{uri} did not reach the expected state in time");
}

async fn search_person(app: &TestApp, query: &str) {
    let response = app
        .client
        .post("/api/people/search")
        .header(ContentType::JSON)
        .body(json!({ "query": query }).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
}

async fn mount_luke(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/people"))
        .and(query_param("name", "luke"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([
            person_record(1, "Luke Skywalker", &[1])
        ]))))
        .mount(server)
        .await;
}

#[rocket::async_test]
async fn test_health_check() {
    let app = create_test_app().await;
    let response = app.client.get("/api/health").dispatch().await;

    assert_eq!(response.status(), Status::Ok);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
}

#[rocket::async_test]
async fn test_search_requires_query() {
    let app = create_test_app().await;

    for body in [json!({}), json!({"query": "   "})] {
        let response = app
            .client
            .post("/api/people/search")
            .header(ContentType::JSON)
            .body(body.to_string())
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::BadRequest);
        let json = json_body(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["errors"]["query"][0], "The query field is required.");
    }
}

#[rocket::async_test]
async fn test_search_rejects_long_query() {
    let app = create_test_app().await;
    let response = app
        .client
        .post("/api/films/search")
        .header(ContentType::JSON)
        .body(json!({"query": "x".repeat(101)}).to_string())
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::BadRequest);
    let json = json_body(response).await;
    assert!(json["errors"]["query"].is_array());
}

#[rocket::async_test]
async fn test_search_people_returns_projection_and_logs_event() {
    let app = create_test_app().await;
    mount_luke(&app.upstream).await;

    let response = app
        .client
        .post("/api/people/search")
        .header(ContentType::JSON)
        .header(Header::new("User-Agent", "holonet-tests/1.0"))
        .body(json!({"query": "  Luke "}).to_string())
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    let json = json_body(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"], json!([{"id": 1, "name": "Luke Skywalker"}]));

    let response = app.client.get("/api/searches/recent").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let json = json_body(response).await;
    let events = json["data"].as_array().expect("event list");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["query"], "luke");
    assert_eq!(events[0]["type"], "person");
    assert_eq!(events[0]["results_count"], 1);
    assert_eq!(events[0]["upstream_failed"], false);
}

#[rocket::async_test]
async fn test_failed_search_answers_empty_and_flags_event() {
    let app = create_test_app().await;
    Mock::given(method("GET"))
        .and(path("/films"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&app.upstream)
        .await;

    let response = app
        .client
        .post("/api/films/search")
        .header(ContentType::JSON)
        .header(Header::new("User-Agent", "holonet-tests/1.0"))
        .body(json!({"query": "hope"}).to_string())
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    let json = json_body(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"], json!([]));

    let response = app.client.get("/api/searches/recent?limit=5").dispatch().await;
    let json = json_body(response).await;
    assert_eq!(json["data"][0]["type"], "film");
    assert_eq!(json["data"][0]["upstream_failed"], true);
}

#[rocket::async_test]
async fn test_person_detail_endpoint() {
    let app = create_test_app().await;
    Mock::given(method("GET"))
        .and(path("/people/1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(person_record(1, "Luke Skywalker", &[1]))),
        )
        .mount(&app.upstream)
        .await;
    Mock::given(method("GET"))
        .and(path("/films/1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(envelope(film_record(1, "A New Hope", &[1]))),
        )
        .mount(&app.upstream)
        .await;

    let response = app.client.get("/api/people/1").dispatch().await;

    assert_eq!(response.status(), Status::Ok);
    let json = json_body(response).await;
    assert_eq!(json["data"]["person"]["name"], "Luke Skywalker");
    assert_eq!(json["data"]["person"]["birth_year"], "19BBY");
    assert!(json["data"]["person"].get("film_ids").is_none());
    assert_eq!(json["data"]["films"][0]["title"], "A New Hope");
    assert_eq!(
        json["data"]["films"][0]["opening_crawl"],
        "It is a period of civil war."
    );
}

#[rocket::async_test]
async fn test_detail_rejects_invalid_ids() {
    let app = create_test_app().await;

    let response = app.client.get("/api/people/abc").dispatch().await;
    assert_eq!(response.status(), Status::BadRequest);
    let json = json_body(response).await;
    assert_eq!(json["message"], "Invalid person ID");

    let response = app.client.get("/api/films/0").dispatch().await;
    assert_eq!(response.status(), Status::BadRequest);
    let json = json_body(response).await;
    assert_eq!(json["message"], "Invalid film ID");
}

#[rocket::async_test]
async fn test_person_detail_with_missing_film_reports_person() {
    let app = create_test_app().await;
    Mock::given(method("GET"))
        .and(path("/people/1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(person_record(1, "Luke Skywalker", &[2]))),
        )
        .mount(&app.upstream)
        .await;
    Mock::given(method("GET"))
        .and(path("/films/2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&app.upstream)
        .await;

    let response = app.client.get("/api/people/1").dispatch().await;

    assert_eq!(response.status(), Status::NotFound);
    let json = json_body(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Person not found");
}

#[rocket::async_test]
async fn test_missing_film_is_not_found() {
    let app = create_test_app().await;
    Mock::given(method("GET"))
        .and(path("/films/42"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&app.upstream)
        .await;

    let response = app.client.get("/api/films/42").dispatch().await;

    assert_eq!(response.status(), Status::NotFound);
    let json = json_body(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Film not found");
}

#[rocket::async_test]
async fn test_stats_pending_then_ready() {
    let app = create_test_app().await;

    let response = app.client.get("/api/stats").dispatch().await;
    assert_eq!(response.status(), Status::Accepted);
    let json = json_body(response).await;
    assert_eq!(json["success"], false);
    assert!(json["data"].is_null());
    assert_eq!(
        json["message"],
        "Stats are being calculated. Please try again in a few moments."
    );

    mount_luke(&app.upstream).await;
    for _ in 0..2 {
        let response = app
            .client
            .post("/api/people/search")
            .header(ContentType::JSON)
            .body(json!({"query": "luke"}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
    }

    let response = app.client.post("/api/stats/refresh").dispatch().await;
    assert_eq!(response.status(), Status::Ok);

    let response = app.client.get("/api/stats").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let json = json_body(response).await;
    assert_eq!(json["success"], true);

    let stats = &json["data"];
    assert_eq!(stats["general"]["total_searches"], 2);
    assert_eq!(stats["top_queries"][0]["rank"], 1);
    assert_eq!(stats["top_queries"][0]["query"], "luke");
    assert_eq!(stats["top_queries"][0]["percentage"], 100.0);
    assert_eq!(stats["by_type"]["people"]["total_searches"], 2);
    assert_eq!(stats["by_type"]["films"]["total_searches"], 0);
    assert_eq!(
        stats["recent"]["daily_breakdown"].as_array().map(Vec::len),
        Some(7)
    );
}

#[rocket::async_test]
async fn test_cache_stats_and_clear() {
    let app = create_test_app().await;
    mount_luke(&app.upstream).await;

    for _ in 0..2 {
        app.client
            .post("/api/people/search")
            .header(ContentType::JSON)
            .body(json!({"query": "luke"}).to_string())
            .dispatch()
            .await;
    }

    let response = app.client.get("/api/cache/stats").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let json = json_body(response).await;
    assert_eq!(json["hit_count"], 1);
    assert_eq!(json["total_entries"], 2);
    assert_eq!(json["entity_ttl_secs"], 3600);

    let response = app.client.delete("/api/cache").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let json = json_body(response).await;
    assert_eq!(json["removed_entries"], 2);

    let response = app.client.get("/api/cache/stats").dispatch().await;
    let json = json_body(response).await;
    assert_eq!(json["total_entries"], 0);
}

#[rocket::async_test]
async fn test_stats_pending_request_is_served_by_worker() {
    let app = create_test_app().await;
    mount_luke(&app.upstream).await;
    search_person(&app, "luke").await;
    search_person(&app, "Luke").await;

    let response = app.client.get("/api/stats").dispatch().await;
    assert_eq!(response.status(), Status::Accepted);

    let json = poll_until(&app, "/api/stats", |status, _| status == Status::Ok).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "Stats retrieved successfully.");
    assert_eq!(json["data"]["general"]["total_searches"], 2);
    assert_eq!(json["data"]["top_queries"][0]["query"], "luke");

    let json = poll_until(&app, "/api/cache/stats", |_, json| {
        json["stats_calculating"] == false
    })
    .await;
    assert_eq!(json["stats_cached"], true);
}

#[rocket::async_test]
async fn test_scheduler_refreshes_stats_and_sweeps_cache() {
    let app = create_test_app_with(|config| {
        config.stats_refresh_secs = 1;
        config.entity_ttl_secs = 1;
    })
    .await;
    mount_luke(&app.upstream).await;
    search_person(&app, "luke").await;

    // Entities expire after a second and the next tick removes them,
    // leaving only the scheduled snapshot.
    let json = poll_until(&app, "/api/cache/stats", |_, json| {
        json["stats_cached"] == true && json["total_entries"] == 1
    })
    .await;
    assert_eq!(json["expired_entries"], 0);

    let response = app.client.get("/api/stats").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let json = json_body(response).await;
    assert_eq!(json["data"]["general"]["total_searches"], 1);
}
