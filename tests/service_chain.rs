//! End-to-end tests of the frontend → api → worker chain.

use serde_json::Value;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cardinality_demo::state::ServiceMode;
use cardinality_demo::ServiceRole;

mod common;

fn addr(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

#[tokio::test]
async fn test_full_chain_success() {
    let (worker, api, frontend) = (addr(28301), addr(28302), addr(28303));
    let _w = common::spawn_service(ServiceRole::Worker, worker, |c| c.error_rate = 0.0).await;
    let _a = common::spawn_service(ServiceRole::Api, api, |c| {
        c.upstream_url = Some(format!("http://{worker}"));
    })
    .await;
    let _f = common::spawn_service(ServiceRole::Frontend, frontend, |c| {
        c.upstream_url = Some(format!("http://{api}"));
    })
    .await;

    let res = common::client()
        .get(common::url(frontend, "/api/call"))
        .send()
        .await
        .expect("frontend unreachable");
    assert_eq!(res.status(), 200);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["success"], true);
    let work = &body["data"]["data"];
    assert_eq!(work["success"], true);
    assert!(work["workDuration"].is_u64());
    assert!(work["workUnits"].is_u64());
    assert!(work["queueDepth"].as_u64().unwrap() < 100);
}

#[tokio::test]
async fn test_simulated_failure_propagates_as_500() {
    let (worker, api, frontend) = (addr(28311), addr(28312), addr(28313));
    let _w = common::spawn_service(ServiceRole::Worker, worker, |c| c.error_rate = 1.0).await;
    let _a = common::spawn_service(ServiceRole::Api, api, |c| {
        c.upstream_url = Some(format!("http://{worker}"));
    })
    .await;
    let _f = common::spawn_service(ServiceRole::Frontend, frontend, |c| {
        c.upstream_url = Some(format!("http://{api}"));
    })
    .await;
    let client = common::client();

    let res = client.get(common::url(worker, "/work")).send().await.unwrap();
    assert_eq!(res.status(), 500);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, serde_json::json!({"success": false, "error": "Simulated error"}));

    let res = client.get(common::url(api, "/process")).send().await.unwrap();
    assert_eq!(res.status(), 500);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Request failed with status code 500");

    let res = client.get(common::url(frontend, "/api/call")).send().await.unwrap();
    assert_eq!(res.status(), 500);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Request failed with status code 500");

    let status: Value = client
        .get(common::url(frontend, "/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["errorCount"], 1);
    assert_eq!(status["requestCount"], 2);
}

#[tokio::test]
async fn test_unreachable_upstream() {
    let frontend = addr(28321);
    let _f = common::spawn_service(ServiceRole::Frontend, frontend, |c| {
        c.upstream_url = Some("http://127.0.0.1:28329".to_string());
    })
    .await;

    let res = common::client()
        .get(common::url(frontend, "/api/call"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 500);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("127.0.0.1:28329"));
}

#[tokio::test]
async fn test_slow_upstream_times_out() {
    let (backend, api) = (addr(28331), addr(28332));
    common::start_programmable_backend(backend, |_| async {
        tokio::time::sleep(Duration::from_secs(3)).await;
        (200, r#"{"success":true}"#.to_string())
    })
    .await;
    let _a = common::spawn_service(ServiceRole::Api, api, |c| {
        c.upstream_url = Some(format!("http://{backend}"));
        c.timeouts.upstream_secs = 1;
    })
    .await;

    let res = common::client()
        .get(common::url(api, "/process"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 500);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "timeout of 1000ms exceeded");
}

#[tokio::test]
async fn test_request_id_is_forwarded() {
    let (backend, api) = (addr(28341), addr(28342));
    let seen = Arc::new(Mutex::new(String::new()));
    let recorder = seen.clone();
    common::start_programmable_backend(backend, move |head| {
        *recorder.lock().unwrap() = head.to_ascii_lowercase();
        async { (200, r#"{"success":true,"workUnits":1}"#.to_string()) }
    })
    .await;
    let _a = common::spawn_service(ServiceRole::Api, api, |c| {
        c.upstream_url = Some(format!("http://{backend}"));
    })
    .await;

    let res = common::client()
        .get(common::url(api, "/process"))
        .header("x-request-id", "chain-test-id")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["x-request-id"], "chain-test-id");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["workUnits"], 1);

    let head = seen.lock().unwrap().clone();
    assert!(head.starts_with("get /work "), "{head}");
    assert!(head.contains("x-request-id: chain-test-id"), "{head}");
}

#[tokio::test]
async fn test_frontend_mode_lifecycle() {
    let frontend = addr(28351);
    let _f = common::spawn_service(ServiceRole::Frontend, frontend, |c| {
        c.demo_mode = ServiceMode::Shaped;
    })
    .await;
    let client = common::client();
    let status = |client: reqwest::Client| async move {
        client
            .get(common::url(frontend, "/status"))
            .send()
            .await
            .unwrap()
            .json::<Value>()
            .await
            .unwrap()
    };

    let initial = status(client.clone()).await;
    assert_eq!(initial["mode"], "shaped");
    assert_eq!(initial["highCardinalityMode"], false);
    assert_eq!(initial["cardinalityBombMode"], false);

    let toggled: Value = client
        .post(common::url(frontend, "/toggle-cardinality"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(toggled["highCardinalityMode"], true);
    assert_eq!(status(client.clone()).await["highCardinalityMode"], true);

    let page = client
        .get(common::url(frontend, "/demo?bomb=1"))
        .send()
        .await
        .unwrap();
    assert_eq!(page.status(), 200);
    assert!(page.text().await.unwrap().contains("CARDINALITY BOMB ACTIVE"));

    // The bomb stays on without the query parameter.
    let after = status(client.clone()).await;
    assert_eq!(after["cardinalityBombMode"], true);
    let page = client.get(common::url(frontend, "/demo")).send().await.unwrap();
    assert!(page.text().await.unwrap().contains("CARDINALITY BOMB ACTIVE"));
}

#[tokio::test]
async fn test_gold_metrics_shape() {
    let frontend = addr(28361);
    let _f = common::spawn_service(ServiceRole::Frontend, frontend, |_| {}).await;
    let client = common::client();

    for _ in 0..5 {
        client.get(common::url(frontend, "/health")).send().await.unwrap();
    }
    client.get(common::url(frontend, "/missing/42")).send().await.unwrap();

    let gold: Value = client
        .get(common::url(frontend, "/gold-metrics"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    for field in ["request_rate", "error_rate", "p95_latency_ms", "saturation"] {
        let value = gold[field].as_str().unwrap_or_else(|| panic!("{field} is not a string"));
        let (_, decimals) = value.split_once('.').unwrap();
        assert_eq!(decimals.len(), 2, "{field} = {value}");
        assert!(value.parse::<f64>().is_ok());
    }
    // 1 failure out of 7 counted requests (the gold-metrics call included).
    assert_eq!(gold["error_rate"], "14.29");
    assert!(gold["timestamp"].as_str().unwrap().contains('T'));
}

#[tokio::test]
async fn test_services_stop_on_shutdown() {
    let worker = addr(28371);
    let shutdown = common::spawn_service(ServiceRole::Worker, worker, |_| {}).await;
    let client = common::client();

    let res = client.get(common::url(worker, "/health")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    shutdown.trigger();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(client.get(common::url(worker, "/health")).send().await.is_err());
}
