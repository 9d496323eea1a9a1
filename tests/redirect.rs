//! End-to-end tests: real backends, real health updater, real HTTP front door.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use redirect_balancer::config::NodeConfig;
use redirect_balancer::lifecycle::Shutdown;
use reqwest::header::LOCATION;

mod common;

async fn jump(client: &reqwest::Client, base: &str, svc: &str, resource: &str) -> (u16, Option<String>) {
    let resp = client
        .get(format!("{}/api/v1/jump/{}?url={}", base, svc, resource))
        .send()
        .await
        .expect("redirector unreachable");
    let location = resp
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    (resp.status().as_u16(), location)
}

#[tokio::test]
async fn test_weighted_redirect_skips_dead_and_zero_weight() {
    let b1 = common::start_mock_backend("b1").await;
    let b2 = common::start_mock_backend("b2").await;
    let zero = common::start_mock_backend("zero").await;
    let dead = common::start_programmable_backend(|_, _| async { (503, "dead".into()) }).await;

    let config = common::test_config(vec![(
        "svc",
        vec![
            NodeConfig::new(b1.clone(), "/ping", 1),
            NodeConfig::new(b2.clone(), "/ping", 1).with_method("GET"),
            NodeConfig::new(zero.clone(), "/ping", 0),
            NodeConfig::new(dead.clone(), "/ping", 5),
        ],
    )]);

    let shutdown = Shutdown::new();
    let base = common::start_redirector(config, &shutdown).await;
    let client = common::client();

    let ready = common::wait_until(Duration::from_secs(3), || async {
        jump(&client, &base, "svc", "/x.mp3").await.0 == 302
    })
    .await;
    assert!(ready, "no node became alive");

    let mut seen = HashSet::new();
    for _ in 0..200 {
        let (status, location) = jump(&client, &base, "svc", "/x.mp3").await;
        assert_eq!(status, 302);
        let location = location.unwrap();
        assert!(
            location == format!("{}/x.mp3", b1) || location == format!("{}/x.mp3", b2),
            "unexpected location {}",
            location
        );
        seen.insert(location);
    }
    assert_eq!(seen.len(), 2, "both alive nodes should be picked");

    let resp = client.get(format!("{}/api/v1/status", base)).send().await.unwrap();
    assert_eq!(resp.status(), 417);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "failed");
    assert_eq!(body["hosts"], serde_json::json!([dead]));

    shutdown.trigger();
}

#[tokio::test]
async fn test_node_recovery_is_picked_up() {
    let healthy = Arc::new(AtomicBool::new(false));
    let flag = healthy.clone();
    let backend = common::start_programmable_backend(move |_, _| {
        let flag = flag.clone();
        async move {
            if flag.load(Ordering::SeqCst) {
                (200, "ok".into())
            } else {
                (500, "down".into())
            }
        }
    })
    .await;

    let mut config = common::test_config(vec![("svc", vec![NodeConfig::new(backend.clone(), "/ping", 1)])]);
    config.server.no_node_message = "no node".into();

    let shutdown = Shutdown::new();
    let base = common::start_redirector(config, &shutdown).await;
    let client = common::client();

    tokio::time::sleep(Duration::from_millis(300)).await;
    let resp = client
        .get(format!("{}/api/v1/jump/svc?url=/x.mp3", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(resp.text().await.unwrap(), "no node");

    healthy.store(true, Ordering::SeqCst);
    let recovered = common::wait_until(Duration::from_secs(4), || async {
        jump(&client, &base, "svc", "/x.mp3").await.0 == 302
    })
    .await;
    assert!(recovered, "node never came back");

    let resp = client.get(format!("{}/api/v1/status", base)).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    shutdown.trigger();
}

#[tokio::test]
async fn test_failback_when_resource_missing() {
    let backend = common::start_programmable_backend(|_, path| async move {
        match path.as_str() {
            "/ping" | "/ok.mp3" => (200, "ok".into()),
            _ => (404, "missing".into()),
        }
    })
    .await;

    let mut config = common::test_config(vec![("svc", vec![NodeConfig::new(backend.clone(), "/ping", 1)])]);
    config.server.failback = Some("http://archive.example.com/media".into());

    let shutdown = Shutdown::new();
    let base = common::start_redirector(config, &shutdown).await;
    let client = common::client();

    let ready = common::wait_until(Duration::from_secs(3), || async {
        jump(&client, &base, "svc", "/ok.mp3").await.0 == 302
    })
    .await;
    assert!(ready);

    let (_, location) = jump(&client, &base, "svc", "/ok.mp3").await;
    assert_eq!(location.unwrap(), format!("{}/ok.mp3", backend));

    let (status, location) = jump(&client, &base, "svc", "/missing.mp3").await;
    assert_eq!(status, 302);
    assert_eq!(location.unwrap(), "http://archive.example.com/media/missing.mp3");

    shutdown.trigger();
}

#[tokio::test]
async fn test_unknown_service_and_legacy_route() {
    let backend = common::start_mock_backend("b1").await;
    let config = common::test_config(vec![("svc", vec![NodeConfig::new(backend.clone(), "/ping", 1)])]);

    let shutdown = Shutdown::new();
    let base = common::start_redirector(config, &shutdown).await;
    let client = common::client();

    let ready = common::wait_until(Duration::from_secs(3), || async {
        jump(&client, &base, "svc", "/x").await.0 == 302
    })
    .await;
    assert!(ready);

    let (status, _) = jump(&client, &base, "nope", "/x.mp3").await;
    assert_eq!(status, 404);

    let resp = client.get(format!("{}/svc?url=/legacy.mp3", base)).send().await.unwrap();
    assert_eq!(resp.status(), 302);
    assert_eq!(resp.headers()[LOCATION], format!("{}/legacy.mp3", backend).as_str());

    shutdown.trigger();
}

#[tokio::test]
async fn test_concurrent_jumps_while_node_flaps() {
    let steady = common::start_mock_backend("steady").await;
    let up = Arc::new(AtomicBool::new(true));
    let flag = up.clone();
    let flapping = common::start_programmable_backend(move |_, _| {
        let flag = flag.clone();
        async move {
            if flag.load(Ordering::SeqCst) {
                (200, "ok".into())
            } else {
                (503, "down".into())
            }
        }
    })
    .await;

    let config = common::test_config(vec![(
        "svc",
        vec![
            NodeConfig::new(steady.clone(), "/ping", 1),
            NodeConfig::new(flapping.clone(), "/ping", 3),
        ],
    )]);

    let shutdown = Shutdown::new();
    let base = common::start_redirector(config, &shutdown).await;
    let client = common::client();

    let ready = common::wait_until(Duration::from_secs(3), || async {
        jump(&client, &base, "svc", "/f").await.0 == 302
    })
    .await;
    assert!(ready);

    let toggler = tokio::spawn(async move {
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            up.fetch_xor(true, Ordering::SeqCst);
        }
    });

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let client = client.clone();
        let base = base.clone();
        let allowed = [format!("{}/f", steady), format!("{}/f", flapping)];
        tasks.push(tokio::spawn(async move {
            for _ in 0..25 {
                let (status, location) = jump(&client, &base, "svc", "/f").await;
                assert_eq!(status, 302);
                assert!(allowed.contains(&location.unwrap()));
            }
        }));
    }

    for task in tasks {
        task.await.unwrap();
    }
    toggler.await.unwrap();
    shutdown.trigger();
}

#[tokio::test]
async fn test_shutdown_stops_serving() {
    let backend = common::start_mock_backend("b1").await;
    let config = common::test_config(vec![("svc", vec![NodeConfig::new(backend, "/ping", 1)])]);

    let shutdown = Shutdown::new();
    let base = common::start_redirector(config, &shutdown).await;
    let client = common::client();

    let up = common::wait_until(Duration::from_secs(2), || async {
        client.get(format!("{}/ping", base)).send().await.is_ok()
    })
    .await;
    assert!(up);

    shutdown.trigger();
    let down = common::wait_until(Duration::from_secs(3), || async {
        client.get(format!("{}/ping", base)).send().await.is_err()
    })
    .await;
    assert!(down, "redirector still answering after shutdown");
}
