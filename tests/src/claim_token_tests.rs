//! End-to-end tests for `POST /claimToken` against a fake engine.

use anyhow::Result;
use reward_relayer::config::{BACKEND_WALLET_ADDRESS, ENGINE_URL, THIRDWEB_SECRET_KEY};
use reward_relayer::{Config, EnvSource};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::fake_engine::{
    fast_config, FakeEngine, Relayer, StatusReply, BACKEND_WALLET, SECRET_KEY,
};

// ── Outcomes ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_mined_on_first_poll_returns_200() -> Result<()> {
    let engine = FakeEngine::start("q1", vec![StatusReply::Status("mined")]).await?;
    let relayer = Relayer::start(fast_config(), engine.env()).await?;

    let (status, body) = relayer.claim(json!({ "address": "0xABC" })).await?;

    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({ "message": "Transaction mined successfully!", "queueId": "q1" })
    );
    assert_eq!(engine.state.mint_calls(), 1);
    assert_eq!(engine.state.status_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_mint_request_carries_auth_wallet_and_amount() -> Result<()> {
    let engine = FakeEngine::start("q1", vec![StatusReply::Status("mined")]).await?;
    let relayer = Relayer::start(fast_config(), engine.env()).await?;

    relayer.claim(json!({ "address": "0xABC" })).await?;

    let mint = engine.state.last_mint().expect("mint recorded");
    assert_eq!(mint.chain_id, "84532");
    assert_eq!(mint.token_address, "0x4D9604603527322F44c318FB984ED9b5A9Ce9f71");
    assert_eq!(mint.authorization.as_deref(), Some(&*format!("Bearer {SECRET_KEY}")));
    assert_eq!(mint.backend_wallet.as_deref(), Some(BACKEND_WALLET));
    assert_eq!(mint.body, json!({ "toAddress": "0xABC", "amount": "100" }));
    assert_eq!(
        engine.state.last_status_auth.lock().unwrap().as_deref(),
        Some(&*format!("Bearer {SECRET_KEY}"))
    );
    Ok(())
}

#[tokio::test]
async fn test_configured_amount_chain_and_token_are_used() -> Result<()> {
    let engine = FakeEngine::start("q1", vec![StatusReply::Status("mined")]).await?;
    let config = Config {
        chain_id: 8453,
        token_address: "0xToken".into(),
        mint_amount: "250".into(),
        ..fast_config()
    };
    let relayer = Relayer::start(config, engine.env()).await?;

    let (status, _) = relayer.claim(json!({ "address": "0xABC" })).await?;

    assert_eq!(status, 200);
    let mint = engine.state.last_mint().expect("mint recorded");
    assert_eq!(mint.chain_id, "8453");
    assert_eq!(mint.token_address, "0xToken");
    assert_eq!(mint.body["amount"], "250");
    Ok(())
}

#[tokio::test]
async fn test_never_mined_returns_408_with_queue_id() -> Result<()> {
    let engine = FakeEngine::start("q-slow", vec![StatusReply::Status("sent")]).await?;
    let relayer = Relayer::start(fast_config(), engine.env()).await?;

    let (status, body) = relayer.claim(json!({ "address": "0xABC" })).await?;

    assert_eq!(status, 408);
    assert_eq!(
        body,
        json!({
            "message": "Transaction not mined within the timeout period.",
            "queueId": "q-slow"
        })
    );
    assert_eq!(engine.state.status_calls(), 3);
    Ok(())
}

#[tokio::test]
async fn test_transient_status_failures_consume_attempts_only() -> Result<()> {
    let engine = FakeEngine::start(
        "q1",
        vec![
            StatusReply::Raw(503, "engine overloaded"),
            StatusReply::Raw(200, "not json"),
            StatusReply::Status("mined"),
        ],
    )
    .await?;
    let relayer = Relayer::start(fast_config(), engine.env()).await?;

    let (status, body) = relayer.claim(json!({ "address": "0xABC" })).await?;

    assert_eq!(status, 200);
    assert_eq!(body["queueId"], "q1");
    assert_eq!(engine.state.status_calls(), 3);
    Ok(())
}

#[tokio::test]
async fn test_status_errors_exhaust_budget_as_timeout() -> Result<()> {
    let engine = FakeEngine::start("q1", vec![StatusReply::Raw(500, "boom")]).await?;
    let relayer = Relayer::start(fast_config(), engine.env()).await?;

    let (status, body) = relayer.claim(json!({ "address": "0xABC" })).await?;

    assert_eq!(status, 408);
    assert_eq!(body["queueId"], "q1");
    assert!(body.get("error").is_none());
    Ok(())
}

// ── Submission failures ─────────────────────────────────────────────

#[tokio::test]
async fn test_engine_rejection_returns_500_with_raw_text() -> Result<()> {
    let engine =
        FakeEngine::start_with_mint_reply(400, "insufficient funds", vec![]).await?;
    let relayer = Relayer::start(fast_config(), engine.env()).await?;

    let (status, body) = relayer.claim(json!({ "address": "0xABC" })).await?;

    assert_eq!(status, 500);
    assert_eq!(
        body,
        json!({ "message": "Failed to initiate transaction", "error": "insufficient funds" })
    );
    assert_eq!(engine.state.mint_calls(), 1);
    assert_eq!(engine.state.status_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_success_without_queue_id_is_submission_error() -> Result<()> {
    let engine =
        FakeEngine::start_with_mint_reply(200, r#"{"result":{}}"#, vec![]).await?;
    let relayer = Relayer::start(fast_config(), engine.env()).await?;

    let (status, body) = relayer.claim(json!({ "address": "0xABC" })).await?;

    assert_eq!(status, 500);
    assert_eq!(body["message"], "Failed to initiate transaction");
    assert_eq!(engine.state.status_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_unreachable_engine_is_submission_error() -> Result<()> {
    let env = EnvSource::fixed([
        (BACKEND_WALLET_ADDRESS, BACKEND_WALLET),
        (ENGINE_URL, "http://127.0.0.1:1"),
        (THIRDWEB_SECRET_KEY, SECRET_KEY),
    ]);
    let relayer = Relayer::start(fast_config(), env).await?;

    let (status, body) = relayer.claim(json!({ "address": "0xABC" })).await?;

    assert_eq!(status, 500);
    assert_eq!(body["message"], "Failed to initiate transaction");
    Ok(())
}

// ── Configuration & input ───────────────────────────────────────────

#[tokio::test]
async fn test_missing_config_makes_no_engine_calls() -> Result<()> {
    for missing in [BACKEND_WALLET_ADDRESS, ENGINE_URL, THIRDWEB_SECRET_KEY] {
        let engine = FakeEngine::start("q1", vec![StatusReply::Status("mined")]).await?;
        let vars: Vec<(&str, String)> = [
            (BACKEND_WALLET_ADDRESS, BACKEND_WALLET.to_string()),
            (ENGINE_URL, engine.url.clone()),
            (THIRDWEB_SECRET_KEY, SECRET_KEY.to_string()),
        ]
        .into_iter()
        .filter(|(k, _)| *k != missing)
        .collect();
        let relayer = Relayer::start(fast_config(), EnvSource::fixed(vars)).await?;

        let (status, body) = relayer.claim(json!({ "address": "0xABC" })).await?;

        assert_eq!(status, 500, "missing {missing}");
        assert_eq!(body["message"], "Server misconfigured");
        assert!(body["error"].as_str().unwrap().contains(missing));
        assert_eq!(engine.state.mint_calls(), 0, "missing {missing}");
        assert_eq!(engine.state.status_calls(), 0, "missing {missing}");
    }
    Ok(())
}

#[tokio::test]
async fn test_config_checked_before_body() -> Result<()> {
    let relayer = Relayer::start(
        fast_config(),
        EnvSource::fixed(Vec::<(String, String)>::new()),
    )
    .await?;

    let resp = relayer
        .http
        .post(format!("{}/claimToken", relayer.url))
        .body("garbage")
        .send()
        .await?;

    assert_eq!(resp.status().as_u16(), 500);
    Ok(())
}

#[tokio::test]
async fn test_malformed_body_returns_400() -> Result<()> {
    let engine = FakeEngine::start("q1", vec![StatusReply::Status("mined")]).await?;
    let relayer = Relayer::start(fast_config(), engine.env()).await?;

    for body in ["", "not json", r#"{"wallet":"0xABC"}"#, r#"{"address":""}"#] {
        let resp = relayer
            .http
            .post(format!("{}/claimToken", relayer.url))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await?;
        assert_eq!(resp.status().as_u16(), 400, "body {body:?}");
        let json: serde_json::Value = resp.json().await?;
        assert_eq!(json["message"], "Invalid request body");
    }
    assert_eq!(engine.state.mint_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_body_without_content_type_is_accepted() -> Result<()> {
    let engine = FakeEngine::start("q1", vec![StatusReply::Status("mined")]).await?;
    let relayer = Relayer::start(fast_config(), engine.env()).await?;

    let resp = relayer
        .http
        .post(format!("{}/claimToken", relayer.url))
        .body(r#"{"address":"0xABC"}"#)
        .send()
        .await?;

    assert_eq!(resp.status().as_u16(), 200);
    Ok(())
}

// ── Cancellation & concurrency ──────────────────────────────────────

#[tokio::test]
async fn test_shutdown_cancels_polling_with_503() -> Result<()> {
    let engine = FakeEngine::start("q-cancel", vec![StatusReply::Status("queued")]).await?;
    let config = Config {
        poll_max_attempts: 10_000,
        poll_interval_ms: 20,
        ..fast_config()
    };
    let relayer = Relayer::start(config, engine.env()).await?;

    let shutdown = relayer.state.shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        shutdown.cancel();
    });

    let (status, body) = relayer.claim(json!({ "address": "0xABC" })).await?;

    assert_eq!(status, 503);
    assert_eq!(body["queueId"], "q-cancel");
    assert!(engine.state.status_calls() < 10_000);
    Ok(())
}

#[tokio::test]
async fn test_client_disconnect_stops_polling() -> Result<()> {
    let engine = FakeEngine::start("q-gone", vec![StatusReply::Status("queued")]).await?;
    let config = Config {
        poll_max_attempts: 10_000,
        poll_interval_ms: 20,
        ..fast_config()
    };
    let relayer = Relayer::start(config, engine.env()).await?;

    let claim = relayer.claim(json!({ "address": "0xABC" }));
    assert!(tokio::time::timeout(Duration::from_millis(150), claim)
        .await
        .is_err());
    assert!(engine.state.status_calls() > 0);

    // Let the server notice the closed connection and drop the handler.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let settled = engine.state.status_calls();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(engine.state.status_calls(), settled);
    assert_eq!(relayer.state.in_flight_polls.load(Ordering::Relaxed), 0);
    assert!(!relayer.state.shutdown.is_cancelled());
    Ok(())
}

#[tokio::test]
async fn test_concurrent_claims_poll_independently() -> Result<()> {
    let engine = FakeEngine::start("q1", vec![StatusReply::Status("mined")]).await?;
    let relayer = Relayer::start(fast_config(), engine.env()).await?;

    let (a, b, c) = tokio::join!(
        relayer.claim(json!({ "address": "0xA" })),
        relayer.claim(json!({ "address": "0xB" })),
        relayer.claim(json!({ "address": "0xC" })),
    );

    for result in [a, b, c] {
        let (status, _) = result?;
        assert_eq!(status, 200);
    }
    assert_eq!(engine.state.mint_calls(), 3);
    assert_eq!(engine.state.status_calls(), 3);
    Ok(())
}

#[tokio::test]
async fn test_no_free_claim_slot_returns_503_without_engine_calls() -> Result<()> {
    let engine = FakeEngine::start("q1", vec![StatusReply::Status("mined")]).await?;
    let config = Config {
        max_concurrent_claims: 0,
        ..fast_config()
    };
    let relayer = Relayer::start(config, engine.env()).await?;

    let (status, body) = relayer.claim(json!({ "address": "0xABC" })).await?;

    assert_eq!(status, 503);
    assert_eq!(body["message"], "Relayer busy, try again");
    assert_eq!(engine.state.mint_calls(), 0);
    Ok(())
}

// ── Auth & correlation ──────────────────────────────────────────────

#[tokio::test]
async fn test_api_key_required_when_configured() -> Result<()> {
    let engine = FakeEngine::start("q1", vec![StatusReply::Status("mined")]).await?;
    let config = Config {
        api_key: Some("relayer-key".into()),
        ..fast_config()
    };
    let relayer = Relayer::start(config, engine.env()).await?;

    let (status, _) = relayer.claim(json!({ "address": "0xABC" })).await?;
    assert_eq!(status, 401);
    assert_eq!(engine.state.mint_calls(), 0);

    let resp = relayer
        .http
        .post(format!("{}/claimToken", relayer.url))
        .header("x-api-key", "relayer-key")
        .json(&json!({ "address": "0xABC" }))
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 200);

    let resp = relayer
        .http
        .get(format!("{}/health", relayer.url))
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 200);
    Ok(())
}

#[tokio::test]
async fn test_request_id_is_echoed() -> Result<()> {
    let engine = FakeEngine::start("q1", vec![StatusReply::Status("mined")]).await?;
    let relayer = Relayer::start(fast_config(), engine.env()).await?;

    let resp = relayer
        .http
        .post(format!("{}/claimToken", relayer.url))
        .header("x-request-id", "trace-123")
        .json(&json!({ "address": "0xABC" }))
        .send()
        .await?;
    assert_eq!(
        resp.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("trace-123")
    );

    let resp = relayer
        .http
        .get(format!("{}/health", relayer.url))
        .send()
        .await?;
    let generated = resp
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(generated.starts_with("claim-"));
    Ok(())
}
