//! Tests for router module

use super::*;
use crate::clock::{Clock, ManualClock};
use crate::completion::CompletionResponse;
use crate::error::{Error, ErrorClass, SkipReason};
use crate::message::{Message, MessageRole};
use crate::registry::{Capability, ModelOverride, ModelRegistry, ProviderSpec};
use chrono::{DateTime, Duration as ChronoDuration, Local, TimeZone};
use std::sync::Arc;
use std::time::Duration;

fn morning() -> DateTime<Local> {
    Local.with_ymd_and_hms(2026, 3, 10, 9, 30, 0).unwrap()
}

struct Fixture {
    router: FailoverRouter,
    clock: Arc<ManualClock>,
    x: Arc<ScriptedClient>,
    y: Arc<ScriptedClient>,
}

/// x: [modelA p1 text, modelB p2 vision], y: [modelC p1 text]
fn fixture_with(x_limit: u64, x: ScriptedClient, y: ScriptedClient) -> Fixture {
    let x = Arc::new(x);
    let y = Arc::new(y);
    let mut registry = ModelRegistry::new();
    registry
        .register(
            ProviderSpec::new("x", "http://x")
                .with_api_key("key-xxxxxxxx")
                .with_daily_limit(x_limit)
                .with_model("modelA", 1, Capability::Text)
                .with_model("modelB", 2, Capability::Vision),
            x.clone(),
        )
        .unwrap();
    registry
        .register(
            ProviderSpec::new("y", "http://y")
                .with_api_key("key-yyyyyyyy")
                .with_model("modelC", 1, Capability::Text),
            y.clone(),
        )
        .unwrap();
    let clock = Arc::new(ManualClock::new(morning()));
    let router = FailoverRouter::new(Arc::new(registry)).with_clock(clock.clone());
    Fixture { router, clock, x, y }
}

fn fixture() -> Fixture {
    fixture_with(0, ScriptedClient::new("x"), ScriptedClient::new("y"))
}

fn ask(text: &str) -> DispatchRequest {
    DispatchRequest::new(vec![Message::user(text)])
}

async fn state(router: &FailoverRouter, name: &str) -> crate::registry::ProviderState {
    router.registry().require(name).unwrap().snapshot().await
}

#[tokio::test]
async fn test_first_candidate_answers() {
    let f = fixture();
    f.x.push_ok(CompletionResponse::text("modelA", "hello").with_total_tokens(7));

    let outcome = f.router.dispatch(ask("hi")).await;
    let completion = outcome.completion().unwrap();
    assert_eq!(completion.text, "hello");
    assert_eq!(completion.provider, "x");
    assert_eq!(completion.model, "modelA");
    assert_eq!(completion.capability, Capability::Text);
    assert_eq!(completion.tokens_used, Some(7));
    assert_eq!(completion.attempts.len(), 1);
    assert_eq!(f.y.call_count(), 0);
    assert_eq!(state(&f.router, "x").await.budget.used_today, 7);
}

#[tokio::test]
async fn test_first_success_wins() {
    let z = Arc::new(ScriptedClient::new("z"));
    let a = Arc::new(ScriptedClient::new("a"));
    let b = Arc::new(ScriptedClient::new("b"));
    let mut registry = ModelRegistry::new();
    for (name, client, priority) in [("a", &a, 1), ("b", &b, 2), ("z", &z, 3)] {
        registry
            .register(
                ProviderSpec::new(name, "http://local")
                    .with_api_key("key-12345678910")
                    .with_model(format!("{name}-model"), priority, Capability::Text),
                client.clone(),
            )
            .unwrap();
    }
    a.push_err(Error::Api {
        status: 500,
        message: "boom".into(),
    });
    let router = FailoverRouter::new(Arc::new(registry));

    let outcome = router.dispatch(ask("hi")).await;
    assert_eq!(outcome.completion().unwrap().provider, "b");
    assert_eq!(a.call_count(), 1);
    assert_eq!(b.call_count(), 1);
    assert_eq!(z.call_count(), 0);
}

#[tokio::test]
async fn test_rate_limit_trips_breaker_and_fails_over() {
    let f = fixture();
    f.x.push_err(Error::RateLimit("429 Too Many Requests".into()));

    let outcome = f.router.dispatch(ask("hi")).await;
    let completion = outcome.completion().unwrap();
    assert_eq!(completion.provider, "y");
    assert_eq!(completion.model, "modelC");
    assert!(matches!(
        completion.attempts[0].outcome,
        AttemptOutcome::Failed {
            class: ErrorClass::RateLimited,
            ..
        }
    ));

    let x = state(&f.router, "x").await;
    assert!(x.breaker.is_blocked(f.clock.now()));
    assert_eq!(x.failures_today, 1);

    // Blocked provider is skipped, not called, on the next request
    let outcome = f.router.dispatch(ask("again")).await;
    let completion = outcome.completion().unwrap();
    assert_eq!(completion.provider, "y");
    assert_eq!(
        completion.attempts[0].outcome,
        AttemptOutcome::Skipped {
            reason: SkipReason::CircuitOpen
        }
    );
    assert_eq!(f.x.call_count(), 1);
    assert_eq!(state(&f.router, "x").await.failures_today, 1);
}

#[tokio::test]
async fn test_authentication_error_trips_breaker() {
    let f = fixture();
    f.x.push_err(Error::Authentication("invalid key".into()));
    f.router.dispatch(ask("hi")).await;
    assert!(state(&f.router, "x").await.breaker.is_blocked(f.clock.now()));
}

#[tokio::test]
async fn test_transient_and_not_found_do_not_trip() {
    let f = fixture();
    f.x.push_err(Error::Network("connection reset".into()));
    let outcome = f.router.dispatch(ask("hi")).await;
    assert_eq!(outcome.completion().unwrap().provider, "y");
    assert!(!state(&f.router, "x").await.breaker.is_blocked(f.clock.now()));

    f.x.push_err(Error::ModelNotFound("modelA".into()));
    f.router.dispatch(ask("hi")).await;
    let x = state(&f.router, "x").await;
    assert!(!x.breaker.is_blocked(f.clock.now()));
    assert_eq!(x.failures_today, 2);

    // Provider is still tried first afterwards
    let outcome = f.router.dispatch(ask("hi")).await;
    assert_eq!(outcome.completion().unwrap().provider, "x");
}

#[tokio::test]
async fn test_breaker_expires_at_midnight() {
    let f = fixture();
    f.router.trip_provider("x", "manual").await.unwrap();
    assert_eq!(f.router.dispatch(ask("hi")).await.completion().unwrap().provider, "y");

    f.clock.set(Local.with_ymd_and_hms(2026, 3, 11, 0, 0, 1).unwrap());
    assert_eq!(f.router.dispatch(ask("hi")).await.completion().unwrap().provider, "x");
}

#[tokio::test]
async fn test_each_candidate_tried_once() {
    let f = fixture();
    f.x.push_err(Error::Network("down".into()));
    f.x.push_err(Error::Network("down".into()));
    f.y.push_err(Error::Network("down".into()));

    let outcome = f.router.dispatch(ask("hi")).await;
    let failure = outcome.failure().unwrap();
    assert_eq!(failure.tried.len(), 2);
    assert_eq!(f.x.call_count(), 1);
    assert_eq!(f.y.call_count(), 1);
    assert_eq!(failure.last_error.as_deref(), Some("network error: down"));
}

#[tokio::test]
async fn test_budget_accumulates_and_exhausts() {
    let f = fixture_with(15, ScriptedClient::new("x"), ScriptedClient::new("y"));

    f.router.dispatch(ask("one")).await;
    assert_eq!(state(&f.router, "x").await.budget.used_today, DEFAULT_REPLY_TOKENS as u64);

    // Still under the limit at admission time
    let outcome = f.router.dispatch(ask("two")).await;
    assert_eq!(outcome.completion().unwrap().provider, "x");
    assert_eq!(state(&f.router, "x").await.budget.used_today, 20);

    let outcome = f.router.dispatch(ask("three")).await;
    let completion = outcome.completion().unwrap();
    assert_eq!(completion.provider, "y");
    assert_eq!(
        completion.attempts[0].outcome,
        AttemptOutcome::Skipped {
            reason: SkipReason::BudgetExhausted
        }
    );
    assert_eq!(f.x.call_count(), 2);
    assert_eq!(state(&f.router, "x").await.failures_today, 0);

    // x used 20, y answered the third request
    assert_eq!(f.router.reset_token_usage().await, 30);
    let outcome = f.router.dispatch(ask("four")).await;
    assert_eq!(outcome.completion().unwrap().provider, "x");
}

#[tokio::test]
async fn test_missing_usage_counts_as_zero() {
    let f = fixture();
    f.x.push_ok(CompletionResponse::text("modelA", "no usage"));
    let outcome = f.router.dispatch(ask("hi")).await;
    assert_eq!(outcome.completion().unwrap().tokens_used, None);
    assert_eq!(state(&f.router, "x").await.budget.used_today, 0);
    assert_eq!(state(&f.router, "x").await.successes_today, 1);
}

#[tokio::test]
async fn test_exhaustion_messages_differ_by_capability() {
    let f = fixture();
    f.router.trip_provider("x", "quota").await.unwrap();
    f.router.trip_provider("y", "quota").await.unwrap();

    let text = f.router.dispatch(ask("hi")).await;
    let vision = f
        .router
        .dispatch(ask("what is this").with_capability(Capability::Vision))
        .await;

    let text = text.failure().unwrap();
    let vision = vision.failure().unwrap();
    assert_eq!(text.message, DEFAULT_TEXT_EXHAUSTED);
    assert_eq!(vision.message, DEFAULT_VISION_EXHAUSTED);
    assert_ne!(text.message, vision.message);
    assert!(text.last_error.is_none());
    assert_eq!(f.x.call_count() + f.y.call_count(), 0);
}

#[tokio::test]
async fn test_vision_without_vision_models() {
    let y = Arc::new(ScriptedClient::new("y"));
    let mut registry = ModelRegistry::new();
    registry
        .register(
            ProviderSpec::new("y", "http://y")
                .with_api_key("key-yyyyyyyy")
                .with_model("modelC", 1, Capability::Text),
            y.clone(),
        )
        .unwrap();
    let messages = ExhaustionMessages {
        text: "text down".into(),
        vision: "vision down".into(),
    };
    let router = FailoverRouter::new(Arc::new(registry))
        .with_config(RouterConfig::default().with_messages(messages));

    let outcome = router
        .dispatch(ask("x-ray").with_capability(Capability::Vision))
        .await;
    assert_eq!(outcome.user_text(), "vision down");
    assert!(outcome.failure().unwrap().tried.is_empty());
    assert_eq!(y.call_count(), 0);
}

#[tokio::test]
async fn test_provider_without_credential_is_skipped() {
    let y = Arc::new(ScriptedClient::new("y"));
    let mut registry = ModelRegistry::new();
    registry
        .register_disabled(ProviderSpec::new("x", "http://x").with_model("modelA", 1, Capability::Text))
        .unwrap();
    registry
        .register(
            ProviderSpec::new("y", "http://y")
                .with_api_key("key-yyyyyyyy")
                .with_model("modelC", 2, Capability::Text),
            y.clone(),
        )
        .unwrap();
    let router = FailoverRouter::new(Arc::new(registry));

    let outcome = router.dispatch(ask("hi")).await;
    let completion = outcome.completion().unwrap();
    assert_eq!(completion.provider, "y");
    assert_eq!(
        completion.attempts[0].outcome,
        AttemptOutcome::Skipped {
            reason: SkipReason::NoCredential
        }
    );
}

#[tokio::test]
async fn test_system_prompt_and_params_passed_through() {
    let c = Arc::new(ScriptedClient::new("cerebras"));
    let mut registry = ModelRegistry::new();
    registry
        .register(
            ProviderSpec::new("cerebras", "http://c")
                .with_api_key("csk-1234567890")
                .with_model("qwen-thinking", 1, Capability::Text)
                .with_override(ModelOverride {
                    model: "qwen-thinking".into(),
                    max_tokens: Some(64_000),
                    temperature: Some(0.7),
                    top_p: Some(0.9),
                }),
            c.clone(),
        )
        .unwrap();
    let router = FailoverRouter::new(Arc::new(registry));

    router
        .dispatch(ask("hi").with_system_prompt("You are a medical assistant"))
        .await;
    let calls = c.calls();
    assert_eq!(calls[0].model, "qwen-thinking");
    assert_eq!(calls[0].max_tokens, Some(64_000));
    assert_eq!(calls[0].temperature, Some(0.7));
    assert_eq!(calls[0].top_p, Some(0.9));
    assert_eq!(calls[0].messages.len(), 2);
    assert_eq!(calls[0].messages[0].role, MessageRole::System);

    // An existing system message is kept as is
    let conversation = vec![Message::system("existing"), Message::user("hi")];
    router
        .dispatch(DispatchRequest::new(conversation).with_system_prompt("ignored"))
        .await;
    let calls = c.calls();
    assert_eq!(calls[1].messages.len(), 2);
    assert_eq!(calls[1].messages[0].content.text(), "existing");
}

#[tokio::test]
async fn test_preferred_model_tried_first() {
    let f = fixture();
    let outcome = f
        .router
        .dispatch(ask("hi").with_preferred_model("modelC"))
        .await;
    assert_eq!(outcome.completion().unwrap().model, "modelC");
    assert_eq!(f.x.call_count(), 0);
}

#[tokio::test]
async fn test_reasoning_forwarded() {
    let f = fixture();
    f.x.push_ok(CompletionResponse::text("modelA", "answer").with_reasoning("because"));
    let outcome = f.router.dispatch(ask("hi")).await;
    assert_eq!(outcome.completion().unwrap().reasoning.as_deref(), Some("because"));
}

#[tokio::test]
async fn test_timeout_is_transient_failure() {
    let f = fixture_with(
        0,
        ScriptedClient::new("x").with_delay(Duration::from_secs(5)),
        ScriptedClient::new("y"),
    );
    let router = f
        .router
        .with_config(RouterConfig::default().with_call_timeout(Duration::from_millis(50)));

    let outcome = router.dispatch(ask("hi")).await;
    let completion = outcome.completion().unwrap();
    assert_eq!(completion.provider, "y");
    assert!(matches!(
        completion.attempts[0].outcome,
        AttemptOutcome::Failed {
            class: ErrorClass::Transient,
            ..
        }
    ));
    let x = state(&router, "x").await;
    assert!(!x.breaker.is_blocked(f.clock.now()));
    assert_eq!(x.budget.used_today, 0);
}

#[tokio::test]
async fn test_cancelled_dispatch_leaves_state_untouched() {
    let f = fixture_with(
        100,
        ScriptedClient::new("x").with_delay(Duration::from_secs(5)),
        ScriptedClient::new("y"),
    );

    let result =
        tokio::time::timeout(Duration::from_millis(50), f.router.dispatch(ask("hi"))).await;
    assert!(result.is_err());
    assert_eq!(f.x.call_count(), 1);

    let x = state(&f.router, "x").await;
    assert_eq!(x.budget.used_today, 0);
    assert_eq!(x.successes_today, 0);
    assert_eq!(x.failures_today, 0);
    assert!(!x.breaker.is_blocked(f.clock.now()));
}

#[tokio::test]
async fn test_concurrent_dispatches_do_not_lose_usage() {
    let f = fixture_with(
        0,
        ScriptedClient::new("x").with_delay(Duration::from_millis(5)),
        ScriptedClient::new("y"),
    );
    let router = Arc::new(f.router);

    let handles: Vec<_> = (0..40)
        .map(|i| {
            let router = Arc::clone(&router);
            tokio::spawn(async move { router.dispatch(ask(&format!("q{i}"))).await })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().is_success());
    }

    let x = state(&router, "x").await;
    assert_eq!(x.budget.used_today, 40 * DEFAULT_REPLY_TOKENS as u64);
    assert_eq!(x.successes_today, 40);
}

#[tokio::test]
async fn test_list_models_with_availability() {
    let f = fixture_with(10, ScriptedClient::new("x"), ScriptedClient::new("y"));
    f.router.trip_provider("y", "manual").await.unwrap();

    let rows = f.router.list_models_with_availability().await;
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().filter(|r| r.provider == "x").all(|r| r.available));
    let c = rows.iter().find(|r| r.model == "modelC").unwrap();
    assert!(!c.available);
    assert_eq!(c.skip_reason, Some(SkipReason::CircuitOpen));

    f.router.dispatch(ask("hi")).await;
    let rows = f.router.list_models_with_availability().await;
    // every model of the exhausted provider reports the same reason
    let x_rows: Vec<_> = rows.iter().filter(|r| r.provider == "x").collect();
    assert_eq!(x_rows.len(), 2);
    for row in x_rows {
        assert!(!row.available);
        assert_eq!(row.skip_reason, Some(SkipReason::BudgetExhausted));
    }
}

#[tokio::test]
async fn test_manual_breaker_control() {
    let f = fixture();
    assert!(f.router.trip_provider("x", "maintenance").await.unwrap());
    assert!(!f.router.trip_provider("x", "again").await.unwrap());
    assert!(matches!(
        f.router.trip_provider("nope", "x").await,
        Err(Error::UnknownProvider(_))
    ));

    let status = f.router.provider_status().await;
    let x = status.iter().find(|s| s.name == "x").unwrap();
    assert_eq!(x.block_reason.as_deref(), Some("again"));
    assert!(x.blocked_until.is_some());

    f.router.reset_provider_block("x").await.unwrap();
    assert!(!state(&f.router, "x").await.breaker.is_blocked(f.clock.now()));
    assert!(f.router.reset_provider_block("nope").await.is_err());

    f.router.trip_provider("x", "a").await.unwrap();
    f.router.trip_provider("y", "b").await.unwrap();
    f.router.reset_provider_blocks().await;
    assert!(f.router.dispatch(ask("hi")).await.is_success());
}

#[tokio::test]
async fn test_status_hides_expired_block() {
    let f = fixture();
    f.router.trip_provider("x", "quota").await.unwrap();
    f.clock.advance(ChronoDuration::days(1));

    let status = f.router.provider_status().await;
    let x = status.iter().find(|s| s.name == "x").unwrap();
    assert!(x.blocked_until.is_none());
    assert!(x.block_reason.is_none());
}

#[tokio::test]
async fn test_token_usage_rows() {
    let f = fixture_with(500, ScriptedClient::new("x"), ScriptedClient::new("y"));
    f.x.push_ok(CompletionResponse::text("modelA", "a").with_total_tokens(120));
    f.router.dispatch(ask("hi")).await;

    let rows = f.router.token_usage().await;
    assert_eq!(
        rows[0],
        TokenUsageRow {
            provider: "x".into(),
            used_today: 120,
            daily_limit: 500,
        }
    );
    assert_eq!(rows[1].used_today, 0);
}

#[tokio::test]
async fn test_probe_provider() {
    let x = ScriptedClient::new("x").with_models(&["modelA", "modelB"]);
    let f = fixture_with(0, x, ScriptedClient::new("y"));
    assert_eq!(f.router.probe_provider("x").await.unwrap(), vec!["modelA", "modelB"]);
    assert!(f.router.probe_provider("y").await.unwrap().is_empty());
    assert!(matches!(
        f.router.probe_provider("nope").await,
        Err(Error::UnknownProvider(_))
    ));
}

#[test]
fn test_outcome_serialization() {
    let outcome = CallOutcome::Failure(DispatchFailure {
        message: "down".into(),
        capability: Capability::Vision,
        tried: vec![AttemptRecord {
            provider: "x".into(),
            model: "modelB".into(),
            started_at: morning(),
            outcome: AttemptOutcome::Skipped {
                reason: SkipReason::CircuitOpen,
            },
        }],
        last_error: None,
    });
    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["status"], "failure");
    assert_eq!(json["capability"], "vision");
    assert_eq!(json["tried"][0]["result"], "skipped");
    assert_eq!(json["tried"][0]["reason"], "circuit_open");
}

#[test]
fn test_dispatch_request_defaults() {
    let request: DispatchRequest =
        serde_json::from_str(r#"{"messages":[{"role":"user","content":"hi"}]}"#).unwrap();
    assert_eq!(request.capability, Capability::Text);
    assert!(request.preferred_model.is_none());
    assert!(request.system_prompt.is_none());
}
