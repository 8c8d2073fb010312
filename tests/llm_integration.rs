//! Integration tests against a live judge backend.
//!
//! These tests make real API calls.
//! Run with: JUDGE_API_KEY=your_key cargo test --test llm_integration -- --ignored
//! (JUDGE_API_BASE and JUDGE_MODEL select the endpoint and model.)

use std::sync::Arc;

use longchain_judge::config::JudgeConfig;
use longchain_judge::judge::{Judge, JudgeInput, LlmJudge};
use longchain_judge::llm::{ChatCompletionsClient, GenerationRequest, LlmProvider, Message};

fn live_config() -> JudgeConfig {
    let config = JudgeConfig::from_env().expect("judge environment should be valid");
    assert!(
        config.api_key.is_some(),
        "JUDGE_API_KEY environment variable must be set for integration tests"
    );
    config.with_max_retries(3)
}

fn create_test_client(config: &JudgeConfig) -> ChatCompletionsClient {
    ChatCompletionsClient::from_config(config).expect("client should build")
}

#[tokio::test]
#[ignore] // Run with: cargo test --test llm_integration -- --ignored
async fn test_simple_generation() {
    let config = live_config();
    let client = create_test_client(&config);

    let request = GenerationRequest::new(
        config.model.clone(),
        vec![
            Message::system("You are a helpful assistant. Reply concisely."),
            Message::user("What is 2 + 2? Reply with just the number."),
        ],
    )
    .with_max_tokens(10)
    .with_temperature(0.0);

    let response = client.generate(request).await;
    assert!(response.is_ok(), "Generation failed: {:?}", response.err());

    let response = response.expect("Should have response");
    let content = response.first_content().expect("Should have content");
    assert!(
        content.contains('4'),
        "Response should contain '4', got: {}",
        content
    );
    assert!(response.usage.total_tokens > 0, "Should have token usage");
}

#[tokio::test]
#[ignore]
async fn test_judge_correct_prediction() {
    let config = live_config();
    let judge = LlmJudge::new(Arc::new(create_test_client(&config)), config);

    let input = JudgeInput::new(
        "What is the capital of France?",
        "Paris",
        "The capital of France is Paris.",
    );
    let verdict = judge.judge(&input).await.expect("judge should answer");

    assert!(
        verdict.score >= 0.9,
        "Expected a high score, got {:?}",
        verdict
    );
}

#[tokio::test]
#[ignore]
async fn test_judge_wrong_prediction() {
    let config = live_config();
    let judge = LlmJudge::new(Arc::new(create_test_client(&config)), config);

    let input = JudgeInput::new(
        "Find the price of the cheapest listed flight and its airline.",
        r#"{"price": 120, "airline": "Iberia"}"#,
        "The cheapest flight costs $310 with Lufthansa.",
    );
    let verdict = judge.judge(&input).await.expect("judge should answer");

    assert!(
        verdict.score <= 0.1,
        "Expected a low score, got {:?}",
        verdict
    );
}
