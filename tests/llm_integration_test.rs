//! Live provider tests. Run with `--features api` and real keys in `.env`.

use std::sync::Arc;
use std::time::Duration;
use strictly_chess::{
    HttpTransport, MoveRequestPipeline, PlayerSeatConfig, ProviderRegistry, RulesOracle, Seat,
    StandardRules,
};
use tracing::instrument;

async fn first_move(provider: &str, model: &str, key_var: &str) {
    dotenvy::dotenv().ok();

    let api_key = std::env::var(key_var).unwrap_or_else(|_| panic!("{key_var} not set"));
    let rules = Arc::new(StandardRules::new());
    let pipeline = MoveRequestPipeline::new(
        Arc::new(ProviderRegistry::with_builtin()),
        Arc::new(HttpTransport::new(Duration::from_secs(120)).expect("Failed to build client")),
        rules.clone(),
    );
    let seat = PlayerSeatConfig::ai(provider, model).with_api_key(api_key);
    let position = rules.new_position(None).expect("Start position");

    let acquired = pipeline
        .acquire_move(&position, Seat::White, &seat)
        .await
        .expect("Failed to acquire move");

    assert!(rules.is_legal(&position, &acquired.token));
    eprintln!("{provider}/{model}: {} ({:?})", acquired.token, acquired.thoughts);
}

#[tokio::test]
#[cfg_attr(not(feature = "api"), ignore)]
#[instrument]
async fn test_anthropic_first_move() {
    first_move("anthropic", "claude-3-5-haiku-20241022", "ANTHROPIC_API_KEY").await;
}

#[tokio::test]
#[cfg_attr(not(feature = "api"), ignore)]
#[instrument]
async fn test_openai_first_move() {
    first_move("openai", "gpt-4o-mini", "OPENAI_API_KEY").await;
}

#[tokio::test]
#[cfg_attr(not(feature = "api"), ignore)]
#[instrument]
async fn test_gemini_first_move() {
    first_move("gemini", "gemini-2.0-flash", "GEMINI_API_KEY").await;
}
