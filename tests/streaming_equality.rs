//! Streamed chunk concatenation equals the final reasoning (spec §8 scenario
//! 5, P8) — exercised through the public executor API rather than an
//! in-module stub, covering the same boundary the `/ws` handler depends on.

use std::sync::Arc;

use async_trait::async_trait;

use cloudguild::catalog::AgentCatalog;
use cloudguild::cost::CostTracker;
use cloudguild::error::ProviderError;
use cloudguild::executor::{execute_task_streaming, ExecutorContext, TaskRequest};
use cloudguild::history::HistoryStore;
use cloudguild::provider::{ChunkStream, GenerateOptions, Provider, ProviderMap};

const CATALOG: &str = r#"
[[guilds]]
name = "web"
charter = "ship"

[[guilds.members]]
id = "websmith"
title = "Web Smith"

[guilds.members.brain]
routers = ["stub"]
"#;

struct ChunkedProvider;

#[async_trait]
impl Provider for ChunkedProvider {
    fn id(&self) -> &str {
        "stub"
    }

    async fn generate(&self, _prompt: &str, _options: &GenerateOptions) -> Result<String, ProviderError> {
        Ok("Hello world".to_string())
    }

    async fn generate_stream(&self, _prompt: &str, _options: &GenerateOptions) -> Result<ChunkStream, ProviderError> {
        let chunks = vec!["Hel".to_string(), "lo ".to_string(), "world".to_string()];
        Ok(Box::pin(futures_util::stream::iter(chunks.into_iter().map(Ok))))
    }

    async fn health_check(&self) -> bool {
        true
    }
}

#[tokio::test]
async fn streamed_chunks_concatenate_to_the_complete_frame_reasoning() {
    let catalog = AgentCatalog::load_from_str(CATALOG).unwrap();
    let mut providers = ProviderMap::new();
    providers.insert("stub".to_string(), Arc::new(ChunkedProvider) as Arc<dyn Provider>);
    let history = HistoryStore::new();
    let cost_tracker = CostTracker::new();
    let ctx = ExecutorContext {
        catalog: &catalog,
        providers: &providers,
        history: &history,
        cost_tracker: &cost_tracker,
        audit_url: None,
    };

    let (tx, mut rx) = tokio::sync::mpsc::channel(16);
    let response = execute_task_streaming(
        &ctx,
        TaskRequest {
            agent_id: "websmith".to_string(),
            task_text: "say hello".to_string(),
            context: None,
            dry_run: false,
        },
        tx,
    )
    .await
    .unwrap();

    let mut received = String::new();
    while let Some(chunk) = rx.recv().await {
        received.push_str(&chunk);
    }

    assert_eq!(received, "Hello world");
    assert_eq!(response.model_reasoning, "Hello world");
    assert!(response.succeeded);
}
