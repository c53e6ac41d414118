//! Cost aggregation across providers (spec §8 scenario 4, P5, P6).

use cloudguild::cost::{CostRecordInput, CostTracker, SummaryFilter};

fn record(tracker: &CostTracker, provider: &str, model: &str) {
    tracker.record(CostRecordInput {
        agent_id: "websmith".to_string(),
        guild: "web".to_string(),
        provider: provider.to_string(),
        model: model.to_string(),
        task_text: "build the app".to_string(),
        input_tokens: 1000,
        output_tokens: 1000,
        duration_ms: 50,
        success: true,
    });
}

#[test]
fn three_providers_aggregate_to_the_spec_example_total() {
    let tracker = CostTracker::new();
    record(&tracker, "openai", "gpt-4");
    record(&tracker, "gemini", "gemini-1.5-pro");
    record(&tracker, "local", "anything");

    let summary = tracker.summary(&SummaryFilter::default());

    assert_eq!(summary.total_tasks, 3);
    assert!((summary.total_cost - 0.091).abs() < 1e-9);
    assert!((summary.avg_cost_per_task - 0.091 / 3.0).abs() < 1e-9);

    let mut providers: Vec<&String> = summary.by_provider.keys().collect();
    providers.sort();
    assert_eq!(providers, vec!["gemini", "local", "openai"]);

    assert_eq!(summary.by_provider["local"].cost, 0.0);
    assert!((summary.by_provider["openai"].cost - 0.09).abs() < 1e-9);
}

#[test]
fn filtering_by_agent_narrows_the_summary() {
    let tracker = CostTracker::new();
    tracker.record(CostRecordInput {
        agent_id: "websmith".to_string(),
        guild: "web".to_string(),
        provider: "openai".to_string(),
        model: "gpt-4".to_string(),
        task_text: "t".to_string(),
        input_tokens: 1000,
        output_tokens: 1000,
        duration_ms: 10,
        success: true,
    });
    tracker.record(CostRecordInput {
        agent_id: "crafter".to_string(),
        guild: "web".to_string(),
        provider: "openai".to_string(),
        model: "gpt-4".to_string(),
        task_text: "t".to_string(),
        input_tokens: 1000,
        output_tokens: 1000,
        duration_ms: 10,
        success: true,
    });

    let summary = tracker.summary(&SummaryFilter {
        agent_id: Some("websmith".to_string()),
        guild: None,
        limit: None,
    });

    assert_eq!(summary.total_tasks, 1);
}
