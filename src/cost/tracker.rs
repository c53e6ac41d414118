//! Cost tracker (C2).
//!
//! Records per-call cost entries in a bounded FIFO ring, aggregates them by
//! provider/agent/guild, and exports the full set as CSV (spec §4.8, P5, P9).

use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::cost::pricing::calculate_cost;

/// The tracker bounds total retained entries to this many (spec §3, P9).
pub const MAX_ENTRIES: usize = 10_000;

#[derive(Debug, Clone, Serialize)]
pub struct TokenCounts {
    pub input: usize,
    pub output: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CostEntry {
    pub id: Uuid,
    pub agent_id: String,
    pub guild: String,
    pub provider: String,
    pub model: String,
    pub task_text: String,
    pub tokens: TokenCounts,
    pub duration_ms: u64,
    pub success: bool,
    pub cost_usd: f64,
    pub timestamp: DateTime<Utc>,
}

/// Input to `CostTracker::record`; the tracker computes `cost_usd` itself via
/// the pricing table so callers never fabricate a price.
pub struct CostRecordInput {
    pub agent_id: String,
    pub guild: String,
    pub provider: String,
    pub model: String,
    pub task_text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
    pub success: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProviderAggregate {
    pub cost: f64,
    pub tasks: u64,
    pub tokens: TokenCountsAgg,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TokenCountsAgg {
    pub i: usize,
    pub o: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CostSummary {
    pub total_cost: f64,
    pub total_tasks: u64,
    pub avg_cost_per_task: f64,
    pub by_provider: HashMap<String, ProviderAggregate>,
    pub by_agent: HashMap<String, ProviderAggregate>,
    pub by_guild: HashMap<String, ProviderAggregate>,
    pub recent_entries: Vec<CostEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct SummaryFilter {
    pub agent_id: Option<String>,
    pub guild: Option<String>,
    pub limit: Option<usize>,
}

/// Bounded ring of retained [`CostEntry`] values, behind a `Mutex` so record
/// and query are serializable (spec §4.8 concurrency note).
#[derive(Default)]
pub struct CostTracker {
    entries: Mutex<VecDeque<CostEntry>>,
}

impl CostTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, input: CostRecordInput) -> CostEntry {
        let cost_usd = calculate_cost(&input.provider, &input.model, input.input_tokens, input.output_tokens);
        let entry = CostEntry {
            id: Uuid::new_v4(),
            agent_id: input.agent_id,
            guild: input.guild,
            provider: input.provider,
            model: input.model,
            task_text: input.task_text,
            tokens: TokenCounts {
                input: input.input_tokens,
                output: input.output_tokens,
                total: input.input_tokens + input.output_tokens,
            },
            duration_ms: input.duration_ms,
            success: input.success,
            cost_usd,
            timestamp: Utc::now(),
        };

        let mut guard = self.entries.lock().unwrap();
        if guard.len() >= MAX_ENTRIES {
            guard.pop_front();
        }
        guard.push_back(entry.clone());
        entry
    }

    pub fn summary(&self, filter: &SummaryFilter) -> CostSummary {
        let guard = self.entries.lock().unwrap();
        let matches: Vec<&CostEntry> = guard
            .iter()
            .filter(|e| filter.agent_id.as_deref().map_or(true, |a| a == e.agent_id))
            .filter(|e| filter.guild.as_deref().map_or(true, |g| g == e.guild))
            .collect();

        let total_cost: f64 = matches.iter().map(|e| e.cost_usd).sum();
        let total_tasks = matches.len() as u64;
        let avg_cost_per_task = if total_tasks > 0 { total_cost / total_tasks as f64 } else { 0.0 };

        let mut by_provider: HashMap<String, ProviderAggregate> = HashMap::new();
        let mut by_agent: HashMap<String, ProviderAggregate> = HashMap::new();
        let mut by_guild: HashMap<String, ProviderAggregate> = HashMap::new();

        for e in &matches {
            accumulate(&mut by_provider, &e.provider, e);
            accumulate(&mut by_agent, &e.agent_id, e);
            accumulate(&mut by_guild, &e.guild, e);
        }

        let limit = filter.limit.unwrap_or(10);
        let recent_entries = matches.into_iter().rev().take(limit).cloned().collect();

        CostSummary {
            total_cost,
            total_tasks,
            avg_cost_per_task,
            by_provider,
            by_agent,
            by_guild,
            recent_entries,
        }
    }

    /// RFC-4180 CSV export of every retained entry (spec §4.8).
    pub fn export_csv(&self) -> Result<Vec<u8>, csv::Error> {
        let guard = self.entries.lock().unwrap();
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record([
            "id",
            "agentId",
            "guild",
            "provider",
            "model",
            "task",
            "input_tokens",
            "output_tokens",
            "total_tokens",
            "duration_ms",
            "success",
            "cost",
            "timestamp",
        ])?;
        for e in guard.iter() {
            writer.write_record([
                e.id.to_string(),
                e.agent_id.clone(),
                e.guild.clone(),
                e.provider.clone(),
                e.model.clone(),
                e.task_text.clone(),
                e.tokens.input.to_string(),
                e.tokens.output.to_string(),
                e.tokens.total.to_string(),
                e.duration_ms.to_string(),
                e.success.to_string(),
                format!("{:.6}", e.cost_usd),
                e.timestamp.to_rfc3339(),
            ])?;
        }
        let mut inner = writer.into_inner().map_err(|e| e.into_error())?;
        inner.flush().ok();
        Ok(inner)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn accumulate(map: &mut HashMap<String, ProviderAggregate>, key: &str, entry: &CostEntry) {
    let agg = map.entry(key.to_string()).or_default();
    agg.cost += entry.cost_usd;
    agg.tasks += 1;
    agg.tokens.i += entry.tokens.input;
    agg.tokens.o += entry.tokens.output;
    agg.tokens.total += entry.tokens.total;
}
