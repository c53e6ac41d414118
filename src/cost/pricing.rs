//! Pricing table (C1).
//!
//! Static per-(provider, model) input/output cost rates. Lookup matches the
//! longest `model_prefix` prefix of the given model string; a miss returns
//! zero cost rather than fabricating a price (spec §4.8, P6).

/// `{provider, model_prefix, input_per_1k_usd, output_per_1k_usd}` (spec §3).
#[derive(Debug, Clone)]
pub struct PricingEntry {
    pub provider: &'static str,
    pub model_prefix: &'static str,
    pub input_per_1k_usd: f64,
    pub output_per_1k_usd: f64,
}

/// Known rates as of this writing. The `local` provider is intentionally
/// absent: it is fixed at zero cost by `lookup_rate` regardless of model.
const TABLE: &[PricingEntry] = &[
    PricingEntry { provider: "openai", model_prefix: "gpt-4o", input_per_1k_usd: 0.0025, output_per_1k_usd: 0.01 },
    PricingEntry { provider: "openai", model_prefix: "gpt-4", input_per_1k_usd: 0.03, output_per_1k_usd: 0.06 },
    PricingEntry { provider: "openai", model_prefix: "gpt-3.5", input_per_1k_usd: 0.0005, output_per_1k_usd: 0.0015 },
    PricingEntry { provider: "anthropic", model_prefix: "claude-opus", input_per_1k_usd: 0.015, output_per_1k_usd: 0.075 },
    PricingEntry { provider: "anthropic", model_prefix: "claude-sonnet", input_per_1k_usd: 0.003, output_per_1k_usd: 0.015 },
    PricingEntry { provider: "anthropic", model_prefix: "claude-haiku", input_per_1k_usd: 0.0008, output_per_1k_usd: 0.004 },
    PricingEntry { provider: "gemini", model_prefix: "gemini-1.5-pro", input_per_1k_usd: 0.0005, output_per_1k_usd: 0.0005 },
    PricingEntry { provider: "gemini", model_prefix: "gemini-1.5-flash", input_per_1k_usd: 0.000075, output_per_1k_usd: 0.0003 },
    PricingEntry { provider: "grok", model_prefix: "grok-4", input_per_1k_usd: 0.005, output_per_1k_usd: 0.015 },
];

/// Find the longest `model_prefix` match for `(provider, model)`. Returns
/// `(input_per_1k, output_per_1k)`, both `0.0` for `local` or any unknown
/// combination (spec §4.8: "do not fabricate costs for unknown models").
pub fn lookup_rate(provider: &str, model: &str) -> (f64, f64) {
    if provider == "local" {
        return (0.0, 0.0);
    }

    TABLE
        .iter()
        .filter(|e| e.provider == provider && model.starts_with(e.model_prefix))
        .max_by_key(|e| e.model_prefix.len())
        .map(|e| (e.input_per_1k_usd, e.output_per_1k_usd))
        .unwrap_or((0.0, 0.0))
}

/// `cost = input_tokens/1000 × input_rate + output_tokens/1000 × output_rate` (spec §4.8, P6).
pub fn calculate_cost(provider: &str, model: &str, input_tokens: usize, output_tokens: usize) -> f64 {
    let (input_rate, output_rate) = lookup_rate(provider, model);
    (input_tokens as f64 / 1000.0) * input_rate + (output_tokens as f64 / 1000.0) * output_rate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_is_always_zero() {
        assert_eq!(calculate_cost("local", "anything", 1_000_000, 1_000_000), 0.0);
    }

    #[test]
    fn unknown_model_is_zero() {
        assert_eq!(calculate_cost("openai", "totally-unknown-model", 1000, 1000), 0.0);
    }

    #[test]
    fn matches_longest_prefix() {
        // "gpt-4o" should win over "gpt-4" for a gpt-4o model string.
        let (input, _) = lookup_rate("openai", "gpt-4o-mini");
        assert_eq!(input, 0.0025);
    }

    #[test]
    fn formula_matches_spec_example() {
        // (openai, gpt-4, 1000 in, 1000 out) => 0.03 + 0.06 = 0.09 (spec §8 scenario 4).
        let cost = calculate_cost("openai", "gpt-4", 1000, 1000);
        assert!((cost - 0.09).abs() < 1e-9);
    }

    #[test]
    fn gemini_leg_matches_spec_example() {
        // (gemini, gemini-1.5-pro, 1000 in, 1000 out) => 0.001 (spec §8 scenario 4).
        let cost = calculate_cost("gemini", "gemini-1.5-pro", 1000, 1000);
        assert!((cost - 0.001).abs() < 1e-9);
    }
}
