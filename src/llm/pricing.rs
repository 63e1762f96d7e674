//! Per-model pricing and the duration/cost summary shown on success.

use std::time::Duration;

use crate::config::CostDisplay;

use super::response::Usage;

/// USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub input_per_million_tokens: f64,
    pub output_per_million_tokens: f64,
}

const fn price(input: f64, output: f64) -> ModelPricing {
    ModelPricing {
        input_per_million_tokens: input,
        output_per_million_tokens: output,
    }
}

/// Known model prices, matched by longest prefix so dated ids resolve.
const PRICING: &[(&str, ModelPricing)] = &[
    ("gpt-4o-mini", price(0.15, 0.60)),
    ("gpt-4o", price(2.50, 10.00)),
    ("gpt-4.1-nano", price(0.10, 0.40)),
    ("gpt-4.1-mini", price(0.40, 1.60)),
    ("gpt-4.1", price(2.00, 8.00)),
    ("gpt-5-nano", price(0.05, 0.40)),
    ("gpt-5-mini", price(0.25, 2.00)),
    ("gpt-5", price(1.25, 10.00)),
    ("o1-mini", price(1.10, 4.40)),
    ("o1", price(15.00, 60.00)),
    ("o3-mini", price(1.10, 4.40)),
    ("o3", price(2.00, 8.00)),
    ("o4-mini", price(1.10, 4.40)),
    ("claude-3.5-sonnet", price(3.00, 15.00)),
    ("claude-3.7-sonnet", price(3.00, 15.00)),
    ("claude-sonnet-4", price(3.00, 15.00)),
    ("gemini-2.0-flash", price(0.10, 0.40)),
    ("gemini-2.5-pro", price(1.25, 10.00)),
];

/// Price for `model`, if known.
pub fn pricing_for(model: &str) -> Option<ModelPricing> {
    PRICING
        .iter()
        .filter(|(prefix, _)| model.starts_with(prefix))
        .max_by_key(|(prefix, _)| prefix.len())
        .map(|(_, pricing)| *pricing)
}

/// Estimated USD cost. `None` when usage is missing or the model is unknown.
pub fn estimate_cost(model: &str, usage: Option<Usage>) -> Option<f64> {
    let usage = usage?;
    let pricing = pricing_for(model)?;
    Some(
        usage.input_tokens as f64 * pricing.input_per_million_tokens / 1_000_000.0
            + usage.output_tokens as f64 * pricing.output_per_million_tokens / 1_000_000.0,
    )
}

/// Smallest cost compact mode can show at four decimal places.
const MIN_COMPACT_COST: f64 = 0.0001;

/// `850ms` under a second, `1.2s` otherwise.
pub fn format_duration(duration: Duration) -> String {
    if duration < Duration::from_secs(1) {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

/// One-line summary of how long generation took and what it cost.
pub fn format_stats(
    duration: Duration,
    cost: Option<f64>,
    usage: Option<Usage>,
    mode: CostDisplay,
) -> String {
    let elapsed = format_duration(duration);
    match (mode, cost) {
        (CostDisplay::Off, _) | (_, None) => elapsed,
        (CostDisplay::Compact, Some(cost)) if cost > 0.0 && cost < MIN_COMPACT_COST => {
            format!("{elapsed} · <${:.4}", MIN_COMPACT_COST)
        }
        (CostDisplay::Compact, Some(cost)) => format!("{elapsed} · ${cost:.4}"),
        (CostDisplay::Verbose, Some(cost)) => match usage {
            Some(usage) => format!(
                "{elapsed} · ${cost:.6} · {} in / {} out tokens",
                usage.input_tokens, usage.output_tokens
            ),
            None => format!("{elapsed} · ${cost:.6}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USAGE: Usage = Usage {
        input_tokens: 100,
        output_tokens: 20,
    };

    #[test]
    fn test_longest_prefix_wins() {
        assert_eq!(pricing_for("gpt-4o-mini"), Some(price(0.15, 0.60)));
        assert_eq!(pricing_for("gpt-4o-2024-08-06"), Some(price(2.50, 10.00)));
        assert_eq!(pricing_for("gpt-5-mini"), Some(price(0.25, 2.00)));
        assert_eq!(pricing_for("o3-mini-high"), Some(price(1.10, 4.40)));
        assert!(pricing_for("llama-3").is_none());
    }

    #[test]
    fn test_estimate_cost() {
        let cost = estimate_cost("gpt-4o", Some(USAGE)).unwrap();
        assert!((cost - 0.00045).abs() < 1e-12);
    }

    #[test]
    fn test_no_usage_means_no_cost() {
        assert!(estimate_cost("gpt-4o", None).is_none());
    }

    #[test]
    fn test_unknown_model_means_no_cost() {
        assert!(estimate_cost("mystery-model", Some(USAGE)).is_none());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(850)), "850ms");
        assert_eq!(format_duration(Duration::from_millis(1_240)), "1.2s");
        assert_eq!(format_duration(Duration::from_secs(12)), "12.0s");
    }

    #[test]
    fn test_format_stats_modes() {
        let duration = Duration::from_millis(1_500);
        let cost = Some(0.000_45);

        assert_eq!(format_stats(duration, cost, Some(USAGE), CostDisplay::Off), "1.5s");
        assert_eq!(
            format_stats(duration, cost, Some(USAGE), CostDisplay::Compact),
            "1.5s · $0.0004"
        );
        assert_eq!(
            format_stats(duration, cost, Some(USAGE), CostDisplay::Verbose),
            "1.5s · $0.000450 · 100 in / 20 out tokens"
        );
    }

    #[test]
    fn test_compact_cost_below_display_precision() {
        let usage = Usage {
            input_tokens: 300,
            output_tokens: 15,
        };
        let cost = estimate_cost("gpt-5-nano", Some(usage));
        assert_eq!(
            format_stats(Duration::from_millis(900), cost, Some(usage), CostDisplay::Compact),
            "900ms · <$0.0001"
        );
        assert_eq!(
            format_stats(Duration::from_millis(900), Some(0.0), None, CostDisplay::Compact),
            "900ms · $0.0000"
        );
    }

    #[test]
    fn test_format_stats_without_cost_shows_duration_only() {
        assert_eq!(
            format_stats(Duration::from_millis(300), None, None, CostDisplay::Verbose),
            "300ms"
        );
    }
}
