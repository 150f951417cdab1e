//! Plain-text rendering of an evaluation report.

use super::report::{Branch, EvaluationReport, RunOutcome, Savings};
use minijinja::{Environment, context};
use serde::Serialize;

const REPORT_TEMPLATE: &str = r#"Question: {{ question }}
Model: {{ model }} | documents: {{ documents }} | target ratio: {{ target_ratio }}
{% for run in runs %}
[{{ run.label }}]
{% if run.error -%}
  error: {{ run.error }}
{%- else -%}
  strategy: {{ run.strategy }} (achieved ratio {{ run.achieved_ratio }})
  tokens: {{ run.prompt_tokens }} prompt + {{ run.completion_tokens }} completion = {{ run.total_tokens }}
  cost: ${{ run.cost }}
  latency: {{ run.latency_ms }} ms
  answer: {{ run.answer }}{% if run.truncated %} [truncated at max_tokens]{% endif %}
{%- endif %}
{% endfor %}
Savings ({{ metric }}): {{ savings }}
{%- if similarity %}
Answer similarity: {{ similarity }}{% if exact_match %} (exact match){% endif %}
{%- endif %}
"#;

/// Pre-formatted view of one branch so the template does no number formatting.
#[derive(Serialize)]
struct BranchView {
    label: String,
    strategy: String,
    achieved_ratio: String,
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
    cost: String,
    latency_ms: u64,
    answer: String,
    truncated: bool,
    error: Option<String>,
}

impl BranchView {
    fn new(branch: Branch, outcome: &RunOutcome) -> Self {
        match outcome {
            RunOutcome::Completed(record) => Self {
                label: branch.to_string(),
                strategy: record.strategy.clone(),
                achieved_ratio: format!("{:.3}", record.compression.achieved_ratio),
                prompt_tokens: record.usage.prompt_tokens,
                completion_tokens: record.usage.completion_tokens,
                total_tokens: record.usage.total_tokens,
                cost: format!("{:.5}", record.usage.cost_usd),
                latency_ms: record.latency_ms,
                answer: record.answer.clone(),
                truncated: record.truncated,
                error: None,
            },
            RunOutcome::Failed(err) => Self {
                label: branch.to_string(),
                strategy: String::new(),
                achieved_ratio: String::new(),
                prompt_tokens: 0,
                completion_tokens: 0,
                total_tokens: 0,
                cost: String::new(),
                latency_ms: 0,
                answer: String::new(),
                truncated: false,
                error: Some(format!("[{}/{}] {err}", err.stage(), err.code())),
            },
        }
    }
}

/// Render a human-readable summary of `report`.
pub fn render_text(report: &EvaluationReport) -> Result<String, minijinja::Error> {
    let mut env = Environment::new();
    env.add_template("report", REPORT_TEMPLATE)?;

    let runs = [Branch::Baseline, Branch::Compressed]
        .map(|branch| BranchView::new(branch, report.outcome(branch)));
    let savings = match report.savings {
        Savings::Defined { fraction } => format!("{:.2}%", fraction * 100.0),
        Savings::Undefined { reason } => format!("undefined ({reason})"),
    };
    let (similarity, exact_match) = report
        .comparison
        .map(|c| (Some(format!("{:.2}", c.similarity)), c.exact_match))
        .unwrap_or((None, false));

    env.get_template("report")?.render(context! {
        question => &report.question,
        model => &report.model,
        documents => report.documents,
        target_ratio => report.target_ratio,
        metric => report.metric.label(),
        runs => runs,
        savings => savings,
        similarity => similarity,
        exact_match => exact_match,
    })
}
