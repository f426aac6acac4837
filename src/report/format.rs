//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the fitting code stays clean and testable
//! - output changes are localized

use crate::domain::{EpidemicParameters, FitResult, LogisticSeed, WeightRun};

/// Full run summary: parameters, fit quality, milestones and per-weight diagnostics.
pub fn format_fit_summary(result: &FitResult) -> String {
    let mut out = String::new();
    let p = &result.parameters;

    out.push_str("=== epi - SIR Curve Fit ===\n");
    if !result.label.is_empty() {
        out.push_str(&format!("Series: {}\n", result.label));
    }
    out.push_str(&format!(
        "Start: {} (trimmed {} flat day{}) | n={}\n",
        result.start_date,
        result.trimmed_days,
        if result.trimmed_days == 1 { "" } else { "s" },
        result.observed.len(),
    ));

    out.push_str("\nParameters:\n");
    out.push_str(&format_parameters(p));
    out.push_str(&format!("- R0   : {:.4}\n", result.r0));

    out.push_str("\nFit quality:\n");
    out.push_str(&format!(
        "- R2={:.4} RMSE={:.3} objective={:.4} weights={}\n",
        result.quality.r_squared, result.quality.rmse, result.objective, result.weights
    ));
    out.push_str(&format!(
        "- last observed={} next-day forecast={:.1}\n",
        fmt_count(result.observed.last().copied().unwrap_or(0.0)),
        result.next_day_forecast,
    ));

    out.push_str("\nMilestones:\n");
    out.push_str(&format!("- peak   : day {:>4} ({})\n", result.peak.day, result.peak.date));
    out.push_str(&format!("- decline: day {:>4} ({})\n", result.decline.day, result.decline.date));

    out.push_str("\nWeight diagnostics:\n");
    out.push_str(&format_runs(&result.runs, result.weights));
    out
}

/// One line per weight configuration; the selected one is starred.
pub fn format_runs(runs: &[WeightRun], chosen: crate::domain::WeightPair) -> String {
    let mut out = String::new();
    let mut starred = false;
    for run in runs {
        let mark = if !starred && run.converged && run.weights == chosen {
            starred = true;
            "*"
        } else {
            " "
        };
        out.push_str(
            format!(
                "{mark} {:<12} cost={:<14} iters={:<6} {}\n",
                run.weights.to_string(),
                fmt_cost(run.cost),
                run.iterations,
                run.status,
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// Seed triple plus the parameters derived from it.
pub fn format_seed(seed: &LogisticSeed) -> String {
    let mut out = String::new();
    out.push_str("Logistic seed:\n");
    out.push_str(&format!("- K={:.3} r={:.5} A={:.4}\n", seed.k, seed.r, seed.a));
    out.push_str(&format!(
        "- indices: ({}, {}, {})\n",
        seed.indices.0, seed.indices.1, seed.indices.2
    ));
    out.push_str("\nStarting parameters:\n");
    out.push_str(&format_parameters(&seed.to_parameters()));
    out
}

/// `day value` lines for a simulated series.
pub fn format_series(values: &[f64]) -> String {
    let mut out = String::new();
    for (day, v) in values.iter().enumerate() {
        out.push_str(&format!("{day:>5} {v:.3}\n"));
    }
    out
}

fn format_parameters(p: &EpidemicParameters) -> String {
    format!(
        "- beta : {:.6}\n- gamma: {:.6}\n- N    : {}\n- I0   : {:.3}\n",
        p.beta,
        p.gamma,
        fmt_count(p.population),
        p.initial_infected
    )
}

fn fmt_cost(v: f64) -> String {
    if v.is_finite() { format!("{v:.6}") } else { "inf".to_string() }
}

/// Whole number with thousands separators.
fn fmt_count(v: f64) -> String {
    if !v.is_finite() {
        return v.to_string();
    }
    let digits = format!("{:.0}", v.abs());
    let mut out = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if v < -0.5 { format!("-{out}") } else { out }
}
