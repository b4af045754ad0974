//! Response renderer: template substitution and result fragments.
//!
//! The rendered page is always the deployment's static template with a
//! single placeholder marker replaced by a computed fragment. Fragments
//! are produced by pure formatting functions from a prediction result
//! or a pipeline error; anything that may echo user input is
//! HTML-escaped first, so attacker-controlled markup never reflects
//! into the page.

use crate::domain::{PipelineError, PredictedLabel, PredictionResult};

/// Substitute the unique placeholder marker with a fragment.
///
/// Exactly one literal substitution is performed; every other byte of
/// the template passes through unchanged.
///
/// # Errors
/// Returns `TemplateError` when the marker is absent, which signals a
/// deployment packaging defect rather than a runtime condition.
pub fn render(template: &str, marker: &str, fragment: &str) -> Result<String, PipelineError> {
    if !template.contains(marker) {
        return Err(PipelineError::TemplateError {
            marker: marker.to_string(),
        });
    }
    Ok(template.replacen(marker, fragment, 1))
}

/// Minimal document used when the template itself is broken.
///
/// The in-page error contract still holds: the client gets a rendered
/// page with the fragment, while the deployment fault is logged.
#[must_use]
pub fn fallback_page(fragment: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"></head><body>{fragment}</body></html>\n"
    )
}

/// Escape text for inclusion in HTML content.
#[must_use]
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Two-decimal formatting with thousands separators (45000 → 45,000.00).
fn format_amount(value: f64) -> String {
    let formatted = format!("{value:.2}");
    let (sign, rest) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted.as_str()),
    };
    let (int_part, dec_part) = rest.split_once('.').unwrap_or((rest, "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{sign}{grouped}.{dec_part}")
}

/// Format a successful prediction as an HTML fragment.
#[must_use]
pub fn success_fragment(result: &PredictionResult) -> String {
    match &result.label {
        PredictedLabel::Value(value) => format!(
            "<h3>El valor predicho es: <span style='color:green;'>${}</span></h3>",
            format_amount(*value)
        ),
        PredictedLabel::Class(label) => {
            let prob_txt = result
                .positive_probability()
                .map(|p| format!(" con probabilidad {:.1}%", p * 100.0))
                .unwrap_or_default();
            format!(
                "<h3>Resultado: <span style='color:green;'>{}</span>{}</h3>",
                escape_html(label),
                prob_txt
            )
        }
    }
}

/// Format a pipeline error as an HTML fragment.
///
/// The error detail is shown as-is after escaping: this is
/// operator-facing tooling, and the messages carry no secrets.
#[must_use]
pub fn error_fragment(error: &PipelineError) -> String {
    format!(
        "<h3 style='color:red;'>Error: {}</h3>",
        escape_html(&error.to_string())
    )
}
