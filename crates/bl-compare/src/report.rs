//! Self-contained HTML report with embedded Plotly.js charts, plus a JSON
//! dump of both sample sets.
//!
//! One-dimensional objectives get the true curve with both runs overlaid;
//! higher-dimensional ones get a scatter of the sampled locations. An
//! internet connection is needed on first load to fetch Plotly.js.

use core::fmt::Write as _;
use std::path::{Path, PathBuf};

use bl_types::BoResult;

use crate::comparison::{Comparison, SampleSet};

pub const HTML_FILE: &str = "comparison.html";
pub const JSON_FILE: &str = "samples.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub html: PathBuf,
    pub json: PathBuf,
}

/// Write the HTML report and JSON dump into `dir`, creating it if needed.
pub fn write_report(comparison: &Comparison, dir: impl AsRef<Path>) -> BoResult<ReportPaths> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let paths = ReportPaths {
        html: dir.join(HTML_FILE),
        json: dir.join(JSON_FILE),
    };
    std::fs::write(&paths.html, build_html(comparison))?;
    std::fs::write(&paths.json, serde_json::to_string_pretty(comparison)?)?;
    Ok(paths)
}

pub fn build_html(comparison: &Comparison) -> String {
    let mut html = String::with_capacity(8192);
    let name = escape_js(comparison.function.as_str());

    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Loop comparison: {name}</title>
<script src="https://cdn.plot.ly/plotly-2.35.2.min.js"></script>
<style>
  body {{ font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
         background: #f5f6fa; color: #2c3e50; padding: 24px; }}
  h1 {{ text-align: center; margin-bottom: 8px; font-size: 1.8em; }}
  .subtitle {{ text-align: center; color: #7f8c8d; margin-bottom: 24px; }}
  .chart {{ background: #fff; border-radius: 8px; box-shadow: 0 2px 8px rgba(0,0,0,0.08);
            margin-bottom: 24px; padding: 16px; }}
  .chart-title {{ font-size: 1.1em; font-weight: 600; margin-bottom: 8px; }}
  table {{ margin: 0 auto 24px; border-collapse: collapse; }}
  td, th {{ padding: 4px 12px; border-bottom: 1px solid #ddd; }}
</style>
</head>
<body>
<h1>Manual vs built-in loop: {name}</h1>
<p class="subtitle">{init} initial points &middot; {iters} iterations &middot; runs {agree}</p>
"#,
        init = comparison.initial_count,
        iters = comparison.num_iterations,
        agree = if comparison.runs_agree() {
            "agree"
        } else {
            "differ"
        },
    );

    write_summary_table(&mut html, comparison);

    html.push_str("<div class=\"chart\"><div class=\"chart-title\">Samples</div><div id=\"samples\"></div></div>\n");
    if comparison.truth.is_some() {
        write_curve_chart(&mut html, comparison);
    } else {
        write_scatter_chart(&mut html, comparison);
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn write_summary_table(html: &mut String, comparison: &Comparison) {
    let (min_x, min_y) = &comparison.global_minimum;
    html.push_str("<table>\n<tr><th>Run</th><th>Best x</th><th>Best y</th></tr>\n");
    let runs = [("Manual", &comparison.manual), ("Built-in", &comparison.builtin)];
    for (label, samples) in runs {
        let _ = writeln!(
            html,
            "<tr><td>{label}</td><td>{:?}</td><td>{:.6}</td></tr>",
            samples.best_x, samples.best_y
        );
    }
    let _ = writeln!(
        html,
        "<tr><td>Global minimum</td><td>{min_x:?}</td><td>{min_y:.6}</td></tr>\n</table>"
    );
}

/// Split a sample set into (initial, acquired) coordinate columns.
fn split_column(samples: &SampleSet, initial: usize, axis: usize) -> (Vec<f64>, Vec<f64>) {
    let column: Vec<f64> = samples.x.iter().map(|p| p[axis]).collect();
    let cut = initial.min(column.len());
    (column[..cut].to_vec(), column[cut..].to_vec())
}

fn write_curve_chart(html: &mut String, comparison: &Comparison) {
    let Some(truth) = &comparison.truth else {
        return;
    };
    let n0 = comparison.initial_count;
    let (init_x, manual_x) = split_column(&comparison.manual, n0, 0);
    let (_, builtin_x) = split_column(&comparison.builtin, n0, 0);
    let cut = n0.min(comparison.manual.y.len());
    let init_y = &comparison.manual.y[..cut];
    let manual_y = &comparison.manual.y[cut..];
    let builtin_y = &comparison.builtin.y[n0.min(comparison.builtin.y.len())..];
    let label = comparison
        .parameter_names
        .first()
        .map(|s| escape_js(s))
        .unwrap_or_else(|| "x".to_string());

    let _ = write!(
        html,
        r##"<script>
Plotly.newPlot("samples", [
  {{ x: {tx:?}, y: {ty:?}, mode: "lines", name: "True function", type: "scatter",
     line: {{ color: "#7f8c8d", width: 2 }} }},
  {{ x: {init_x:?}, y: {init_y:?}, mode: "markers", name: "Initial points", type: "scatter",
     marker: {{ color: "#2c3e50", size: 10, symbol: "square" }} }},
  {{ x: {manual_x:?}, y: {manual_y:?}, mode: "markers", name: "Manual loop", type: "scatter",
     marker: {{ color: "#3498db", size: 9, symbol: "circle" }} }},
  {{ x: {builtin_x:?}, y: {builtin_y:?}, mode: "markers", name: "Built-in loop", type: "scatter",
     marker: {{ color: "#e74c3c", size: 12, symbol: "x-thin-open", line: {{ width: 2 }} }} }}
], {{ xaxis: {{ title: "{label}" }}, yaxis: {{ title: "f({label})" }},
     margin: {{ t: 10 }}, legend: {{ x: 1, xanchor: "right", y: 1 }} }},
   {{ responsive: true }});
</script>
"##,
        tx = truth.x,
        ty = truth.y,
    );
}

fn write_scatter_chart(html: &mut String, comparison: &Comparison) {
    let n0 = comparison.initial_count;
    let second = axis_max(comparison).min(1);
    let (init_a, manual_a) = split_column(&comparison.manual, n0, 0);
    let (init_b, manual_b) = split_column(&comparison.manual, n0, second);
    let (_, builtin_a) = split_column(&comparison.builtin, n0, 0);
    let (_, builtin_b) = split_column(&comparison.builtin, n0, second);
    let label = |i: usize| {
        comparison
            .parameter_names
            .get(i)
            .map(|s| escape_js(s))
            .unwrap_or_else(|| format!("x{}", i + 1))
    };

    let _ = write!(
        html,
        r##"<script>
Plotly.newPlot("samples", [
  {{ x: {init_a:?}, y: {init_b:?}, mode: "markers", name: "Initial points", type: "scatter",
     marker: {{ color: "#2c3e50", size: 10, symbol: "square" }} }},
  {{ x: {manual_a:?}, y: {manual_b:?}, mode: "markers", name: "Manual loop", type: "scatter",
     marker: {{ color: "#3498db", size: 9 }} }},
  {{ x: {builtin_a:?}, y: {builtin_b:?}, mode: "markers", name: "Built-in loop", type: "scatter",
     marker: {{ color: "#e74c3c", size: 12, symbol: "x-thin-open", line: {{ width: 2 }} }} }}
], {{ xaxis: {{ title: "{xa}" }}, yaxis: {{ title: "{ya}" }},
     margin: {{ t: 10 }}, legend: {{ x: 1, xanchor: "right", y: 1 }} }},
   {{ responsive: true }});
</script>
"##,
        xa = label(0),
        ya = label(1),
    );
}

/// Highest coordinate index present in the samples.
fn axis_max(comparison: &Comparison) -> usize {
    comparison
        .manual
        .x
        .first()
        .map(|p| p.len().saturating_sub(1))
        .unwrap_or(0)
}

fn escape_js(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
}
