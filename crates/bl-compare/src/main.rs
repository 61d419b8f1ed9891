use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bl_compare::{run_comparison, write_report, CompareConfig};

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = CompareConfig::load().context("failed to load comparison config")?;
    let comparison = run_comparison(&config).context("comparison run failed")?;
    let paths = write_report(&comparison, &config.output_dir).with_context(|| {
        format!("failed to write report to {}", config.output_dir.display())
    })?;

    info!(
        html = %paths.html.display(),
        json = %paths.json.display(),
        agree = comparison.runs_agree(),
        "Report written"
    );
    Ok(())
}
