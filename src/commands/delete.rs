//! Bulk deletion command

use colored::Colorize;
use prettytable::{format, Table};

use crate::config::Config;
use crate::error::Result;

/// Delete names in order and print the per-name report
pub async fn run_delete(config: Config, session_id: &str, names: &[String]) -> Result<()> {
    let pilot = super::engine(config).await?;
    let report = pilot.delete_blobs(session_id, names).await?;

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(prettytable::row!["Name".bold(), "Result".bold(), "Error".bold()]);

    for outcome in &report.results {
        let result = if outcome.success {
            "deleted".green()
        } else {
            "failed".red()
        };
        table.add_row(prettytable::row![
            outcome.name,
            result,
            outcome.error.as_deref().unwrap_or("-")
        ]);
    }

    table.printstd();
    println!(
        "\n{} deleted, {} failed",
        report.summary.deleted.to_string().green(),
        report.summary.failed.to_string().red()
    );
    Ok(())
}
