//! Session lifecycle commands

use colored::Colorize;

use crate::config::Config;
use crate::error::Result;

/// Create a session and print its id and address
pub async fn connect(config: Config, private_key: &str) -> Result<()> {
    let pilot = super::engine(config).await?;
    let connected = pilot.connect(private_key).await?;

    println!("{}", "Connected".green().bold());
    println!("  Session: {}", connected.session_id.cyan());
    println!("  Address: {} ({})", connected.address, connected.short_address);
    println!();
    println!(
        "Use {} to start uploading.",
        format!("blobpilot upload --session {}", connected.session_id).cyan()
    );
    Ok(())
}

/// Import existing names into a session's history
pub async fn import(config: Config, session_id: &str, names: &[String]) -> Result<()> {
    let pilot = super::engine(config).await?;
    let outcome = pilot.import_existing(session_id, names).await?;

    if outcome.added == 0 {
        println!("{}", "Nothing new to import.".yellow());
    } else {
        println!(
            "{}",
            format!("Imported {} blob(s).", outcome.added).green()
        );
    }
    println!("History now holds {} record(s).", outcome.total);
    Ok(())
}

/// Remove a session
pub async fn disconnect(config: Config, session_id: &str) -> Result<()> {
    let pilot = super::engine(config).await?;
    pilot.disconnect(session_id).await?;
    println!("{}", format!("Disconnected session {}", session_id).green());
    Ok(())
}
