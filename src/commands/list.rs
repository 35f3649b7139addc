//! Upload history listing

use colored::Colorize;
use prettytable::{format, Table};

use crate::config::Config;
use crate::error::{PilotError, Result};
use crate::identity::short_address;
use crate::query::UploadListing;
use crate::session::{RecordOrigin, SessionStore};

/// Print a session's uploads grouped by folder, or the listing as JSON
///
/// Reads the snapshot directly; no collaborator is contacted.
pub async fn list_uploads(config: Config, session_id: &str, json: bool) -> Result<()> {
    let store = SessionStore::open(&config.store.path).await?;
    let session = store.get(session_id).await?;
    let listing = UploadListing::from_session(&session);

    if json {
        let out = serde_json::to_string_pretty(&listing).map_err(PilotError::from)?;
        println!("{}", out);
        return Ok(());
    }

    print_listing(&listing);
    Ok(())
}

fn print_listing(listing: &UploadListing) {
    println!(
        "\nUploads for {} ({} record(s))",
        short_address(&listing.address).cyan(),
        listing.count
    );

    if listing.count == 0 {
        println!("{}", "No uploads yet.".yellow());
        return;
    }

    for (folder, records) in &listing.folders {
        println!("\n{}", format!("{}/", folder).bold());

        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
        table.add_row(prettytable::row![
            "Name".bold(),
            "Size".bold(),
            "Origin".bold(),
            "Added".bold()
        ]);

        for record in records {
            let size = record
                .size
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            let origin = match record.origin {
                RecordOrigin::Pipeline => "pipeline".normal(),
                RecordOrigin::Imported => "imported".dimmed(),
            };
            table.add_row(prettytable::row![
                record.name,
                size,
                origin,
                record.timestamp.format("%Y-%m-%d %H:%M")
            ]);
        }
        table.printstd();
    }
    println!();
}
