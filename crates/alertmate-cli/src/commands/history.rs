use clap::Args;

use alertmate_core::Database;

use super::CliResult;

#[derive(Args)]
pub struct HistoryArgs {
    /// Number of dispatches to show, newest first
    #[arg(long, default_value = "10")]
    limit: usize,
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: HistoryArgs) -> CliResult {
    let db = Database::open()?;
    let records = db.recent_dispatches(args.limit)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    if records.is_empty() {
        println!("No alerts sent yet");
        return Ok(());
    }
    for record in &records {
        println!(
            "{}  {:<12} delivered={} failed={}",
            record.sent_at.format("%Y-%m-%d %H:%M:%S"),
            record.source.as_str(),
            record.delivered.len(),
            record.failed.len()
        );
        for failure in &record.failed {
            println!("    {}: {}", failure.contact, failure.reason);
        }
    }
    Ok(())
}
