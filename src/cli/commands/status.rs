//! Status command for showing crawl and store state.

use console::style;

use crate::config::Settings;
use crate::repository::{CheckpointStore, RecordStore, StoreFormat};

/// Print the checkpoint and record store summary.
pub fn cmd_status(settings: &Settings) -> anyhow::Result<()> {
    let checkpoints = CheckpointStore::new(&settings.checkpoint_path);
    let store = RecordStore::new(&settings.data_path);

    println!("{}", style("harvest status").bold());
    println!("{}", "─".repeat(50));

    println!("{}", style("CHECKPOINT").cyan().bold());
    println!("  {:<14} {}", "File:", checkpoints.path().display());
    match checkpoints.read()? {
        Some(cp) => {
            println!("  {:<14} {}", "Last page:", cp.last_page);
            println!("  {:<14} {}", "Resumes at:", cp.resume_page());
        }
        None => println!("  {:<14} {}", "Last page:", style("none").dim()),
    }
    println!();

    let records = store.load()?;
    let format = match store.format() {
        StoreFormat::JsonLines => "JSON lines",
        StoreFormat::JsonArray => "JSON array",
    };
    let with_category = records.iter().filter(|r| !r.category.is_empty()).count();

    println!("{}", style("RECORDS").cyan().bold());
    println!("  {:<14} {} ({})", "File:", store.path().display(), format);
    println!("  {:<14} {}", "Total:", records.len());
    println!("  {:<14} {}", "Categorized:", with_category);

    Ok(())
}
