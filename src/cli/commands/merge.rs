//! Merge command.

use console::style;

use crate::config::Settings;
use crate::scrapers::FileLinkRule;
use crate::services::{MergeError, MergePipeline};

/// Download `urls` and merge them into one file in the output directory.
///
/// The site profile decides which file type is collected and which link
/// texts count as download links.
pub async fn cmd_merge(
    settings: &Settings,
    urls: &[String],
    out: &str,
    site: Option<&str>,
) -> anyhow::Result<()> {
    let profile = settings.site_profile(site)?;
    let client = settings.http_client(Some(&profile))?;
    let pipeline =
        MergePipeline::new(client, &settings.output_dir).with_rule(FileLinkRule::from(&profile));

    println!("{} Merging {} files...", style("→").cyan(), urls.len());

    match pipeline.run(urls, out).await {
        Ok(outcome) => {
            println!(
                "{} Wrote {}",
                style("✓").green(),
                outcome.output_path.display()
            );
            for skipped in &outcome.skipped {
                println!(
                    "  {} skipped {}: {}",
                    style("!").yellow(),
                    skipped.url,
                    skipped.reason
                );
            }
            Ok(())
        }
        Err(e) => {
            if let MergeError::InsufficientInputs { skipped, .. } = &e {
                for s in skipped {
                    eprintln!("  {} {}: {}", style("✗").red(), s.url, s.reason);
                }
            }
            Err(e.into())
        }
    }
}
