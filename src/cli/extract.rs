//! `extract` command: offline extraction diagnostics on a saved page.

use std::path::Path;

use console::style;
use url::Url;

use crate::config::{Config, StepPolicy};
use crate::extract::ContentExtractor;
use crate::models::Method;
use crate::quality::QualityGate;

pub async fn cmd_extract(
    config: &Config,
    file: &Path,
    base_url: &str,
    method: Method,
) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(file)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", file.display(), e))?;
    let base = Url::parse(base_url).map_err(|e| anyhow::anyhow!("Invalid base URL: {}", e))?;

    let policy = config
        .step(method)
        .cloned()
        .unwrap_or_else(|| StepPolicy::default_for(method));

    let extracted = ContentExtractor::default().extract(&raw, &base);
    let assessment = QualityGate::assess(&extracted.html);
    let verdict = QualityGate::check(&policy.quality(), &assessment.text, assessment.paragraphs);

    eprintln!("{} {}", style("Title:").bold(), extracted.title);
    eprintln!(
        "{} {} chars, {} paragraphs",
        style("Size:").bold(),
        assessment.text.chars().count(),
        assessment.paragraphs
    );
    match verdict {
        Ok(()) => eprintln!(
            "{} {} accepted under {} thresholds",
            style("Verdict:").bold(),
            style("✓").green(),
            method
        ),
        Err(rejection) => eprintln!(
            "{} {} rejected under {} thresholds: {}",
            style("Verdict:").bold(),
            style("✗").red(),
            method,
            rejection
        ),
    }
    eprintln!();
    println!("{}", extracted.html);

    Ok(())
}
