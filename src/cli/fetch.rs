//! `fetch` command.

use console::style;

use crate::config::Config;
use crate::models::{Method, RetrievalResult};
use crate::orchestrator::Retriever;
use crate::quality::QualityGate;

/// How `fetch` prints an accepted article.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Result record as JSON
    #[default]
    Json,
    /// Cleaned HTML fragment only
    Html,
    /// Title followed by plain text
    Text,
}

pub async fn cmd_fetch(
    config: &Config,
    url: &str,
    format: OutputFormat,
    only: &[Method],
) -> anyhow::Result<()> {
    let mut retriever = Retriever::from_config(config)?;
    if !only.is_empty() {
        retriever = retriever.only(only);
        if retriever.methods().is_empty() {
            anyhow::bail!(
                "None of the requested methods are configured (configured: {})",
                config
                    .steps
                    .iter()
                    .map(|s| s.method.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }

    let result = retriever.retrieve(url).await?;
    eprintln!(
        "{} Retrieved via {} from {}",
        style("✓").green(),
        style(result.method()).cyan(),
        result.source_url()
    );
    println!("{}", render(&result, format)?);
    Ok(())
}

fn render(result: &RetrievalResult, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(result)?,
        OutputFormat::Html => result.content_html().to_string(),
        OutputFormat::Text => format!(
            "{}\n\n{}",
            result.title(),
            QualityGate::assess(result.content_html()).text
        ),
    })
}
