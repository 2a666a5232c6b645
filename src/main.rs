use std::io::Read;

use anyhow::Context;
use clap::Parser;

use churn_guard::{Analyzer, KeywordTables, LexiconScorer};

#[derive(Parser)]
#[command(
    name = "churn-guard",
    about = "Classify churn risk in customer support messages",
    version
)]
struct Cli {
    /// Files with one message per line (reads stdin if none provided)
    files: Vec<String>,

    /// JSON file with alternative keyword tables
    #[arg(long)]
    keywords: Option<String>,

    /// Print the per-category insight summary after all messages
    #[arg(long)]
    summary: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let tables = match &cli.keywords {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading keyword tables from {path}"))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("parsing keyword tables in {path}"))?
        }
        None => KeywordTables::portuguese(),
    };
    let mut analyzer = Analyzer::with_scorer(LexiconScorer::new(), tables);

    let mut input = String::new();
    if cli.files.is_empty() {
        std::io::stdin()
            .read_to_string(&mut input)
            .context("reading stdin")?;
    } else {
        for path in &cli.files {
            let text =
                std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
            input.push_str(&text);
            if !text.ends_with('\n') {
                input.push('\n');
            }
        }
    }

    for line in input.lines() {
        // Blank lines produce no result and are skipped, not errors.
        if let Some(result) = analyzer.analyze(line)? {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    if cli.summary {
        println!("{}", serde_json::to_string_pretty(&analyzer.summarize())?);
    }

    Ok(())
}
