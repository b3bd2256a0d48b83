//! Text command implementation
//!
//! This module implements the `text` command, which anonymizes plain-text
//! files using classifier spans stored as JSON next to each input.

use crate::anonymization::classifier::{EntityClassifier, PrecomputedClassifier};
use crate::anonymization::config::ProcessingMode;
use crate::anonymization::report::AnonymizationReport;
use crate::anonymization::text::{TextAnonymizer, TextOutcome};
use crate::config::load_config_or_default;
use anyhow::Context;
use clap::Args;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::sync::watch;

/// Arguments for the text command
#[derive(Args, Debug)]
pub struct TextArgs {
    /// Text files to anonymize
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Span file for a single input (defaults to `<input>.spans.json`)
    #[arg(long)]
    pub spans: Option<PathBuf>,

    /// Directory for anonymized files (defaults to next to each input)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Override processing mode (replace or censor)
    #[arg(long)]
    pub mode: Option<String>,

    /// Override the allocation seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write the JSON report to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl TextArgs {
    /// Execute the text command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!(inputs = self.inputs.len(), "Starting text command");

        if self.spans.is_some() && self.inputs.len() > 1 {
            eprintln!("--spans can only be used with a single input");
            return Ok(2);
        }

        let mut config = match load_config_or_default(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        if let Some(mode) = &self.mode {
            let Some(mode) = ProcessingMode::parse(mode) else {
                eprintln!("Invalid mode: {mode}. Use 'replace' or 'censor'");
                return Ok(2);
            };
            tracing::info!(mode = mode.as_str(), "Overriding processing mode from CLI");
            config.processing.mode = mode;
        }
        if let Some(seed) = self.seed {
            config.processing.seed = Some(seed);
        }

        let mut anonymizer = match TextAnonymizer::from_config(&config.processing) {
            Ok(a) => a,
            Err(e) => {
                tracing::error!(error = %e, "Failed to initialize anonymizer");
                eprintln!("Failed to initialize anonymizer: {e:#}");
                return Ok(2);
            }
        };

        let mut report = AnonymizationReport::new();
        let mut failed = 0usize;
        let mut cancelled = false;

        for (index, input) in self.inputs.iter().enumerate() {
            if *shutdown_signal.borrow() {
                tracing::warn!(
                    completed = index,
                    total = self.inputs.len(),
                    "Shutdown requested, skipping remaining inputs"
                );
                cancelled = true;
                break;
            }

            let started = Instant::now();
            match self.process_file(&mut anonymizer, input) {
                Ok((outcome_path, outcome)) => {
                    report.add_text(&outcome, started.elapsed().as_millis() as u64);
                    println!(
                        "✅ {} → {} ({} replaced)",
                        input.display(),
                        outcome_path.display(),
                        outcome.allocation.successful
                    );
                }
                Err(e) => {
                    failed += 1;
                    tracing::error!(
                        input = %input.display(),
                        error = %e,
                        "Failed to process input"
                    );
                    report.add_warning(format!("{}: {e:#}", input.display()));
                    println!("❌ {}: {e:#}", input.display());
                }
            }
        }

        println!();
        println!("{}", report.format_console());

        if let Some(path) = &self.report {
            report
                .write_to_file(path)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            println!("📄 Report written to {}", path.display());
        }

        if cancelled || failed > 0 {
            Ok(1)
        } else {
            Ok(0)
        }
    }

    fn process_file(
        &self,
        anonymizer: &mut TextAnonymizer,
        input: &Path,
    ) -> anyhow::Result<(PathBuf, TextOutcome)> {
        let text = fs::read_to_string(input)
            .with_context(|| format!("Failed to read {}", input.display()))?;

        let spans_path = self
            .spans
            .clone()
            .unwrap_or_else(|| spans_path_for(input));
        let spans_json = fs::read_to_string(&spans_path)
            .with_context(|| format!("Failed to read spans from {}", spans_path.display()))?;
        let classifier = PrecomputedClassifier::from_json(&spans_json)?;

        let raw = classifier.classify(&text)?;
        let source = input.display().to_string();
        let outcome = anonymizer.process_named(&source, &text, raw);

        let output = output_path_for(input, self.output_dir.as_deref());
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&output, &outcome.text)
            .with_context(|| format!("Failed to write {}", output.display()))?;

        Ok((output, outcome))
    }
}

/// `letter.txt` → `letter.txt.spans.json`
fn spans_path_for(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(".spans.json");
    PathBuf::from(name)
}

/// `letter.txt` → `letter.anon.txt`, placed in `output_dir` when given
fn output_path_for(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let name = match input.extension() {
        Some(ext) => format!("{stem}.anon.{}", ext.to_string_lossy()),
        None => format!("{stem}.anon"),
    };
    match output_dir {
        Some(dir) => dir.join(name),
        None => input.with_file_name(name),
    }
}
