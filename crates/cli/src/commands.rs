use std::process::ExitCode;

use anyhow::{Context, Result};
use pdfquiz_core::{Config, ExtractionArtifact, ExtractionError, ProgressEvent, RetryPolicy};
use pdfquiz_ingest::{ExtractionPipeline, PdfInput};
use pdfquiz_llm::{create_generator, GenerationError, RetryingGenerator, TextGenerator};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::cli::SourceArgs;
use crate::input::read_input;

/// Pipeline, input and retry policy resolved from config plus CLI overrides.
pub struct Job {
    pipeline: ExtractionPipeline,
    input: PdfInput,
    policy: RetryPolicy,
}

impl Job {
    pub fn prepare(config: &Config, source: &SourceArgs) -> Result<Self> {
        let mut config = config.clone();
        if let Some(max) = source.max_chunk_tokens {
            config.ingest.max_chunk_tokens = max;
        }
        let mut policy = RetryPolicy::from(&config.retry);
        if let Some(retries) = source.retries {
            policy.max_attempts = retries + 1;
        }

        let input = read_input(&source.path)?;
        info!(
            path = %source.path.display(),
            bytes = input.bytes.len(),
            mime = %input.mime_type,
            "Input read"
        );

        Ok(Self {
            pipeline: ExtractionPipeline::from_config(&config),
            input,
            policy,
        })
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Run the pipeline, logging progress and retrying recoverable failures.
    pub async fn run(&self) -> Result<ExtractionArtifact, ExtractionError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<ProgressEvent>();
        let logger = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                info!(stage = %event.stage, progress = event.progress, "{}", event.message);
            }
        });

        let result = self
            .policy
            .run(
                || self.pipeline.extract_with_progress(&self.input, Some(tx.clone())),
                ExtractionError::is_recoverable,
            )
            .await;

        drop(tx);
        if let Err(e) = logger.await {
            warn!(error = %e, "Progress logger task failed");
        }
        result
    }
}

pub async fn extract(config: &Config, source: &SourceArgs, pretty: bool) -> Result<ExitCode> {
    let job = Job::prepare(config, source)?;
    match job.run().await {
        Ok(artifact) => {
            print_json(&artifact, pretty)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => Ok(report_extraction_failure(&e)),
    }
}

pub async fn topics(config: &Config, source: &SourceArgs) -> Result<ExitCode> {
    let job = Job::prepare(config, source)?;
    match job.run().await {
        Ok(artifact) => {
            for topic in &artifact.topics {
                println!("{topic}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => Ok(report_extraction_failure(&e)),
    }
}

pub async fn generate(
    config: &Config,
    source: &SourceArgs,
    instruction: &str,
    max_context_tokens: usize,
) -> Result<ExitCode> {
    let generator = match create_generator(&config.llm) {
        Ok(generator) => generator,
        Err(e) => return Ok(report_generation_failure(&e)),
    };

    let job = Job::prepare(config, source)?;
    let artifact = match job.run().await {
        Ok(artifact) => artifact,
        Err(e) => return Ok(report_extraction_failure(&e)),
    };

    let prompt = build_prompt(instruction, &artifact, max_context_tokens);
    info!(
        prompt_chars = prompt.len(),
        chunks = artifact.chunks.len(),
        "Sending document to generator"
    );

    let generator = RetryingGenerator::new(generator, job.policy());
    match generator.generate(&prompt).await {
        Ok(text) => {
            println!("{text}");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => Ok(report_generation_failure(&e)),
    }
}

/// Instruction followed by as many whole chunks as fit the budget. The first
/// chunk is always included.
pub fn build_prompt(instruction: &str, artifact: &ExtractionArtifact, max_context_tokens: usize) -> String {
    let mut prompt = instruction.trim().to_string();
    let mut used = 0;
    for chunk in &artifact.chunks {
        if used > 0 && used + chunk.token_count > max_context_tokens {
            break;
        }
        prompt.push_str("\n\n");
        prompt.push_str(&chunk.content);
        used += chunk.token_count;
    }
    prompt
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context("failed to serialize output")?;
    println!("{out}");
    Ok(())
}

fn report_extraction_failure(err: &ExtractionError) -> ExitCode {
    error!(code = err.code(), recoverable = err.is_recoverable(), "{err}");
    eprintln!("{}", json!(err.report()));
    ExitCode::FAILURE
}

fn report_generation_failure(err: &GenerationError) -> ExitCode {
    error!(kind = ?err.kind(), "{err}");
    eprintln!(
        "{}",
        json!({
            "kind": err.kind(),
            "message": err.user_message(),
            "detail": err.to_string(),
            "retryable": err.is_retryable(),
        })
    );
    ExitCode::FAILURE
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfquiz_core::{Chunk, ExtractionMethod, Metadata};
    use std::time::Duration;

    fn artifact(chunks: &[(&str, usize)]) -> ExtractionArtifact {
        ExtractionArtifact {
            id: Default::default(),
            created_at: Default::default(),
            file_name: None,
            page_count: 1,
            chunks: chunks
                .iter()
                .enumerate()
                .map(|(index, (content, token_count))| Chunk {
                    index,
                    content: content.to_string(),
                    page_start: 1,
                    page_end: 1,
                    token_count: *token_count,
                    method: ExtractionMethod::Digital,
                    confidence: None,
                })
                .collect(),
            topics: Vec::new(),
            full_text: String::new(),
            metadata: Metadata {
                has_digital_text: true,
                has_scanned_content: false,
                ocr_attempted: false,
                ocr_succeeded: false,
                ocr_confidence: 0.0,
                processing_time: Duration::ZERO,
                warnings: Vec::new(),
            },
        }
    }

    #[test]
    fn prompt_stops_at_budget() {
        let doc = artifact(&[("one", 10), ("two", 10), ("three", 10)]);
        assert_eq!(build_prompt("  Summarize.  ", &doc, 20), "Summarize.\n\none\n\ntwo");
    }

    #[test]
    fn prompt_keeps_oversized_first_chunk() {
        let doc = artifact(&[("huge", 500), ("next", 1)]);
        assert_eq!(build_prompt("Q", &doc, 100), "Q\n\nhuge");
    }
}
