use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Extract text, page-aware chunks and topics from PDF documents.
///
/// Pages with a text layer are read directly; scanned pages are rendered
/// and run through OCR. Output is JSON on stdout, logs go to stderr.
#[derive(Parser, Debug)]
#[command(name = "pdfquiz", version, about = "PDF text extraction with OCR fallback")]
pub struct CliArgs {
    /// Configuration profile; every key is looked up as {PROFILE}_{KEY} first
    #[arg(long, env = "PDFQUIZ_PROFILE", global = true)]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract a PDF and print the artifact as JSON
    Extract {
        #[command(flatten)]
        source: SourceArgs,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Print only the detected topic list
    Topics {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Extract a PDF and send an instruction plus its text to the generator
    Generate {
        #[command(flatten)]
        source: SourceArgs,

        /// Instruction placed before the document text
        #[arg(long)]
        instruction: String,

        /// Stop adding chunks once this many estimated tokens are included
        #[arg(long, default_value_t = 30_000)]
        max_context_tokens: usize,
    },
}

#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Path to the PDF file
    pub path: PathBuf,

    /// Maximum estimated tokens per chunk (overrides MAX_CHUNK_TOKENS)
    #[arg(long)]
    pub max_chunk_tokens: Option<usize>,

    /// Retries for recoverable failures (overrides RETRY_MAX_ATTEMPTS - 1)
    #[arg(long)]
    pub retries: Option<u32>,
}
