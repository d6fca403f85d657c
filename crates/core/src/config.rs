use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_parse<T: std::str::FromStr>(profile: &str, key: &str, default: T) -> T {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub ingest: IngestConfig,
    pub ocr: OcrConfig,
    pub llm: LlmConfig,
    pub retry: RetryConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `PDFQUIZ_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("PDFQUIZ_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            ingest: IngestConfig::from_env_profiled(p),
            ocr: OcrConfig::from_env_profiled(p),
            llm: LlmConfig::from_env_profiled(p),
            retry: RetryConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  ingest:  max_file_bytes={}, min_page_text_chars={}, max_chunk_tokens={}, render_scale={}",
            self.ingest.max_file_bytes,
            self.ingest.min_page_text_chars,
            self.ingest.max_chunk_tokens,
            self.ingest.render_scale
        );
        tracing::info!(
            "  ocr:     tesseract={}, language={}, pdftoppm={}",
            self.ocr.tesseract_path,
            self.ocr.language,
            self.ocr.pdftoppm_path
        );
        tracing::info!(
            "  llm:     provider={}, model={}, configured={}",
            self.llm.provider,
            self.llm.gemini_model,
            self.llm.is_configured()
        );
        tracing::info!(
            "  retry:   attempts={}, base_delay_ms={}",
            self.retry.max_attempts,
            self.retry.base_delay_ms
        );
    }
}

// ── Ingest ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Inputs larger than this are rejected before loading.
    pub max_file_bytes: u64,
    /// A page whose trimmed text layer is at most this long is treated as scanned.
    pub min_page_text_chars: usize,
    /// Upscale factor applied when rendering scanned pages for OCR.
    pub render_scale: f32,
    pub max_chunk_tokens: usize,
    pub max_topics: usize,
    /// Contrast parameter of the OCR preprocessing stretch.
    pub ocr_contrast: f32,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 50 * 1024 * 1024,
            min_page_text_chars: 50,
            render_scale: 2.0,
            max_chunk_tokens: 2000,
            max_topics: 30,
            ocr_contrast: 1.5,
        }
    }
}

impl IngestConfig {
    fn from_env_profiled(p: &str) -> Self {
        let d = Self::default();
        Self {
            max_file_bytes: profiled_env_parse(p, "MAX_FILE_BYTES", d.max_file_bytes),
            min_page_text_chars: profiled_env_parse(p, "MIN_PAGE_TEXT_CHARS", d.min_page_text_chars),
            render_scale: profiled_env_parse(p, "RENDER_SCALE", d.render_scale),
            max_chunk_tokens: profiled_env_parse(p, "MAX_CHUNK_TOKENS", d.max_chunk_tokens),
            max_topics: profiled_env_parse(p, "MAX_TOPICS", d.max_topics),
            ocr_contrast: profiled_env_parse(p, "OCR_CONTRAST", d.ocr_contrast),
        }
    }
}

// ── OCR (Tesseract + Poppler) ─────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    pub tesseract_path: String,
    /// Tesseract language code(s), e.g. "eng" or "eng+deu".
    pub language: String,
    pub pdftoppm_path: String,
    /// Upper bound for a single external OCR or render invocation.
    pub timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_path: "tesseract".to_string(),
            language: "eng".to_string(),
            pdftoppm_path: "pdftoppm".to_string(),
            timeout_secs: 120,
        }
    }
}

impl OcrConfig {
    fn from_env_profiled(p: &str) -> Self {
        let d = Self::default();
        Self {
            tesseract_path: profiled_env_or(p, "TESSERACT_PATH", &d.tesseract_path),
            language: profiled_env_or(p, "OCR_LANGUAGE", &d.language),
            pdftoppm_path: profiled_env_or(p, "PDFTOPPM_PATH", &d.pdftoppm_path),
            timeout_secs: profiled_env_parse(p, "OCR_TIMEOUT_SECS", d.timeout_secs),
        }
    }
}

// ── LLM (question generation collaborator) ────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Only "gemini" is supported.
    pub provider: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl LlmConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            provider: profiled_env_or(p, "LLM_PROVIDER", "gemini"),
            gemini_api_key: profiled_env_opt(p, "GEMINI_API_KEY"),
            gemini_model: profiled_env_or(p, "GEMINI_MODEL", "gemini-1.5-flash"),
            temperature: profiled_env_parse(p, "LLM_TEMPERATURE", 0.7),
            max_tokens: profiled_env_parse(p, "LLM_MAX_TOKENS", 8192),
        }
    }

    pub fn is_configured(&self) -> bool {
        match self.provider.as_str() {
            "gemini" => self.gemini_api_key.is_some(),
            _ => false,
        }
    }
}

// ── Retry ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            max_attempts: profiled_env_parse(p, "RETRY_MAX_ATTEMPTS", 3),
            base_delay_ms: profiled_env_parse(p, "RETRY_BASE_DELAY_MS", 1000),
            max_delay_ms: profiled_env_parse(p, "RETRY_MAX_DELAY_MS", 8000),
        }
    }
}
