//! Configuration types for grading runs.
//!
//! All grading behaviour is controlled through [`GradingConfig`], built via
//! its [`GradingConfigBuilder`]. Every knob lives in one struct so a run can
//! be logged, cloned into the session, and reproduced later.

use crate::backend::FeedbackBackend;
use crate::credentials::DEFAULT_PROVIDER;
use crate::error::GradeError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Pause between two backend calls. Sized for free-tier rate limits.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(20);

/// Configuration for grading one PDF.
///
/// Built via [`GradingConfig::builder()`] or using [`GradingConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf_gradecheck::GradingConfig;
/// use std::time::Duration;
///
/// let config = GradingConfig::builder()
///     .model("gemini-2.5-flash")
///     .dpi(200)
///     .delay(Duration::ZERO)
///     .build()
///     .unwrap();
/// assert!(config.validate);
/// ```
#[derive(Clone)]
pub struct GradingConfig {
    /// LLM model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// LLM provider name passed to the provider factory. Default: `"gemini"`.
    pub provider_name: String,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed backend. Takes precedence over `provider`.
    pub backend: Option<Arc<dyn FeedbackBackend>>,

    /// API key. If None, the provider's environment variables are read.
    pub api_key: Option<String>,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the grader may generate per page. Default: 4096.
    pub max_tokens: usize,

    /// Rendering DPI. Range: 72–600. Default: 300.
    ///
    /// Handwriting and small subscripts need more pixels than typeset text.
    pub dpi: u32,

    /// Cap on either rendered image dimension, in pixels. Default: 3500.
    ///
    /// Keeps a poster-sized page from exhausting memory at high DPI.
    pub max_rendered_pixels: u32,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Custom system instruction. If None, uses the built-in grading prompt.
    pub system_prompt: Option<String>,

    /// Check each reply for START/END markers and scores. Default: true.
    pub validate: bool,

    /// Pause between backend calls (never after the last page). Default: 20 s.
    pub delay: Duration,

    /// Directory for per-page feedback files.
    /// If None, `<pdf_stem>_feedback/` next to the PDF.
    pub output_dir: Option<PathBuf>,

    /// Per-call timeout in seconds; 0 disables it. Default: 300.
    pub api_timeout_secs: u64,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            provider_name: DEFAULT_PROVIDER.to_string(),
            provider: None,
            backend: None,
            api_key: None,
            temperature: 0.1,
            max_tokens: 4096,
            dpi: 300,
            max_rendered_pixels: 3500,
            password: None,
            system_prompt: None,
            validate: true,
            delay: DEFAULT_DELAY,
            output_dir: None,
            api_timeout_secs: 300,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for GradingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GradingConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("backend", &self.backend.as_ref().map(|_| "<dyn FeedbackBackend>"))
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("dpi", &self.dpi)
            .field("validate", &self.validate)
            .field("delay", &self.delay)
            .field("output_dir", &self.output_dir)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl GradingConfig {
    /// Create a new builder for `GradingConfig`.
    pub fn builder() -> GradingConfigBuilder {
        GradingConfigBuilder {
            config: Self::default(),
        }
    }

    /// The system instruction actually sent to the grader.
    pub fn system_instruction(&self) -> &str {
        self.system_prompt
            .as_deref()
            .unwrap_or(crate::prompts::DEFAULT_SYSTEM_PROMPT)
    }

    /// `None` when the timeout is disabled.
    pub fn api_timeout(&self) -> Option<Duration> {
        (self.api_timeout_secs > 0).then(|| Duration::from_secs(self.api_timeout_secs))
    }
}

/// Builder for [`GradingConfig`].
pub struct GradingConfigBuilder {
    config: GradingConfig,
}

impl fmt::Debug for GradingConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GradingConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl GradingConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = name.into();
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn backend(mut self, backend: Arc<dyn FeedbackBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn validate(mut self, v: bool) -> Self {
        self.config.validate = v;
        self
    }

    pub fn delay(mut self, d: Duration) -> Self {
        self.config.delay = d;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = Some(dir.into());
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GradingConfig, GradeError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(GradeError::InvalidConfig("model must not be empty".into()));
        }
        if c.provider_name.trim().is_empty() {
            return Err(GradeError::InvalidConfig(
                "provider name must not be empty".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(GradeError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if let Some(ref prompt) = c.system_prompt {
            if prompt.trim().is_empty() {
                return Err(GradeError::InvalidConfig(
                    "system prompt must not be empty".into(),
                ));
            }
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_free_tier_usage() {
        let c = GradingConfig::default();
        assert_eq!(c.model, DEFAULT_MODEL);
        assert_eq!(c.provider_name, "gemini");
        assert_eq!(c.dpi, 300);
        assert_eq!(c.delay, Duration::from_secs(20));
        assert!(c.validate);
    }

    #[test]
    fn setters_clamp() {
        let c = GradingConfig::builder()
            .dpi(5000)
            .temperature(9.0)
            .max_rendered_pixels(1)
            .build()
            .unwrap();
        assert_eq!(c.dpi, 600);
        assert_eq!(c.temperature, 2.0);
        assert_eq!(c.max_rendered_pixels, 100);
    }

    #[test]
    fn empty_model_is_rejected() {
        let err = GradingConfig::builder().model("  ").build().unwrap_err();
        assert!(matches!(err, GradeError::InvalidConfig(_)));
    }

    #[test]
    fn zero_max_tokens_is_rejected() {
        assert!(GradingConfig::builder().max_tokens(0).build().is_err());
    }

    #[test]
    fn system_instruction_falls_back_to_default() {
        let c = GradingConfig::default();
        assert_eq!(c.system_instruction(), crate::prompts::DEFAULT_SYSTEM_PROMPT);
        let c = GradingConfig::builder()
            .system_prompt("Grade kindly.")
            .build()
            .unwrap();
        assert_eq!(c.system_instruction(), "Grade kindly.");
    }

    #[test]
    fn zero_timeout_disables_it() {
        let c = GradingConfig::builder().api_timeout_secs(0).build().unwrap();
        assert_eq!(c.api_timeout(), None);
        assert_eq!(
            GradingConfig::default().api_timeout(),
            Some(Duration::from_secs(300))
        );
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = GradingConfig::builder().api_key("secret-key").build().unwrap();
        let s = format!("{c:?}");
        assert!(!s.contains("secret-key"));
        assert!(s.contains("<redacted>"));
    }
}
