//! The grading backend: one operation, `transcript + instruction → reply`.
//!
//! [`GradingSession`](crate::session::GradingSession) talks to the model only
//! through [`FeedbackBackend`], so the conversation protocol and the
//! validator can be exercised without a network:
//!
//! * [`LlmBackend`] — any vision-capable provider from `edgequake-llm`
//! * [`ScriptedBackend`] — canned replies, for tests and dry runs
//!
//! Backend errors are returned verbatim; nothing here retries.

pub mod llm;
pub mod scripted;

pub use llm::LlmBackend;
pub use scripted::ScriptedBackend;

use crate::config::GradingConfig;
use crate::credentials::{self, CredentialSource};
use crate::error::GradeError;
use crate::transcript::Transcript;
use async_trait::async_trait;
use edgequake_llm::{
    AnthropicProvider, GeminiProvider, LLMProvider, OpenAIProvider, OpenRouterProvider,
    ProviderFactory, ProviderType,
};
use std::sync::Arc;
use tracing::info;

/// Produces one grader reply for the whole transcript so far.
#[async_trait]
pub trait FeedbackBackend: Send + Sync {
    /// Send `transcript` with `system_instruction` and return the reply text.
    ///
    /// Fails with [`GradeError::Backend`] or [`GradeError::BackendTimeout`].
    async fn generate_reply(
        &self,
        transcript: &Transcript,
        system_instruction: &str,
    ) -> Result<String, GradeError>;
}

/// Build the backend described by `config`, from most-specific to
/// least-specific:
///
/// 1. **Pre-built backend** (`config.backend`) — used as-is.
/// 2. **Pre-built provider** (`config.provider`) — wrapped in [`LlmBackend`].
/// 3. **Named provider + model** — the credential is resolved first so a
///    missing key fails here, before any page is rendered.
pub fn connect(config: &GradingConfig) -> Result<Arc<dyn FeedbackBackend>, GradeError> {
    if let Some(ref backend) = config.backend {
        return Ok(Arc::clone(backend));
    }

    if let Some(ref provider) = config.provider {
        return Ok(Arc::new(LlmBackend::from_config(
            Arc::clone(provider),
            config,
        )));
    }

    let provider = create_provider(
        &config.provider_name,
        &config.model,
        config.api_key.as_deref(),
    )?;
    Ok(Arc::new(LlmBackend::from_config(provider, config)))
}

/// Resolve the credential for `provider_name` and instantiate the provider.
///
/// Providers with a key constructor are built from the resolved key
/// directly. The rest go through [`ProviderFactory`], which reads only the
/// provider's primary variable, so a key from anywhere else is refused.
/// The process environment is never written.
pub fn create_provider(
    provider_name: &str,
    model: &str,
    api_key: Option<&str>,
) -> Result<Arc<dyn LLMProvider>, GradeError> {
    let provider_type = ProviderType::from_str(provider_name);

    // Vertex AI authenticates through gcloud, not an API key.
    if matches!(provider_type, Some(ProviderType::Gemini)) && model.starts_with("vertexai:") {
        return from_factory(provider_name, model);
    }

    let credential = credentials::resolve(provider_name, api_key)?;
    info!(
        "Connecting to {} ({}) with credential from {:?}",
        provider_name, model, credential.source
    );

    let key = credential.secret();
    let provider: Arc<dyn LLMProvider> = match provider_type {
        Some(ProviderType::Gemini) => Arc::new(GeminiProvider::new(key).with_model(model)),
        Some(ProviderType::OpenAI) => Arc::new(OpenAIProvider::new(key).with_model(model)),
        Some(ProviderType::Anthropic) => Arc::new(AnthropicProvider::new(key).with_model(model)),
        Some(ProviderType::OpenRouter) => {
            Arc::new(OpenRouterProvider::new(key).with_model(model))
        }
        _ => {
            let primary = credentials::credential_vars(provider_name).first().copied();
            match (primary, &credential.source) {
                (Some(var), source) if *source != CredentialSource::Env(var) => {
                    return Err(GradeError::Configuration {
                        provider: provider_name.to_string(),
                        hint: format!(
                            "This provider only reads its key from {var}; set it in the environment."
                        ),
                    });
                }
                _ => return from_factory(provider_name, model),
            }
        }
    };
    Ok(provider)
}

fn from_factory(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, GradeError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        GradeError::Configuration {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prebuilt_backend_is_used_as_is() {
        let scripted: Arc<dyn FeedbackBackend> = Arc::new(ScriptedBackend::new(["ok"]));
        let config = GradingConfig::builder()
            .backend(Arc::clone(&scripted))
            .build()
            .unwrap();
        let backend = connect(&config).unwrap();
        assert!(Arc::ptr_eq(&backend, &scripted));
    }

    #[test]
    fn explicit_key_is_not_exported_to_environment() {
        let provider =
            create_provider("openai", "gpt-4o-mini", Some("sk-explicit-openai")).unwrap();
        assert_eq!(provider.model(), "gpt-4o-mini");
        assert_ne!(
            std::env::var("OPENAI_API_KEY").ok().as_deref(),
            Some("sk-explicit-openai")
        );
    }

    #[test]
    fn explicit_key_for_env_only_provider_is_refused() {
        let err = create_provider("mistral", "pixtral-12b-2409", Some("sk-explicit-mistral"))
            .err()
            .expect("expected create_provider to fail");
        match err {
            GradeError::Configuration { provider, hint } => {
                assert_eq!(provider, "mistral");
                assert!(hint.contains("MISTRAL_API_KEY"));
            }
            other => panic!("expected a configuration error, got {other:?}"),
        }
        assert_ne!(
            std::env::var("MISTRAL_API_KEY").ok().as_deref(),
            Some("sk-explicit-mistral")
        );
    }
}
