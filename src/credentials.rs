//! Credential lookup for the grading backend.
//!
//! Each provider reads its key from a conventional environment variable.
//! Gemini accepts two names (`GEMINI_API_KEY`, then `GOOGLE_API_KEY`); the
//! first non-empty one wins. Local providers need no key at all.

use crate::error::GradeError;
use edgequake_llm::ProviderType;
use tracing::debug;

/// Provider used when none is configured.
pub const DEFAULT_PROVIDER: &str = "gemini";

/// Environment variables checked for `provider`, in priority order.
///
/// An empty slice means the provider runs without a key.
pub fn credential_vars(provider: &str) -> &'static [&'static str] {
    match ProviderType::from_str(provider) {
        Some(ProviderType::Gemini) => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
        Some(ProviderType::OpenAI) => &["OPENAI_API_KEY"],
        Some(ProviderType::Anthropic) => &["ANTHROPIC_API_KEY"],
        Some(ProviderType::Mistral) => &["MISTRAL_API_KEY"],
        Some(ProviderType::OpenRouter) => &["OPENROUTER_API_KEY"],
        Some(ProviderType::AzureOpenAI) => &["AZURE_OPENAI_API_KEY"],
        _ => &[],
    }
}

/// A resolved credential and where it came from.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub source: CredentialSource,
    secret: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Supplied directly through the config.
    Explicit,
    /// Read from the named environment variable.
    Env(&'static str),
    /// The provider needs no key.
    NotRequired,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("source", &self.source)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl Credential {
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

/// Resolve the credential for `provider` from an explicit key or the process
/// environment.
pub fn resolve(provider: &str, explicit: Option<&str>) -> Result<Credential, GradeError> {
    resolve_with(provider, explicit, |name| std::env::var(name).ok())
}

/// Same as [`resolve`] with an injectable variable lookup.
pub fn resolve_with(
    provider: &str,
    explicit: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Credential, GradeError> {
    if let Some(key) = explicit.filter(|k| !k.trim().is_empty()) {
        return Ok(Credential {
            source: CredentialSource::Explicit,
            secret: key.to_string(),
        });
    }

    let vars = credential_vars(provider);
    if vars.is_empty() {
        return Ok(Credential {
            source: CredentialSource::NotRequired,
            secret: String::new(),
        });
    }

    for &name in vars {
        if let Some(value) = lookup(name).filter(|v| !v.trim().is_empty()) {
            debug!("Using credential from {}", name);
            return Ok(Credential {
                source: CredentialSource::Env(name),
                secret: value,
            });
        }
    }

    Err(GradeError::Configuration {
        provider: provider.to_string(),
        hint: format!("Set {} in the environment.", vars.join(" or ")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn gemini_prefers_gemini_key() {
        let c = resolve_with(
            "gemini",
            None,
            env(&[("GEMINI_API_KEY", "a"), ("GOOGLE_API_KEY", "b")]),
        )
        .unwrap();
        assert_eq!(c.source, CredentialSource::Env("GEMINI_API_KEY"));
        assert_eq!(c.secret(), "a");
    }

    #[test]
    fn gemini_falls_back_to_google_key() {
        let c = resolve_with(
            "gemini",
            None,
            env(&[("GEMINI_API_KEY", ""), ("GOOGLE_API_KEY", "b")]),
        )
        .unwrap();
        assert_eq!(c.source, CredentialSource::Env("GOOGLE_API_KEY"));
    }

    #[test]
    fn missing_key_is_configuration_error() {
        let err = resolve_with("gemini", None, env(&[])).unwrap_err();
        assert!(matches!(err, GradeError::Configuration { .. }));
        assert!(err.to_string().contains("GEMINI_API_KEY or GOOGLE_API_KEY"));
    }

    #[test]
    fn explicit_key_wins() {
        let c = resolve_with("openai", Some("sk-test"), env(&[])).unwrap();
        assert_eq!(c.source, CredentialSource::Explicit);
    }

    #[test]
    fn local_provider_needs_no_key() {
        let c = resolve_with("ollama", None, env(&[])).unwrap();
        assert_eq!(c.source, CredentialSource::NotRequired);
    }

    #[test]
    fn provider_aliases_share_variables() {
        assert_eq!(credential_vars("Google"), credential_vars("gemini"));
        assert_eq!(credential_vars("claude"), &["ANTHROPIC_API_KEY"]);
        assert!(credential_vars("lmstudio").is_empty());
    }

    #[test]
    fn debug_redacts_secret() {
        let c = resolve_with("openai", Some("sk-very-secret"), env(&[])).unwrap();
        assert!(!format!("{c:?}").contains("very-secret"));
    }
}
