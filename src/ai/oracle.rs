//! The LLM oracle: `(system, user, schema) -> T | AgentError` (C10, §4.9/§4.10, GLOSSARY Oracle).
//!
//! Grounded on `original_source/app/ai/llm.py`'s provider-branching factory (Google /
//! OpenAI / OpenRouter, each requiring its own API key). The teacher has no
//! LLM-completion client of its own — a grep across the pack for `reqwest::Client`
//! paired with a chat-completions endpoint found none — so the HTTP plumbing here is
//! a fresh `reqwest`-based OpenAI-compatible client, built in the shared-client idiom
//! the teacher uses elsewhere (one `reqwest::Client` reused across calls, constructed
//! once at startup). `with_structured_output`'s guarantee (LangChain forces valid JSON
//! matching the Pydantic model) has no direct reqwest equivalent, so this client
//! requests OpenAI's `json_schema` response format where supported and falls back to
//! stripping markdown code fences / `<think>` blocks before parsing otherwise.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::config::LlmProvider;
use crate::core::error::AgentError;

const GOOGLE_MODEL: &str = "gemini-2.0-flash";
const OPENAI_MODEL: &str = "gpt-4o-mini";

/// A single LLM backend plus the ordered list of models to try (SPEC_FULL §11.2: the
/// `OPENROUTER_MODEL` fallback-list decision — diverges from the original's single
/// model string, since OpenRouter models routinely rate-limit or get deprecated).
#[derive(Debug, Clone)]
pub struct Oracle {
    client: reqwest::Client,
    provider: LlmProvider,
    api_key: String,
    models: Vec<String>,
    base_url: String,
}

impl Oracle {
    /// Build an oracle from resolved config. Fails fast if the selected provider's
    /// API key is missing, mirroring the original's `raise ValueError` in `get_llm`.
    pub fn from_config(
        client: reqwest::Client,
        provider: LlmProvider,
        google_api_key: &str,
        openai_api_key: &str,
        openrouter_api_key: &str,
        openrouter_models: &[String],
    ) -> Result<Self, AgentError> {
        let (api_key, models, base_url) = match provider {
            LlmProvider::Google => {
                if google_api_key.is_empty() {
                    return Err(AgentError::ConfigMissing(
                        "GOOGLE_API_KEY is required when LLM_PROVIDER=google".into(),
                    ));
                }
                (
                    google_api_key.to_string(),
                    vec![GOOGLE_MODEL.to_string()],
                    "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
                )
            }
            LlmProvider::Openai => {
                if openai_api_key.is_empty() {
                    return Err(AgentError::ConfigMissing(
                        "OPENAI_API_KEY is required when LLM_PROVIDER=openai".into(),
                    ));
                }
                (
                    openai_api_key.to_string(),
                    vec![OPENAI_MODEL.to_string()],
                    "https://api.openai.com/v1".to_string(),
                )
            }
            LlmProvider::Openrouter => {
                if openrouter_api_key.is_empty() {
                    return Err(AgentError::ConfigMissing(
                        "OPENROUTER_API_KEY is required when LLM_PROVIDER=openrouter".into(),
                    ));
                }
                if openrouter_models.is_empty() {
                    return Err(AgentError::ConfigMissing(
                        "OPENROUTER_MODEL is required when LLM_PROVIDER=openrouter".into(),
                    ));
                }
                (
                    openrouter_api_key.to_string(),
                    openrouter_models.to_vec(),
                    "https://openrouter.ai/api/v1".to_string(),
                )
            }
        };

        tracing::info!(?provider, model = %models[0], "oracle initialized");

        Ok(Self { client, provider, api_key, models, base_url })
    }

    /// Request a structured completion, trying each fallback model in order on
    /// transport/parse failure, and returning the first that succeeds.
    pub async fn complete<T>(&self, system: &str, user: &str) -> Result<T, AgentError>
    where
        T: DeserializeOwned + JsonSchema,
    {
        let schema = schemars::schema_for!(T);
        let schema_value = serde_json::to_value(&schema).map_err(AgentError::from)?;

        let mut last_err = None;
        for model in &self.models {
            match self.complete_with_model(model, system, user, &schema_value).await {
                Ok(value) => {
                    return serde_json::from_value(value)
                        .map_err(|e| AgentError::Oracle(format!("response did not match schema: {e}")));
                }
                Err(e) => {
                    tracing::warn!(model, error = %e, "oracle model attempt failed");
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| AgentError::Oracle("no models configured".into())))
    }

    async fn complete_with_model(
        &self,
        model: &str,
        system: &str,
        user: &str,
        schema: &Value,
    ) -> Result<Value, AgentError> {
        let body = serde_json::json!({
            "model": model,
            "temperature": 0.1,
            "max_tokens": 4096,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "structured_output",
                    "schema": schema,
                    "strict": true,
                }
            },
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::Oracle(format!("request to {:?} failed: {e}", self.provider)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AgentError::Oracle(format!("{status}: {text}")));
        }

        let payload: Value = response.json().await.map_err(AgentError::from)?;
        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| AgentError::Oracle("missing choices[0].message.content".into()))?;

        parse_structured_content(content)
    }
}

/// Parse a model's raw text response as JSON, falling back to stripping markdown code
/// fences and `<think>...</think>` reasoning blocks that some providers (notably
/// reasoning-tuned OpenRouter models) prepend even when `json_schema` mode is requested.
fn parse_structured_content(raw: &str) -> Result<Value, AgentError> {
    let mut text = raw.trim();

    if let Some(end) = text.find("</think>") {
        text = text[end + "</think>".len()..].trim();
    }

    if let Some(stripped) = text.strip_prefix("```json") {
        text = stripped.trim_start();
    } else if let Some(stripped) = text.strip_prefix("```") {
        text = stripped.trim_start();
    }
    if let Some(stripped) = text.strip_suffix("```") {
        text = stripped.trim_end();
    }

    serde_json::from_str(text)
        .map_err(|e| AgentError::Oracle(format!("failed to parse structured output: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json() {
        let v = parse_structured_content(r#"{"a": 1}"#).unwrap();
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn strips_markdown_code_fence() {
        let v = parse_structured_content("```json\n{\"a\": 1}\n```").unwrap();
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn strips_think_block_before_parsing() {
        let raw = "<think>reasoning about the answer</think>\n{\"a\": 2}";
        let v = parse_structured_content(raw).unwrap();
        assert_eq!(v["a"], 2);
    }

    #[test]
    fn missing_google_key_is_config_error() {
        let err = Oracle::from_config(
            reqwest::Client::new(),
            LlmProvider::Google,
            "",
            "",
            "",
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, AgentError::ConfigMissing(_)));
    }

    #[test]
    fn openrouter_requires_at_least_one_model() {
        let err = Oracle::from_config(
            reqwest::Client::new(),
            LlmProvider::Openrouter,
            "",
            "",
            "key",
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, AgentError::ConfigMissing(_)));
    }
}
