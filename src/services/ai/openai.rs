use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;

use super::{LlmProvider, Message};

/// Chat-completions client for OpenAI and API-compatible hosts (Groq).
pub struct OpenAiProvider {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(
        base_url: String,
        api_key: String,
        model: String,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            client,
        })
    }

    pub fn groq(api_key: String, model: String, timeout: Duration) -> reqwest::Result<Self> {
        Self::new(
            "https://api.groq.com/openai/v1".to_string(),
            api_key,
            model,
            timeout,
        )
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn chat(&self, system_prompt: &str, messages: &[Message]) -> anyhow::Result<String> {
        let mut chat_messages: Vec<serde_json::Value> = messages
            .iter()
            .map(|msg| json!({ "role": msg.role, "content": msg.content }))
            .collect();

        // Step instructions go after the transcript so they override
        // anything the user typed.
        chat_messages.push(json!({
            "role": "system",
            "content": system_prompt,
        }));

        let body = json!({
            "model": self.model,
            "messages": chat_messages,
            "temperature": 0.2,
        });

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("failed to call chat completions API")?;

        let status = resp.status();
        let data: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse chat completions response")?;

        if !status.is_success() {
            anyhow::bail!("chat completions API error ({}): {}", status, data["error"]);
        }

        data["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing content in chat completions response"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groq_targets_compatible_endpoint() {
        let provider = OpenAiProvider::groq(
            "key".to_string(),
            "llama-3.3-70b-versatile".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(provider.base_url, "https://api.groq.com/openai/v1");

        let provider = OpenAiProvider::new(
            "http://localhost:9000/v1/".to_string(),
            String::new(),
            "gpt-4o".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(provider.base_url, "http://localhost:9000/v1");
    }
}
