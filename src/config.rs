use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub partner_api_url: String,
    pub partner_username: String,
    pub partner_password: String,
    pub partner_market_id: String,
    pub partner_language_id: String,
    pub card_encryption_key: String,
    pub llm_provider: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub groq_api_key: String,
    pub groq_model: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub http_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3001),
            partner_api_url: env::var("DEVSERVER")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            partner_username: env::var("STATIC_USERNAME").unwrap_or_default(),
            partner_password: env::var("STATIC_PASSWORD").unwrap_or_default(),
            partner_market_id: env::var("PARTNER_MARKET_ID").unwrap_or_else(|_| "JAM".to_string()),
            partner_language_id: env::var("PARTNER_LANGUAGE_ID")
                .unwrap_or_else(|_| "en".to_string()),
            card_encryption_key: env::var("STATIC_ENCRYPTION_KEY").unwrap_or_default(),
            llm_provider: env::var("LLM_PROVIDER").unwrap_or_else(|_| "openai".to_string()),
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            groq_api_key: env::var("GROQ_API_KEY").unwrap_or_default(),
            groq_model: env::var("GROQ_MODEL")
                .unwrap_or_else(|_| "llama-3.3-70b-versatile".to_string()),
            ollama_url: env::var("OLLAMA_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            ollama_model: env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string()),
            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
        }
    }
}
