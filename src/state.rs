use crate::config::AppConfig;
use crate::services::ai::LlmProvider;
use crate::services::partner::PartnerApi;

pub struct AppState {
    pub config: AppConfig,
    pub llm: Box<dyn LlmProvider>,
    pub partner: Box<dyn PartnerApi>,
}
