//! Next-turn prompt construction.

use parley_config::LAST_RESPONSE_PLACEHOLDER;

/// Wraps the previous turn's text in the instruction for the next speaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// `template` should contain `{last}`; validated configs guarantee it.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn render(&self, last_response: &str) -> String {
        self.template
            .replace(LAST_RESPONSE_PLACEHOLDER, last_response)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(parley_config::AppConfig::default().prompt_template)
    }
}
