/*!
 * Request payload construction.
 *
 * Pure mapping from (task, text, glossary, model) to a request body. No IO,
 * no retries. Missing glossaries are the caller's concern; the builder just
 * leaves the name block out.
 */

use crate::providers::GenerateRequest;
use crate::translation::glossary::strip_markup;
use crate::translation::task::TaskKind;

/// Fixed prompt texts
pub struct PromptTemplate;

impl PromptTemplate {
    /// Header placed before the segment text in the translate task
    pub const SOURCE_HEADER: &'static str = "---- Source text to translate ----\n";

    /// Introduces the glossary block
    pub const GLOSSARY_HEADER: &'static str = "Translate character names using the following table:\n\n";

    /// Closes the glossary block
    pub const GLOSSARY_FOOTER: &'static str = "\n------------------------\n\n";

    /// Single-name prompt used by the fix-name task
    pub const FIX_NAME: &'static str =
        "Translate the following name into Vietnamese. Reply with the name only, no explanation.\n\n";

    /// Single-line prompt used by the fix-translation task
    pub const FIX_TRANSLATION: &'static str = "You are a professional translator.\n\
         The following Vietnamese text still contains Chinese words. Replace every Chinese word with a fitting Vietnamese equivalent.\n\
         The corrected text must not contain any Chinese characters.\n\
         Reply with the corrected text only, no explanation.\n\n";
}

/// Builds request bodies for one run
#[derive(Debug, Clone, Default)]
pub struct PayloadBuilder {
    /// Optional system prompt loaded at startup
    system_prompt: Option<String>,
    /// Sampling temperature sent with every request
    temperature: f32,
}

impl PayloadBuilder {
    /// Create a builder; a blank system prompt counts as none
    pub fn new(system_prompt: Option<String>, temperature: f32) -> Self {
        Self {
            system_prompt: system_prompt.filter(|p| !p.trim().is_empty()),
            temperature,
        }
    }

    /// Build the request body for one attempt
    pub fn build(
        &self,
        task: TaskKind,
        text: &str,
        glossary: Option<&str>,
        model: &str,
    ) -> GenerateRequest {
        let user_prompt = Self::user_prompt(task, text, glossary);
        self.finish(user_prompt, model)
    }

    /// User turn for a task; the glossary is only used by translate
    pub fn user_prompt(task: TaskKind, text: &str, glossary: Option<&str>) -> String {
        match task {
            TaskKind::Translate => {
                let guide = glossary
                    .map(strip_markup)
                    .filter(|names| !names.trim().is_empty())
                    .map(|names| {
                        format!(
                            "{}{}{}",
                            PromptTemplate::GLOSSARY_HEADER,
                            names,
                            PromptTemplate::GLOSSARY_FOOTER
                        )
                    })
                    .unwrap_or_default();
                format!("{}{}{}", PromptTemplate::SOURCE_HEADER, text, guide)
            }
            TaskKind::ExtractName | TaskKind::Normalize => text.to_string(),
            TaskKind::FixName => format!("{}{}", PromptTemplate::FIX_NAME, text.trim()),
            TaskKind::FixTranslation => {
                format!("{}{}", PromptTemplate::FIX_TRANSLATION, text.trim())
            }
        }
    }

    /// Attach the system prompt the way the target model accepts it
    fn finish(&self, user_prompt: String, model: &str) -> GenerateRequest {
        match &self.system_prompt {
            // Gemma models reject systemInstruction, so the prompt is inlined
            Some(system) if Self::inlines_system_prompt(model) => {
                GenerateRequest::new(format!("{}\n\n{}", system, user_prompt), self.temperature)
            }
            Some(system) => {
                GenerateRequest::new(user_prompt, self.temperature).system(system.clone())
            }
            None => GenerateRequest::new(user_prompt, self.temperature),
        }
    }

    fn inlines_system_prompt(model: &str) -> bool {
        model.to_lowercase().contains("gemma")
    }
}
