//! Prompt construction and answer generation.

use super::context;
use crate::config::templates::{create_custom_template, format_template, CUSTOM_TEMPLATE_NAME};
use crate::config::TemplateRegistry;
use crate::error::Result;
use crate::llm::{GenerationOptions, Generator};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Returned when retrieval found nothing to ground an answer on.
pub const NO_CONTEXT_ANSWER: &str = "I don't have enough information to answer this question.";

/// Output of a single generation step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedAnswer {
    pub answer: String,
    pub has_context: bool,
    /// Name of the template actually used.
    pub template_used: String,
    /// Characters of context sent to the model. `None` on the no-context path.
    pub context_char_count: Option<usize>,
    pub chunks_used: Option<usize>,
}

/// Builds prompts from templates and calls the generator.
pub struct AnswerGenerator {
    generator: Arc<dyn Generator>,
    templates: Arc<TemplateRegistry>,
    default_template_type: String,
    max_context_length: usize,
    temperature: f32,
}

impl AnswerGenerator {
    pub fn new(
        generator: Arc<dyn Generator>,
        templates: Arc<TemplateRegistry>,
        default_template_type: &str,
        max_context_length: usize,
        temperature: f32,
    ) -> Self {
        Self {
            generator,
            templates,
            default_template_type: default_template_type.to_string(),
            max_context_length,
            temperature,
        }
    }

    /// Answer `query` from `retrieved_chunks`.
    ///
    /// `custom_template` takes precedence over `template_type`. With no
    /// chunks the fixed [`NO_CONTEXT_ANSWER`] is returned without calling
    /// the generator, reporting the requested template name as given.
    #[instrument(skip(self, retrieved_chunks, custom_template), fields(chunks = retrieved_chunks.len()))]
    pub async fn generate_answer(
        &self,
        query: &str,
        retrieved_chunks: &[String],
        template_type: Option<&str>,
        custom_template: Option<&str>,
    ) -> Result<GeneratedAnswer> {
        let (template, template_used) = self.select_template(template_type, custom_template)?;

        if retrieved_chunks.is_empty() {
            info!("No context retrieved, skipping generation");
            let requested = template_type.unwrap_or(self.default_template_type.as_str());
            return Ok(GeneratedAnswer {
                answer: NO_CONTEXT_ANSWER.to_string(),
                has_context: false,
                template_used: requested.to_string(),
                context_char_count: None,
                chunks_used: None,
            });
        }

        let context = context::assemble(retrieved_chunks, self.max_context_length);
        let prompt = format_template(&template, &context, query);
        debug!(
            "Generating with template '{}' ({} context chars)",
            template_used,
            context.chars().count()
        );

        let answer = self
            .generator
            .generate(&prompt, &GenerationOptions::with_temperature(self.temperature))
            .await?;

        Ok(GeneratedAnswer {
            answer: answer.trim().to_string(),
            has_context: true,
            template_used,
            context_char_count: Some(context.chars().count()),
            chunks_used: Some(retrieved_chunks.len()),
        })
    }

    /// Resolve the template text and the name to report for it.
    fn select_template(
        &self,
        template_type: Option<&str>,
        custom_template: Option<&str>,
    ) -> Result<(String, String)> {
        if let Some(custom) = custom_template {
            let template = create_custom_template(custom)?;
            return Ok((template, CUSTOM_TEMPLATE_NAME.to_string()));
        }

        let requested = template_type.unwrap_or(self.default_template_type.as_str());
        let name = if self.templates.contains(requested) {
            requested
        } else {
            debug!("Unknown template '{}', using default", requested);
            crate::config::templates::DEFAULT_TEMPLATE
        };

        Ok((self.templates.get_template(name).to_string(), name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LexragError;
    use crate::testing::FakeGenerator;

    fn answer_generator(generator: Arc<FakeGenerator>, max_context_length: usize) -> AnswerGenerator {
        AnswerGenerator::new(
            generator,
            Arc::new(TemplateRegistry::default()),
            "factual_qa",
            max_context_length,
            0.2,
        )
    }

    fn chunks() -> Vec<String> {
        vec![
            "Directors must act within their powers.".to_string(),
            "Directors must promote the success of the company.".to_string(),
        ]
    }

    #[tokio::test]
    async fn test_no_context_skips_generator() {
        let generator = Arc::new(FakeGenerator::new("invented"));
        let answers = answer_generator(generator.clone(), 4000);

        let result = answers
            .generate_answer("director duties", &[], None, None)
            .await
            .unwrap();

        assert!(!result.has_context);
        assert_eq!(result.answer, NO_CONTEXT_ANSWER);
        assert_eq!(result.context_char_count, None);
        assert_eq!(result.template_used, "factual_qa");
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_no_context_reports_requested_template() {
        let generator = Arc::new(FakeGenerator::new("invented"));
        let answers = answer_generator(generator.clone(), 4000);

        let result = answers
            .generate_answer("director duties", &[], Some("legal_expert"), None)
            .await
            .unwrap();

        assert!(!result.has_context);
        assert_eq!(result.template_used, "legal_expert");
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_prompt_contains_context_and_query() {
        let generator = Arc::new(FakeGenerator::new("  Directors owe seven duties.\n"));
        let answers = answer_generator(generator.clone(), 4000);

        let result = answers
            .generate_answer("director duties", &chunks(), Some("concise"), None)
            .await
            .unwrap();

        assert!(result.has_context);
        assert_eq!(result.answer, "Directors owe seven duties.");
        assert_eq!(result.template_used, "concise");
        assert_eq!(result.chunks_used, Some(2));

        let prompt = &generator.prompts()[0];
        assert!(prompt.contains("Directors must act within their powers.\n\n---\n\nDirectors must promote"));
        assert!(prompt.contains("Query: \"director duties\""));
        assert!(!prompt.contains("{context}"));
    }

    #[tokio::test]
    async fn test_unknown_template_uses_factual_qa() {
        let generator = Arc::new(FakeGenerator::new("answer"));
        let answers = answer_generator(generator.clone(), 4000);

        let result = answers
            .generate_answer("director duties", &chunks(), Some("legal_expert"), None)
            .await
            .unwrap();

        assert_eq!(result.template_used, "factual_qa");
        assert!(generator.prompts()[0].starts_with("You are a helpful assistant providing factual information."));
    }

    #[tokio::test]
    async fn test_custom_template_overrides_type() {
        let generator = Arc::new(FakeGenerator::new("answer"));
        let answers = answer_generator(generator.clone(), 4000);

        let result = answers
            .generate_answer(
                "director duties",
                &chunks(),
                Some("concise"),
                Some("CTX: {context}\nQ: {query}"),
            )
            .await
            .unwrap();

        assert_eq!(result.template_used, "custom");
        assert!(generator.prompts()[0].ends_with("Q: director duties"));
    }

    #[tokio::test]
    async fn test_invalid_custom_template_fails_before_generation() {
        let generator = Arc::new(FakeGenerator::new("answer"));
        let answers = answer_generator(generator.clone(), 4000);

        let err = answers
            .generate_answer("director duties", &chunks(), None, Some("Q: {query}"))
            .await
            .unwrap_err();

        assert!(matches!(err, LexragError::TemplateValidation(_)));
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_context_is_bounded() {
        let generator = Arc::new(FakeGenerator::new("answer"));
        let answers = answer_generator(generator, 20);

        let result = answers
            .generate_answer("director duties", &chunks(), None, None)
            .await
            .unwrap();

        assert_eq!(result.context_char_count, Some(23));
    }

    #[tokio::test]
    async fn test_generation_failure_propagates() {
        let answers = answer_generator(Arc::new(FakeGenerator::failing()), 4000);
        let err = answers
            .generate_answer("director duties", &chunks(), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LexragError::Generation(_)));
    }
}
