//! Prompt templates for answer generation.
//!
//! Every template is a plain string with exactly two placeholders,
//! `{context}` and `{query}`. Additional templates can be added by placing
//! TOML files in the custom templates directory:
//!
//! ```toml
//! name = "plain_english"   # optional, defaults to the file stem
//! template = """
//! Context:
//! {context}
//!
//! Explain "{query}" without legal jargon.
//! """
//! ```

use crate::error::{LexragError, Result};
use regex::{Captures, Regex};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::{debug, info};

/// Template used when a requested name is not registered.
pub const DEFAULT_TEMPLATE: &str = "factual_qa";

/// Name reported when a caller-supplied template is used.
pub const CUSTOM_TEMPLATE_NAME: &str = "custom";

const CONTEXT_PLACEHOLDER: &str = "{context}";
const QUERY_PLACEHOLDER: &str = "{query}";

const LEGAL_ASSISTANT: &str = r#"You are a legal assistant helping interpret corporate legal text using Kenya's Companies Act.
ONLY USE the provided context to answer the query. If you don't know the answer, just say that you don't know. DO NOT make up an answer or assumptions that are not in the context.

Context: {context}

Explain the following query strictly using the context above, in three distinct paragraphs
1. As a Lawyer - using legal terminology and references.
2. As an ordinary citizen - using simple and relatable language.
3. As an entrepreneur - focusing on practical business impact.

Query: {query}"#;

const FACTUAL_QA: &str = r#"You are a helpful assistant providing factual information.

The following context contains information to answer the query. ONLY use this context to answer.

Context:
{context}

Query: "{query}"

Answer the query based ONLY on the provided context. If the context doesn't contain the answer, say "I don't have enough information to answer this question.""#;

const CRITICAL_ANALYSIS: &str = r#"You are an analytical assistant helping to critically examine information.

Below is context that might help answer the query. Analyze this information carefully.

Context:
{context}

Query: "{query}"

Based strictly on the context above:
1. What are the key facts relevant to the query?
2. What are different perspectives on this issue?
3. What conclusions can be drawn with confidence?
4. What remains uncertain or requires more information?

Be explicit about what information comes directly from the context versus what is inference."#;

const MULTI_PERSPECTIVE: &str = r#"You are a balanced assistant offering multiple perspectives.

Review the following context to answer the query:

Context:
{context}

Query: "{query}"

Please provide three different perspectives on this query based only on the context provided:
1. Perspective One: [summary of first major viewpoint]
2. Perspective Two: [summary of alternative viewpoint]
3. Perspective Three: [summary of another alternative viewpoint]

For each perspective, cite specific parts of the context. If the context doesn't support multiple perspectives, explain why."#;

const CONCISE: &str = r#"You are a direct and concise assistant.

Context:
{context}

Query: "{query}"

Answer the query in no more than 3 sentences, using only information from the context. Be direct and precise."#;

/// Named prompt templates.
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: BTreeMap<String, String>,
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        let templates = [
            ("legal_assistant", LEGAL_ASSISTANT),
            ("factual_qa", FACTUAL_QA),
            ("critical_analysis", CRITICAL_ANALYSIS),
            ("multi_perspective", MULTI_PERSPECTIVE),
            ("concise", CONCISE),
        ]
        .into_iter()
        .map(|(name, body)| (name.to_string(), body.to_string()))
        .collect();

        Self { templates }
    }
}

/// On-disk format of a custom template file.
#[derive(Debug, Deserialize)]
struct TemplateFile {
    name: Option<String>,
    template: String,
}

impl TemplateRegistry {
    /// Load the built-in templates plus any `*.toml` files in `custom_dir`.
    pub fn load(custom_dir: Option<&str>) -> Result<Self> {
        let mut registry = Self::default();

        let Some(dir) = custom_dir else {
            return Ok(registry);
        };

        let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());
        if !custom_path.is_dir() {
            debug!("Custom template directory {:?} not found, using built-ins", custom_path);
            return Ok(registry);
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(&custom_path)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        paths.sort();

        for path in paths {
            let content = std::fs::read_to_string(&path)?;
            let file: TemplateFile = toml::from_str(&content)?;
            let name = match file.name {
                Some(name) => name,
                None => path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .ok_or_else(|| LexragError::Config(format!("Bad template path: {:?}", path)))?,
            };
            registry.register(&name, &file.template).map_err(|e| {
                LexragError::TemplateValidation(format!("{} ({}): {}", name, path.display(), e))
            })?;
            info!("Loaded custom template '{}'", name);
        }

        Ok(registry)
    }

    /// Add or replace a template after validating its placeholders.
    pub fn register(&mut self, name: &str, template: &str) -> Result<()> {
        let template = create_custom_template(template)?;
        self.templates.insert(name.to_string(), template);
        Ok(())
    }

    /// Get a template by name, falling back to [`DEFAULT_TEMPLATE`].
    pub fn get_template(&self, name: &str) -> &str {
        self.templates
            .get(name)
            .or_else(|| self.templates.get(DEFAULT_TEMPLATE))
            .map(String::as_str)
            .unwrap_or(FACTUAL_QA)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Registered template names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }
}

/// Validate and return a custom template.
///
/// The template must contain both `{context}` and `{query}`.
pub fn create_custom_template(template: &str) -> Result<String> {
    let missing: Vec<&str> = [CONTEXT_PLACEHOLDER, QUERY_PLACEHOLDER]
        .into_iter()
        .filter(|p| !template.contains(p))
        .collect();

    if missing.is_empty() {
        Ok(template.to_string())
    } else {
        Err(LexragError::TemplateValidation(format!(
            "template must contain {{context}} and {{query}} placeholders (missing {})",
            missing.join(", ")
        )))
    }
}

/// Substitute `{context}` and `{query}` in a single pass.
///
/// Placeholder text appearing inside the substituted values is left as-is.
pub fn format_template(template: &str, context: &str, query: &str) -> String {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    let re = PLACEHOLDER.get_or_init(|| Regex::new(r"\{(context|query)\}").expect("valid regex"));

    re.replace_all(template, |caps: &Captures<'_>| match &caps[1] {
        "context" => context.to_string(),
        _ => query.to_string(),
    })
    .into_owned()
}
