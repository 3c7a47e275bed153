//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::{Output, RetrievalArgs};
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::rag::QueryOptions;
use anyhow::{Context, Result};

/// Build per-query overrides from CLI flags.
pub(crate) fn query_options(retrieval: &RetrievalArgs) -> QueryOptions {
    QueryOptions {
        top_k: retrieval.top_k,
        use_query_expansion: retrieval.expand.then_some(true),
        rerank_results: retrieval.no_rerank.then_some(false),
        ..Default::default()
    }
}

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    retrieval: &RetrievalArgs,
    template: Option<String>,
    template_file: Option<String>,
    json: bool,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(&settings, Operation::Ask) {
        Output::error(&format!("{}", e));
        Output::info("Run 'lexrag doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let custom_template = match template_file {
        Some(path) => Some(
            std::fs::read_to_string(Settings::expand_path(&path))
                .with_context(|| format!("Failed to read template file {}", path))?,
        ),
        None => None,
    };

    let orchestrator = Orchestrator::new(settings)?;

    let options = QueryOptions {
        template_type: template,
        custom_template,
        ..query_options(retrieval)
    };

    let spinner = Output::spinner("Searching knowledge base...");
    let result = orchestrator.ask(question, &options).await;
    spinner.finish_and_clear();

    let result = match result {
        Ok(result) => result,
        Err(e) => {
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("\n{}\n", result.answer);

    if result.has_context {
        Output::header(&format!("Sources ({} via {})", result.retrieval_count, result.template_used));
        for chunk in &result.formatted_chunks {
            Output::source(chunk);
        }
        println!();
    } else {
        Output::warning("No passages scored above the relevance threshold.");
    }

    Ok(())
}
