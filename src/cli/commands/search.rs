//! Search command implementation.

use super::ask::query_options;
use crate::cli::preflight::{self, Operation};
use crate::cli::{Output, RetrievalArgs};
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(
    query: &str,
    retrieval: &RetrievalArgs,
    json: bool,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(&settings, Operation::Search) {
        Output::error(&format!("{}", e));
        Output::info("Run 'lexrag doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    // Expansion needs the LLM; without it the query is searched as given.
    let orchestrator = if retrieval.expand {
        Orchestrator::new(settings)?
    } else {
        Orchestrator::retrieval_only(settings)?
    };

    let spinner = Output::spinner("Searching...");
    let results = orchestrator.search(query, &query_options(retrieval)).await;
    spinner.finish_and_clear();

    let sources = match results {
        Ok(sources) => sources,
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&sources)?);
        return Ok(());
    }

    if sources.is_empty() {
        Output::warning("No results found matching your query.");
    } else {
        Output::success(&format!("Found {} results", sources.len()));
        for (i, chunk) in sources.iter().enumerate() {
            Output::search_result(i + 1, chunk);
        }
        println!();
    }

    Ok(())
}
