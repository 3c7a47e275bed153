//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the ingest command.
pub async fn run_ingest(paths: &[String], settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(&settings, Operation::Ingest) {
        Output::error(&format!("{}", e));
        Output::info("Run 'lexrag doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::retrieval_only(settings)?;

    let pb = Output::progress_bar(paths.len() as u64, "Indexing");
    let mut total_chunks = 0;
    let mut documents = 0;

    for path in paths {
        let path = Settings::expand_path(path);
        pb.set_message(path.display().to_string());

        match orchestrator.ingest(&path).await {
            Ok(results) => {
                for result in &results {
                    total_chunks += result.chunks_indexed;
                    pb.println(format!("  {} ({} chunks)", result.reference, result.chunks_indexed));
                }
                documents += results.len();
            }
            Err(e) => {
                pb.finish_and_clear();
                Output::error(&format!("Failed to ingest {}: {}", path.display(), e));
                return Err(e.into());
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();

    if documents == 0 {
        Output::warning("No .txt or .md files found.");
        return Ok(());
    }

    Output::success(&format!("Indexed {} chunks from {} documents", total_chunks, documents));
    if let Some(count) = orchestrator.index_count().await? {
        Output::kv("Index size", &format!("{} records", count));
    }

    Ok(())
}
