//! CLI output formatting utilities.

use crate::rag::{FormattedChunk, RetrievedChunk};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Characters of passage text shown per source.
const SOURCE_PREVIEW_CHARS: usize = 200;

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print a numbered source from an answer.
    pub fn source(chunk: &FormattedChunk) {
        println!(
            "\n{} {} (score: {:.4})",
            style(format!("[{}]", chunk.index)).green(),
            style(&chunk.reference).bold(),
            chunk.score
        );
        println!("   {}", content_preview(&chunk.text, SOURCE_PREVIEW_CHARS));
    }

    /// Print a search result.
    pub fn search_result(position: usize, chunk: &RetrievedChunk) {
        let rerank = chunk
            .rerank_score
            .map(|s| format!(", rerank: {:.4}", s))
            .unwrap_or_default();
        println!(
            "\n{} {} (score: {:.4}{})",
            style(format!("{}.", position)).green(),
            style(&chunk.reference).bold(),
            chunk.score,
            rerank
        );
        println!("   {}", content_preview(&chunk.text, SOURCE_PREVIEW_CHARS));
    }

    /// Create a progress bar.
    pub fn progress_bar(len: u64, msg: &str) -> ProgressBar {
        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_message(msg.to_string());
        pb
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Single-line preview, cut on a character boundary.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    match content.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &content[..byte_idx]),
        None => content,
    }
}
