//! CLI module for Lexrag.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Lexrag - grounded question answering over legal text
///
/// Retrieves relevant passages from a vector index and answers questions
/// strictly from them, citing every source.
#[derive(Parser, Debug)]
#[command(name = "lexrag")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Retrieval overrides shared by `ask` and `search`.
#[derive(clap::Args, Debug, Clone)]
pub struct RetrievalArgs {
    /// Number of candidates requested from the index
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Expand the query with the LLM before searching
    #[arg(long)]
    pub expand: bool,

    /// Keep vector order even when a reranker is configured
    #[arg(long)]
    pub no_rerank: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check API keys and configuration
    Doctor,

    /// Ask a question and get a grounded answer with sources
    Ask {
        /// The question to ask
        question: String,

        #[command(flatten)]
        retrieval: RetrievalArgs,

        /// Prompt template (see `lexrag templates`)
        #[arg(short, long)]
        template: Option<String>,

        /// File containing a custom template with {context} and {query}
        #[arg(long, conflicts_with = "template")]
        template_file: Option<String>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search for relevant passages without generating an answer
    Search {
        /// Search query
        query: String,

        #[command(flatten)]
        retrieval: RetrievalArgs,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Chunk, embed and index text files
    Ingest {
        /// Files or directories (.txt and .md files are picked up)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// List available prompt templates
    Templates {
        /// Print the full text of one template
        #[arg(short, long)]
        show: Option<String>,
    },

    /// Start HTTP API server for integration with other systems
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Write the default configuration file if none exists
    Init,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask_with_overrides() {
        let cli = Cli::try_parse_from([
            "lexrag", "-vv", "ask", "What are director duties?", "-k", "10", "--no-rerank", "-t",
            "concise",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Ask {
                question,
                retrieval,
                template,
                json,
                ..
            } => {
                assert_eq!(question, "What are director duties?");
                assert_eq!(retrieval.top_k, Some(10));
                assert!(retrieval.no_rerank);
                assert!(!retrieval.expand);
                assert_eq!(template.as_deref(), Some("concise"));
                assert!(!json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_ingest_requires_paths() {
        assert!(Cli::try_parse_from(["lexrag", "ingest"]).is_err());
    }
}
