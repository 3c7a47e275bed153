//! Doctor command - verify API keys and configuration.

use crate::cli::preflight::{required_keys, KeyRequirement, Operation};
use crate::cli::Output;
use crate::config::{Settings, TemplateRegistry};
use crate::rag::PipelineConfig;
use console::style;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Lexrag Doctor");
    println!();
    println!("Checking providers and configuration...\n");

    let mut checks = Vec::new();

    println!("{}", style("Providers").bold());
    let provider_checks = vec![
        CheckResult::ok(
            "Embedding",
            &format!("{} ({})", settings.embedding.model, settings.embedding.provider),
        ),
        CheckResult::ok("Vector store", &settings.vector_store.provider),
        CheckResult::ok("Reranker", &settings.reranker.provider),
        CheckResult::ok(
            "LLM",
            &format!("{} ({})", settings.llm.model, settings.llm.provider),
        ),
    ];
    for check in &provider_checks {
        check.print();
    }
    checks.extend(provider_checks);

    println!();

    println!("{}", style("API Keys").bold());
    let key_checks: Vec<CheckResult> = required_keys(settings, Operation::Ask)
        .iter()
        .map(check_api_key)
        .collect();
    if key_checks.is_empty() {
        CheckResult::ok("Keys", "no remote providers configured").print();
    }
    for check in &key_checks {
        check.print();
    }
    checks.extend(key_checks);

    println!();

    println!("{}", style("Storage").bold());
    let dir_checks = check_directories(settings);
    for check in &dir_checks {
        check.print();
    }
    checks.extend(dir_checks);

    println!();

    println!("{}", style("Configuration").bold());
    let config_checks = vec![
        check_config_file(),
        check_pipeline_config(&settings.pipeline_config()),
        check_templates(settings),
    ];
    for check in &config_checks {
        check.print();
    }
    checks.extend(config_checks);

    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Lexrag.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Lexrag is ready to use.");
    }

    Ok(())
}

/// Check that a provider's API key is set, showing it masked.
fn check_api_key(key: &KeyRequirement) -> CheckResult {
    match std::env::var(key.var) {
        Ok(value) if !value.is_empty() => {
            CheckResult::ok(key.var, &format!("configured ({}) for {}", mask(&value), key.role))
        }
        Ok(_) => CheckResult::error(
            key.var,
            "empty",
            &format!("Set with: export {}='...'", key.var),
        ),
        Err(_) => CheckResult::error(
            key.var,
            &format!("not set (needed by {})", key.role),
            &format!("Set with: export {}='...'", key.var),
        ),
    }
}

/// Show the first and last four characters of a secret.
fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 12 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Check data directory and local index.
fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let data_dir = settings.data_dir();
    if data_dir.exists() {
        results.push(CheckResult::ok("Data directory", &format!("{}", data_dir.display())));
    } else {
        results.push(CheckResult::warning(
            "Data directory",
            &format!("{} (will be created)", data_dir.display()),
            "Directory will be created on first use",
        ));
    }

    if settings.vector_store.provider == "sqlite" {
        let db_path = settings.sqlite_path();
        if db_path.exists() {
            let size = std::fs::metadata(&db_path)
                .map(|m| format_size(m.len()))
                .unwrap_or_else(|_| "unknown size".to_string());
            results.push(CheckResult::ok("Index", &format!("{} ({})", db_path.display(), size)));
        } else {
            results.push(CheckResult::warning(
                "Index",
                &format!("{} (not created yet)", db_path.display()),
                "Create it with: lexrag ingest <files>",
            ));
        }
    }

    if settings.vector_store.provider == "pinecone" && settings.vector_store.pinecone_host.is_none() {
        results.push(CheckResult::error(
            "Index",
            "pinecone_host not set",
            "Set vector_store.pinecone_host in the config file",
        ));
    }

    results
}

/// Check if config file exists.
fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: lexrag config init (or lexrag config edit)",
        )
    }
}

fn check_pipeline_config(config: &PipelineConfig) -> CheckResult {
    match config.validate() {
        Ok(()) => CheckResult::ok(
            "Retrieval",
            &format!(
                "top_k {}, min score {:.2}, template {}",
                config.top_k, config.min_score_threshold, config.template_type
            ),
        ),
        Err(e) => CheckResult::error("Retrieval", &e.to_string(), "Fix the [retrieval] section"),
    }
}

fn check_templates(settings: &Settings) -> CheckResult {
    match TemplateRegistry::load(settings.templates.custom_dir.as_deref()) {
        Ok(registry) => {
            let default = &settings.retrieval.template_type;
            if registry.contains(default) {
                CheckResult::ok("Templates", &format!("{} available", registry.names().len()))
            } else {
                CheckResult::warning(
                    "Templates",
                    &format!("default '{}' is not registered", default),
                    "factual_qa will be used instead",
                )
            }
        }
        Err(e) => CheckResult::error("Templates", &e.to_string(), "Fix the custom template files"),
    }
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
