//! Templates command implementation.

use crate::cli::Output;
use crate::config::{Settings, TemplateRegistry};
use anyhow::{bail, Result};

/// List registered templates, or print one in full.
pub fn run_templates(show: Option<&str>, settings: &Settings) -> Result<()> {
    let registry = TemplateRegistry::load(settings.templates.custom_dir.as_deref())?;

    if let Some(name) = show {
        if !registry.contains(name) {
            bail!("Unknown template '{}'. Run 'lexrag templates' to list them.", name);
        }
        println!("{}", registry.get_template(name));
        return Ok(());
    }

    Output::header("Templates");
    for name in registry.names() {
        if name == settings.retrieval.template_type {
            Output::list_item(&format!("{} (default)", name));
        } else {
            Output::list_item(name);
        }
    }

    if let Some(dir) = &settings.templates.custom_dir {
        println!();
        Output::kv("Custom directory", dir);
    }

    Ok(())
}
