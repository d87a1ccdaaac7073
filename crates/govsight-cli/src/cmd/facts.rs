//! Teach, fact put/get/delete/list, passage add.

use crate::cmd::{boot_kernel, load, runtime};
use crate::ui;
use govsight_kernel::error::KernelError;
use std::path::PathBuf;

fn fail(e: &KernelError) -> ! {
    ui::error(&e.to_string());
    std::process::exit(1);
}

pub fn cmd_teach(config: Option<PathBuf>, statement: &str) {
    let kernel = boot_kernel(load(config));
    match kernel.teach(statement) {
        Ok(parsed) => {
            ui::success(&format!("Learned {} = {}", parsed.key, parsed.value));
        }
        Err(KernelError::Unparseable(_)) => {
            ui::error_with_fix(
                "Could not read a fact from that sentence",
                "Phrase it as \"The <attribute> of <place> is <value>.\" or use `govsight fact put`",
            );
            std::process::exit(1);
        }
        Err(e) => fail(&e),
    }
}

pub fn cmd_fact_put(
    config: Option<PathBuf>,
    subject: &str,
    attribute: &str,
    value: &str,
    source: Option<String>,
) {
    let kernel = boot_kernel(load(config));
    let source = source.as_deref().or(Some("cli"));
    if let Err(e) = kernel.put_fact(subject, attribute, value, source) {
        fail(&e);
    }
    ui::success(&format!(
        "Stored {} of {}",
        kernel.parser().canonical_attribute(attribute),
        subject
    ));
}

pub fn cmd_fact_get(config: Option<PathBuf>, subject: &str, attribute: &str) {
    let kernel = boot_kernel(load(config));
    match kernel.get_fact(subject, attribute) {
        Ok(Some(fact)) => {
            ui::kv("Subject", &fact.subject);
            ui::kv("Attribute", &fact.attribute);
            ui::kv_ok("Value", &fact.value);
            ui::kv("Source", fact.source.as_deref().unwrap_or("-"));
            ui::kv("Updated", &fact.updated_at.to_rfc3339());
        }
        Ok(None) => {
            ui::error(&format!("No fact for ({subject}, {attribute})"));
            std::process::exit(1);
        }
        Err(e) => fail(&e),
    }
}

pub fn cmd_fact_delete(config: Option<PathBuf>, subject: &str, attribute: &str) {
    let kernel = boot_kernel(load(config));
    match kernel.delete_fact(subject, attribute) {
        Ok(true) => ui::success(&format!("Deleted ({subject}, {attribute})")),
        Ok(false) => ui::check_warn(&format!("No fact for ({subject}, {attribute})")),
        Err(e) => fail(&e),
    }
}

pub fn cmd_fact_list(config: Option<PathBuf>, subject: &str, json: bool) {
    let kernel = boot_kernel(load(config));
    let facts = match kernel.facts_for_subject(subject) {
        Ok(facts) => facts,
        Err(e) => fail(&e),
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&facts).unwrap_or_default()
        );
        return;
    }

    if facts.is_empty() {
        ui::check_warn(&format!("No facts stored for \"{subject}\""));
        return;
    }
    ui::section(&format!("Facts for {}", facts[0].subject));
    ui::blank();
    for fact in &facts {
        ui::kv(&fact.attribute, &fact.value);
    }
}

pub fn cmd_passage_add(config: Option<PathBuf>, text: &str, source: Option<String>) {
    let kernel = boot_kernel(load(config));
    let rt = runtime();
    match rt.block_on(kernel.add_passage(text, source.as_deref())) {
        Ok(id) => ui::success(&format!("Indexed passage {id}")),
        Err(e) => {
            ui::error_with_fix(
                &format!("Failed to index passage: {e}"),
                "Set the embedding API key (see [embedding] in config.toml)",
            );
            std::process::exit(1);
        }
    }
}
