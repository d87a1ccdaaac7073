//! Init and stats.

use crate::cmd::{boot_kernel, load};
use crate::ui;
use govsight_kernel::config::{default_config_path, write_default_config};
use std::path::PathBuf;

pub fn cmd_init(config: Option<PathBuf>) {
    let path = config.unwrap_or_else(default_config_path);
    match write_default_config(&path) {
        Ok(true) => ui::success(&format!("Wrote {}", path.display())),
        Ok(false) => ui::check_warn(&format!("{} already exists, left unchanged", path.display())),
        Err(e) => {
            ui::error_with_fix(
                &format!("Failed to write {}: {e}", path.display()),
                "Check permissions on the config directory",
            );
            std::process::exit(1);
        }
    }

    let cfg = load(Some(path));
    if let Err(e) = std::fs::create_dir_all(&cfg.home_dir) {
        ui::error(&format!("Failed to create {}: {e}", cfg.home_dir.display()));
        std::process::exit(1);
    }

    ui::blank();
    check_key("Embedding key", &cfg.embedding.api_key_env);
    check_key("LLM key", &cfg.llm.api_key_env);
    if cfg.web.enabled {
        ui::check_ok("Web fallback enabled");
    } else {
        ui::check_warn("Web fallback disabled");
    }
    ui::blank();
    ui::hint("Next: govsight teach \"The mayor of <place> is <name>.\"");
}

fn check_key(label: &str, env: &str) {
    if std::env::var(env).map(|v| !v.is_empty()).unwrap_or(false) {
        ui::check_ok(&format!("{label} found in ${env}"));
    } else {
        ui::check_warn(&format!("{label} not set (${env})"));
    }
}

pub fn cmd_stats(config: Option<PathBuf>, json: bool) {
    let kernel = boot_kernel(load(config));
    let stats = match kernel.stats() {
        Ok(s) => s,
        Err(e) => {
            ui::error(&e.to_string());
            std::process::exit(1);
        }
    };
    let cfg = kernel.config();

    if json {
        let body = serde_json::json!({
            "facts": stats.facts,
            "passages": stats.passages,
            "db_path": cfg.db_path(),
            "vector_threshold": cfg.cascade.vector_threshold,
            "query_timeout_secs": cfg.cascade.query_timeout_secs,
            "web_enabled": cfg.web.enabled,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );
        return;
    }

    ui::section("GovSight");
    ui::blank();
    ui::kv("Database", &cfg.db_path().display().to_string());
    ui::kv("Facts", &stats.facts.to_string());
    ui::kv("Passages", &stats.passages.to_string());
    ui::kv("Threshold", &format!("{:.2}", cfg.cascade.vector_threshold));
    match cfg.cascade.query_timeout_secs {
        0 => ui::kv_warn("Timeout", "none"),
        secs => ui::kv("Timeout", &format!("{secs}s")),
    }
    if cfg.web.enabled {
        ui::kv_ok("Web", &format!("{:?}", cfg.web.search_provider).to_lowercase());
    } else {
        ui::kv_warn("Web", "disabled");
    }
}
