//! Command implementations by domain.

pub mod ask;
pub mod facts;
pub mod system;

use crate::ui;
use govsight_kernel::config::load_config;
use govsight_kernel::error::KernelError;
use govsight_kernel::GovsightKernel;
use govsight_types::config::GovsightConfig;
use std::path::PathBuf;

pub(crate) fn boot_kernel_error(e: &KernelError) {
    let msg = e.to_string();
    if msg.contains("database") || msg.contains("locked") || msg.contains("sqlite") {
        ui::error_with_fix(
            "Database error (file may be locked)",
            "Check if another GovSight process is using the same database",
        );
    } else if msg.contains("template") || msg.contains("regex") || msg.contains("Config") {
        ui::error_with_fix(
            &format!("Invalid parser configuration: {msg}"),
            "Check the [parser] section of ~/.govsight/config.toml",
        );
    } else {
        ui::error_with_fix(
            &format!("Failed to boot kernel: {msg}"),
            "Run `govsight init` to create a default configuration",
        );
    }
}

/// Load configuration for a command that needs the full stack.
pub(crate) fn load(config: Option<PathBuf>) -> GovsightConfig {
    load_config(config.as_deref())
}

pub(crate) fn boot_kernel(config: GovsightConfig) -> GovsightKernel {
    match GovsightKernel::boot(config) {
        Ok(k) => k,
        Err(e) => {
            boot_kernel_error(&e);
            std::process::exit(1);
        }
    }
}

pub(crate) fn runtime() -> tokio::runtime::Runtime {
    match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            ui::error(&format!("Failed to start async runtime: {e}"));
            std::process::exit(1);
        }
    }
}
