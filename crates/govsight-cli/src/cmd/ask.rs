//! Ask and chat: run questions through the retrieval cascade.

use crate::cmd::{boot_kernel, load, runtime};
use crate::ui;
use govsight_kernel::{CancelHandle, GovsightKernel};
use govsight_types::retrieval::{NoAnswerFound, RetrievalResult};
use std::io::{BufRead, Write};
use std::path::PathBuf;

pub fn cmd_ask(config: Option<PathBuf>, query: &str, timeout: Option<u64>, json: bool) {
    let mut cfg = load(config);
    if let Some(secs) = timeout {
        cfg.cascade.query_timeout_secs = secs;
    }
    let kernel = boot_kernel(cfg);
    let rt = runtime();

    let outcome = rt.block_on(async {
        let handle = CancelHandle::new();
        let rx = handle.subscribe();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                handle.cancel();
            }
        });
        let outcome = kernel.ask_with_cancel(query, rx).await;
        watcher.abort();
        outcome
    });

    match outcome {
        Ok(result) => {
            if json {
                print_json(&serde_json::to_value(&result).unwrap_or_default());
            } else {
                ui::blank();
                ui::answer(&result.answer_text, result.source_tier, result.confidence);
                ui::blank();
            }
        }
        Err(failure) => {
            if json {
                print_json(&serde_json::json!({
                    "error": failure.to_string(),
                    "reason": failure.reason,
                }));
            } else {
                report_no_answer(&failure);
            }
            std::process::exit(if failure.is_aborted() { 2 } else { 1 });
        }
    }
}

pub fn cmd_chat(config: Option<PathBuf>) {
    let kernel = boot_kernel(load(config));
    let rt = runtime();

    ui::section("GovSight chat");
    ui::hint("One question per line. Type `exit` or press Ctrl-D to leave.");
    ui::blank();

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("  > ");
        let _ = std::io::stdout().flush();
        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                ui::error(&format!("Failed to read input: {e}"));
                break;
            }
            None => break,
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if matches!(query, "exit" | "quit") {
            break;
        }
        match rt.block_on(kernel.ask(query)) {
            Ok(result) => show(&result),
            Err(failure) => report_no_answer(&failure),
        }
        ui::blank();
    }

    ui::blank();
    print_session_stats(&kernel);
}

fn show(result: &RetrievalResult) {
    ui::answer(&result.answer_text, result.source_tier, result.confidence);
}

fn report_no_answer(failure: &NoAnswerFound) {
    if failure.is_aborted() {
        ui::error(&failure.to_string());
    } else {
        ui::error_with_fix(
            &failure.to_string(),
            "Teach it with `govsight teach \"The <attribute> of <place> is <value>.\"`",
        );
    }
}

fn print_session_stats(kernel: &GovsightKernel) {
    let q = kernel.cascade().stats();
    ui::section("Session");
    ui::kv("Questions", &q.total().to_string());
    ui::kv(
        "Answered",
        &format!(
            "{} (local {}, vector {}, web {})",
            q.answered(),
            q.local,
            q.vector,
            q.web
        ),
    );
    if q.exhausted + q.timeout + q.cancelled > 0 {
        ui::kv_warn(
            "Unanswered",
            &format!(
                "{} (exhausted {}, timeout {}, cancelled {})",
                q.exhausted + q.timeout + q.cancelled,
                q.exhausted,
                q.timeout,
                q.cancelled
            ),
        );
    }
}

fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    );
}
