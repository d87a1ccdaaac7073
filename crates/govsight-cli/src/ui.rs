//! Terminal output helpers shared by the subcommands.

use colored::Colorize;
use govsight_types::retrieval::SourceTier;

/// Passed check (green checkmark).
pub fn check_ok(msg: &str) {
    println!("  {} {}", "\u{2714}".bright_green(), msg);
}

/// Warning check (yellow dash).
pub fn check_warn(msg: &str) {
    println!("  {} {}", "-".bright_yellow(), msg.yellow());
}

pub fn success(msg: &str) {
    println!("  {} {}", "\u{2714}".bright_green(), msg);
}

pub fn error(msg: &str) {
    eprintln!("  {} {}", "\u{2718}".bright_red(), msg.bright_red());
}

/// Red error + yellow "fix:" suggestion.
pub fn error_with_fix(msg: &str, fix: &str) {
    eprintln!("  {} {}", "\u{2718}".bright_red(), msg.bright_red());
    eprintln!("    {} {}", "fix:".bright_yellow(), fix);
}

/// Section header: ">> Title" in cyan.
pub fn section(title: &str) {
    println!("  {} {}", ">>".bright_cyan().bold(), title.bold());
}

/// Key-value display: "  Label:       value".
pub fn kv(label: &str, value: &str) {
    println!("  {:<13}{}", format!("{label}:"), value);
}

pub fn kv_ok(label: &str, value: &str) {
    println!("  {:<13}{}", format!("{label}:"), value.bright_green());
}

pub fn kv_warn(label: &str, value: &str) {
    println!("  {:<13}{}", format!("{label}:"), value.bright_yellow());
}

/// Hint line in dimmed text.
pub fn hint(msg: &str) {
    println!("  {} {}", "hint:".dimmed(), msg.dimmed());
}

/// An answer with its provenance tag and confidence.
pub fn answer(text: &str, tier: SourceTier, confidence: f32) {
    let tag = match tier {
        SourceTier::Local => "local".bright_green(),
        SourceTier::Vector => "vector".bright_cyan(),
        SourceTier::Web => "web".bright_yellow(),
    };
    println!("  {text}");
    println!(
        "    {} {}  {} {:.2}",
        "source:".dimmed(),
        tag,
        "confidence:".dimmed(),
        confidence
    );
}

pub fn blank() {
    println!();
}
