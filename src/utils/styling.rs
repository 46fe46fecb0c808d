//! Terminal styling utilities for pipeline progress output

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Print the application banner
pub fn print_banner(version: &str) {
    println!();
    println!(
        "    {} {}",
        style("riskcard").cyan().bold(),
        style("Credit scorecard pipeline").dim()
    );
    println!("    {}", style(format!("v{}", version)).dim());
    println!("    {}", style("─".repeat(50)).dim());
    println!();
}

/// Print a stage header with styling
pub fn print_stage_header(step_num: u8, title: &str) {
    println!();
    println!(
        "    {} {} {}",
        style(format!("STAGE {}", step_num)).cyan().bold(),
        style("│").dim(),
        style(title).white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("    {} {}", style("✓").green().bold(), style(message).green());
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("    {} {}", style("·").dim(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("    {} {}", style("!").yellow().bold(), style(message).yellow());
}

/// Print elapsed time for a step
pub fn print_step_time(elapsed: Duration) {
    println!(
        "      {}",
        style(format!("Completed in {:.2}s", elapsed.as_secs_f64())).dim()
    );
}

/// Print the final completion message
pub fn print_completion() {
    println!();
    println!(
        "    {} {}",
        style("»").cyan(),
        style("Pipeline run complete").green().bold()
    );
    println!();
}

/// Create a spinner with a message
pub fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("    {spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Finish a spinner with a success message
pub fn finish_with_success(spinner: &ProgressBar, message: &str) {
    spinner.finish_and_clear();
    print_success(message);
}
