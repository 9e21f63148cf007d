use crate::tools::registry::RegistrationFailure;
use crate::tools::{CallOutcome, ToolDescriptor};
use colored::*;

pub fn print_header(text: &str) {
    println!("\n{}", text.bright_cyan().bold());
    println!("{}", "=".repeat(text.len()).bright_cyan());
}

pub fn print_error(text: &str) {
    eprintln!("{}", text.red().bold());
}

/// One tool with its parameters, required ones marked
pub fn print_descriptor(descriptor: &ToolDescriptor) {
    println!("{} {}", descriptor.name.green().bold(), descriptor.description);

    for parameter in &descriptor.parameters {
        let marker = if parameter.mandatory {
            "required".yellow()
        } else {
            "optional".dimmed()
        };
        println!(
            "    {} [{}] {}",
            parameter.name.bright_white(),
            marker,
            parameter.description
        );
    }
}

pub fn print_outcome(outcome: &CallOutcome) {
    if outcome.is_error {
        print_error(&outcome.text_content());
    } else if outcome.content.is_empty() {
        println!("{}", "(no output)".dimmed());
    } else {
        println!("{}", outcome.text_content());
    }
}

/// Registration problems go to stderr so `list --json` output stays clean
pub fn print_failures(failures: &[RegistrationFailure]) {
    if failures.is_empty() {
        return;
    }

    eprintln!(
        "{}",
        format!("{} registration failure(s):", failures.len())
            .yellow()
            .bold()
    );
    for failure in failures {
        eprintln!("  {} {}", failure.source.red(), failure.error);
    }
}
