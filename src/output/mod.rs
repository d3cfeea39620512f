//! Styled terminal output for tfimport

use owo_colors::OwoColorize;

/// Print a success message with a green checkmark
pub fn success(message: &str) {
    // Pastel mint green: RGB(152, 225, 152)
    println!(
        "{} {}",
        "✓".truecolor(152, 225, 152).bold(),
        message.bright_white()
    );
}

/// Print an error message with a red X
pub fn error(message: &str) {
    // Pastel coral/salmon: RGB(255, 160, 160)
    eprintln!(
        "{} {}",
        "✗".truecolor(255, 160, 160).bold(),
        message.bright_white()
    );
}

/// Print a warning message with a yellow warning symbol
pub fn warning(message: &str) {
    println!(
        "{} {}",
        "⚠".truecolor(255, 230, 160).bold(),
        message.bright_white()
    );
}

/// Print an info message with a blue info symbol
pub fn info(message: &str) {
    println!(
        "{} {}",
        "ℹ".truecolor(160, 200, 255).bold(),
        message.bright_white()
    );
}

/// Print a section header with a separator line
pub fn section(title: &str) {
    // Pastel lavender: RGB(181, 174, 254)
    println!("\n{}", title.truecolor(181, 174, 254).bold());
    println!("{}", "─".repeat(50).truecolor(160, 160, 160));
}

/// Print a resource header, one per imported resource
pub fn subsection(title: &str) {
    println!("\n{}", title.truecolor(120, 180, 195));
    println!("{}", "·".repeat(30).truecolor(160, 160, 160));
}

pub fn key_value(key: &str, value: &str) {
    println!(
        "  {} {}",
        format!("{}:", key).truecolor(160, 160, 160),
        value.bright_white()
    );
}

pub fn dimmed(message: &str) {
    println!("{}", message.truecolor(160, 160, 160));
}

pub fn blank() {
    println!();
}
