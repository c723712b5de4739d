//! Styled status lines.

use crossterm::style::Stylize;
use crossterm::tty::IsTty;

/// Status lines for the user. Colors are dropped when stdout is not a terminal.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    color: bool,
}

impl Output {
    /// Create a new output handle.
    pub fn new() -> Self {
        Self {
            color: std::io::stdout().is_tty(),
        }
    }

    /// Reports a finished step.
    pub fn success(&self, message: &str) {
        if self.color {
            println!("{} {}", "✓".green().bold(), message);
        } else {
            println!("✓ {message}");
        }
    }

    pub fn info(&self, message: &str) {
        if self.color {
            println!("{} {}", "•".cyan(), message);
        } else {
            println!("• {message}");
        }
    }

    /// Prints a warning to stderr.
    pub fn warning(&self, message: &str) {
        if self.color {
            eprintln!("{} {}", "!".yellow().bold(), message.yellow());
        } else {
            eprintln!("! {message}");
        }
    }

    /// Prints an error to stderr.
    pub fn error(&self, message: &str) {
        if self.color {
            eprintln!("{} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("✗ {message}");
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
