//! Subcommand implementations, one module per medium.

use colored::{Color, Colorize};

pub mod image;
pub mod text;
pub mod video;

/// Options shared by every subcommand.
pub struct Settings {
    pub database: String,
    pub audio_url: String,
    pub image_url: Option<String>,
    pub json: bool,
    pub quiet: bool,
}

impl Settings {
    /// Whether the human-readable report should be printed.
    pub fn human(&self) -> bool {
        !self.json && !self.quiet
    }
}

/// What `main` needs to know to pick an exit code for a successful run.
#[derive(Debug, Clone, Copy, Default)]
pub struct Outcome {
    pub duplicate: bool,
}

impl Outcome {
    pub fn registered() -> Self {
        Self::default()
    }

    pub fn checked(duplicate: bool) -> Self {
        Self { duplicate }
    }
}

const BANNER_WIDTH: usize = 40;

/// Print a boxed status banner.
pub fn banner(title: &str, color: Color) {
    let horizontal = "═".repeat(BANNER_WIDTH);
    println!();
    println!("{}", format!("╔{horizontal}╗").color(color));
    println!(
        "{}",
        format!("║{title:^width$}║", width = BANNER_WIDTH)
            .color(color)
            .bold()
    );
    println!("{}", format!("╚{horizontal}╝").color(color));
    println!();
}

/// Print one indented `label value` line.
pub fn field(label: &str, value: impl std::fmt::Display) {
    println!("   {} {}", format!("{label}:").dimmed(), value);
}

/// Colour for a check verdict.
pub fn verdict_color(duplicate: bool) -> Color {
    if duplicate {
        Color::Red
    } else {
        Color::Green
    }
}
