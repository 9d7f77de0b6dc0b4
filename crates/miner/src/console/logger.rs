use console::style;
use std::time::Duration;

pub struct Console;

impl Console {
    const fn get_width() -> usize {
        40 // Base width for horizontal lines
    }

    fn horizontal_border() -> String {
        "═".repeat(Self::get_width())
    }

    pub fn section(title: &str) {
        println!();
        let width = Self::get_width();
        let formatted_title = format!("{title:^width$}");
        let border = Self::horizontal_border();

        println!("{}", style(format!("╔{border}╗")).cyan().bold());
        println!("{}", style(formatted_title).cyan().bold());
        println!("{}", style(format!("╚{border}╝")).cyan().bold());
    }

    pub fn title(text: &str) {
        println!();
        println!("{}", style(text).cyan().bold());
        println!("{}", style("─".repeat(text.chars().count().max(1))).cyan());
    }

    pub fn info(label: &str, value: &str) {
        println!("{}: {}", style(label).dim().cyan(), style(value).white());
    }

    pub fn success(text: &str) {
        println!("{} {}", style("✓").green().bold(), style(text).green());
    }

    pub fn warning(text: &str) {
        println!("{} {}", style("⚠").yellow().bold(), style(text).yellow());
    }

    pub fn user_error(text: &str) {
        eprintln!("{} {}", style("✗").red().bold(), style(text).red());
    }

    pub fn progress(text: &str) {
        println!("{} {}", style("→").cyan().bold(), style(text).cyan());
    }

    /// Prints a requirement row as `name: ✓ (Required: x, Available: y)`.
    pub fn check(label: &str, passed: bool, detail: &str) {
        let mark = if passed {
            style("✓").green().bold()
        } else {
            style("✗").red().bold()
        };
        println!("{}: {} {}", style(label).dim().cyan(), mark, detail);
    }

    pub fn spinner(text: &str) -> indicatif::ProgressBar {
        let pb = indicatif::ProgressBar::new_spinner();
        let spinner_style = indicatif::ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| indicatif::ProgressStyle::default_spinner());
        pb.set_style(spinner_style);
        pb.set_message(text.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }
}
