use colored::*;
use console::Term;
use std::fmt::Display;

/// Console output helpers with the gitdown color scheme.
/// Green (46, 160, 67) for the brand, teal (56, 189, 193) for highlights.
/// Only the binary and the terminal sink print through this; the pipeline
/// itself reports through events.
pub struct Logger;

impl Logger {
    /// Prints the banner, centered on the terminal.
    pub fn banner() {
        let term = Term::stdout();
        let width = term.size().1 as usize;

        let banner = r#"
   _______ __  ____
  / ____(_) /_/ __ \____ _      ______
 / / __/ / __/ / / / __ \ | /| / / __ \
/ /_/ / / /_/ /_/ / /_/ / |/ |/ / / / /
\____/_/\__/_____/\____/|__/|__/_/ /_/
"#;

        for line in banner.lines() {
            if line.trim().is_empty() {
                continue;
            }
            println!(
                "{:^width$}",
                line.truecolor(46, 160, 67).bold().to_string(),
                width = width
            );
        }
        println!();
    }

    pub fn info<T: Display>(msg: T) {
        println!("{} {}", "•".truecolor(56, 189, 193).bold(), msg);
    }

    pub fn success<T: Display>(msg: T) {
        println!("{} {}", "✔".green().bold(), msg);
    }

    /// Errors go to stderr so they survive `gitdown ... > log`.
    pub fn error<T: Display>(msg: T) {
        eprintln!("{} {}", "✖".red().bold(), msg);
    }

    pub fn warn<T: Display>(msg: T) {
        println!("{} {}", "⚠".yellow().bold(), msg);
    }

    /// Section header. The leading newline keeps it off the previous output.
    pub fn header<T: Display>(msg: T) {
        println!(
            "\n{}",
            msg.to_string().truecolor(46, 160, 67).bold().underline()
        );
    }

    /// A tag followed by dimmed detail, e.g. `[SERVER] github/acme/widget`.
    pub fn command<T: Display>(cmd: &str, msg: T) {
        println!(
            "{} {}",
            cmd.truecolor(46, 160, 67).bold(),
            msg.to_string().dimmed()
        );
    }

    pub fn highlight<T: Display>(msg: T) -> String {
        msg.to_string().truecolor(56, 189, 193).bold().to_string()
    }

    pub fn brand_text<T: Display>(msg: T) -> String {
        msg.to_string().truecolor(46, 160, 67).bold().to_string()
    }

    pub fn dim<T: Display>(msg: T) -> String {
        msg.to_string().dimmed().to_string()
    }
}
