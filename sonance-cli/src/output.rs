#![forbid(unsafe_code)]

use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub struct Output {
    term: Term,
}

impl Output {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }

    pub fn success(&self, msg: &str) {
        let _ = self
            .term
            .write_line(&format!("{} {}", style("✓").green().bold(), msg));
    }

    pub fn error(&self, msg: &str) {
        let _ = self
            .term
            .write_line(&format!("{} {}", style("✗").red().bold(), msg));
    }

    pub fn warn(&self, msg: &str) {
        let _ = self
            .term
            .write_line(&format!("{} {}", style("!").yellow().bold(), msg));
    }

    pub fn info(&self, msg: &str) {
        let _ = self.term.write_line(msg);
    }

    pub fn header(&self, msg: &str) {
        let _ = self.term.write_line(&format!("\n{}", style(msg).bold()));
    }

    pub fn field(&self, label: &str, value: &str) {
        let _ = self
            .term
            .write_line(&format!("  {}: {}", style(label).dim(), value));
    }

    pub fn key_field(&self, label: &str, value: &str) {
        let _ = self.term.write_line(&format!(
            "  {}: {}",
            style(label).dim(),
            style(value).yellow()
        ));
    }

    pub fn newline(&self) {
        let _ = self.term.write_line("");
    }

    pub fn spinner(&self, msg: &str) -> Spinner {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")
        {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(80));
        Spinner { pb }
    }

    /// Numbered word grid for writing a recovery phrase down.
    pub fn mnemonic(&self, phrase: &str) {
        for (row, chunk) in phrase
            .split_whitespace()
            .collect::<Vec<_>>()
            .chunks(4)
            .enumerate()
        {
            let line: String = chunk
                .iter()
                .enumerate()
                .map(|(i, word)| format!("{:>2}. {:<10}", row * 4 + i + 1, style(*word).yellow()))
                .collect::<Vec<_>>()
                .join(" ");
            let _ = self.term.write_line(&format!("  {line}"));
        }
    }

    pub fn secret_warning(&self) {
        let _ = self.term.write_line(&format!(
            "\n{}",
            style("WARNING: Anyone with your recovery phrase controls your wallet!")
                .red()
                .bold()
        ));
    }

    pub fn create_notes(&self) {
        self.info("Next steps:");
        let _ = self.term.write_line(&format!(
            "  {} Write the recovery phrase down and keep it offline",
            style("1.").cyan()
        ));
        let _ = self.term.write_line(&format!(
            "  {} Check the session settings",
            style("sonance wallet config show").cyan()
        ));
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}
