//! Human-friendly terminal output.

use std::io::{self, IsTerminal};

use console::style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::{debug, instrument};

use super::{Emitter, Message};

const PROGRESS_TEMPLATE: &str = "{spinner} [{bar:40}] {pos}/{len} keys ({eta})";

/// Styled terminal output for human users.
///
/// Progress goes to stdout, problems to stderr. A progress bar is drawn
/// during backups when stderr is a terminal.
pub struct HumanOutput {
    quiet: bool,
    color: bool,
    progress: Option<ProgressBar>,
}

impl HumanOutput {
    #[instrument]
    pub fn new(quiet: bool, color: bool) -> Self {
        debug!("Creating HumanOutput");
        let color = color && io::stdout().is_terminal();
        console::set_colors_enabled(color);
        console::set_colors_enabled_stderr(color);
        Self {
            quiet,
            color,
            progress: None,
        }
    }

    fn progress_bar(&mut self, total: usize) -> &ProgressBar {
        self.progress.get_or_insert_with(|| {
            let target = if io::stderr().is_terminal() {
                ProgressDrawTarget::stderr()
            } else {
                ProgressDrawTarget::hidden()
            };
            let bar = ProgressBar::with_draw_target(Some(total as u64), target);
            bar.set_style(
                ProgressStyle::with_template(PROGRESS_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=> "),
            );
            bar
        })
    }

    fn print(&self, message: &Message) {
        let text = message.to_string();
        let line = if message.is_warning() {
            if self.color {
                style(text).yellow().to_string()
            } else {
                text
            }
        } else {
            text
        };
        let write = || {
            if message.is_warning() {
                eprintln!("{line}");
            } else {
                println!("{line}");
            }
        };
        match &self.progress {
            Some(bar) => bar.suspend(write),
            None => write(),
        }
    }
}

impl Emitter for HumanOutput {
    fn emit(&mut self, message: &Message) {
        if self.quiet && !message.is_warning() {
            return;
        }
        self.print(message);
    }

    fn progress(&mut self, done: usize, total: usize) {
        if self.quiet {
            return;
        }
        let bar = self.progress_bar(total);
        bar.set_position(done as u64);
        if done >= total {
            bar.finish_and_clear();
            self.progress = None;
        }
    }
}
