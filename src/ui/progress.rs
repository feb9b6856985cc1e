use crate::algorithms::EraseJob;
use crate::observer::EraseObserver;
use colored::Colorize;
use indicatif::{HumanBytes, HumanDuration, ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

const PASS_TEMPLATE: &str =
    "{spinner:.cyan} Securely erasing {msg} (VSITR) [{bar:32.green/240}] pass {pos}/{len}";

struct ActiveErase {
    bar: ProgressBar,
    name: String,
    size: u64,
    start: Instant,
}

/// Renders erase progress on the terminal.
///
/// One bar per erase, advanced once per synced pass; a colored summary line is
/// printed when the erase finishes.
#[derive(Default)]
pub struct ConsoleObserver {
    active: Mutex<Option<ActiveErase>>,
}

impl ConsoleObserver {
    pub fn new() -> Self {
        Self::default()
    }

    fn pass_bar(total_passes: u64) -> ProgressBar {
        if !cfg!(feature = "progress-bars") {
            return ProgressBar::hidden();
        }
        let style = ProgressStyle::with_template(PASS_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        let bar = ProgressBar::new(total_passes).with_style(style);
        bar.enable_steady_tick(Duration::from_millis(120));
        bar
    }
}

impl EraseObserver for ConsoleObserver {
    fn on_erase_started(&self, job: &EraseJob) {
        let name = display_name(&job.path);
        let bar = Self::pass_bar(job.total_passes as u64);
        bar.set_message(name.clone());

        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        *active = Some(ActiveErase {
            bar,
            name,
            size: job.size,
            start: Instant::now(),
        });
    }

    fn on_pass_complete(&self, pass: usize, _total_passes: usize) {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(erase) = active.as_ref() {
            erase.bar.set_position(pass as u64);
        }
    }

    fn on_erase_finished(&self, success: bool, reason: Option<String>) {
        let finished = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match (finished, success) {
            (Some(erase), true) => {
                erase.bar.finish_and_clear();
                println!(
                    "\n{} File securely erased: {} ({})\n",
                    "✔".green().bold(),
                    erase.name.bold(),
                    completion_detail(erase.size, erase.start.elapsed())
                );
            }
            (Some(erase), false) => {
                erase.bar.abandon();
                print_failure(reason.as_deref());
            }
            (None, true) => println!("\n{} File securely erased\n", "✔".green().bold()),
            (None, false) => print_failure(reason.as_deref()),
        }
    }
}

fn print_failure(reason: Option<&str>) {
    eprintln!(
        "\n{} Error during secure erasure: {}\n",
        "✘".red().bold(),
        reason.unwrap_or("unknown error")
    );
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Size and elapsed time shown on the success line, e.g. "9.77 KiB, 3 seconds"
pub(crate) fn completion_detail(size: u64, elapsed: Duration) -> String {
    format!("{}, {}", HumanBytes(size), HumanDuration(elapsed))
}
