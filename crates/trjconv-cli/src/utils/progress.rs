use indicatif::{ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;
use trjconv::engine::progress::{Progress, ProgressCallback};

const SPINNER_TICK_MS: u64 = 80;
const FRAMES_LABEL: &str = "Frames";

struct BarState {
    bar: ProgressBar,
    skipped: u64,
}

impl BarState {
    fn frames_message(&self) -> String {
        if self.skipped == 0 {
            FRAMES_LABEL.to_string()
        } else {
            format!("{} ({} skipped)", FRAMES_LABEL, self.skipped)
        }
    }

    fn handle(&mut self, progress: Progress) {
        let bar = &self.bar;
        match progress {
            Progress::PhaseStart { name } => {
                bar.reset();
                bar.set_length(0);
                bar.set_style(spinner_style());
                bar.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                bar.set_message(name);
            }
            Progress::PhaseFinish => {
                bar.disable_steady_tick();
                bar.finish_with_message("✓ Done");
            }
            Progress::FramesStart { total } => {
                self.skipped = 0;
                bar.disable_steady_tick();
                bar.reset();
                bar.set_length(total);
                bar.set_style(bar_style());
                bar.set_message(FRAMES_LABEL);
            }
            Progress::FrameDone { written, .. } => {
                if !written {
                    self.skipped += 1;
                    self.bar.set_message(self.frames_message());
                }
                self.bar.inc(1);
            }
            Progress::FramesFinish { .. } => {
                let total = bar.length().unwrap_or(0);
                bar.set_position(total.max(bar.position()));
                bar.finish();
            }
            Progress::Message(msg) if !bar.is_finished() => bar.println(format!("  {}", msg)),
            Progress::Message(msg) => bar.set_message(msg),
        }
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg}")
        .expect("Failed to create spinner style template")
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{msg:<20} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        .expect("Failed to create bar style template")
        .with_key("eta", |state: &ProgressState, w: &mut dyn std::fmt::Write| {
            let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
        })
        .progress_chars("##-")
}

/// Renders conversion progress on stderr with `indicatif`.
#[derive(Clone)]
pub struct CliProgressHandler {
    state: Arc<Mutex<BarState>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr())
    }

    /// A handler that renders nothing, for `-q` runs.
    pub fn hidden() -> Self {
        Self::with_draw_target(ProgressDrawTarget::hidden())
    }

    fn with_draw_target(target: ProgressDrawTarget) -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), target)
            .with_style(spinner_style())
            .with_message("Starting...");
        bar.finish_and_clear();

        Self {
            state: Arc::new(Mutex::new(BarState { bar, skipped: 0 })),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let state = Arc::clone(&self.state);
        Box::new(move |progress: Progress| match state.lock() {
            Ok(mut guard) => guard.handle(progress),
            Err(_) => warn!("Progress bar mutex was poisoned. Cannot update progress."),
        })
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn done(index: usize, written: bool) -> Progress {
        Progress::FrameDone { index, written }
    }

    #[test]
    fn handler_starts_finished_and_empty() {
        let handler = CliProgressHandler::hidden();
        let state = handler.state.lock().unwrap();
        assert_eq!(state.bar.length(), Some(0));
        assert!(state.bar.is_finished());
    }

    #[test]
    fn frame_events_drive_the_bar() {
        let handler = CliProgressHandler::hidden();
        let callback = handler.get_callback();

        callback(Progress::PhaseStart { name: "Reading" });
        {
            let state = handler.state.lock().unwrap();
            assert_eq!(state.bar.message(), "Reading");
            assert!(!state.bar.is_finished());
        }

        callback(Progress::FramesStart { total: 4 });
        callback(done(0, true));
        callback(done(1, false));
        {
            let state = handler.state.lock().unwrap();
            assert_eq!(state.bar.length(), Some(4));
            assert_eq!(state.bar.position(), 2);
            assert_eq!(state.bar.message(), "Frames (1 skipped)");
        }

        callback(Progress::FramesFinish { written: 1 });
        {
            let state = handler.state.lock().unwrap();
            assert!(state.bar.is_finished());
            assert_eq!(state.bar.position(), 4);
        }

        callback(Progress::PhaseFinish);
        assert_eq!(handler.state.lock().unwrap().bar.message(), "✓ Done");
    }

    #[test]
    fn skip_count_resets_per_run() {
        let handler = CliProgressHandler::hidden();
        let callback = handler.get_callback();

        callback(Progress::FramesStart { total: 1 });
        callback(done(0, false));
        callback(Progress::FramesStart { total: 1 });
        assert_eq!(handler.state.lock().unwrap().bar.message(), "Frames");
    }

    #[test]
    fn callback_is_thread_safe() {
        let handler = CliProgressHandler::hidden();
        let callback = handler.get_callback();

        thread::spawn(move || {
            callback(Progress::PhaseStart { name: "Converting" });
            callback(done(0, true));
            callback(Progress::PhaseFinish);
        })
        .join()
        .unwrap();

        let state = handler.state.lock().unwrap();
        assert!(state.bar.is_finished());
        assert_eq!(state.bar.message(), "✓ Done");
    }
}
