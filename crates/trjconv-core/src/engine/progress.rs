/// Events emitted while a conversion runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    /// A coarse stage (reading, converting) begins.
    PhaseStart { name: &'static str },
    PhaseFinish,

    /// Per-frame processing begins over `total` frames.
    FramesStart { total: u64 },
    /// One frame was handled; `written` is `false` when the stride dropped it.
    FrameDone { index: usize, written: bool },
    FramesFinish { written: usize },

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

/// Forwards [`Progress`] events to an optional callback.
#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }

    pub fn message(&self, text: impl Into<String>) {
        if self.callback.is_some() {
            self.report(Progress::Message(text.into()));
        }
    }
}
