use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::time::Duration;
use tracing::warn;

/// A spinner plus the sink for user-facing progress lines.
///
/// The spinner only starts ticking on the first [`Progress::spin`], and it is
/// cleared when the value is dropped.
pub struct Progress<W: Write> {
    bar: ProgressBar,
    out: W,
    ticking: bool,
}

impl Progress<io::Stdout> {
    pub fn stdout() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(ProgressStyle::default_spinner());
        Self::with_bar(bar, io::stdout())
    }
}

impl<W: Write> Progress<W> {
    /// Lines go to `out`; nothing is drawn.
    #[cfg(test)]
    pub fn hidden(out: W) -> Self {
        Self::with_bar(ProgressBar::hidden(), out)
    }

    fn with_bar(bar: ProgressBar, out: W) -> Self {
        Self {
            bar,
            out,
            ticking: false,
        }
    }

    pub fn spin(&mut self, message: impl Into<String>) {
        self.bar.set_message(message.into());
        if !self.ticking {
            self.bar.enable_steady_tick(Duration::from_millis(100));
            self.ticking = true;
        }
    }

    #[cfg(test)]
    pub fn is_spinning(&self) -> bool {
        self.ticking
    }

    /// Print a line above the spinner.
    pub fn line(&mut self, text: impl AsRef<str>) {
        let Self { bar, out, .. } = self;
        if let Err(e) = bar.suspend(|| writeln!(out, "{}", text.as_ref())) {
            warn!("Failed to write progress output: {}", e);
        }
    }

    #[cfg(test)]
    pub fn into_inner(mut self) -> W
    where
        W: Default,
    {
        self.bar.finish_and_clear();
        std::mem::take(&mut self.out)
    }
}

impl<W: Write> Drop for Progress<W> {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}
