use crate::extract::ExtractResult;

/// Receives progress updates during extraction.
///
/// [`entry_start`](ExtractProgress::entry_start) doubles as the cancellation
/// point: returning `false` stops the run before that entry is touched. Any
/// `Fn(usize, usize, &str) -> bool` closure can be used directly.
pub trait ExtractProgress {
    /// Called before entry number `current` (1-based) out of `total`.
    fn entry_start(&self, _current: usize, _total: usize, _name: &str) -> bool {
        true
    }

    /// Called when an entry failed.
    fn entry_failed(&self, _name: &str, _reason: &str) {}

    /// Called when an entry is skipped because of its type.
    fn entry_skipped(&self, _name: &str) {}

    /// Called once the run is over, whether it finished, stopped or was
    /// canceled.
    fn completed(&self, _result: &ExtractResult) {}
}

impl<F> ExtractProgress for F
where
    F: Fn(usize, usize, &str) -> bool,
{
    fn entry_start(&self, current: usize, total: usize, name: &str) -> bool {
        self(current, total, name)
    }
}

/// A no-op progress implementation that discards all updates.
pub struct SilentProgress;

impl ExtractProgress for SilentProgress {}

/// Console progress reporter using an indicatif progress bar.
#[cfg(feature = "cli")]
pub struct ConsoleProgress {
    bar: indicatif::ProgressBar,
}

#[cfg(feature = "cli")]
impl ConsoleProgress {
    pub fn new() -> Self {
        let bar = indicatif::ProgressBar::hidden();

        bar.set_style(
            indicatif::ProgressStyle::default_bar()
                .template("{bar:40.cyan/blue} {pos}/{len} entries [{elapsed_precise}] {wide_msg}")
                .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar())
                .progress_chars("━╸─"),
        );

        Self { bar }
    }
}

#[cfg(feature = "cli")]
impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "cli")]
impl ExtractProgress for ConsoleProgress {
    fn entry_start(&self, current: usize, total: usize, name: &str) -> bool {
        if current == 1 {
            self.bar
                .set_draw_target(indicatif::ProgressDrawTarget::stderr());
            self.bar.set_length(total as u64);
            self.bar.reset();
        }

        self.bar.set_position(current as u64 - 1);
        self.bar.set_message(name.to_owned());

        true
    }

    fn completed(&self, result: &ExtractResult) {
        self.bar.set_position(result.processed() as u64);
        self.bar.finish_and_clear();
    }
}
