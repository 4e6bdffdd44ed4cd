use indicatif::{ProgressBar, ProgressStyle};

/// Trait for row-level progress reporting
pub trait Progress {
    /// Report that `done` of `total` tile rows are complete
    fn update(&mut self, done: usize, total: usize);
}

/// Reporter that discards all updates, for library use and tests
pub struct NullProgress;

impl Progress for NullProgress {
    fn update(&mut self, _done: usize, _total: usize) {}
}

/// indicatif-backed console progress bar
///
/// The bar is created lazily on the first update so its length matches the
/// image actually being processed.
pub struct ConsoleProgress {
    bar: Option<ProgressBar>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self { bar: None }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress for ConsoleProgress {
    fn update(&mut self, done: usize, total: usize) {
        let bar = self.bar.get_or_insert_with(|| {
            let bar = ProgressBar::new(total as u64);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{bar:40.green/dim} {pos}/{len} rows")
                    .unwrap(),
            );
            bar
        });

        bar.set_position(done as u64);
        if done >= total {
            bar.finish();
        }
    }
}
