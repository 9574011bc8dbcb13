use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

const BAR_TEMPLATE: &str = "{msg:20!} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {bytes_per_sec} ETA {eta}";

/// Hands out one progress bar per download
pub struct ProgressManager {
    bars: MultiProgress,
    style: ProgressStyle,
}

impl ProgressManager {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    /// Manager whose bars never draw, for tests and `--no-progress`.
    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        Self { bars: MultiProgress::with_draw_target(target), style }
    }

    /// Bar for `total` committed bytes of `label`.
    pub fn start(&self, label: &str, total: u64) -> ProgressBar {
        let pb = self.bars.add(ProgressBar::new(total));
        pb.set_style(self.style.clone());
        pb.set_message(label.to_string());
        pb
    }
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}
