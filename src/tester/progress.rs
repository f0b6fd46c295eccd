// Module: Progress
// Progress bar shown while the suite runs. The only contract exposed to
// the testers is `step()`, called once per completed unit or scenario;
// extra ticks past the configured total are ignored.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

pub struct TesterProgress {
    bar: ProgressBar,
}

impl TesterProgress {
    pub fn new(total: u64) -> Self {
        let bar = ProgressBar::with_draw_target(Some(total.max(1)), ProgressDrawTarget::stdout());
        bar.set_style(
            ProgressStyle::with_template("[{bar:50}]{percent:>3}% {pos:>8}/{len}")
                .expect("valid progress template")
                .progress_chars(".. "),
        );
        Self { bar }
    }

    pub fn step(&self) {
        let total = self.bar.length().unwrap_or(0);
        if self.bar.position() >= total {
            return;
        }
        self.bar.inc(1);
        if self.bar.position() >= total {
            self.bar.finish();
        }
    }
}
