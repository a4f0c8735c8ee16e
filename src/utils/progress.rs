use indicatif::{ProgressBar, ProgressStyle};

use crate::engine::ProgressSink;

pub struct ProgressTracker {
    bar: ProgressBar,
}

impl ProgressTracker {
    pub fn new(description: &str) -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
            .unwrap()
            .progress_chars("#>-"));
        bar.set_message(description.to_string());

        ProgressTracker {
            bar,
        }
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("Completed");
    }

    pub fn set_message(&self, msg: &str) {
        self.bar.set_message(msg.to_string());
    }
}

impl ProgressSink for ProgressTracker {
    fn report(&self, fraction: f64, message: &str) {
        let position = (fraction.clamp(0.0, 1.0) * 100.0) as u64;
        // A fresh engine operation restarts the scale, so the bar resets
        // rather than sticking at the previous operation's end
        self.bar.set_position(position);
        if !message.is_empty() {
            self.bar.set_message(message.to_string());
        }
    }
}
