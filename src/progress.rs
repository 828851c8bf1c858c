//! Terminal progress reporting for probing runs
//!
//! The bar is cosmetic: it observes enrichment completion and never alters
//! results. It redraws on a 250ms tick (four redraws per second) and is
//! written to stderr so the table on stdout stays clean. indicatif re-reads
//! the terminal width on each redraw, so the bar reflows on resize.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const REDRAW_INTERVAL: Duration = Duration::from_millis(250);

/// Build the progress bar for a probing run over `total` records
pub fn probe_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::with_template(
        "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {percent:>3}%",
    ) {
        pb.set_style(style.progress_chars("##-"));
    }
    pb.enable_steady_tick(REDRAW_INTERVAL);
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar_counts_to_completion() {
        let pb = probe_progress_bar(4);
        assert_eq!(pb.length(), Some(4));
        for _ in 0..4 {
            pb.inc(1);
        }
        assert_eq!(pb.position(), 4);
        pb.finish_and_clear();
        assert!(pb.is_finished());
    }
}
