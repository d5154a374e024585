//! Progress reporting.
//!
//! Long phases (pathing, emission) report through a [`ProgressSink`] so the
//! host can drive a progress bar. The sink may also flag cancellation; the
//! core treats that as advisory and finishes the layer in flight before
//! honoring it.

/// Host-facing progress reporting.
pub trait ProgressSink {
    /// Announce a new phase with a known tick count.
    fn init_progress(&mut self, name: &str, total: usize);

    /// Advance the current phase by one tick.
    fn tick(&mut self);

    /// Whether the host asked to stop. Checked at layer granularity.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Discards all progress.
#[derive(Debug, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn init_progress(&mut self, _name: &str, _total: usize) {}

    fn tick(&mut self) {}
}

/// Reports phase milestones through the `log` facade.
///
/// Emits at phase start and at every decile, which keeps logs readable for
/// prints with thousands of layers.
#[derive(Debug, Default)]
pub struct LogProgress {
    name: String,
    total: usize,
    current: usize,
    last_decile: usize,
}

impl ProgressSink for LogProgress {
    fn init_progress(&mut self, name: &str, total: usize) {
        self.name = name.to_string();
        self.total = total;
        self.current = 0;
        self.last_decile = 0;
        log::info!("{}: 0/{}", self.name, self.total);
    }

    fn tick(&mut self) {
        self.current += 1;
        if self.total == 0 {
            return;
        }
        let decile = self.current * 10 / self.total;
        if decile > self.last_decile {
            self.last_decile = decile;
            log::info!("{}: {}/{}", self.name, self.current, self.total);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingSink {
        total: usize,
        ticks: usize,
        cancelled: bool,
    }

    impl ProgressSink for CountingSink {
        fn init_progress(&mut self, _name: &str, total: usize) {
            self.total = total;
            self.ticks = 0;
        }

        fn tick(&mut self) {
            self.ticks += 1;
        }

        fn is_cancelled(&self) -> bool {
            self.cancelled
        }
    }

    #[test]
    fn test_sink_counts_ticks() {
        let mut sink = CountingSink {
            total: 0,
            ticks: 0,
            cancelled: false,
        };
        sink.init_progress("phase", 3);
        sink.tick();
        sink.tick();
        assert_eq!(sink.total, 3);
        assert_eq!(sink.ticks, 2);
    }

    #[test]
    fn test_null_progress_never_cancels() {
        let mut sink = NullProgress;
        sink.init_progress("phase", 10);
        sink.tick();
        assert!(!sink.is_cancelled());
    }
}
