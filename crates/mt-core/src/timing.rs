//! Lightweight performance timing utilities.
//!
//! Timers are off by default. They are switched on with `enable_timing()` or
//! by setting the `MT_TIMING` environment variable.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

static ENABLED: AtomicBool = AtomicBool::new(false);

/// Enable performance timing globally.
pub fn enable_timing() {
    ENABLED.store(true, Ordering::Relaxed);
}

/// Disable performance timing globally.
pub fn disable_timing() {
    ENABLED.store(false, Ordering::Relaxed);
}

/// Check if timing is enabled.
pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed) || std::env::var("MT_TIMING").is_ok()
}

/// A simple timer that measures elapsed time.
pub struct Timer {
    label: &'static str,
    start: Instant,
    enabled: bool,
}

impl Timer {
    /// Create and start a new timer with the given label.
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            start: Instant::now(),
            enabled: is_enabled(),
        }
    }

    /// Stop the timer and return elapsed time in seconds.
    /// If timing is disabled, returns None.
    pub fn stop(self) -> Option<f64> {
        if self.enabled {
            Some(self.start.elapsed().as_secs_f64())
        } else {
            None
        }
    }

    /// Stop the timer and add the elapsed time to an accumulator.
    pub fn stop_into(self, acc: &AccumulatingTimer) {
        if let Some(elapsed) = self.stop() {
            acc.record(elapsed);
        }
    }

    /// Stop the timer and print the result if enabled.
    pub fn stop_and_print(self) {
        let label = self.label;
        if let Some(elapsed) = self.stop() {
            println!("[TIMING] {}: {:.3}s", label, elapsed);
        }
    }
}

/// Accumulating timer for tracking total time across multiple calls.
pub struct AccumulatingTimer {
    total_ns: AtomicU64,
    count: AtomicU64,
}

impl Default for AccumulatingTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl AccumulatingTimer {
    /// Create a new accumulating timer.
    pub const fn new() -> Self {
        Self {
            total_ns: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Record a timing measurement.
    pub fn record(&self, duration_s: f64) {
        let nanos = (duration_s * 1e9) as u64;
        self.total_ns.fetch_add(nanos, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total time spent (in seconds).
    pub fn total_seconds(&self) -> f64 {
        self.total_ns.load(Ordering::Relaxed) as f64 / 1e9
    }

    /// Get number of calls.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Get average time per call (in seconds).
    pub fn average_seconds(&self) -> f64 {
        let count = self.count();
        if count > 0 {
            self.total_seconds() / count as f64
        } else {
            0.0
        }
    }

    /// Reset the timer.
    pub fn reset(&self) {
        self.total_ns.store(0, Ordering::Relaxed);
        self.count.store(0, Ordering::Relaxed);
    }
}

/// Timers for the phases of track generation and the transport solve.
pub mod moc_timing {
    use super::AccumulatingTimer;

    /// Time spent laying down and ray tracing tracks
    pub static RAY_TRACING: AccumulatingTimer = AccumulatingTimer::new();
    /// Time spent in the parallel part of transport sweeps
    pub static SWEEP: AccumulatingTimer = AccumulatingTimer::new();
    /// Time spent summing per-partition tallies into the region table
    pub static REDUCTION: AccumulatingTimer = AccumulatingTimer::new();
    /// Time spent recomputing region sources
    pub static SOURCE_UPDATE: AccumulatingTimer = AccumulatingTimer::new();
    /// Time spent evaluating residuals
    pub static CONVERGENCE_CHECK: AccumulatingTimer = AccumulatingTimer::new();
    /// Time spent collapsing and solving the coarse mesh problem
    pub static CMFD: AccumulatingTimer = AccumulatingTimer::new();

    /// Reset all solver timers.
    pub fn reset_all() {
        RAY_TRACING.reset();
        SWEEP.reset();
        REDUCTION.reset();
        SOURCE_UPDATE.reset();
        CONVERGENCE_CHECK.reset();
        CMFD.reset();
    }

    fn line(label: &str, timer: &AccumulatingTimer) {
        let count = timer.count();
        if count > 0 {
            println!(
                "{:<20} {} calls, {:.3}s total, {:.4}ms avg",
                label,
                count,
                timer.total_seconds(),
                timer.average_seconds() * 1000.0
            );
        }
    }

    /// Print MOC timing summary.
    pub fn print_summary() {
        use super::is_enabled;
        if !is_enabled() {
            return;
        }

        println!("\n=== MOC Phase Breakdown ===");
        line("ray tracing:", &RAY_TRACING);
        line("transport sweep:", &SWEEP);
        line("tally reduction:", &REDUCTION);
        line("source update:", &SOURCE_UPDATE);
        line("convergence check:", &CONVERGENCE_CHECK);
        line("cmfd:", &CMFD);

        let total = SWEEP.total_seconds() + REDUCTION.total_seconds();
        if total > 0.0 {
            println!(
                "TOTAL sweep work:    {:.3}s ({:.1}% in reduction)",
                total,
                REDUCTION.total_seconds() / total * 100.0
            );
        }
        println!("===========================\n");
    }
}

/// Performance statistics collector.
#[derive(Default)]
pub struct PerfStats {
    pub generation_time_s: f64,
    pub solve_time_s: f64,
    pub iterations: usize,
    pub num_tracks: usize,
    pub num_segments: usize,
}

impl PerfStats {
    /// Print a formatted summary of the statistics.
    pub fn print_summary(&self) {
        if !is_enabled() {
            return;
        }

        println!("\n=== Performance Summary ===");

        if self.generation_time_s > 0.0 {
            println!("Track generation:    {:.3}s", self.generation_time_s);
            println!("  Tracks:            {}", self.num_tracks);
            println!("  Segments:          {}", self.num_segments);
        }

        if self.solve_time_s > 0.0 {
            println!("Solve time:          {:.3}s", self.solve_time_s);
            if self.iterations > 0 {
                println!("  Iterations:        {}", self.iterations);
                println!(
                    "  Avg iteration:     {:.4}s",
                    self.solve_time_s / self.iterations as f64
                );
            }
        }

        println!("===========================\n");

        moc_timing::print_summary();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulating_timer_average() {
        let t = AccumulatingTimer::new();
        t.record(0.5);
        t.record(1.5);
        assert_eq!(t.count(), 2);
        assert!((t.average_seconds() - 1.0).abs() < 1e-6);
        t.reset();
        assert_eq!(t.count(), 0);
        assert_eq!(t.average_seconds(), 0.0);
    }
}
