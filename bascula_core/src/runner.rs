//! Paced execution of the firmware loop.
//!
//! `run` boots the firmware, then repeats `cycle()` with a fixed period until
//! the shutdown flag is raised, the cycle budget is spent, or the host link
//! fails. A cycle that overruns its period (a calibration average, a slow
//! sensor) is counted as a missed deadline and the next cycle starts at once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bascula_traits::{HostLink, Scale, Storage};

use crate::error::Result;
use crate::firmware::Firmware;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Stop after this many cycles; `None` runs until shutdown.
    pub max_cycles: Option<u64>,
}

/// Loop timing collected over one `run`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    pub cycles: u64,
    pub missed_deadlines: u64,
    pub sensor_faults: u64,
    pub min_cycle: Duration,
    pub max_cycle: Duration,
    total_cycle: Duration,
}

impl RunStats {
    fn record(&mut self, busy: Duration, missed: bool) {
        if self.cycles == 0 || busy < self.min_cycle {
            self.min_cycle = busy;
        }
        self.max_cycle = self.max_cycle.max(busy);
        self.total_cycle = self.total_cycle.saturating_add(busy);
        self.cycles += 1;
        if missed {
            self.missed_deadlines += 1;
        }
    }

    /// Mean busy time per cycle (zero before the first cycle).
    pub fn avg_cycle(&self) -> Duration {
        match u32::try_from(self.cycles) {
            Ok(0) => Duration::ZERO,
            Ok(n) => self.total_cycle / n,
            Err(_) => Duration::from_secs_f64(self.total_cycle.as_secs_f64() / self.cycles as f64),
        }
    }
}

/// Boot and run `fw` until `shutdown` is set or `opts.max_cycles` is reached.
pub fn run<S, L, St>(
    fw: &mut Firmware<S, L, St>,
    shutdown: &AtomicBool,
    opts: &RunOptions,
) -> Result<RunStats>
where
    S: Scale,
    L: HostLink,
    St: Storage,
{
    fw.boot()?;
    let clock = fw.clock().clone();
    let period = fw.period();
    let mut stats = RunStats::default();
    tracing::info!(
        period_us = period.as_micros() as u64,
        max_cycles = ?opts.max_cycles,
        "loop start"
    );

    loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("shutdown requested");
            break;
        }
        if let Some(max) = opts.max_cycles
            && stats.cycles >= max
        {
            break;
        }

        let start = clock.now();
        fw.cycle()?;
        let busy = clock.now().saturating_duration_since(start);
        let missed = busy > period;
        stats.record(busy, missed);
        if missed {
            tracing::debug!(busy_us = busy.as_micros() as u64, "cycle overran its period");
        } else {
            clock.sleep(period - busy);
        }
    }

    stats.sensor_faults = fw.sensor_faults();
    tracing::info!(
        cycles = stats.cycles,
        missed_deadlines = stats.missed_deadlines,
        sensor_faults = stats.sensor_faults,
        "loop stopped"
    );
    Ok(stats)
}
