//! Time-window partitioning and parallel sampling.
//!
//! The track duration is split into contiguous windows, one per worker.
//! A tick `k * cycle` belongs to the window with `start <= t < end`; only
//! the last window also owns its end, so every tick is sampled once.

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, TrackError};
use crate::models::Sample;
use crate::synthesis::TrackSet;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub index: usize,
    pub start_s: f64,
    pub end_s: f64,
    /// Set on the last window only
    pub inclusive_end: bool,
}

impl TimeWindow {
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start_s && (t < self.end_s || (self.inclusive_end && t <= self.end_s))
    }

    /// Tick times `k * cycle_s` owned by this window.
    pub fn ticks(&self, cycle_s: f64) -> Vec<f64> {
        if cycle_s <= 0.0 || !cycle_s.is_finite() {
            return Vec::new();
        }
        let mut k = (self.start_s / cycle_s).floor().max(0.0) as u64;
        let mut ticks = Vec::new();
        loop {
            let t = k as f64 * cycle_s;
            if t > self.end_s {
                break;
            }
            if self.contains(t) {
                ticks.push(t);
            }
            k += 1;
        }
        ticks
    }
}

/// Split `[0, total_s]` into `workers` equal windows; the last absorbs any
/// rounding remainder.
pub fn partition(total_s: f64, workers: usize) -> Result<Vec<TimeWindow>> {
    if workers == 0 {
        return Err(TrackError::Sampling("at least one worker is required".into()));
    }
    if !total_s.is_finite() || total_s < 0.0 {
        return Err(TrackError::Sampling(format!("invalid track duration {total_s}")));
    }
    let width = total_s / workers as f64;
    let windows = (0..workers)
        .map(|index| {
            let last = index + 1 == workers;
            TimeWindow {
                index,
                start_s: width * index as f64,
                end_s: if last { total_s } else { width * (index + 1) as f64 },
                inclusive_end: last,
            }
        })
        .collect();
    Ok(windows)
}

/// Sample one window of the track at every owned tick.
pub fn sample_window(set: &TrackSet, window: &TimeWindow, cycle_s: f64) -> Result<Vec<Sample>> {
    let samples: Vec<Sample> = window.ticks(cycle_s).into_iter().map(|t| set.sample_at(t)).collect();
    if let Some(bad) = samples
        .iter()
        .find(|s| !(s.position.lat.is_finite() && s.position.lon.is_finite() && s.speed_mps.is_finite()))
    {
        return Err(TrackError::Window {
            window: window.index,
            reason: format!("non-finite state at t={:.3}s", bad.elapsed_s),
        });
    }
    debug!(window = window.index, samples = samples.len(), "window sampled");
    Ok(samples)
}

/// Sample the whole track with `workers` threads, one window each, and
/// merge the results in time order.
pub fn sample_parallel(set: &TrackSet, workers: usize, cycle_s: f64) -> Result<Vec<Sample>> {
    if cycle_s <= 0.0 || !cycle_s.is_finite() {
        return Err(TrackError::Sampling(format!("invalid cycle time {cycle_s}")));
    }
    let windows = partition(set.duration(), workers)?;
    let pool = ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|err| TrackError::Sampling(err.to_string()))?;

    let per_window: Vec<Vec<Sample>> = pool.install(|| {
        windows
            .par_iter()
            .map(|window| sample_window(set, window, cycle_s))
            .collect::<Result<Vec<_>>>()
    })?;

    let mut samples: Vec<Sample> = per_window.into_iter().flatten().collect();
    samples.sort_by(|a, b| a.elapsed_s.total_cmp(&b.elapsed_s));
    info!(
        workers,
        cycle_s,
        samples = samples.len(),
        "track sampled"
    );
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_workers_is_rejected() {
        assert!(matches!(partition(10.0, 0), Err(TrackError::Sampling(_))));
    }

    #[test]
    fn last_window_absorbs_remainder() {
        let windows = partition(10.0, 3).unwrap();
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0].start_s, 0.0);
        assert_eq!(windows[2].end_s, 10.0);
        assert!(windows[2].inclusive_end);
        assert!(!windows[0].inclusive_end);
    }

    #[test]
    fn boundary_tick_belongs_to_later_window() {
        let windows = partition(10.0, 2).unwrap();
        assert!(!windows[0].ticks(1.0).contains(&5.0));
        assert!(windows[1].ticks(1.0).contains(&5.0));
        assert!(windows[1].ticks(1.0).contains(&10.0));
    }

    proptest! {
        #[test]
        fn every_tick_sampled_once(total in 0.0f64..500.0, workers in 1usize..12, cycle in 0.1f64..7.0) {
            let windows = partition(total, workers).unwrap();
            let mut ticks: Vec<f64> = windows.iter().flat_map(|w| w.ticks(cycle)).collect();
            ticks.sort_by(f64::total_cmp);
            let expected: Vec<f64> = (0u64..)
                .map(|k| k as f64 * cycle)
                .take_while(|t| *t <= total)
                .collect();
            prop_assert_eq!(ticks, expected);
        }
    }
}
