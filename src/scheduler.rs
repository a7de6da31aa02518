//! Frame budget gate, model decimation and performance counters.

use std::time::Duration;

use sysinfo::{Pid, System};

use crate::config::SchedulerConfig;

/// Why a tick did no work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The capture source has no complete frame yet
    NotReady,
    /// Too soon after the previous processed cycle
    Budget,
}

/// Work for one processed cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CyclePlan {
    /// 1-based count of processed cycles
    pub cycle: u64,
    pub run_segmentation: bool,
    pub run_pose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Skip(SkipReason),
    Process(CyclePlan),
}

/// Paces the pipeline to the target frame rate.
///
/// Timestamps are monotonic offsets from an arbitrary origin, so tests can
/// drive the scheduler with synthetic clocks.
pub struct FrameScheduler {
    config: SchedulerConfig,
    budget_ms: f64,
    last_processed: Option<Duration>,
    cycle: u64,
    stats: PerfStats,
}

impl FrameScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            budget_ms: config.frame_budget_ms() - config.budget_tolerance_ms,
            config,
            last_processed: None,
            cycle: 0,
            stats: PerfStats::new(),
        }
    }

    /// Decide what to do at time `ts`.
    ///
    /// Skipped ticks leave every counter untouched.
    pub fn tick(&mut self, ts: Duration, video_ready: bool) -> Tick {
        if !video_ready {
            return Tick::Skip(SkipReason::NotReady);
        }
        if let Some(last) = self.last_processed {
            let elapsed_ms = ts.saturating_sub(last).as_secs_f64() * 1000.0;
            if elapsed_ms < self.budget_ms {
                return Tick::Skip(SkipReason::Budget);
            }
        }

        self.last_processed = Some(ts);
        self.cycle += 1;
        Tick::Process(CyclePlan {
            cycle: self.cycle,
            run_segmentation: self.cycle % self.config.seg_every.get() == 0,
            run_pose: self.cycle % self.config.pose_every.get() == 0,
        })
    }

    /// Record the wall-clock duration of a processed cycle.
    pub fn finish_cycle(&mut self, duration: Duration) {
        let ms = duration.as_secs_f64() * 1000.0;
        let a = self.config.frame_time_smoothing;
        self.stats.frame_ms = Some(match self.stats.frame_ms {
            Some(prev) => a * prev + (1.0 - a) * ms,
            None => ms,
        });
        self.stats.busy_ms += ms;
        self.stats.frames += 1;
    }

    /// Publish fps and CPU load once a full stats window has passed.
    ///
    /// Returns true when a new window was started.
    pub fn roll_window(&mut self, ts: Duration) -> bool {
        let start = *self.stats.window_start.get_or_insert(ts);
        let elapsed_ms = ts.saturating_sub(start).as_secs_f64() * 1000.0;
        if elapsed_ms < self.config.stats_window_ms {
            return false;
        }

        self.stats.fps = self.stats.frames;
        self.stats.cpu_load = (self.stats.busy_ms / elapsed_ms).clamp(0.0, 1.0);
        self.stats.frames = 0;
        self.stats.busy_ms = 0.0;
        self.stats.window_start = Some(ts);
        self.stats.sample_memory();
        true
    }

    /// How long the host loop may sleep before the next tick can process.
    pub fn time_until_next(&self, ts: Duration) -> Duration {
        match self.last_processed {
            Some(last) => {
                let next = last + Duration::from_secs_f64(self.budget_ms.max(0.0) / 1000.0);
                next.saturating_sub(ts)
            }
            None => Duration::ZERO,
        }
    }

    /// Processed cycles so far
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn stats(&self) -> &PerfStats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut PerfStats {
        &mut self.stats
    }
}

/// Process-wide counters shown on the HUD.
pub struct PerfStats {
    /// Processed cycles in the last full window
    pub fps: u32,
    /// Smoothed cycle duration
    pub frame_ms: Option<f64>,
    /// Busy share of the last window, 0..=1
    pub cpu_load: f64,
    pub cores: usize,
    pub memory_mb: Option<u64>,
    /// Inference backend descriptor
    pub gpu: Option<String>,
    frames: u32,
    busy_ms: f64,
    window_start: Option<Duration>,
    system: System,
    pid: Option<Pid>,
}

impl PerfStats {
    fn new() -> Self {
        Self {
            fps: 0,
            frame_ms: None,
            cpu_load: 0.0,
            cores: num_cpus::get(),
            memory_mb: None,
            gpu: None,
            frames: 0,
            busy_ms: 0.0,
            window_start: None,
            system: System::new(),
            pid: sysinfo::get_current_pid().ok(),
        }
    }

    fn sample_memory(&mut self) {
        let Some(pid) = self.pid else {
            return;
        };
        if self.system.refresh_process(pid) {
            self.memory_mb = self
                .system
                .process(pid)
                .map(|process| process.memory() / (1024 * 1024));
        }
    }

    /// Values for one HUD draw
    pub fn snapshot(&self) -> PerfSnapshot {
        PerfSnapshot {
            fps: self.fps,
            frame_ms: self.frame_ms,
            cpu_load: self.cpu_load,
            cores: self.cores,
            memory_mb: self.memory_mb,
            gpu: self.gpu.clone(),
        }
    }
}

/// Plain copy of [`PerfStats`] handed to the compositor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerfSnapshot {
    pub fps: u32,
    pub frame_ms: Option<f64>,
    pub cpu_load: f64,
    pub cores: usize,
    pub memory_mb: Option<u64>,
    pub gpu: Option<String>,
}
