use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tracing::warn;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub fps: f32,
    pub tps: f32,
    pub frame_time_ms: f32,
}

/// Shared view of the most recent loop metrics window.
#[derive(Clone, Debug, Default)]
pub struct MetricsHandle {
    latest: Arc<RwLock<LoopMetricsSnapshot>>,
}

impl MetricsHandle {
    pub fn snapshot(&self) -> LoopMetricsSnapshot {
        *self
            .latest
            .read()
            .unwrap_or_else(|poisoned| recovered("read", poisoned))
    }

    pub(crate) fn publish(&self, snapshot: LoopMetricsSnapshot) {
        let mut guard = self
            .latest
            .write()
            .unwrap_or_else(|poisoned| recovered("write", poisoned));
        *guard = snapshot;
    }
}

fn recovered<G>(operation: &'static str, poisoned: PoisonError<G>) -> G {
    warn!(operation, "metrics_lock_poisoned");
    poisoned.into_inner()
}

#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    window_start: Instant,
    window: Duration,
    frames: u32,
    ticks: u32,
    frame_time_total: Duration,
}

impl MetricsAccumulator {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            window_start: Instant::now(),
            window,
            frames: 0,
            ticks: 0,
            frame_time_total: Duration::ZERO,
        }
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration) {
        self.frames = self.frames.saturating_add(1);
        self.frame_time_total = self.frame_time_total.saturating_add(frame_dt);
    }

    pub(crate) fn record_tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
    }

    pub(crate) fn maybe_snapshot(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.window {
            return None;
        }

        let seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let frame_time_ms = match self.frames {
            0 => 0.0,
            frames => self.frame_time_total.as_secs_f32() * 1000.0 / frames as f32,
        };
        let snapshot = LoopMetricsSnapshot {
            fps: self.frames as f32 / seconds,
            tps: self.ticks as f32 / seconds,
            frame_time_ms,
        };

        self.window_start = now;
        self.frames = 0;
        self.ticks = 0;
        self.frame_time_total = Duration::ZERO;
        Some(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn window_produces_rates_then_resets() {
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1));
        let start = accumulator.window_start;
        for _ in 0..2 {
            accumulator.record_frame(Duration::from_millis(20));
        }
        for _ in 0..4 {
            accumulator.record_tick();
        }

        assert!(accumulator
            .maybe_snapshot(start + Duration::from_millis(500))
            .is_none());
        let snapshot = accumulator
            .maybe_snapshot(start + Duration::from_secs(1))
            .expect("snapshot after full window");

        assert!((snapshot.fps - 2.0).abs() < 0.01);
        assert!((snapshot.tps - 4.0).abs() < 0.01);
        assert!((snapshot.frame_time_ms - 20.0).abs() < 0.01);
        assert_eq!(accumulator.frames, 0);
        assert_eq!(accumulator.ticks, 0);
    }

    #[test]
    fn handle_survives_poisoned_lock() {
        let handle = MetricsHandle::default();
        let poisoner = handle.clone();
        let _ = thread::spawn(move || {
            let _guard = poisoner.latest.write().expect("write guard");
            panic!("poison metrics lock");
        })
        .join();

        let snapshot = LoopMetricsSnapshot {
            fps: 60.0,
            tps: 60.0,
            frame_time_ms: 16.0,
        };
        handle.publish(snapshot);
        assert_eq!(handle.snapshot(), snapshot);
    }
}
