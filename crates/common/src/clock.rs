//! Playback clock with pluggable time-advance strategies.
//!
//! Both the interactive preview and the export loop produce a sequence of
//! playback timestamps consumed identically by the compositor. They differ
//! only in how the next timestamp is derived:
//! - Preview follows the monotonic wall clock from a recorded start offset
//! - Export steps a frame counter at a fixed rate, ignoring wall-clock jitter
//!
//! Both stop under the same rule: a tick whose time reaches or exceeds the
//! total duration is `Finished`, and its time is clamped to the total.

use std::time::{Duration, Instant};

/// Strategy that yields the next virtual playback time in seconds.
pub trait TimeAdvance {
    /// Produce the next playback time. `now` is the current monotonic instant;
    /// strategies that do not follow the wall clock ignore it.
    fn advance(&mut self, now: Instant) -> f64;
}

/// Real-time advance anchored at the moment playback started.
#[derive(Debug, Clone)]
pub struct WallClockAdvance {
    /// The instant playback (re)started.
    anchor: Instant,

    /// Playback time at `anchor`, in seconds.
    start_offset_secs: f64,

    /// Wall-clock time at `anchor` (RFC 3339), for logs.
    started_wall: String,
}

impl WallClockAdvance {
    /// Anchor to `anchor`, resuming from `start_offset_secs`.
    pub fn new(anchor: Instant, start_offset_secs: f64) -> Self {
        Self {
            anchor,
            start_offset_secs: start_offset_secs.max(0.0),
            started_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Anchor to now.
    pub fn starting_now(start_offset_secs: f64) -> Self {
        Self::new(Instant::now(), start_offset_secs)
    }

    /// Playback time at the anchor.
    pub fn start_offset_secs(&self) -> f64 {
        self.start_offset_secs
    }

    /// Wall-clock time when playback started.
    pub fn started_wall(&self) -> &str {
        &self.started_wall
    }
}

impl TimeAdvance for WallClockAdvance {
    fn advance(&mut self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.anchor);
        self.start_offset_secs + elapsed.as_secs_f64()
    }
}

/// Fixed-step advance: frame `k` is at `k / fps` seconds.
#[derive(Debug, Clone)]
pub struct FixedStepAdvance {
    rate: FrameRate,
    next_frame: u64,
}

impl FixedStepAdvance {
    pub fn new(rate: FrameRate) -> Self {
        Self {
            rate,
            next_frame: 0,
        }
    }

    /// Index of the frame the next `advance` call will produce.
    pub fn next_frame(&self) -> u64 {
        self.next_frame
    }

    pub fn rate(&self) -> FrameRate {
        self.rate
    }
}

impl TimeAdvance for FixedStepAdvance {
    fn advance(&mut self, _now: Instant) -> f64 {
        let time = self.rate.frame_time(self.next_frame);
        self.next_frame += 1;
        time
    }
}

/// A frame rate in whole frames per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRate {
    fps: u32,
}

impl FrameRate {
    /// Create a frame rate; zero is raised to one.
    pub fn new(fps: u32) -> Self {
        Self { fps: fps.max(1) }
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Duration of a single frame.
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps as f64)
    }

    /// Timestamp of frame `index` in seconds.
    pub fn frame_time(&self, index: u64) -> f64 {
        index as f64 / self.fps as f64
    }

    /// Number of frames needed to cover `duration_secs`.
    pub fn frames_for(&self, duration_secs: f64) -> u64 {
        if duration_secs <= 0.0 {
            return 0;
        }
        (duration_secs * self.fps as f64 - 1e-9).ceil() as u64
    }
}

/// Outcome of a single clock tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockTick {
    /// Playback continues at this time.
    Running(f64),
    /// Playback reached the end; the time is clamped to the total duration.
    Finished(f64),
}

impl ClockTick {
    /// The playback time carried by this tick.
    pub fn time(&self) -> f64 {
        match *self {
            ClockTick::Running(t) | ClockTick::Finished(t) => t,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, ClockTick::Finished(_))
    }
}

/// A playback clock bounded by the timeline duration.
#[derive(Debug, Clone)]
pub struct PlaybackClock<A> {
    advance: A,
    total_secs: f64,
    finished: bool,
}

impl<A: TimeAdvance> PlaybackClock<A> {
    pub fn new(advance: A, total_secs: f64) -> Self {
        Self {
            advance,
            total_secs: total_secs.max(0.0),
            finished: false,
        }
    }

    /// Advance the clock. Once `Finished` has been returned every later tick
    /// repeats it.
    pub fn tick(&mut self, now: Instant) -> ClockTick {
        if self.finished {
            return ClockTick::Finished(self.total_secs);
        }
        let time = self.advance.advance(now);
        if time >= self.total_secs {
            self.finished = true;
            ClockTick::Finished(self.total_secs)
        } else {
            ClockTick::Running(time.max(0.0))
        }
    }

    pub fn total_secs(&self) -> f64 {
        self.total_secs
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn strategy(&self) -> &A {
        &self.advance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wall_clock_resumes_from_offset() {
        let anchor = Instant::now();
        let mut advance = WallClockAdvance::new(anchor, 2.0);
        let t = advance.advance(anchor + Duration::from_millis(1500));
        assert!((t - 3.5).abs() < 1e-9);
    }

    #[test]
    fn test_wall_clock_ignores_instants_before_anchor() {
        let anchor = Instant::now() + Duration::from_secs(5);
        let mut advance = WallClockAdvance::new(anchor, 1.0);
        assert!((advance.advance(Instant::now()) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fixed_step_ignores_wall_clock() {
        let mut advance = FixedStepAdvance::new(FrameRate::new(30));
        let now = Instant::now();
        assert_eq!(advance.advance(now), 0.0);
        assert!((advance.advance(now + Duration::from_secs(10)) - 1.0 / 30.0).abs() < 1e-12);
        assert_eq!(advance.next_frame(), 2);
    }

    #[test]
    fn test_frames_for_duration() {
        let rate = FrameRate::new(30);
        assert_eq!(rate.frames_for(15.0), 450);
        assert_eq!(rate.frames_for(0.5), 15);
        assert_eq!(rate.frames_for(0.51), 16);
        assert_eq!(rate.frames_for(0.0), 0);
    }

    #[test]
    fn test_fixed_step_clock_runs_exact_frame_count() {
        let rate = FrameRate::new(30);
        let mut clock = PlaybackClock::new(FixedStepAdvance::new(rate), 2.0);
        let now = Instant::now();
        let mut running = 0;
        while let ClockTick::Running(_) = clock.tick(now) {
            running += 1;
        }
        assert_eq!(running, rate.frames_for(2.0));
        assert!(clock.is_finished());
        assert_eq!(clock.tick(now), ClockTick::Finished(2.0));
    }

    #[test]
    fn test_clock_clamps_to_total_when_finishing() {
        let anchor = Instant::now();
        let mut clock = PlaybackClock::new(WallClockAdvance::new(anchor, 9.0), 10.0);
        assert_eq!(
            clock.tick(anchor + Duration::from_millis(500)),
            ClockTick::Running(9.5)
        );
        let tick = clock.tick(anchor + Duration::from_secs(3));
        assert!(tick.is_finished());
        assert_eq!(tick.time(), 10.0);
    }

    #[test]
    fn test_rate_zero_is_raised() {
        assert_eq!(FrameRate::new(0).fps(), 1);
    }
}
