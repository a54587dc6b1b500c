//! Preview playback driver.
//!
//! Playback time follows the monotonic wall clock from the offset at which
//! playback started, sampled once per display refresh. The driver never
//! owns the editor state; every tick borrows it.

use std::time::{Duration, Instant};

use slidecut_common::clock::{ClockTick, PlaybackClock, WallClockAdvance};
use slidecut_project_model::EditorState;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// Source of animation-frame instants.
pub trait FrameScheduler {
    /// Wait until the next frame should be drawn and return its instant.
    fn next_frame(&mut self) -> impl std::future::Future<Output = Instant> + Send;
}

/// Frame scheduler ticking at a fixed display refresh rate.
pub struct IntervalScheduler {
    interval: Interval,
}

impl IntervalScheduler {
    /// Must be called inside a tokio runtime.
    pub fn new(refresh_hz: u32) -> Self {
        let period = Duration::from_secs_f64(1.0 / refresh_hz.max(1) as f64);
        let mut interval = interval(period);
        // A slow frame must not cause a burst of catch-up frames.
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }
}

impl FrameScheduler for IntervalScheduler {
    async fn next_frame(&mut self) -> Instant {
        self.interval.tick().await.into_std()
    }
}

/// Drives `playback.time` while the editor is playing.
#[derive(Debug, Default)]
pub struct PreviewPlayer {
    clock: Option<PlaybackClock<WallClockAdvance>>,
}

impl PreviewPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start playback from the current playback time. Returns false when
    /// there is nothing to play.
    pub fn play(&mut self, state: &mut EditorState, now: Instant) -> bool {
        state.play();
        if !state.playback.playing {
            return false;
        }
        let advance = WallClockAdvance::new(now, state.playback.time);
        tracing::debug!(
            offset = state.playback.time,
            started = advance.started_wall(),
            "Preview playback started"
        );
        self.clock = Some(PlaybackClock::new(advance, state.total_duration()));
        true
    }

    /// Pause playback; the next scheduled step is dropped.
    pub fn pause(&mut self, state: &mut EditorState) {
        state.pause();
        self.clock = None;
    }

    /// Seek, pausing first when playing.
    pub fn seek(&mut self, state: &mut EditorState, time: f64) {
        self.clock = None;
        state.seek(time);
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_some()
    }

    /// Advance playback to `now`. Returns `None` when not playing.
    ///
    /// On reaching the end the time is clamped to the total duration and
    /// playback stops.
    pub fn tick(&mut self, state: &mut EditorState, now: Instant) -> Option<ClockTick> {
        if !state.playback.playing {
            self.clock = None;
            return None;
        }
        let clock = self.clock.as_mut()?;
        let tick = clock.tick(now);
        state.playback.time = tick.time();
        if tick.is_finished() {
            tracing::debug!(time = tick.time(), "Preview playback reached the end");
            state.pause();
            self.clock = None;
        }
        Some(tick)
    }
}

/// Run preview playback until it stops, calling `on_frame` after each
/// advanced frame. `on_frame` may pause the editor (for example when it
/// handles a user event), which ends the loop before the next step.
///
/// Returns the number of frames delivered.
pub async fn run_preview<S, F>(
    player: &mut PreviewPlayer,
    state: &mut EditorState,
    scheduler: &mut S,
    mut on_frame: F,
) -> u64
where
    S: FrameScheduler,
    F: FnMut(&mut EditorState),
{
    let mut frames = 0;
    while state.playback.playing && player.is_running() {
        let now = scheduler.next_frame().await;
        let Some(tick) = player.tick(state, now) else {
            break;
        };
        frames += 1;
        on_frame(state);
        if tick.is_finished() {
            break;
        }
    }
    if !state.playback.playing {
        player.clock = None;
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use slidecut_project_model::{MediaAsset, MediaBytes};

    /// Scheduler yielding frames at a fixed step from a base instant.
    struct SteppedScheduler {
        base: Instant,
        step: Duration,
        frame: u32,
    }

    impl FrameScheduler for SteppedScheduler {
        async fn next_frame(&mut self) -> Instant {
            self.frame += 1;
            self.base + self.step * self.frame
        }
    }

    fn state_with_clips(n: usize) -> EditorState {
        let mut state = EditorState::new();
        let asset = state.add_asset(MediaAsset::image(
            "slide.png",
            MediaBytes::new("image/png", vec![0]),
        ));
        for _ in 0..n {
            state.add_clip_for_asset(&asset).unwrap();
        }
        state
    }

    #[test]
    fn test_play_on_empty_timeline_does_nothing() {
        let mut state = EditorState::new();
        let mut player = PreviewPlayer::new();
        assert!(!player.play(&mut state, Instant::now()));
        assert!(!state.playback.playing);
        assert!(player.tick(&mut state, Instant::now()).is_none());
    }

    #[test]
    fn test_tick_follows_wall_clock_from_offset() {
        let mut state = state_with_clips(2);
        state.seek(2.0);
        let start = Instant::now();
        let mut player = PreviewPlayer::new();
        assert!(player.play(&mut state, start));

        let tick = player
            .tick(&mut state, start + Duration::from_millis(1500))
            .unwrap();
        assert_eq!(tick, ClockTick::Running(3.5));
        assert!((state.playback.time - 3.5).abs() < 1e-9);
        assert!(state.playback.playing);
    }

    #[test]
    fn test_reaching_end_clamps_and_stops() {
        let mut state = state_with_clips(1);
        let start = Instant::now();
        let mut player = PreviewPlayer::new();
        player.play(&mut state, start);

        let tick = player.tick(&mut state, start + Duration::from_secs(6)).unwrap();
        assert_eq!(tick, ClockTick::Finished(5.0));
        assert_eq!(state.playback.time, 5.0);
        assert!(!state.playback.playing);
        assert!(!player.is_running());
    }

    #[test]
    fn test_seek_while_playing_pauses() {
        let mut state = state_with_clips(3);
        let mut player = PreviewPlayer::new();
        player.play(&mut state, Instant::now());
        player.seek(&mut state, 7.0);
        assert!(!state.playback.playing);
        assert_eq!(state.playback.time, 7.0);
        assert_eq!(state.timeline.active_clip_index(7.0), Some(1));
    }

    #[tokio::test]
    async fn test_run_preview_until_end() {
        let mut state = state_with_clips(1);
        let base = Instant::now();
        let mut player = PreviewPlayer::new();
        player.play(&mut state, base);

        let mut scheduler = SteppedScheduler {
            base,
            step: Duration::from_millis(500),
            frame: 0,
        };
        let mut seen = Vec::new();
        let frames = run_preview(&mut player, &mut state, &mut scheduler, |s| {
            seen.push(s.playback.time)
        })
        .await;

        // 0.5, 1.0, ... 4.5 running, then 5.0 finished.
        assert_eq!(frames, 10);
        assert_eq!(seen.last().copied(), Some(5.0));
        assert!(!state.playback.playing);
    }

    #[tokio::test]
    async fn test_pause_during_frame_cancels_next_step() {
        let mut state = state_with_clips(1);
        let base = Instant::now();
        let mut player = PreviewPlayer::new();
        player.play(&mut state, base);

        let mut scheduler = SteppedScheduler {
            base,
            step: Duration::from_millis(100),
            frame: 0,
        };
        let frames = run_preview(&mut player, &mut state, &mut scheduler, |s| {
            if s.playback.time >= 0.3 - 1e-9 {
                s.pause();
            }
        })
        .await;

        assert_eq!(frames, 3);
        assert!((state.playback.time - 0.3).abs() < 1e-9);
        assert!(!player.is_running());
    }
}
