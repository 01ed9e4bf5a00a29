use std::time::{Duration, Instant};

use crate::config::{LiveConfig, TrackerConfig};
use crate::pose::Skeleton;
use crate::timeline::{Frame, Timeline};
use crate::tracker::IdentityTracker;

/// ライブカメラ向けのストリーミングセッション
///
/// カメラは推論より速くフレームを吐くので、最小間隔を下回って届いた
/// フレームは検出に回さず捨てる（間引きであって待ち行列ではない）。
/// 捨てた分はタイムラインにも入らないため、録画のfpsは実測から求める。
pub struct LiveSession {
    tracker: IdentityTracker,
    min_interval: Duration,
    last_sample: Option<Instant>,
    recording: Option<RecordingState>,
}

struct RecordingState {
    frames: Vec<Frame>,
    started: Instant,
}

impl LiveSession {
    pub fn new(live: &LiveConfig, tracker: &TrackerConfig) -> Self {
        Self {
            tracker: IdentityTracker::from_config(tracker),
            min_interval: Duration::from_millis(live.min_interval_ms),
            last_sample: None,
            recording: None,
        }
    }

    /// このフレームを検出に回すべきか
    ///
    /// 前回採用したフレームから最小間隔が経っていなければfalse。
    /// trueを返した時点でそのフレームを採用したことになる。
    pub fn should_sample(&mut self, now: Instant) -> bool {
        match self.last_sample {
            Some(last) if now.duration_since(last) < self.min_interval => false,
            _ => {
                self.last_sample = Some(now);
                true
            }
        }
    }

    /// 採用したフレームの検出結果をスロット順に整えて返す
    ///
    /// 録画中であればタイムラインにも追加する。検出ゼロでも録画には
    /// 空フレームとして残る（時間軸を保つため）。
    pub fn push(&mut self, skeletons: Vec<Skeleton>) -> Frame {
        let frame = Frame::new(self.tracker.assign(skeletons));
        if let Some(state) = &mut self.recording {
            state.frames.push(frame.clone());
        }
        frame
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    /// 録画を開始する。トラック状態もここでリセットする
    pub fn start_recording(&mut self, now: Instant) {
        self.tracker.reset();
        self.recording = Some(RecordingState {
            frames: Vec::new(),
            started: now,
        });
    }

    /// 録画を終了してタイムラインを返す
    ///
    /// fpsは録画時間とフレーム数の実測。録画していなかった、または
    /// 1フレームも録れていなければNone。
    pub fn stop_recording(&mut self, now: Instant) -> Option<Timeline> {
        let state = self.recording.take()?;
        if state.frames.is_empty() {
            return None;
        }

        let elapsed = now.duration_since(state.started).as_secs_f64();
        let fps = if elapsed > 0.0 {
            state.frames.len() as f64 / elapsed
        } else {
            1000.0 / self.min_interval.as_millis().max(1) as f64
        };
        Some(Timeline::new(fps as f32, state.frames))
    }
}
