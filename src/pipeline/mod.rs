pub mod live;
pub mod media;

use anyhow::Result;
use log::warn;
use std::sync::mpsc::Sender;

use crate::beat::BeatTrack;
use crate::config::{PipelineConfig, TrackerConfig};
use crate::pose::{normalize_all, LandmarkSource};
use crate::timeline::{Frame, Timeline};
use crate::tracker::IdentityTracker;
use crate::transform::AspectFillMap;

pub use live::LiveSession;
pub use media::{extract_audio_mono, MediaSource, VideoFileSource};

/// パイプライン各段が発行するイベント
///
/// 映像処理とビート検出は同じメディアに対して独立・並行に走るため、
/// UI側は片方の完了を待たずに進捗を表示できる。
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// 映像処理の進捗 [0, 1]
    Progress(f64),
    /// 映像処理完了
    VideoDone(ProcessOutcome),
    /// ビート検出完了
    BeatsDone(BeatTrack),
}

/// 映像処理の完了結果
///
/// タイムラインは完全（空フレームを含み得る）か、エラーで生成されない
/// かのどちらか。部分的なタイムラインは外に出さない。
#[derive(Debug, Clone)]
pub enum ProcessOutcome {
    /// 少なくとも1フレームで誰かを検出した
    Complete(Timeline),
    /// 完走したが全フレームで誰も検出されなかった。成功とは別の結果として
    /// 返し、呼び出し側は「人が映る動画で試して」等の案内を出せる
    NoPosesDetected(Timeline),
}

impl ProcessOutcome {
    pub fn timeline(&self) -> &Timeline {
        match self {
            ProcessOutcome::Complete(t) | ProcessOutcome::NoPosesDetected(t) => t,
        }
    }
}

/// 動画からキーポイントタイムラインを抽出するパイプライン
///
/// サンプリング時刻ごとに 静止フレーム抽出 → ランドマーク検出 → 正規化
/// →（表示空間変換）→ トラッカー割当 を行う。トラッカーが前フレーム
/// 状態に依存するため、処理は時刻順に直列。
pub struct VideoPipeline<D: LandmarkSource> {
    detector: D,
    tracker: IdentityTracker,
    min_confidence: f32,
    target_fps: f64,
    apply_aspect_fill: bool,
    display_size: (f32, f32),
    flip_y: bool,
}

impl<D: LandmarkSource> VideoPipeline<D> {
    pub fn new(detector: D, pipeline: &PipelineConfig, tracker: &TrackerConfig) -> Self {
        Self {
            detector,
            tracker: IdentityTracker::from_config(tracker),
            min_confidence: tracker.confidence_threshold,
            target_fps: pipeline.target_fps,
            apply_aspect_fill: pipeline.apply_aspect_fill,
            display_size: (pipeline.display_width, pipeline.display_height),
            flip_y: pipeline.flip_y,
        }
    }

    /// 動画全体を処理してタイムラインを返す
    ///
    /// サンプリングレートは `min(ネイティブFPS, 目標FPS)`。スローモーション
    /// 素材をオーバーサンプリングしないための上限であり、時刻は0から
    /// `1/rate` 刻みで等間隔に取る。フレーム抽出に失敗した時刻はスキップ
    /// して続行する（トラッカー状態は進めない）。
    pub fn process(
        &mut self,
        source: &mut dyn MediaSource,
        events: &Sender<PipelineEvent>,
    ) -> Result<ProcessOutcome> {
        let duration = source.duration();
        let native_fps = source.native_fps();
        anyhow::ensure!(duration > 0.0, "Source has no duration");
        anyhow::ensure!(native_fps > 0.0, "Source has no frame rate");

        let rate = native_fps.min(self.target_fps);
        let step = 1.0 / rate;

        let transform = if self.apply_aspect_fill {
            let (w, h) = source.resolution();
            Some(AspectFillMap::new(
                w as f32,
                h as f32,
                self.display_size.0,
                self.display_size.1,
                self.flip_y,
            ))
        } else {
            None
        };

        // セッション開始: 前の動画のトラック状態を持ち越さない
        self.tracker.reset();

        let mut frames = Vec::new();
        let total_samples = (duration * rate).ceil() as usize;

        for index in 0..total_samples {
            let timestamp = index as f64 * step;
            match source.frame_at(timestamp) {
                Ok(image) => match self.detector.detect(&image) {
                    Ok(raw) => {
                        let mut skeletons =
                            normalize_all(&raw, self.detector.source_kind(), self.min_confidence);
                        if let Some(map) = &transform {
                            for s in skeletons.iter_mut() {
                                *s = map.apply_skeleton(s);
                            }
                        }
                        let ordered = self.tracker.assign(skeletons);
                        frames.push(Frame::new(ordered));
                    }
                    Err(e) => {
                        warn!("detection failed at {:.3}s, skipping: {:#}", timestamp, e);
                    }
                },
                Err(e) => {
                    warn!("frame extraction failed at {:.3}s, skipping: {:#}", timestamp, e);
                }
            }

            let progress = (index + 1) as f64 / total_samples as f64;
            let _ = events.send(PipelineEvent::Progress(progress));
        }

        let timeline = Timeline::new(rate as f32, frames);
        let outcome = if timeline.has_any_pose() {
            ProcessOutcome::Complete(timeline)
        } else {
            ProcessOutcome::NoPosesDetected(timeline)
        };

        let _ = events.send(PipelineEvent::VideoDone(outcome.clone()));
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{RawJoint, RawPerson, SourceKind};
    use anyhow::anyhow;
    use opencv::core::Mat;
    use std::collections::HashSet;
    use std::sync::mpsc;

    /// 全関節を同一座標に置いた1人分の生データ
    fn raw_person(x: f32, y: f32) -> RawPerson {
        RawPerson {
            joints: vec![RawJoint { x, y, confidence: 0.9 }; 17],
        }
    }

    /// 固定の長さ・FPSで、指定時刻のフレーム抽出だけ失敗する合成ソース
    struct FakeMedia {
        duration: f64,
        fps: f64,
        fail_at: HashSet<usize>,
        served: usize,
    }

    impl FakeMedia {
        fn new(duration: f64, fps: f64) -> Self {
            Self {
                duration,
                fps,
                fail_at: HashSet::new(),
                served: 0,
            }
        }
    }

    impl MediaSource for FakeMedia {
        fn duration(&self) -> f64 {
            self.duration
        }
        fn native_fps(&self) -> f64 {
            self.fps
        }
        fn resolution(&self) -> (u32, u32) {
            (1920, 1080)
        }
        fn frame_at(&mut self, _timestamp: f64) -> Result<Mat> {
            let index = self.served;
            self.served += 1;
            if self.fail_at.contains(&index) {
                anyhow::bail!("decode error");
            }
            Ok(Mat::default())
        }
    }

    /// 呼び出し回数に応じて台本どおりの検出を返すソース
    struct ScriptedDetector {
        script: Vec<Vec<RawPerson>>,
        calls: usize,
        fail_call: Option<usize>,
    }

    impl ScriptedDetector {
        fn constant(person_count: usize) -> Self {
            let people: Vec<RawPerson> = (0..person_count)
                .map(|i| raw_person(0.2 + 0.3 * i as f32, 0.5))
                .collect();
            Self {
                script: vec![people],
                calls: 0,
                fail_call: None,
            }
        }
    }

    impl LandmarkSource for ScriptedDetector {
        fn source_kind(&self) -> SourceKind {
            SourceKind::Coco17
        }
        fn detect(&mut self, _frame: &Mat) -> Result<Vec<RawPerson>> {
            let call = self.calls;
            self.calls += 1;
            if self.fail_call == Some(call) {
                return Err(anyhow!("inference error"));
            }
            let index = call.min(self.script.len() - 1);
            Ok(self.script[index].clone())
        }
    }

    fn run(
        detector: ScriptedDetector,
        media: &mut FakeMedia,
        target_fps: f64,
    ) -> (ProcessOutcome, Vec<PipelineEvent>) {
        let pipeline_config = PipelineConfig {
            target_fps,
            ..PipelineConfig::default()
        };
        let mut pipeline =
            VideoPipeline::new(detector, &pipeline_config, &TrackerConfig::default());
        let (tx, rx) = mpsc::channel();
        let outcome = pipeline.process(media, &tx).unwrap();
        drop(tx);
        (outcome, rx.into_iter().collect())
    }

    #[test]
    fn test_sampling_rate_is_min_of_native_and_target() {
        // ネイティブ10fpsの2秒動画を30fps目標で処理 → 10fpsで20フレーム
        let mut media = FakeMedia::new(2.0, 10.0);
        let (outcome, _) = run(ScriptedDetector::constant(1), &mut media, 30.0);
        let timeline = outcome.timeline();
        assert_eq!(timeline.len(), 20);
        assert!((timeline.fps - 10.0).abs() < 1e-6);

        // 60fpsソースを30fps目標で → 30fps
        let mut media = FakeMedia::new(1.0, 60.0);
        let (outcome, _) = run(ScriptedDetector::constant(1), &mut media, 30.0);
        assert_eq!(outcome.timeline().len(), 30);
    }

    #[test]
    fn test_deterministic_frame_grid() {
        let mut media_a = FakeMedia::new(3.7, 24.0);
        let mut media_b = FakeMedia::new(3.7, 24.0);
        let (a, _) = run(ScriptedDetector::constant(2), &mut media_a, 30.0);
        let (b, _) = run(ScriptedDetector::constant(2), &mut media_b, 30.0);
        assert_eq!(a.timeline().len(), b.timeline().len());
        let counts = |t: &Timeline| t.frames.iter().map(Frame::person_count).collect::<Vec<_>>();
        assert_eq!(counts(a.timeline()), counts(b.timeline()));
    }

    #[test]
    fn test_extraction_failure_skips_frame_and_continues() {
        let mut media = FakeMedia::new(1.0, 10.0);
        media.fail_at.insert(3);
        media.fail_at.insert(7);
        let (outcome, _) = run(ScriptedDetector::constant(1), &mut media, 30.0);
        // 10時刻中2つスキップ
        assert_eq!(outcome.timeline().len(), 8);
        assert!(matches!(outcome, ProcessOutcome::Complete(_)));
    }

    #[test]
    fn test_detection_failure_skips_frame() {
        let mut media = FakeMedia::new(1.0, 10.0);
        let mut detector = ScriptedDetector::constant(1);
        detector.fail_call = Some(0);
        let (outcome, _) = run(detector, &mut media, 30.0);
        assert_eq!(outcome.timeline().len(), 9);
    }

    #[test]
    fn test_no_poses_detected_outcome() {
        let mut media = FakeMedia::new(1.0, 10.0);
        let (outcome, _) = run(ScriptedDetector::constant(0), &mut media, 30.0);
        assert!(matches!(outcome, ProcessOutcome::NoPosesDetected(_)));
        // タイムライン自体は完全（空フレーム10個）
        assert_eq!(outcome.timeline().len(), 10);
        assert!(!outcome.timeline().has_any_pose());
    }

    #[test]
    fn test_source_without_video_track_is_an_error() {
        // 長さゼロ（動画トラックなし相当）はエラーで、タイムラインも
        // VideoDoneイベントも出さない
        let mut media = FakeMedia::new(0.0, 30.0);
        let mut pipeline = VideoPipeline::new(
            ScriptedDetector::constant(1),
            &PipelineConfig::default(),
            &TrackerConfig::default(),
        );
        let (tx, rx) = mpsc::channel();
        assert!(pipeline.process(&mut media, &tx).is_err());
        drop(tx);
        assert!(
            rx.into_iter().all(|e| !matches!(e, PipelineEvent::VideoDone(_))),
            "a failed run must not report a result"
        );

        // フレームレートゼロも同様
        let mut media = FakeMedia::new(1.0, 0.0);
        let mut pipeline = VideoPipeline::new(
            ScriptedDetector::constant(1),
            &PipelineConfig::default(),
            &TrackerConfig::default(),
        );
        let (tx, _rx) = mpsc::channel();
        assert!(pipeline.process(&mut media, &tx).is_err());
    }

    #[test]
    fn test_progress_reaches_one_and_video_done_emitted() {
        let mut media = FakeMedia::new(1.0, 10.0);
        let (_, events) = run(ScriptedDetector::constant(1), &mut media, 30.0);

        let progress: Vec<f64> = events
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::Progress(p) => Some(*p),
                _ => None,
            })
            .collect();
        assert!(!progress.is_empty());
        assert!(progress.windows(2).all(|w| w[0] <= w[1]), "progress must be monotonic");
        assert!((progress.last().unwrap() - 1.0).abs() < 1e-9);
        assert!(progress.iter().all(|p| (0.0..=1.0).contains(p)));

        assert!(events
            .iter()
            .any(|e| matches!(e, PipelineEvent::VideoDone(_))));
    }

    #[test]
    fn test_two_people_keep_slots() {
        let mut detector = ScriptedDetector::constant(2);
        // 2フレーム目は検出順が入れ替わるが座標はほぼ同じ
        detector.script = vec![
            vec![raw_person(0.2, 0.5), raw_person(0.7, 0.5)],
            vec![raw_person(0.71, 0.5), raw_person(0.21, 0.5)],
        ];
        let mut media = FakeMedia::new(0.2, 10.0);
        let (outcome, _) = run(detector, &mut media, 30.0);

        let timeline = outcome.timeline();
        assert_eq!(timeline.len(), 2);
        let slot0_first = timeline.frames[0].skeletons[0].reference_point().x;
        let slot0_second = timeline.frames[1].skeletons[0].reference_point().x;
        assert!((slot0_first - 0.2).abs() < 0.01);
        assert!((slot0_second - 0.21).abs() < 0.01);
    }
}
