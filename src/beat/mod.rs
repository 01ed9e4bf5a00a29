pub mod bpm;
pub mod onset;

use log::{debug, warn};

use crate::config::BeatConfig;
use crate::pipeline::media::extract_audio_mono;

pub use bpm::estimate_bpm;
pub use onset::{adaptive_threshold, energy_curve, onset_strength, pick_onsets};

/// 検出したビート時刻列と推定BPM
///
/// 音源1本につき1回計算され、以後は不変。`bpm == 0.0` は「テンポ不明」を
/// 意味し、利用側はこれで割ってはいけない。
#[derive(Debug, Clone, PartialEq)]
pub struct BeatTrack {
    /// ビート時刻（秒）昇順
    pub beats: Vec<f64>,
    pub bpm: f64,
}

impl BeatTrack {
    pub fn empty() -> Self {
        Self {
            beats: Vec::new(),
            bpm: 0.0,
        }
    }

    pub fn len(&self) -> usize {
        self.beats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beats.is_empty()
    }
}

/// モノラルPCMからビートを検出する
///
/// エネルギー曲線 → オンセット強度 → 適応閾値 → 最小間隔付きピーク選択
/// → テンポ帯ベースのBPM推定。音が短すぎる・無音などで曲線が立たない
/// 場合は空のBeatTrackを返す（エラーではない）。
pub fn detect_beats(samples: &[f32], sample_rate: u32, config: &BeatConfig) -> BeatTrack {
    let energies = energy_curve(samples, config.window, config.hop);
    if energies.len() <= 1 {
        return BeatTrack::empty();
    }

    let onset = onset_strength(&energies);
    let threshold = adaptive_threshold(&onset, config.threshold_sigma);

    // 最速テンポの1拍分をオンセットフレーム数に換算
    let min_gap_frames = (config.min_gap * sample_rate as f64 / config.hop as f64) as usize;

    let beats: Vec<f64> = pick_onsets(&onset, threshold, min_gap_frames)
        .into_iter()
        .map(|i| (i * config.hop) as f64 / sample_rate as f64)
        .collect();

    let bpm = estimate_bpm(&beats, config.band_low, config.band_high);
    debug!("detected {} beats, bpm {:.1}", beats.len(), bpm);

    BeatTrack { beats, bpm }
}

/// メディアファイルの音声トラックからビートを検出する
///
/// 音声トラックがない・デコードできない場合は空のBeatTrackに落とす。
/// 映像処理とは独立に動くため、失敗しても全体を止めない。
pub fn detect_beats_in_media(path: &str, config: &BeatConfig) -> BeatTrack {
    match extract_audio_mono(path, config.sample_rate) {
        Ok(samples) if !samples.is_empty() => {
            debug!("extracted {} audio samples from {}", samples.len(), path);
            detect_beats(&samples, config.sample_rate, config)
        }
        Ok(_) => {
            warn!("no audio samples in {}", path);
            BeatTrack::empty()
        }
        Err(e) => {
            warn!("audio decode failed for {}: {:#}", path, e);
            BeatTrack::empty()
        }
    }
}
