use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub beat: BeatConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub live: LiveConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TrackerConfig {
    /// スロットマッチを受け入れる最大距離（表示空間の正規化座標）
    #[serde(default = "default_match_distance")]
    pub match_distance: f32,
    /// 関節を採用する最小信頼度
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
}

fn default_match_distance() -> f32 { 0.3 }
fn default_confidence_threshold() -> f32 { 0.1 }

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            match_distance: default_match_distance(),
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BeatConfig {
    /// デコード後のモノラルサンプルレート (Hz)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// RMS窓サイズ（サンプル数）
    #[serde(default = "default_window")]
    pub window: usize,
    /// 窓の送り幅（サンプル数）
    #[serde(default = "default_hop")]
    pub hop: usize,
    /// 適応閾値の標準偏差係数
    #[serde(default = "default_threshold_sigma")]
    pub threshold_sigma: f32,
    /// ビート間の最小間隔（秒）。220 BPM = 0.27s が最速
    #[serde(default = "default_min_gap")]
    pub min_gap: f64,
    /// BPM推定に使う間隔帯の下限（秒）
    #[serde(default = "default_band_low")]
    pub band_low: f64,
    /// BPM推定に使う間隔帯の上限（秒）
    #[serde(default = "default_band_high")]
    pub band_high: f64,
}

fn default_sample_rate() -> u32 { 44100 }
fn default_window() -> usize { 2048 }
fn default_hop() -> usize { 512 }
fn default_threshold_sigma() -> f32 { 1.5 }
fn default_min_gap() -> f64 { 0.27 }
fn default_band_low() -> f64 { 0.27 }
fn default_band_high() -> f64 { 0.35 }

impl Default for BeatConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            window: default_window(),
            hop: default_hop(),
            threshold_sigma: default_threshold_sigma(),
            min_gap: default_min_gap(),
            band_low: default_band_low(),
            band_high: default_band_high(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    /// サンプリング目標FPS。ソースのネイティブFPSが下回ればそちらを使う
    #[serde(default = "default_target_fps")]
    pub target_fps: f64,
    /// アスペクトフィル表示空間への座標変換を行うか
    #[serde(default)]
    pub apply_aspect_fill: bool,
    /// 表示先の幅（apply_aspect_fill時のみ使用）
    #[serde(default = "default_display_width")]
    pub display_width: f32,
    /// 表示先の高さ（apply_aspect_fill時のみ使用）
    #[serde(default = "default_display_height")]
    pub display_height: f32,
    /// ソース座標原点が左下のときのy反転
    #[serde(default = "default_flip_y")]
    pub flip_y: bool,
}

fn default_target_fps() -> f64 { 30.0 }
fn default_display_width() -> f32 { 1080.0 }
fn default_display_height() -> f32 { 1920.0 }
fn default_flip_y() -> bool { true }

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_fps: default_target_fps(),
            apply_aspect_fill: false,
            display_width: default_display_width(),
            display_height: default_display_height(),
            flip_y: default_flip_y(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LiveConfig {
    /// 検出間の最小間隔（ミリ秒）。これ未満で届いたフレームは捨てる
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    /// カメラインデックス
    #[serde(default)]
    pub camera_index: i32,
}

fn default_min_interval_ms() -> u64 { 70 }

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: default_min_interval_ms(),
            camera_index: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    /// ONNXモデルのパス
    #[serde(default = "default_model_path")]
    pub path: String,
    /// 1フレームで扱う最大人数
    #[serde(default = "default_max_poses")]
    pub max_poses: usize,
    /// 人物検出スコアの下限
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,
}

fn default_model_path() -> String { "movenet_multipose.onnx".to_string() }
fn default_max_poses() -> usize { 6 }
fn default_score_threshold() -> f32 { 0.2 }

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
            max_poses: default_max_poses(),
            score_threshold: default_score_threshold(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// ファイルがなければデフォルト設定を返す
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load(path).unwrap_or_default()
    }
}
