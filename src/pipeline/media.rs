use anyhow::{Context, Result};
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureAPIs},
};
use std::sync::{Arc, Mutex};

use ez_ffmpeg::core::context::null_output::create_null_output;
use ez_ffmpeg::filter::frame_filter::FrameFilter;
use ez_ffmpeg::filter::frame_filter_context::FrameFilterContext;
use ez_ffmpeg::filter::frame_pipeline_builder::FramePipelineBuilder;
use ez_ffmpeg::{AVMediaType, FfmpegContext, Frame, Input};

/// フレームパイプラインが消費するメディア境界
///
/// 動画の長さ・ネイティブFPSの取得と、任意時刻の静止フレーム抽出が
/// できればよい。実装はファイルでもテスト用の合成ソースでもよい。
pub trait MediaSource {
    /// 長さ（秒）
    fn duration(&self) -> f64;
    /// ネイティブフレームレート
    fn native_fps(&self) -> f64;
    /// ソース解像度 (width, height)
    fn resolution(&self) -> (u32, u32);
    /// 指定時刻のデコード済みフレームを返す。失敗はそのフレームのみの
    /// 回復可能なエラーで、呼び出し側は次の時刻へ進む。
    fn frame_at(&mut self, timestamp: f64) -> Result<Mat>;
}

/// OpenCVで開いた動画ファイル
pub struct VideoFileSource {
    capture: VideoCapture,
    duration: f64,
    fps: f64,
    width: u32,
    height: u32,
}

impl VideoFileSource {
    /// 動画ファイルを開く。動画トラックが読めない場合はエラー
    pub fn open(path: &str) -> Result<Self> {
        let capture = VideoCapture::from_file(path, VideoCaptureAPIs::CAP_ANY as i32)
            .with_context(|| format!("Failed to open video: {}", path))?;

        if !capture.is_opened()? {
            anyhow::bail!("No video track in {}", path);
        }

        let fps = capture.get(videoio::CAP_PROP_FPS)?;
        let frame_count = capture.get(videoio::CAP_PROP_FRAME_COUNT)?;
        if fps <= 0.0 || frame_count <= 0.0 {
            anyhow::bail!("No video track in {}", path);
        }

        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;

        Ok(Self {
            capture,
            duration: frame_count / fps,
            fps,
            width,
            height,
        })
    }
}

impl MediaSource for VideoFileSource {
    fn duration(&self) -> f64 {
        self.duration
    }

    fn native_fps(&self) -> f64 {
        self.fps
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn frame_at(&mut self, timestamp: f64) -> Result<Mat> {
        self.capture
            .set(videoio::CAP_PROP_POS_MSEC, timestamp * 1000.0)?;

        let mut frame = Mat::default();
        self.capture
            .read(&mut frame)
            .context("Failed to read frame")?;

        if frame.empty() {
            anyhow::bail!("Empty frame at {:.3}s", timestamp);
        }

        Ok(frame)
    }
}

/// 音声フレームのサンプルを収集するFFmpegフィルタ
///
/// フィルタグラフでflt/monoに揃えた後段に置くため、data[0]を
/// そのままf32列として読める。
#[derive(Clone)]
struct AudioCollector {
    samples: Arc<Mutex<Vec<f32>>>,
}

impl FrameFilter for AudioCollector {
    fn media_type(&self) -> AVMediaType {
        AVMediaType::AVMEDIA_TYPE_AUDIO
    }

    fn filter_frame(
        &mut self,
        frame: Frame,
        _ctx: &FrameFilterContext,
    ) -> Result<Option<Frame>, String> {
        unsafe {
            if frame.as_ptr().is_null() || frame.is_empty() {
                return Ok(None);
            }

            let nb_samples = (*frame.as_ptr()).nb_samples as usize;
            let data = (*frame.as_ptr()).data[0] as *const f32;
            if data.is_null() || nb_samples == 0 {
                return Ok(None);
            }

            let buffer = std::slice::from_raw_parts(data, nb_samples);
            self.samples.lock().unwrap().extend_from_slice(buffer);
        }
        Ok(None)
    }
}

/// メディアファイルの音声トラックをモノラルf32 PCMへデコードする
///
/// 音声トラックがないファイルではエラーになる。呼び出し側
/// （ビート検出）はこれを空トラック扱いに落とす。
pub fn extract_audio_mono(path: &str, sample_rate: u32) -> Result<Vec<f32>> {
    let samples = Arc::new(Mutex::new(Vec::new()));
    let collector = AudioCollector {
        samples: samples.clone(),
    };

    let pipeline: FramePipelineBuilder = AVMediaType::AVMEDIA_TYPE_AUDIO.into();
    let pipeline = pipeline.filter("collect_pcm", Box::new(collector));
    let output = create_null_output().add_frame_pipeline(pipeline);

    let context = FfmpegContext::builder()
        .input(Input::new(path))
        .filter_descs(
            [format!(
                "aresample={},aformat=sample_fmts=flt:channel_layouts=mono",
                sample_rate
            )]
            .into(),
        )
        .output(output)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build audio decode graph: {}", e))?;

    let scheduler = context
        .start()
        .map_err(|e| anyhow::anyhow!("Failed to start audio decode: {}", e))?;
    scheduler
        .wait()
        .map_err(|e| anyhow::anyhow!("Audio decode failed: {}", e))?;

    let samples = Arc::try_unwrap(samples)
        .map(|m| m.into_inner().unwrap_or_default())
        .unwrap_or_else(|arc| arc.lock().unwrap().clone());
    Ok(samples)
}
