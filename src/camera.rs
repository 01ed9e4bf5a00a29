use anyhow::{Context, Result};
use log::{info, warn};
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureAPIs},
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::config::LiveConfig;

/// OpenCVで開いたライブカメラ
pub struct Camera {
    capture: VideoCapture,
    width: u32,
    height: u32,
}

impl Camera {
    pub fn open(index: i32) -> Result<Self> {
        let mut capture = VideoCapture::new(index, VideoCaptureAPIs::CAP_ANY as i32)
            .context("Failed to open camera")?;

        if !capture.is_opened()? {
            anyhow::bail!("Camera {} is not available", index);
        }

        // 古いフレームを溜めない。間引きはセッション側の責務
        capture.set(videoio::CAP_PROP_BUFFERSIZE, 1.0)?;

        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;
        info!("camera {} opened at {}x{}", index, width, height);

        Ok(Self {
            capture,
            width,
            height,
        })
    }

    pub fn from_config(config: &LiveConfig) -> Result<Self> {
        Self::open(config.camera_index)
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// フレームを読み込む（BGR形式）
    pub fn read_frame(&mut self) -> Result<Mat> {
        let mut frame = Mat::default();
        self.capture
            .read(&mut frame)
            .context("Failed to read frame")?;

        if frame.empty() {
            anyhow::bail!("Empty frame received");
        }

        Ok(frame)
    }
}

/// 別スレッドでキャプチャし続け、常に最新フレームだけを保持するカメラ
///
/// 推論側は都合のよいタイミングで `latest_frame` を読む。読まれなかった
/// フレームは上書きされて消える。drop時にキャプチャスレッドを止める。
pub struct ThreadedCamera {
    latest: Arc<Mutex<Option<Mat>>>,
    frame_id: Arc<AtomicU64>,
    stop: Arc<AtomicBool>,
    width: u32,
    height: u32,
    handle: Option<thread::JoinHandle<()>>,
}

impl ThreadedCamera {
    pub fn start(index: i32) -> Result<Self> {
        let mut camera = Camera::open(index)?;
        let (width, height) = camera.resolution();

        let latest = Arc::new(Mutex::new(None::<Mat>));
        let frame_id = Arc::new(AtomicU64::new(0));
        let stop = Arc::new(AtomicBool::new(false));

        let latest_ref = latest.clone();
        let frame_id_ref = frame_id.clone();
        let stop_ref = stop.clone();

        let handle = thread::spawn(move || {
            while !stop_ref.load(Ordering::Relaxed) {
                match camera.read_frame() {
                    Ok(frame) => {
                        *latest_ref.lock().unwrap() = Some(frame);
                        frame_id_ref.fetch_add(1, Ordering::Release);
                    }
                    Err(e) => {
                        warn!("camera read failed: {:#}", e);
                        thread::sleep(Duration::from_millis(50));
                    }
                }
            }
        });

        Ok(Self {
            latest,
            frame_id,
            stop,
            width,
            height,
            handle: Some(handle),
        })
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// 到着済みフレーム数。新フレームごとにインクリメントされる
    pub fn frame_id(&self) -> u64 {
        self.frame_id.load(Ordering::Acquire)
    }

    /// 最新フレームのコピーを返す。初回フレーム到着前のみNone
    pub fn latest_frame(&self) -> Option<Mat> {
        self.latest.lock().unwrap().clone()
    }
}

impl Drop for ThreadedCamera {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
