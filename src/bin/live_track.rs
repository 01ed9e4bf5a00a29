use anyhow::Result;
use std::fs;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use dance_tracker::camera::ThreadedCamera;
use dance_tracker::config::Config;
use dance_tracker::pipeline::LiveSession;
use dance_tracker::pose::{normalize_all, LandmarkSource, MoveNetDetector};
use dance_tracker::timeline::Recording;

const CONFIG_PATH: &str = "config.toml";

fn main() -> Result<()> {
    env_logger::init();
    let config = Config::load_or_default(CONFIG_PATH);

    println!("=== Dance Tracker - Live ({}) ===", env!("GIT_VERSION"));
    println!("カメラ: index {}", config.live.camera_index);
    println!("検出間隔: {}ms以上", config.live.min_interval_ms);
    println!();
    println!("コマンド:");
    println!("  r             - 録画開始");
    println!("  s [name]      - 録画停止して保存");
    println!("  q             - 終了");
    println!();

    let camera = ThreadedCamera::start(config.live.camera_index)?;
    let mut detector = MoveNetDetector::new(
        &config.model.path,
        config.model.max_poses,
        config.model.score_threshold,
    )?;

    let session = Arc::new(Mutex::new(LiveSession::new(&config.live, &config.tracker)));
    let stop = Arc::new(AtomicBool::new(false));

    // 検出ループ: 最新フレームだけを見る。間引きはセッションが判断する
    let session_ref = session.clone();
    let stop_ref = stop.clone();
    let min_confidence = config.tracker.confidence_threshold;
    let detect_handle = thread::spawn(move || {
        let mut last_frame_id = 0u64;
        while !stop_ref.load(Ordering::Relaxed) {
            let frame_id = camera.frame_id();
            if frame_id == last_frame_id {
                thread::sleep(Duration::from_millis(5));
                continue;
            }

            let sample = session_ref.lock().unwrap().should_sample(Instant::now());
            if !sample {
                last_frame_id = frame_id;
                continue;
            }

            let Some(frame) = camera.latest_frame() else {
                continue;
            };
            last_frame_id = frame_id;

            match detector.detect(&frame) {
                Ok(raw) => {
                    let skeletons = normalize_all(&raw, detector.source_kind(), min_confidence);
                    session_ref.lock().unwrap().push(skeletons);
                }
                Err(e) => {
                    eprintln!("検出エラー: {:#}", e);
                }
            }
        }
    });

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let parts: Vec<&str> = input.trim().split_whitespace().collect();

        if parts.is_empty() {
            continue;
        }

        match parts[0] {
            "r" => {
                session.lock().unwrap().start_recording(Instant::now());
                println!("録画開始");
            }
            "s" => {
                let timeline = session.lock().unwrap().stop_recording(Instant::now());
                match timeline {
                    Some(timeline) => {
                        let name = parts.get(1).copied().unwrap_or("live").to_string();
                        println!(
                            "録画終了: {}フレーム @ {:.1}fps",
                            timeline.len(),
                            timeline.fps
                        );
                        let recording = Recording::new(&name, timeline);
                        let out_path = format!("{}.json", name);
                        fs::write(&out_path, serde_json::to_string_pretty(&recording)?)?;
                        println!("保存しました: {}", out_path);
                    }
                    None => {
                        println!("録画フレームがありません");
                    }
                }
            }
            "q" => {
                println!("終了します");
                break;
            }
            _ => {
                println!("不明なコマンド: {}", parts[0]);
            }
        }
    }

    stop.store(true, Ordering::Relaxed);
    detect_handle.join().expect("detect thread panicked");
    Ok(())
}
