use anyhow::{bail, Result};
use std::fs;
use std::path::Path;
use std::sync::mpsc;
use std::thread;

use dance_tracker::beat::detect_beats_in_media;
use dance_tracker::config::Config;
use dance_tracker::pipeline::{PipelineEvent, ProcessOutcome, VideoFileSource, VideoPipeline};
use dance_tracker::pose::MoveNetDetector;
use dance_tracker::timeline::Recording;

const CONFIG_PATH: &str = "config.toml";

fn main() -> Result<()> {
    env_logger::init();
    let config = Config::load_or_default(CONFIG_PATH);

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: process_video <video_path> [recording_name]");
        std::process::exit(1);
    }
    let video_path = args[1].clone();
    let name = args
        .get(2)
        .cloned()
        .unwrap_or_else(|| stem_of(&video_path));

    println!("=== Dance Tracker ({}) ===", env!("GIT_VERSION"));
    println!("入力: {}", video_path);
    println!("モデル: {}", config.model.path);
    println!();

    let (tx, rx) = mpsc::channel::<PipelineEvent>();

    // 音声解析は映像処理と独立に走る
    let beat_tx = tx.clone();
    let beat_path = video_path.clone();
    let beat_config = config.beat.clone();
    let beat_handle = thread::spawn(move || {
        let track = detect_beats_in_media(&beat_path, &beat_config);
        let _ = beat_tx.send(PipelineEvent::BeatsDone(track));
    });

    let video_handle = thread::spawn(move || -> Result<()> {
        let mut source = VideoFileSource::open(&video_path)?;
        let detector = MoveNetDetector::new(
            &config.model.path,
            config.model.max_poses,
            config.model.score_threshold,
        )?;
        let mut pipeline = VideoPipeline::new(detector, &config.pipeline, &config.tracker);
        pipeline.process(&mut source, &tx)?;
        Ok(())
    });

    let mut outcome = None;
    let mut beats = None;
    let mut last_decile = 0;

    for event in rx {
        match event {
            PipelineEvent::Progress(p) => {
                let decile = (p * 10.0) as u32;
                if decile > last_decile {
                    last_decile = decile;
                    println!("  映像処理 {}%", decile * 10);
                }
            }
            PipelineEvent::VideoDone(o) => {
                outcome = Some(o);
            }
            PipelineEvent::BeatsDone(track) => {
                if track.is_empty() {
                    println!("ビート: 検出なし（音声トラックなし、または無音）");
                } else {
                    println!("ビート: {}個, {:.1} BPM", track.len(), track.bpm);
                    let preview: Vec<String> = track
                        .beats
                        .iter()
                        .take(8)
                        .map(|t| format!("{:.2}", t))
                        .collect();
                    println!("  先頭8拍: [{}]", preview.join(", "));
                }
                beats = Some(track);
            }
        }
        if outcome.is_some() && beats.is_some() {
            break;
        }
    }

    video_handle.join().expect("video thread panicked")?;
    beat_handle.join().expect("beat thread panicked");

    match outcome {
        Some(ProcessOutcome::Complete(timeline)) => {
            println!();
            println!(
                "完了: {}フレーム @ {:.1}fps",
                timeline.len(),
                timeline.fps
            );

            let recording = Recording::new(&name, timeline);
            let out_path = format!("{}.json", name);
            let json = serde_json::to_string_pretty(&recording)?;
            fs::write(&out_path, json)?;
            println!("保存しました: {}", out_path);
        }
        Some(ProcessOutcome::NoPosesDetected(timeline)) => {
            println!();
            println!(
                "処理は完了しましたが、{}フレーム中1人も検出できませんでした。",
                timeline.len()
            );
            println!("人物の全身が映っている動画で試してください。");
        }
        None => bail!("video processing ended without a result"),
    }

    Ok(())
}

fn stem_of(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "recording".to_string())
}
