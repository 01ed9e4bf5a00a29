use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pose::Skeleton;

/// サンプリングした1時刻分の検出結果
///
/// インデックスがトラックスロット（0 = 最初のID、1 = 2人目…）に対応する。
/// 誰も映っていないフレームは空になる。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub skeletons: Vec<Skeleton>,
}

impl Frame {
    pub fn new(skeletons: Vec<Skeleton>) -> Self {
        Self { skeletons }
    }

    pub fn is_empty(&self) -> bool {
        self.skeletons.is_empty()
    }

    pub fn person_count(&self) -> usize {
        self.skeletons.len()
    }
}

/// 処理済み動画・録画1本分のキーポイント時系列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    /// サンプリングに使ったフレームレート（再生側の時刻計算に使う）
    pub fps: f32,
    pub frames: Vec<Frame>,
}

impl Timeline {
    pub fn new(fps: f32, frames: Vec<Frame>) -> Self {
        Self { fps, frames }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// 1フレームでも誰かが検出されているか
    pub fn has_any_pose(&self) -> bool {
        self.frames.iter().any(|f| !f.is_empty())
    }

    /// フレーム番号から再生時刻（秒）
    pub fn time_at(&self, frame_index: usize) -> f64 {
        frame_index as f64 / self.fps as f64
    }

    /// 先頭スロットの人だけ残したタイムライン（ソロ表示モード）
    pub fn first_person_only(&self) -> Timeline {
        let frames = self
            .frames
            .iter()
            .map(|f| {
                if f.is_empty() {
                    Frame::default()
                } else {
                    Frame::new(vec![f.skeletons[0].clone()])
                }
            })
            .collect();
        Timeline::new(self.fps, frames)
    }
}

/// ストレージへ渡す録画コンテナ
///
/// 永続化形式・一覧・削除はストレージ側の責務。ここでは名前付きの
/// シリアライズ可能なタイムラインであること以上は求めない。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub timeline: Timeline,
}

impl Recording {
    pub fn new(name: impl Into<String>, timeline: Timeline) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            created_at: Utc::now(),
            timeline,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.timeline.len()
    }
}
