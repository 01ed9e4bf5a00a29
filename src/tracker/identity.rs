use crate::config::TrackerConfig;
use crate::pose::{Point2d, Skeleton};

/// トラッキングを諦めるマッチ距離のデフォルト値（正規化座標）
pub const DEFAULT_MATCH_DISTANCE: f32 = 0.3;

/// 複数人のスロットIDを安定させるトラッカー
///
/// 同一人物がフレームをまたいで同じスロット（＝同じ色）を保つように
/// 検出結果を並べ替える。状態は1セッション（録画または動画1本）に
/// 閉じており、セッション開始時に `reset` する。
pub struct IdentityTracker {
    match_distance: f32,
    /// 前フレームでスロット順に採用した基準点
    prev_refs: Vec<Point2d>,
}

impl IdentityTracker {
    pub fn new(match_distance: f32) -> Self {
        Self {
            match_distance,
            prev_refs: Vec::new(),
        }
    }

    pub fn from_config(config: &TrackerConfig) -> Self {
        Self::new(config.match_distance)
    }

    /// セッション開始時に呼ぶ。前フレーム状態を破棄する。
    pub fn reset(&mut self) {
        self.prev_refs.clear();
    }

    /// 1フレーム分の検出をスロット順に並べ替える
    ///
    /// - 初回フレーム、または検出が1人以下なら基準点のx座標で左→右に並べる
    /// - それ以外は前フレームの各スロット（元の順）に最近傍の未割当検出を
    ///   貪欲にマッチさせる。距離が閾値以上なら不成立
    /// - マッチしなかった旧スロットは消え、余った検出は左→右順で末尾に付く
    /// - 検出ゼロのフレームでは状態を更新しない（映像から一瞬消えた人が
    ///   戻ったときに再マッチできるよう、前回の基準点を保持する）
    pub fn assign(&mut self, detections: Vec<Skeleton>) -> Vec<Skeleton> {
        if detections.is_empty() {
            return Vec::new();
        }

        let mut tagged: Vec<(Skeleton, Point2d)> = detections
            .into_iter()
            .map(|s| {
                let r = s.reference_point();
                (s, r)
            })
            .collect();

        let ordered: Vec<(Skeleton, Point2d)> = if self.prev_refs.is_empty() || tagged.len() == 1 {
            sort_left_to_right(&mut tagged);
            tagged
        } else {
            let mut matched: Vec<(Skeleton, Point2d)> = Vec::with_capacity(tagged.len());

            for prev in &self.prev_refs {
                if tagged.is_empty() {
                    break;
                }

                let mut closest_index = 0;
                let mut closest_distance = f32::INFINITY;
                for (index, (_, r)) in tagged.iter().enumerate() {
                    let d = r.distance(prev);
                    if d < closest_distance {
                        closest_distance = d;
                        closest_index = index;
                    }
                }

                if closest_distance < self.match_distance {
                    matched.push(tagged.remove(closest_index));
                }
            }

            // 新規に現れた人は左→右順で新スロットに入る
            sort_left_to_right(&mut tagged);
            matched.extend(tagged);
            matched
        };

        self.prev_refs = ordered.iter().map(|(_, r)| *r).collect();
        ordered.into_iter().map(|(s, _)| s).collect()
    }
}

fn sort_left_to_right(poses: &mut [(Skeleton, Point2d)]) {
    poses.sort_by(|a, b| a.1.x.total_cmp(&b.1.x));
}
