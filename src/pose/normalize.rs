use super::detector::{RawJoint, RawPerson};
use super::keypoint::{KeypointIndex, Point2d, Skeleton};

/// 関節を採用する最小信頼度のデフォルト値
pub const MIN_JOINT_CONFIDENCE: f32 = 0.1;

/// ランドマークソースの関節セット種別
///
/// ソースごとの関節順を正準17キーポイント順へ引き直すテーブルを選ぶ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// COCO 17キーポイント（MoveNet系）: 恒等マッピング
    Coco17,
    /// MediaPipe BlazePose の33ランドマーク
    BlazePose33,
    /// Apple Vision 系の19ポイント（先頭17が正準順に一致）
    Vision19,
}

/// 正準スロット→ソース側インデックスの対応表
fn remap_table(kind: SourceKind) -> [usize; KeypointIndex::COUNT] {
    match kind {
        SourceKind::Coco17 | SourceKind::Vision19 => {
            [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]
        }
        // nose, eyes(中心), ears, shoulders, elbows, wrists, hips, knees, ankles
        SourceKind::BlazePose33 => {
            [0, 2, 5, 7, 8, 11, 12, 13, 14, 15, 16, 23, 24, 25, 26, 27, 28]
        }
    }
}

/// 1人分の生ランドマークを正準17関節のスケルトンに正規化する
///
/// ソース側インデックスが範囲外、または信頼度が `min_confidence` 未満の
/// 関節はセンチネルになる。常に17要素を返し、エラーにはならない。
pub fn normalize(raw: &RawPerson, kind: SourceKind, min_confidence: f32) -> Skeleton {
    let table = remap_table(kind);
    let mut points = [Point2d::SENTINEL; KeypointIndex::COUNT];

    for (slot, &source_index) in table.iter().enumerate() {
        let Some(joint) = raw.joints.get(source_index) else {
            continue;
        };
        if joint.confidence < min_confidence {
            continue;
        }
        points[slot] = Point2d::new(joint.x, joint.y);
    }

    Skeleton::new(points)
}

/// フレーム内の全員を正規化する
pub fn normalize_all(raw: &[RawPerson], kind: SourceKind, min_confidence: f32) -> Vec<Skeleton> {
    raw.iter().map(|p| normalize(p, kind, min_confidence)).collect()
}

/// テスト用の生関節リスト生成ヘルパ
#[cfg(test)]
pub(crate) fn person_of(joints: Vec<(f32, f32, f32)>) -> RawPerson {
    RawPerson {
        joints: joints
            .into_iter()
            .map(|(x, y, confidence)| RawJoint { x, y, confidence })
            .collect(),
    }
}
