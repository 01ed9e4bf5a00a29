use serde::{Deserialize, Serialize};

/// 正規化画像座標 (0.0〜1.0) 上の1点
///
/// 未検出の関節はセンチネル値 (-1, -1) で表す
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2d {
    pub x: f32,
    pub y: f32,
}

impl Point2d {
    /// 未検出を表すセンチネル
    pub const SENTINEL: Point2d = Point2d { x: -1.0, y: -1.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// 検出済みの座標か（センチネルでないか）
    pub fn is_valid(&self) -> bool {
        self.x >= 0.0 && self.y >= 0.0
    }

    /// 2点間のユークリッド距離
    pub fn distance(&self, other: &Point2d) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// ピクセル座標に変換
    pub fn to_pixel(&self, width: u32, height: u32) -> (i32, i32) {
        let px = (self.x * width as f32) as i32;
        let py = (self.y * height as f32) as i32;
        (px, py)
    }
}

impl Default for Point2d {
    fn default() -> Self {
        Self::SENTINEL
    }
}

/// 正準17キーポイントのインデックス (COCO順)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum KeypointIndex {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl KeypointIndex {
    pub const COUNT: usize = 17;

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Nose),
            1 => Some(Self::LeftEye),
            2 => Some(Self::RightEye),
            3 => Some(Self::LeftEar),
            4 => Some(Self::RightEar),
            5 => Some(Self::LeftShoulder),
            6 => Some(Self::RightShoulder),
            7 => Some(Self::LeftElbow),
            8 => Some(Self::RightElbow),
            9 => Some(Self::LeftWrist),
            10 => Some(Self::RightWrist),
            11 => Some(Self::LeftHip),
            12 => Some(Self::RightHip),
            13 => Some(Self::LeftKnee),
            14 => Some(Self::RightKnee),
            15 => Some(Self::LeftAnkle),
            16 => Some(Self::RightAnkle),
            _ => None,
        }
    }
}

/// 1人分の姿勢: 正準順の17キーポイント
///
/// 長さは常に17。未解決の関節はセンチネルで埋まり、省略されることはない。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skeleton {
    pub points: [Point2d; KeypointIndex::COUNT],
}

impl Skeleton {
    pub fn new(points: [Point2d; KeypointIndex::COUNT]) -> Self {
        Self { points }
    }

    /// 全関節がセンチネルのスケルトン
    pub fn empty() -> Self {
        Self {
            points: [Point2d::SENTINEL; KeypointIndex::COUNT],
        }
    }

    pub fn get(&self, index: KeypointIndex) -> Point2d {
        self.points[index as usize]
    }

    /// 検出済み関節の数
    pub fn valid_count(&self) -> usize {
        self.points.iter().filter(|p| p.is_valid()).count()
    }

    /// トラッキング用の基準点
    ///
    /// 優先順: 両腰の中点 → 有効な片腰 → 鼻 → 最初の有効関節 → 画面中央
    pub fn reference_point(&self) -> Point2d {
        let left_hip = self.get(KeypointIndex::LeftHip);
        let right_hip = self.get(KeypointIndex::RightHip);

        if left_hip.is_valid() && right_hip.is_valid() {
            return Point2d::new(
                (left_hip.x + right_hip.x) / 2.0,
                (left_hip.y + right_hip.y) / 2.0,
            );
        }
        if left_hip.is_valid() {
            return left_hip;
        }
        if right_hip.is_valid() {
            return right_hip;
        }

        let nose = self.get(KeypointIndex::Nose);
        if nose.is_valid() {
            return nose;
        }

        self.points
            .iter()
            .copied()
            .find(Point2d::is_valid)
            .unwrap_or(Point2d::new(0.5, 0.5))
    }
}

impl Default for Skeleton {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypoint_index_count() {
        assert_eq!(KeypointIndex::COUNT, 17);
    }

    #[test]
    fn test_keypoint_index_from_index() {
        assert_eq!(KeypointIndex::from_index(0), Some(KeypointIndex::Nose));
        assert_eq!(KeypointIndex::from_index(16), Some(KeypointIndex::RightAnkle));
        assert_eq!(KeypointIndex::from_index(17), None);
    }

    #[test]
    fn test_sentinel_is_invalid() {
        assert!(!Point2d::SENTINEL.is_valid());
        assert!(Point2d::new(0.0, 0.0).is_valid());
        assert!(Point2d::new(0.5, 0.99).is_valid());
    }

    #[test]
    fn test_point_distance() {
        let a = Point2d::new(0.0, 0.0);
        let b = Point2d::new(0.3, 0.4);
        assert!((a.distance(&b) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_point_to_pixel() {
        let p = Point2d::new(0.5, 0.25);
        assert_eq!(p.to_pixel(640, 480), (320, 120));
    }

    #[test]
    fn test_reference_point_hip_midpoint() {
        let mut skeleton = Skeleton::empty();
        skeleton.points[KeypointIndex::LeftHip as usize] = Point2d::new(0.4, 0.5);
        skeleton.points[KeypointIndex::RightHip as usize] = Point2d::new(0.6, 0.5);
        let r = skeleton.reference_point();
        assert!((r.x - 0.5).abs() < 1e-6);
        assert!((r.y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_reference_point_single_hip() {
        let mut skeleton = Skeleton::empty();
        skeleton.points[KeypointIndex::RightHip as usize] = Point2d::new(0.7, 0.6);
        let r = skeleton.reference_point();
        assert_eq!(r, Point2d::new(0.7, 0.6));
    }

    #[test]
    fn test_reference_point_nose_fallback() {
        let mut skeleton = Skeleton::empty();
        skeleton.points[KeypointIndex::Nose as usize] = Point2d::new(0.5, 0.2);
        skeleton.points[KeypointIndex::LeftWrist as usize] = Point2d::new(0.1, 0.4);
        let r = skeleton.reference_point();
        assert_eq!(r, Point2d::new(0.5, 0.2));
    }

    #[test]
    fn test_reference_point_first_valid_joint() {
        let mut skeleton = Skeleton::empty();
        skeleton.points[KeypointIndex::LeftWrist as usize] = Point2d::new(0.1, 0.4);
        let r = skeleton.reference_point();
        assert_eq!(r, Point2d::new(0.1, 0.4));
    }

    #[test]
    fn test_reference_point_all_missing_is_center() {
        let skeleton = Skeleton::empty();
        assert_eq!(skeleton.reference_point(), Point2d::new(0.5, 0.5));
    }

    #[test]
    fn test_valid_count() {
        let mut skeleton = Skeleton::empty();
        assert_eq!(skeleton.valid_count(), 0);
        skeleton.points[0] = Point2d::new(0.5, 0.5);
        skeleton.points[5] = Point2d::new(0.4, 0.3);
        assert_eq!(skeleton.valid_count(), 2);
    }
}
