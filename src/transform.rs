use crate::pose::{Point2d, Skeleton};

/// アスペクトフィル表示への座標変換
///
/// ソースフレームと表示先のアスペクト比が異なる「fill & crop」表示では、
/// ソース正規化座標のまま比較や描画を行うと閾値（トラッカーのマッチ距離
/// など、表示空間で定義される）がずれる。表示前・トラッキング前に
/// 表示空間の正規化座標へ引き直す。
///
/// ソース座標の原点が左下のランドマークソース向けに y反転も行う。
#[derive(Debug, Clone, Copy)]
pub struct AspectFillMap {
    source_aspect: f32,
    display_aspect: f32,
    flip_y: bool,
}

impl AspectFillMap {
    pub fn new(
        source_width: f32,
        source_height: f32,
        display_width: f32,
        display_height: f32,
        flip_y: bool,
    ) -> Self {
        Self {
            source_aspect: source_width / source_height,
            display_aspect: display_width / display_height,
            flip_y,
        }
    }

    /// 1点を表示空間へ変換する。センチネルはそのまま通す。
    pub fn apply(&self, point: Point2d) -> Point2d {
        if !point.is_valid() {
            return point;
        }

        let x = point.x;
        let y = if self.flip_y { 1.0 - point.y } else { point.y };

        if self.source_aspect > self.display_aspect {
            // ソースの方が横長: 左右が切れる
            let visible_width = self.display_aspect / self.source_aspect;
            let crop_margin = (1.0 - visible_width) / 2.0;
            Point2d::new((x - crop_margin) / visible_width, y)
        } else {
            // ソースの方が縦長: 上下が切れる
            let visible_height = self.source_aspect / self.display_aspect;
            let crop_margin = (1.0 - visible_height) / 2.0;
            Point2d::new(x, (y - crop_margin) / visible_height)
        }
    }

    /// スケルトン全関節を変換する
    pub fn apply_skeleton(&self, skeleton: &Skeleton) -> Skeleton {
        let mut out = skeleton.clone();
        for p in out.points.iter_mut() {
            *p = self.apply(*p);
        }
        out
    }
}
