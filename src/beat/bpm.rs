/// ビート時刻列からBPMを推定する
///
/// 連続ビート間隔のうち目標テンポ帯 `[band_low, band_high]`（秒）に
/// 収まるものの平均から求める。帯内の間隔が1つもなければ全間隔の
/// 中央値にフォールバックする。ビートが2個未満なら0。
pub fn estimate_bpm(beats: &[f64], band_low: f64, band_high: f64) -> f64 {
    if beats.len() < 2 {
        return 0.0;
    }

    let intervals: Vec<f64> = beats.windows(2).map(|w| w[1] - w[0]).collect();

    let in_band: Vec<f64> = intervals
        .iter()
        .copied()
        .filter(|i| *i >= band_low && *i <= band_high)
        .collect();

    if !in_band.is_empty() {
        let mean = in_band.iter().sum::<f64>() / in_band.len() as f64;
        return 60.0 / mean;
    }

    let mut sorted = intervals;
    sorted.sort_by(f64::total_cmp);
    let median = sorted[sorted.len() / 2];
    60.0 / median
}
