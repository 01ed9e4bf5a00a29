/// 固定窓のRMSエネルギー曲線を計算する
///
/// `window` サンプルの窓を `hop` サンプルずつ進める。44.1kHz・hop512で
/// 約86Hzのフレームレートになる。
pub fn energy_curve(samples: &[f32], window: usize, hop: usize) -> Vec<f32> {
    if samples.len() < window {
        return Vec::new();
    }

    let mut energies = Vec::with_capacity((samples.len() - window) / hop + 1);
    let mut position = 0;
    while position + window <= samples.len() {
        let sum_squares: f32 = samples[position..position + window]
            .iter()
            .map(|s| s * s)
            .sum();
        energies.push((sum_squares / window as f32).sqrt());
        position += hop;
    }
    energies
}

/// オンセット強度: エネルギー一階差分の正側半波整流
///
/// `onset[0]` は常に0。
pub fn onset_strength(energies: &[f32]) -> Vec<f32> {
    if energies.is_empty() {
        return Vec::new();
    }
    let mut onset = Vec::with_capacity(energies.len());
    onset.push(0.0);
    for i in 1..energies.len() {
        onset.push((energies[i] - energies[i - 1]).max(0.0));
    }
    onset
}

/// 信号統計に基づく適応閾値: mean + sigma * stddev
pub fn adaptive_threshold(signal: &[f32], sigma: f32) -> f32 {
    if signal.is_empty() {
        return 0.0;
    }
    let n = signal.len() as f32;
    let mean: f32 = signal.iter().sum::<f32>() / n;
    let variance: f32 = signal.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;
    mean + sigma * variance.sqrt()
}

/// 閾値超えの厳密な局所最大をビート候補として選ぶ
///
/// 直前に採用したインデックスから `min_gap_frames` 以上離れていることを
/// 走査カーソルで強制する（全域の非最大抑制ではない）。
pub fn pick_onsets(onset: &[f32], threshold: f32, min_gap_frames: usize) -> Vec<usize> {
    let mut picked = Vec::new();
    if onset.len() < 3 {
        return picked;
    }

    let mut last_accepted = -(min_gap_frames as i64);
    for i in 1..onset.len() - 1 {
        if onset[i] > threshold
            && onset[i] > onset[i - 1]
            && onset[i] > onset[i + 1]
            && (i as i64 - last_accepted) >= min_gap_frames as i64
        {
            picked.push(i);
            last_accepted = i as i64;
        }
    }
    picked
}
