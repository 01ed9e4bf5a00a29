/// 再生時刻を8カウント（1〜8の繰り返し）上の位置に対応付ける
///
/// `current_time` 以前のビート数を数え、ゼロなら0、それ以外は
/// `((count - 1) % 8) + 1`。時刻とビート列だけの純関数。
pub fn beat_number(beats: &[f64], current_time: f64) -> u32 {
    let count = beats.iter().filter(|b| **b <= current_time).count();
    if count == 0 {
        0
    } else {
        ((count - 1) % 8 + 1) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_before_first_beat_is_zero() {
        assert_eq!(beat_number(&[1.0, 1.5], 0.5), 0);
        assert_eq!(beat_number(&[], 10.0), 0);
    }

    #[test]
    fn test_count_wraps_every_eight() {
        let beats: Vec<f64> = (0..16).map(|i| i as f64 * 0.5).collect();
        assert_eq!(beat_number(&beats, 0.0), 1);
        assert_eq!(beat_number(&beats, 3.5), 8);
        assert_eq!(beat_number(&beats, 4.0), 1);
        assert_eq!(beat_number(&beats, 7.5), 8);
    }

    #[test]
    fn test_nine_beats_wraps_to_one() {
        let beats = [0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0, 4.8];
        // 4.2以前のビートは9個 → ((9 - 1) % 8) + 1 = 1
        assert_eq!(beat_number(&beats, 4.2), 1);
    }

    #[test]
    fn test_beat_exactly_at_current_time_counts() {
        let beats = [1.0, 2.0, 3.0];
        assert_eq!(beat_number(&beats, 2.0), 2);
    }
}
