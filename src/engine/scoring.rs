use crate::session::result::PerformanceRecord;

pub const DEFAULT_BASE_POINTS: u64 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComboTier {
    pub threshold: u32,
    pub multiplier: u32,
}

/// Ascending combo thresholds. Below the first tier the multiplier is 1x.
pub const COMBO_TIERS: &[ComboTier] = &[
    ComboTier { threshold: 10, multiplier: 2 },
    ComboTier { threshold: 25, multiplier: 3 },
    ComboTier { threshold: 50, multiplier: 4 },
    ComboTier { threshold: 100, multiplier: 5 },
];

/// 0 below the first tier, otherwise the 1-based index of the highest tier reached.
pub fn combo_level(combo: u32) -> u8 {
    COMBO_TIERS
        .iter()
        .take_while(|tier| combo >= tier.threshold)
        .count() as u8
}

pub fn multiplier_for_combo(combo: u32) -> u32 {
    match combo_level(combo) {
        0 => 1,
        level => COMBO_TIERS[level as usize - 1].multiplier,
    }
}

/// The tier whose threshold is exactly `combo`, i.e. the one just crossed.
pub fn tier_crossed(combo: u32) -> Option<(u8, ComboTier)> {
    COMBO_TIERS
        .iter()
        .position(|tier| tier.threshold == combo)
        .map(|idx| (idx as u8 + 1, COMBO_TIERS[idx]))
}

/// Saturates instead of overflowing; `base_points` comes from user config.
pub fn keystroke_points(base_points: u64, combo: u32) -> u64 {
    base_points.saturating_mul(multiplier_for_combo(combo) as u64)
}

pub fn star_rating(record: &PerformanceRecord) -> u8 {
    let (accuracy, wpm) = (record.accuracy, record.wpm);
    if accuracy >= 95.0 && wpm >= 40.0 {
        3
    } else if accuracy >= 90.0 && wpm >= 30.0 {
        2
    } else if accuracy >= 80.0 {
        1
    } else {
        0
    }
}
