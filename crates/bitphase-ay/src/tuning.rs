//! Tuning tables.
//!
//! Periods follow `clock / (16 * f)`. Every note table index resolves to the
//! equal-tempered scale at A4 = 440 Hz; the index is still stored on songs so
//! imported modules keep it.

use bitphase_common::TuningRequest;

use crate::note::NOTE_COUNT;

/// Reference pitch of A-4.
pub const A4_FREQUENCY: f64 = 440.0;

/// Tuning table index of A-4 (C-1 = 0).
const A4_INDEX: i32 = 45;

/// Largest tone period the chip accepts.
pub const MAX_TONE_PERIOD: u16 = 0x0FFF;

/// Equal-tempered tone periods for `chip_frequency`, C-1 through B-8.
pub fn equal_tempered_table(chip_frequency: u32) -> Vec<u16> {
    (0..NOTE_COUNT as i32)
        .map(|index| {
            let freq = A4_FREQUENCY * 2f64.powf(f64::from(index - A4_INDEX) / 12.0);
            let period = (f64::from(chip_frequency) / (16.0 * freq)).round();
            period.clamp(1.0, f64::from(MAX_TONE_PERIOD)) as u16
        })
        .collect()
}

/// Resolves the tuning table for a song configuration.
pub fn resolve_tuning_table(request: &TuningRequest) -> Vec<u16> {
    equal_tempered_table(request.chip_frequency)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitphase_chip::DEFAULT_CHIP_CLOCK;

    #[test]
    fn a4_matches_reference() {
        let table = equal_tempered_table(DEFAULT_CHIP_CLOCK);
        assert_eq!(table.len(), NOTE_COUNT);
        // 1773400 / (16 * 440) = 251.9
        assert_eq!(table[A4_INDEX as usize], 252);
    }

    #[test]
    fn periods_fall_with_pitch() {
        let table = equal_tempered_table(DEFAULT_CHIP_CLOCK);
        assert!(table.windows(2).all(|w| w[0] >= w[1]));
        assert!(table[0] <= MAX_TONE_PERIOD);
    }
}
