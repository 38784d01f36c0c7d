//! Exponential recency weighting
//!
//! Older matches contribute less to the accumulated statistics. Weights are
//! measured against January 1st of the year after the last processed year.

use chrono::NaiveDate;

/// Decay time constant in days
const DECAY_DAYS: f64 = 365.0 * 3.0;

/// Recency weight for a match played on `match_date`.
///
/// `sign = 1.0` decays into the past: a match on the reference date weighs 1,
/// a match three years earlier weighs 1/e.
pub fn weight(base_year: i32, match_date: NaiveDate, sign: f64) -> f64 {
    let reference = NaiveDate::from_ymd_opt(base_year + 1, 1, 1).unwrap_or(NaiveDate::MAX);
    let days = (reference - match_date).num_days() as f64;
    (-sign * days / DECAY_DAYS).exp()
}

/// Integer increments applied to the stores for one match
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateWeights {
    /// base_weight * time weight, before rounding
    scaled: f64,
    /// Tournament level multiplier
    level_factor: f64,
}

impl UpdateWeights {
    pub fn new(base_weight: i64, base_year: i32, match_date: NaiveDate, level_factor: f64) -> Self {
        UpdateWeights {
            scaled: base_weight as f64 * weight(base_year, match_date, 1.0),
            level_factor,
        }
    }

    /// Weight for surface, climate and head-to-head updates
    pub fn decay(&self) -> i64 {
        self.scaled.round() as i64
    }

    /// Weight for total win/loss updates
    pub fn level(&self) -> i64 {
        (self.scaled * self.level_factor).round() as i64
    }

    /// Weighted games for the head-to-head games table
    pub fn games(&self, games: u32) -> i64 {
        (self.scaled * games as f64).round() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_reference_date_weighs_one() {
        assert!((weight(2018, date(2019, 1, 1), 1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_three_years_back_is_one_over_e() {
        // 2016-01-02 .. 2019-01-01 is 1095 days
        let w = weight(2018, date(2016, 1, 2), 1.0);
        assert!((w - (-1.0f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_older_matches_weigh_less() {
        let recent = weight(2018, date(2018, 11, 1), 1.0);
        let old = weight(2018, date(2012, 11, 1), 1.0);
        assert!(old < recent);
        assert!(recent < 1.0);
    }

    #[test]
    fn test_update_weights_rounding() {
        // 2018-12-31 is one day before the reference
        let w = UpdateWeights::new(100, 2018, date(2018, 12, 31), 0.5);
        let expected = 100.0 * (-1.0f64 / 1095.0).exp();
        assert_eq!(w.decay(), expected.round() as i64);
        assert_eq!(w.decay(), 100);
        assert_eq!(w.level(), 50);
        assert_eq!(w.games(16), (expected * 16.0).round() as i64);
    }
}
