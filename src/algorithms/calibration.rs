//! Calibration contract consumed by the ranging functions
//!
//! A calibration turns observed round-trip times (milliseconds) into
//! plausible distance ranges (meters). How calibrations are fitted is
//! outside this crate; only the data-independent physical limits live
//! here, because every ranging function consults them.

use std::fmt;

use crate::core::DISTANCE_LIMIT;
use crate::utils::config::RangingConfig;

pub trait Calibration: fmt::Debug + Send + Sync {
    /// Minimum and maximum distance consistent with `rtts`
    fn distance_range(&self, rtts: &[f64]) -> (f64, f64);

    /// Expected distance for a single RTT, for calibrations that model one
    fn mean_distance(&self, _rtt: f64) -> Option<f64> {
        None
    }

    /// Standard deviation of the distance for a single RTT
    fn sigma_distance(&self, _rtt: f64) -> Option<f64> {
        None
    }
}

/// Which propagation speed bounds the distance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitMode {
    /// Speed of light in fibre, 2/3 c. Nothing can beat this.
    Physical,
    /// 4/9 c, the fastest speed seen in practice on real paths
    Empirical,
}

/// A calibration that knows nothing but the speed limit.
///
/// The fastest sample bounds the distance: half the round trip at the
/// mode's propagation speed, never past half the circumference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalLimitsOnly {
    mode: LimitMode,
    speed_m_per_ms: f64,
}

impl PhysicalLimitsOnly {
    pub fn new(mode: LimitMode) -> Self {
        Self::with_config(mode, &RangingConfig::default())
    }

    pub fn with_config(mode: LimitMode, config: &RangingConfig) -> Self {
        let speed_m_per_ms = match mode {
            LimitMode::Physical => config.physical_speed_m_per_ms,
            LimitMode::Empirical => config.empirical_speed_m_per_ms,
        };
        Self { mode, speed_m_per_ms }
    }

    pub fn mode(&self) -> LimitMode {
        self.mode
    }
}

impl Calibration for PhysicalLimitsOnly {
    fn distance_range(&self, rtts: &[f64]) -> (f64, f64) {
        let fastest = rtts.iter().copied().fold(f64::INFINITY, f64::min);
        if !fastest.is_finite() {
            return (0.0, DISTANCE_LIMIT);
        }
        let max = (fastest.max(0.0) / 2.0 * self.speed_m_per_ms).min(DISTANCE_LIMIT);
        (0.0, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_physical_limit() {
        let cal = PhysicalLimitsOnly::new(LimitMode::Physical);
        let (min, max) = cal.distance_range(&[30.0, 10.0, 20.0]);
        assert_eq!(min, 0.0);
        // 5 ms one way at 2/3 c
        assert!((max - 5.0 * 299792.458 * 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_empirical_tighter_than_physical() {
        let rtts = [42.0, 40.0];
        let (_, emp) = PhysicalLimitsOnly::new(LimitMode::Empirical).distance_range(&rtts);
        let (_, phy) = PhysicalLimitsOnly::new(LimitMode::Physical).distance_range(&rtts);
        assert!(emp < phy);
    }

    #[test]
    fn test_limit_clipped_to_half_circumference() {
        let cal = PhysicalLimitsOnly::new(LimitMode::Physical);
        assert_eq!(cal.distance_range(&[10_000.0]).1, DISTANCE_LIMIT);
        assert_eq!(cal.distance_range(&[]), (0.0, DISTANCE_LIMIT));
    }

    #[test]
    fn test_no_gaussian_model() {
        let cal = PhysicalLimitsOnly::new(LimitMode::Empirical);
        assert!(cal.mean_distance(10.0).is_none());
        assert!(cal.sigma_distance(10.0).is_none());
    }
}
