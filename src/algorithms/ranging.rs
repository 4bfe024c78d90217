//! Ranging functions
//!
//! A ranging function computes non-normalized probability as a function
//! of distance from a reference point, given calibration data and a set
//! of timing observations. Instances are built once per observation and
//! never change afterwards.

use std::fmt;
use std::sync::Arc;

use crate::algorithms::calibration::{Calibration, LimitMode, PhysicalLimitsOnly};
use crate::core::DISTANCE_LIMIT;
use crate::utils::config::RangingConfig;
use crate::validation::error::{GeolocationError, Result};

pub trait RangingFunction: fmt::Debug + Send + Sync {
    /// Largest distance (meters) this function considers plausible
    fn distance_bound(&self) -> f64;

    /// Non-normalized probability for each distance (meters)
    fn unnormalized_pvals(&self, distances: &[f64]) -> Result<Vec<f64>>;
}

/// Selects the ranging function an observation is built with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangingKind {
    MinMax,
    Gaussian,
}

impl RangingKind {
    pub fn build(
        self,
        calibration: Arc<dyn Calibration>,
        rtts: &[f64],
        fuzz: f64,
        config: &RangingConfig,
    ) -> Result<Arc<dyn RangingFunction>> {
        Ok(match self {
            RangingKind::MinMax => Arc::new(MinMax::with_config(calibration, rtts, fuzz, config)?),
            RangingKind::Gaussian => Arc::new(Gaussian::with_config(calibration, rtts, fuzz, config)?),
        })
    }
}

/// Linear-interpolation percentile, `p` in 0..=100
pub fn percentile(samples: &[f64], p: f64) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let pos = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

/// Flat full probability between the distances the calibration
/// considers feasible, falling off linearly to a knee at the empirical
/// bounds and then to zero at the physical bounds.
///
/// Empirical calibrations occasionally produce an observation that is
/// inconsistent with the global truth, so the edges taper rather than
/// dropping straight to zero.
#[derive(Debug, Clone)]
pub struct MinMax {
    calibration: Arc<dyn Calibration>,
    rtts: Vec<f64>,
    fuzz: f64,
    /// Sorted breakpoints
    bounds: [f64; 6],
    shape: [f64; 6],
}

impl MinMax {
    pub fn new(calibration: Arc<dyn Calibration>, rtts: &[f64], fuzz: f64) -> Result<Self> {
        Self::with_config(calibration, rtts, fuzz, &RangingConfig::default())
    }

    pub fn with_config(
        calibration: Arc<dyn Calibration>,
        rtts: &[f64],
        fuzz: f64,
        config: &RangingConfig,
    ) -> Result<Self> {
        if rtts.is_empty() {
            return Err(GeolocationError::NoSamples);
        }
        let (min_cal, max_cal) = calibration.distance_range(rtts);
        let (min_emp, max_emp) =
            PhysicalLimitsOnly::with_config(LimitMode::Empirical, config).distance_range(rtts);
        let (min_phy, max_phy) =
            PhysicalLimitsOnly::with_config(LimitMode::Physical, config).distance_range(rtts);

        let mut bounds = [min_cal, max_cal, min_emp, max_emp, min_phy, max_phy]
            .map(|v| v.max(0.0).min(DISTANCE_LIMIT));
        bounds.sort_by(|a, b| a.total_cmp(b));

        Ok(Self {
            calibration,
            rtts: rtts.to_vec(),
            fuzz,
            bounds,
            shape: config.minmax_taper,
        })
    }

    pub fn breakpoints(&self) -> &[f64; 6] {
        &self.bounds
    }

    pub fn calibration(&self) -> &Arc<dyn Calibration> {
        &self.calibration
    }

    pub fn rtts(&self) -> &[f64] {
        &self.rtts
    }

    pub fn fuzz(&self) -> f64 {
        self.fuzz
    }

    /// Piecewise-linear interpolant over the breakpoints, 0 outside them.
    /// A distance sitting on coincident breakpoints takes the largest
    /// value any segment gives it.
    fn interpolate(&self, d: f64) -> f64 {
        let (b, y) = (&self.bounds, &self.shape);
        if !(d >= b[0] && d <= b[5]) {
            return 0.0;
        }
        let mut value = f64::NEG_INFINITY;
        for k in 0..5 {
            if d < b[k] || d > b[k + 1] {
                continue;
            }
            let width = b[k + 1] - b[k];
            let v = if width > 0.0 {
                y[k] + (y[k + 1] - y[k]) * (d - b[k]) / width
            } else {
                y[k].max(y[k + 1])
            };
            value = value.max(v);
        }
        value.max(0.0)
    }
}

impl RangingFunction for MinMax {
    fn distance_bound(&self) -> f64 {
        self.bounds[5]
    }

    fn unnormalized_pvals(&self, distances: &[f64]) -> Result<Vec<f64>> {
        Ok(distances.iter().map(|&d| self.interpolate(d)).collect())
    }
}

/// Normal density with mean and standard deviation from the calibration,
/// clipped to zero past the outer distance bound (the density itself is
/// nonzero everywhere).
#[derive(Debug, Clone)]
pub struct Gaussian {
    calibration: Arc<dyn Calibration>,
    rtts: Vec<f64>,
    fuzz: f64,
    distance_bound: f64,
    mu: f64,
    sigma: f64,
}

impl Gaussian {
    pub fn new(calibration: Arc<dyn Calibration>, rtts: &[f64], fuzz: f64) -> Result<Self> {
        Self::with_config(calibration, rtts, fuzz, &RangingConfig::default())
    }

    pub fn with_config(
        calibration: Arc<dyn Calibration>,
        rtts: &[f64],
        fuzz: f64,
        config: &RangingConfig,
    ) -> Result<Self> {
        let rtt = percentile(rtts, config.gaussian_rtt_percentile).ok_or(GeolocationError::NoSamples)?;
        let mu = calibration.mean_distance(rtt).ok_or(GeolocationError::MissingCalibrationModel {
            ranging: "Gaussian",
            missing: "a mean distance model",
        })?;
        let sigma = calibration.sigma_distance(rtt).ok_or(GeolocationError::MissingCalibrationModel {
            ranging: "Gaussian",
            missing: "a distance deviation model",
        })?;

        let (min_cal, max_cal) = calibration.distance_range(rtts);
        let (min_phy, max_phy) =
            PhysicalLimitsOnly::with_config(LimitMode::Physical, config).distance_range(rtts);
        let distance_bound = min_cal.max(max_cal).max(min_phy).max(max_phy);

        // mu and sigma go negative when two nodes are very close together
        let mu = mu.max(config.gaussian_min_mu);
        let sigma = sigma.max(config.gaussian_min_sigma);

        Ok(Self {
            calibration,
            rtts: rtts.to_vec(),
            fuzz,
            distance_bound,
            mu,
            sigma,
        })
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn calibration(&self) -> &Arc<dyn Calibration> {
        &self.calibration
    }

    pub fn rtts(&self) -> &[f64] {
        &self.rtts
    }

    pub fn fuzz(&self) -> f64 {
        self.fuzz
    }

    fn pdf(&self, d: f64) -> f64 {
        let z = (d - self.mu) / self.sigma;
        (-0.5 * z * z).exp() / (self.sigma * (2.0 * std::f64::consts::PI).sqrt())
    }
}

impl RangingFunction for Gaussian {
    fn distance_bound(&self) -> f64 {
        self.distance_bound
    }

    fn unnormalized_pvals(&self, distances: &[f64]) -> Result<Vec<f64>> {
        distances
            .iter()
            .map(|&d| {
                let value = self.pdf(d);
                if !value.is_finite() {
                    return Err(GeolocationError::NonFiniteDensity { distance: d, value });
                }
                Ok(if d > self.distance_bound { 0.0 } else { value })
            })
            .collect()
    }
}
