//! Vibrational partition functions and reduced partition function ratios.
//!
//! For harmonic frequencies ν (cm⁻¹) at temperature T, with
//! `u = h·c·ν / (k·T)`, each mode contributes
//!
//! ```text
//! ln q(ν) = ln( exp(-u/2) / (1 - exp(-u)) )
//! ```
//!
//! and `ln Q` is the sum of the per-mode logarithms. For a light and a
//! heavy isotopologue with modes paired by position, the reduced partition
//! function ratio in per-mil units is
//!
//! ```text
//! 1000·ln β = 1000 · ( Σ ln(ν_heavy / ν_light) + ln Q_heavy - ln Q_light )
//! ```
//!
//! Reference: Blanchard, M., Balan, E. and Schauble, E.A. (2017), Reviews in
//! Mineralogy and Geochemistry 82(1), 27-63.
//!
//! # Examples
//!
//! ```
//! use isofrac::partition::reduced_partition_function_ratio;
//!
//! let light = [78.5452, 126.6746, 232.1478];
//! let heavy = [78.5452, 126.2453, 230.5599];
//! let result = reduced_partition_function_ratio(&light, &heavy, 298.15).unwrap();
//! assert!(result.beta > 0.0);
//! ```

use log::warn;
use serde::Serialize;
use thiserror::Error;

/// Error type for RPFR calculations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalcError {
    /// Light and heavy frequency sets have different lengths
    #[error("frequency set lengths do not match (light: {light}, heavy: {heavy}); both log files must describe the same molecule")]
    LengthMismatch {
        /// Number of light frequencies
        light: usize,
        /// Number of heavy frequencies
        heavy: usize,
    },
}

/// Physical constants used by the engine (SI units).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhysicalConstants {
    /// Planck constant (J·s)
    pub planck: f64,
    /// Speed of light (m/s)
    pub speed_of_light: f64,
    /// Boltzmann constant (J/K)
    pub boltzmann: f64,
}

impl PhysicalConstants {
    /// Exact SI values (CODATA 2018).
    pub const CODATA_2018: PhysicalConstants = PhysicalConstants {
        planck: 6.626_070_15e-34,
        speed_of_light: 299_792_458.0,
        boltzmann: 1.380_649e-23,
    };

    /// `h·c / k` in cm·K, so that `u = ν · factor / T` for ν in cm⁻¹.
    pub fn wavenumber_factor(&self) -> f64 {
        self.planck * (self.speed_of_light * 100.0) / self.boltzmann
    }
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self::CODATA_2018
    }
}

/// Result of one RPFR calculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RpfrResult {
    /// 1000·ln β
    pub beta: f64,
    /// Σ ln(ν_heavy / ν_light)
    pub ratio_sum: f64,
    /// ln Q of the heavy isotopologue
    pub ln_q_heavy: f64,
    /// ln Q of the light isotopologue
    pub ln_q_light: f64,
}

impl RpfrResult {
    /// False if any component is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.beta.is_finite()
            && self.ratio_sum.is_finite()
            && self.ln_q_heavy.is_finite()
            && self.ln_q_light.is_finite()
    }
}

/// Partition function calculator bound to a set of physical constants.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartitionFunctionEngine {
    constants: PhysicalConstants,
}

impl PartitionFunctionEngine {
    /// Creates an engine using `constants`.
    pub fn new(constants: PhysicalConstants) -> Self {
        Self { constants }
    }

    /// Constants in use
    pub fn constants(&self) -> &PhysicalConstants {
        &self.constants
    }

    /// Natural log of the vibrational partition function.
    ///
    /// Each mode's contribution is logged individually and then summed.
    /// Zero or negative frequencies make the formula undefined; they are
    /// reported with a warning and propagate as a non-finite result.
    pub fn ln_partition_function(&self, frequencies: &[f64], temperature: f64) -> f64 {
        let factor = self.constants.wavenumber_factor() / temperature;
        frequencies
            .iter()
            .map(|&nu| {
                let u = factor * nu;
                let term = (-u / 2.0).exp() / (1.0 - (-u).exp());
                let ln_term = term.ln();
                if !ln_term.is_finite() {
                    warn!(
                        "Partition function term for {} cm-1 at {} K is not finite ({})",
                        nu, temperature, ln_term
                    );
                }
                ln_term
            })
            .sum()
    }

    /// Reduced partition function ratio between two isotopologues.
    ///
    /// Frequencies are paired by position, so both slices must list the
    /// modes in the same order.
    ///
    /// # Errors
    ///
    /// [`CalcError::LengthMismatch`] when the slices differ in length.
    pub fn reduced_partition_function_ratio(
        &self,
        light: &[f64],
        heavy: &[f64],
        temperature: f64,
    ) -> Result<RpfrResult, CalcError> {
        if light.len() != heavy.len() {
            return Err(CalcError::LengthMismatch {
                light: light.len(),
                heavy: heavy.len(),
            });
        }

        let ratio_sum: f64 = light
            .iter()
            .zip(heavy)
            .map(|(l, h)| (h / l).ln())
            .sum();
        let ln_q_light = self.ln_partition_function(light, temperature);
        let ln_q_heavy = self.ln_partition_function(heavy, temperature);
        let result = RpfrResult {
            beta: 1000.0 * (ratio_sum + ln_q_heavy - ln_q_light),
            ratio_sum,
            ln_q_heavy,
            ln_q_light,
        };
        if !result.is_finite() {
            warn!("RPFR is not finite: {:?}", result);
        }
        Ok(result)
    }
}

/// [`PartitionFunctionEngine::ln_partition_function`] with CODATA 2018 constants.
pub fn ln_partition_function(frequencies: &[f64], temperature: f64) -> f64 {
    PartitionFunctionEngine::default().ln_partition_function(frequencies, temperature)
}

/// [`PartitionFunctionEngine::reduced_partition_function_ratio`] with CODATA 2018 constants.
pub fn reduced_partition_function_ratio(
    light: &[f64],
    heavy: &[f64],
    temperature: f64,
) -> Result<RpfrResult, CalcError> {
    PartitionFunctionEngine::default().reduced_partition_function_ratio(light, heavy, temperature)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper to check if two floats are approximately equal
    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    const LIGHT: [f64; 9] = [
        78.5452, 78.5452, 126.6746, 126.6746, 126.6746, 232.1478, 232.2047, 232.2047, 232.2047,
    ];
    const HEAVY: [f64; 9] = [
        78.5452, 78.5452, 126.2453, 126.2453, 126.2453, 230.5599, 230.5599, 230.5599, 232.1478,
    ];

    #[test]
    fn test_wavenumber_factor() {
        // second radiation constant c2 = 1.438776877 cm K
        let c2 = PhysicalConstants::CODATA_2018.wavenumber_factor();
        assert!(approx_eq(c2, 1.438_776_877, 1e-9));
    }

    #[test]
    fn test_single_mode() {
        let u: f64 = 1.438_776_877 * 1000.0 / 300.0;
        let expected = -u / 2.0 - (1.0 - (-u).exp()).ln();
        assert!(approx_eq(ln_partition_function(&[1000.0], 300.0), expected, 1e-8));
    }

    #[test]
    fn test_empty_frequency_set() {
        assert_eq!(ln_partition_function(&[], 298.15), 0.0);
    }

    #[test]
    fn test_order_invariance() {
        let mut reversed = LIGHT;
        reversed.reverse();
        let a = ln_partition_function(&LIGHT, 298.15);
        let b = ln_partition_function(&reversed, 298.15);
        assert!(approx_eq(a, b, 1e-12));
    }

    #[test]
    fn test_zncl4_reference_values() {
        let r = reduced_partition_function_ratio(&LIGHT, &HEAVY, 298.15).unwrap();
        assert!(approx_eq(r.ratio_sum, -0.0315100969, 1e-8 + 1e-5 * 0.0315100969));
        assert!(approx_eq(r.ln_q_light, 2.6961634304, 1e-8 + 1e-5 * 2.6961634304));
        assert!(approx_eq(r.ln_q_heavy, 2.7301585764, 1e-8 + 1e-5 * 2.7301585764));
        assert!(approx_eq(r.beta, 2.485049102, 1e-8 + 1e-5 * 2.485049102));
        assert!(r.is_finite());
    }

    #[test]
    fn test_identical_sets_give_zero() {
        let r = reduced_partition_function_ratio(&LIGHT, &LIGHT, 298.15).unwrap();
        assert!(approx_eq(r.ratio_sum, 0.0, 1e-8));
        assert!(approx_eq(r.ln_q_heavy, r.ln_q_light, 1e-8));
        assert!(approx_eq(r.beta, 0.0, 1e-8));
    }

    #[test]
    fn test_length_mismatch() {
        let err = reduced_partition_function_ratio(&LIGHT, &HEAVY[..8], 298.15).unwrap_err();
        assert_eq!(err, CalcError::LengthMismatch { light: 9, heavy: 8 });
        let err = reduced_partition_function_ratio(&[1.0], &[1.0, 2.0], 298.15).unwrap_err();
        assert_eq!(err, CalcError::LengthMismatch { light: 1, heavy: 2 });
    }

    #[test]
    fn test_zero_frequency_is_not_finite() {
        let r = reduced_partition_function_ratio(&[0.0, 100.0], &[0.0, 99.0], 298.15).unwrap();
        assert!(!r.is_finite());
    }

    #[test]
    fn test_custom_constants() {
        let engine = PartitionFunctionEngine::new(PhysicalConstants {
            planck: 6.62607004e-34,
            speed_of_light: 299_792_458.0,
            boltzmann: 1.38064852e-23,
        });
        let a = engine.ln_partition_function(&LIGHT, 298.15);
        let b = ln_partition_function(&LIGHT, 298.15);
        assert!(approx_eq(a, b, 1e-5));
    }
}
