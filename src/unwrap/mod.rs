//! Phase unwrapping adapter
//!
//! Algorithms are looked up by name in an [`UnwrapRegistry`]. The registry
//! checks shapes on both sides of the call and hands back the unwrapped
//! grid together with the algorithm's [`Diagnostics`].
//!
//! Built-in algorithms:
//! - `primary-gold`: residue branch cuts followed by a flood fill
//! - `native-gold`: quality-guided region growing
//! - `itoh`: one-dimensional integration along rows or columns
//!
//! Both gold variants end their diagnostics with the number of connected
//! pieces that were unwrapped independently.

pub mod goldstein;
pub mod itoh;
pub mod quality;

use std::collections::BTreeMap;
use std::fmt;

use ndarray::{Array2, ArrayView2};
use thiserror::Error;

use crate::enums::Axis;
use crate::error::SeriesError;
use crate::mask::Mask;

pub use goldstein::Goldstein;
pub use itoh::Itoh;
pub use quality::QualityGuided;

pub const PRIMARY_GOLD: &str = "primary-gold";
pub const NATIVE_GOLD: &str = "native-gold";
pub const ITOH: &str = "itoh";

/// Algorithms whose last diagnostic value is a connectivity count.
pub const GOLD_VARIANTS: [&str; 2] = [PRIMARY_GOLD, NATIVE_GOLD];

/// One full wrap of normalized phase data (full scale corresponds to 2π).
pub const WRAP_PERIOD: f32 = 1.0;

/// Wraps a phase difference into `[-WRAP_PERIOD / 2, WRAP_PERIOD / 2]`.
#[inline]
pub fn wrap(diff: f32) -> f32 {
    diff - WRAP_PERIOD * (diff / WRAP_PERIOD).round()
}

pub(crate) const NEIGHBOR_OFFSETS: [(isize, isize); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

#[inline]
pub(crate) fn neighbor(
    (row, col): (usize, usize),
    (dr, dc): (isize, isize),
    (height, width): (usize, usize),
) -> Option<(usize, usize)> {
    let r = row.checked_add_signed(dr)?;
    let c = col.checked_add_signed(dc)?;
    (r < height && c < width).then_some((r, c))
}

#[derive(Debug, Error)]
pub enum UnwrapError {
    #[error("Grid shape {grid:?} does not match mask shape {mask:?}")]
    ShapeMismatch {
        grid: (usize, usize),
        mask: (usize, usize),
    },

    #[error("Unwrapper returned shape {found:?}, expected {expected:?}")]
    OutputShape {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Parameters for {0} passed to a different algorithm")]
    UnexpectedParams(&'static str),

    #[error("Seed {0:?} is not a valid pixel")]
    InvalidSeed((usize, usize)),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoldsteinParams {
    /// Largest half-width of the box searched for balancing residues
    pub max_box_radius: usize,
}

impl Default for GoldsteinParams {
    fn default() -> Self {
        Self { max_box_radius: 8 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityGuidedParams {
    /// Starting pixel, the valid pixel closest to the center when unset
    pub seed: Option<(usize, usize)>,
    pub quality_bins: usize,
}

impl Default for QualityGuidedParams {
    fn default() -> Self {
        Self {
            seed: None,
            quality_bins: 256,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ItohParams {
    pub axis: Axis,
}

/// Per-algorithm parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnwrapParams {
    Goldstein(GoldsteinParams),
    QualityGuided(QualityGuidedParams),
    Itoh(ItohParams),
}

impl UnwrapParams {
    pub fn kind(&self) -> &'static str {
        match self {
            UnwrapParams::Goldstein(_) => "goldstein",
            UnwrapParams::QualityGuided(_) => "quality-guided",
            UnwrapParams::Itoh(_) => "itoh",
        }
    }
}

/// Algorithm name and parameters used when unwrapping is requested.
#[derive(Debug, Clone, PartialEq)]
pub struct UnwrapSettings {
    pub algorithm: String,
    /// Algorithm defaults are used when unset
    pub params: Option<UnwrapParams>,
}

impl Default for UnwrapSettings {
    fn default() -> Self {
        Self::new(PRIMARY_GOLD)
    }
}

impl UnwrapSettings {
    pub fn new(algorithm: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            params: None,
        }
    }

    pub fn with_params(mut self, params: UnwrapParams) -> Self {
        self.params = Some(params);
        self
    }

    pub fn reports_connectivity(&self) -> bool {
        GOLD_VARIANTS.contains(&self.algorithm.as_str())
    }
}

/// Ordered diagnostic values returned by an unwrapper.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Diagnostics {
    pub values: Vec<f64>,
}

impl Diagnostics {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Number of independently unwrapped pieces, for gold variants.
    pub fn connectivity(&self) -> Option<f64> {
        self.values.last().copied()
    }

    pub fn is_fully_connected(&self) -> bool {
        self.connectivity() == Some(1.0)
    }
}

#[derive(Debug, Clone)]
pub struct Unwrapped {
    pub grid: Array2<f32>,
    pub diagnostics: Diagnostics,
}

pub trait Unwrapper: Send + Sync {
    fn default_params(&self) -> UnwrapParams;

    /// Rejects parameters of another algorithm or out of range values.
    fn validate_params(&self, params: &UnwrapParams) -> Result<(), String>;

    fn unwrap(
        &self,
        grid: ArrayView2<'_, f32>,
        mask: &Mask,
        params: &UnwrapParams,
    ) -> Result<Unwrapped, UnwrapError>;
}

pub struct UnwrapRegistry {
    algorithms: BTreeMap<String, Box<dyn Unwrapper>>,
}

impl Default for UnwrapRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register(PRIMARY_GOLD, Goldstein)
            .register(NATIVE_GOLD, QualityGuided)
            .register(ITOH, Itoh);
        registry
    }
}

impl fmt::Debug for UnwrapRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.algorithms.keys()).finish()
    }
}

impl UnwrapRegistry {
    pub fn empty() -> Self {
        Self {
            algorithms: BTreeMap::new(),
        }
    }

    /// Adds an algorithm, replacing any previous one of the same name
    pub fn register(
        &mut self,
        name: impl Into<String>,
        unwrapper: impl Unwrapper + 'static,
    ) -> &mut Self {
        self.algorithms.insert(name.into(), Box::new(unwrapper));
        self
    }

    pub fn is_valid_algorithm(&self, name: &str) -> bool {
        self.algorithms.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.algorithms.keys().map(String::as_str)
    }

    /// Resolves the algorithm and the parameters it will run with.
    pub fn validate(
        &self,
        settings: &UnwrapSettings,
    ) -> Result<(&dyn Unwrapper, UnwrapParams), SeriesError> {
        let unwrapper = self
            .algorithms
            .get(&settings.algorithm)
            .ok_or_else(|| SeriesError::unknown_algorithm(&settings.algorithm))?;

        let params = settings
            .params
            .unwrap_or_else(|| unwrapper.default_params());
        unwrapper
            .validate_params(&params)
            .map_err(|reason| SeriesError::ConfigurationFailure {
                algorithm: settings.algorithm.clone(),
                reason,
            })?;

        Ok((&**unwrapper, params))
    }

    pub fn unwrap(
        &self,
        grid: ArrayView2<'_, f32>,
        mask: &Mask,
        settings: &UnwrapSettings,
    ) -> Result<Unwrapped, SeriesError> {
        let (unwrapper, params) = self.validate(settings)?;

        let expected = grid.dim();
        if expected != mask.dim() {
            return Err(UnwrapError::ShapeMismatch {
                grid: expected,
                mask: mask.dim(),
            }
            .into());
        }

        let unwrapped = unwrapper.unwrap(grid, mask, &params)?;
        if unwrapped.grid.dim() != expected {
            return Err(UnwrapError::OutputShape {
                expected,
                found: unwrapped.grid.dim(),
            }
            .into());
        }

        Ok(unwrapped)
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use ndarray::Array2;

    /// Horizontal ramp rising by `step` per column, wrapped into `[0, 1)`.
    pub(crate) fn wrapped_ramp(shape: (usize, usize), step: f32) -> (Array2<f32>, Array2<f32>) {
        let truth = Array2::from_shape_fn(shape, |(_, c)| c as f32 * step);
        let wrapped = truth.mapv(|v| v.rem_euclid(1.0));
        (truth, wrapped)
    }

    pub(crate) fn assert_matches_up_to_offset(actual: &Array2<f32>, truth: &Array2<f32>) {
        let offset = actual[[0, 0]] - truth[[0, 0]];
        for (a, t) in actual.iter().zip(truth.iter()) {
            assert!((a - t - offset).abs() < 1e-4, "{a} vs {t} (offset {offset})");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Shrinking;

    impl Unwrapper for Shrinking {
        fn default_params(&self) -> UnwrapParams {
            UnwrapParams::Itoh(ItohParams::default())
        }

        fn validate_params(&self, _params: &UnwrapParams) -> Result<(), String> {
            Ok(())
        }

        fn unwrap(
            &self,
            _grid: ArrayView2<'_, f32>,
            _mask: &Mask,
            _params: &UnwrapParams,
        ) -> Result<Unwrapped, UnwrapError> {
            Ok(Unwrapped {
                grid: Array2::zeros((1, 1)),
                diagnostics: Diagnostics::default(),
            })
        }
    }

    fn full_mask(shape: (usize, usize)) -> Mask {
        Mask::new(Array2::from_elem(shape, true))
    }

    #[test]
    fn test_wrap() {
        assert!((wrap(0.75) + 0.25).abs() < 1e-6);
        assert!((wrap(-0.75) - 0.25).abs() < 1e-6);
        assert!((wrap(0.2) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_default_registry_names() {
        let registry = UnwrapRegistry::default();
        assert!(registry.is_valid_algorithm(PRIMARY_GOLD));
        assert!(registry.is_valid_algorithm(NATIVE_GOLD));
        assert!(registry.is_valid_algorithm(ITOH));
        assert!(!registry.is_valid_algorithm("py_gold"));
        assert_eq!(registry.names().count(), 3);
    }

    #[test]
    fn test_validate_rejects_unknown_algorithm() {
        let registry = UnwrapRegistry::default();
        let result = registry.validate(&UnwrapSettings::new("fourier"));
        assert!(matches!(
            result,
            Err(SeriesError::ConfigurationFailure { algorithm, .. }) if algorithm == "fourier"
        ));
    }

    #[test]
    fn test_validate_rejects_foreign_params() {
        let registry = UnwrapRegistry::default();
        let settings = UnwrapSettings::new(PRIMARY_GOLD)
            .with_params(UnwrapParams::Itoh(ItohParams::default()));
        assert!(matches!(
            registry.validate(&settings),
            Err(SeriesError::ConfigurationFailure { .. })
        ));
    }

    #[test]
    fn test_oversized_quality_bins_fail_configuration() {
        let registry = UnwrapRegistry::default();
        let settings =
            UnwrapSettings::new(NATIVE_GOLD).with_params(UnwrapParams::QualityGuided(
                QualityGuidedParams {
                    quality_bins: usize::MAX,
                    ..Default::default()
                },
            ));
        let grid = Array2::<f32>::zeros((4, 4));

        let result = registry.unwrap(grid.view(), &full_mask((4, 4)), &settings);

        assert!(matches!(
            result,
            Err(SeriesError::ConfigurationFailure { algorithm, .. }) if algorithm == NATIVE_GOLD
        ));
    }

    #[test]
    fn test_validate_fills_default_params() {
        let registry = UnwrapRegistry::default();
        let (_, params) = registry.validate(&UnwrapSettings::new(NATIVE_GOLD)).unwrap();
        assert_eq!(
            params,
            UnwrapParams::QualityGuided(QualityGuidedParams::default())
        );
    }

    #[test]
    fn test_unwrap_checks_mask_shape() {
        let registry = UnwrapRegistry::default();
        let grid = Array2::<f32>::zeros((4, 4));
        let result = registry.unwrap(grid.view(), &full_mask((4, 5)), &UnwrapSettings::default());
        assert!(matches!(
            result,
            Err(SeriesError::Unwrap(UnwrapError::ShapeMismatch { .. }))
        ));
    }

    #[test]
    fn test_unwrap_checks_output_shape() {
        let mut registry = UnwrapRegistry::empty();
        registry.register("shrinking", Shrinking);
        let grid = Array2::<f32>::zeros((4, 4));
        let result = registry.unwrap(
            grid.view(),
            &full_mask((4, 4)),
            &UnwrapSettings::new("shrinking"),
        );
        assert!(matches!(
            result,
            Err(SeriesError::Unwrap(UnwrapError::OutputShape { .. }))
        ));
    }

    #[test]
    fn test_diagnostics_connectivity() {
        assert!(Diagnostics::new(vec![4.0, 12.0, 1.0]).is_fully_connected());
        assert!(!Diagnostics::new(vec![0.0, 0.0, 2.0]).is_fully_connected());
        assert!(!Diagnostics::default().is_fully_connected());
    }

    #[test]
    fn test_settings_reports_connectivity() {
        assert!(UnwrapSettings::new(PRIMARY_GOLD).reports_connectivity());
        assert!(UnwrapSettings::new(NATIVE_GOLD).reports_connectivity());
        assert!(!UnwrapSettings::new(ITOH).reports_connectivity());
    }
}
