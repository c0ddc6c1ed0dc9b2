use ndarray::Array2;

use crate::decoder::AcquisitionParameters;

/// Stored values are divided by this to normalize a slice.
pub const FULL_SCALE: f32 = 4096.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SliceMetadata {
    pub parameters: AcquisitionParameters,
    /// Basename of the file the slice was read from
    pub orig_file: String,
    pub unwrapped: bool,
}

impl SliceMetadata {
    pub fn ptft(&self) -> f64 {
        self.parameters.ptft
    }
}

/// One normalized image of a series.
#[derive(Debug, Clone)]
pub struct Slice {
    pub data: Array2<f32>,
    pub metadata: SliceMetadata,
    /// Set by gold-standard unwrapping, `Some(true)` if pieces stayed disconnected
    pub disconnected: Option<bool>,
}

impl Slice {
    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn ptft(&self) -> f64 {
        self.metadata.ptft()
    }
}

pub(crate) fn normalize(pixels: &Array2<u16>) -> Array2<f32> {
    pixels.mapv(|value| f32::from(value) / FULL_SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_scales_to_full_scale() {
        let pixels = ndarray::arr2(&[[0u16, 2048], [4096, 1024]]);
        let normalized = normalize(&pixels);
        assert_eq!(normalized, ndarray::arr2(&[[0.0, 0.5], [1.0, 0.25]]));
    }
}
