use std::sync::Arc;

use image::ImageBuffer;
use image::Luma;
use ndarray::Array2;
use ndarray::Array3;
use ndarray::ArrayView2;
use ndarray::Axis;
use ndarray::s;
use rayon::prelude::*;

use crate::error::SeriesError;
use crate::mask::Mask;
use crate::slice::{Slice, SliceMetadata};

/// Slices of one PTFT stacked along the first axis.
#[derive(Debug, Clone)]
pub struct Series {
    pub data: Array3<f32>,
    /// Metadata of the first slice of the stack
    pub metadata: SliceMetadata,
    /// Source file names in stacking order
    pub files: Vec<String>,
    /// Mask the slices were read with, shared by all groups of one assembly
    pub mask: Option<Arc<Mask>>,
}

impl Series {
    /// Stacks `slices` in the given order.
    ///
    /// # Errors
    ///
    /// `StackingFailure` if a slice's shape differs from the first one.
    /// An empty group also fails, reported against index 0.
    pub fn stack(slices: Vec<Slice>) -> Result<Self, SeriesError> {
        let first = slices.first().ok_or(SeriesError::StackingFailure {
            index: 0,
            expected: (0, 0),
            found: (0, 0),
        })?;
        let (height, width) = first.dim();

        if let Some((index, slice)) = slices
            .iter()
            .enumerate()
            .find(|(_, slice)| slice.dim() != (height, width))
        {
            return Err(SeriesError::StackingFailure {
                index,
                expected: (height, width),
                found: slice.dim(),
            });
        }

        let mut data = Array3::<f32>::zeros((slices.len(), height, width));
        for (i, slice) in slices.iter().enumerate() {
            data.slice_mut(s![i, .., ..]).assign(&slice.data);
        }

        let files = slices
            .iter()
            .map(|slice| slice.metadata.orig_file.clone())
            .collect();
        let metadata = first.metadata.clone();

        Ok(Self {
            data,
            metadata,
            files,
            mask: None,
        })
    }

    pub fn with_mask(mut self, mask: Option<Arc<Mask>>) -> Self {
        self.mask = mask;
        self
    }

    /// Get the dimensions of the series (slices, height, width)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn len(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ptft(&self) -> f64 {
        self.metadata.ptft()
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    pub fn get_slice(&self, index: usize) -> Option<ArrayView2<'_, f32>> {
        (index < self.len()).then(|| self.data.slice(s![index, .., ..]))
    }

    /// Pixel-wise mean over all slices
    pub fn mean_image(&self) -> Option<Array2<f32>> {
        self.data.mean_axis(Axis(0))
    }

    #[inline]
    fn normalize_to_u8(value: f32, min: f32, max: f32) -> u8 {
        if max <= min {
            return 0;
        }
        (((value - min) / (max - min)) * 255.0).clamp(0.0, 255.0) as u8
    }

    /// Renders an image scaled to the value range of the whole series
    pub fn image_from_slice(&self, index: usize) -> Option<ImageBuffer<Luma<u8>, Vec<u8>>> {
        let slice = self.get_slice(index)?;
        Self::slice_to_image(&slice, self.value_range())
    }

    pub fn mean_to_image(&self) -> Option<ImageBuffer<Luma<u8>, Vec<u8>>> {
        let mean = self.mean_image()?;
        Self::slice_to_image(&mean.view(), self.value_range())
    }

    fn value_range(&self) -> (f32, f32) {
        self.data
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), &v| {
                (min.min(v), max.max(v))
            })
    }

    fn slice_to_image(
        slice: &ArrayView2<'_, f32>,
        (min, max): (f32, f32),
    ) -> Option<ImageBuffer<Luma<u8>, Vec<u8>>> {
        let (height, width) = slice.dim();
        let pixel_data: Vec<u8> = slice
            .into_par_iter()
            .map(|&v| Self::normalize_to_u8(v, min, max))
            .collect();
        ImageBuffer::from_raw(width as u32, height as u32, pixel_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::AcquisitionParameters;
    use crate::enums::SequenceKind;

    fn slice(name: &str, ptft: f64, data: Array2<f32>) -> Slice {
        Slice {
            data,
            metadata: SliceMetadata {
                parameters: AcquisitionParameters::new(ptft, SequenceKind::SinglePtft),
                orig_file: name.to_owned(),
                unwrapped: false,
            },
            disconnected: None,
        }
    }

    fn gradient(offset: f32) -> Array2<f32> {
        Array2::from_shape_fn((3, 4), |(r, c)| offset + (r * 4 + c) as f32 / 16.0)
    }

    #[test]
    fn test_stack_and_unstack_are_identical() {
        let slices: Vec<_> = (0..3)
            .map(|i| slice(&format!("f_{i}"), 10.0, gradient(i as f32)))
            .collect();
        let originals: Vec<_> = slices.iter().map(|s| s.data.clone()).collect();

        let series = Series::stack(slices).unwrap();

        assert_eq!(series.dim(), (3, 3, 4));
        for (i, original) in originals.iter().enumerate() {
            assert_eq!(series.get_slice(i).unwrap(), original.view());
        }
        assert!(series.get_slice(3).is_none());
    }

    #[test]
    fn test_metadata_comes_from_first_slice() {
        let series = Series::stack(vec![
            slice("first", 10.0, gradient(0.0)),
            slice("second", 20.0, gradient(1.0)),
        ])
        .unwrap();

        assert_eq!(series.metadata.orig_file, "first");
        assert_eq!(series.ptft(), 10.0);
        assert_eq!(series.files, vec!["first", "second"]);
        assert!(series.mask.is_none());
    }

    #[test]
    fn test_shape_mismatch_is_stacking_failure() {
        let result = Series::stack(vec![
            slice("a", 0.0, gradient(0.0)),
            slice("b", 0.0, Array2::zeros((4, 4))),
        ]);

        assert!(matches!(
            result,
            Err(SeriesError::StackingFailure {
                index: 1,
                expected: (3, 4),
                found: (4, 4)
            })
        ));
    }

    #[test]
    fn test_mean_image() {
        let series = Series::stack(vec![
            slice("a", 0.0, Array2::from_elem((2, 2), 1.0)),
            slice("b", 0.0, Array2::from_elem((2, 2), 3.0)),
        ])
        .unwrap();

        assert_eq!(series.mean_image().unwrap(), Array2::from_elem((2, 2), 2.0));
    }

    #[test]
    fn test_image_spans_value_range() {
        let series = Series::stack(vec![slice("a", 0.0, gradient(0.0))]).unwrap();

        let image = series.image_from_slice(0).unwrap();

        assert_eq!(image.dimensions(), (4, 3));
        assert_eq!(image.get_pixel(0, 0).0[0], 0);
        assert_eq!(image.get_pixel(3, 2).0[0], 255);
    }
}
