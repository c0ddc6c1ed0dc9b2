use std::path::Path;

use image::GrayImage;
use ndarray::{Array2, ArrayView2};

use crate::error::SeriesError;

/// Boolean validity map of a slice, `true` marks a valid pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    data: Array2<bool>,
}

impl Mask {
    pub fn new(data: Array2<bool>) -> Self {
        Self { data }
    }

    /// Reads a raster image, non-zero pixels are valid.
    ///
    /// With `check_invert` set, a mask whose top-left pixel is valid is
    /// taken to be inverted and is complemented.
    pub fn from_image_file(path: impl AsRef<Path>, check_invert: bool) -> Result<Self, SeriesError> {
        let image = image::open(path.as_ref())?.to_luma8();
        Ok(Self::from_luma(&image, check_invert))
    }

    pub fn from_luma(image: &GrayImage, check_invert: bool) -> Self {
        let (width, height) = image.dimensions();
        let data = Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
            image.get_pixel(x as u32, y as u32).0[0] != 0
        });
        let mask = Self::new(data);
        if check_invert && mask.is_inverted() {
            mask.inverted()
        } else {
            mask
        }
    }

    fn is_inverted(&self) -> bool {
        self.data.first().copied().unwrap_or(false)
    }

    pub fn inverted(&self) -> Self {
        Self::new(self.data.mapv(|valid| !valid))
    }

    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn view(&self) -> ArrayView2<'_, bool> {
        self.data.view()
    }

    #[inline]
    pub fn is_valid(&self, row: usize, col: usize) -> bool {
        self.data.get((row, col)).copied().unwrap_or(false)
    }

    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|&&valid| valid).count()
    }

    pub fn any(&self) -> bool {
        self.data.iter().any(|&valid| valid)
    }
}

impl From<Array2<bool>> for Mask {
    fn from(data: Array2<bool>) -> Self {
        Self::new(data)
    }
}

/// Returns the mask when it can be used to unwrap `path`.
pub fn validate_for_unwrap<'m>(
    mask: Option<&'m Mask>,
    path: &Path,
) -> Result<&'m Mask, SeriesError> {
    match mask {
        Some(mask) if mask.any() => Ok(mask),
        _ => Err(SeriesError::UnwrapPrecondition {
            path: path.to_path_buf(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn disc_image(border: u8, inner: u8) -> GrayImage {
        GrayImage::from_fn(6, 4, |x, y| {
            if (1..5).contains(&x) && (1..3).contains(&y) {
                Luma([inner])
            } else {
                Luma([border])
            }
        })
    }

    #[test]
    fn test_from_luma_keeps_regular_mask() {
        let mask = Mask::from_luma(&disc_image(0, 255), true);
        assert_eq!(mask.dim(), (4, 6));
        assert_eq!(mask.valid_count(), 8);
        assert!(mask.is_valid(1, 1));
        assert!(!mask.is_valid(0, 0));
    }

    #[test]
    fn test_from_luma_complements_inverted_mask() {
        let mask = Mask::from_luma(&disc_image(255, 0), true);
        assert_eq!(mask.valid_count(), 8);
        assert!(mask.is_valid(2, 3));
        assert!(!mask.is_valid(0, 0));
    }

    #[test]
    fn test_from_luma_without_invert_check() {
        let mask = Mask::from_luma(&disc_image(255, 0), false);
        assert_eq!(mask.valid_count(), 24 - 8);
        assert!(mask.is_valid(0, 0));
    }

    #[test]
    fn test_validate_for_unwrap() {
        let path = Path::new("188_13-12-10_82_1");
        let empty = Mask::new(Array2::from_elem((3, 3), false));
        let full = Mask::new(Array2::from_elem((3, 3), true));

        assert!(matches!(
            validate_for_unwrap(None, path),
            Err(SeriesError::UnwrapPrecondition { .. })
        ));
        assert!(matches!(
            validate_for_unwrap(Some(&empty), path),
            Err(SeriesError::UnwrapPrecondition { .. })
        ));
        assert!(validate_for_unwrap(Some(&full), path).is_ok());
    }

    #[test]
    fn test_from_image_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("55_mask.png");
        disc_image(0, 255).save(&path).unwrap();

        let mask = Mask::from_image_file(&path, true).unwrap();
        assert_eq!(mask.valid_count(), 8);
    }
}
