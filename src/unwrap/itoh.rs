use ndarray::{ArrayView2, Axis as NdAxis};

use super::{Diagnostics, UnwrapError, UnwrapParams, Unwrapped, Unwrapper, wrap};
use crate::enums::Axis;
use crate::mask::Mask;

/// Integrates wrapped differences along each row (or column) separately.
///
/// Lines are not related to each other, so no connectivity is reported.
#[derive(Debug, Clone, Copy, Default)]
pub struct Itoh;

impl Unwrapper for Itoh {
    fn default_params(&self) -> UnwrapParams {
        UnwrapParams::Itoh(Default::default())
    }

    fn validate_params(&self, params: &UnwrapParams) -> Result<(), String> {
        match params {
            UnwrapParams::Itoh(_) => Ok(()),
            other => Err(format!("expected itoh parameters, got {}", other.kind())),
        }
    }

    fn unwrap(
        &self,
        grid: ArrayView2<'_, f32>,
        mask: &Mask,
        params: &UnwrapParams,
    ) -> Result<Unwrapped, UnwrapError> {
        let UnwrapParams::Itoh(params) = params else {
            return Err(UnwrapError::UnexpectedParams(params.kind()));
        };

        let axis = match params.axis {
            Axis::Rows => NdAxis(0),
            Axis::Columns => NdAxis(1),
        };

        let mut unwrapped = grid.to_owned();
        let mask = mask.view();
        for ((mut line, raw), valid) in unwrapped
            .axis_iter_mut(axis)
            .zip(grid.axis_iter(axis))
            .zip(mask.axis_iter(axis))
        {
            let mut previous: Option<usize> = None;
            for i in (0..raw.len()).filter(|&i| valid[i]) {
                if let Some(p) = previous {
                    line[i] = line[p] + wrap(raw[i] - raw[p]);
                }
                previous = Some(i);
            }
        }

        Ok(Unwrapped {
            grid: unwrapped,
            diagnostics: Diagnostics::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unwrap::ItohParams;
    use crate::unwrap::test_utils::{assert_matches_up_to_offset, wrapped_ramp};
    use ndarray::Array2;

    #[test]
    fn test_rows_follow_ramp() {
        let (truth, wrapped) = wrapped_ramp((4, 9), 0.3);
        let mask = Mask::new(Array2::from_elem(truth.dim(), true));

        let result = Itoh
            .unwrap(wrapped.view(), &mask, &Itoh.default_params())
            .unwrap();

        assert_matches_up_to_offset(&result.grid, &truth);
        assert!(result.diagnostics.values.is_empty());
    }

    #[test]
    fn test_columns_leave_horizontal_ramp_wrapped() {
        let (_, wrapped) = wrapped_ramp((4, 9), 0.3);
        let mask = Mask::new(Array2::from_elem(wrapped.dim(), true));
        let params = UnwrapParams::Itoh(ItohParams {
            axis: Axis::Columns,
        });

        let result = Itoh.unwrap(wrapped.view(), &mask, &params).unwrap();

        assert_eq!(result.grid, wrapped);
    }
}
