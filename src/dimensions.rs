//! Dimension handling for the 4-D forecast cube.
//!
//! Data variables live on ordered subsets of the canonical axes
//! `[lead_time, station, ens_member, time]`. This module provides the
//! two operations everything else is built on: splicing a positional
//! 4-vector down to a named subset of axes, and reducing a named array
//! to a requested set of axes while preserving explicitly requested
//! degenerate (size 1) axes.

use ndarray::{ArrayD, Axis, IxDyn, Slice};

use crate::conventions::default_dim_order;
use crate::error::EftsError;

/// Fixed width of the `str_len` dimension backing station names.
pub const STR_LEN: usize = 30;

/// Splice a positional vector of dimension sizes down to a named subset.
///
/// `sizes` must have exactly four elements, with the fixed positional
/// meaning `(lead_time, station, ens_member, time)`. An empty `subset`
/// returns the full named vector in the default dimension order;
/// otherwise only the requested axes are returned, in the requested
/// order, with values taken from the matching input positions.
pub fn splice_dims(
    sizes: &[usize],
    subset: &[&str],
) -> Result<Vec<(String, usize)>, EftsError> {
    let order = default_dim_order();
    if sizes.len() != order.len() {
        return Err(EftsError::DimensionCount {
            expected: order.len(),
            got: sizes.len(),
        });
    }
    if subset.is_empty() {
        return Ok(order
            .iter()
            .zip(sizes.iter())
            .map(|(n, s)| (n.to_string(), *s))
            .collect());
    }
    let invalid: Vec<&str> = subset
        .iter()
        .filter(|n| !order.contains(*n))
        .copied()
        .collect();
    if !invalid.is_empty() {
        return Err(EftsError::InvalidDimensions(invalid.join(",")));
    }
    Ok(subset
        .iter()
        .map(|n| {
            let pos = order.iter().position(|o| o == n).unwrap();
            (n.to_string(), sizes[pos])
        })
        .collect())
}

/// An n-dimensional array paired with one axis name per dimension.
///
/// Axis names are unique within one array and their count always equals
/// the array rank; both invariants are enforced at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedArray {
    data: ArrayD<f64>,
    dim_names: Vec<String>,
}

impl NamedArray {
    pub fn new(data: ArrayD<f64>, dim_names: Vec<String>) -> Result<Self, EftsError> {
        if dim_names.len() != data.ndim() {
            return Err(EftsError::DimNamesMismatch {
                names: dim_names.len(),
                rank: data.ndim(),
            });
        }
        for (i, name) in dim_names.iter().enumerate() {
            if dim_names[..i].contains(name) {
                return Err(EftsError::DuplicateDimNames(name.clone()));
            }
        }
        Ok(Self { data, dim_names })
    }

    /// Allocate an array filled with `value` for the given named axes.
    pub fn from_elem(dims: &[(String, usize)], value: f64) -> Self {
        let shape: Vec<usize> = dims.iter().map(|(_, s)| *s).collect();
        let names: Vec<String> = dims.iter().map(|(n, _)| n.clone()).collect();
        Self {
            data: ArrayD::from_elem(IxDyn(&shape), value),
            dim_names: names,
        }
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn dim_names(&self) -> &[String] {
        &self.dim_names
    }

    pub fn values(&self) -> &ArrayD<f64> {
        &self.data
    }

    pub fn values_mut(&mut self) -> &mut ArrayD<f64> {
        &mut self.data
    }

    pub fn into_values(self) -> ArrayD<f64> {
        self.data
    }

    /// Size of the named axis, if present.
    pub fn size_of(&self, name: &str) -> Option<usize> {
        self.dim_names
            .iter()
            .position(|n| n == name)
            .map(|i| self.data.shape()[i])
    }

    /// Restrict one named axis to the window `start..start + count`.
    pub fn slice_axis(&mut self, name: &str, start: usize, count: usize) -> Result<(), EftsError> {
        let pos = self
            .dim_names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| EftsError::MissingDimension(name.to_string()))?;
        let size = self.data.shape()[pos];
        if start + count > size {
            return Err(EftsError::ShapeMismatch {
                name: name.to_string(),
                expected: size,
                got: start + count,
            });
        }
        self.data
            .slice_axis_inplace(Axis(pos), Slice::from(start..start + count));
        Ok(())
    }
}

/// Reduce a named array to the requested axes, in the requested order.
///
/// When `subset` is absent, the target defaults to the axes whose size
/// is greater than one, so degenerate axes drop away. Every axis not in
/// the target must be degenerate; dropping data is refused. Axes that
/// are explicitly requested are kept even when their size is one, which
/// a plain squeeze would not do.
pub fn reduce_dimensions(
    x: &NamedArray,
    subset: Option<&[&str]>,
) -> Result<NamedArray, EftsError> {
    let dim_names = x.dim_names();
    let sizes = x.shape();

    let target: Vec<String> = match subset {
        Some(names) => names.iter().map(|n| n.to_string()).collect(),
        None => dim_names
            .iter()
            .zip(sizes.iter())
            .filter(|(_, s)| **s > 1)
            .map(|(n, _)| n.clone())
            .collect(),
    };

    let missing: Vec<String> = target
        .iter()
        .filter(|n| !dim_names.contains(*n))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(EftsError::UnknownDimNames(missing.join(", ")));
    }

    for (name, size) in dim_names.iter().zip(sizes.iter()) {
        if !target.contains(name) && *size > 1 {
            return Err(EftsError::NonDegenerateDrop(name.clone()));
        }
    }

    // Permutation putting the target axes first, dropped axes last.
    let mut perm: Vec<usize> = target
        .iter()
        .map(|n| dim_names.iter().position(|d| d == n).unwrap())
        .collect();
    for (i, name) in dim_names.iter().enumerate() {
        if !target.contains(name) {
            perm.push(i);
        }
    }

    let target_shape: Vec<usize> = perm[..target.len()]
        .iter()
        .map(|&i| sizes[i])
        .collect();

    let reordered = x.values().view().permuted_axes(perm);
    // The reshape below both squeezes the trailing degenerate axes and
    // materialises requested size-1 axes, since the element count is
    // unchanged by dropping size-1 axes.
    let reduced = reordered
        .as_standard_layout()
        .to_owned()
        .into_shape(IxDyn(&target_shape))
        .map_err(|e| EftsError::Conversion(e.to_string()))?;

    NamedArray::new(reduced, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conventions::{
        ENS_MEMBER_DIMNAME, LEAD_TIME_DIMNAME, STATION_DIMNAME, TIME_DIMNAME,
    };

    fn named(shape: &[usize], names: &[&str]) -> NamedArray {
        let n: usize = shape.iter().product();
        let data = ArrayD::from_shape_vec(IxDyn(shape), (0..n).map(|v| v as f64).collect())
            .unwrap();
        NamedArray::new(data, names.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    #[test]
    fn splice_default_order() {
        let spliced = splice_dims(&[3, 2, 10, 31], &[]).unwrap();
        assert_eq!(
            spliced,
            vec![
                (LEAD_TIME_DIMNAME.to_string(), 3),
                (STATION_DIMNAME.to_string(), 2),
                (ENS_MEMBER_DIMNAME.to_string(), 10),
                (TIME_DIMNAME.to_string(), 31),
            ]
        );
    }

    #[test]
    fn splice_subset_keeps_requested_order() {
        let spliced = splice_dims(&[3, 2, 10, 31], &[TIME_DIMNAME, STATION_DIMNAME]).unwrap();
        assert_eq!(
            spliced,
            vec![
                (TIME_DIMNAME.to_string(), 31),
                (STATION_DIMNAME.to_string(), 2),
            ]
        );
    }

    #[test]
    fn splice_rejects_wrong_length() {
        let result = splice_dims(&[1, 2, 3], &[]);
        assert!(matches!(
            result,
            Err(EftsError::DimensionCount {
                expected: 4,
                got: 3
            })
        ));
    }

    #[test]
    fn splice_rejects_unknown_names() {
        let result = splice_dims(&[1, 2, 3, 4], &["level", TIME_DIMNAME]);
        match result {
            Err(EftsError::InvalidDimensions(names)) => assert_eq!(names, "level"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn named_array_rejects_rank_mismatch() {
        let data = ArrayD::zeros(IxDyn(&[2, 3]));
        let result = NamedArray::new(data, vec!["a".to_string()]);
        assert!(matches!(result, Err(EftsError::DimNamesMismatch { .. })));
    }

    #[test]
    fn named_array_rejects_duplicate_names() {
        let data = ArrayD::zeros(IxDyn(&[2, 2]));
        let result = NamedArray::new(data, vec!["a".to_string(), "a".to_string()]);
        assert!(matches!(result, Err(EftsError::DuplicateDimNames(_))));
    }

    #[test]
    fn reduce_reorders_and_drops_degenerate() {
        // [lead_time=1, station=2, ens_member=1, time=3]
        let x = named(
            &[1, 2, 1, 3],
            &[
                LEAD_TIME_DIMNAME,
                STATION_DIMNAME,
                ENS_MEMBER_DIMNAME,
                TIME_DIMNAME,
            ],
        );
        let y = reduce_dimensions(&x, Some(&[TIME_DIMNAME, STATION_DIMNAME])).unwrap();
        assert_eq!(y.shape(), &[3, 2]);
        assert_eq!(y.dim_names(), &[TIME_DIMNAME, STATION_DIMNAME]);
        // Input value at [0, s, 0, t] must land at [t, s].
        for s in 0..2 {
            for t in 0..3 {
                assert_eq!(y.values()[[t, s]], x.values()[[0, s, 0, t]]);
            }
        }
    }

    #[test]
    fn reduce_default_target_drops_all_degenerate() {
        let x = named(&[1, 2, 1, 3], &["a", "b", "c", "d"]);
        let y = reduce_dimensions(&x, None).unwrap();
        assert_eq!(y.dim_names(), &["b", "d"]);
        assert_eq!(y.shape(), &[2, 3]);
    }

    #[test]
    fn reduce_keeps_explicit_degenerate() {
        // A squeeze would remove the size-1 ens_member axis. Asking for
        // it explicitly must keep it as a real axis.
        let x = named(
            &[2, 1, 3],
            &[LEAD_TIME_DIMNAME, ENS_MEMBER_DIMNAME, TIME_DIMNAME],
        );
        let y = reduce_dimensions(
            &x,
            Some(&[LEAD_TIME_DIMNAME, ENS_MEMBER_DIMNAME, TIME_DIMNAME]),
        )
        .unwrap();
        assert_eq!(y.shape(), &[2, 1, 3]);
        assert_eq!(
            y.dim_names(),
            &[LEAD_TIME_DIMNAME, ENS_MEMBER_DIMNAME, TIME_DIMNAME]
        );
    }

    #[test]
    fn reduce_round_trip_recovers_values() {
        let x = named(&[2, 1, 3], &["a", "b", "c"]);
        let y = reduce_dimensions(&x, Some(&["c", "a"])).unwrap();
        // Re-expand to the original axes and compare.
        let back = reduce_dimensions(&y, Some(&["a", "c"])).unwrap();
        for i in 0..2 {
            for k in 0..3 {
                assert_eq!(back.values()[[i, k]], x.values()[[i, 0, k]]);
            }
        }
    }

    #[test]
    fn reduce_rejects_unknown_target() {
        let x = named(&[2, 3], &["a", "b"]);
        let result = reduce_dimensions(&x, Some(&["a", "z"]));
        match result {
            Err(EftsError::UnknownDimNames(names)) => assert_eq!(names, "z"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn reduce_refuses_to_drop_non_degenerate() {
        let x = named(&[2, 3], &["a", "b"]);
        let result = reduce_dimensions(&x, Some(&["a"]));
        assert!(matches!(result, Err(EftsError::NonDegenerateDrop(name)) if name == "b"));
    }

    #[test]
    fn slice_axis_windows_one_axis() {
        let mut x = named(&[4, 3], &["a", "b"]);
        x.slice_axis("a", 1, 2).unwrap();
        assert_eq!(x.shape(), &[2, 3]);
        assert_eq!(x.values()[[0, 0]], 3.0);
    }

    #[test]
    fn slice_axis_rejects_out_of_range() {
        let mut x = named(&[4, 3], &["a", "b"]);
        assert!(x.slice_axis("a", 3, 2).is_err());
        assert!(x.slice_axis("z", 0, 1).is_err());
    }
}
