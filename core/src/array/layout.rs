//! Stride, contiguity and bounds arithmetic.
//!
//! All strides and offsets here are in bytes.

use smallvec::SmallVec;

use crate::errors::{Error, Result};

pub type Shape = SmallVec<[usize; 4]>;
pub type Strides = SmallVec<[isize; 4]>;

/// Memory layout of contiguous storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Order {
    /// Row-major: the last index varies fastest.
    #[default]
    C,
    /// Column-major: the first index varies fastest.
    F,
}

pub fn element_count(shape: &[usize]) -> Result<usize> {
    shape
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .ok_or(Error::ShapeOverflow)
}

/// Total bytes of `shape` items of `itemsize` bytes. Byte counts must stay
/// within `isize::MAX` so every stride and offset is representable.
pub fn byte_len(shape: &[usize], itemsize: usize) -> Result<usize> {
    element_count(shape)?
        .checked_mul(itemsize)
        .filter(|&len| len <= isize::MAX as usize)
        .ok_or(Error::ShapeOverflow)
}

/// Strides of a contiguous array of `shape` laid out in `order`.
pub fn standard_strides(shape: &[usize], itemsize: usize, order: Order) -> Strides {
    let mut strides: Strides = SmallVec::from_elem(0, shape.len());
    let mut step = itemsize as isize;
    let mut assign = |i: usize| {
        strides[i] = step;
        step = step.saturating_mul(shape[i].max(1) as isize);
    };
    match order {
        Order::C => (0..shape.len()).rev().for_each(&mut assign),
        Order::F => (0..shape.len()).for_each(&mut assign),
    }
    strides
}

fn is_contiguous_in(shape: &[usize], strides: &[isize], itemsize: usize, order: Order) -> bool {
    if shape.contains(&0) {
        return true;
    }
    let mut expected = itemsize as isize;
    let mut check = |i: usize| {
        // Axes of length one never move the pointer.
        if shape[i] == 1 {
            return true;
        }
        let ok = strides[i] == expected;
        expected = expected.saturating_mul(shape[i] as isize);
        ok
    };
    match order {
        Order::C => (0..shape.len()).rev().all(&mut check),
        Order::F => (0..shape.len()).all(&mut check),
    }
}

pub fn is_c_contiguous(shape: &[usize], strides: &[isize], itemsize: usize) -> bool {
    is_contiguous_in(shape, strides, itemsize, Order::C)
}

pub fn is_f_contiguous(shape: &[usize], strides: &[isize], itemsize: usize) -> bool {
    is_contiguous_in(shape, strides, itemsize, Order::F)
}

/// Byte range `lo..hi`, relative to the first element, touched by every
/// valid index. `None` when the array has no elements.
pub fn byte_extent(shape: &[usize], strides: &[isize], itemsize: usize) -> Result<Option<(isize, isize)>> {
    if shape.contains(&0) {
        return Ok(None);
    }
    let mut lo = 0isize;
    let mut hi = itemsize as isize;
    for (&dim, &stride) in shape.iter().zip(strides) {
        let reach = stride
            .checked_mul(dim as isize - 1)
            .ok_or(Error::ShapeOverflow)?;
        if reach >= 0 {
            hi = hi.checked_add(reach).ok_or(Error::ShapeOverflow)?;
        } else {
            lo = lo.checked_add(reach).ok_or(Error::ShapeOverflow)?;
        }
    }
    Ok(Some((lo, hi)))
}

/// Check that an array starting at byte `offset` stays inside `region`.
pub fn check_bounds(
    offset: isize,
    shape: &[usize],
    strides: &[isize],
    itemsize: usize,
    region: (usize, usize),
) -> Result<()> {
    let Some((lo, hi)) = byte_extent(shape, strides, itemsize)? else {
        return Ok(());
    };
    let lo = offset.checked_add(lo).ok_or(Error::ShapeOverflow)?;
    let hi = offset.checked_add(hi).ok_or(Error::ShapeOverflow)?;
    if lo < region.0 as isize || hi > region.1 as isize {
        return Err(Error::ViewOutOfBounds {
            lo,
            hi,
            len: region.1 - region.0,
        });
    }
    Ok(())
}

/// Byte offsets, relative to the first element, of every element visited in
/// logical `order`.
pub fn element_offsets(shape: &[usize], strides: &[isize], order: Order) -> Vec<isize> {
    if shape.contains(&0) {
        return Vec::new();
    }
    let total: usize = shape.iter().product();
    let mut offsets = Vec::with_capacity(total);
    let mut index: Shape = SmallVec::from_elem(0, shape.len());
    let mut offset = 0isize;
    let axes: SmallVec<[usize; 4]> = match order {
        Order::C => (0..shape.len()).rev().collect(),
        Order::F => (0..shape.len()).collect(),
    };
    for _ in 0..total {
        offsets.push(offset);
        // Odometer step along the fastest axis first.
        for &axis in &axes {
            index[axis] += 1;
            offset += strides[axis];
            if index[axis] < shape[axis] {
                break;
            }
            offset -= strides[axis] * shape[axis] as isize;
            index[axis] = 0;
        }
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_strides() {
        assert_eq!(standard_strides(&[2, 3, 4], 8, Order::C).as_slice(), &[96, 32, 8]);
        assert_eq!(standard_strides(&[2, 3, 4], 8, Order::F).as_slice(), &[8, 16, 48]);
        assert!(standard_strides(&[], 4, Order::C).is_empty());
    }

    #[test]
    fn test_contiguity_ignores_unit_axes() {
        assert!(is_c_contiguous(&[1, 3], &[999, 4], 4));
        assert!(is_f_contiguous(&[3], &[4], 4));
        assert!(is_c_contiguous(&[3], &[4], 4));
        assert!(!is_c_contiguous(&[2, 3], &[4, 8], 4));
        assert!(is_f_contiguous(&[2, 3], &[4, 8], 4));
        assert!(is_c_contiguous(&[0, 3], &[0, 0], 4));
    }

    #[test]
    fn test_extent_with_negative_strides() {
        assert_eq!(byte_extent(&[3], &[-4], 4).unwrap(), Some((-8, 4)));
        assert_eq!(byte_extent(&[2, 2], &[16, 4], 4).unwrap(), Some((0, 24)));
        assert_eq!(byte_extent(&[0], &[4], 4).unwrap(), None);
    }

    #[test]
    fn test_bounds_rejects_overrun() {
        assert!(check_bounds(4, &[3], &[4], 4, (0, 16)).is_ok());
        assert!(matches!(
            check_bounds(8, &[3], &[4], 4, (0, 16)),
            Err(Error::ViewOutOfBounds { lo: 8, hi: 20, len: 16 })
        ));
        assert!(check_bounds(0, &[2], &[-4], 4, (0, 16)).is_err());
    }

    #[test]
    fn test_element_offsets_visit_in_logical_order() {
        let strides = standard_strides(&[2, 3], 1, Order::C);
        assert_eq!(element_offsets(&[2, 3], &strides, Order::C), [0, 1, 2, 3, 4, 5]);
        assert_eq!(element_offsets(&[2, 3], &strides, Order::F), [0, 3, 1, 4, 2, 5]);
        assert_eq!(element_offsets(&[], &[], Order::C), [0]);
        assert!(element_offsets(&[2, 0], &[0, 0], Order::C).is_empty());
    }
}
