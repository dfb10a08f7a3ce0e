//! Strided n-dimensional arrays over shared byte storage.
//!
//! An [`ArrayValue`] either owns its [`Buffer`] or is a view aliasing the
//! buffer of a [`Base`]. Views keep their base alive through the `Rc`, and
//! the base keeps the buffer alive, so storage is released only after its
//! last view.

mod buffer;
pub mod layout;

pub(crate) use buffer::zeroed_bytes;


use std::rc::Rc;

pub use buffer::Buffer;
pub use layout::{Order, Shape, Strides};

use crate::dtype::{DType, Element};
use crate::errors::{Error, Result};

/// What a view's storage belongs to.
#[derive(Debug, Clone)]
pub enum Base {
    /// Another array; serializable by reference.
    Array(Rc<ArrayValue>),
    /// A buffer-like object that is not an array.
    Foreign(Buffer),
}

#[derive(Debug, Clone)]
pub struct ArrayValue {
    dtype: DType,
    shape: Shape,
    strides: Strides,
    offset: usize,
    buffer: Buffer,
    base: Option<Base>,
}

impl ArrayValue {
    /// Build an array owning `bytes`, laid out contiguously in `order`.
    pub fn from_bytes(dtype: DType, shape: &[usize], order: Order, bytes: Vec<u8>) -> Result<Self> {
        let expected = layout::byte_len(shape, dtype.itemsize())?;
        if bytes.len() != expected {
            return Err(Error::BufferSizeMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        Ok(ArrayValue {
            strides: layout::standard_strides(shape, dtype.itemsize(), order),
            shape: Shape::from_slice(shape),
            offset: 0,
            buffer: Buffer::from_vec(bytes),
            base: None,
            dtype,
        })
    }

    pub fn zeros(dtype: DType, shape: &[usize], order: Order) -> Result<Self> {
        let len = layout::byte_len(shape, dtype.itemsize())?;
        Self::from_bytes(dtype, shape, order, zeroed_bytes(len)?)
    }

    /// Build an owned array from elements listed in logical row-major order.
    pub fn from_elements(
        dtype: DType,
        shape: &[usize],
        order: Order,
        elements: &[Element],
    ) -> Result<Self> {
        let count = layout::element_count(shape)?;
        if elements.len() != count {
            return Err(Error::ShapeMismatch {
                expected: count,
                actual: elements.len(),
            });
        }
        let array = Self::zeros(dtype, shape, order)?;
        {
            let itemsize = array.itemsize();
            let mut bytes = array.buffer.borrow_mut();
            for (offset, element) in array.byte_offsets(Order::C).into_iter().zip(elements) {
                array
                    .dtype
                    .write_element(element, &mut bytes[offset..offset + itemsize])?;
            }
        }
        Ok(array)
    }

    /// Wrap a buffer that does not belong to any array.
    ///
    /// The array aliases the buffer; encoding it cannot preserve that
    /// relationship.
    pub fn from_foreign(buffer: Buffer, dtype: DType, shape: &[usize], order: Order) -> Result<Self> {
        layout::byte_len(shape, dtype.itemsize())?;
        let strides = layout::standard_strides(shape, dtype.itemsize(), order);
        layout::check_bounds(0, shape, &strides, dtype.itemsize(), (0, buffer.len()))?;
        Ok(ArrayValue {
            dtype,
            shape: Shape::from_slice(shape),
            strides,
            offset: 0,
            base: Some(Base::Foreign(buffer.clone())),
            buffer,
        })
    }

    /// Create a view over `base`'s storage.
    ///
    /// `offset` is in bytes relative to `base`'s first element. Without
    /// explicit `strides` the view is contiguous in the base's order. Views
    /// addressing bytes outside the base fail with `ViewOutOfBounds`.
    pub fn view(
        base: &Rc<ArrayValue>,
        dtype: DType,
        shape: &[usize],
        offset: isize,
        strides: Option<&[isize]>,
    ) -> Result<Self> {
        // Zero strides pass the bound check for any shape.
        layout::byte_len(shape, dtype.itemsize())?;
        let strides = match strides {
            Some(strides) if strides.len() != shape.len() => {
                return Err(Error::ShapeMismatch {
                    expected: shape.len(),
                    actual: strides.len(),
                });
            }
            Some(strides) => Strides::from_slice(strides),
            None => layout::standard_strides(shape, dtype.itemsize(), base.order()),
        };
        let region = match base.extent()? {
            Some((lo, hi)) => (lo, hi),
            None => (base.offset, base.offset),
        };
        let start = (base.offset as isize)
            .checked_add(offset)
            .ok_or(Error::ShapeOverflow)?;
        layout::check_bounds(start, shape, &strides, dtype.itemsize(), region)?;
        // An empty view may sit anywhere; clamp so the stored offset is valid.
        let start = start.clamp(0, base.buffer.len() as isize) as usize;
        Ok(ArrayValue {
            dtype,
            shape: Shape::from_slice(shape),
            strides,
            offset: start,
            buffer: base.buffer.clone(),
            base: Some(Base::Array(base.clone())),
        })
    }

    /// Basic slicing along one axis, with Python semantics for negative and
    /// out-of-range bounds. Returns a view of `self`.
    pub fn slice(
        self: &Rc<Self>,
        axis: usize,
        start: Option<isize>,
        stop: Option<isize>,
        step: isize,
    ) -> Result<Self> {
        if axis >= self.ndim() {
            return Err(Error::InvalidAxis {
                axis,
                ndim: self.ndim(),
            });
        }
        if step == 0 {
            return Err(Error::ZeroStep);
        }
        let len = self.shape[axis] as isize;
        let (start, count) = slice_indices(len, start, stop, step);

        let mut shape = self.shape.clone();
        let mut strides = self.strides.clone();
        let offset = if count > 0 {
            self.offset as isize + start * self.strides[axis]
        } else {
            self.offset as isize
        };
        shape[axis] = count as usize;
        strides[axis] = self.strides[axis] * step;
        Ok(ArrayValue {
            dtype: self.dtype.clone(),
            shape,
            strides,
            offset: offset as usize,
            buffer: self.buffer.clone(),
            base: Some(self.view_base()),
        })
    }

    /// Reverse the axes. Returns a view of `self`.
    pub fn transpose(self: &Rc<Self>) -> Self {
        ArrayValue {
            dtype: self.dtype.clone(),
            shape: self.shape.iter().rev().copied().collect(),
            strides: self.strides.iter().rev().copied().collect(),
            offset: self.offset,
            buffer: self.buffer.clone(),
            base: Some(self.view_base()),
        }
    }

    /// An owned copy with a new shape, keeping the logical row-major element
    /// sequence and this array's layout order.
    pub fn reshape(&self, shape: &[usize]) -> Result<Self> {
        let count = layout::element_count(shape)?;
        if count != self.element_count() {
            return Err(Error::ShapeMismatch {
                expected: count,
                actual: self.element_count(),
            });
        }
        let order = self.order();
        let mut reshaped = Self::from_bytes(self.dtype.clone(), shape, Order::C, self.to_bytes(Order::C))?;
        if order == Order::F {
            reshaped = reshaped.to_contiguous(Order::F)?;
        }
        Ok(reshaped)
    }

    /// An independent owned copy laid out contiguously in `order`.
    pub fn to_contiguous(&self, order: Order) -> Result<Self> {
        Self::from_bytes(self.dtype.clone(), &self.shape, order, self.to_bytes(order))
    }

    pub fn dtype(&self) -> &DType {
        &self.dtype
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Per-axis byte strides.
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    /// Byte offset of the first element within the buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn itemsize(&self) -> usize {
        self.dtype.itemsize()
    }

    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn nbytes(&self) -> usize {
        self.element_count() * self.itemsize()
    }

    pub fn base(&self) -> Option<&Base> {
        self.base.as_ref()
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn shares_buffer_with(&self, other: &ArrayValue) -> bool {
        self.buffer.ptr_eq(&other.buffer)
    }

    pub fn is_c_contiguous(&self) -> bool {
        layout::is_c_contiguous(&self.shape, &self.strides, self.itemsize())
    }

    pub fn is_f_contiguous(&self) -> bool {
        layout::is_f_contiguous(&self.shape, &self.strides, self.itemsize())
    }

    pub fn is_contiguous(&self) -> bool {
        self.is_c_contiguous() || self.is_f_contiguous()
    }

    /// `F` only for arrays that are column-major and not also row-major.
    pub fn order(&self) -> Order {
        if self.is_f_contiguous() && !self.is_c_contiguous() {
            Order::F
        } else {
            Order::C
        }
    }

    /// The base recorded on views derived from `self`: the storage owner,
    /// never an intermediate view.
    fn view_base(self: &Rc<Self>) -> Base {
        match &self.base {
            Some(base) => base.clone(),
            None => Base::Array(self.clone()),
        }
    }

    /// Absolute byte range of the buffer touched by this array.
    fn extent(&self) -> Result<Option<(usize, usize)>> {
        let extent = layout::byte_extent(&self.shape, &self.strides, self.itemsize())?;
        Ok(extent.map(|(lo, hi)| {
            let start = self.offset as isize;
            ((start + lo) as usize, (start + hi) as usize)
        }))
    }

    /// Absolute byte offsets of every element in logical `order`.
    fn byte_offsets(&self, order: Order) -> Vec<usize> {
        layout::element_offsets(&self.shape, &self.strides, order)
            .into_iter()
            .map(|relative| (self.offset as isize + relative) as usize)
            .collect()
    }

    fn offset_of(&self, index: &[usize]) -> Result<usize> {
        if index.len() != self.ndim() || index.iter().zip(&self.shape).any(|(i, dim)| i >= dim) {
            return Err(Error::IndexOutOfBounds {
                index: index.to_vec(),
                shape: self.shape.to_vec(),
            });
        }
        let relative: isize = index
            .iter()
            .zip(&self.strides)
            .map(|(&i, &stride)| i as isize * stride)
            .sum();
        Ok((self.offset as isize + relative) as usize)
    }

    pub fn get(&self, index: &[usize]) -> Result<Element> {
        let offset = self.offset_of(index)?;
        let bytes = self.buffer.borrow();
        self.dtype.read_element(&bytes[offset..offset + self.itemsize()])
    }

    /// Write one element. Visible through every array sharing the buffer.
    pub fn set(&self, index: &[usize], element: &Element) -> Result<()> {
        let offset = self.offset_of(index)?;
        let mut bytes = self.buffer.borrow_mut();
        self.dtype
            .write_element(element, &mut bytes[offset..offset + self.itemsize()])
    }

    /// All elements in logical row-major order.
    pub fn elements(&self) -> Result<Vec<Element>> {
        let itemsize = self.itemsize();
        let bytes = self.buffer.borrow();
        self.byte_offsets(Order::C)
            .into_iter()
            .map(|offset| self.dtype.read_element(&bytes[offset..offset + itemsize]))
            .collect()
    }

    /// Raw element bytes gathered in `order`.
    pub fn to_bytes(&self, order: Order) -> Vec<u8> {
        let itemsize = self.itemsize();
        let bytes = self.buffer.borrow();
        let mut out = Vec::with_capacity(self.nbytes());
        for offset in self.byte_offsets(order) {
            out.extend_from_slice(&bytes[offset..offset + itemsize]);
        }
        out
    }
}

/// Normalize Python slice bounds: returns the first index and element count.
fn slice_indices(len: isize, start: Option<isize>, stop: Option<isize>, step: isize) -> (isize, isize) {
    let adjust = |bound: isize, lower: isize, upper: isize| {
        let bound = if bound < 0 { bound + len } else { bound };
        bound.clamp(lower, upper)
    };
    if step > 0 {
        let start = start.map_or(0, |s| adjust(s, 0, len));
        let stop = stop.map_or(len, |s| adjust(s, 0, len));
        let count = if stop > start { (stop - start + step - 1) / step } else { 0 };
        (start, count)
    } else {
        let start = start.map_or(len - 1, |s| adjust(s, -1, len - 1));
        let stop = stop.map_or(-1, |s| adjust(s, -1, len - 1));
        let count = if start > stop { (start - stop - step - 1) / -step } else { 0 };
        (start, count)
    }
}

impl PartialEq for ArrayValue {
    /// Value equality: dtype, shape, layout order and elements. Storage
    /// identity is not compared.
    fn eq(&self, other: &Self) -> bool {
        self.dtype == other.dtype
            && self.shape == other.shape
            && self.order() == other.order()
            && self.to_bytes(Order::C) == other.to_bytes(Order::C)
    }
}
