use core::cell::{Ref, RefCell, RefMut};
use core::fmt;
use std::rc::Rc;

use crate::errors::{Error, Result};

/// Reference-counted byte storage shared by an array and all views over it.
///
/// The storage lives until the last array (or foreign holder) referencing it
/// is dropped.
#[derive(Clone, Default)]
pub struct Buffer(Rc<RefCell<Vec<u8>>>);

impl Buffer {
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Buffer(Rc::new(RefCell::new(bytes)))
    }

    pub fn zeroed(len: usize) -> Result<Self> {
        zeroed_bytes(len).map(Self::from_vec)
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when both handles refer to the same storage.
    pub fn ptr_eq(&self, other: &Buffer) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn borrow(&self) -> Ref<'_, [u8]> {
        Ref::map(self.0.borrow(), Vec::as_slice)
    }

    pub fn borrow_mut(&self) -> RefMut<'_, [u8]> {
        RefMut::map(self.0.borrow_mut(), Vec::as_mut_slice)
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.borrow().clone()
    }
}

/// `len` zero bytes, failing instead of aborting when the allocation is
/// refused.
pub(crate) fn zeroed_bytes(len: usize) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    bytes
        .try_reserve_exact(len)
        .map_err(|_| Error::Allocation { bytes: len })?;
    bytes.resize(len, 0);
    Ok(bytes)
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("ptr", &Rc::as_ptr(&self.0))
            .field("len", &self.len())
            .finish()
    }
}
