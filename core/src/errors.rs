//! Error types for the array codecs and the object-graph engine.
//!
//! Every failure is terminal for the encode or decode call that raised it:
//! nothing here is retried, and no partially restored value is returned.

use thiserror::Error;

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// A descriptor names an element type that cannot be constructed.
    #[error("unknown element type `{name}`")]
    UnknownElementType { name: String },

    /// A structured descriptor literal could not be parsed or describes an
    /// impossible layout.
    #[error("malformed type descriptor `{descriptor}`: {reason}")]
    MalformedTypeDescriptor { descriptor: String, reason: String },

    /// Element counts disagree (reshape, explicit element lists).
    #[error("shape mismatch: expected {expected} elements, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// A nested-value payload is not rectangular.
    #[error("ragged nested values at depth {depth}")]
    RaggedNesting { depth: usize },

    /// `product(shape)` overflowed `usize`, or its byte count exceeds
    /// `isize::MAX`.
    #[error("shape element count overflow")]
    ShapeOverflow,

    #[error("cannot allocate {bytes} bytes")]
    Allocation { bytes: usize },

    /// The raw buffer length does not equal `product(shape) * itemsize`.
    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Raised under the `raise` alias policy for views over storage that
    /// cannot be serialized by reference.
    #[error("array is defined by reference to an object that cannot be serialized")]
    UnsupportedAliasing,

    /// A view payload references a base that is not contiguous array storage.
    #[error("invalid base storage: {reason}")]
    InvalidBaseStorage { reason: String },

    /// A view would address bytes outside its base's storage.
    #[error("view spans bytes {lo}..{hi}, outside the {len} bytes of its base")]
    ViewOutOfBounds { lo: isize, hi: isize, len: usize },

    #[error("index {index:?} is out of bounds for shape {shape:?}")]
    IndexOutOfBounds { index: Vec<usize>, shape: Vec<usize> },

    #[error("axis {axis} is out of range for an array of dimension {ndim}")]
    InvalidAxis { axis: usize, ndim: usize },

    #[error("slice step cannot be zero")]
    ZeroStep,

    /// An element does not fit the declared element type.
    #[error("element {found} does not fit dtype {dtype}")]
    ElementMismatch { dtype: String, found: String },

    #[error("missing field `{field}`")]
    MissingField { field: &'static str },

    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// A codec received a value of a kind it does not handle.
    #[error("expected {expected} value")]
    UnexpectedValue { expected: &'static str },

    #[error("no codec registered for `{tag}`")]
    UnregisteredType { tag: &'static str },

    #[error("reference to object {id} before it was restored")]
    DanglingReference { id: u64 },

    #[error("dictionary key `{key}` is reserved")]
    ReservedKey { key: String },

    #[error("text decoding failed: {0}")]
    TextDecoding(String),

    #[error("compression failed")]
    Compression(#[source] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn malformed(descriptor: &str, reason: impl Into<String>) -> Self {
        Error::MalformedTypeDescriptor {
            descriptor: descriptor.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_field(field: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}
