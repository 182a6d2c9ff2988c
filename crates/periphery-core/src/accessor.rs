//! Typed storage and write accessors.
//!
//! Each field binds one [`Storage`] arm (how to read the current value) and
//! one [`Setter`] arm (how to write a new one). Both take the owning
//! aggregate explicitly, so the host type system checks every call; the
//! dispatch table in [`kind`](crate::kind) only has to check that the arms
//! chosen at definition time agree with the field kind.

use crate::error::ParamResult;
use crate::kind::{AccessorShape, ElementKind, FieldKind};
use crate::provider::Child;

/// Read access to a field's current value.
///
/// Array arms return a slice whose length is the current element count.
pub enum Storage<O> {
    /// Flag.
    Bool(fn(&O) -> bool),
    /// 32-bit integer.
    Int(fn(&O) -> i32),
    /// 64-bit integer.
    Long(fn(&O) -> i64),
    /// Float.
    Float(fn(&O) -> f64),
    /// Text (strings, file names, enumerated names).
    Str(fn(&O) -> &str),
    /// Fixed boolean array.
    BoolArray(fn(&O) -> &[bool]),
    /// Fixed integer array.
    IntArray(fn(&O) -> &[i32]),
    /// Fixed float array.
    FloatArray(fn(&O) -> &[f64]),
    /// Fixed string or name array.
    StrArray(fn(&O) -> &[String]),
    /// Row-major float table and its column count.
    FloatMatrix(fn(&O) -> (&[f64], usize)),
    /// Growable float array: the current view and the backing vector.
    DynFloatArray {
        /// Current elements.
        view: fn(&O) -> &[f64],
        /// Backing store grown by the dispatcher before an out-of-range write.
        backing: fn(&mut O) -> &mut Vec<f64>,
    },
    /// Nested lists of a handle-kind field; `None` when nothing is attached.
    Child(fn(&O) -> Option<Child>),
}

impl<O> Clone for Storage<O> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<O> Copy for Storage<O> {}

impl<O> Storage<O> {
    /// Whether this storage arm can back a field of `kind`.
    pub fn fits(&self, kind: &FieldKind) -> bool {
        match (self, kind) {
            (Storage::Bool(_), FieldKind::Bool)
            | (Storage::Int(_), FieldKind::Int)
            | (Storage::Long(_), FieldKind::Long)
            | (Storage::Float(_), FieldKind::Float)
            | (Storage::Str(_), FieldKind::Str | FieldKind::FileName { .. } | FieldKind::Name(_))
            | (Storage::BoolArray(_), FieldKind::Array(ElementKind::Bool))
            | (Storage::IntArray(_), FieldKind::Array(ElementKind::Int))
            | (Storage::FloatArray(_), FieldKind::Array(ElementKind::Float))
            | (
                Storage::StrArray(_),
                FieldKind::Array(ElementKind::Str | ElementKind::Name(_)),
            )
            | (Storage::FloatMatrix(_), FieldKind::FloatMatrix)
            | (Storage::DynFloatArray { .. }, FieldKind::DynFloatArray) => true,
            (Storage::Child(_), kind) => kind.is_handle(),
            _ => false,
        }
    }

    /// Short name of the arm, for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Storage::Bool(_) => "bool storage",
            Storage::Int(_) => "int storage",
            Storage::Long(_) => "long storage",
            Storage::Float(_) => "float storage",
            Storage::Str(_) => "string storage",
            Storage::BoolArray(_) => "bool array storage",
            Storage::IntArray(_) => "int array storage",
            Storage::FloatArray(_) => "float array storage",
            Storage::StrArray(_) => "string array storage",
            Storage::FloatMatrix(_) => "matrix storage",
            Storage::DynFloatArray { .. } => "dynamic array storage",
            Storage::Child(_) => "handle storage",
        }
    }

    /// Current element count of an array arm, `None` for scalars and handles.
    pub fn element_count(&self, owner: &O) -> Option<usize> {
        match self {
            Storage::BoolArray(get) => Some(get(owner).len()),
            Storage::IntArray(get) => Some(get(owner).len()),
            Storage::FloatArray(get) => Some(get(owner).len()),
            Storage::StrArray(get) => Some(get(owner).len()),
            Storage::DynFloatArray { view, .. } => Some(view(owner).len()),
            Storage::FloatMatrix(get) => Some(get(owner).0.len()),
            _ => None,
        }
    }
}

/// Write access to a field.
///
/// The owner is always the first argument. Accessors validate the value and
/// return [`ParamError::rejected`](crate::ParamError::rejected) to refuse it.
pub enum Setter<O> {
    /// Flag.
    Bool(fn(&mut O, bool) -> ParamResult<()>),
    /// 32-bit integer.
    Int(fn(&mut O, i32) -> ParamResult<()>),
    /// 64-bit integer.
    Long(fn(&mut O, i64) -> ParamResult<()>),
    /// Float.
    Float(fn(&mut O, f64) -> ParamResult<()>),
    /// Text; enumerated names arrive in canonical spelling.
    Str(fn(&mut O, &str) -> ParamResult<()>),
    /// One element of a boolean array.
    BoolAt(fn(&mut O, usize, bool) -> ParamResult<()>),
    /// One element of an integer array.
    IntAt(fn(&mut O, usize, i32) -> ParamResult<()>),
    /// One element of a float array.
    FloatAt(fn(&mut O, usize, f64) -> ParamResult<()>),
    /// One element of a string or name array.
    StrAt(fn(&mut O, usize, &str) -> ParamResult<()>),
    /// One cell of a float table.
    FloatAt2(fn(&mut O, usize, usize, f64) -> ParamResult<()>),
    /// Handle-kind fields take no value.
    Handle,
}

impl<O> Clone for Setter<O> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<O> Copy for Setter<O> {}

impl<O> Setter<O> {
    /// Call signature of this arm.
    pub fn shape(&self) -> AccessorShape {
        match self {
            Setter::Bool(_) => AccessorShape::Bool,
            Setter::Int(_) => AccessorShape::Int,
            Setter::Long(_) => AccessorShape::Long,
            Setter::Float(_) => AccessorShape::Float,
            Setter::Str(_) => AccessorShape::Str,
            Setter::BoolAt(_) => AccessorShape::BoolAt,
            Setter::IntAt(_) => AccessorShape::IntAt,
            Setter::FloatAt(_) => AccessorShape::FloatAt,
            Setter::StrAt(_) => AccessorShape::StrAt,
            Setter::FloatAt2(_) => AccessorShape::FloatAt2,
            Setter::Handle => AccessorShape::Handle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::NameSpec;

    struct Block {
        gain: f64,
        coeffs: Vec<f64>,
    }

    fn set_gain(b: &mut Block, v: f64) -> ParamResult<()> {
        b.gain = v;
        Ok(())
    }

    #[test]
    fn storage_fits_matching_kinds_only() {
        let gain: Storage<Block> = Storage::Float(|b| b.gain);
        assert!(gain.fits(&FieldKind::Float));
        assert!(!gain.fits(&FieldKind::Int));
        assert!(!gain.fits(&FieldKind::Array(ElementKind::Float)));

        let names: Storage<Block> = Storage::StrArray(|_| &[]);
        assert!(names.fits(&FieldKind::Array(ElementKind::Name(NameSpec::new(&["a"])))));
        assert!(!names.fits(&FieldKind::Str));
    }

    #[test]
    fn element_count_reads_slice_length() {
        let block = Block {
            gain: 0.0,
            coeffs: vec![1.0, 2.0, 3.0],
        };
        let coeffs: Storage<Block> = Storage::FloatArray(|b| &b.coeffs);
        assert_eq!(coeffs.element_count(&block), Some(3));
        let gain: Storage<Block> = Storage::Float(|b| b.gain);
        assert_eq!(gain.element_count(&block), None);
    }

    #[test]
    fn setter_shape_names_arm() {
        let s: Setter<Block> = Setter::Float(set_gain);
        assert_eq!(s.shape(), AccessorShape::Float);
        assert_eq!(Setter::<Block>::Handle.shape(), AccessorShape::Handle);
    }
}
