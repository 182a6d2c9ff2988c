//! Field lists and the owner capability they describe.
//!
//! A [`FieldList`] is created once, with a fixed number of slots, when its
//! owner is constructed; each slot is then populated with
//! [`define`](FieldList::define). Lists of different owner types are
//! type-erased behind [`ParList`] so that module graphs can nest them freely.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::accessor::{Setter, Storage};
use crate::error::{ParamError, ParamResult};
use crate::field::{FieldDescriptor, FieldMeta};
use crate::kind::{FieldKind, OwnerKind, expected_shape};
use crate::provider::Child;
use crate::render::Rendered;

/// Shared, single-threaded handle to an aggregate.
pub type Shared<T> = Rc<RefCell<T>>;

/// Type-erased handle to a field list of any owner kind.
pub type ListRef = Rc<RefCell<dyn ParList>>;

/// Wrap a value in a [`Shared`] handle.
pub fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

/// Release a list and null the caller's reference. Safe to call repeatedly.
pub fn destroy(list: &mut Option<ListRef>) {
    list.take();
}

/// Aggregate that owns a field list.
///
/// The dirty flag and the regeneration step belong to the aggregate, so a
/// list never carries a copy that could disagree with its owner.
pub trait ParamOwner: 'static {
    /// Kind of lists describing this owner.
    const KIND: OwnerKind;

    /// Whether derived state is stale.
    fn is_dirty(&self) -> bool {
        false
    }

    /// Mark derived state stale or fresh.
    fn set_dirty(&mut self, dirty: bool) {
        let _ = dirty;
    }

    /// Rebuild derived state from the current fields.
    fn regenerate(&mut self) -> ParamResult<()> {
        Ok(())
    }

    /// Consistency check run after regeneration.
    fn check(&self) -> ParamResult<()> {
        Ok(())
    }

    /// Secondary hook run after every successful write.
    fn written(&mut self) {}
}

/// Ordered, fixed-size set of field descriptors describing one owner.
pub struct FieldList<O: ParamOwner> {
    pub(crate) owner: Shared<O>,
    pub(crate) fields: Vec<Option<FieldDescriptor<O>>>,
    panel_lookup: Option<fn(usize) -> Option<&'static str>>,
}

impl<O: ParamOwner> FieldList<O> {
    /// Allocate `field_count` empty slots describing `owner`.
    ///
    /// A block without parameters has no list: `field_count == 0` yields
    /// `Ok(None)`.
    pub fn create(owner: Shared<O>, field_count: usize) -> ParamResult<Option<Self>> {
        if field_count == 0 {
            return Ok(None);
        }
        let mut fields = Vec::new();
        fields
            .try_reserve_exact(field_count)
            .map_err(|_| ParamError::Allocation {
                requested: field_count,
            })?;
        fields.resize_with(field_count, || None);
        Ok(Some(Self {
            owner,
            fields,
            panel_lookup: None,
        }))
    }

    /// Populate slot `index`.
    ///
    /// The (owner kind, field kind) pair selects the accessor shape from the
    /// dispatch table; `storage` and `setter` must both match it.
    pub fn define(
        &mut self,
        index: usize,
        name: &'static str,
        description: &'static str,
        kind: FieldKind,
        storage: Storage<O>,
        setter: Setter<O>,
    ) -> ParamResult<&mut FieldDescriptor<O>> {
        let len = self.fields.len();
        let slot = self
            .fields
            .get_mut(index)
            .ok_or(ParamError::NoSuchIndex { index, len })?;
        if let Some(existing) = slot {
            return Err(ParamError::AlreadyDefined {
                index,
                name: existing.meta.name,
            });
        }
        let expected = expected_shape(O::KIND, &kind).ok_or(ParamError::KindNotAllowed {
            field: name,
            kind: kind.name(),
            owner: O::KIND,
        })?;
        if setter.shape() != expected {
            return Err(ParamError::ShapeMismatch {
                field: name,
                kind: kind.name(),
                expected: expected.name(),
                found: setter.shape().name(),
            });
        }
        if !storage.fits(&kind) {
            return Err(ParamError::ShapeMismatch {
                field: name,
                kind: kind.name(),
                expected: expected.name(),
                found: storage.name(),
            });
        }
        let meta = FieldMeta {
            index,
            owner_kind: O::KIND,
            name,
            alt_name: None,
            description,
            kind,
            enabled: true,
        };
        Ok(slot.insert(FieldDescriptor::new(meta, storage, setter)))
    }

    /// Handle to the described aggregate.
    pub fn owner(&self) -> &Shared<O> {
        &self.owner
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Always false: empty lists are represented by `None`.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Descriptor in slot `index`.
    pub fn descriptor(&self, index: usize) -> ParamResult<&FieldDescriptor<O>> {
        self.fields
            .get(index)
            .ok_or(ParamError::NoSuchIndex {
                index,
                len: self.fields.len(),
            })?
            .as_ref()
            .ok_or(ParamError::Undefined(index))
    }

    /// Whether the owner's derived state is stale.
    pub fn is_dirty(&self) -> bool {
        self.owner.try_borrow().is_ok_and(|o| o.is_dirty())
    }

    /// Register the host-UI grouping callback.
    pub fn set_panel_lookup(&mut self, lookup: fn(usize) -> Option<&'static str>) {
        self.panel_lookup = Some(lookup);
    }

    /// Enable or disable a field explicitly.
    pub fn set_enabled(&mut self, index: usize, enabled: bool) -> ParamResult<()> {
        let len = self.fields.len();
        let field = self
            .fields
            .get_mut(index)
            .ok_or(ParamError::NoSuchIndex { index, len })?
            .as_mut()
            .ok_or(ParamError::Undefined(index))?;
        field.meta.enabled = enabled;
        Ok(())
    }

    /// Re-evaluate every field's enable condition against the owner.
    pub fn refresh_enabled(&mut self) -> ParamResult<()> {
        let owner = self
            .owner
            .try_borrow()
            .map_err(|_| ParamError::Busy(O::KIND.name()))?;
        for field in self.fields.iter_mut().flatten() {
            if let Some(condition) = field.condition {
                field.meta.enabled = condition(&owner);
            }
        }
        Ok(())
    }

    /// Wrap into a type-erased [`ListRef`].
    pub fn into_ref(self) -> ListRef {
        Rc::new(RefCell::new(self))
    }

    pub(crate) fn child_of(&self, index: usize) -> ParamResult<Option<Child>> {
        let field = self.descriptor(index)?;
        match field.storage {
            Storage::Child(get) => {
                let owner = self
                    .owner
                    .try_borrow()
                    .map_err(|_| ParamError::Busy(O::KIND.name()))?;
                Ok(get(&owner))
            }
            _ => Ok(None),
        }
    }
}

impl<O: ParamOwner> fmt::Debug for FieldList<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self
            .fields
            .iter()
            .map(|slot| slot.as_ref().map_or("<undefined>", |d| d.meta.name))
            .collect();
        f.debug_struct("FieldList")
            .field("owner_kind", &O::KIND)
            .field("fields", &names)
            .finish()
    }
}

/// Object-safe view of a [`FieldList`] of any owner type.
pub trait ParList {
    /// Kind of the described owner.
    fn owner_kind(&self) -> OwnerKind;

    /// Number of slots.
    fn len(&self) -> usize;

    /// Whether the list has no slots.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Metadata of slot `index`; `None` for undefined slots.
    fn meta(&self, index: usize) -> Option<&FieldMeta>;

    /// Nested lists behind a handle-kind field.
    fn child(&self, index: usize) -> ParamResult<Option<Child>>;

    /// Indices used by the most recent write to an array field.
    fn last_index(&self, index: usize) -> Option<[usize; 2]>;

    /// Parse `text` and write it through the field's accessor.
    fn set_by_index(&mut self, index: usize, text: &str) -> ParamResult<()>;

    /// Whether the owner's derived state is stale.
    fn is_dirty(&self) -> bool;

    /// Run the regeneration protocol for this list.
    fn validate(&mut self) -> ParamResult<()>;

    /// Current value of a field, formatted for a parameter file.
    fn rendered(&self, index: usize) -> ParamResult<Rendered>;

    /// Enable or disable a field explicitly.
    fn set_enabled(&mut self, index: usize, enabled: bool) -> ParamResult<()>;

    /// Host-UI grouping of a field.
    fn panel(&self, index: usize) -> Option<&'static str>;
}

impl fmt::Debug for dyn ParList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParList")
            .field("owner_kind", &self.owner_kind())
            .field("len", &self.len())
            .finish()
    }
}

impl<O: ParamOwner> ParList for FieldList<O> {
    fn owner_kind(&self) -> OwnerKind {
        O::KIND
    }

    fn len(&self) -> usize {
        self.fields.len()
    }

    fn meta(&self, index: usize) -> Option<&FieldMeta> {
        self.fields.get(index)?.as_ref().map(|d| &d.meta)
    }

    fn child(&self, index: usize) -> ParamResult<Option<Child>> {
        self.child_of(index)
    }

    fn last_index(&self, index: usize) -> Option<[usize; 2]> {
        self.fields.get(index)?.as_ref().map(|d| d.last_index)
    }

    fn set_by_index(&mut self, index: usize, text: &str) -> ParamResult<()> {
        self.apply(index, text)
    }

    fn is_dirty(&self) -> bool {
        FieldList::is_dirty(self)
    }

    fn validate(&mut self) -> ParamResult<()> {
        self.regenerate_list()
    }

    fn rendered(&self, index: usize) -> ParamResult<Rendered> {
        self.format_field(index)
    }

    fn set_enabled(&mut self, index: usize, enabled: bool) -> ParamResult<()> {
        FieldList::set_enabled(self, index, enabled)
    }

    fn panel(&self, index: usize) -> Option<&'static str> {
        self.panel_lookup.and_then(|lookup| lookup(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::ElementKind;

    #[derive(Default)]
    struct Block {
        order: i32,
        coeffs: Vec<f64>,
    }

    impl ParamOwner for Block {
        const KIND: OwnerKind = OwnerKind::Module;
    }

    fn set_order(b: &mut Block, v: i32) -> ParamResult<()> {
        b.order = v;
        Ok(())
    }

    fn set_coeff(b: &mut Block, i: usize, v: f64) -> ParamResult<()> {
        b.coeffs[i] = v;
        Ok(())
    }

    fn coeffs(b: &Block) -> &[f64] {
        &b.coeffs
    }

    #[test]
    fn zero_fields_is_no_list() {
        let list = FieldList::create(shared(Block::default()), 0).unwrap();
        assert!(list.is_none());
    }

    #[test]
    fn slots_start_undefined() {
        let list = FieldList::create(shared(Block::default()), 2)
            .unwrap()
            .unwrap();
        assert_eq!(list.len(), 2);
        assert!(matches!(list.descriptor(1), Err(ParamError::Undefined(1))));
        assert!(ParList::meta(&list, 0).is_none());
    }

    #[test]
    fn define_stamps_index_and_owner_kind() {
        let mut list = FieldList::create(shared(Block::default()), 2)
            .unwrap()
            .unwrap();
        list.define(
            1,
            "ORDER",
            "Filter order.",
            FieldKind::Int,
            Storage::Int(|b| b.order),
            Setter::Int(set_order),
        )
        .unwrap();
        let meta = ParList::meta(&list, 1).unwrap();
        assert_eq!(meta.index, 1);
        assert_eq!(meta.owner_kind, OwnerKind::Module);
        assert!(meta.enabled);
    }

    #[test]
    fn define_rejects_mismatched_setter() {
        let mut list = FieldList::create(shared(Block::default()), 1)
            .unwrap()
            .unwrap();
        let err = list
            .define(
                0,
                "COEFF",
                "Coefficients.",
                FieldKind::Array(ElementKind::Float),
                Storage::FloatArray(coeffs),
                Setter::Int(set_order),
            )
            .unwrap_err();
        assert!(matches!(err, ParamError::ShapeMismatch { .. }), "{err}");
    }

    #[test]
    fn define_rejects_mismatched_storage() {
        let mut list = FieldList::create(shared(Block::default()), 1)
            .unwrap()
            .unwrap();
        let err = list
            .define(
                0,
                "COEFF",
                "Coefficients.",
                FieldKind::Array(ElementKind::Float),
                Storage::Int(|b| b.order),
                Setter::FloatAt(set_coeff),
            )
            .unwrap_err();
        assert!(matches!(err, ParamError::ShapeMismatch { .. }), "{err}");
    }

    #[test]
    fn define_twice_fails() {
        let mut list = FieldList::create(shared(Block::default()), 1)
            .unwrap()
            .unwrap();
        list.define(
            0,
            "ORDER",
            "",
            FieldKind::Int,
            Storage::Int(|b| b.order),
            Setter::Int(set_order),
        )
        .unwrap();
        let err = list
            .define(
                0,
                "ORDER",
                "",
                FieldKind::Int,
                Storage::Int(|b| b.order),
                Setter::Int(set_order),
            )
            .unwrap_err();
        assert_eq!(
            err,
            ParamError::AlreadyDefined {
                index: 0,
                name: "ORDER"
            }
        );
    }

    #[test]
    fn destroy_is_idempotent() {
        let list = FieldList::create(shared(Block::default()), 1)
            .unwrap()
            .unwrap();
        let mut handle = Some(list.into_ref());
        destroy(&mut handle);
        assert!(handle.is_none());
        destroy(&mut handle);
        assert!(handle.is_none());
    }

    #[test]
    fn panel_lookup_is_optional() {
        let mut list = FieldList::create(shared(Block::default()), 1)
            .unwrap()
            .unwrap();
        assert_eq!(ParList::panel(&list, 0), None);
        list.set_panel_lookup(|i| if i == 0 { Some("Filter") } else { None });
        assert_eq!(ParList::panel(&list, 0), Some("Filter"));
    }
}
