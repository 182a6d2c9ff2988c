//! Aggregates that expose nested field lists.
//!
//! Handle-kind fields resolve to a [`Child`]: either a nested module's list
//! directly, or an aggregate implementing [`ListProvider`]. The resolver,
//! the regeneration pass, and the renderer are all written once against
//! this capability instead of once per aggregate type.

use std::fmt;
use std::rc::Rc;

use crate::error::ParamResult;
use crate::field::FieldMeta;
use crate::list::ListRef;

/// One list exposed by an aggregate.
#[derive(Clone)]
pub struct SubList {
    /// The list itself.
    pub list: ListRef,
    /// Qualifier addressing this list in dotted names (script step label,
    /// collection element index). Unlabelled lists are searched transparently.
    pub label: Option<String>,
}

impl SubList {
    /// Unlabelled sub-list.
    pub fn new(list: ListRef) -> Self {
        Self { list, label: None }
    }

    /// Sub-list addressed by `label`.
    pub fn labelled(list: ListRef, label: impl Into<String>) -> Self {
        Self {
            list,
            label: Some(label.into()),
        }
    }
}

impl fmt::Debug for SubList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubList")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Capability of an aggregate that owns one or more field lists.
pub trait ListProvider {
    /// Banner text used when rendering.
    fn title(&self) -> String;

    /// Lists in search order. Implementations may materialise elements lazily.
    fn sub_lists(&self) -> ParamResult<Vec<SubList>>;

    /// Bring derived state up to date before the aggregate is used.
    fn validate(&self) -> ParamResult<()>;

    /// Whether the sub-list labelled `label` should take `value` for `field`
    /// when the name carried no qualifier. A refusal moves the write on to
    /// the next sub-list.
    fn accepts(&self, label: &str, field: &FieldMeta, value: &str) -> ParamResult<bool> {
        let _ = (label, field, value);
        Ok(true)
    }
}

/// What a handle-kind field points at.
#[derive(Clone)]
pub enum Child {
    /// A nested module's field list.
    List(ListRef),
    /// An aggregate exposing its own lists.
    Provider(Rc<dyn ListProvider>),
}

impl Child {
    /// Wrap an aggregate.
    pub fn provider<P: ListProvider + 'static>(provider: Rc<P>) -> Self {
        Child::Provider(provider)
    }

    /// Run the regeneration protocol on whatever this child holds.
    pub fn validate(&self) -> ParamResult<()> {
        match self {
            Child::List(list) => crate::validate::validate(list),
            Child::Provider(provider) => provider.validate(),
        }
    }
}

impl fmt::Debug for Child {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Child::List(_) => f.write_str("Child::List"),
            Child::Provider(p) => write!(f, "Child::Provider({})", p.title()),
        }
    }
}
