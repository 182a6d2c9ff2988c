//! The module trait.
//!
//! Every processing stage of a simulation (stimulus generators, filters,
//! hair-cell and neuron models) exposes its settings through one field list.
//! The list is the only way parameters reach a module: parameter files,
//! presets and interactive edits all go through the registry.

use core::fmt;

use periphery_core::{ListRef, ParamResult, validate};

/// A processing stage with a parameter block.
///
/// # Example
///
/// ```rust
/// use periphery_modules::{Gammatone, Module};
/// use periphery_core::set_param;
///
/// let bm = Gammatone::new().unwrap();
/// let list = bm.par_list().unwrap();
/// set_param(&list, "cascade", "2").unwrap();
/// bm.validate().unwrap();
/// assert_eq!(bm.params().borrow().cascade(), 2);
/// ```
pub trait Module {
    /// Registry identifier, e.g. `"gammatone"`.
    fn id(&self) -> &'static str;

    /// The module's parameter block, or `None` if it has no parameters.
    fn par_list(&self) -> Option<ListRef>;

    /// Bring every nested aggregate up to date.
    ///
    /// The default implementation runs the regeneration pass over
    /// [`par_list`](Self::par_list).
    fn validate(&self) -> ParamResult<()> {
        match self.par_list() {
            Some(list) => validate(&list),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for dyn Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("id", &self.id())
            .finish_non_exhaustive()
    }
}

impl<M: Module + ?Sized> Module for Box<M> {
    fn id(&self) -> &'static str {
        (**self).id()
    }

    fn par_list(&self) -> Option<ListRef> {
        (**self).par_list()
    }

    fn validate(&self) -> ParamResult<()> {
        (**self).validate()
    }
}
