//! A module without parameters.

use periphery_core::ListRef;

use crate::module::Module;

/// Pass-through step; used as a script placeholder.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullModule;

impl Module for NullModule {
    fn id(&self) -> &'static str {
        "null"
    }

    fn par_list(&self) -> Option<ListRef> {
        None
    }
}
