//! Regeneration protocol.
//!
//! Writes only mark aggregates dirty; derived state is rebuilt here, before
//! the aggregate is next used. A module list recurses into its collection
//! handles. An aggregate list regenerates its owner when dirty, runs the
//! owner's consistency check and only then clears the flag, so a failure
//! leaves the owner dirty and a later call retries.

use crate::error::{ParamError, ParamResult};
use crate::kind::OwnerKind;
use crate::list::{FieldList, ListRef, ParamOwner};

/// Bring `list` and everything below it up to date.
pub fn validate(list: &ListRef) -> ParamResult<()> {
    list.try_borrow_mut()
        .map_err(|_| ParamError::Busy("parameter list"))?
        .validate()
}

impl<O: ParamOwner> FieldList<O> {
    pub(crate) fn regenerate_list(&mut self) -> ParamResult<()> {
        if O::KIND == OwnerKind::Module {
            self.validate_children()?;
        }
        {
            let mut owner = self
                .owner
                .try_borrow_mut()
                .map_err(|_| ParamError::Busy(O::KIND.name()))?;
            if owner.is_dirty() {
                owner.regenerate()?;
                owner.check()?;
                owner.set_dirty(false);

                #[cfg(feature = "tracing")]
                tracing::debug!(owner = %O::KIND, "regenerated");
            }
        }
        self.refresh_enabled()
    }

    fn validate_children(&self) -> ParamResult<()> {
        for field in self.fields.iter().flatten() {
            let meta = &field.meta;
            if !meta.enabled || !meta.kind.needs_validation() {
                continue;
            }
            let child = self
                .child_of(meta.index)?
                .ok_or_else(|| ParamError::MissingHandle(meta.name.to_string()))?;
            child.validate()?;
        }
        Ok(())
    }
}
