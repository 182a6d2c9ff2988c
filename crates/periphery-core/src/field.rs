//! Field descriptors.

use core::fmt;

use crate::accessor::{Setter, Storage};
use crate::kind::{FieldKind, OwnerKind};

/// Metadata of one exposed parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldMeta {
    /// Position in the owning list.
    pub index: usize,
    /// Kind of the owning list.
    pub owner_kind: OwnerKind,
    /// Name used in parameter files.
    pub name: &'static str,
    /// Deprecated synonym still accepted by the resolver.
    pub alt_name: Option<&'static str>,
    /// One-line description, rendered after the value.
    pub description: &'static str,
    /// What the field holds.
    pub kind: FieldKind,
    /// Inactive fields are skipped by resolution, rendering and writes.
    pub enabled: bool,
}

impl FieldMeta {
    /// Case-insensitive match against the primary name, then the alternate.
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self.alt_name.is_some_and(|alt| alt.eq_ignore_ascii_case(name))
    }

    /// Case-insensitive prefix match, primary name first.
    pub fn matches_abbreviation(&self, abbr: &str) -> bool {
        fn starts_with(name: &str, abbr: &str) -> bool {
            name.len() >= abbr.len()
                && name.is_char_boundary(abbr.len())
                && name[..abbr.len()].eq_ignore_ascii_case(abbr)
        }
        !abbr.is_empty()
            && (starts_with(self.name, abbr)
                || self.alt_name.is_some_and(|alt| starts_with(alt, abbr)))
    }
}

/// Metadata plus the typed storage/accessor binding of one field.
pub struct FieldDescriptor<O> {
    pub(crate) meta: FieldMeta,
    pub(crate) storage: Storage<O>,
    pub(crate) setter: Setter<O>,
    pub(crate) condition: Option<fn(&O) -> bool>,
    pub(crate) last_index: [usize; 2],
}

impl<O> FieldDescriptor<O> {
    pub(crate) fn new(meta: FieldMeta, storage: Storage<O>, setter: Setter<O>) -> Self {
        Self {
            meta,
            storage,
            setter,
            condition: None,
            last_index: [0; 2],
        }
    }

    /// Field metadata.
    pub fn meta(&self) -> &FieldMeta {
        &self.meta
    }

    /// Indices used by the most recent array write.
    pub fn last_index(&self) -> [usize; 2] {
        self.last_index
    }

    /// Accept `alt_name` as a deprecated synonym.
    pub fn with_alt_name(&mut self, alt_name: &'static str) -> &mut Self {
        self.meta.alt_name = Some(alt_name);
        self
    }

    /// Keep the field enabled only while `condition` holds for the owner.
    ///
    /// Conditions are re-evaluated after every write and every regeneration.
    pub fn enabled_when(&mut self, condition: fn(&O) -> bool) -> &mut Self {
        self.condition = Some(condition);
        self
    }
}

impl<O> fmt::Debug for FieldDescriptor<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("meta", &self.meta)
            .field("storage", &self.storage.name())
            .field("setter", &self.setter.shape())
            .field("conditional", &self.condition.is_some())
            .field("last_index", &self.last_index)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(name: &'static str, alt: Option<&'static str>) -> FieldMeta {
        FieldMeta {
            index: 0,
            owner_kind: OwnerKind::Module,
            name,
            alt_name: alt,
            description: "",
            kind: FieldKind::Float,
            enabled: true,
        }
    }

    #[test]
    fn matches_primary_then_alternate() {
        let m = meta("CASCADE", Some("ORDER"));
        assert!(m.matches("cascade"));
        assert!(m.matches("Order"));
        assert!(!m.matches("CASC"));
    }

    #[test]
    fn abbreviation_matches_prefixes() {
        let m = meta("CASCADE", Some("ORDER"));
        assert!(m.matches_abbreviation("casc"));
        assert!(m.matches_abbreviation("ORD"));
        assert!(!m.matches_abbreviation(""));
        assert!(!m.matches_abbreviation("CASCADES"));
    }

    #[test]
    fn debug_shows_name_and_accessors() {
        struct Block;
        let d: FieldDescriptor<Block> = FieldDescriptor::new(
            meta("GAIN", None),
            Storage::Float(|_| 0.0),
            Setter::Float(|_, _| Ok(())),
        );
        let text = format!("{d:?}");
        assert!(text.contains("\"GAIN\""), "{text}");
        assert!(text.contains("float storage"), "{text}");
        assert!(text.contains("Float"), "{text}");
    }
}
