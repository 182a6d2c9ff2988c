//! Owner kinds, field kinds, and the dispatch table that pairs them.
//!
//! A field's write accessor is selected on two axes: what the field holds
//! ([`FieldKind`]) and what kind of aggregate owns the list ([`OwnerKind`]).
//! [`expected_shape`] is the table that maps each allowed pair to one
//! [`AccessorShape`]; [`FieldList::define`](crate::FieldList::define) consults it
//! once, so a field can never be invoked through a mismatched accessor later.

use core::fmt;

/// Family of aggregate a field list belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OwnerKind {
    /// A module's own parameter block.
    Module,
    /// Centre-frequency / bandwidth list.
    FreqList,
    /// Collection of ion channels with shared table settings.
    IonChannelList,
    /// One element of an ion-channel collection.
    IonChannel,
    /// Mode-selected parameter array.
    ParamArray,
}

impl OwnerKind {
    /// Human-readable name.
    pub const fn name(self) -> &'static str {
        match self {
            OwnerKind::Module => "module",
            OwnerKind::FreqList => "frequency list",
            OwnerKind::IonChannelList => "ion channel list",
            OwnerKind::IonChannel => "ion channel",
            OwnerKind::ParamArray => "parameter array",
        }
    }

    /// Whether a successful write marks the owner dirty.
    ///
    /// Module blocks manage their own derived state; every aggregate kind
    /// is regenerated lazily.
    pub const fn tracks_changes(self) -> bool {
        !matches!(self, OwnerKind::Module)
    }
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What an enumerated-name field accepts besides its names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Companion {
    /// Only the listed names.
    None,
    /// A listed name or a file name.
    File,
    /// A listed name or a directory path.
    Path,
}

/// Names accepted by an enumerated-name field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameSpec {
    /// Accepted names in canonical spelling.
    pub names: &'static [&'static str],
    /// Alternative free-form value.
    pub companion: Companion,
}

impl NameSpec {
    /// Names only.
    pub const fn new(names: &'static [&'static str]) -> Self {
        Self {
            names,
            companion: Companion::None,
        }
    }

    /// Names, or a file name.
    pub const fn with_file(names: &'static [&'static str]) -> Self {
        Self {
            names,
            companion: Companion::File,
        }
    }

    /// Names, or a directory path.
    pub const fn with_path(names: &'static [&'static str]) -> Self {
        Self {
            names,
            companion: Companion::Path,
        }
    }

    /// Canonical spelling of `value`, matched case-insensitively.
    pub fn canonical(&self, value: &str) -> Option<&'static str> {
        self.names
            .iter()
            .copied()
            .find(|n| n.eq_ignore_ascii_case(value))
    }

    /// Accepted names joined with `|`.
    pub fn choices(&self) -> String {
        self.names.join("|")
    }
}

/// Element type of a fixed array field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// Booleans.
    Bool,
    /// 32-bit integers.
    Int,
    /// Floats.
    Float,
    /// Free text.
    Str,
    /// Enumerated names.
    Name(NameSpec),
}

/// What a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// On/off flag.
    Bool,
    /// 32-bit integer.
    Int,
    /// 64-bit integer.
    Long,
    /// Floating scalar.
    Float,
    /// Free text.
    Str,
    /// File name; `default_ext` is appended when the value has no extension.
    FileName {
        /// Extension without the dot; empty for none.
        default_ext: &'static str,
    },
    /// Enumerated name, optionally paired with a file or path.
    Name(NameSpec),
    /// Fixed-length array; the owner controls the element count.
    Array(ElementKind),
    /// Fixed two-dimensional float table addressed as `row:column`.
    FloatMatrix,
    /// Float array that grows when written past its end.
    DynFloatArray,
    /// Nested module field list.
    Module,
    /// Frequency-list aggregate.
    FreqList,
    /// Ion-channel-list aggregate.
    IonChannelList,
    /// Parameter-array aggregate.
    ParamArray,
    /// Chain of script steps.
    Script,
    /// Single ion-channel element.
    IonChannel,
}

impl FieldKind {
    /// Human-readable name.
    pub const fn name(&self) -> &'static str {
        match self {
            FieldKind::Bool => "boolean",
            FieldKind::Int => "integer",
            FieldKind::Long => "long integer",
            FieldKind::Float => "float",
            FieldKind::Str => "string",
            FieldKind::FileName { .. } => "file name",
            FieldKind::Name(_) => "name",
            FieldKind::Array(ElementKind::Bool) => "boolean array",
            FieldKind::Array(ElementKind::Int) => "integer array",
            FieldKind::Array(ElementKind::Float) => "float array",
            FieldKind::Array(ElementKind::Str) => "string array",
            FieldKind::Array(ElementKind::Name(_)) => "name array",
            FieldKind::FloatMatrix => "float matrix",
            FieldKind::DynFloatArray => "dynamic float array",
            FieldKind::Module => "module",
            FieldKind::FreqList => "frequency list",
            FieldKind::IonChannelList => "ion channel list",
            FieldKind::ParamArray => "parameter array",
            FieldKind::Script => "script",
            FieldKind::IonChannel => "ion channel",
        }
    }

    /// Number of leading `i:` indices the value text may carry.
    pub const fn index_depth(&self) -> usize {
        match self {
            FieldKind::Array(_) | FieldKind::DynFloatArray => 1,
            FieldKind::FloatMatrix => 2,
            _ => 0,
        }
    }

    /// Whether the field points at nested field lists instead of a value.
    pub const fn is_handle(&self) -> bool {
        matches!(
            self,
            FieldKind::Module
                | FieldKind::FreqList
                | FieldKind::IonChannelList
                | FieldKind::ParamArray
                | FieldKind::Script
                | FieldKind::IonChannel
        )
    }

    /// Whether values are rendered quoted.
    pub const fn is_quoted(&self) -> bool {
        matches!(
            self,
            FieldKind::Str
                | FieldKind::FileName { .. }
                | FieldKind::Name(_)
                | FieldKind::Array(ElementKind::Str)
                | FieldKind::Array(ElementKind::Name(_))
        )
    }

    /// Names accepted by enumerated-name fields and name arrays.
    pub const fn name_spec(&self) -> Option<&NameSpec> {
        match self {
            FieldKind::Name(spec) | FieldKind::Array(ElementKind::Name(spec)) => Some(spec),
            _ => None,
        }
    }

    /// Whether the module regeneration pass must descend into this field.
    pub const fn needs_validation(&self) -> bool {
        matches!(
            self,
            FieldKind::Module
                | FieldKind::FreqList
                | FieldKind::IonChannelList
                | FieldKind::ParamArray
        )
    }
}

/// Call signature of a field's write accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessorShape {
    /// `(owner, bool)`
    Bool,
    /// `(owner, i32)`
    Int,
    /// `(owner, i64)`
    Long,
    /// `(owner, f64)`
    Float,
    /// `(owner, &str)`
    Str,
    /// `(owner, index, bool)`
    BoolAt,
    /// `(owner, index, i32)`
    IntAt,
    /// `(owner, index, f64)`
    FloatAt,
    /// `(owner, index, &str)`
    StrAt,
    /// `(owner, row, column, f64)`
    FloatAt2,
    /// No value; the field exposes nested lists.
    Handle,
}

impl AccessorShape {
    /// Human-readable name.
    pub const fn name(self) -> &'static str {
        match self {
            AccessorShape::Bool => "bool",
            AccessorShape::Int => "int",
            AccessorShape::Long => "long",
            AccessorShape::Float => "float",
            AccessorShape::Str => "string",
            AccessorShape::BoolAt => "indexed bool",
            AccessorShape::IntAt => "indexed int",
            AccessorShape::FloatAt => "indexed float",
            AccessorShape::StrAt => "indexed string",
            AccessorShape::FloatAt2 => "doubly indexed float",
            AccessorShape::Handle => "handle",
        }
    }
}

/// The (owner kind × field kind) dispatch table.
///
/// Returns `None` for pairs no owner may declare: aggregate handles live only
/// in module blocks (an ion-channel element handle may also sit in an
/// ion-channel list), and only modules own growable arrays.
pub fn expected_shape(owner: OwnerKind, kind: &FieldKind) -> Option<AccessorShape> {
    let module = matches!(owner, OwnerKind::Module);
    let shape = match kind {
        FieldKind::Bool => AccessorShape::Bool,
        FieldKind::Int => AccessorShape::Int,
        FieldKind::Long => AccessorShape::Long,
        FieldKind::Float => AccessorShape::Float,
        FieldKind::Str | FieldKind::FileName { .. } | FieldKind::Name(_) => AccessorShape::Str,
        FieldKind::Array(ElementKind::Bool) => AccessorShape::BoolAt,
        FieldKind::Array(ElementKind::Int) => AccessorShape::IntAt,
        FieldKind::Array(ElementKind::Float) => AccessorShape::FloatAt,
        FieldKind::Array(ElementKind::Str | ElementKind::Name(_)) => AccessorShape::StrAt,
        FieldKind::FloatMatrix => AccessorShape::FloatAt2,
        FieldKind::DynFloatArray if module => AccessorShape::FloatAt,
        FieldKind::Module
        | FieldKind::FreqList
        | FieldKind::IonChannelList
        | FieldKind::ParamArray
        | FieldKind::Script
            if module =>
        {
            AccessorShape::Handle
        }
        FieldKind::IonChannel if module || matches!(owner, OwnerKind::IonChannelList) => {
            AccessorShape::Handle
        }
        _ => return None,
    };
    Some(shape)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODES: NameSpec = NameSpec::new(&["linear", "log", "erb"]);

    #[test]
    fn name_spec_canonicalises_case() {
        assert_eq!(MODES.canonical("ERB"), Some("erb"));
        assert_eq!(MODES.canonical("Log"), Some("log"));
        assert_eq!(MODES.canonical("cubic"), None);
        assert_eq!(MODES.choices(), "linear|log|erb");
    }

    #[test]
    fn scalar_kinds_map_to_scalar_shapes_for_every_owner() {
        for owner in [
            OwnerKind::Module,
            OwnerKind::FreqList,
            OwnerKind::IonChannelList,
            OwnerKind::IonChannel,
            OwnerKind::ParamArray,
        ] {
            assert_eq!(expected_shape(owner, &FieldKind::Int), Some(AccessorShape::Int));
            assert_eq!(
                expected_shape(owner, &FieldKind::Name(MODES)),
                Some(AccessorShape::Str)
            );
            assert_eq!(
                expected_shape(owner, &FieldKind::Array(ElementKind::Float)),
                Some(AccessorShape::FloatAt)
            );
        }
    }

    #[test]
    fn handles_are_module_only() {
        assert_eq!(
            expected_shape(OwnerKind::Module, &FieldKind::FreqList),
            Some(AccessorShape::Handle)
        );
        assert_eq!(expected_shape(OwnerKind::FreqList, &FieldKind::Module), None);
        assert_eq!(
            expected_shape(OwnerKind::ParamArray, &FieldKind::Script),
            None
        );
        assert_eq!(
            expected_shape(OwnerKind::IonChannelList, &FieldKind::IonChannel),
            Some(AccessorShape::Handle)
        );
        assert_eq!(
            expected_shape(OwnerKind::IonChannel, &FieldKind::IonChannel),
            None
        );
    }

    #[test]
    fn dynamic_arrays_are_module_only() {
        assert_eq!(
            expected_shape(OwnerKind::Module, &FieldKind::DynFloatArray),
            Some(AccessorShape::FloatAt)
        );
        assert_eq!(
            expected_shape(OwnerKind::FreqList, &FieldKind::DynFloatArray),
            None
        );
    }

    #[test]
    fn index_depth_per_kind() {
        assert_eq!(FieldKind::Float.index_depth(), 0);
        assert_eq!(FieldKind::Array(ElementKind::Int).index_depth(), 1);
        assert_eq!(FieldKind::DynFloatArray.index_depth(), 1);
        assert_eq!(FieldKind::FloatMatrix.index_depth(), 2);
    }

    #[test]
    fn owner_kinds_tracking_changes() {
        assert!(!OwnerKind::Module.tracks_changes());
        assert!(OwnerKind::FreqList.tracks_changes());
        assert!(OwnerKind::ParamArray.tracks_changes());
        assert!(OwnerKind::IonChannelList.tracks_changes());
        assert!(OwnerKind::IonChannel.tracks_changes());
    }
}
