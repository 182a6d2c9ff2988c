//! Value dispatcher: text in, typed accessor call out.
//!
//! Writes go through three steps:
//!
//! 1. **Index split** - array kinds may carry `i:` (or `i:j:` for tables)
//!    before the value; missing indices default to the field's last-used ones.
//! 2. **Unquote and parse** - `"..."` is stripped with `\"` as the escape,
//!    then the text is parsed into the primitive the setter takes.
//! 3. **Call** - the owner is borrowed mutably, the bound setter runs, and on
//!    success the owner is marked dirty and enable conditions are refreshed.
//!
//! Parsing happens before the owner is touched, so a malformed value never
//! leaves a partial write behind.

use std::borrow::Cow;
use std::path::Path;

use crate::accessor::{Setter, Storage};
use crate::error::{ParamError, ParamResult};
use crate::field::FieldMeta;
use crate::kind::{Companion, FieldKind};
use crate::list::{FieldList, ListRef, ParamOwner};
use crate::resize::{MAX_ELEMENTS, resize_preserving};
use crate::resolve::find_for_value;

impl<O: ParamOwner> FieldList<O> {
    pub(crate) fn apply(&mut self, index: usize, text: &str) -> ParamResult<()> {
        let field = self.descriptor(index)?;
        let meta = field.meta;
        let storage = field.storage;
        let setter = field.setter;
        let last = field.last_index;

        if !meta.enabled {
            return Err(ParamError::Disabled(meta.name.to_string()));
        }
        if meta.kind.is_handle() {
            return Err(ParamError::NotSettable(meta.name.to_string()));
        }

        let (indices, value) = split_indices(meta.name, meta.kind.index_depth(), text, last)?;
        let value = unquote(meta.name, value)?;

        {
            let mut owner = self
                .owner
                .try_borrow_mut()
                .map_err(|_| ParamError::Busy(O::KIND.name()))?;
            write(&mut *owner, &meta, storage, setter, indices, &value)
                .map_err(|e| e.in_field(meta.name))?;
            if O::KIND.tracks_changes() {
                owner.set_dirty(true);
            }
            owner.written();
        }

        if let Some(Some(field)) = self.fields.get_mut(index) {
            field.last_index = indices;
        }
        self.refresh_enabled()?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            owner = %O::KIND,
            field = meta.name,
            index = ?indices,
            value = %value,
            "parameter set"
        );

        Ok(())
    }
}

/// Write `value` to slot `index` of `list`.
pub fn set_by_index(list: &ListRef, index: usize, text: &str) -> ParamResult<()> {
    list.try_borrow_mut()
        .map_err(|_| ParamError::Busy("parameter list"))?
        .set_by_index(index, text)
}

/// Resolve `name` below `root` and write `value` to it.
///
/// `name` may carry array indices (`COEFF:2`, `MIX:0:1`), which are moved in
/// front of the value before dispatch.
pub fn set_param(root: &ListRef, name: &str, value: &str) -> ParamResult<()> {
    let (field_name, indices) = match name.split_once(':') {
        Some((field_name, indices)) => (field_name, Some(indices)),
        None => (name, None),
    };
    let field = find_for_value(root, field_name, value)?
        .ok_or_else(|| ParamError::UnknownField(field_name.to_string()))?;
    match indices {
        Some(indices) => field.set(&format!("{indices}:{value}")),
        None => field.set(value),
    }
}

/// Split leading `i:` / `i:j:` indices off `text`.
///
/// Explicit indices fill from the first dimension; the rest keep `last`.
/// A quoted value ends the index prefix.
pub(crate) fn split_indices<'t>(
    field: &str,
    depth: usize,
    text: &'t str,
    last: [usize; 2],
) -> ParamResult<([usize; 2], &'t str)> {
    let mut indices = last;
    let mut rest = text.trim();
    for slot in indices.iter_mut().take(depth) {
        if rest.starts_with('"') {
            break;
        }
        let Some((head, tail)) = rest.split_once(':') else {
            break;
        };
        *slot = head.trim().parse().map_err(|_| ParamError::MalformedIndex {
            field: field.to_string(),
            text: text.to_string(),
        })?;
        rest = tail.trim_start();
    }
    Ok((indices, rest))
}

/// Strip surrounding quotes, turning `\"` into `"`.
///
/// Unquoted text is returned unchanged.
pub(crate) fn unquote<'t>(field: &str, text: &'t str) -> ParamResult<Cow<'t, str>> {
    let Some(body) = text.strip_prefix('"') else {
        return Ok(Cow::Borrowed(text));
    };
    let malformed = || ParamError::MalformedQuote {
        field: field.to_string(),
        text: text.to_string(),
    };
    let mut out = String::with_capacity(body.len());
    let mut chars = body.char_indices();
    while let Some((pos, c)) = chars.next() {
        match c {
            '\\' if body[pos + 1..].starts_with('"') => {
                out.push('"');
                chars.next();
            }
            '"' => {
                return if body[pos + 1..].trim().is_empty() {
                    Ok(Cow::Owned(out))
                } else {
                    Err(malformed())
                };
            }
            c => out.push(c),
        }
    }
    Err(malformed())
}

/// Quote `value` for a parameter file, escaping embedded quotes.
pub(crate) fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

fn parse_bool(field: &str, text: &str) -> ParamResult<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        _ => Err(invalid(field, text, "boolean")),
    }
}

fn parse_num<T: std::str::FromStr>(field: &str, text: &str, expected: &'static str) -> ParamResult<T> {
    text.trim().parse().map_err(|_| invalid(field, text, expected))
}

fn invalid(field: &str, text: &str, expected: &'static str) -> ParamError {
    ParamError::InvalidValue {
        field: field.to_string(),
        value: text.to_string(),
        expected,
    }
}

/// Canonicalise text for string-shaped setters.
fn resolve_text<'v>(meta: &FieldMeta, value: &'v str) -> ParamResult<Cow<'v, str>> {
    if let Some(spec) = meta.kind.name_spec() {
        if let Some(name) = spec.canonical(value.trim()) {
            return Ok(Cow::Borrowed(name));
        }
        if spec.companion != Companion::None && !value.trim().is_empty() {
            return Ok(Cow::Borrowed(value));
        }
        return Err(ParamError::InvalidName {
            field: meta.name.to_string(),
            value: value.to_string(),
            choices: spec.choices(),
        });
    }
    if let FieldKind::FileName { default_ext } = meta.kind {
        if !default_ext.is_empty() && !value.is_empty() && Path::new(value).extension().is_none() {
            return Ok(Cow::Owned(format!("{value}.{default_ext}")));
        }
    }
    Ok(Cow::Borrowed(value))
}

fn check_index(meta: &FieldMeta, index: usize, len: usize) -> ParamResult<usize> {
    if index < len {
        Ok(index)
    } else {
        Err(ParamError::IndexOutOfRange {
            field: meta.name.to_string(),
            index,
            len,
        })
    }
}

fn write<O>(
    owner: &mut O,
    meta: &FieldMeta,
    storage: Storage<O>,
    setter: Setter<O>,
    indices: [usize; 2],
    value: &str,
) -> ParamResult<()> {
    let name = meta.name;
    let [i, j] = indices;
    let fixed_len = |owner: &O| storage.element_count(owner).unwrap_or(0);
    match setter {
        Setter::Bool(set) => set(owner, parse_bool(name, value)?),
        Setter::Int(set) => set(owner, parse_num(name, value, "integer")?),
        Setter::Long(set) => set(owner, parse_num(name, value, "long integer")?),
        Setter::Float(set) => set(owner, parse_num(name, value, "float")?),
        Setter::Str(set) => set(owner, &resolve_text(meta, value)?),
        Setter::BoolAt(set) => {
            let v = parse_bool(name, value)?;
            let i = check_index(meta, i, fixed_len(owner))?;
            set(owner, i, v)
        }
        Setter::IntAt(set) => {
            let v = parse_num(name, value, "integer")?;
            let i = check_index(meta, i, fixed_len(owner))?;
            set(owner, i, v)
        }
        Setter::FloatAt(set) => {
            let v = parse_num(name, value, "float")?;
            match storage {
                Storage::DynFloatArray { view, backing } => {
                    let old_len = view(owner).len();
                    if i >= old_len {
                        if i >= MAX_ELEMENTS {
                            return Err(ParamError::IndexOutOfRange {
                                field: name.to_string(),
                                index: i,
                                len: MAX_ELEMENTS,
                            });
                        }
                        resize_preserving(backing(owner), i + 1)?;
                    }
                    set(owner, i, v).inspect_err(|_| {
                        if i >= old_len {
                            backing(owner).truncate(old_len);
                        }
                    })
                }
                _ => {
                    let i = check_index(meta, i, fixed_len(owner))?;
                    set(owner, i, v)
                }
            }
        }
        Setter::StrAt(set) => {
            let v = resolve_text(meta, value)?;
            let i = check_index(meta, i, fixed_len(owner))?;
            set(owner, i, &v)
        }
        Setter::FloatAt2(set) => {
            let v = parse_num(name, value, "float")?;
            let (rows, cols) = match storage {
                Storage::FloatMatrix(get) => {
                    let (cells, cols) = get(owner);
                    (cells.len().checked_div(cols).unwrap_or(0), cols)
                }
                _ => (0, 0),
            };
            let i = check_index(meta, i, rows)?;
            let j = check_index(meta, j, cols)?;
            set(owner, i, j, v)
        }
        Setter::Handle => Err(ParamError::NotSettable(name.to_string())),
    }
}
