//! Renderer: field lists back to parameter-file text.
//!
//! Each enabled field becomes one line:
//!
//! ```text
//! <prefix>NAME<suffix>[:i[:j]]<TAB>VALUE<TAB># description
//! ```
//!
//! Arrays emit one line per element with the index embedded in the name.
//! Handle fields emit a `#` banner and recurse with a tab appended to the
//! prefix; nested-module field names and sub-list labels are folded into the
//! suffix as `.NAME`, so the output stays a flat, dotted name space that the
//! resolver reads back.

use std::fmt::{self, Write};

use crate::accessor::Storage;
use crate::dispatch::quote;
use crate::error::{ParamError, ParamResult};
use crate::list::{FieldList, ListRef, ParamOwner};
use crate::provider::Child;

/// Indentation appended to the prefix for each nesting level.
pub const INDENT: &str = "\t";

/// A field's current value in parameter-file form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// Single value.
    Scalar(String),
    /// One value per element.
    Array(Vec<String>),
    /// Row-major cells of a table.
    Matrix {
        /// Number of columns.
        cols: usize,
        /// Cell values.
        cells: Vec<String>,
    },
    /// Handle field; the value is the nested lists.
    Handle,
}

fn on_off(v: bool) -> String {
    if v { "on" } else { "off" }.to_string()
}

impl<O: ParamOwner> FieldList<O> {
    pub(crate) fn format_field(&self, index: usize) -> ParamResult<Rendered> {
        let field = self.descriptor(index)?;
        let owner = self
            .owner
            .try_borrow()
            .map_err(|_| ParamError::Busy(O::KIND.name()))?;
        let owner = &*owner;
        let rendered = match field.storage {
            Storage::Bool(get) => Rendered::Scalar(on_off(get(owner))),
            Storage::Int(get) => Rendered::Scalar(get(owner).to_string()),
            Storage::Long(get) => Rendered::Scalar(get(owner).to_string()),
            Storage::Float(get) => Rendered::Scalar(get(owner).to_string()),
            Storage::Str(get) => Rendered::Scalar(quote(get(owner))),
            Storage::BoolArray(get) => {
                Rendered::Array(get(owner).iter().copied().map(on_off).collect())
            }
            Storage::IntArray(get) => {
                Rendered::Array(get(owner).iter().map(ToString::to_string).collect())
            }
            Storage::FloatArray(get) | Storage::DynFloatArray { view: get, .. } => {
                Rendered::Array(get(owner).iter().map(ToString::to_string).collect())
            }
            Storage::StrArray(get) => {
                Rendered::Array(get(owner).iter().map(|s| quote(s)).collect())
            }
            Storage::FloatMatrix(get) => {
                let (cells, cols) = get(owner);
                Rendered::Matrix {
                    cols,
                    cells: cells.iter().map(ToString::to_string).collect(),
                }
            }
            Storage::Child(_) => Rendered::Handle,
        };
        Ok(rendered)
    }
}

/// Write every enabled field of `list` (and everything nested below it) to `sink`.
pub fn render(list: &ListRef, sink: &mut dyn Write, prefix: &str, suffix: &str) -> ParamResult<()> {
    render_list(list, sink, prefix, suffix).map_err(|e| match e {
        RenderError::Param(e) => e,
        RenderError::Sink => ParamError::Render,
    })
}

/// Render `list` into a new string.
pub fn render_to_string(list: &ListRef) -> ParamResult<String> {
    let mut out = String::new();
    render(list, &mut out, "", "")?;
    Ok(out)
}

enum RenderError {
    Param(ParamError),
    Sink,
}

impl From<ParamError> for RenderError {
    fn from(e: ParamError) -> Self {
        RenderError::Param(e)
    }
}

impl From<fmt::Error> for RenderError {
    fn from(_: fmt::Error) -> Self {
        RenderError::Sink
    }
}

fn render_list(
    list: &ListRef,
    sink: &mut dyn Write,
    prefix: &str,
    suffix: &str,
) -> Result<(), RenderError> {
    let guard = list
        .try_borrow()
        .map_err(|_| ParamError::Busy("parameter list"))?;
    let nested_prefix = format!("{prefix}{INDENT}");
    for index in 0..guard.len() {
        let Some(meta) = guard.meta(index) else {
            continue;
        };
        if !meta.enabled {
            continue;
        }
        let name = meta.name;
        let desc = meta.description;
        match guard.rendered(index)? {
            Rendered::Scalar(value) => {
                writeln!(sink, "{prefix}{name}{suffix}\t{value}\t# {desc}")?;
            }
            Rendered::Array(values) if values.is_empty() => {
                writeln!(sink, "{prefix}# {name}{suffix}: no elements")?;
            }
            Rendered::Array(values) => {
                for (i, value) in values.iter().enumerate() {
                    writeln!(sink, "{prefix}{name}{suffix}:{i}\t{value}\t# {desc}")?;
                }
            }
            Rendered::Matrix { cols, cells } => {
                for (k, value) in cells.iter().enumerate() {
                    let row = k.checked_div(cols).unwrap_or(0);
                    let col = k.checked_rem(cols).unwrap_or(k);
                    writeln!(sink, "{prefix}{name}{suffix}:{row}:{col}\t{value}\t# {desc}")?;
                }
            }
            Rendered::Handle => match guard.child(index)? {
                Some(Child::List(nested)) => {
                    writeln!(sink, "{prefix}# {name}{suffix}: {desc}")?;
                    render_list(&nested, sink, &nested_prefix, &format!(".{name}{suffix}"))?;
                }
                Some(Child::Provider(provider)) => {
                    writeln!(sink, "{prefix}# {}", provider.title())?;
                    for sub in provider.sub_lists()? {
                        match sub.label {
                            Some(label) => {
                                let sub_suffix = format!(".{label}{suffix}");
                                render_list(&sub.list, sink, &nested_prefix, &sub_suffix)?;
                            }
                            None => render_list(&sub.list, sink, &nested_prefix, suffix)?,
                        }
                    }
                }
                None => {
                    writeln!(sink, "{prefix}# {name}{suffix}: not set")?;
                }
            },
        }
    }
    Ok(())
}
