//! Name resolver.
//!
//! Names are matched case-insensitively against a field's primary name, then
//! its alternate name. The search walks fields in declaration order and
//! descends into every handle field it passes: nested module lists directly,
//! aggregates through their [`ListProvider`] sub-lists. The first eligible
//! field wins.
//!
//! A dotted name `LOCAL.Q1.Q2` restricts the search: the last qualifier is
//! the outermost and must name the nested-module field or the sub-list label
//! (script step label, ion-channel element index) the search passes through.
//! Unlabelled sub-lists are transparent.

use std::borrow::Cow;
use std::fmt;

use crate::dispatch::{set_by_index, unquote};
use crate::error::{ParamError, ParamResult};
use crate::field::FieldMeta;
use crate::list::ListRef;
use crate::provider::{Child, ListProvider};
use crate::render::Rendered;

/// How the local part of a name is compared with field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameMatch {
    /// Whole-name match.
    #[default]
    Exact,
    /// Whole-name match anywhere below the root, else the first prefix match.
    Abbreviated,
}

/// A resolved field: the list that actually holds it and its slot.
#[derive(Clone)]
pub struct FieldRef {
    /// List containing the field; may be nested deep below the searched root.
    pub list: ListRef,
    /// Slot in `list`.
    pub index: usize,
}

impl FieldRef {
    /// Write `text` through the field's accessor.
    pub fn set(&self, text: &str) -> ParamResult<()> {
        set_by_index(&self.list, self.index, text)
    }

    /// Copy of the field's metadata.
    pub fn meta(&self) -> ParamResult<FieldMeta> {
        let list = self
            .list
            .try_borrow()
            .map_err(|_| ParamError::Busy("parameter list"))?;
        list.meta(self.index)
            .copied()
            .ok_or(ParamError::Undefined(self.index))
    }

    /// Current value, formatted as it would appear in a parameter file.
    pub fn value(&self) -> ParamResult<Rendered> {
        self.list
            .try_borrow()
            .map_err(|_| ParamError::Busy("parameter list"))?
            .rendered(self.index)
    }
}

impl fmt::Debug for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .list
            .try_borrow()
            .ok()
            .and_then(|list| list.meta(self.index).map(|m| m.name));
        f.debug_struct("FieldRef")
            .field("name", &name)
            .field("index", &self.index)
            .finish()
    }
}

/// Find `name` below `list`, matching whole names only.
pub fn find(list: &ListRef, name: &str) -> ParamResult<Option<FieldRef>> {
    find_with(list, name, NameMatch::Exact)
}

/// Find `name` below `list` using `mode`.
pub fn find_with(list: &ListRef, name: &str, mode: NameMatch) -> ParamResult<Option<FieldRef>> {
    resolve(list, name, mode, None)
}

/// Find the field that should receive `value` when `name` is written.
///
/// Same as [`find`], except that element lists reached without a qualifier
/// are offered to their aggregate first ([`ListProvider::accepts`]), so an
/// unqualified `DESCRIPTION` lands on the first channel that can take it.
pub fn find_for_value(list: &ListRef, name: &str, value: &str) -> ParamResult<Option<FieldRef>> {
    let local = name.split('.').next().unwrap_or_default().trim();
    let value = unquote(local, value).unwrap_or(Cow::Borrowed(value));
    resolve(list, name, NameMatch::Exact, Some(&*value))
}

fn resolve(
    list: &ListRef,
    name: &str,
    mode: NameMatch,
    value: Option<&str>,
) -> ParamResult<Option<FieldRef>> {
    let mut parts = name.trim().split('.');
    let local = parts.next().unwrap_or_default();
    if local.is_empty() {
        return Ok(None);
    }
    let qualifiers: Vec<&str> = parts.collect();
    let mut query = Query {
        local,
        mode: NameMatch::Exact,
        value,
    };
    let found = search(list, &query, &qualifiers)?;
    if found.is_some() || mode == NameMatch::Exact {
        return Ok(found);
    }
    query.mode = NameMatch::Abbreviated;
    search(list, &query, &qualifiers)
}

struct Query<'a> {
    local: &'a str,
    mode: NameMatch,
    value: Option<&'a str>,
}

impl Query<'_> {
    fn matches(&self, meta: &FieldMeta) -> bool {
        match self.mode {
            NameMatch::Exact => meta.matches(self.local),
            NameMatch::Abbreviated => meta.matches_abbreviation(self.local),
        }
    }
}

fn search(list: &ListRef, query: &Query<'_>, qualifiers: &[&str]) -> ParamResult<Option<FieldRef>> {
    let guard = list
        .try_borrow()
        .map_err(|_| ParamError::Busy("parameter list"))?;
    for index in 0..guard.len() {
        let Some(meta) = guard.meta(index) else {
            continue;
        };
        if !meta.enabled {
            continue;
        }
        if qualifiers.is_empty() && query.matches(meta) {
            return Ok(Some(FieldRef {
                list: list.clone(),
                index,
            }));
        }
        if !meta.kind.is_handle() {
            continue;
        }
        let found = match guard.child(index)? {
            Some(Child::List(nested)) => match qualifiers.split_last() {
                None => search(&nested, query, qualifiers)?,
                Some((outer, inner)) if meta.matches(outer) => search(&nested, query, inner)?,
                Some(_) => None,
            },
            Some(Child::Provider(provider)) => search_provider(provider.as_ref(), query, qualifiers)?,
            None => None,
        };
        if found.is_some() {
            return Ok(found);
        }
    }
    Ok(None)
}

fn search_provider(
    provider: &dyn ListProvider,
    query: &Query<'_>,
    qualifiers: &[&str],
) -> ParamResult<Option<FieldRef>> {
    for sub in provider.sub_lists()? {
        let found = match (sub.label.as_deref(), qualifiers.split_last()) {
            (None, _) => search(&sub.list, query, qualifiers)?,
            (Some(label), None) => match search(&sub.list, query, qualifiers)? {
                Some(found) if !offered(provider, label, &found, query.value)? => None,
                found => found,
            },
            (Some(label), Some((outer, inner))) if label.eq_ignore_ascii_case(outer) => {
                search(&sub.list, query, inner)?
            }
            (Some(_), Some(_)) => None,
        };
        if found.is_some() {
            return Ok(found);
        }
    }
    Ok(None)
}

fn offered(
    provider: &dyn ListProvider,
    label: &str,
    found: &FieldRef,
    value: Option<&str>,
) -> ParamResult<bool> {
    match value {
        Some(value) => provider.accepts(label, &found.meta()?, value),
        None => Ok(true),
    }
}

