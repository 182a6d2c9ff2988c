//! Mode-selected parameter arrays.
//!
//! A [`ParamArray`] pairs a mode name with a float array whose length depends
//! on the mode, e.g. a compression law with one to three coefficients. The
//! shape of the array (mode names, counts, field names) comes from a static
//! [`ParamArraySpec`] so several modules can share the machinery.

use std::fmt;
use std::rc::Rc;

use periphery_core::{
    ElementKind, FieldKind, FieldList, ListProvider, ListRef, NameSpec, OwnerKind, ParamError,
    ParamOwner, ParamResult, Setter, Shared, Storage, SubList, resize_preserving, shared,
    validate,
};

/// Static description of a parameter array.
#[derive(Debug)]
pub struct ParamArraySpec {
    /// Name of the mode field.
    pub mode_field: &'static str,
    /// Name of the parameter field.
    pub param_field: &'static str,
    /// Description of the mode field.
    pub mode_description: &'static str,
    /// Description of the parameter field.
    pub param_description: &'static str,
    /// Mode names in canonical spelling.
    pub modes: &'static [&'static str],
    /// Parameter count of each mode, parallel to `modes`.
    pub param_counts: &'static [usize],
}

impl ParamArraySpec {
    fn mode_index(&self, name: &str) -> Option<usize> {
        self.modes.iter().position(|m| m.eq_ignore_ascii_case(name))
    }

    fn count(&self, mode: usize) -> usize {
        self.param_counts.get(mode).copied().unwrap_or(0)
    }
}

/// Callback run after every successful write to a [`ParamArray`].
pub type WriteHook = Rc<dyn Fn(&ParamArray)>;

/// A mode plus the parameters that mode needs.
pub struct ParamArray {
    spec: &'static ParamArraySpec,
    mode: usize,
    params: Vec<f64>,
    dirty: bool,
    on_write: Option<WriteHook>,
}

impl ParamArray {
    /// Array in `mode` with the given leading parameters; missing ones are zero.
    pub fn new(spec: &'static ParamArraySpec, mode: &str, params: &[f64]) -> ParamResult<Self> {
        let mode = spec.mode_index(mode).ok_or_else(|| ParamError::InvalidName {
            field: spec.mode_field.to_string(),
            value: mode.to_string(),
            choices: spec.modes.join("|"),
        })?;
        let mut params = params.to_vec();
        resize_preserving(&mut params, spec.count(mode))?;
        Ok(Self {
            spec,
            mode,
            params,
            dirty: true,
            on_write: None,
        })
    }

    /// Install a callback run after every successful write.
    #[must_use]
    pub fn with_write_hook(mut self, hook: WriteHook) -> Self {
        self.on_write = Some(hook);
        self
    }

    /// Shape description.
    pub fn spec(&self) -> &'static ParamArraySpec {
        self.spec
    }

    /// Current mode name.
    pub fn mode(&self) -> &str {
        self.spec.modes.get(self.mode).copied().unwrap_or_default()
    }

    /// Current parameters.
    pub fn params(&self) -> &[f64] {
        &self.params
    }

    fn set_mode(&mut self, name: &str) -> ParamResult<()> {
        let mode = self
            .spec
            .mode_index(name)
            .ok_or_else(|| ParamError::rejected(format!("unknown mode '{name}'")))?;
        resize_preserving(&mut self.params, self.spec.count(mode))?;
        self.mode = mode;
        Ok(())
    }

    fn set_param(&mut self, index: usize, value: f64) -> ParamResult<()> {
        self.params[index] = value;
        Ok(())
    }
}

impl fmt::Debug for ParamArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamArray")
            .field("mode", &self.mode())
            .field("params", &self.params)
            .field("dirty", &self.dirty)
            .field("on_write", &self.on_write.is_some())
            .finish()
    }
}

impl ParamOwner for ParamArray {
    const KIND: OwnerKind = OwnerKind::ParamArray;

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    fn regenerate(&mut self) -> ParamResult<()> {
        let count = self.spec.count(self.mode);
        if self.params.len() != count {
            resize_preserving(&mut self.params, count)?;
        }
        Ok(())
    }

    fn check(&self) -> ParamResult<()> {
        if let Some(i) = self.params.iter().position(|p| !p.is_finite()) {
            return Err(ParamError::inconsistent(
                Self::KIND,
                format!("{}[{i}] is not finite", self.spec.param_field),
            ));
        }
        Ok(())
    }

    fn written(&mut self) {
        if let Some(hook) = &self.on_write {
            hook(self);
        }
    }
}

fn array_list(data: &Shared<ParamArray>, spec: &'static ParamArraySpec) -> ParamResult<ListRef> {
    let Some(mut list) = FieldList::create(data.clone(), 2)? else {
        return Err(ParamError::Allocation { requested: 2 });
    };
    list.define(
        0,
        spec.mode_field,
        spec.mode_description,
        FieldKind::Name(NameSpec::new(spec.modes)),
        Storage::Str(ParamArray::mode),
        Setter::Str(ParamArray::set_mode),
    )?;
    list.define(
        1,
        spec.param_field,
        spec.param_description,
        FieldKind::Array(ElementKind::Float),
        Storage::FloatArray(ParamArray::params),
        Setter::FloatAt(ParamArray::set_param),
    )?;
    Ok(list.into_ref())
}

/// A [`ParamArray`] with its field list.
#[derive(Debug)]
pub struct ParamArrayNode {
    data: Shared<ParamArray>,
    list: ListRef,
}

impl ParamArrayNode {
    /// Wrap `data` and build its field list.
    pub fn new(data: ParamArray) -> ParamResult<Rc<Self>> {
        let spec = data.spec;
        let data = shared(data);
        let list = array_list(&data, spec)?;
        Ok(Rc::new(Self { data, list }))
    }

    /// The parameter array.
    pub fn data(&self) -> &Shared<ParamArray> {
        &self.data
    }

    /// Mode and parameter fields.
    pub fn list(&self) -> &ListRef {
        &self.list
    }
}

impl ListProvider for ParamArrayNode {
    fn title(&self) -> String {
        match self.data.try_borrow() {
            Ok(data) => format!("Parameter array ({})", data.mode()),
            Err(_) => "Parameter array".to_string(),
        }
    }

    fn sub_lists(&self) -> ParamResult<Vec<SubList>> {
        Ok(vec![SubList::new(self.list.clone())])
    }

    fn validate(&self) -> ParamResult<()> {
        validate(&self.list)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use periphery_core::{ParList, find, set_by_index};

    static LAW: ParamArraySpec = ParamArraySpec {
        mode_field: "LAW",
        param_field: "LAW_PARAM",
        mode_description: "Law.",
        param_description: "Law parameters.",
        modes: &["flat", "slope", "curve"],
        param_counts: &[0, 1, 3],
    };

    #[test]
    fn mode_change_resizes_parameters() {
        let node = ParamArrayNode::new(ParamArray::new(&LAW, "slope", &[2.0]).unwrap()).unwrap();
        set_by_index(node.list(), 0, "CURVE").unwrap();
        assert_eq!(node.data().borrow().mode(), "curve");
        assert_eq!(node.data().borrow().params(), &[2.0, 0.0, 0.0]);
        set_by_index(node.list(), 1, "2:7.5").unwrap();
        set_by_index(node.list(), 0, "flat").unwrap();
        assert!(node.data().borrow().params().is_empty());
    }

    #[test]
    fn unknown_mode_is_an_invalid_name() {
        let err = ParamArray::new(&LAW, "wavy", &[]).unwrap_err();
        assert!(matches!(err, ParamError::InvalidName { .. }), "{err}");
        let node = ParamArrayNode::new(ParamArray::new(&LAW, "flat", &[]).unwrap()).unwrap();
        assert!(set_by_index(node.list(), 0, "wavy").is_err());
        assert_eq!(node.data().borrow().mode(), "flat");
    }

    #[test]
    fn hook_runs_after_each_write() {
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        let array = ParamArray::new(&LAW, "slope", &[1.0])
            .unwrap()
            .with_write_hook(Rc::new(move |_: &ParamArray| seen.set(seen.get() + 1)));
        let node = ParamArrayNode::new(array).unwrap();
        let field = find(node.list(), "LAW_PARAM").unwrap().unwrap();
        field.set("0:3").unwrap();
        field.set("4").unwrap();
        assert_eq!(calls.get(), 2);
        assert!(field.set("5:1").is_err());
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn writes_mark_dirty_until_validated() {
        let node = ParamArrayNode::new(ParamArray::new(&LAW, "slope", &[1.0]).unwrap()).unwrap();
        node.validate().unwrap();
        assert!(!node.list().borrow().is_dirty());
        set_by_index(node.list(), 1, "0:inf").unwrap();
        assert!(node.list().borrow().is_dirty());
        assert!(node.validate().is_err());
        assert!(node.list().borrow().is_dirty());
    }
}
