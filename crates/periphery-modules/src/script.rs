//! Simulation scripts.
//!
//! A [`Script`] is an ordered chain of labelled steps, each optionally owning
//! a module. Step labels double as name qualifiers: `GAIN.bm` addresses the
//! `GAIN` field of the module in step `bm`.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use periphery_core::{ListProvider, ParamError, ParamResult, SubList};

use crate::module::Module;

/// One step of a script.
pub struct ScriptStep {
    label: String,
    module: Option<Box<dyn Module>>,
}

impl ScriptStep {
    /// Step label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Module run by the step, if any.
    pub fn module(&self) -> Option<&dyn Module> {
        self.module.as_deref()
    }
}

impl fmt::Debug for ScriptStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptStep")
            .field("label", &self.label)
            .field("module", &self.module.as_ref().map(|m| m.id()))
            .finish()
    }
}

/// Ordered chain of labelled steps.
#[derive(Debug, Default)]
pub struct Script {
    steps: Vec<ScriptStep>,
}

impl Script {
    /// Empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step.
    ///
    /// Labels must be unique, non-empty, and free of `.`, `:` and whitespace,
    /// since they appear in qualified parameter names.
    pub fn push(&mut self, label: &str, module: Option<Box<dyn Module>>) -> ParamResult<()> {
        if label.is_empty() || label.contains(['.', ':']) || label.contains(char::is_whitespace) {
            return Err(ParamError::rejected(format!("invalid step label '{label}'")));
        }
        if self.step(label).is_some() {
            return Err(ParamError::rejected(format!("duplicate step label '{label}'")));
        }
        self.steps
            .try_reserve(1)
            .map_err(|_| ParamError::Allocation { requested: 1 })?;
        self.steps.push(ScriptStep {
            label: label.to_string(),
            module,
        });
        Ok(())
    }

    /// Steps in execution order.
    pub fn steps(&self) -> &[ScriptStep] {
        &self.steps
    }

    /// Step with the given label (case-insensitive).
    pub fn step(&self, label: &str) -> Option<&ScriptStep> {
        self.steps
            .iter()
            .find(|s| s.label.eq_ignore_ascii_case(label))
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the script has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Validate every step's module in order.
    pub fn validate(&self) -> ParamResult<()> {
        self.steps
            .iter()
            .filter_map(|s| s.module.as_deref())
            .try_for_each(|m| m.validate())
    }
}

/// A [`Script`] exposed as labelled sub-lists.
#[derive(Debug, Default)]
pub struct ScriptNode {
    script: RefCell<Script>,
}

impl ScriptNode {
    /// Wrap a script.
    pub fn new(script: Script) -> Rc<Self> {
        Rc::new(Self {
            script: RefCell::new(script),
        })
    }

    /// The script.
    pub fn script(&self) -> &RefCell<Script> {
        &self.script
    }

    /// Append a step.
    pub fn push(&self, label: &str, module: Option<Box<dyn Module>>) -> ParamResult<()> {
        self.script
            .try_borrow_mut()
            .map_err(|_| ParamError::Busy("script"))?
            .push(label, module)
    }
}

impl ListProvider for ScriptNode {
    fn title(&self) -> String {
        "Simulation script".to_string()
    }

    fn sub_lists(&self) -> ParamResult<Vec<SubList>> {
        let script = self
            .script
            .try_borrow()
            .map_err(|_| ParamError::Busy("script"))?;
        Ok(script
            .steps
            .iter()
            .filter_map(|step| {
                let list = step.module.as_ref()?.par_list()?;
                Some(SubList::labelled(list, step.label.clone()))
            })
            .collect())
    }

    fn validate(&self) -> ParamResult<()> {
        self.script
            .try_borrow()
            .map_err(|_| ParamError::Busy("script"))?
            .validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Gammatone, NullModule};
    use periphery_core::{Rendered, find};

    #[test]
    fn labels_must_be_unique_and_plain() {
        let mut script = Script::new();
        script.push("bm", None).unwrap();
        assert!(script.push("BM", None).is_err());
        assert!(script.push("a.b", None).is_err());
        assert!(script.push("", None).is_err());
        assert!(script.push("two words", None).is_err());
        assert_eq!(script.len(), 1);
    }

    #[test]
    fn steps_without_parameters_have_no_sub_list() {
        let node = ScriptNode::new(Script::new());
        node.push("null", Some(Box::new(NullModule))).unwrap();
        node.push("bm", Some(Box::new(Gammatone::new().unwrap())))
            .unwrap();
        let lists = node.sub_lists().unwrap();
        assert_eq!(lists.len(), 1);
        assert_eq!(lists[0].label.as_deref(), Some("bm"));
    }

    #[test]
    fn step_lists_are_independent() {
        let node = ScriptNode::new(Script::new());
        node.push("bm1", Some(Box::new(Gammatone::new().unwrap())))
            .unwrap();
        node.push("bm2", Some(Box::new(Gammatone::new().unwrap())))
            .unwrap();
        let lists = node.sub_lists().unwrap();
        find(&lists[1].list, "CASCADE").unwrap().unwrap().set("3").unwrap();
        let first = find(&lists[0].list, "CASCADE").unwrap().unwrap();
        assert_eq!(first.value().unwrap(), Rendered::Scalar("4".to_string()));
        node.validate().unwrap();
    }
}
