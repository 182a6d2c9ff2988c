//! Simulation container: a title and a script of module steps.

use std::rc::Rc;

use periphery_core::{
    Child, FieldKind, FieldList, ListProvider, ListRef, OwnerKind, ParamError, ParamOwner,
    ParamResult, Setter, Shared, Storage, shared, validate,
};

use crate::module::Module;
use crate::script::{Script, ScriptNode};

/// Settings of a simulation.
#[derive(Debug)]
pub struct SimulationParams {
    title: String,
    script: Rc<ScriptNode>,
}

impl SimulationParams {
    /// Simulation title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The script.
    pub fn script(&self) -> &Rc<ScriptNode> {
        &self.script
    }
}

impl ParamOwner for SimulationParams {
    const KIND: OwnerKind = OwnerKind::Module;
}

/// Simulation module.
///
/// Script steps are searched by label: `CASCADE.bm` is the `CASCADE` field
/// of the module in step `bm`.
#[derive(Debug)]
pub struct Simulation {
    params: Shared<SimulationParams>,
    list: ListRef,
}

impl Simulation {
    /// Untitled simulation running `script`.
    pub fn new(script: Script) -> ParamResult<Self> {
        let params = shared(SimulationParams {
            title: String::new(),
            script: ScriptNode::new(script),
        });
        let list = par_list(&params)?;
        Ok(Self { params, list })
    }

    /// Current settings.
    pub fn params(&self) -> &Shared<SimulationParams> {
        &self.params
    }

    /// Replace the title.
    pub fn set_title(&self, title: &str) -> ParamResult<()> {
        self.params
            .try_borrow_mut()
            .map_err(|_| ParamError::Busy(OwnerKind::Module.name()))?
            .title = title.to_string();
        Ok(())
    }

    /// The script.
    pub fn script(&self) -> ParamResult<Rc<ScriptNode>> {
        Ok(self
            .params
            .try_borrow()
            .map_err(|_| ParamError::Busy(OwnerKind::Module.name()))?
            .script
            .clone())
    }
}

fn par_list(params: &Shared<SimulationParams>) -> ParamResult<ListRef> {
    let Some(mut list) = FieldList::create(params.clone(), 2)? else {
        return Err(ParamError::Allocation { requested: 2 });
    };
    list.define(
        0,
        "TITLE",
        "Simulation title.",
        FieldKind::Str,
        Storage::Str(SimulationParams::title),
        Setter::Str(|p, v| {
            p.title = v.to_string();
            Ok(())
        }),
    )?;
    list.define(
        1,
        "SCRIPT",
        "Simulation script.",
        FieldKind::Script,
        Storage::Child(|p| Some(Child::Provider(p.script.clone()))),
        Setter::Handle,
    )?;
    Ok(list.into_ref())
}

impl Module for Simulation {
    fn id(&self) -> &'static str {
        "simulation"
    }

    fn par_list(&self) -> Option<ListRef> {
        Some(self.list.clone())
    }

    /// Scripts are not part of the module regeneration pass; their steps are
    /// validated here after the simulation's own fields.
    fn validate(&self) -> ParamResult<()> {
        validate(&self.list)?;
        self.script()?.validate()
    }
}
