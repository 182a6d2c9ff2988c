//! Hodgkin-Huxley point-neuron parameters.

use std::rc::Rc;

use periphery_core::{
    Child, FieldKind, FieldList, ListRef, OwnerKind, ParamError, ParamOwner, ParamResult, Setter,
    Shared, Storage, shared,
};

use crate::ion_channel::{IonChannelList, IonChannelListNode};
use crate::module::Module;

/// Settings of a Hodgkin-Huxley neuron.
#[derive(Debug)]
pub struct HHuxleyParams {
    debug: bool,
    capacitance: f64,
    excit_rev_pot: f64,
    inhib_rev_pot: f64,
    channels: Rc<IonChannelListNode>,
}

impl HHuxleyParams {
    /// Membrane capacitance (F).
    pub fn capacitance(&self) -> f64 {
        self.capacitance
    }

    /// Excitatory and inhibitory synapse reversal potentials (V).
    pub fn reversal_potentials(&self) -> (f64, f64) {
        (self.excit_rev_pot, self.inhib_rev_pot)
    }

    /// Whether table dumps are requested.
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// The ion channels.
    pub fn channels(&self) -> &Rc<IonChannelListNode> {
        &self.channels
    }
}

impl ParamOwner for HHuxleyParams {
    const KIND: OwnerKind = OwnerKind::Module;
}

/// Hodgkin-Huxley neuron module.
#[derive(Debug)]
pub struct HHuxley {
    params: Shared<HHuxleyParams>,
    list: ListRef,
}

impl HHuxley {
    /// Neuron with the classic sodium/potassium pair of channels.
    pub fn new() -> ParamResult<Self> {
        Self::with_channels(IonChannelList::new(2))
    }

    /// Neuron with the given channel list.
    pub fn with_channels(channels: IonChannelList) -> ParamResult<Self> {
        let params = shared(HHuxleyParams {
            debug: false,
            capacitance: 1.5e-12,
            excit_rev_pot: 0.0,
            inhib_rev_pot: -0.08,
            channels: IonChannelListNode::new(channels)?,
        });
        let list = par_list(&params)?;
        Ok(Self { params, list })
    }

    /// Current settings.
    pub fn params(&self) -> &Shared<HHuxleyParams> {
        &self.params
    }
}

fn par_list(params: &Shared<HHuxleyParams>) -> ParamResult<ListRef> {
    let Some(mut list) = FieldList::create(params.clone(), 5)? else {
        return Err(ParamError::Allocation { requested: 5 });
    };
    list.define(
        0,
        "DEBUG",
        "Debug mode ('on' or 'off').",
        FieldKind::Bool,
        Storage::Bool(HHuxleyParams::debug),
        Setter::Bool(|p, v| {
            p.debug = v;
            Ok(())
        }),
    )?;
    list.define(
        1,
        "CAPACITANCE",
        "Membrane capacitance (F).",
        FieldKind::Float,
        Storage::Float(HHuxleyParams::capacitance),
        Setter::Float(|p, v| {
            if v <= 0.0 {
                return Err(ParamError::rejected("capacitance must be positive"));
            }
            p.capacitance = v;
            Ok(())
        }),
    )?;
    list.define(
        2,
        "EXCIT_REV_POT",
        "Excitatory reversal potential (V).",
        FieldKind::Float,
        Storage::Float(|p| p.excit_rev_pot),
        Setter::Float(|p, v| {
            p.excit_rev_pot = v;
            Ok(())
        }),
    )?;
    list.define(
        3,
        "INHIB_REV_POT",
        "Inhibitory reversal potential (V).",
        FieldKind::Float,
        Storage::Float(|p| p.inhib_rev_pot),
        Setter::Float(|p, v| {
            p.inhib_rev_pot = v;
            Ok(())
        }),
    )?;
    list.define(
        4,
        "IC_LIST",
        "Ion channel list.",
        FieldKind::IonChannelList,
        Storage::Child(|p| Some(Child::Provider(p.channels.clone()))),
        Setter::Handle,
    )?;
    Ok(list.into_ref())
}

impl Module for HHuxley {
    fn id(&self) -> &'static str {
        "hhuxley"
    }

    fn par_list(&self) -> Option<ListRef> {
        Some(self.list.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use periphery_core::{ParamOwner as _, set_param};

    #[test]
    fn qualified_names_reach_individual_channels() {
        let neuron = HHuxley::new().unwrap();
        set_param(&neuron.list, "CONDUCTANCE.1", "1e-8").unwrap();
        neuron.validate().unwrap();
        let channels = neuron.params().borrow().channels().clone();
        let data = channels.data().borrow();
        assert_eq!(data.elements()[0].borrow().conductance(), 3.6e-8);
        assert_eq!(data.elements()[1].borrow().conductance(), 1e-8);
        assert!(!data.is_dirty());
    }

    #[test]
    fn channel_count_change_regenerates_on_validate() {
        let neuron = HHuxley::new().unwrap();
        neuron.validate().unwrap();
        set_param(&neuron.list, "NUM_CHANNELS", "3").unwrap();
        neuron.validate().unwrap();
        let channels = neuron.params().borrow().channels().clone();
        let data = channels.data().borrow();
        assert_eq!(data.elements().len(), 3);
        assert!(data.elements().iter().all(|e| !e.borrow().table().is_empty()));
    }
}
