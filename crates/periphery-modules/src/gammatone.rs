//! Gammatone basilar-membrane filterbank parameters.
//!
//! A cascade of first-order complex filters per channel; channel centre
//! frequencies and bandwidths come from a [`FreqList`].

use std::rc::Rc;

use periphery_core::{
    Child, FieldKind, FieldList, ListRef, OwnerKind, ParamError, ParamOwner, ParamResult, Setter,
    Shared, Storage, shared,
};

use crate::freq_list::{FreqList, FreqListNode, Spacing};
use crate::module::Module;

/// Settings of a gammatone filterbank.
#[derive(Debug)]
pub struct GammatoneParams {
    cascade: i32,
    gain: f64,
    cf: Rc<FreqListNode>,
}

impl GammatoneParams {
    /// Filter order.
    pub fn cascade(&self) -> i32 {
        self.cascade
    }

    /// Pre-filter gain (dB).
    pub fn gain_db(&self) -> f64 {
        self.gain
    }

    /// Centre frequencies.
    pub fn cf(&self) -> &Rc<FreqListNode> {
        &self.cf
    }
}

impl ParamOwner for GammatoneParams {
    const KIND: OwnerKind = OwnerKind::Module;
}

/// Gammatone filterbank module.
#[derive(Debug)]
pub struct Gammatone {
    params: Shared<GammatoneParams>,
    list: ListRef,
}

impl Gammatone {
    /// Fourth-order filterbank over 30 ERB-spaced channels from 100 Hz to 8 kHz.
    pub fn new() -> ParamResult<Self> {
        Self::with_cf(FreqList::new(Spacing::Erb, 30, 100.0, 8000.0))
    }

    /// Fourth-order filterbank over the given frequency list.
    pub fn with_cf(cf: FreqList) -> ParamResult<Self> {
        let params = shared(GammatoneParams {
            cascade: 4,
            gain: 0.0,
            cf: FreqListNode::new(cf)?,
        });
        let list = par_list(&params)?;
        Ok(Self { params, list })
    }

    /// Current settings.
    pub fn params(&self) -> &Shared<GammatoneParams> {
        &self.params
    }
}

fn par_list(params: &Shared<GammatoneParams>) -> ParamResult<ListRef> {
    let Some(mut list) = FieldList::create(params.clone(), 3)? else {
        return Err(ParamError::Allocation { requested: 3 });
    };
    list.define(
        0,
        "CASCADE",
        "Filter cascade order.",
        FieldKind::Int,
        Storage::Int(GammatoneParams::cascade),
        Setter::Int(|p, v| {
            if v < 1 {
                return Err(ParamError::rejected("cascade must be at least 1"));
            }
            p.cascade = v;
            Ok(())
        }),
    )?
    .with_alt_name("ORDER");
    list.define(
        1,
        "GAIN",
        "Pre-filter gain (dB).",
        FieldKind::Float,
        Storage::Float(GammatoneParams::gain_db),
        Setter::Float(|p, v| {
            p.gain = v;
            Ok(())
        }),
    )?;
    list.define(
        2,
        "CF_LIST",
        "Centre frequency specification.",
        FieldKind::FreqList,
        Storage::Child(|p| Some(Child::Provider(p.cf.clone()))),
        Setter::Handle,
    )?;
    Ok(list.into_ref())
}

impl Module for Gammatone {
    fn id(&self) -> &'static str {
        "gammatone"
    }

    fn par_list(&self) -> Option<ListRef> {
        Some(self.list.clone())
    }
}
