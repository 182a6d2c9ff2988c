//! Composite peripheral model: a basilar-membrane filterbank followed by an
//! inner-hair-cell compression stage.

use periphery_core::{
    Child, FieldKind, FieldList, ListRef, OwnerKind, ParamError, ParamOwner, ParamResult, Setter,
    Shared, Storage, shared,
};

use crate::compression::Compression;
use crate::gammatone::Gammatone;
use crate::module::Module;

/// Settings of the composite ear.
#[derive(Debug)]
pub struct EarParams {
    gain: f64,
    bm: Gammatone,
    ihc: Compression,
}

impl EarParams {
    /// Middle-ear gain (dB).
    pub fn gain_db(&self) -> f64 {
        self.gain
    }

    /// Basilar-membrane stage.
    pub fn bm(&self) -> &Gammatone {
        &self.bm
    }

    /// Inner-hair-cell stage.
    pub fn ihc(&self) -> &Compression {
        &self.ihc
    }
}

impl ParamOwner for EarParams {
    const KIND: OwnerKind = OwnerKind::Module;
}

/// Composite ear module.
///
/// Nested stages are addressed by qualifying names with the stage field:
/// `GAIN` is the ear's own gain, `GAIN.BM` the filterbank's.
#[derive(Debug)]
pub struct Ear {
    params: Shared<EarParams>,
    list: ListRef,
}

impl Ear {
    /// Ear with default stages.
    pub fn new() -> ParamResult<Self> {
        let params = shared(EarParams {
            gain: 0.0,
            bm: Gammatone::new()?,
            ihc: Compression::new()?,
        });
        let list = par_list(&params)?;
        Ok(Self { params, list })
    }

    /// Current settings.
    pub fn params(&self) -> &Shared<EarParams> {
        &self.params
    }
}

fn par_list(params: &Shared<EarParams>) -> ParamResult<ListRef> {
    let Some(mut list) = FieldList::create(params.clone(), 3)? else {
        return Err(ParamError::Allocation { requested: 3 });
    };
    list.define(
        0,
        "GAIN",
        "Middle-ear gain (dB).",
        FieldKind::Float,
        Storage::Float(EarParams::gain_db),
        Setter::Float(|p, v| {
            p.gain = v;
            Ok(())
        }),
    )?;
    list.define(
        1,
        "BM",
        "Basilar membrane filterbank.",
        FieldKind::Module,
        Storage::Child(|p| p.bm.par_list().map(Child::List)),
        Setter::Handle,
    )?;
    list.define(
        2,
        "IHC",
        "Inner hair cell compression.",
        FieldKind::Module,
        Storage::Child(|p| p.ihc.par_list().map(Child::List)),
        Setter::Handle,
    )?;
    Ok(list.into_ref())
}

impl Module for Ear {
    fn id(&self) -> &'static str {
        "ear"
    }

    fn par_list(&self) -> Option<ListRef> {
        Some(self.list.clone())
    }
}
