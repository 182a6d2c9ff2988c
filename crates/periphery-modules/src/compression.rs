//! Static compression nonlinearity.
//!
//! Applies one of several input/output laws to a signal sample:
//!
//! | Law            | Parameters                      | Output                                  |
//! |----------------|---------------------------------|-----------------------------------------|
//! | `power`        | `[gain, exponent]`              | `gain·|x|^exponent`                     |
//! | `broken_stick` | `[threshold, gain, exponent]`   | linear below threshold, power above     |
//! | `log`          | `[gain, scale]`                 | `gain·ln(1 + scale·|x|)`                |
//!
//! The sign of the input is kept, and the result is scaled by `OUTPUT_GAIN`.
//! Every write to the law bumps a revision counter so a running stage can
//! notice that its coefficients changed.

use std::cell::Cell;
use std::rc::Rc;

use periphery_core::{
    Child, FieldKind, FieldList, ListRef, OwnerKind, ParamError, ParamOwner, ParamResult, Setter,
    Shared, Storage, shared,
};

use crate::module::Module;
use crate::param_array::{ParamArray, ParamArrayNode, ParamArraySpec};

/// Compression laws.
pub static COMPRESSION_LAW: ParamArraySpec = ParamArraySpec {
    mode_field: "LAW",
    param_field: "LAW_PARAM",
    mode_description: "Compression law ('power', 'broken_stick' or 'log').",
    param_description: "Compression law parameters.",
    modes: &["power", "broken_stick", "log"],
    param_counts: &[2, 3, 2],
};

/// Settings of a compression stage.
#[derive(Debug)]
pub struct CompressionParams {
    output_gain: f64,
    law: Rc<ParamArrayNode>,
}

impl CompressionParams {
    /// Output gain (dB).
    pub fn output_gain_db(&self) -> f64 {
        self.output_gain
    }

    /// The compression law.
    pub fn law(&self) -> &Rc<ParamArrayNode> {
        &self.law
    }
}

impl ParamOwner for CompressionParams {
    const KIND: OwnerKind = OwnerKind::Module;
}

/// Compression module.
#[derive(Debug)]
pub struct Compression {
    params: Shared<CompressionParams>,
    list: ListRef,
    revision: Rc<Cell<u64>>,
}

impl Compression {
    /// Power-law compression with exponent 0.3.
    pub fn new() -> ParamResult<Self> {
        Self::with_law("power", &[1.0, 0.3])
    }

    /// Compression with the named law and parameters.
    pub fn with_law(law: &str, params: &[f64]) -> ParamResult<Self> {
        let revision = Rc::new(Cell::new(0));
        let counter = revision.clone();
        let law = ParamArray::new(&COMPRESSION_LAW, law, params)?
            .with_write_hook(Rc::new(move |_: &ParamArray| counter.set(counter.get() + 1)));
        let params = shared(CompressionParams {
            output_gain: 0.0,
            law: ParamArrayNode::new(law)?,
        });
        let list = par_list(&params)?;
        Ok(Self {
            params,
            list,
            revision,
        })
    }

    /// Current settings.
    pub fn params(&self) -> &Shared<CompressionParams> {
        &self.params
    }

    /// Number of writes to the compression law so far.
    pub fn revision(&self) -> u64 {
        self.revision.get()
    }

    /// Compress one sample.
    pub fn apply(&self, x: f64) -> ParamResult<f64> {
        let params = self
            .params
            .try_borrow()
            .map_err(|_| ParamError::Busy(OwnerKind::Module.name()))?;
        let law = params
            .law
            .data()
            .try_borrow()
            .map_err(|_| ParamError::Busy(OwnerKind::ParamArray.name()))?;
        let p = law.params();
        let mag = x.abs();
        let y = match (law.mode(), p) {
            ("power", &[gain, exponent]) => gain * libm::pow(mag, exponent),
            ("broken_stick", &[threshold, gain, exponent]) => {
                if mag < threshold {
                    gain * mag
                } else {
                    gain * threshold * libm::pow(mag / threshold, exponent)
                }
            }
            ("log", &[gain, scale]) => gain * libm::log1p(scale * mag),
            (mode, _) => {
                return Err(ParamError::inconsistent(
                    OwnerKind::ParamArray,
                    format!("law '{mode}' has {} parameters", p.len()),
                ));
            }
        };
        let out_gain = libm::pow(10.0, params.output_gain / 20.0);
        Ok(libm::copysign(y, x) * out_gain)
    }
}

fn par_list(params: &Shared<CompressionParams>) -> ParamResult<ListRef> {
    let Some(mut list) = FieldList::create(params.clone(), 2)? else {
        return Err(ParamError::Allocation { requested: 2 });
    };
    list.define(
        0,
        "OUTPUT_GAIN",
        "Output gain (dB).",
        FieldKind::Float,
        Storage::Float(CompressionParams::output_gain_db),
        Setter::Float(|p, v| {
            p.output_gain = v;
            Ok(())
        }),
    )?;
    list.define(
        1,
        "COMPRESSION",
        "Compression law and its parameters.",
        FieldKind::ParamArray,
        Storage::Child(|p| Some(Child::Provider(p.law.clone()))),
        Setter::Handle,
    )?;
    Ok(list.into_ref())
}

impl Module for Compression {
    fn id(&self) -> &'static str {
        "compression"
    }

    fn par_list(&self) -> Option<ListRef> {
        Some(self.list.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use periphery_core::set_param;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-12, "{a} != {b}");
    }

    #[test]
    fn power_law_keeps_sign() {
        let c = Compression::with_law("power", &[2.0, 0.5]).unwrap();
        assert_close(c.apply(4.0).unwrap(), 4.0);
        assert_close(c.apply(-4.0).unwrap(), -4.0);
    }

    #[test]
    fn broken_stick_is_linear_below_threshold() {
        let c = Compression::with_law("broken_stick", &[1.0, 3.0, 0.5]).unwrap();
        assert_close(c.apply(0.5).unwrap(), 1.5);
        assert_close(c.apply(4.0).unwrap(), 6.0);
    }

    #[test]
    fn law_writes_bump_the_revision() {
        let c = Compression::new().unwrap();
        set_param(&c.list, "LAW", "log").unwrap();
        set_param(&c.list, "LAW_PARAM", "1:10").unwrap();
        set_param(&c.list, "OUTPUT_GAIN", "20").unwrap();
        assert_eq!(c.revision(), 2);
        c.validate().unwrap();
        assert_close(c.apply(0.1).unwrap(), 10.0 * libm::log1p(1.0));
    }
}
