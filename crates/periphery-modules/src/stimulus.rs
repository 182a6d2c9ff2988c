//! Multi-tone stimulus parameters.
//!
//! A stimulus is a sum of pure tones. The tone count sets the length of the
//! per-tone arrays; the frequency array grows on demand instead, so a
//! parameter file may list frequencies before it sets the count.

use periphery_core::{
    ElementKind, FieldKind, FieldList, ListRef, NameSpec, OwnerKind, ParamError, ParamOwner,
    ParamResult, Setter, Shared, Storage, resize_preserving, resize_with_preserving, shared,
};

use crate::module::Module;

/// Onset/offset ramp shapes.
pub const RAMPS: NameSpec = NameSpec::new(&["sine", "linear", "none"]);

/// Starting phase of each tone.
pub const PHASE_MODES: NameSpec = NameSpec::new(&["sine", "cosine", "random"]);

/// Side of the stereo mixing matrix.
pub const MIX_SIZE: usize = 2;

/// Settings of a multi-tone stimulus.
#[derive(Debug, Clone)]
pub struct StimulusParams {
    label: String,
    out_file: String,
    seed: i64,
    ramp: String,
    duration: f64,
    tones: i32,
    frequencies: Vec<f64>,
    levels: Vec<f64>,
    phase_modes: Vec<String>,
    tone_names: Vec<String>,
    tone_on: Vec<bool>,
    onsets: Vec<i32>,
    mix: Vec<f64>,
}

impl Default for StimulusParams {
    fn default() -> Self {
        Self {
            label: "tone".to_string(),
            out_file: "stimulus.dat".to_string(),
            seed: 0,
            ramp: "sine".to_string(),
            duration: 0.1,
            tones: 1,
            frequencies: vec![1000.0],
            levels: vec![60.0],
            phase_modes: vec!["sine".to_string()],
            tone_names: vec!["tone1".to_string()],
            tone_on: vec![true],
            onsets: vec![0],
            mix: vec![1.0, 0.0, 0.0, 1.0],
        }
    }
}

impl StimulusParams {
    /// Free-text label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Output file name.
    pub fn out_file(&self) -> &str {
        &self.out_file
    }

    /// Random seed.
    pub fn seed(&self) -> i64 {
        self.seed
    }

    /// Ramp shape.
    pub fn ramp(&self) -> &str {
        &self.ramp
    }

    /// Duration (s).
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Number of tones.
    pub fn tone_count(&self) -> usize {
        usize::try_from(self.tones).unwrap_or(0)
    }

    /// Tone frequencies (Hz); may be longer than the tone count.
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    /// Tone levels (dB SPL).
    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    /// Starting phase of each tone.
    pub fn phase_modes(&self) -> &[String] {
        &self.phase_modes
    }

    /// Tone names.
    pub fn tone_names(&self) -> &[String] {
        &self.tone_names
    }

    /// Tone switches.
    pub fn tone_on(&self) -> &[bool] {
        &self.tone_on
    }

    /// Tone onsets (samples).
    pub fn onsets(&self) -> &[i32] {
        &self.onsets
    }

    /// Row-major stereo mixing matrix.
    pub fn mix(&self) -> (&[f64], usize) {
        (&self.mix, MIX_SIZE)
    }

    fn frequencies_mut(&mut self) -> &mut Vec<f64> {
        &mut self.frequencies
    }

    fn set_tones(&mut self, tones: i32) -> ParamResult<()> {
        let n = usize::try_from(tones)
            .map_err(|_| ParamError::rejected("tone count must not be negative"))?;
        resize_preserving(&mut self.levels, n)?;
        resize_with_preserving(&mut self.phase_modes, n, || "sine".to_string())?;
        resize_preserving(&mut self.tone_names, n)?;
        resize_with_preserving(&mut self.tone_on, n, || true)?;
        resize_preserving(&mut self.onsets, n)?;
        self.tones = tones;
        Ok(())
    }
}

impl ParamOwner for StimulusParams {
    const KIND: OwnerKind = OwnerKind::Module;
}

/// Multi-tone stimulus module.
#[derive(Debug)]
pub struct Stimulus {
    params: Shared<StimulusParams>,
    list: ListRef,
}

impl Stimulus {
    /// A single 1 kHz tone at 60 dB SPL.
    pub fn new() -> ParamResult<Self> {
        let params = shared(StimulusParams::default());
        let list = par_list(&params)?;
        Ok(Self { params, list })
    }

    /// Current settings.
    pub fn params(&self) -> &Shared<StimulusParams> {
        &self.params
    }
}

fn par_list(params: &Shared<StimulusParams>) -> ParamResult<ListRef> {
    let Some(mut list) = FieldList::create(params.clone(), 13)? else {
        return Err(ParamError::Allocation { requested: 13 });
    };
    list.define(
        0,
        "LABEL",
        "Stimulus label.",
        FieldKind::Str,
        Storage::Str(StimulusParams::label),
        Setter::Str(|p, v| {
            p.label = v.to_string();
            Ok(())
        }),
    )?;
    list.define(
        1,
        "OUT_FILE",
        "Output file name.",
        FieldKind::FileName { default_ext: "dat" },
        Storage::Str(StimulusParams::out_file),
        Setter::Str(|p, v| {
            p.out_file = v.to_string();
            Ok(())
        }),
    )?;
    list.define(
        2,
        "SEED",
        "Random number seed.",
        FieldKind::Long,
        Storage::Long(StimulusParams::seed),
        Setter::Long(|p, v| {
            p.seed = v;
            Ok(())
        }),
    )?;
    list.define(
        3,
        "RAMP",
        "Ramp shape ('sine', 'linear' or 'none').",
        FieldKind::Name(RAMPS),
        Storage::Str(StimulusParams::ramp),
        Setter::Str(|p, v| {
            p.ramp = v.to_string();
            Ok(())
        }),
    )?;
    list.define(
        4,
        "DURATION",
        "Duration (s).",
        FieldKind::Float,
        Storage::Float(StimulusParams::duration),
        Setter::Float(|p, v| {
            if v <= 0.0 {
                return Err(ParamError::rejected("duration must be positive"));
            }
            p.duration = v;
            Ok(())
        }),
    )?;
    list.define(
        5,
        "NUM_TONES",
        "Number of tones.",
        FieldKind::Int,
        Storage::Int(|p| p.tones),
        Setter::Int(StimulusParams::set_tones),
    )?;
    list.define(
        6,
        "FREQUENCIES",
        "Tone frequencies (Hz).",
        FieldKind::DynFloatArray,
        Storage::DynFloatArray {
            view: StimulusParams::frequencies,
            backing: StimulusParams::frequencies_mut,
        },
        Setter::FloatAt(|p, i, v| {
            if v < 0.0 {
                return Err(ParamError::rejected("frequency must not be negative"));
            }
            p.frequencies[i] = v;
            Ok(())
        }),
    )?;
    list.define(
        7,
        "LEVELS",
        "Tone levels (dB SPL).",
        FieldKind::Array(ElementKind::Float),
        Storage::FloatArray(StimulusParams::levels),
        Setter::FloatAt(|p, i, v| {
            p.levels[i] = v;
            Ok(())
        }),
    )?;
    list.define(
        8,
        "PHASE_MODES",
        "Starting phase of each tone ('sine', 'cosine' or 'random').",
        FieldKind::Array(ElementKind::Name(PHASE_MODES)),
        Storage::StrArray(StimulusParams::phase_modes),
        Setter::StrAt(|p, i, v| {
            p.phase_modes[i] = v.to_string();
            Ok(())
        }),
    )?;
    list.define(
        9,
        "TONE_NAMES",
        "Tone names.",
        FieldKind::Array(ElementKind::Str),
        Storage::StrArray(StimulusParams::tone_names),
        Setter::StrAt(|p, i, v| {
            p.tone_names[i] = v.to_string();
            Ok(())
        }),
    )?;
    list.define(
        10,
        "TONE_ON",
        "Tone switches.",
        FieldKind::Array(ElementKind::Bool),
        Storage::BoolArray(StimulusParams::tone_on),
        Setter::BoolAt(|p, i, v| {
            p.tone_on[i] = v;
            Ok(())
        }),
    )?;
    list.define(
        11,
        "ONSETS",
        "Tone onsets (samples).",
        FieldKind::Array(ElementKind::Int),
        Storage::IntArray(StimulusParams::onsets),
        Setter::IntAt(|p, i, v| {
            if v < 0 {
                return Err(ParamError::rejected("onset must not be negative"));
            }
            p.onsets[i] = v;
            Ok(())
        }),
    )?;
    list.define(
        12,
        "MIX",
        "Stereo mixing matrix.",
        FieldKind::FloatMatrix,
        Storage::FloatMatrix(StimulusParams::mix),
        Setter::FloatAt2(|p, row, col, v| {
            p.mix[row * MIX_SIZE + col] = v;
            Ok(())
        }),
    )?;
    Ok(list.into_ref())
}

impl Module for Stimulus {
    fn id(&self) -> &'static str {
        "stimulus"
    }

    fn par_list(&self) -> Option<ListRef> {
        Some(self.list.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use periphery_core::{ParList, apply_text, render_to_string, set_param};

    #[test]
    fn tone_count_resizes_per_tone_arrays() {
        let s = Stimulus::new().unwrap();
        set_param(&s.list, "LEVELS", "0:40").unwrap();
        set_param(&s.list, "NUM_TONES", "3").unwrap();
        let p = s.params().borrow();
        assert_eq!(p.levels(), &[40.0, 0.0, 0.0]);
        assert_eq!(p.phase_modes().len(), 3);
        assert_eq!(p.tone_on(), &[true, true, true]);
        assert_eq!(p.frequencies().len(), 1);
    }

    #[test]
    fn every_kind_renders_and_reads_back() {
        let s = Stimulus::new().unwrap();
        apply_text(
            &s.list,
            "NUM_TONES 2\n\
             FREQUENCIES 1:2000\n\
             PHASE_MODES 1:COSINE\n\
             TONE_NAMES 1:\"second tone\"\n\
             TONE_ON 0:off\n\
             ONSETS 1:40\n\
             MIX 0:1:0.5\n\
             SEED 123456789012\n\
             OUT_FILE run1\n",
        )
        .unwrap();
        let text = render_to_string(&s.list).unwrap();
        let copy = Stimulus::new().unwrap();
        apply_text(&copy.list, &text).unwrap();
        let (a, b) = (s.params().borrow(), copy.params().borrow());
        assert_eq!(b.frequencies(), &[1000.0, 2000.0]);
        assert_eq!(b.phase_modes()[1], "cosine");
        assert_eq!(b.tone_names()[1], "second tone");
        assert_eq!(b.out_file(), "run1.dat");
        assert_eq!(b.mix(), (&[1.0, 0.5, 0.0, 1.0][..], MIX_SIZE));
        assert_eq!(a.seed(), b.seed());
        assert_eq!(a.tone_on(), b.tone_on());
        assert_eq!(a.onsets(), b.onsets());
    }

    #[test]
    fn negative_tone_count_is_rejected() {
        let s = Stimulus::new().unwrap();
        assert!(set_param(&s.list, "NUM_TONES", "-1").is_err());
        assert_eq!(s.params().borrow().tone_count(), 1);
        assert!(!s.list.borrow().is_dirty());
    }
}
