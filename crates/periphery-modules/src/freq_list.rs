//! Centre-frequency lists for filterbank modules.
//!
//! A [`FreqList`] owns the centre frequencies and bandwidths of a bank of
//! channels. Frequencies come from a spacing rule ([`Spacing`]), bandwidths
//! from a bandwidth rule ([`BandwidthMode`]). Both are derived state: writes
//! to the parameters only mark the list dirty, and the values are rebuilt on
//! the next validation pass.
//!
//! The list exposes two field lists, one for spacing and one for bandwidth
//! parameters, through [`FreqListNode`].
//!
//! # ERB scale
//!
//! Equivalent-rectangular-bandwidth spacing follows Glasberg & Moore (1990):
//!
//! ```text
//! rate(f) = 21.4 · log10(4.37e-3 · f + 1)
//! erb(f)  = 24.7 · (4.37e-3 · f + 1)
//! ```

use std::rc::Rc;

use periphery_core::{
    ElementKind, FieldKind, FieldList, ListProvider, ListRef, MAX_ELEMENTS, NameSpec, OwnerKind,
    ParamError, ParamOwner, ParamResult, Setter, Shared, Storage, SubList, resize_preserving,
    shared, validate,
};

/// How centre frequencies are placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spacing {
    /// One channel at `SINGLE_CF`.
    Single,
    /// Frequencies entered one by one.
    User,
    /// Evenly spaced in Hz between `MIN_CF` and `MAX_CF`.
    Linear,
    /// Evenly spaced on a log axis.
    Log,
    /// Evenly spaced on the ERB-rate scale.
    Erb,
    /// ERB-rate spacing with a fixed density; the channel count follows.
    ErbN,
    /// Log spacing with one channel exactly at `FOCAL_CF`.
    FocalLog,
}

impl Spacing {
    /// Names accepted by `CF_MODE`.
    pub const NAMES: &'static [&'static str] = &[
        "single",
        "user",
        "linear",
        "log",
        "erb",
        "erb_n",
        "focal_log",
    ];

    const ALL: [Spacing; 7] = [
        Spacing::Single,
        Spacing::User,
        Spacing::Linear,
        Spacing::Log,
        Spacing::Erb,
        Spacing::ErbN,
        Spacing::FocalLog,
    ];

    /// Canonical name.
    pub fn name(self) -> &'static str {
        Self::NAMES[self as usize]
    }

    /// Parse a name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.name().eq_ignore_ascii_case(name))
    }

    fn uses_range(self) -> bool {
        !matches!(self, Spacing::Single | Spacing::User)
    }
}

/// How channel bandwidths are derived from centre frequencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandwidthMode {
    /// Bandwidths entered one by one.
    User,
    /// One ERB at each centre frequency.
    Erb,
    /// `BW_MIN + f / QUALITY`.
    CustomErb,
    /// `ERB_SCALE · erb(f)`.
    ScaledErb,
}

impl BandwidthMode {
    /// Names accepted by `B_MODE`.
    pub const NAMES: &'static [&'static str] = &["user", "erb", "custom_erb", "scaled_erb"];

    const ALL: [BandwidthMode; 4] = [
        BandwidthMode::User,
        BandwidthMode::Erb,
        BandwidthMode::CustomErb,
        BandwidthMode::ScaledErb,
    ];

    /// Canonical name.
    pub fn name(self) -> &'static str {
        Self::NAMES[self as usize]
    }

    /// Parse a name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|b| b.name().eq_ignore_ascii_case(name))
    }
}

const SPACING_NAMES: NameSpec = NameSpec::new(Spacing::NAMES);
const BANDWIDTH_NAMES: NameSpec = NameSpec::new(BandwidthMode::NAMES);

/// ERB-rate (in ERB numbers) of frequency `f` Hz.
pub fn erb_rate(f: f64) -> f64 {
    21.4 * libm::log10(4.37e-3 * f + 1.0)
}

/// Frequency in Hz at ERB-rate `rate`.
pub fn erb_rate_to_hz(rate: f64) -> f64 {
    (libm::pow(10.0, rate / 21.4) - 1.0) / 4.37e-3
}

/// Equivalent rectangular bandwidth in Hz at `f` Hz.
pub fn erb_bandwidth(f: f64) -> f64 {
    24.7 * (4.37e-3 * f + 1.0)
}

/// Centre frequencies and bandwidths of a filterbank.
#[derive(Debug, Clone)]
pub struct FreqList {
    spacing: Spacing,
    channels: i32,
    min_cf: f64,
    max_cf: f64,
    single_cf: f64,
    focal_cf: f64,
    erb_density: f64,
    frequencies: Vec<f64>,
    bandwidth_mode: BandwidthMode,
    bw_min: f64,
    quality: f64,
    erb_scale: f64,
    bandwidths: Vec<f64>,
    dirty: bool,
}

impl FreqList {
    /// `channels` frequencies between `min_cf` and `max_cf` using `spacing`,
    /// with ERB bandwidths. Values are computed on the first validation.
    pub fn new(spacing: Spacing, channels: i32, min_cf: f64, max_cf: f64) -> Self {
        Self {
            spacing,
            channels,
            min_cf,
            max_cf,
            single_cf: min_cf,
            focal_cf: min_cf,
            erb_density: 1.0,
            frequencies: Vec::new(),
            bandwidth_mode: BandwidthMode::Erb,
            bw_min: 24.7,
            quality: 9.26449,
            erb_scale: 1.0,
            bandwidths: Vec::new(),
            dirty: true,
        }
    }

    /// Single channel at `cf`.
    pub fn single(cf: f64) -> Self {
        let mut list = Self::new(Spacing::Single, 1, cf, cf);
        list.single_cf = cf;
        list
    }

    /// Frequencies taken as given.
    pub fn user(frequencies: &[f64]) -> Self {
        let mut list = Self::new(Spacing::User, frequencies.len() as i32, 0.0, 0.0);
        list.frequencies = frequencies.to_vec();
        list
    }

    /// Use `mode` for bandwidths.
    pub fn with_bandwidth(mut self, mode: BandwidthMode) -> Self {
        self.bandwidth_mode = mode;
        self
    }

    /// Spacing rule.
    pub fn spacing(&self) -> Spacing {
        self.spacing
    }

    /// Bandwidth rule.
    pub fn bandwidth_mode(&self) -> BandwidthMode {
        self.bandwidth_mode
    }

    /// Number of channels currently generated.
    pub fn channel_count(&self) -> usize {
        self.frequencies.len()
    }

    /// Centre frequencies in Hz.
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    /// Bandwidths in Hz.
    pub fn bandwidths(&self) -> &[f64] {
        &self.bandwidths
    }

    fn spacing_name(&self) -> &str {
        self.spacing.name()
    }

    fn bandwidth_name(&self) -> &str {
        self.bandwidth_mode.name()
    }

    fn empty_range(&self) -> ParamError {
        ParamError::inconsistent(Self::KIND, "empty frequency range")
    }

    fn requested_channels(&self) -> ParamResult<usize> {
        let n = usize::try_from(self.channels)
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| ParamError::inconsistent(Self::KIND, "no channels requested"))?;
        if n > MAX_ELEMENTS {
            return Err(ParamError::Allocation { requested: n });
        }
        Ok(n)
    }

    fn generate_frequencies(&mut self) -> ParamResult<()> {
        let (min, max) = (self.min_cf, self.max_cf);
        if self.spacing.uses_range() && self.spacing != Spacing::ErbN {
            let n = self.requested_channels()?;
            if n > 1 && min >= max {
                return Err(self.empty_range());
            }
        }
        let frequencies = match self.spacing {
            Spacing::Single => vec![self.single_cf],
            Spacing::User => {
                let n = self.requested_channels()?;
                resize_preserving(&mut self.frequencies, n)?;
                self.frequencies.clone()
            }
            Spacing::Linear => {
                let n = self.requested_channels()?;
                if n == 1 {
                    vec![min]
                } else {
                    (0..n)
                        .map(|i| min + (max - min) * i as f64 / (n - 1) as f64)
                        .collect()
                }
            }
            Spacing::Log => {
                let n = self.requested_channels()?;
                self.check_log_bounds()?;
                spread(n, min, max, log_step)
            }
            Spacing::Erb => {
                let n = self.requested_channels()?;
                spread(n, erb_rate(min), erb_rate(max), |lo, hi, t| {
                    erb_rate_to_hz(lo + (hi - lo) * t)
                })
            }
            Spacing::ErbN => {
                if self.erb_density <= 0.0 {
                    return Err(ParamError::inconsistent(
                        Self::KIND,
                        "ERB density must be positive",
                    ));
                }
                if min >= max {
                    return Err(self.empty_range());
                }
                let (lo, hi) = (erb_rate(min), erb_rate(max));
                let points = libm::floor((hi - lo) * self.erb_density) + 1.0;
                if points.is_nan() || points > MAX_ELEMENTS as f64 {
                    return Err(ParamError::inconsistent(
                        Self::KIND,
                        format!("ERB density {} gives more than {MAX_ELEMENTS} channels", self.erb_density),
                    ));
                }
                let n = points as usize;
                (0..n)
                    .map(|i| erb_rate_to_hz(lo + i as f64 / self.erb_density))
                    .collect()
            }
            Spacing::FocalLog => {
                let n = self.requested_channels()?;
                self.check_log_bounds()?;
                let focal = self.focal_cf;
                if focal < min || focal > max {
                    return Err(ParamError::inconsistent(
                        Self::KIND,
                        "focal frequency outside the frequency range",
                    ));
                }
                if n == 1 {
                    vec![focal]
                } else {
                    let span = libm::log(max / min);
                    let below = libm::round(libm::log(focal / min) / span * (n - 1) as f64) as usize;
                    let mut out = spread(below + 1, min, focal, log_step);
                    out.extend(spread(n - below, focal, max, log_step).into_iter().skip(1));
                    out
                }
            }
        };
        self.channels = frequencies.len() as i32;
        self.frequencies = frequencies;
        Ok(())
    }

    fn check_log_bounds(&self) -> ParamResult<()> {
        if self.min_cf <= 0.0 {
            return Err(ParamError::inconsistent(
                Self::KIND,
                "logarithmic spacing needs a positive minimum frequency",
            ));
        }
        Ok(())
    }

    fn generate_bandwidths(&mut self) -> ParamResult<()> {
        let n = self.frequencies.len();
        match self.bandwidth_mode {
            BandwidthMode::User => resize_preserving(&mut self.bandwidths, n)?,
            BandwidthMode::Erb => {
                self.bandwidths = self.frequencies.iter().map(|&f| erb_bandwidth(f)).collect();
            }
            BandwidthMode::CustomErb => {
                if self.quality <= 0.0 {
                    return Err(ParamError::inconsistent(Self::KIND, "quality must be positive"));
                }
                self.bandwidths = self
                    .frequencies
                    .iter()
                    .map(|&f| self.bw_min + f / self.quality)
                    .collect();
            }
            BandwidthMode::ScaledErb => {
                self.bandwidths = self
                    .frequencies
                    .iter()
                    .map(|&f| self.erb_scale * erb_bandwidth(f))
                    .collect();
            }
        }
        Ok(())
    }

    // Accessors bound to fields.

    fn set_spacing(&mut self, name: &str) -> ParamResult<()> {
        self.spacing =
            Spacing::from_name(name).ok_or_else(|| ParamError::rejected("unknown spacing"))?;
        Ok(())
    }

    fn set_channels(&mut self, n: i32) -> ParamResult<()> {
        if n <= 0 {
            return Err(ParamError::rejected("channel count must be positive"));
        }
        self.channels = n;
        if self.spacing == Spacing::User {
            resize_preserving(&mut self.frequencies, n as usize)?;
        }
        Ok(())
    }

    fn set_frequency(&mut self, index: usize, f: f64) -> ParamResult<()> {
        self.frequencies[index] = non_negative(f)?;
        Ok(())
    }

    fn set_bandwidth_mode(&mut self, name: &str) -> ParamResult<()> {
        self.bandwidth_mode = BandwidthMode::from_name(name)
            .ok_or_else(|| ParamError::rejected("unknown bandwidth mode"))?;
        Ok(())
    }

    fn set_bandwidth(&mut self, index: usize, bw: f64) -> ParamResult<()> {
        if bw <= 0.0 {
            return Err(ParamError::rejected("bandwidth must be positive"));
        }
        self.bandwidths[index] = bw;
        Ok(())
    }
}

fn non_negative(f: f64) -> ParamResult<f64> {
    if f < 0.0 {
        Err(ParamError::rejected("frequency must not be negative"))
    } else {
        Ok(f)
    }
}

fn log_step(lo: f64, hi: f64, t: f64) -> f64 {
    if t >= 1.0 { hi } else { lo * libm::pow(hi / lo, t) }
}

/// `n` points from `lo` to `hi` inclusive, placed by `at(lo, hi, t)` for `t` in `[0, 1]`.
fn spread(n: usize, lo: f64, hi: f64, at: impl Fn(f64, f64, f64) -> f64) -> Vec<f64> {
    if n == 1 {
        return vec![at(lo, hi, 0.0)];
    }
    (0..n)
        .map(|i| {
            if i == n - 1 {
                at(lo, hi, 1.0)
            } else {
                at(lo, hi, i as f64 / (n - 1) as f64)
            }
        })
        .collect()
}

impl ParamOwner for FreqList {
    const KIND: OwnerKind = OwnerKind::FreqList;

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    fn regenerate(&mut self) -> ParamResult<()> {
        self.generate_frequencies()?;
        self.generate_bandwidths()
    }

    fn check(&self) -> ParamResult<()> {
        if self.frequencies.is_empty() {
            return Err(ParamError::inconsistent(Self::KIND, "no channels"));
        }
        if self.frequencies.iter().any(|&f| f < 0.0) {
            return Err(ParamError::inconsistent(Self::KIND, "negative frequency"));
        }
        Ok(())
    }
}

fn spacing_list(data: &Shared<FreqList>) -> ParamResult<ListRef> {
    let Some(mut list) = FieldList::create(data.clone(), 8)? else {
        return Err(ParamError::Allocation { requested: 8 });
    };
    list.define(
        0,
        "CF_MODE",
        "Centre frequency spacing mode ('single', 'user', 'linear', 'log', 'erb', 'erb_n', 'focal_log').",
        FieldKind::Name(SPACING_NAMES),
        Storage::Str(FreqList::spacing_name),
        Setter::Str(FreqList::set_spacing),
    )?;
    list.define(
        1,
        "SINGLE_CF",
        "Centre frequency (Hz).",
        FieldKind::Float,
        Storage::Float(|f| f.single_cf),
        Setter::Float(|f, v| {
            f.single_cf = non_negative(v)?;
            Ok(())
        }),
    )?
    .enabled_when(|f| f.spacing == Spacing::Single);
    list.define(
        2,
        "FOCAL_CF",
        "Focal centre frequency (Hz).",
        FieldKind::Float,
        Storage::Float(|f| f.focal_cf),
        Setter::Float(|f, v| {
            f.focal_cf = non_negative(v)?;
            Ok(())
        }),
    )?
    .enabled_when(|f| f.spacing == Spacing::FocalLog);
    list.define(
        3,
        "MIN_CF",
        "Minimum centre frequency (Hz).",
        FieldKind::Float,
        Storage::Float(|f| f.min_cf),
        Setter::Float(|f, v| {
            f.min_cf = non_negative(v)?;
            Ok(())
        }),
    )?
    .enabled_when(|f| f.spacing.uses_range());
    list.define(
        4,
        "MAX_CF",
        "Maximum centre frequency (Hz).",
        FieldKind::Float,
        Storage::Float(|f| f.max_cf),
        Setter::Float(|f, v| {
            f.max_cf = non_negative(v)?;
            Ok(())
        }),
    )?
    .enabled_when(|f| f.spacing.uses_range());
    list.define(
        5,
        "CHANNELS",
        "No. of centre frequencies.",
        FieldKind::Int,
        Storage::Int(|f| f.channels),
        Setter::Int(FreqList::set_channels),
    )?
    .enabled_when(|f| !matches!(f.spacing, Spacing::Single | Spacing::ErbN));
    list.define(
        6,
        "ERB_DENSITY",
        "Channels per ERB.",
        FieldKind::Float,
        Storage::Float(|f| f.erb_density),
        Setter::Float(|f, v| {
            if v <= 0.0 {
                return Err(ParamError::rejected("density must be positive"));
            }
            f.erb_density = v;
            Ok(())
        }),
    )?
    .enabled_when(|f| f.spacing == Spacing::ErbN);
    list.define(
        7,
        "FREQUENCY",
        "Centre frequencies (Hz).",
        FieldKind::Array(ElementKind::Float),
        Storage::FloatArray(FreqList::frequencies),
        Setter::FloatAt(FreqList::set_frequency),
    )?
    .enabled_when(|f| f.spacing == Spacing::User);
    list.refresh_enabled()?;
    Ok(list.into_ref())
}

fn bandwidth_list(data: &Shared<FreqList>) -> ParamResult<ListRef> {
    let Some(mut list) = FieldList::create(data.clone(), 5)? else {
        return Err(ParamError::Allocation { requested: 5 });
    };
    list.define(
        0,
        "B_MODE",
        "Bandwidth mode ('user', 'erb', 'custom_erb', 'scaled_erb').",
        FieldKind::Name(BANDWIDTH_NAMES),
        Storage::Str(FreqList::bandwidth_name),
        Setter::Str(FreqList::set_bandwidth_mode),
    )?;
    list.define(
        1,
        "BW_MIN",
        "Minimum bandwidth (Hz).",
        FieldKind::Float,
        Storage::Float(|f| f.bw_min),
        Setter::Float(|f, v| {
            f.bw_min = non_negative(v)?;
            Ok(())
        }),
    )?
    .enabled_when(|f| f.bandwidth_mode == BandwidthMode::CustomErb);
    list.define(
        2,
        "QUALITY",
        "Ultimate quality factor of the filters.",
        FieldKind::Float,
        Storage::Float(|f| f.quality),
        Setter::Float(|f, v| {
            if v <= 0.0 {
                return Err(ParamError::rejected("quality must be positive"));
            }
            f.quality = v;
            Ok(())
        }),
    )?
    .enabled_when(|f| f.bandwidth_mode == BandwidthMode::CustomErb);
    list.define(
        3,
        "ERB_SCALE",
        "Scale applied to ERB bandwidths.",
        FieldKind::Float,
        Storage::Float(|f| f.erb_scale),
        Setter::Float(|f, v| {
            if v <= 0.0 {
                return Err(ParamError::rejected("scale must be positive"));
            }
            f.erb_scale = v;
            Ok(())
        }),
    )?
    .enabled_when(|f| f.bandwidth_mode == BandwidthMode::ScaledErb);
    list.define(
        4,
        "BANDWIDTH",
        "Filter bandwidths (Hz).",
        FieldKind::Array(ElementKind::Float),
        Storage::FloatArray(FreqList::bandwidths),
        Setter::FloatAt(FreqList::set_bandwidth),
    )?
    .enabled_when(|f| f.bandwidth_mode == BandwidthMode::User);
    list.refresh_enabled()?;
    Ok(list.into_ref())
}

/// A [`FreqList`] together with its spacing and bandwidth field lists.
#[derive(Debug)]
pub struct FreqListNode {
    data: Shared<FreqList>,
    spacing: ListRef,
    bandwidth: ListRef,
}

impl FreqListNode {
    /// Wrap `data` and build its field lists.
    pub fn new(data: FreqList) -> ParamResult<Rc<Self>> {
        let data = shared(data);
        let spacing = spacing_list(&data)?;
        let bandwidth = bandwidth_list(&data)?;
        Ok(Rc::new(Self {
            data,
            spacing,
            bandwidth,
        }))
    }

    /// The frequency list.
    pub fn data(&self) -> &Shared<FreqList> {
        &self.data
    }

    /// Spacing parameters.
    pub fn spacing_list(&self) -> &ListRef {
        &self.spacing
    }

    /// Bandwidth parameters.
    pub fn bandwidth_list(&self) -> &ListRef {
        &self.bandwidth
    }
}

impl ListProvider for FreqListNode {
    fn title(&self) -> String {
        "Centre frequency list".to_string()
    }

    fn sub_lists(&self) -> ParamResult<Vec<SubList>> {
        Ok(vec![
            SubList::new(self.spacing.clone()),
            SubList::new(self.bandwidth.clone()),
        ])
    }

    fn validate(&self) -> ParamResult<()> {
        validate(&self.spacing)?;
        validate(&self.bandwidth)
    }
}
