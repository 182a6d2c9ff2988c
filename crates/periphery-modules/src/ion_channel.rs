//! Voltage-dependent ion channels.
//!
//! An [`IonChannelList`] carries the settings shared by a neuron's channels
//! (table voltage grid, temperature, leakage) and an ordered collection of
//! [`IonChannel`] elements. Each element owns a lookup table of steady-state
//! activation and time constant against membrane voltage, computed from
//! Hodgkin-Huxley rate functions, a Boltzmann curve, or read from a file.
//!
//! Both levels are regenerated lazily: changing the channel count or the grid
//! marks the list dirty, and the next validation pass resizes the collection
//! ([`IonChannelList::prepare_elements`]); changing an element marks that
//! element dirty, and the pass rebuilds its table ([`IonChannel::reset`]).
//!
//! Rate functions take voltages in volts and return rates in 1/s:
//!
//! ```text
//! α(V) = A · exp((V - B) / C)      with ALPHA = [A, B, C]
//! β(V) = A · exp((V - B) / C)      with BETA  = [A, B, C]
//! φ    = 3 ^ ((T - 6.3) / 10)
//! ```

use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use periphery_core::{
    ElementKind, FieldKind, FieldList, FieldMeta, ListProvider, ListRef, MAX_ELEMENTS, NameSpec,
    OwnerKind, ParamError, ParamOwner, ParamResult, Setter, Shared, Storage, SubList,
    resize_with_preserving, shared, validate,
};

/// Built-in channel models; any other value names a table file.
pub const CHANNEL_MODES: NameSpec = NameSpec::with_file(&["hhuxley", "boltzmann"]);

/// `default` means table files are looked up relative to the working directory.
pub const BASE_DIRS: NameSpec = NameSpec::with_path(&["default"]);

/// Voltage grid and temperature shared by every table of a list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableGrid {
    /// Lowest voltage (V).
    pub v_min: f64,
    /// Highest voltage (V).
    pub v_max: f64,
    /// Voltage step (V).
    pub v_step: f64,
    /// Temperature (°C).
    pub temperature: f64,
}

impl TableGrid {
    /// Number of grid points, both ends included; zero for an unusable grid.
    pub fn len(&self) -> usize {
        self.points().unwrap_or(0)
    }

    /// Number of grid points, or why the grid cannot be tabulated.
    pub fn points(&self) -> ParamResult<usize> {
        if self.v_step.is_nan() || self.v_step <= 0.0 {
            return Err(ParamError::inconsistent(
                OwnerKind::IonChannelList,
                "voltage step must be positive",
            ));
        }
        if self.v_min.is_nan() || self.v_max.is_nan() || self.v_max < self.v_min {
            return Err(ParamError::inconsistent(
                OwnerKind::IonChannelList,
                "voltage grid is empty (V_MIN must be below V_MAX)",
            ));
        }
        let points = libm::round((self.v_max - self.v_min) / self.v_step) + 1.0;
        if points.is_nan() || points > MAX_ELEMENTS as f64 {
            return Err(ParamError::inconsistent(
                OwnerKind::IonChannelList,
                format!("voltage grid has more than {MAX_ELEMENTS} points"),
            ));
        }
        Ok(points as usize)
    }

    /// Whether the grid has no points.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Voltage at grid point `i`.
    pub fn voltage(&self, i: usize) -> f64 {
        self.v_min + self.v_step * i as f64
    }

    /// Temperature scaling of rate constants.
    pub fn q10_factor(&self) -> f64 {
        libm::pow(3.0, (self.temperature - 6.3) / 10.0)
    }
}

impl Default for TableGrid {
    fn default() -> Self {
        Self {
            v_min: -0.1,
            v_max: 0.05,
            v_step: 0.0005,
            temperature: 22.0,
        }
    }
}

/// One entry of a channel lookup table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableRow {
    /// Membrane voltage (V).
    pub voltage: f64,
    /// Steady-state activation.
    pub activation: f64,
    /// Activation time constant (s).
    pub tau: f64,
}

/// A single voltage-dependent conductance.
#[derive(Debug, Clone)]
pub struct IonChannel {
    description: String,
    enabled: bool,
    mode: String,
    equil_pot: f64,
    conductance: f64,
    activation_exp: i32,
    alpha: Vec<f64>,
    beta: Vec<f64>,
    v_half: f64,
    slope: f64,
    tau: f64,
    grid: TableGrid,
    base_dir: String,
    table: Vec<TableRow>,
    dirty: bool,
}

impl Default for IonChannel {
    fn default() -> Self {
        Self {
            description: String::new(),
            enabled: true,
            mode: "hhuxley".to_string(),
            equil_pot: -0.077,
            conductance: 3.6e-8,
            activation_exp: 4,
            alpha: vec![100.0, -0.055, 0.01],
            beta: vec![125.0, -0.065, -0.08],
            v_half: -0.04,
            slope: 0.005,
            tau: 1e-3,
            grid: TableGrid::default(),
            base_dir: "default".to_string(),
            table: Vec::new(),
            dirty: true,
        }
    }
}

impl IonChannel {
    /// Free-text description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether the channel takes part in the simulation.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Model name or table file.
    pub fn mode(&self) -> &str {
        &self.mode
    }

    /// Maximum conductance (S).
    pub fn conductance(&self) -> f64 {
        self.conductance
    }

    /// Reversal potential (V).
    pub fn equilibrium_potential(&self) -> f64 {
        self.equil_pot
    }

    /// Exponent applied to the activation variable.
    pub fn activation_exponent(&self) -> i32 {
        self.activation_exp
    }

    /// Grid the table was last built on.
    pub fn grid(&self) -> TableGrid {
        self.grid
    }

    /// Lookup table; empty until the first reset.
    pub fn table(&self) -> &[TableRow] {
        &self.table
    }

    fn alpha(&self) -> &[f64] {
        &self.alpha
    }

    fn beta(&self) -> &[f64] {
        &self.beta
    }

    /// Rebuild the lookup table for the current grid and model.
    pub fn reset(&mut self) -> ParamResult<()> {
        self.table = match self.mode.as_str() {
            "hhuxley" => self.hhuxley_table()?,
            "boltzmann" => self.boltzmann_table()?,
            _ => self.read_table()?,
        };
        Ok(())
    }

    fn hhuxley_table(&self) -> ParamResult<Vec<TableRow>> {
        if self.alpha[2] == 0.0 || self.beta[2] == 0.0 {
            return Err(ParamError::inconsistent(
                Self::KIND,
                "zero slope in a rate coefficient",
            ));
        }
        let rate = |c: &[f64], v: f64| c[0] * libm::exp((v - c[1]) / c[2]);
        let phi = self.grid.q10_factor();
        self.tabulate(|voltage| {
            let a = rate(&self.alpha, voltage);
            let b = rate(&self.beta, voltage);
            TableRow {
                voltage,
                activation: a / (a + b),
                tau: 1.0 / (phi * (a + b)),
            }
        })
    }

    fn boltzmann_table(&self) -> ParamResult<Vec<TableRow>> {
        if self.slope == 0.0 {
            return Err(ParamError::inconsistent(Self::KIND, "zero Boltzmann slope"));
        }
        let tau = self.tau / self.grid.q10_factor();
        self.tabulate(|voltage| TableRow {
            voltage,
            activation: 1.0 / (1.0 + libm::exp((self.v_half - voltage) / self.slope)),
            tau,
        })
    }

    /// One row per grid voltage.
    fn tabulate(&self, row: impl Fn(f64) -> TableRow) -> ParamResult<Vec<TableRow>> {
        let n = self.grid.points()?;
        let mut rows = Vec::new();
        rows.try_reserve_exact(n)
            .map_err(|_| ParamError::Allocation { requested: n })?;
        rows.extend((0..n).map(|i| row(self.grid.voltage(i))));
        Ok(rows)
    }

    fn table_path(&self) -> PathBuf {
        if self.base_dir == "default" {
            PathBuf::from(&self.mode)
        } else {
            PathBuf::from(&self.base_dir).join(&self.mode)
        }
    }

    /// Reads `voltage activation tau` rows; `#` starts a comment.
    fn read_table(&self) -> ParamResult<Vec<TableRow>> {
        let path = self.table_path();
        let fail = |reason: String| {
            ParamError::inconsistent(
                Self::KIND,
                format!("table '{}': {reason}", path.display()),
            )
        };
        let text = fs::read_to_string(&path).map_err(|e| fail(e.to_string()))?;
        let mut rows = Vec::new();
        for (n, line) in text.lines().enumerate() {
            let line = line.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            let values: Vec<f64> = line
                .split_whitespace()
                .map(str::parse)
                .collect::<Result<_, _>>()
                .map_err(|_| fail(format!("line {} is not numeric", n + 1)))?;
            let [voltage, activation, tau] = values[..] else {
                return Err(fail(format!("line {} needs three columns", n + 1)));
            };
            rows.push(TableRow {
                voltage,
                activation,
                tau,
            });
        }
        Ok(rows)
    }
}

impl ParamOwner for IonChannel {
    const KIND: OwnerKind = OwnerKind::IonChannel;

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    fn regenerate(&mut self) -> ParamResult<()> {
        self.reset()
    }

    fn check(&self) -> ParamResult<()> {
        if self.table.is_empty() {
            return Err(ParamError::inconsistent(Self::KIND, "empty lookup table"));
        }
        Ok(())
    }
}

fn non_negative(v: f64, what: &str) -> ParamResult<f64> {
    if v < 0.0 {
        Err(ParamError::rejected(format!("{what} must not be negative")))
    } else {
        Ok(v)
    }
}

fn element_list(element: &Shared<IonChannel>) -> ParamResult<ListRef> {
    let Some(mut list) = FieldList::create(element.clone(), 11)? else {
        return Err(ParamError::Allocation { requested: 11 });
    };
    list.define(
        0,
        "DESCRIPTION",
        "Description of the channel.",
        FieldKind::Str,
        Storage::Str(IonChannel::description),
        Setter::Str(|c, v| {
            c.description = v.to_string();
            Ok(())
        }),
    )?;
    list.define(
        1,
        "ENABLED",
        "Channel switch.",
        FieldKind::Bool,
        Storage::Bool(|c| c.enabled),
        Setter::Bool(|c, v| {
            c.enabled = v;
            Ok(())
        }),
    )?;
    list.define(
        2,
        "CHANNEL_MODE",
        "Channel model ('hhuxley', 'boltzmann' or a table file).",
        FieldKind::Name(CHANNEL_MODES),
        Storage::Str(IonChannel::mode),
        Setter::Str(|c, v| {
            c.mode = v.to_string();
            Ok(())
        }),
    )?;
    list.define(
        3,
        "EQUIL_POT",
        "Equilibrium potential (V).",
        FieldKind::Float,
        Storage::Float(|c| c.equil_pot),
        Setter::Float(|c, v| {
            c.equil_pot = v;
            Ok(())
        }),
    )?;
    list.define(
        4,
        "CONDUCTANCE",
        "Maximum conductance (S).",
        FieldKind::Float,
        Storage::Float(|c| c.conductance),
        Setter::Float(|c, v| {
            c.conductance = non_negative(v, "conductance")?;
            Ok(())
        }),
    )?;
    list.define(
        5,
        "ACTIVATION_EXP",
        "Activation exponent.",
        FieldKind::Int,
        Storage::Int(|c| c.activation_exp),
        Setter::Int(|c, v| {
            if v < 0 {
                return Err(ParamError::rejected("exponent must not be negative"));
            }
            c.activation_exp = v;
            Ok(())
        }),
    )?;
    list.define(
        6,
        "ALPHA",
        "Opening rate coefficients [A (1/s), B (V), C (V)].",
        FieldKind::Array(ElementKind::Float),
        Storage::FloatArray(IonChannel::alpha),
        Setter::FloatAt(|c, i, v| {
            c.alpha[i] = v;
            Ok(())
        }),
    )?
    .enabled_when(|c| c.mode == "hhuxley");
    list.define(
        7,
        "BETA",
        "Closing rate coefficients [A (1/s), B (V), C (V)].",
        FieldKind::Array(ElementKind::Float),
        Storage::FloatArray(IonChannel::beta),
        Setter::FloatAt(|c, i, v| {
            c.beta[i] = v;
            Ok(())
        }),
    )?
    .enabled_when(|c| c.mode == "hhuxley");
    list.define(
        8,
        "V_HALF",
        "Half-activation voltage (V).",
        FieldKind::Float,
        Storage::Float(|c| c.v_half),
        Setter::Float(|c, v| {
            c.v_half = v;
            Ok(())
        }),
    )?
    .enabled_when(|c| c.mode == "boltzmann");
    list.define(
        9,
        "SLOPE",
        "Boltzmann slope factor (V).",
        FieldKind::Float,
        Storage::Float(|c| c.slope),
        Setter::Float(|c, v| {
            c.slope = v;
            Ok(())
        }),
    )?
    .enabled_when(|c| c.mode == "boltzmann");
    list.define(
        10,
        "TAU",
        "Activation time constant at 6.3 °C (s).",
        FieldKind::Float,
        Storage::Float(|c| c.tau),
        Setter::Float(|c, v| {
            if v <= 0.0 {
                return Err(ParamError::rejected("time constant must be positive"));
            }
            c.tau = v;
            Ok(())
        }),
    )?
    .enabled_when(|c| c.mode == "boltzmann");
    list.refresh_enabled()?;
    Ok(list.into_ref())
}

/// Channels of one neuron and the settings they share.
#[derive(Debug)]
pub struct IonChannelList {
    channels: i32,
    base_dir: String,
    grid: TableGrid,
    leak_cond: f64,
    leak_pot: f64,
    elements: Vec<Shared<IonChannel>>,
    dirty: bool,
}

impl IonChannelList {
    /// List of `channels` default channels on the default grid.
    ///
    /// Elements are created by the first validation or search.
    pub fn new(channels: i32) -> Self {
        Self {
            channels: channels.max(0),
            base_dir: "default".to_string(),
            grid: TableGrid::default(),
            leak_cond: 1e-9,
            leak_pot: -0.06,
            elements: Vec::new(),
            dirty: true,
        }
    }

    /// Requested number of channels.
    pub fn channel_count(&self) -> usize {
        usize::try_from(self.channels).unwrap_or(0)
    }

    /// Table grid pushed to every element.
    pub fn grid(&self) -> TableGrid {
        self.grid
    }

    /// Leakage conductance (S) and reversal potential (V).
    pub fn leakage(&self) -> (f64, f64) {
        (self.leak_cond, self.leak_pot)
    }

    /// Materialised elements, in order.
    pub fn elements(&self) -> &[Shared<IonChannel>] {
        &self.elements
    }

    fn needs_elements(&self) -> bool {
        self.elements.len() != self.channel_count()
    }

    fn base_dir(&self) -> &str {
        &self.base_dir
    }

    /// Grow or shrink the collection to the requested count and push the
    /// current grid to every element, marking each for a table rebuild.
    pub fn prepare_elements(&mut self) -> ParamResult<()> {
        let n = self.channel_count();
        resize_with_preserving(&mut self.elements, n, || shared(IonChannel::default()))?;
        for element in &self.elements {
            let mut element = element
                .try_borrow_mut()
                .map_err(|_| ParamError::Busy(OwnerKind::IonChannel.name()))?;
            element.grid = self.grid;
            element.base_dir.clone_from(&self.base_dir);
            element.dirty = true;
        }
        Ok(())
    }
}

impl ParamOwner for IonChannelList {
    const KIND: OwnerKind = OwnerKind::IonChannelList;

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    fn regenerate(&mut self) -> ParamResult<()> {
        self.prepare_elements()
    }

    fn check(&self) -> ParamResult<()> {
        self.grid.points().map(|_| ())
    }
}

fn general_list(data: &Shared<IonChannelList>) -> ParamResult<ListRef> {
    let Some(mut list) = FieldList::create(data.clone(), 8)? else {
        return Err(ParamError::Allocation { requested: 8 });
    };
    list.define(
        0,
        "NUM_CHANNELS",
        "Number of ion channels.",
        FieldKind::Int,
        Storage::Int(|l| l.channels),
        Setter::Int(|l, v| {
            if v < 0 {
                return Err(ParamError::rejected("channel count must not be negative"));
            }
            l.channels = v;
            Ok(())
        }),
    )?;
    list.define(
        1,
        "BASE_DIR",
        "Directory for channel table files ('default' or a path).",
        FieldKind::Name(BASE_DIRS),
        Storage::Str(IonChannelList::base_dir),
        Setter::Str(|l, v| {
            l.base_dir = v.to_string();
            Ok(())
        }),
    )?;
    list.define(
        2,
        "TEMPERATURE",
        "Temperature (°C).",
        FieldKind::Float,
        Storage::Float(|l| l.grid.temperature),
        Setter::Float(|l, v| {
            l.grid.temperature = v;
            Ok(())
        }),
    )?;
    list.define(
        3,
        "V_MIN",
        "Lowest table voltage (V).",
        FieldKind::Float,
        Storage::Float(|l| l.grid.v_min),
        Setter::Float(|l, v| {
            l.grid.v_min = v;
            Ok(())
        }),
    )?;
    list.define(
        4,
        "V_MAX",
        "Highest table voltage (V).",
        FieldKind::Float,
        Storage::Float(|l| l.grid.v_max),
        Setter::Float(|l, v| {
            l.grid.v_max = v;
            Ok(())
        }),
    )?;
    list.define(
        5,
        "V_STEP",
        "Table voltage step (V).",
        FieldKind::Float,
        Storage::Float(|l| l.grid.v_step),
        Setter::Float(|l, v| {
            if v <= 0.0 {
                return Err(ParamError::rejected("voltage step must be positive"));
            }
            l.grid.v_step = v;
            Ok(())
        }),
    )?;
    list.define(
        6,
        "LEAK_COND",
        "Leakage conductance (S).",
        FieldKind::Float,
        Storage::Float(|l| l.leak_cond),
        Setter::Float(|l, v| {
            l.leak_cond = non_negative(v, "conductance")?;
            Ok(())
        }),
    )?;
    list.define(
        7,
        "LEAK_POT",
        "Leakage equilibrium potential (V).",
        FieldKind::Float,
        Storage::Float(|l| l.leak_pot),
        Setter::Float(|l, v| {
            l.leak_pot = v;
            Ok(())
        }),
    )?;
    Ok(list.into_ref())
}

/// An [`IonChannelList`] with its general field list and one field list per
/// element.
///
/// Element lists are labelled by position (`0`, `1`, ...), so
/// `CONDUCTANCE.1` addresses the second channel.
#[derive(Debug)]
pub struct IonChannelListNode {
    data: Shared<IonChannelList>,
    general: ListRef,
    elements: RefCell<Vec<(Shared<IonChannel>, ListRef)>>,
}

impl IonChannelListNode {
    /// Wrap `data` and build its general field list.
    pub fn new(data: IonChannelList) -> ParamResult<Rc<Self>> {
        let data = shared(data);
        let general = general_list(&data)?;
        Ok(Rc::new(Self {
            data,
            general,
            elements: RefCell::new(Vec::new()),
        }))
    }

    /// The channel list.
    pub fn data(&self) -> &Shared<IonChannelList> {
        &self.data
    }

    /// Shared settings.
    pub fn general_list(&self) -> &ListRef {
        &self.general
    }

    /// Field list of element `index`, materialising elements if needed.
    pub fn element_list(&self, index: usize) -> ParamResult<Option<ListRef>> {
        Ok(self.sync()?.get(index).cloned())
    }

    /// Field lists of the current elements, in order. Lists of elements that
    /// survive a resize are kept.
    fn sync(&self) -> ParamResult<Vec<ListRef>> {
        fn busy<E>(_: E) -> ParamError {
            ParamError::Busy(OwnerKind::IonChannelList.name())
        }
        if self.data.try_borrow().map_err(busy)?.needs_elements() {
            self.data.try_borrow_mut().map_err(busy)?.prepare_elements()?;
        }
        let data = self.data.try_borrow().map_err(busy)?;
        let mut cache = self
            .elements
            .try_borrow_mut()
            .map_err(|_| ParamError::Busy(OwnerKind::IonChannel.name()))?;
        let mut synced = Vec::with_capacity(data.elements.len());
        for element in &data.elements {
            let list = match cache.iter().find(|(e, _)| Rc::ptr_eq(e, element)) {
                Some((_, list)) => list.clone(),
                None => element_list(element)?,
            };
            synced.push((element.clone(), list));
        }
        *cache = synced;
        Ok(cache.iter().map(|(_, list)| list.clone()).collect())
    }
}

impl ListProvider for IonChannelListNode {
    fn title(&self) -> String {
        "Ion channel list".to_string()
    }

    fn sub_lists(&self) -> ParamResult<Vec<SubList>> {
        let mut lists = vec![SubList::new(self.general.clone())];
        lists.extend(
            self.sync()?
                .into_iter()
                .enumerate()
                .map(|(i, list)| SubList::labelled(list, i.to_string())),
        );
        Ok(lists)
    }

    fn validate(&self) -> ParamResult<()> {
        validate(&self.general)?;
        for list in self.sync()? {
            validate(&list)?;
        }
        Ok(())
    }
    /// An unqualified `DESCRIPTION` goes to the first channel whose
    /// description is still empty or already equals the value.
    fn accepts(&self, label: &str, field: &FieldMeta, value: &str) -> ParamResult<bool> {
        if field.owner_kind != OwnerKind::IonChannel || field.name != "DESCRIPTION" {
            return Ok(true);
        }
        let Ok(index) = label.parse::<usize>() else {
            return Ok(true);
        };
        let data = self
            .data
            .try_borrow()
            .map_err(|_| ParamError::Busy(OwnerKind::IonChannelList.name()))?;
        let Some(element) = data.elements.get(index) else {
            return Ok(true);
        };
        let channel = element
            .try_borrow()
            .map_err(|_| ParamError::Busy(OwnerKind::IonChannel.name()))?;
        Ok(channel.description.is_empty() || channel.description == value)
    }
}
