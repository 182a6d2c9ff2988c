//! Periphery Modules - Collaborator aggregates and module parameter blocks
//!
//! This crate builds on periphery-core's registry:
//!
//! - [`FreqListNode`] - Centre-frequency / bandwidth list with seven spacing modes
//! - [`IonChannelListNode`] - Ion-channel collection with per-element lookup tables
//! - [`ParamArrayNode`] - Mode-selected parameter array with a write hook
//! - [`ScriptNode`] - Ordered chain of labelled module steps
//!
//! and the parameter blocks of the concrete modules:
//!
//! - [`Stimulus`] - Multi-tone stimulus (every scalar and array field kind)
//! - [`Gammatone`] - Basilar-membrane filterbank
//! - [`Compression`] - Inner-hair-cell compression
//! - [`HHuxley`] - Hodgkin-Huxley neuron
//! - [`Ear`] - Filterbank and compression as nested modules
//! - [`Simulation`] - Title and script
//! - [`NullModule`] - No parameters
//!
//! ## Example
//!
//! ```rust
//! use periphery_core::{render_to_string, set_param};
//! use periphery_modules::{Ear, Module};
//!
//! let ear = Ear::new().unwrap();
//! let list = ear.par_list().unwrap();
//! set_param(&list, "CHANNELS.BM", "8").unwrap();
//! ear.validate().unwrap();
//! assert!(render_to_string(&list).unwrap().contains("CHANNELS.BM\t8\t"));
//! ```

pub mod compression;
pub mod ear;
pub mod freq_list;
pub mod gammatone;
pub mod hhuxley;
pub mod ion_channel;
pub mod module;
pub mod null;
pub mod param_array;
pub mod script;
pub mod simulation;
pub mod stimulus;

pub use compression::{COMPRESSION_LAW, Compression, CompressionParams};
pub use ear::{Ear, EarParams};
pub use freq_list::{
    BandwidthMode, FreqList, FreqListNode, Spacing, erb_bandwidth, erb_rate, erb_rate_to_hz,
};
pub use gammatone::{Gammatone, GammatoneParams};
pub use hhuxley::{HHuxley, HHuxleyParams};
pub use ion_channel::{IonChannel, IonChannelList, IonChannelListNode, TableGrid, TableRow};
pub use module::Module;
pub use null::NullModule;
pub use param_array::{ParamArray, ParamArrayNode, ParamArraySpec, WriteHook};
pub use script::{Script, ScriptNode, ScriptStep};
pub use simulation::{Simulation, SimulationParams};
pub use stimulus::{Stimulus, StimulusParams};
