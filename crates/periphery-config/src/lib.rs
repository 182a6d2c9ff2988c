//! Parameter files and simulation presets for periphery modules.
//!
//! # Features
//!
//! - **Parameter Files**: Load, render and save the `NAME VALUE` text of any
//!   module list
//! - **Presets**: Describe a simulation as TOML (a title plus labelled module
//!   steps with parameter lines) and build it through the module registry
//!
//! File operations are logged with `tracing`; the registry's own dispatch and
//! regeneration events are enabled through periphery-core's `tracing` feature.
//!
//! # Example
//!
//! ```rust,no_run
//! use periphery_config::{SimPreset, StepConfig, load_par_file};
//! use periphery_modules::Module;
//! use periphery_registry::ModuleRegistry;
//!
//! let preset = SimPreset::new("Tone in quiet")
//!     .with_step(StepConfig::new("stimulus", "stim").with_param("LEVELS:0", "40"))
//!     .with_step(StepConfig::new("ear", "ear").with_param("CHANNELS.BM", "16"));
//! preset.save("presets/tone.toml").unwrap();
//!
//! let simulation = preset.build(&ModuleRegistry::new()).unwrap();
//! load_par_file(&simulation.par_list().unwrap(), "overrides.par").unwrap();
//! simulation.validate().unwrap();
//! ```

mod error;
mod par_file;
mod preset;

pub use error::ConfigError;
pub use par_file::{apply_par_text, load_par_file, render_par_file, save_par_file};
pub use preset::{SimPreset, StepConfig};

/// Re-export commonly used types from periphery-registry
pub use periphery_registry::{ModuleCategory, ModuleDescriptor, ModuleRegistry};
