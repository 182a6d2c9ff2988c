//! Simulation preset file format and operations.

use serde::{Deserialize, Serialize};
use std::path::Path;

use periphery_core::{parse_line, render_to_string, set_param};
use periphery_modules::{Module, Script, Simulation};
use periphery_registry::ModuleRegistry;

use crate::error::ConfigError;

/// One step of a simulation preset.
///
/// Parameters are kept as parameter-file lines (`NAME VALUE`), applied in
/// order to the module's list, so qualified names and array indices work
/// exactly as they do in a parameter file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepConfig {
    /// Registry identifier of the module.
    pub module: String,

    /// Step label; qualifies parameter names inside the simulation.
    pub label: String,

    /// Parameter assignments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<String>,
}

impl StepConfig {
    /// Step running `module` under `label`, with default parameters.
    pub fn new(module: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            label: label.into(),
            params: Vec::new(),
        }
    }

    /// Add a parameter assignment.
    pub fn with_param(mut self, name: &str, value: &str) -> Self {
        self.params.push(format!("{name} {value}"));
        self
    }

    /// Record every enabled field of `module` as a step.
    pub fn capture(label: impl Into<String>, module: &dyn Module) -> Result<Self, ConfigError> {
        let label = label.into();
        let mut step = Self::new(module.id(), label.clone());
        if let Some(list) = module.par_list() {
            let text = render_to_string(&list).map_err(|e| ConfigError::step(&label, e))?;
            for line in text.lines() {
                if let Some((name, value)) =
                    parse_line(line).map_err(|e| ConfigError::step(&label, e))?
                {
                    step.params.push(format!("{name} {value}"));
                }
            }
        }
        Ok(step)
    }

    /// Create the module, apply the parameters and validate it.
    pub fn build(&self, registry: &ModuleRegistry) -> Result<Box<dyn Module>, ConfigError> {
        let module = registry
            .create(&self.module)
            .ok_or_else(|| ConfigError::UnknownModule(self.module.clone()))?
            .map_err(|e| ConfigError::step(&self.label, e))?;
        if let Some(list) = module.par_list() {
            for line in &self.params {
                let assignment = parse_line(line).and_then(|parsed| match parsed {
                    Some((name, value)) => set_param(&list, name, value),
                    None => Ok(()),
                });
                assignment.map_err(|e| ConfigError::step(&self.label, e))?;
            }
        } else if let Some(line) = self.params.first() {
            let name = line.split_whitespace().next().unwrap_or_default();
            return Err(ConfigError::step(
                &self.label,
                periphery_core::ParamError::UnknownField(name.to_string()),
            ));
        }
        module
            .validate()
            .map_err(|e| ConfigError::step(&self.label, e))?;
        tracing::debug!(module = %self.module, label = %self.label, "step built");
        Ok(module)
    }
}

/// Preset file format for simulations.
///
/// # TOML Format
///
/// ```toml
/// name = "Tone in quiet"
/// description = "1 kHz tone through the ear model"
///
/// [[steps]]
/// module = "stimulus"
/// label = "stim"
/// params = ["FREQUENCIES:0 1000", "LEVELS:0 40"]
///
/// [[steps]]
/// module = "ear"
/// label = "ear"
/// params = ["CHANNELS.BM 16", "LAW.IHC log"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimPreset {
    /// Name of the preset; becomes the simulation title.
    pub name: String,

    /// Free-form notes, not used when building.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Steps in execution order.
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

impl SimPreset {
    /// Preset named `name`, without steps.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            steps: Vec::new(),
        }
    }

    /// Attach a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append a step.
    pub fn with_step(mut self, step: StepConfig) -> Self {
        self.steps.push(step);
        self
    }

    /// Record the current parameters of every step of `script`.
    ///
    /// Steps without a module are recorded as `null` steps.
    pub fn capture(name: impl Into<String>, script: &Script) -> Result<Self, ConfigError> {
        let mut preset = Self::new(name);
        for step in script.steps() {
            let config = match step.module() {
                Some(module) => StepConfig::capture(step.label(), module)?,
                None => StepConfig::new("null", step.label()),
            };
            preset.steps.push(config);
        }
        Ok(preset)
    }

    /// Build every step, in order, into a validated script.
    pub fn build_script(&self, registry: &ModuleRegistry) -> Result<Script, ConfigError> {
        let mut script = Script::new();
        for step in &self.steps {
            let module = step.build(registry)?;
            script
                .push(&step.label, Some(module))
                .map_err(|e| ConfigError::step(&step.label, e))?;
        }
        tracing::info!(preset = %self.name, steps = script.len(), "preset built");
        Ok(script)
    }

    /// Build a simulation titled after the preset.
    pub fn build(&self, registry: &ModuleRegistry) -> Result<Simulation, ConfigError> {
        let simulation = Simulation::new(self.build_script(registry)?)?;
        simulation.set_title(&self.name)?;
        Ok(simulation)
    }

    /// Read a preset file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let preset: SimPreset = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), steps = preset.steps.len(), "preset loaded");
        Ok(preset)
    }

    /// Parse preset TOML.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Write the preset as TOML, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        tracing::debug!(path = %path.display(), "preset saved");
        Ok(())
    }

    /// Serialize as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True when the preset has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Default for SimPreset {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_builder() {
        let preset = SimPreset::new("Tone")
            .with_description("two-step chain")
            .with_step(StepConfig::new("stimulus", "stim").with_param("LEVELS:0", "40"))
            .with_step(StepConfig::new("gammatone", "bm"));

        assert_eq!(preset.name, "Tone");
        assert_eq!(preset.description.as_deref(), Some("two-step chain"));
        assert_eq!(preset.len(), 2);
        assert_eq!(preset.steps[0].params, vec!["LEVELS:0 40".to_string()]);
    }

    #[test]
    fn test_preset_toml_roundtrip() {
        let preset = SimPreset::new("Round Trip")
            .with_step(StepConfig::new("gammatone", "bm").with_param("CASCADE", "2"));
        let toml_str = preset.to_toml().unwrap();
        let loaded = SimPreset::from_toml(&toml_str).unwrap();
        assert_eq!(preset, loaded);
    }

    #[test]
    fn test_preset_from_toml() {
        let toml_str = r#"
            name = "Neuron"

            [[steps]]
            module = "hhuxley"
            label = "cell"
            params = ["CAPACITANCE 2e-12", "DESCRIPTION.0 sodium"]

            [[steps]]
            module = "null"
            label = "end"
        "#;
        let preset = SimPreset::from_toml(toml_str).unwrap();
        assert_eq!(preset.len(), 2);
        assert!(preset.steps[1].params.is_empty());
        assert!(preset.description.is_none());
    }

    #[test]
    fn test_unknown_module() {
        let preset = SimPreset::new("Bad").with_step(StepConfig::new("cochlea9000", "x"));
        let err = preset.build_script(&ModuleRegistry::new()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownModule(ref id) if id == "cochlea9000"));
    }

    #[test]
    fn test_params_on_parameterless_module() {
        let step = StepConfig::new("null", "end").with_param("GAIN", "1");
        let err = step.build(&ModuleRegistry::new()).unwrap_err();
        assert_eq!(err.to_string(), "step 'end': unknown parameter 'GAIN'");
    }
}
