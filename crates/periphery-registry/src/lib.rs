//! Module registry and factory for periphery simulation modules.
//!
//! Presets and parameter files name the stages of a simulation by module
//! identifier; this crate maps those identifiers to descriptors and factories.
//!
//! # Features
//!
//! - **Module Discovery**: List all available modules with metadata
//! - **Factory Pattern**: Create modules by identifier at runtime
//! - **Category System**: Modules organized by role in the auditory pathway
//!
//! # Example
//!
//! ```rust
//! use periphery_core::set_param;
//! use periphery_modules::Module;
//! use periphery_registry::{ModuleCategory, ModuleRegistry};
//!
//! let registry = ModuleRegistry::new();
//!
//! for module in registry.all_modules() {
//!     println!("{}: {}", module.name, module.description);
//! }
//!
//! let bm = registry.create("gammatone").unwrap().unwrap();
//! set_param(&bm.par_list().unwrap(), "CASCADE", "3").unwrap();
//! bm.validate().unwrap();
//!
//! for module in registry.modules_in_category(ModuleCategory::Neuron) {
//!     println!("Neuron model: {}", module.name);
//! }
//! ```

use std::rc::Rc;

use periphery_core::{ParamResult, find};
use periphery_modules::{
    Compression, Ear, Gammatone, HHuxley, Module, NullModule, Script, Simulation, Stimulus,
};

/// Role of a module in the simulated pathway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleCategory {
    /// Signal generators
    Stimulus,
    /// Basilar-membrane and other filterbanks
    Filter,
    /// Inner-hair-cell transduction and compression
    HairCell,
    /// Neuron models
    Neuron,
    /// Modules built from other modules
    Composite,
    /// Placeholders and helpers
    Utility,
}

impl ModuleCategory {
    /// Display name.
    pub const fn name(&self) -> &'static str {
        match self {
            ModuleCategory::Stimulus => "Stimulus",
            ModuleCategory::Filter => "Filter",
            ModuleCategory::HairCell => "Hair Cell",
            ModuleCategory::Neuron => "Neuron",
            ModuleCategory::Composite => "Composite",
            ModuleCategory::Utility => "Utility",
        }
    }

    /// One-line summary of what the category holds.
    pub const fn description(&self) -> &'static str {
        match self {
            ModuleCategory::Stimulus => "Tone, noise and file stimulus generators",
            ModuleCategory::Filter => "Basilar-membrane filterbanks",
            ModuleCategory::HairCell => "Inner-hair-cell transduction and compression",
            ModuleCategory::Neuron => "Auditory-nerve and brainstem neuron models",
            ModuleCategory::Composite => "Chains of modules and whole simulations",
            ModuleCategory::Utility => "Placeholders and utility stages",
        }
    }
}

/// Describes a module in the registry.
#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
    /// Unique identifier for the module (lowercase, no spaces).
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// Brief description of the module.
    pub description: &'static str,
    /// Role in the pathway.
    pub category: ModuleCategory,
    /// Number of fields in the module's own parameter list.
    pub param_count: usize,
}

/// Factory function type for creating modules.
type ModuleFactory = fn() -> ParamResult<Box<dyn Module>>;

struct RegistryEntry {
    descriptor: ModuleDescriptor,
    factory: ModuleFactory,
}

/// Registry of all available modules.
///
/// All built-in modules are registered on construction.
pub struct ModuleRegistry {
    entries: Vec<RegistryEntry>,
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleRegistry {
    /// Create a new registry with all built-in modules registered.
    pub fn new() -> Self {
        let mut registry = Self {
            entries: Vec::with_capacity(7),
        };
        registry.register_builtin_modules();
        registry
    }

    /// Register all built-in modules.
    fn register_builtin_modules(&mut self) {
        self.register(
            ModuleDescriptor {
                id: "stimulus",
                name: "Multi-tone stimulus",
                description: "Sum of pure tones with per-tone level, phase and onset",
                category: ModuleCategory::Stimulus,
                param_count: 13,
            },
            || Ok(Box::new(Stimulus::new()?)),
        );

        self.register(
            ModuleDescriptor {
                id: "gammatone",
                name: "Gammatone filterbank",
                description: "Cascaded gammatone basilar-membrane filterbank",
                category: ModuleCategory::Filter,
                param_count: 3,
            },
            || Ok(Box::new(Gammatone::new()?)),
        );

        self.register(
            ModuleDescriptor {
                id: "compression",
                name: "Compression",
                description: "Static power, broken-stick or logarithmic compression",
                category: ModuleCategory::HairCell,
                param_count: 2,
            },
            || Ok(Box::new(Compression::new()?)),
        );

        self.register(
            ModuleDescriptor {
                id: "hhuxley",
                name: "Hodgkin-Huxley neuron",
                description: "Point neuron with a list of voltage-dependent ion channels",
                category: ModuleCategory::Neuron,
                param_count: 5,
            },
            || Ok(Box::new(HHuxley::new()?)),
        );

        self.register(
            ModuleDescriptor {
                id: "ear",
                name: "Ear",
                description: "Gammatone filterbank followed by hair-cell compression",
                category: ModuleCategory::Composite,
                param_count: 3,
            },
            || Ok(Box::new(Ear::new()?)),
        );

        self.register(
            ModuleDescriptor {
                id: "simulation",
                name: "Simulation",
                description: "Titled script of labelled module steps",
                category: ModuleCategory::Composite,
                param_count: 2,
            },
            || Ok(Box::new(Simulation::new(Script::new())?)),
        );

        self.register(
            ModuleDescriptor {
                id: "null",
                name: "Null",
                description: "Pass-through step without parameters",
                category: ModuleCategory::Utility,
                param_count: 0,
            },
            || Ok(Box::new(NullModule)),
        );
    }

    /// Register a module with the registry.
    fn register(&mut self, descriptor: ModuleDescriptor, factory: ModuleFactory) {
        self.entries.push(RegistryEntry {
            descriptor,
            factory,
        });
    }

    /// Returns descriptors for all registered modules.
    pub fn all_modules(&self) -> Vec<&ModuleDescriptor> {
        self.entries.iter().map(|e| &e.descriptor).collect()
    }

    /// Returns descriptors for modules in a specific category.
    pub fn modules_in_category(&self, category: ModuleCategory) -> Vec<&ModuleDescriptor> {
        self.entries
            .iter()
            .filter(|e| e.descriptor.category == category)
            .map(|e| &e.descriptor)
            .collect()
    }

    /// Get a descriptor by module ID (case-insensitive).
    pub fn get(&self, id: &str) -> Option<&ModuleDescriptor> {
        self.entry(id).map(|e| &e.descriptor)
    }

    /// Create a module instance by ID.
    ///
    /// Returns `None` if the ID is not registered, or the factory's error if
    /// the module's parameter lists could not be built.
    pub fn create(&self, id: &str) -> Option<ParamResult<Box<dyn Module>>> {
        self.entry(id).map(|e| (e.factory)())
    }

    /// Find a field index by name in a module's own parameter list.
    ///
    /// Creates a temporary module instance. Fields of nested modules and
    /// aggregates are not counted; returns `None` for those, and for unknown
    /// modules or names.
    pub fn param_index_by_name(&self, module_id: &str, param_name: &str) -> Option<usize> {
        let module = self.create(module_id)?.ok()?;
        let list = module.par_list()?;
        let field = find(&list, param_name).ok()??;
        Rc::ptr_eq(&field.list, &list).then_some(field.index)
    }

    /// Returns the number of registered modules.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no modules are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, id: &str) -> Option<&RegistryEntry> {
        self.entries
            .iter()
            .find(|e| e.descriptor.id.eq_ignore_ascii_case(id))
    }
}

/// Number of fields in a module's own parameter list.
pub fn field_count(module: &dyn Module) -> usize {
    module.par_list().map_or(0, |list| list.borrow().len())
}
