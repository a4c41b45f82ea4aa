//! Process specifications and their canonical form
//!
//! Callers describe a worker with any of four [`ProcessSpec`] shapes. [`normalize`] reduces
//! each of them to a [`ChildDescriptor`], the only form the child supervisor accepts.
//!
//! Normalization is a pure reshape. It never checks that a module exists or exports the
//! requested function; the supervisor's start attempt is the single place where "could not
//! start" is decided.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Start function used when a spec does not name one
pub const DEFAULT_START_FUNCTION: &str = "start_link";

/// How to start a worker, as written by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ProcessSpec {
    /// Full descriptor with a stable identifier and an explicit start directive
    Descriptor { id: String, start: StartDirective },

    /// Module plus positional arguments
    ModuleArgs {
        module: String,
        #[serde(default)]
        args: Vec<Value>,
    },

    /// Bare module reference
    Module { module: String },

    /// Module plus named options, kept in submission order
    ModuleOptions {
        module: String,
        #[serde(default)]
        options: Vec<(String, Value)>,
    },
}

/// Module, function and positional arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartDirective {
    pub module: String,
    #[serde(default = "default_start_function")]
    pub function: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

fn default_start_function() -> String {
    DEFAULT_START_FUNCTION.to_string()
}

impl StartDirective {
    pub fn new(module: impl Into<String>, function: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            module: module.into(),
            function: function.into(),
            args,
        }
    }
}

impl ProcessSpec {
    /// Descriptor shape
    pub fn descriptor(id: impl Into<String>, start: StartDirective) -> Self {
        ProcessSpec::Descriptor {
            id: id.into(),
            start,
        }
    }

    /// Module plus positional arguments
    pub fn module_args(module: impl Into<String>, args: Vec<Value>) -> Self {
        ProcessSpec::ModuleArgs {
            module: module.into(),
            args,
        }
    }

    /// Bare module
    pub fn module(module: impl Into<String>) -> Self {
        ProcessSpec::Module {
            module: module.into(),
        }
    }

    /// Module plus named options
    pub fn module_options<K: Into<String>>(
        module: impl Into<String>,
        options: impl IntoIterator<Item = (K, Value)>,
    ) -> Self {
        ProcessSpec::ModuleOptions {
            module: module.into(),
            options: options.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// The module this spec names
    pub fn module_name(&self) -> &str {
        match self {
            ProcessSpec::Descriptor { start, .. } => &start.module,
            ProcessSpec::ModuleArgs { module, .. }
            | ProcessSpec::Module { module }
            | ProcessSpec::ModuleOptions { module, .. } => module,
        }
    }
}

impl From<&str> for ProcessSpec {
    fn from(module: &str) -> Self {
        ProcessSpec::module(module)
    }
}

impl From<String> for ProcessSpec {
    fn from(module: String) -> Self {
        ProcessSpec::module(module)
    }
}

/// Arguments handed to a module's start function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartArgs {
    Positional(Vec<Value>),
    Named(Vec<(String, Value)>),
}

impl StartArgs {
    /// Named option `key` (first occurrence wins)
    pub fn named(&self, key: &str) -> Option<&Value> {
        match self {
            StartArgs::Named(options) => options.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            StartArgs::Positional(_) => None,
        }
    }
}

/// Canonical start descriptor submitted to a child supervisor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildDescriptor {
    /// Stable identifier, when the caller supplied one
    pub id: Option<String>,
    pub module: String,
    pub function: String,
    pub args: StartArgs,
}

/// Reduce any spec shape to its canonical descriptor
pub fn normalize(spec: &ProcessSpec) -> ChildDescriptor {
    match spec {
        ProcessSpec::Descriptor { id, start } => ChildDescriptor {
            id: Some(id.clone()),
            module: start.module.clone(),
            function: start.function.clone(),
            args: StartArgs::Positional(start.args.clone()),
        },
        ProcessSpec::ModuleArgs { module, args } => ChildDescriptor {
            id: None,
            module: module.clone(),
            function: DEFAULT_START_FUNCTION.to_string(),
            args: StartArgs::Positional(args.clone()),
        },
        ProcessSpec::Module { module } => ChildDescriptor {
            id: None,
            module: module.clone(),
            function: DEFAULT_START_FUNCTION.to_string(),
            args: StartArgs::Positional(Vec::new()),
        },
        ProcessSpec::ModuleOptions { module, options } => ChildDescriptor {
            id: None,
            module: module.clone(),
            function: DEFAULT_START_FUNCTION.to_string(),
            args: StartArgs::Named(options.clone()),
        },
    }
}

impl From<&ProcessSpec> for ChildDescriptor {
    fn from(spec: &ProcessSpec) -> Self {
        normalize(spec)
    }
}
