//! Translation units and their metadata.

use crate::stmt::MultiStatement;

/// A shader entry-point stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

impl ShaderStage {
    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
            ShaderStage::Compute => "compute",
        }
    }
}

/// Optional language features a module may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleFeature {
    Float64,
    PrimitiveExternals,
    Texture1D,
}

impl ModuleFeature {
    pub fn name(self) -> &'static str {
        match self {
            ModuleFeature::Float64 => "float64",
            ModuleFeature::PrimitiveExternals => "primitive_externals",
            ModuleFeature::Texture1D => "texture1D",
        }
    }
}

/// Module identity and capabilities. Two import paths resolving to the same
/// `module_name` are the same module.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleMetadata {
    pub module_name: String,
    pub lang_version: u32,
    pub enabled_features: Vec<ModuleFeature>,
}

impl ModuleMetadata {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            lang_version: 100,
            enabled_features: Vec::new(),
        }
    }

    pub fn with_features(mut self, features: Vec<ModuleFeature>) -> Self {
        self.enabled_features = features;
        self
    }
}

/// A module merged in by an import, already resolved against the importing
/// compilation's symbol tables.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedModule {
    /// The identifier the module is known by inside the importer.
    pub identifier: String,
    pub module: Module,
}

/// A translation unit: metadata plus a root statement list, with imported
/// modules materialized after resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub metadata: ModuleMetadata,
    pub imported_modules: Vec<ImportedModule>,
    pub root: MultiStatement,
}

impl Module {
    pub fn new(metadata: ModuleMetadata, root: MultiStatement) -> Self {
        Self {
            metadata,
            imported_modules: Vec::new(),
            root,
        }
    }
}
