use dronecan_dsdl::FieldNaming;

/// Controls registration behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// When true, registering an id or name that is already taken replaces
    /// the existing type instead of failing.
    pub allow_replace: bool,
    /// Field naming used by the `define_*` helpers when rendering schema text.
    pub field_naming: FieldNaming,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            allow_replace: false,
            field_naming: FieldNaming::SnakeCase,
        }
    }
}
