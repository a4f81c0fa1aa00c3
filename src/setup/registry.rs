//! Setup units and their registry

use std::fmt;

use anyhow::Result;

use crate::settings::SettingsStore;

/// Prefix of the settings that record the last applied version of a unit
pub const SETUP_VERSION_PREFIX: &str = "setup.lastversion.";

/// An idempotent setup routine gated by a version number
///
/// The body runs again only when [`version`](Self::version) is raised above
/// the last version recorded for the unit.
pub trait SetupUnit {
    /// Declared version of the routine
    fn version(&self) -> u32;

    /// Body of the routine
    fn run(&self, store: &SettingsStore) -> Result<()>;

    /// Fully qualified type name of the unit
    fn type_name(&self) -> &'static str {
        std::any::type_name_of_val(self)
    }

    /// Name under which the applied version is recorded
    ///
    /// Defaults to the type's base name without a trailing `Setup`, so
    /// `InvoiceSetup` is recorded as `Invoice`.
    fn name(&self) -> String {
        base_name(self.type_name())
    }

    /// Setting key holding the last applied version
    fn version_key(&self) -> String {
        format!("{}{}", SETUP_VERSION_PREFIX, self.name())
    }
}

/// Last path segment of a type name, without generic arguments
pub fn short_type_name(type_name: &str) -> &str {
    let without_generics = type_name.split('<').next().unwrap_or(type_name);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
}

/// Short type name with a trailing `Setup` removed
pub fn base_name(type_name: &str) -> String {
    let short = short_type_name(type_name);
    match short.strip_suffix("Setup") {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => short.to_string(),
    }
}

type UnitFactory = Box<dyn Fn() -> Box<dyn SetupUnit>>;

/// Explicit list of the setup units of an application
///
/// Units are constructed on [`discover`](Self::discover) and returned in
/// registration order.
#[derive(Default)]
pub struct SetupRegistry {
    factories: Vec<UnitFactory>,
}

impl SetupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a unit built with `Default`
    pub fn register<U: SetupUnit + Default + 'static>(&mut self) -> &mut Self {
        self.factories
            .push(Box::new(|| Box::new(U::default()) as Box<dyn SetupUnit>));
        self
    }

    /// Register a unit built by `factory`
    pub fn register_with<F>(&mut self, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn SetupUnit> + 'static,
    {
        self.factories.push(Box::new(factory));
        self
    }

    /// Builder form of [`register`](Self::register)
    pub fn with<U: SetupUnit + Default + 'static>(mut self) -> Self {
        self.register::<U>();
        self
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Fresh instances of all registered units
    pub fn discover(&self) -> Vec<Box<dyn SetupUnit>> {
        self.factories.iter().map(|factory| factory()).collect()
    }
}

impl fmt::Debug for SetupRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetupRegistry")
            .field("units", &self.factories.len())
            .finish()
    }
}
