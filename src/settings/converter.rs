//! Pluggable per-type converters
//!
//! A [`ConverterRegistry`] overrides the built-in [`SettingValue`] conversion
//! for selected types, e.g. to keep booleans as `Y`/`N` codes in a table that
//! other host screens read as well.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use super::value::{ConversionError, SettingValue};

type SerializeFn<T> = Box<dyn Fn(&T) -> Option<String>>;
type DeserializeFn<T> = Box<dyn Fn(&str) -> Result<T, ConversionError>>;

struct Converter<T> {
    serialize: SerializeFn<T>,
    deserialize: DeserializeFn<T>,
}

/// Registry of converters keyed by destination type
#[derive(Default)]
pub struct ConverterRegistry {
    converters: HashMap<TypeId, Box<dyn Any>>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the conversion pair for `T`, replacing any previous one
    pub fn register<T, S, D>(&mut self, serialize: S, deserialize: D)
    where
        T: 'static,
        S: Fn(&T) -> Option<String> + 'static,
        D: Fn(&str) -> Result<T, ConversionError> + 'static,
    {
        let converter = Converter {
            serialize: Box::new(serialize) as SerializeFn<T>,
            deserialize: Box::new(deserialize) as DeserializeFn<T>,
        };
        self.converters
            .insert(TypeId::of::<T>(), Box::new(converter));
    }

    /// Builder form of [`register`](Self::register)
    pub fn with<T, S, D>(mut self, serialize: S, deserialize: D) -> Self
    where
        T: 'static,
        S: Fn(&T) -> Option<String> + 'static,
        D: Fn(&str) -> Result<T, ConversionError> + 'static,
    {
        self.register(serialize, deserialize);
        self
    }

    /// Store booleans as `Y`/`N`
    pub fn with_yes_no_flags(self) -> Self {
        self.with::<bool, _, _>(
            |v| Some(if *v { "Y" } else { "N" }.to_string()),
            bool::from_setting,
        )
    }

    /// Whether a converter is registered for `T`
    pub fn contains<T: 'static>(&self) -> bool {
        self.converters.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    fn lookup<T: 'static>(&self) -> Option<&Converter<T>> {
        self.converters
            .get(&TypeId::of::<T>())
            .and_then(|c| c.downcast_ref::<Converter<T>>())
    }

    /// Convert a stored value to `T`
    ///
    /// `None` stays `None`. A registered converter wins over the type's own
    /// conversion.
    pub fn convert<T: SettingValue>(&self, raw: Option<&str>) -> Result<Option<T>, ConversionError> {
        let Some(raw) = raw else {
            return Ok(None);
        };

        match self.lookup::<T>() {
            Some(converter) => (converter.deserialize)(raw).map(Some),
            None => T::from_setting(raw).map(Some),
        }
    }

    /// Stored form of `value`
    pub fn serialize<T: SettingValue>(&self, value: &T) -> Option<String> {
        match self.lookup::<T>() {
            Some(converter) => (converter.serialize)(value),
            None => value.to_setting(),
        }
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("converters", &self.converters.len())
            .finish()
    }
}
