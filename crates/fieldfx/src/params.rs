//! Live-tunable shader parameters.
//!
//! Pipelines keep a [`Tunable`] for every uniform that may be adjusted while
//! running and publish clones of it to a [`ControlSurface`]. The surface never
//! touches the pipelines directly, it only writes through the handles.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParamError {
    #[error("no parameter named '{0}' has been published")]
    Unknown(String),
    #[error("value for '{name}' must be finite (got {value})")]
    NotFinite { name: String, value: f32 },
}

/// Shared, bounded, single-threaded scalar.
///
/// Clones alias the same value; writes are clamped to `[min, max]`.
#[derive(Clone)]
pub struct Tunable {
    value: Rc<Cell<f32>>,
    min: f32,
    max: f32,
}

impl Tunable {
    pub fn new(value: f32, min: f32, max: f32) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            value: Rc::new(Cell::new(value.clamp(min, max))),
            min,
            max,
        }
    }

    pub fn get(&self) -> f32 {
        self.value.get()
    }

    /// Stores `value` clamped to the handle's range and returns what was stored.
    pub fn set(&self, value: f32) -> f32 {
        let clamped = value.clamp(self.min, self.max);
        self.value.set(clamped);
        clamped
    }

    pub fn range(&self) -> (f32, f32) {
        (self.min, self.max)
    }

    /// True when both handles write to the same storage.
    pub fn aliases(&self, other: &Tunable) -> bool {
        Rc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for Tunable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tunable")
            .field("value", &self.get())
            .field("min", &self.min)
            .field("max", &self.max)
            .finish()
    }
}

/// Anything that wants to expose pipeline parameters to a user.
pub trait ControlSurface {
    fn publish(&mut self, name: &str, handle: Tunable);
}

/// A published parameter.
#[derive(Clone, Debug)]
pub struct ParameterEntry {
    pub name: String,
    pub handle: Tunable,
}

/// Name-addressed collection of published tunables.
///
/// Publishing a name twice replaces the earlier handle.
#[derive(Debug, Default)]
pub struct ParameterRegistry {
    entries: Vec<ParameterEntry>,
}

impl ParameterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ParameterEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&Tunable> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| &entry.handle)
    }

    /// Writes `value` through the named handle, returning the clamped value.
    pub fn set(&self, name: &str, value: f32) -> Result<f32, ParamError> {
        if !value.is_finite() {
            return Err(ParamError::NotFinite {
                name: name.to_string(),
                value,
            });
        }
        let handle = self
            .get(name)
            .ok_or_else(|| ParamError::Unknown(name.to_string()))?;
        Ok(handle.set(value))
    }
}

impl ControlSurface for ParameterRegistry {
    fn publish(&mut self, name: &str, handle: Tunable) {
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.name == name) {
            entry.handle = handle;
        } else {
            self.entries.push(ParameterEntry {
                name: name.to_string(),
                handle,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tunable_clamps_writes() {
        let handle = Tunable::new(0.5, 0.0, 1.0);
        assert_eq!(handle.set(3.0), 1.0);
        assert_eq!(handle.get(), 1.0);
        assert_eq!(handle.set(-2.0), 0.0);
    }

    #[test]
    fn clones_share_storage() {
        let handle = Tunable::new(1.0, -1.0, 1.0);
        let alias = handle.clone();
        alias.set(-0.25);
        assert_eq!(handle.get(), -0.25);
        assert!(handle.aliases(&alias));
        assert!(!handle.aliases(&Tunable::new(1.0, -1.0, 1.0)));
    }

    #[test]
    fn registry_writes_through_published_handles() {
        let noise = Tunable::new(0.35, 0.0, 1.0);
        let mut registry = ParameterRegistry::new();
        registry.publish("noiseAmount", noise.clone());

        assert_eq!(registry.set("noiseAmount", 0.8), Ok(0.8));
        assert_eq!(noise.get(), 0.8);
        assert_eq!(registry.set("noiseAmount", 7.0), Ok(1.0));
        assert_eq!(
            registry.set("missing", 0.1),
            Err(ParamError::Unknown("missing".into()))
        );
        assert!(matches!(
            registry.set("noiseAmount", f32::NAN),
            Err(ParamError::NotFinite { .. })
        ));
    }

    #[test]
    fn republishing_replaces_the_handle() {
        let first = Tunable::new(0.1, 0.0, 1.0);
        let second = Tunable::new(0.2, 0.0, 1.0);
        let mut registry = ParameterRegistry::new();
        registry.publish("noiseSpeed", first);
        registry.publish("noiseSpeed", second.clone());

        assert_eq!(registry.entries().len(), 1);
        assert!(registry.get("noiseSpeed").unwrap().aliases(&second));
    }
}
