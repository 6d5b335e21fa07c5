//! Process-wide registration namespace
//!
//! Registered entries are visible to every template rendered by the owning
//! engine, at the lowest precedence: any binding supplied with the call
//! shadows them.

use std::sync::{PoisonError, RwLock};

use thiserror::Error;

use crate::expr::is_identifier;
use crate::scope::Scope;
use crate::value::Value;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistrationError {
    #[error("'{name}' is already registered with a different value")]
    Conflict { name: String },

    #[error("'{name}' is not a valid identifier")]
    InvalidName { name: String },
}

/// Thread-safe registry of named values
#[derive(Debug, Default)]
pub struct Namespace {
    entries: RwLock<Scope>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name`, failing if it is already bound to a different value
    pub fn register(
        &self,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<(), RegistrationError> {
        self.register_with(name, value, false)
    }

    pub fn register_with(
        &self,
        name: impl Into<String>,
        value: impl Into<Value>,
        overwrite: bool,
    ) -> Result<(), RegistrationError> {
        self.register_many([(name.into(), value.into())], overwrite)
            .map(|_| ())
    }

    /// Register several entries at once
    ///
    /// Every entry is validated before any is applied, so a conflict leaves
    /// the namespace untouched. Returns the number of entries applied.
    pub fn register_many<I, K, V>(&self, entries: I, overwrite: bool) -> Result<usize, RegistrationError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let batch: Vec<(String, Value)> = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let mut scope = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        for (i, (name, value)) in batch.iter().enumerate() {
            if !is_identifier(name) {
                return Err(RegistrationError::InvalidName { name: name.clone() });
            }
            if overwrite {
                continue;
            }
            let earlier = batch[..i]
                .iter()
                .rev()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v)
                .or_else(|| scope.get(name));
            if earlier.is_some_and(|existing| existing != value) {
                return Err(RegistrationError::Conflict { name: name.clone() });
            }
        }

        let count = batch.len();
        for (name, value) in batch {
            tracing::debug!(name = %name, "registered");
            scope.bind(name, value);
        }
        Ok(count)
    }

    /// Remove `name`, returning its value
    pub fn unregister(&self, name: &str) -> Option<Value> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Copy of the current entries
    pub fn snapshot(&self) -> Scope {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
