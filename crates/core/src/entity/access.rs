//! Explicit accessor interface for entity and record fields

use std::sync::Arc;

use tracing::warn;

use super::{EntityFlags, ImportReport};
use crate::error::{Error, Result};
use crate::marshal::{Marshal, Owner};
use crate::value::{Object, ObjectRef, Value};

/// Uniform field access on a shared object
///
/// Entity writes are marshaled against the declared type; record writes are
/// stored as-is.
pub trait PropertyAccess {
    /// Read a field
    ///
    /// Fails with `UnknownProperty` if the field is not declared.
    fn get(&self, name: &str) -> Result<Value>;

    /// Marshal and store a field
    fn set(&self, name: &str, value: impl Into<Value>) -> Result<()>;

    /// Whether the field is declared
    fn has(&self, name: &str) -> bool;

    /// Store every field of a map, list or object
    ///
    /// Null imports nothing. In `SkipInvalid` mode failing fields are logged
    /// and reported; otherwise the first failure aborts the import, leaving
    /// earlier fields applied.
    fn import(&self, input: Value) -> Result<ImportReport>;

    /// Dispatch a named accessor (`get_x`, `set_x`, `has_x`, or `getX` etc.)
    fn call(&self, method: &str, args: Vec<Value>) -> Result<Value>;
}

impl PropertyAccess for ObjectRef {
    fn get(&self, name: &str) -> Result<Value> {
        let guard = self.read();
        match &*guard {
            Object::Entity(entity) => {
                if !entity.definitions().has(name) {
                    return Err(Error::unknown_property(entity.type_name(), name));
                }
                Ok(entity.values().get(name).cloned().unwrap_or_default())
            }
            Object::Record(record) => record
                .get(name)
                .cloned()
                .ok_or_else(|| Error::unknown_property(record.type_name(), name)),
        }
    }

    fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();

        // Resolve under the lock, marshal without it
        let (marshal, definition, type_name): (Arc<Marshal>, _, String) = {
            let mut guard = self.write();
            match &mut *guard {
                Object::Record(record) => {
                    record.set(name, value);
                    return Ok(());
                }
                Object::Entity(entity) => {
                    let owner = Owner::of(entity.type_name(), self.id());
                    Marshal::check_self_reference(&owner, name, &value)?;
                    let definition = entity.resolve_definition(name)?;
                    (
                        Arc::clone(entity.marshal()),
                        definition,
                        entity.type_name().to_string(),
                    )
                }
            }
        };

        let value = marshal.marshal(&Owner::of(&type_name, self.id()), &definition, value)?;

        if let Some(entity) = self.write().as_entity_mut() {
            entity.store(&definition, value);
        }
        Ok(())
    }

    fn has(&self, name: &str) -> bool {
        match &*self.read() {
            Object::Entity(entity) => entity.definitions().has(name),
            Object::Record(record) => record.get(name).is_some(),
        }
    }

    fn import(&self, input: Value) -> Result<ImportReport> {
        let (type_name, skip_invalid) = {
            let guard = self.read();
            let skip = guard
                .as_entity()
                .is_some_and(|e| e.flags().contains(EntityFlags::SKIP_INVALID));
            (guard.type_name().to_string(), skip)
        };

        let entries = match input {
            Value::Null => Vec::new(),
            Value::Object(ref object) => object.fields(),
            ref other => other.array_entries().ok_or_else(|| Error::InvalidInput {
                owner: type_name.clone(),
                reason: format!("cannot import from {}", other.type_label()),
            })?,
        };

        let mut report = ImportReport::default();
        for (name, value) in entries {
            match self.set(&name, value) {
                Ok(()) => report.applied += 1,
                Err(e) if skip_invalid => {
                    warn!("Skipping {}.{} on import: {}", type_name, name, e);
                    report.skipped.push(e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }

    fn call(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        let unknown = || Error::UnknownMethod {
            owner: self.type_name(),
            method: method.to_string(),
        };
        let (verb, field) = split_accessor(method).ok_or_else(unknown)?;

        match (verb, args.len()) {
            (Verb::Get, 0) => self.get(&field),
            (Verb::Has, 0) => Ok(Value::Bool(self.has(&field))),
            (Verb::Set, 1) => {
                let value = args.into_iter().next().unwrap_or_default();
                self.set(&field, value)?;
                Ok(Value::Null)
            }
            (verb, count) => Err(Error::InvalidInput {
                owner: self.type_name(),
                reason: format!(
                    "{} takes {} argument(s), got {}",
                    method,
                    verb.arity(),
                    count
                ),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    Get,
    Set,
    Has,
}

impl Verb {
    fn arity(self) -> usize {
        match self {
            Verb::Set => 1,
            Verb::Get | Verb::Has => 0,
        }
    }
}

/// Split `get_name` / `getName` into a verb and a field name
fn split_accessor(method: &str) -> Option<(Verb, String)> {
    let (verb, rest) = [("get", Verb::Get), ("set", Verb::Set), ("has", Verb::Has)]
        .into_iter()
        .find_map(|(prefix, verb)| method.strip_prefix(prefix).map(|rest| (verb, rest)))?;

    if let Some(field) = rest.strip_prefix('_') {
        return (!field.is_empty()).then(|| (verb, field.to_string()));
    }

    // camelCase: lower the first letter of the remainder
    let mut chars = rest.chars();
    let first = chars.next().filter(char::is_ascii_uppercase)?;
    Some((verb, first.to_ascii_lowercase().to_string() + chars.as_str()))
}
