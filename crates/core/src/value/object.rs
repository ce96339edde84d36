//! Shared, identity-bearing composites
//!
//! An [`ObjectRef`] is a cheap handle to an [`Object`] behind a
//! `parking_lot::RwLock`. Identity is the address of the shared allocation,
//! which is what cycle detection and the self-assignment guard compare.
//!
//! Locks are held only for the duration of a single read or a single store;
//! marshaling never runs while a lock is held.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::Value;
use crate::entity::Entity;

/// Identity of a shared object, stable for the object's lifetime
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(usize);

/// A composite held by an [`ObjectRef`]
#[derive(Debug)]
pub enum Object {
    /// Member of the typed-entity family: every write is marshaled
    Entity(Entity),
    /// Loosely typed property bag built by flat copy
    Record(Record),
}

impl Object {
    pub fn type_name(&self) -> &str {
        match self {
            Object::Entity(entity) => entity.type_name(),
            Object::Record(record) => record.type_name(),
        }
    }

    /// Enumerable fields in order
    pub fn fields(&self) -> Vec<(String, Value)> {
        match self {
            Object::Entity(entity) => entity.values().clone().into_iter().collect(),
            Object::Record(record) => record.fields().clone().into_iter().collect(),
        }
    }

    pub fn field_count(&self) -> usize {
        match self {
            Object::Entity(entity) => entity.values().len(),
            Object::Record(record) => record.fields().len(),
        }
    }

    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            Object::Entity(entity) => Some(entity),
            Object::Record(_) => None,
        }
    }

    pub fn as_entity_mut(&mut self) -> Option<&mut Entity> {
        match self {
            Object::Entity(entity) => Some(entity),
            Object::Record(_) => None,
        }
    }
}

/// Named property bag without declared types
///
/// Target of the flat property-by-property copy used when a declared
/// composite type does not belong to the entity family.
#[derive(Debug, Clone)]
pub struct Record {
    type_name: String,
    fields: IndexMap<String, Value>,
}

impl Record {
    pub fn new(type_name: impl Into<String>, fields: IndexMap<String, Value>) -> Self {
        Self {
            type_name: type_name.into(),
            fields,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn fields(&self) -> &IndexMap<String, Value> {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }
}

/// Shared handle to an [`Object`]
#[derive(Clone)]
pub struct ObjectRef(Arc<RwLock<Object>>);

impl ObjectRef {
    pub fn new(object: Object) -> Self {
        Self(Arc::new(RwLock::new(object)))
    }

    /// Wrap a flat-copied record
    pub fn record(type_name: impl Into<String>, fields: IndexMap<String, Value>) -> Self {
        Self::new(Object::Record(Record::new(type_name, fields)))
    }

    pub fn id(&self) -> ObjectId {
        ObjectId(Arc::as_ptr(&self.0) as *const () as usize)
    }

    /// Whether both handles point at the same object
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Object> {
        self.0.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Object> {
        self.0.write()
    }

    pub fn type_name(&self) -> String {
        self.read().type_name().to_string()
    }

    pub fn is_entity(&self) -> bool {
        matches!(&*self.read(), Object::Entity(_))
    }

    pub fn field_count(&self) -> usize {
        self.read().field_count()
    }

    /// Snapshot of the enumerable fields
    pub fn fields(&self) -> Vec<(String, Value)> {
        self.read().fields()
    }

    /// Whether this object's type is `type_name` or one of its subtypes
    ///
    /// Records only match their own type name; entities consult the metadata
    /// provider they were built from.
    pub fn is_instance_of(&self, type_name: &str) -> bool {
        let guard = self.read();
        if guard.type_name() == type_name {
            return true;
        }
        match &*guard {
            Object::Entity(entity) => entity.marshal().is_subtype(entity.type_name(), type_name),
            Object::Record(_) => false,
        }
    }

    /// Duplicate this object and every object reachable from it
    ///
    /// Must only be called on acyclic graphs.
    pub fn deep_clone(&self) -> ObjectRef {
        let copy = match &*self.read() {
            Object::Entity(entity) => Object::Entity(entity.deep_clone()),
            Object::Record(record) => Object::Record(Record::new(
                record.type_name(),
                record
                    .fields()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.deep_clone()))
                    .collect(),
            )),
        };
        ObjectRef::new(copy)
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never recurse into fields: graphs may be cyclic
        match self.0.try_read() {
            Some(guard) => write!(f, "ObjectRef({}@{:#x})", guard.type_name(), self.id().0),
            None => write!(f, "ObjectRef(<locked>@{:#x})", self.id().0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_per_allocation() {
        let a = ObjectRef::record("Point", IndexMap::new());
        let b = a.clone();
        let c = ObjectRef::record("Point", IndexMap::new());

        assert_eq!(a.id(), b.id());
        assert!(a.ptr_eq(&b));
        assert_ne!(a.id(), c.id());
        assert_ne!(a, c);
    }

    #[test]
    fn test_record_deep_clone_is_new_identity() {
        let mut fields = IndexMap::new();
        fields.insert("x".to_string(), Value::from(1));
        let a = ObjectRef::record("Point", fields);
        let b = a.deep_clone();

        assert!(!a.ptr_eq(&b));
        assert_eq!(b.type_name(), "Point");
        assert_eq!(b.fields(), vec![("x".to_string(), Value::from(1))]);
    }

    #[test]
    fn test_record_is_instance_of_own_type_only() {
        let a = ObjectRef::record("Point", IndexMap::new());
        assert!(a.is_instance_of("Point"));
        assert!(!a.is_instance_of("Shape"));
        assert!(!a.is_entity());
    }

    #[test]
    fn test_debug_does_not_recurse() {
        let a = ObjectRef::record("Point", IndexMap::new());
        let rendered = format!("{:?}", a);
        assert!(rendered.starts_with("ObjectRef(Point@"));
    }
}
