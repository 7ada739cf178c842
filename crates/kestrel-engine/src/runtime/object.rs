//! JavaScript object representation.
//!
//! Objects are plain property bags: no prototype chain and no attributes
//! beyond enumerability and deletability. Keys keep insertion order so that
//! for-in enumeration is deterministic.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::function::Callable;
use super::value::Value;

/// What kind of object this is; only affects printing and `length` upkeep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectClass {
    /// An ordinary object
    Object,
    /// An array literal
    Array,
    /// An error object created by an error constructor or the engine
    Error,
}

/// A JavaScript object.
#[derive(Debug, Clone)]
pub struct Object {
    class: ObjectClass,
    /// The properties
    properties: FxHashMap<String, Property>,
    /// Property keys in insertion order
    order: Vec<String>,
    /// The function `new` created this object with, consulted by `instanceof`
    constructor: Option<Arc<Callable>>,
}

impl Object {
    /// Creates a new empty object.
    pub fn new() -> Self {
        Self::with_class(ObjectClass::Object)
    }

    /// Creates an empty object of the given class.
    pub fn with_class(class: ObjectClass) -> Self {
        Self {
            class,
            properties: FxHashMap::default(),
            order: Vec::new(),
            constructor: None,
        }
    }

    /// Creates an array with the given `length` and no elements.
    pub fn array(length: usize) -> Self {
        let mut obj = Self::with_class(ObjectClass::Array);
        obj.define("length", Value::Number(length as f64), false, false);
        obj
    }

    /// Creates an error object with `name` and `message` properties.
    pub fn error(name: &str, message: &str) -> Self {
        let mut obj = Self::with_class(ObjectClass::Error);
        obj.set("name".to_string(), Value::from(name));
        obj.set("message".to_string(), Value::from(message));
        obj
    }

    /// The object's class.
    pub fn class(&self) -> ObjectClass {
        self.class
    }

    /// The constructor recorded by `new`.
    pub fn constructor(&self) -> Option<&Arc<Callable>> {
        self.constructor.as_ref()
    }

    /// Records the constructor, keeping an earlier one.
    pub fn set_constructor(&mut self, constructor: Arc<Callable>) {
        self.constructor.get_or_insert(constructor);
    }

    /// Gets a property value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key).map(|p| &p.value)
    }

    /// Sets a property value, creating an enumerable, deletable property if
    /// it does not exist yet.
    pub fn set(&mut self, key: String, value: Value) {
        if self.class == ObjectClass::Array {
            self.grow_length_for(&key);
        }
        match self.properties.get_mut(&key) {
            Some(prop) => prop.value = value,
            None => self.define(&key, value, true, true),
        }
    }

    fn define(&mut self, key: &str, value: Value, enumerable: bool, configurable: bool) {
        if self
            .properties
            .insert(
                key.to_string(),
                Property {
                    value,
                    enumerable,
                    configurable,
                },
            )
            .is_none()
        {
            self.order.push(key.to_string());
        }
    }

    fn grow_length_for(&mut self, key: &str) {
        let Ok(index) = key.parse::<u32>() else {
            return;
        };
        let length = self.get("length").map(Value::to_number).unwrap_or(0.0);
        if f64::from(index) >= length {
            if let Some(prop) = self.properties.get_mut("length") {
                prop.value = Value::Number(f64::from(index) + 1.0);
            }
        }
    }

    /// Deletes a property. Returns false only for non-deletable properties.
    pub fn delete(&mut self, key: &str) -> bool {
        match self.properties.get(key) {
            Some(prop) if !prop.configurable => false,
            Some(_) => {
                self.properties.remove(key);
                self.order.retain(|k| k != key);
                true
            }
            None => true,
        }
    }

    /// Checks if a property exists.
    pub fn has(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Enumerable keys in insertion order.
    pub fn enumerable_keys(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|k| self.properties.get(*k).is_some_and(|p| p.enumerable))
            .cloned()
            .collect()
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

/// A property slot.
#[derive(Debug, Clone)]
pub struct Property {
    /// The property value
    pub value: Value,
    /// Whether for-in visits the property
    pub enumerable: bool,
    /// Whether `delete` may remove the property
    pub configurable: bool,
}

/// A shared, lockable handle to an object.
#[derive(Debug, Clone)]
pub struct ObjectRef(Arc<RwLock<Object>>);

impl ObjectRef {
    /// Wraps a freshly built object.
    pub fn new(object: Object) -> Self {
        Self(Arc::new(RwLock::new(object)))
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// The object's class.
    pub fn class(&self) -> ObjectClass {
        self.0.read().class()
    }

    /// Reads a property, undefined when absent.
    pub fn get(&self, key: &str) -> Value {
        self.0.read().get(key).cloned().unwrap_or_default()
    }

    /// Writes a property.
    pub fn set(&self, key: &str, value: Value) {
        self.0.write().set(key.to_string(), value);
    }

    /// Whether the property exists.
    pub fn has(&self, key: &str) -> bool {
        self.0.read().has(key)
    }

    /// Deletes a property.
    pub fn delete(&self, key: &str) -> bool {
        self.0.write().delete(key)
    }

    /// Snapshot of the enumerable keys.
    pub fn enumerable_keys(&self) -> Vec<String> {
        self.0.read().enumerable_keys()
    }

    /// Whether `new constructor` produced this object.
    pub fn constructed_by(&self, constructor: &Arc<Callable>) -> bool {
        self.0
            .read()
            .constructor()
            .is_some_and(|c| Arc::ptr_eq(c, constructor))
    }

    /// Records the constructor of a freshly built object.
    pub fn set_constructor(&self, constructor: Arc<Callable>) {
        self.0.write().set_constructor(constructor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_and_order() {
        let mut obj = Object::new();
        obj.set("b".into(), Value::Number(1.0));
        obj.set("a".into(), Value::Number(2.0));
        obj.set("b".into(), Value::Number(3.0));
        assert_eq!(obj.get("b"), Some(&Value::Number(3.0)));
        assert_eq!(obj.enumerable_keys(), vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_delete() {
        let mut obj = Object::new();
        obj.set("x".into(), Value::Null);
        assert!(obj.delete("x"));
        assert!(!obj.has("x"));
        assert!(obj.delete("missing"));
        assert!(obj.enumerable_keys().is_empty());
    }

    #[test]
    fn test_array_length_is_hidden_and_grows() {
        let arr = ObjectRef::new(Object::array(1));
        arr.set("0", Value::Number(7.0));
        arr.set("4", Value::Number(9.0));
        assert_eq!(arr.get("length"), Value::Number(5.0));
        assert_eq!(arr.enumerable_keys(), vec!["0".to_string(), "4".to_string()]);
        assert!(!arr.delete("length"));
    }

    #[test]
    fn test_error_object() {
        let err = ObjectRef::new(Object::error("RangeError", "too deep"));
        assert_eq!(err.class(), ObjectClass::Error);
        assert_eq!(err.get("name"), Value::from("RangeError"));
    }
}
