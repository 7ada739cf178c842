//! Runtime environments for variable binding.
//!
//! An [`Environment`] pairs one binding record with a link to its parent.
//! Code lowered against a static scope addresses declarative records by
//! slot; everything else goes through the by-name operations, which walk
//! the chain and consult each record in turn.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::object::ObjectRef;
use super::value::Value;
use crate::compiler::scope::NameResolver;

/// A variable binding in a dynamic record.
#[derive(Debug, Clone)]
pub struct Binding {
    /// The value
    pub value: Value,
    /// Whether `delete` may remove the binding
    pub deletable: bool,
}

/// The storage behind an environment.
#[derive(Debug)]
pub enum Record {
    /// Fixed slots for a statically resolved scope
    Declarative {
        /// Slot names, used by by-name lookups
        names: Arc<[String]>,
        /// Slot values
        slots: Vec<Value>,
    },
    /// Name-keyed store that grows as bindings appear
    Dynamic(FxHashMap<String, Binding>),
    /// The object of a `with` statement
    Object(ObjectRef),
}

impl NameResolver for Record {
    fn slot_of(&self, name: &str) -> Option<usize> {
        match self {
            Record::Declarative { names, .. } => names.iter().position(|n| n == name),
            Record::Dynamic(_) | Record::Object(_) => None,
        }
    }

    fn declares(&self, name: &str) -> bool {
        match self {
            Record::Declarative { .. } => self.slot_of(name).is_some(),
            Record::Dynamic(bindings) => bindings.contains_key(name),
            Record::Object(obj) => obj.has(name),
        }
    }
}

/// A link in the runtime scope chain.
#[derive(Debug)]
pub struct Environment {
    record: RwLock<Record>,
    parent: Option<Arc<Environment>>,
}

/// Result of a successful by-name lookup.
#[derive(Debug, Clone)]
pub struct Lookup {
    /// The bound value
    pub value: Value,
    /// The implicit `this` for a call through the name
    pub this: Value,
}

impl Environment {
    fn with_record(record: Record, parent: Option<Arc<Environment>>) -> Arc<Self> {
        Arc::new(Self {
            record: RwLock::new(record),
            parent,
        })
    }

    /// Creates the global environment.
    pub fn global() -> Arc<Self> {
        Self::with_record(Record::Dynamic(FxHashMap::default()), None)
    }

    /// Creates a slot-addressed environment with every slot undefined.
    pub fn declarative(names: Arc<[String]>, parent: Option<Arc<Environment>>) -> Arc<Self> {
        let slots = vec![Value::Undefined; names.len()];
        Self::with_record(Record::Declarative { names, slots }, parent)
    }

    /// Creates an empty name-keyed environment.
    pub fn dynamic(parent: Option<Arc<Environment>>) -> Arc<Self> {
        Self::with_record(Record::Dynamic(FxHashMap::default()), parent)
    }

    /// Creates the environment a `with` statement runs its body in.
    pub fn object(object: ObjectRef, parent: Arc<Environment>) -> Arc<Self> {
        Self::with_record(Record::Object(object), Some(parent))
    }

    /// The enclosing environment.
    pub fn parent(&self) -> Option<&Arc<Environment>> {
        self.parent.as_ref()
    }

    /// Whether this is a name-keyed record.
    pub fn is_dynamic(&self) -> bool {
        matches!(*self.record.read(), Record::Dynamic(_))
    }

    /// Walks `depth` parent links.
    pub fn ancestor(&self, depth: usize) -> Option<&Environment> {
        let mut env = self;
        for _ in 0..depth {
            env = env.parent.as_deref()?;
        }
        Some(env)
    }

    /// The outermost environment.
    pub fn root(self: &Arc<Self>) -> Arc<Environment> {
        let mut env = self.clone();
        while let Some(parent) = env.parent.clone() {
            env = parent;
        }
        env
    }

    /// The nearest name-keyed environment, where eval code puts its
    /// declarations.
    pub fn variable_environment(self: &Arc<Self>) -> Arc<Environment> {
        let mut env = self.clone();
        loop {
            if env.is_dynamic() {
                return env;
            }
            match env.parent.clone() {
                Some(parent) => env = parent,
                None => return env,
            }
        }
    }

    // Slot access

    /// Reads a slot of a declarative record.
    pub fn get_slot(&self, index: usize) -> Option<Value> {
        match &*self.record.read() {
            Record::Declarative { slots, .. } => slots.get(index).cloned(),
            _ => None,
        }
    }

    /// Writes a slot of a declarative record.
    pub fn set_slot(&self, index: usize, value: Value) -> bool {
        match &mut *self.record.write() {
            Record::Declarative { slots, .. } => match slots.get_mut(index) {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    // Record-local name access

    /// Whether this record binds `name`.
    pub fn has_value(&self, name: &str) -> bool {
        self.record.read().declares(name)
    }

    /// Reads `name` from this record only.
    pub fn get_value(&self, name: &str) -> Option<Value> {
        let record = self.record.read();
        match &*record {
            Record::Declarative { slots, .. } => {
                record.slot_of(name).and_then(|i| slots.get(i).cloned())
            }
            Record::Dynamic(bindings) => bindings.get(name).map(|b| b.value.clone()),
            Record::Object(obj) => obj.has(name).then(|| obj.get(name)),
        }
    }

    /// Writes `name` in this record if it is bound here.
    pub fn set_value(&self, name: &str, value: Value) -> bool {
        let mut record = self.record.write();
        let slot = record.slot_of(name);
        match &mut *record {
            Record::Declarative { slots, .. } => match slot.and_then(|i| slots.get_mut(i)) {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            },
            Record::Dynamic(bindings) => match bindings.get_mut(name) {
                Some(binding) => {
                    binding.value = value;
                    true
                }
                None => false,
            },
            Record::Object(obj) => {
                if obj.has(name) {
                    obj.set(name, value);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Adds `name` to a dynamic record, leaving an existing binding as is.
    ///
    /// Returns false for record kinds that cannot grow.
    pub fn declare(&self, name: &str, deletable: bool) -> bool {
        match &mut *self.record.write() {
            Record::Dynamic(bindings) => {
                bindings.entry(name.to_string()).or_insert(Binding {
                    value: Value::Undefined,
                    deletable,
                });
                true
            }
            _ => false,
        }
    }

    /// Removes `name` from this record. `None` when it is not bound here.
    pub fn delete(&self, name: &str) -> Option<bool> {
        match &mut *self.record.write() {
            Record::Declarative { names, .. } => names.iter().any(|n| n == name).then_some(false),
            Record::Dynamic(bindings) => match bindings.get(name) {
                Some(binding) if binding.deletable => {
                    bindings.remove(name);
                    Some(true)
                }
                Some(_) => Some(false),
                None => None,
            },
            Record::Object(obj) => obj.has(name).then(|| obj.delete(name)),
        }
    }

    // Chain walks

    /// The nearest environment on the chain that binds `name`.
    pub fn find(self: &Arc<Self>, name: &str) -> Option<Arc<Environment>> {
        let mut env = Some(self.clone());
        while let Some(current) = env {
            if current.has_value(name) {
                return Some(current);
            }
            env = current.parent.clone();
        }
        None
    }

    /// Looks `name` up along the chain.
    pub fn lookup(self: &Arc<Self>, name: &str) -> Option<Lookup> {
        let env = self.find(name)?;
        let value = env.get_value(name)?;
        let this = match &*env.record.read() {
            Record::Object(obj) => Value::Object(obj.clone()),
            _ => Value::Undefined,
        };
        Some(Lookup { value, this })
    }

    /// Assigns to the nearest binding of `name`. False if there is none.
    pub fn assign(self: &Arc<Self>, name: &str, value: Value) -> bool {
        match self.find(name) {
            Some(env) => env.set_value(name, value),
            None => false,
        }
    }

    /// Creates (or overwrites) a deletable binding in the outermost record.
    pub fn assign_global(self: &Arc<Self>, name: &str, value: Value) {
        let global = self.root();
        global.declare(name, true);
        global.set_value(name, value);
    }

    /// `delete name`: removes the nearest binding; true when nothing binds it.
    pub fn delete_binding(self: &Arc<Self>, name: &str) -> bool {
        let mut env = Some(self.clone());
        while let Some(current) = env {
            if let Some(deleted) = current.delete(name) {
                return deleted;
            }
            env = current.parent.clone();
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::object::Object;

    fn names(list: &[&str]) -> Arc<[String]> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_declarative_slots_and_names() {
        let env = Environment::declarative(names(&["a", "b"]), None);
        assert!(env.set_slot(1, Value::Number(2.0)));
        assert_eq!(env.get_value("b"), Some(Value::Number(2.0)));
        assert!(env.has_value("a"));
        assert!(!env.has_value("c"));
        assert!(env.set_value("a", Value::Boolean(true)));
        assert_eq!(env.get_slot(0), Some(Value::Boolean(true)));
    }

    #[test]
    fn test_dynamic_record_grows_late() {
        let env = Environment::dynamic(None);
        assert!(!env.has_value("x"));
        assert!(env.declare("x", false));
        assert!(env.set_value("x", Value::Number(1.0)));
        // Redeclaring keeps the value.
        env.declare("x", true);
        assert_eq!(env.get_value("x"), Some(Value::Number(1.0)));
    }

    #[test]
    fn test_lookup_walks_parents() {
        let global = Environment::global();
        global.declare("g", false);
        global.set_value("g", Value::from("global"));
        let inner = Environment::declarative(names(&["x"]), Some(global.clone()));

        let found = inner.lookup("g").unwrap();
        assert_eq!(found.value, Value::from("global"));
        assert!(found.this.is_undefined());
        assert!(inner.lookup("nope").is_none());
        assert!(inner.assign("g", Value::Null));
        assert_eq!(global.get_value("g"), Some(Value::Null));
    }

    #[test]
    fn test_with_object_supplies_this() {
        let global = Environment::global();
        let obj = ObjectRef::new(Object::new());
        obj.set("m", Value::Number(1.0));
        let with = Environment::object(obj.clone(), global);

        let found = with.lookup("m").unwrap();
        assert!(matches!(found.this, Value::Object(ref o) if o.ptr_eq(&obj)));
    }

    #[test]
    fn test_delete_binding_rules() {
        let global = Environment::global();
        global.declare("declared", false);
        global.assign_global("implicit", Value::Number(1.0));
        let func = Environment::declarative(names(&["local"]), Some(global.clone()));

        assert!(!func.delete_binding("local"));
        assert!(!func.delete_binding("declared"));
        assert!(func.delete_binding("implicit"));
        assert!(!global.has_value("implicit"));
        assert!(func.delete_binding("never_bound"));
    }

    #[test]
    fn test_variable_environment_skips_declarative_records() {
        let global = Environment::global();
        let func = Environment::dynamic(Some(global.clone()));
        let catch = Environment::declarative(names(&["e"]), Some(func.clone()));
        assert!(Arc::ptr_eq(&catch.variable_environment(), &func));
        assert!(Arc::ptr_eq(&catch.root(), &global));
        assert!(catch.ancestor(2).is_some());
        assert!(catch.ancestor(3).is_none());
    }
}
