//! Variable Environment
//!
//! Layered variable storage: one global layer plus one layer per active
//! function call. Lookups walk from the innermost layer outwards, so a
//! callee sees its caller's locals (dynamic scoping). Unsetting a local
//! leaves an unset placeholder in its layer, which hides the outer binding
//! until the layer is popped.

use std::collections::{BTreeMap, HashMap};

use indexmap::IndexMap;

/// The value held by a variable.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(String),
    /// Sparse indexed array
    Indexed(BTreeMap<i64, String>),
    /// Associative array in insertion order
    Assoc(IndexMap<String, String>),
}

impl Value {
    /// The value as a scalar: element 0 for indexed arrays, key "0" for
    /// associative ones.
    pub fn scalar(&self) -> Option<&str> {
        match self {
            Value::Scalar(s) => Some(s),
            Value::Indexed(map) => map.get(&0).map(String::as_str),
            Value::Assoc(map) => map.get("0").map(String::as_str),
        }
    }

    /// All element values in index order.
    pub fn elements(&self) -> Vec<String> {
        match self {
            Value::Scalar(s) => vec![s.clone()],
            Value::Indexed(map) => map.values().cloned().collect(),
            Value::Assoc(map) => map.values().cloned().collect(),
        }
    }

    /// Element indices or keys.
    pub fn keys(&self) -> Vec<String> {
        match self {
            Value::Scalar(_) => vec!["0".to_string()],
            Value::Indexed(map) => map.keys().map(|k| k.to_string()).collect(),
            Value::Assoc(map) => map.keys().cloned().collect(),
        }
    }

    pub fn is_array(&self) -> bool {
        !matches!(self, Value::Scalar(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Variable {
    /// `None` means declared (e.g. `local x`) but unset.
    pub value: Option<Value>,
    pub exported: bool,
    pub readonly: bool,
    /// The scalar value names another variable.
    pub nameref: bool,
    /// Assignments are evaluated arithmetically.
    pub integer: bool,
    pub lowercase: bool,
    pub uppercase: bool,
}

impl Variable {
    pub fn scalar(value: impl Into<String>) -> Self {
        Self { value: Some(Value::Scalar(value.into())), ..Default::default() }
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    /// Apply case attributes to a value being stored.
    fn convert(&self, value: String) -> String {
        if self.lowercase {
            value.to_lowercase()
        } else if self.uppercase {
            value.to_uppercase()
        } else {
            value
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Scope {
    vars: HashMap<String, Variable>,
    /// Holds prefix assignments (`FOO=1 cmd`) rather than function locals.
    temporary: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Environment {
    globals: HashMap<String, Variable>,
    scopes: Vec<Scope>,
}

fn readonly_error(name: &str) -> String {
    format!("{}: readonly variable", name)
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from `(name, value)` pairs; every entry is exported.
    pub fn from_exported<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut env = Self::new();
        for (name, value) in vars {
            let mut var = Variable::scalar(value);
            var.exported = true;
            env.globals.insert(name.into(), var);
        }
        env
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    pub fn push_temporary_scope(&mut self, vars: HashMap<String, Variable>) {
        self.scopes.push(Scope { vars, temporary: true });
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// True while a function body is executing.
    pub fn in_function(&self) -> bool {
        self.scopes.iter().any(|s| !s.temporary)
    }

    /// Raw lookup without following namerefs.
    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.scopes
            .iter()
            .rev()
            .find_map(|s| s.vars.get(name))
            .or_else(|| self.globals.get(name))
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut Variable> {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(var) = scope.vars.get_mut(name) {
                return Some(var);
            }
        }
        self.globals.get_mut(name)
    }

    /// Binding a write to `name` lands in: the innermost layer holding it,
    /// else the global layer.
    fn slot(&mut self, name: &str) -> &mut Variable {
        let index = self.scopes.iter().rposition(|s| s.vars.contains_key(name));
        match index {
            Some(i) => self.scopes[i].vars.entry(name.to_string()).or_default(),
            None => self.globals.entry(name.to_string()).or_default(),
        }
    }

    /// Follow nameref chains to the name that actually holds the value.
    pub fn resolve_name(&self, name: &str, max_depth: u32) -> Result<String, String> {
        let mut current = name.to_string();
        for _ in 0..=max_depth {
            match self.get(&current) {
                Some(var) if var.nameref => match var.value.as_ref().and_then(Value::scalar) {
                    Some(target) if !target.is_empty() => current = target.to_string(),
                    _ => return Ok(current),
                },
                _ => return Ok(current),
            }
        }
        Err(format!("{}: circular name reference", name))
    }

    /// Resolved lookup.
    pub fn lookup(&self, name: &str, max_depth: u32) -> Option<&Variable> {
        let resolved = self.resolve_name(name, max_depth).ok()?;
        self.get(&resolved)
    }

    pub fn value(&self, name: &str, max_depth: u32) -> Option<&Value> {
        self.lookup(name, max_depth).and_then(|v| v.value.as_ref())
    }

    /// Assign a scalar, writing element 0 when the variable is an array.
    pub fn set_scalar(&mut self, name: &str, value: String, max_depth: u32) -> Result<(), String> {
        let name = self.resolve_name(name, max_depth)?;
        let var = self.slot(&name);
        if var.readonly {
            return Err(readonly_error(&name));
        }
        let value = var.convert(value);
        match &mut var.value {
            Some(Value::Indexed(map)) => {
                map.insert(0, value);
            }
            Some(Value::Assoc(map)) => {
                map.insert("0".to_string(), value);
            }
            slot => *slot = Some(Value::Scalar(value)),
        }
        Ok(())
    }

    /// Assign one element; `key` is an index for indexed arrays and a key
    /// for associative ones. A scalar is promoted to an indexed array.
    pub fn set_element(&mut self, name: &str, key: ElementKey, value: String, max_depth: u32) -> Result<(), String> {
        let name = self.resolve_name(name, max_depth)?;
        let var = self.slot(&name);
        if var.readonly {
            return Err(readonly_error(&name));
        }
        let value = var.convert(value);
        if let (Some(Value::Scalar(existing)), ElementKey::Index(_)) = (&var.value, &key) {
            var.value = Some(Value::Indexed(BTreeMap::from([(0, existing.clone())])));
        }
        match (&mut var.value, key) {
            (Some(Value::Assoc(map)), key) => {
                map.insert(key.as_key(), value);
            }
            (Some(Value::Indexed(map)), ElementKey::Index(i)) => {
                map.insert(i, value);
            }
            (slot, ElementKey::Index(i)) => {
                let mut map = BTreeMap::new();
                map.insert(i, value);
                *slot = Some(Value::Indexed(map));
            }
            (_, ElementKey::Key(k)) => return Err(format!("{}: {}: not an associative array", name, k)),
        }
        Ok(())
    }

    /// Replace the whole value.
    pub fn set_value(&mut self, name: &str, value: Value, max_depth: u32) -> Result<(), String> {
        let name = self.resolve_name(name, max_depth)?;
        let var = self.slot(&name);
        if var.readonly {
            return Err(readonly_error(&name));
        }
        var.value = Some(match value {
            Value::Scalar(s) => Value::Scalar(var.convert(s)),
            other => other,
        });
        Ok(())
    }

    /// Create or update a local binding in the innermost function layer.
    pub fn declare_local(&mut self, name: &str) -> Result<&mut Variable, String> {
        let index = self
            .scopes
            .iter()
            .rposition(|s| !s.temporary)
            .ok_or_else(|| "can only be used in a function".to_string())?;
        let outer_readonly = self.get(name).map_or(false, |v| v.readonly);
        if outer_readonly {
            return Err(readonly_error(name));
        }
        Ok(self.scopes[index].vars.entry(name.to_string()).or_default())
    }

    /// Attribute access for `declare`/`export`/`readonly`; creates the
    /// variable (unset) when missing.
    pub fn attributes_mut(&mut self, name: &str) -> &mut Variable {
        self.slot(name)
    }

    pub fn unset(&mut self, name: &str) -> Result<(), String> {
        if let Some(var) = self.get(name) {
            if var.readonly {
                return Err(format!("{}: cannot unset: readonly variable", name));
            }
        }
        if let Some(index) = self.scopes.iter().rposition(|s| s.vars.contains_key(name)) {
            self.scopes[index].vars.insert(name.to_string(), Variable::default());
        } else {
            self.globals.remove(name);
        }
        Ok(())
    }

    pub fn unset_element(&mut self, name: &str, key: ElementKey) -> Result<(), String> {
        match self.get_mut(name) {
            Some(var) if var.readonly => Err(format!("{}: cannot unset: readonly variable", name)),
            Some(var) => {
                match (&mut var.value, key) {
                    (Some(Value::Indexed(map)), ElementKey::Index(i)) => {
                        map.remove(&i);
                    }
                    (Some(Value::Assoc(map)), key) => {
                        map.shift_remove(&key.as_key());
                    }
                    (slot, ElementKey::Index(0)) if matches!(slot, Some(Value::Scalar(_))) => *slot = None,
                    _ => {}
                }
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Visible names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .globals
            .keys()
            .chain(self.scopes.iter().flat_map(|s| s.vars.keys()))
            .filter(|n| self.get(n).map_or(false, Variable::is_set))
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Environment for a child process: exported, set, scalar-valued.
    pub fn exported(&self) -> Vec<(String, String)> {
        self.names()
            .into_iter()
            .filter_map(|name| {
                let var = self.get(&name)?;
                if !var.exported {
                    return None;
                }
                let value = var.value.as_ref()?.scalar()?.to_string();
                Some((name, value))
            })
            .collect()
    }
}

/// Subscript of an array element after evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKey {
    Index(i64),
    Key(String),
}

impl ElementKey {
    fn as_key(&self) -> String {
        match self {
            ElementKey::Index(i) => i.to_string(),
            ElementKey::Key(k) => k.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_roundtrip() {
        let mut env = Environment::new();
        env.set_scalar("x", "1".into(), 10).unwrap();
        assert_eq!(env.value("x", 10), Some(&Value::Scalar("1".into())));
    }

    #[test]
    fn test_local_shadows_and_reveals() {
        let mut env = Environment::new();
        env.set_scalar("x", "outer".into(), 10).unwrap();
        env.push_scope();
        env.declare_local("x").unwrap().value = Some(Value::Scalar("inner".into()));
        assert_eq!(env.value("x", 10).and_then(Value::scalar), Some("inner"));
        env.unset("x").unwrap();
        assert_eq!(env.value("x", 10), None);
        env.pop_scope();
        assert_eq!(env.value("x", 10).and_then(Value::scalar), Some("outer"));
    }

    #[test]
    fn test_local_outside_function() {
        let mut env = Environment::new();
        assert!(env.declare_local("x").is_err());
        env.push_temporary_scope(HashMap::new());
        assert!(env.declare_local("x").is_err());
        assert!(!env.in_function());
    }

    #[test]
    fn test_assignment_targets_global_when_not_local() {
        let mut env = Environment::new();
        env.push_scope();
        env.set_scalar("g", "v".into(), 10).unwrap();
        env.pop_scope();
        assert_eq!(env.value("g", 10).and_then(Value::scalar), Some("v"));
    }

    #[test]
    fn test_readonly() {
        let mut env = Environment::new();
        env.set_scalar("r", "1".into(), 10).unwrap();
        env.attributes_mut("r").readonly = true;
        assert!(env.set_scalar("r", "2".into(), 10).is_err());
        assert!(env.unset("r").is_err());
    }

    #[test]
    fn test_nameref_resolution() {
        let mut env = Environment::new();
        env.set_scalar("target", "v".into(), 10).unwrap();
        env.set_scalar("ref", "target".into(), 10).unwrap();
        env.attributes_mut("ref").nameref = true;
        env.set_scalar("ref", "changed".into(), 10).unwrap();
        assert_eq!(env.value("target", 10).and_then(Value::scalar), Some("changed"));

        env.set_scalar("a", "b".into(), 10).unwrap();
        env.attributes_mut("a").nameref = true;
        env.set_scalar("b", "a".into(), 10).unwrap();
        env.attributes_mut("b").nameref = true;
        assert!(env.resolve_name("a", 10).is_err());
    }

    #[test]
    fn test_elements() {
        let mut env = Environment::new();
        env.set_scalar("a", "zero".into(), 10).unwrap();
        env.set_element("a", ElementKey::Index(3), "three".into(), 10).unwrap();
        let value = env.value("a", 10).unwrap();
        assert_eq!(value.elements(), vec!["zero", "three"]);
        assert_eq!(value.keys(), vec!["0", "3"]);

        env.set_value("m", Value::Assoc(IndexMap::new()), 10).unwrap();
        env.set_element("m", ElementKey::Key("k".into()), "v".into(), 10).unwrap();
        assert_eq!(env.value("m", 10).unwrap().keys(), vec!["k"]);
        env.unset_element("m", ElementKey::Key("k".into())).unwrap();
        assert!(env.value("m", 10).unwrap().keys().is_empty());
    }

    #[test]
    fn test_exported() {
        let mut env = Environment::from_exported([("PATH", "/bin")]);
        env.set_scalar("local_only", "x".into(), 10).unwrap();
        assert_eq!(env.exported(), vec![("PATH".to_string(), "/bin".to_string())]);
    }

    #[test]
    fn test_case_attributes() {
        let mut env = Environment::new();
        env.attributes_mut("u").uppercase = true;
        env.set_scalar("u", "abc".into(), 10).unwrap();
        assert_eq!(env.value("u", 10).and_then(Value::scalar), Some("ABC"));
    }
}
