//! Scope snapshots: the name → value bindings a template is rendered against

use indexmap::IndexMap;

use crate::value::Value;

/// An ordered set of name bindings
///
/// Later bindings of the same name replace earlier ones but keep the original
/// position, so iteration order is the order names were first bound.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    bindings: IndexMap<String, Value>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Bind `name`, returning the value it replaced
    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.bindings.insert(name.into(), value.into())
    }

    /// Builder-style [`Scope::bind`]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bind(name, value);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.bindings.shift_remove(name)
    }

    /// Lay `other` over this scope; its bindings take precedence
    pub fn layer(&mut self, other: &Scope) {
        for (name, value) in other.iter() {
            self.bindings.insert(name.to_string(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Scope {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut scope = Scope::new();
        scope.extend(iter);
        scope
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for Scope {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.bind(name, value);
        }
    }
}

/// Assembles a call's scope from precedence layers
///
/// From lowest to highest precedence: registered entries, globals, enclosing
/// scopes from outermost to innermost, then locals.
#[derive(Debug, Clone, Default)]
pub struct ScopeBuilder {
    globals: Scope,
    enclosing: Vec<Scope>,
    locals: Scope,
}

impl ScopeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn globals(mut self, scope: Scope) -> Self {
        self.globals = scope;
        self
    }

    /// Push an enclosing scope; each call is narrower than the previous one
    pub fn enclosing(mut self, scope: Scope) -> Self {
        self.enclosing.push(scope);
        self
    }

    pub fn locals(mut self, scope: Scope) -> Self {
        self.locals = scope;
        self
    }

    /// Merge every layer over `registered`
    pub fn build(&self, registered: &Scope) -> Scope {
        let mut scope = registered.clone();
        scope.layer(&self.globals);
        for enclosing in &self.enclosing {
            scope.layer(enclosing);
        }
        scope.layer(&self.locals);
        scope
    }
}

/// Build a [`Scope`] from local variables and explicit bindings
///
/// ```
/// use interpol::{scope, Value};
///
/// let name = "Ada";
/// let scope = scope!(name, year = 1815);
/// assert_eq!(scope.get("name"), Some(&Value::from("Ada")));
/// assert_eq!(scope.get("year"), Some(&Value::Int(1815)));
/// ```
#[macro_export]
macro_rules! scope {
    () => {
        $crate::Scope::new()
    };
    ($($name:ident $(= $value:expr)?),+ $(,)?) => {{
        let mut scope = $crate::Scope::new();
        $(
            scope.bind(stringify!($name), $crate::__scope_value!($name $(= $value)?));
        )+
        scope
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __scope_value {
    ($name:ident) => {
        $name.clone()
    };
    ($name:ident = $value:expr) => {
        $value
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebinding_keeps_position() {
        let mut scope = Scope::new().with("a", 1).with("b", 2);
        assert_eq!(scope.bind("a", 3), Some(Value::Int(1)));
        let names: Vec<&str> = scope.names().collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(scope.get("a"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_builder_precedence() {
        let registered = Scope::new().with("x", "registered").with("only_registered", 1);
        let scope = ScopeBuilder::new()
            .globals(Scope::new().with("x", "global").with("g", 1))
            .enclosing(Scope::new().with("x", "outer"))
            .enclosing(Scope::new().with("x", "inner"))
            .build(&registered);
        assert_eq!(scope.get("x"), Some(&Value::from("inner")));
        assert_eq!(scope.get("only_registered"), Some(&Value::Int(1)));
        assert_eq!(scope.get("g"), Some(&Value::Int(1)));

        let scope = ScopeBuilder::new()
            .enclosing(Scope::new().with("x", "inner"))
            .locals(Scope::new().with("x", "local"))
            .build(&registered);
        assert_eq!(scope.get("x"), Some(&Value::from("local")));
    }

    #[test]
    fn test_scope_macro_captures_locals() {
        let user = String::from("ada");
        let count = 3;
        let scope = crate::scope!(user, count, total = count * 2);
        assert_eq!(scope.get("user"), Some(&Value::from("ada")));
        assert_eq!(scope.get("count"), Some(&Value::Int(3)));
        assert_eq!(scope.get("total"), Some(&Value::Int(6)));
        // captured by clone; the locals are still usable
        assert_eq!(user.len(), 3);
    }

    #[test]
    fn test_collect_into_scope() {
        let scope: Scope = vec![("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(scope.len(), 2);
        assert!(scope.contains("b"));
    }
}
