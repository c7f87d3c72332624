use crate::variant::Value;
use fxhash::FxHashMap;
use immutable_string::ImmutableString;

/// Placeholder values for one compilation. Read-only while lowering.
#[derive(Clone, Debug, Default)]
pub struct Bindings {
    values: FxHashMap<ImmutableString, Value>,
}
impl Bindings {
    pub fn new() -> Self {
        Bindings {
            values: FxHashMap::default(),
        }
    }
    pub fn with<N: Into<ImmutableString>, V: Into<Value>>(mut self, name: N, value: V) -> Self {
        self.insert(name, value);
        self
    }
    pub fn insert<N: Into<ImmutableString>, V: Into<Value>>(&mut self, name: N, value: V) {
        self.values.insert(name.into(), value.into());
    }
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

/// Loop variables of the loops currently being unrolled, innermost last.
pub struct ScopeStack {
    stack: Vec<(ImmutableString, i64)>,
}
impl ScopeStack {
    pub fn new() -> Self {
        ScopeStack { stack: Vec::new() }
    }
    pub fn push(&mut self, name: ImmutableString, value: i64) {
        self.stack.push((name, value));
    }
    pub fn pop(&mut self) {
        self.stack.pop();
    }
    pub fn get_variable(&self, name: &str) -> Option<i64> {
        self.stack
            .iter()
            .rev()
            .find(|(variable, _)| variable.as_ref() == name)
            .map(|(_, value)| *value)
    }
}
impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}
