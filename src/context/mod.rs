//! Context store: the machine's mutable data bag.
//!
//! Every mutation goes through [`ContextStore::set`], which applies the
//! mutation, recomputes derived fields, then reports the watched keys whose
//! value changed. Watched keys name fields of the serialized context
//! (`"value"`, or a dotted path such as `"format_options.locale"`), and are
//! compared as `serde_json::Value`s, so the default comparison is deep
//! equality. A per-key compare function can replace it.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::rc::Rc;

/// Bounds every machine context satisfies: owned, cloneable for
/// subscriber snapshots, and serializable for watched-key diffing.
pub trait MachineContext: Clone + Serialize + 'static {}

impl<T: Clone + Serialize + 'static> MachineContext for T {}

/// Recomputes one derived field from the rest of the context.
pub type ComputedFn<C> = Rc<dyn Fn(&mut C)>;

/// Equality used to decide whether a watched key changed. Returns `true`
/// when the two values count as equal.
pub type CompareFn = Rc<dyn Fn(&Value, &Value) -> bool>;

/// Reference to a computed-field function, as written in a definition.
pub enum Computed<C> {
    /// Looked up in the computed table of the machine options.
    Named(String),
    Inline { name: String, compute: ComputedFn<C> },
}

impl<C> Computed<C> {
    pub fn new<F>(name: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&mut C) + 'static,
    {
        Computed::Inline {
            name: name.into(),
            compute: Rc::new(compute),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Computed::Named(name) | Computed::Inline { name, .. } => name,
        }
    }
}

impl<C> From<&str> for Computed<C> {
    fn from(name: &str) -> Self {
        Computed::Named(name.to_string())
    }
}

impl<C> Clone for Computed<C> {
    fn clone(&self) -> Self {
        match self {
            Computed::Named(name) => Computed::Named(name.clone()),
            Computed::Inline { name, compute } => Computed::Inline {
                name: name.clone(),
                compute: Rc::clone(compute),
            },
        }
    }
}

impl<C> fmt::Debug for Computed<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Computed").field(&self.name()).finish()
    }
}

struct DerivedField<C> {
    name: String,
    compute: ComputedFn<C>,
}

struct WatchedKey {
    key: String,
    pointer: String,
    compare: Option<CompareFn>,
}

/// Owns the context of one machine.
///
/// # Example
///
/// ```rust
/// use serde::Serialize;
/// use statecore::ContextStore;
///
/// #[derive(Clone, Serialize)]
/// struct Ctx {
///     value: i64,
///     max: i64,
///     is_at_max: bool,
/// }
///
/// let mut store = ContextStore::new(Ctx { value: 9, max: 10, is_at_max: false })
///     .with_computed("is_at_max", |ctx: &mut Ctx| ctx.is_at_max = ctx.value >= ctx.max)
///     .with_watch("value");
/// store.recompute_derived();
/// assert!(!store.get().is_at_max);
///
/// let changed = store.set(|ctx| ctx.value += 1).unwrap();
/// assert_eq!(changed, vec!["value"]);
/// assert!(store.get().is_at_max);
///
/// let changed = store.set(|ctx| ctx.value = 10).unwrap();
/// assert!(changed.is_empty());
/// ```
pub struct ContextStore<C> {
    current: C,
    initial: C,
    derived: Vec<DerivedField<C>>,
    watched: Vec<WatchedKey>,
    observed: Vec<Value>,
}

impl<C: Clone + Serialize> ContextStore<C> {
    /// Create a store with no derived fields and no watched keys.
    pub fn new(context: C) -> Self {
        Self {
            initial: context.clone(),
            current: context,
            derived: Vec::new(),
            watched: Vec::new(),
            observed: Vec::new(),
        }
    }

    /// Add a derived field. Derived fields are recomputed in the order added.
    pub fn with_computed<F>(mut self, name: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&mut C) + 'static,
    {
        self.push_computed(name.into(), Rc::new(compute));
        self
    }

    /// Watch a key with deep equality.
    pub fn with_watch(mut self, key: impl Into<String>) -> Self {
        self.push_watch(key.into(), None);
        self
    }

    /// Watch a key with a custom equality.
    pub fn with_watch_compare<F>(mut self, key: impl Into<String>, compare: F) -> Self
    where
        F: Fn(&Value, &Value) -> bool + 'static,
    {
        self.push_watch(key.into(), Some(Rc::new(compare)));
        self
    }

    pub(crate) fn push_computed(&mut self, name: String, compute: ComputedFn<C>) {
        self.derived.push(DerivedField { name, compute });
    }

    pub(crate) fn push_watch(&mut self, key: String, compare: Option<CompareFn>) {
        let pointer = json_pointer(&key);
        self.watched.push(WatchedKey {
            key,
            pointer,
            compare,
        });
    }

    /// The live context.
    pub fn get(&self) -> &C {
        &self.current
    }

    /// The context the store was last seeded with.
    pub fn initial(&self) -> &C {
        &self.initial
    }

    /// Names of the derived fields, in recompute order.
    pub fn computed_names(&self) -> impl Iterator<Item = &str> {
        self.derived.iter().map(|d| d.name.as_str())
    }

    /// Recompute every derived field, in declaration order.
    pub fn recompute_derived(&mut self) {
        for field in &self.derived {
            (field.compute)(&mut self.current);
        }
    }

    /// Apply a mutation, recompute derived fields, and return the watched
    /// keys whose value changed, in declaration order.
    pub fn set<F>(&mut self, mutate: F) -> Result<Vec<&str>, serde_json::Error>
    where
        F: FnOnce(&mut C),
    {
        let changed = self.apply(mutate)?;
        Ok(changed
            .into_iter()
            .map(|index| self.watched[index].key.as_str())
            .collect())
    }

    /// Same as [`set`](Self::set), returning watch positions.
    pub(crate) fn apply<F>(&mut self, mutate: F) -> Result<Vec<usize>, serde_json::Error>
    where
        F: FnOnce(&mut C),
    {
        if self.observed.len() != self.watched.len() {
            self.observed = self.observe()?;
        }
        mutate(&mut self.current);
        self.recompute_derived();
        self.diff_watched()
    }

    /// Replace the context, recompute, and take the watched values as the
    /// new baseline. Watches do not fire for a reseed.
    pub(crate) fn seed(&mut self, context: C) -> Result<(), serde_json::Error> {
        self.initial = context.clone();
        self.current = context;
        self.recompute_derived();
        self.observed = self.observe()?;
        Ok(())
    }

    /// Watched keys that do not exist in the serialized context.
    pub(crate) fn missing_watch_keys(&self) -> Result<Vec<&str>, serde_json::Error> {
        if self.watched.is_empty() {
            return Ok(Vec::new());
        }
        let snapshot = serde_json::to_value(&self.current)?;
        Ok(self
            .watched
            .iter()
            .filter(|w| snapshot.pointer(&w.pointer).is_none())
            .map(|w| w.key.as_str())
            .collect())
    }

    fn observe(&self) -> Result<Vec<Value>, serde_json::Error> {
        if self.watched.is_empty() {
            return Ok(Vec::new());
        }
        let snapshot = serde_json::to_value(&self.current)?;
        Ok(self
            .watched
            .iter()
            .map(|w| snapshot.pointer(&w.pointer).cloned().unwrap_or(Value::Null))
            .collect())
    }

    fn diff_watched(&mut self) -> Result<Vec<usize>, serde_json::Error> {
        let next = self.observe()?;
        let mut changed = Vec::new();
        for (index, watch) in self.watched.iter().enumerate() {
            let before = self.observed.get(index).unwrap_or(&Value::Null);
            let after = &next[index];
            let equal = match &watch.compare {
                Some(compare) => compare(before, after),
                None => before == after,
            };
            if !equal {
                changed.push(index);
            }
        }
        self.observed = next;
        Ok(changed)
    }
}

/// Turn a dotted key into a JSON pointer (RFC 6901).
fn json_pointer(key: &str) -> String {
    key.split('.')
        .map(|segment| segment.replace('~', "~0").replace('/', "~1"))
        .fold(String::new(), |mut pointer, segment| {
            pointer.push('/');
            pointer.push_str(&segment);
            pointer
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    #[derive(Clone, Serialize)]
    struct Options {
        locale: String,
        digits: u8,
    }

    #[derive(Clone, Serialize)]
    struct Ctx {
        value: String,
        min: i64,
        max: i64,
        value_as_number: i64,
        is_out_of_range: bool,
        options: Options,
    }

    fn ctx() -> Ctx {
        Ctx {
            value: "5".to_string(),
            min: 0,
            max: 10,
            value_as_number: 0,
            is_out_of_range: false,
            options: Options {
                locale: "en-US".to_string(),
                digits: 2,
            },
        }
    }

    fn store() -> ContextStore<Ctx> {
        let mut store = ContextStore::new(ctx())
            .with_computed("value_as_number", |c: &mut Ctx| {
                c.value_as_number = c.value.parse().unwrap_or(0)
            })
            .with_computed("is_out_of_range", |c: &mut Ctx| {
                c.is_out_of_range = c.value_as_number < c.min || c.value_as_number > c.max
            })
            .with_watch("value")
            .with_watch("is_out_of_range")
            .with_watch("options.locale");
        store.seed(ctx()).unwrap();
        store
    }

    #[test]
    fn json_pointer_splits_dots_and_escapes() {
        assert_eq!(json_pointer("value"), "/value");
        assert_eq!(json_pointer("a.b"), "/a/b");
        assert_eq!(json_pointer("a~b/c"), "/a~0b~1c");
    }

    #[test]
    fn seed_recomputes_without_firing_watches() {
        let store = store();
        assert_eq!(store.get().value_as_number, 5);
        assert!(!store.get().is_out_of_range);
    }

    #[test]
    fn computed_fields_run_in_declaration_order() {
        let mut store = store();
        let changed = store.set(|c| c.value = "42".to_string()).unwrap();
        assert_eq!(changed, vec!["value", "is_out_of_range"]);

        assert_eq!(store.get().value_as_number, 42);
        assert!(store.get().is_out_of_range);
    }

    #[test]
    fn unchanged_values_do_not_fire() {
        let mut store = store();
        let changed = store.set(|c| c.value = "5".to_string()).unwrap();
        assert!(changed.is_empty());
    }

    #[test]
    fn nested_keys_are_watched() {
        let mut store = store();
        let changed = store.set(|c| c.options.locale = "de-DE".to_string()).unwrap();
        assert_eq!(changed, vec!["options.locale"]);

        let changed = store.set(|c| c.options.digits = 4).unwrap();
        assert!(changed.is_empty());
    }

    #[test]
    fn compare_fn_overrides_deep_equality() {
        let mut store = ContextStore::new(ctx()).with_watch_compare("options", |a, b| {
            a.get("locale") == b.get("locale")
        });
        store.seed(ctx()).unwrap();

        let changed = store.set(|c| c.options.digits = 6).unwrap();
        assert!(changed.is_empty());

        let changed = store.set(|c| c.options.locale = "fr-FR".to_string()).unwrap();
        assert_eq!(changed, vec!["options"]);
    }

    #[test]
    fn baseline_moves_after_each_set() {
        let mut store = store();
        assert_eq!(store.set(|c| c.value = "6".to_string()).unwrap(), vec!["value"]);
        assert!(store.set(|_| {}).unwrap().is_empty());
    }

    #[test]
    fn recompute_is_explicit_and_repeatable() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let mut store = ContextStore::new(ctx()).with_computed("count", move |_: &mut Ctx| {
            counter.set(counter.get() + 1)
        });

        store.recompute_derived();
        store.recompute_derived();
        assert_eq!(calls.get(), 2);

        store.set(|_| {}).unwrap();
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn missing_watch_keys_are_reported() {
        let store = ContextStore::new(ctx())
            .with_watch("value")
            .with_watch("nope")
            .with_watch("options.missing");
        assert_eq!(
            store.missing_watch_keys().unwrap(),
            vec!["nope", "options.missing"]
        );
    }

    #[test]
    fn initial_tracks_the_last_seed() {
        let mut store = store();
        store.set(|c| c.value = "9".to_string()).unwrap();
        assert_eq!(store.initial().value, "5");
        assert_eq!(store.get().value, "9");
        assert_eq!(
            serde_json::to_value(store.initial()).unwrap()["value"],
            json!("5")
        );
    }
}
