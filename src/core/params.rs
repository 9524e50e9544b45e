//! Request parameter bag
//!
//! Ordered name → value pairs. Lookups honour the bag's case mode, and
//! dotted paths (`order.customer.id`) walk nested objects null-safely.

use serde::{Deserialize, Serialize};

use super::error::{MapperError, Result};
use super::value::Value;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ParamBag {
    entries: Vec<(String, Value)>,
    #[serde(default)]
    ignore_case: bool,
}

impl ParamBag {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            ignore_case: false,
        }
    }

    #[must_use]
    pub const fn with_ignore_case(ignore_case: bool) -> Self {
        Self {
            entries: Vec::new(),
            ignore_case,
        }
    }

    /// Switch case mode for this bag and every nested object
    #[must_use]
    pub fn ignoring_case(mut self, ignore_case: bool) -> Self {
        self.set_ignore_case(ignore_case);
        self
    }

    fn set_ignore_case(&mut self, ignore_case: bool) {
        self.ignore_case = ignore_case;
        for (_, value) in &mut self.entries {
            if let Value::Object(bag) = value {
                bag.set_ignore_case(ignore_case);
            }
        }
    }

    #[must_use]
    pub const fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    fn matches(&self, key: &str, name: &str) -> bool {
        if self.ignore_case {
            key.eq_ignore_ascii_case(name)
        } else {
            key == name
        }
    }

    /// Insert or replace; replacing keeps the original position
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        let ignore_case = self.ignore_case;
        if let Some(slot) = self.entries.iter_mut().find(|(key, _)| {
            if ignore_case {
                key.eq_ignore_ascii_case(&name)
            } else {
                *key == name
            }
        }) {
            slot.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    /// Builder form of [`ParamBag::insert`]
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(key, _)| self.matches(key, name))
            .map(|(_, value)| value)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Resolve a dotted path; `None` when any segment is missing or not an object
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Bag holding the fields of a serializable request object
    ///
    /// `None`/unit serializes to an empty bag; anything that is not a struct or
    /// map is rejected.
    pub fn from_serialize<T: Serialize + ?Sized>(request: &T) -> Result<Self> {
        match Value::from_serialize(request)? {
            Value::Object(bag) => Ok(bag),
            Value::Null => Ok(Self::new()),
            other => Err(MapperError::Conversion {
                target: "request".to_string(),
                expected: "Object".to_string(),
                found: other.type_name().to_string(),
            }),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ParamBag {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bag = Self::new();
        for (key, value) in iter {
            bag.insert(key, value);
        }
        bag
    }
}
