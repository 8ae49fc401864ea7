//! Enumerated field values with display labels.

use crate::common::Value;
use indexmap::IndexMap;
use itertools::Itertools;
use std::fmt::{Debug, Display, Formatter};

/// One `(stored value, display label)` entry of a [`Choices`] registry.
#[derive(Clone, Debug, PartialEq)]
pub struct Choice<T = Value> {
    value: T,
    label: String,
}

impl<T> Choice<T> {
    /// Creates an entry whose stored value differs from its label.
    pub fn new(value: T, label: impl Into<String>) -> Self {
        Choice {
            value,
            label: label.into(),
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl<T: From<String>> Choice<T> {
    /// Creates an entry whose stored value is the label itself.
    pub fn labelled(label: impl Into<String>) -> Self {
        let label = label.into();
        Choice {
            value: T::from(label.clone()),
            label,
        }
    }
}

impl From<&str> for Choice<Value> {
    fn from(label: &str) -> Self {
        Choice::labelled(label)
    }
}

impl From<&str> for Choice<String> {
    fn from(label: &str) -> Self {
        Choice::labelled(label)
    }
}

impl<T, L: Into<String>> From<(T, L)> for Choice<T> {
    fn from((value, label): (T, L)) -> Self {
        Choice::new(value, label)
    }
}

/// Declarative set of allowed values for a model field.
///
/// Keeps the entries in declaration order (for populating a selection widget) and a
/// reverse map from label to stored value. When two entries share a label, the later
/// entry's value wins the lookup while both stay in the ordered list.
///
/// A `Choices` is immutable once built. Attaching one to a field declares the field as
/// enumerated even when it has no entries, see [`FieldMeta::has_choices`](crate::model::FieldMeta::has_choices).
///
/// ```rust
/// use ormhook::choices::Choices;
///
/// let status = Choices::new(vec![(0, "draft"), (1, "published")]);
/// assert_eq!(status.get("published"), Some(&1));
/// assert_eq!(status.get("archived"), None);
/// assert_eq!(status.to_string(), "draft, published");
/// ```
#[derive(Clone, PartialEq)]
pub struct Choices<T = Value> {
    choices: Vec<Choice<T>>,
    reversed: IndexMap<String, T>,
}

impl<T: Clone> Choices<T> {
    pub fn new<I, C>(choices: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Choice<T>>,
    {
        let choices: Vec<Choice<T>> = choices.into_iter().map(Into::into).collect();
        let mut reversed = IndexMap::with_capacity(choices.len());
        for choice in &choices {
            reversed.insert(choice.label.clone(), choice.value.clone());
        }
        Choices { choices, reversed }
    }

    pub fn empty() -> Self {
        Choices {
            choices: Vec::new(),
            reversed: IndexMap::new(),
        }
    }

    /// Stored value for `label`, or `None` when the label is unknown.
    pub fn get(&self, label: &str) -> Option<&T> {
        self.reversed.get(label)
    }

    /// Stored value for `label`, falling back to `default` when the label is unknown.
    pub fn get_or<'a>(&'a self, label: &str, default: &'a T) -> &'a T {
        self.get(label).unwrap_or(default)
    }

    /// Ordered `(stored value, label)` pairs exactly as declared.
    pub fn iter(&self) -> ChoicesIter<'_, T> {
        ChoicesIter {
            inner: self.choices.iter(),
        }
    }

    /// Distinct labels in first-declaration order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.reversed.keys().map(String::as_str)
    }

    pub fn contains_label(&self, label: &str) -> bool {
        self.reversed.contains_key(label)
    }

    pub fn len(&self) -> usize {
        self.choices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }
}

impl<T: Clone + PartialEq> Choices<T> {
    /// Label of the last entry declaring `value` (the one the reverse map resolves to).
    pub fn label_of(&self, value: &T) -> Option<&str> {
        self.reversed
            .iter()
            .rev()
            .find(|(_, v)| *v == value)
            .map(|(label, _)| label.as_str())
    }
}

impl<T: Clone> Default for Choices<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> Display for Choices<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reversed.keys().join(", "))
    }
}

impl<T> Debug for Choices<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Choices({})", self)
    }
}

pub struct ChoicesIter<'a, T> {
    inner: std::slice::Iter<'a, Choice<T>>,
}

impl<'a, T> Iterator for ChoicesIter<'a, T> {
    type Item = (&'a T, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|choice| (&choice.value, choice.label.as_str()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for ChoicesIter<'_, T> {}

impl<'a, T: Clone> IntoIterator for &'a Choices<T> {
    type Item = (&'a T, &'a str);
    type IntoIter = ChoicesIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Builds a `Choices<Value>` from bare labels and `value => label` entries.
///
/// ```rust
/// use ormhook::choices;
/// use ormhook::common::Value;
///
/// let status = choices!["draft", 1 => "published", 2 => "archived"];
/// assert_eq!(status.get("draft"), Some(&Value::from("draft")));
/// assert_eq!(status.get("archived"), Some(&Value::I64(2)));
/// ```
#[macro_export]
macro_rules! choices {
    () => {
        $crate::choices::Choices::<$crate::common::Value>::empty()
    };

    ($($items:tt)+) => {
        {
            let mut entries: Vec<$crate::choices::Choice<$crate::common::Value>> = Vec::new();
            $crate::__choice_entries!(entries; $($items)+);
            $crate::choices::Choices::new(entries)
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __choice_entries {
    ($entries:ident; ) => {};

    ($entries:ident; $value:expr => $label:expr $(, $($rest:tt)*)?) => {
        $entries.push($crate::choices::Choice::new($crate::common::Value::from($value), $label));
        $crate::__choice_entries!($entries; $($($rest)*)?);
    };

    ($entries:ident; $label:expr $(, $($rest:tt)*)?) => {
        $entries.push($crate::choices::Choice::labelled($label));
        $crate::__choice_entries!($entries; $($($rest)*)?);
    };
}
