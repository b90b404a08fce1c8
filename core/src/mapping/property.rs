//! Mapped properties

use serde::{Deserialize, Serialize};

use super::{Metadata, Value};
use crate::Result;

/// When a property's value is generated by the database
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyGeneration {
    #[default]
    Never,
    Insert,
    Always,
}

/// A named attribute of an entity, component or join
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub name: String,
    pub value: Value,
    #[serde(default = "default_true")]
    pub insertable: bool,
    #[serde(default = "default_true")]
    pub updateable: bool,
    #[serde(default = "default_true")]
    pub selectable: bool,
    #[serde(default)]
    pub lazy: bool,
    #[serde(default)]
    pub lazy_group: Option<String>,
    #[serde(default = "default_true")]
    pub optional: bool,
    #[serde(default)]
    pub cascade: Option<String>,
    #[serde(default)]
    pub natural_id: bool,
    #[serde(default = "default_true")]
    pub optimistic_locked: bool,
    #[serde(default)]
    pub generation: PropertyGeneration,
}

const fn default_true() -> bool {
    true
}

impl Property {
    /// Insertable, updateable, non-lazy property
    #[must_use]
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
            insertable: true,
            updateable: true,
            selectable: true,
            lazy: false,
            lazy_group: None,
            optional: true,
            cascade: None,
            natural_id: false,
            optimistic_locked: true,
            generation: PropertyGeneration::Never,
        }
    }

    /// Whether the property loads lazily
    ///
    /// A to-one counts as lazy only when it is lazy and also unwraps its
    /// proxy ("no-proxy"); a plain proxied to-one is fetched eagerly as far
    /// as field interception is concerned.
    #[must_use]
    pub fn is_lazy(&self) -> bool {
        match &self.value {
            Value::ToOne(to_one) => to_one.lazy && to_one.unwrap_proxy,
            _ => self.lazy,
        }
    }

    /// Declared number of columns
    #[inline]
    #[must_use]
    pub fn column_span(&self) -> usize {
        self.value.column_span()
    }

    /// Whether the column span matches the type
    pub fn is_valid(&self, metadata: &Metadata) -> Result<bool> {
        self.value.is_valid(metadata)
    }

    /// Whether the property writes its columns at all
    #[inline]
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.insertable || self.updateable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{SimpleValue, ToOne};

    #[test]
    fn test_to_one_laziness_needs_unwrap_proxy() {
        let mut to_one = ToOne::many_to_one(SimpleValue::new(None), "Customer");
        to_one.lazy = true;
        let mut property = Property::new("customer", Value::ToOne(to_one.clone()));
        property.lazy = true;
        assert!(!property.is_lazy());

        to_one.unwrap_proxy = true;
        property.value = Value::ToOne(to_one);
        assert!(property.is_lazy());
    }

    #[test]
    fn test_basic_laziness_follows_flag() {
        let mut property = Property::new("notes", Value::Basic(SimpleValue::new(None)));
        assert!(!property.is_lazy());
        property.lazy = true;
        assert!(property.is_lazy());
    }
}
