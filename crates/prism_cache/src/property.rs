//! Untyped, named property bag used as the wire format of persisted results.
//!
//! Every name maps to a homogeneous array of one primitive type. Scalars are
//! stored as one-element arrays; composites such as rectangles are stored as
//! fixed-length arrays under a single name. Names are kept sorted so two
//! bags with the same contents encode to the same bytes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::CacheError;

/// The values stored under one property name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PropertyValues {
    /// Unsigned 64-bit integers.
    U64(Vec<u64>),
    /// Signed 32-bit integers.
    I32(Vec<i32>),
    /// Double-precision floats.
    F64(Vec<f64>),
    /// Booleans.
    Bool(Vec<bool>),
    /// Strings.
    String(Vec<String>),
}

impl PropertyValues {
    /// Number of values stored.
    pub fn len(&self) -> usize {
        match self {
            PropertyValues::U64(v) => v.len(),
            PropertyValues::I32(v) => v.len(),
            PropertyValues::F64(v) => v.len(),
            PropertyValues::Bool(v) => v.len(),
            PropertyValues::String(v) => v.len(),
        }
    }

    /// Returns `true` if no values are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Name of the element type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValues::U64(_) => u64::TYPE_NAME,
            PropertyValues::I32(_) => i32::TYPE_NAME,
            PropertyValues::F64(_) => f64::TYPE_NAME,
            PropertyValues::Bool(_) => bool::TYPE_NAME,
            PropertyValues::String(_) => String::TYPE_NAME,
        }
    }
}

/// A primitive type that can be stored in a [`PropertyBag`].
pub trait PropertyType: Clone + Sized {
    /// Name of the type, for diagnostics.
    const TYPE_NAME: &'static str;

    /// Wraps an array of values.
    fn wrap(values: Vec<Self>) -> PropertyValues;

    /// Borrows the array if it holds this type.
    fn as_slice_of(values: &PropertyValues) -> Option<&[Self]>;
}

macro_rules! property_type {
    ($ty:ty, $variant:ident, $name:literal) => {
        impl PropertyType for $ty {
            const TYPE_NAME: &'static str = $name;

            fn wrap(values: Vec<Self>) -> PropertyValues {
                PropertyValues::$variant(values)
            }

            fn as_slice_of(values: &PropertyValues) -> Option<&[Self]> {
                match values {
                    PropertyValues::$variant(v) => Some(v.as_slice()),
                    _ => None,
                }
            }
        }
    };
}

property_type!(u64, U64, "u64");
property_type!(i32, I32, "i32");
property_type!(f64, F64, "f64");
property_type!(bool, Bool, "bool");
property_type!(String, String, "string");

/// A named, multi-valued property store.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyBag {
    properties: BTreeMap<String, PropertyValues>,
}

impl PropertyBag {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a single value under `name`, replacing anything stored there.
    pub fn set_property<T: PropertyType>(&mut self, name: &str, value: T) {
        self.properties.insert(name.to_string(), T::wrap(vec![value]));
    }

    /// Stores an array of values under `name`, replacing anything stored
    /// there. An empty slice stores an empty array, which is distinct from an
    /// absent property.
    pub fn set_property_array<T: PropertyType>(&mut self, name: &str, values: &[T]) {
        self.properties.insert(name.to_string(), T::wrap(values.to_vec()));
    }

    /// Returns the value at `index` under `name`, or `None` if the property
    /// is absent, holds another type, or is too short.
    pub fn get_property<T: PropertyType>(&self, name: &str, index: usize) -> Option<T> {
        self.get_property_array::<T>(name)?.get(index).cloned()
    }

    /// Returns all values under `name`, or `None` if the property is absent
    /// or holds another type.
    pub fn get_property_array<T: PropertyType>(&self, name: &str) -> Option<&[T]> {
        T::as_slice_of(self.properties.get(name)?)
    }

    /// Returns the values under `name` if there are exactly `N` of them.
    pub fn get_property_n<T: PropertyType + Copy, const N: usize>(
        &self,
        name: &str,
    ) -> Option<[T; N]> {
        <[T; N]>::try_from(self.get_property_array::<T>(name)?).ok()
    }

    /// Like [`get_property`](Self::get_property) with `index == 0`, but
    /// reports why the read failed.
    pub fn require_property<T: PropertyType>(&self, name: &str) -> Result<T, CacheError> {
        let values = self.require_property_array::<T>(name)?;
        values
            .first()
            .cloned()
            .ok_or_else(|| CacheError::DeserializationFailed {
                property: name.to_string(),
                reason: "property holds no values".to_string(),
            })
    }

    /// Like [`get_property_array`](Self::get_property_array), but reports
    /// why the read failed.
    pub fn require_property_array<T: PropertyType>(&self, name: &str) -> Result<&[T], CacheError> {
        let values = self
            .properties
            .get(name)
            .ok_or_else(|| CacheError::missing(name))?;
        T::as_slice_of(values).ok_or_else(|| CacheError::DeserializationFailed {
            property: name.to_string(),
            reason: format!(
                "expected {} values, found {}",
                T::TYPE_NAME,
                values.type_name()
            ),
        })
    }

    /// Like [`get_property_n`](Self::get_property_n), but reports why the
    /// read failed.
    pub fn require_property_n<T: PropertyType + Copy, const N: usize>(
        &self,
        name: &str,
    ) -> Result<[T; N], CacheError> {
        let values = self.require_property_array::<T>(name)?;
        <[T; N]>::try_from(values).map_err(|_| CacheError::DeserializationFailed {
            property: name.to_string(),
            reason: format!("expected {N} values, found {}", values.len()),
        })
    }

    /// Returns `true` if a property named `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Number of named properties.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Returns `true` if the bag holds no properties.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Property names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }
}
