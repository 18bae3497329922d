//! Structs relating to the property index (name resolution for particle properties)

use std::collections::HashMap;

use slotmap::SlotMap;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

slotmap::new_key_type! {
    /// Key of a property in the property index
    pub struct PropertyID;
}

/* -- General index structure -- */

/// Combination of a slotmap with a hashmap for easy name resolution
#[derive(Debug)]
pub(crate) struct Index<ID: slotmap::Key, T> {
    /// Internal registry for holding indexed elements of type T
    elements: SlotMap<ID, T>,
    /// Fast lookup table for names
    name_table: HashMap<String, ID>
}

impl<ID: slotmap::Key, T> Index<ID,T> {
    pub fn new() -> Self {
        Self {
            elements: SlotMap::with_key(),
            name_table: HashMap::new()
        }
    }

    /// Insert an element under a new name
    ///
    /// Returns the element back if the name is already taken (the index is
    /// left untouched in that case).
    pub fn insert(&mut self, element: T, name: String) -> Result<ID, T> {
        if self.name_table.contains_key(&name) {
            return Err(element);
        }
        let key = self.elements.insert(element);
        self.name_table.insert(name, key);
        Ok(key)
    }

    pub fn get_with_name(&self, name: &str) -> Option<(ID, &T)> {
        let key = *self.name_table.get(name)?;
        self.elements.get(key).map(|element| (key, element))
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.name_table.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item=(ID, &T)> {
        self.elements.iter()
    }

    pub fn names(&self) -> impl Iterator<Item=&str> {
        self.name_table.keys().map(|name| name.as_str())
    }
}

/* -- Standard properties -- */

/// Names of the properties the integrator relies on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Property {
    Position,
    Velocity,
    Force,
    /// Optional per-particle mass (unit mass is assumed if absent)
    Mass
}

impl Property {
    pub fn kind(&self) -> PropertyKind {
        match self {
            Property::Position | Property::Velocity | Property::Force => PropertyKind::Vector,
            Property::Mass => PropertyKind::Scalar
        }
    }
}

/// Shape of the per-particle data of a property
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum PropertyKind {
    /// One `Real3D` per particle
    Vector,
    /// One `f64` per particle
    Scalar
}

impl PropertyKind {
    /// Number of doubles stored per particle
    pub fn width(&self) -> usize {
        match self {
            PropertyKind::Vector => 3,
            PropertyKind::Scalar => 1
        }
    }
}

#[cfg(test)]
mod test {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_property_names() {
        let names = Property::iter().map(|p| p.to_string()).collect::<Vec<_>>();
        assert_eq!(names, vec!["position", "velocity", "force", "mass"]);
        assert_eq!(Property::from_str("velocity").unwrap(), Property::Velocity);
        assert_eq!(Property::Mass.as_ref(), "mass");
    }

    #[test]
    fn test_index_rejects_duplicates() {
        let mut index: Index<PropertyID, usize> = Index::new();
        let key = index.insert(1, "a".into()).unwrap();
        assert_eq!(index.insert(2, "a".into()), Err(2));
        assert_eq!(index.get_with_name("a"), Some((key, &1)));
        assert!(index.get_with_name("b").is_none());
    }
}
