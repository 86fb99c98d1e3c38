//! Internal profile representations and their accessors.
//!
//! The host keeps a player's profile properties in one of three shapes,
//! depending on the server version. Each shape comes with free functions
//! that [`super::AccessorSet`] binds as plain function pointers.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use skinrelay_common::TEXTURES_PROPERTY_NAME;
use uuid::Uuid;

use crate::host::ProfileProperty;

/// The member held a different type than the accessor expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ShapeMismatch;

pub(crate) type ReadFn = fn(&dyn Any) -> Result<Option<ProfileProperty>, ShapeMismatch>;
pub(crate) type WriteFn = fn(&mut dyn Any, ProfileProperty) -> Result<(), ShapeMismatch>;
pub(crate) type BlankFn = fn(Uuid, &str) -> Box<dyn Any + Send>;

/// Profile properties as a multimap keyed by property name.
#[derive(Debug, Clone, Default)]
pub struct PropertyMultimap {
    pub uuid: Uuid,
    pub name: String,
    entries: BTreeMap<String, Vec<ProfileProperty>>,
}

impl PropertyMultimap {
    pub fn new(uuid: Uuid, name: impl Into<String>) -> Self {
        Self {
            uuid,
            name: name.into(),
            entries: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> &[ProfileProperty] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn remove_all(&mut self, key: &str) -> Vec<ProfileProperty> {
        self.entries.remove(key).unwrap_or_default()
    }

    pub fn put(&mut self, property: ProfileProperty) {
        self.entries
            .entry(property.name.clone())
            .or_default()
            .push(property);
    }
}

/// Profile properties as a mutable list.
#[derive(Debug, Clone, Default)]
pub struct PropertyList {
    pub uuid: Uuid,
    pub name: String,
    pub properties: Vec<ProfileProperty>,
}

/// An immutable profile. Changing a property means swapping in a new record.
#[derive(Debug, Clone)]
pub struct ProfileRecord {
    uuid: Uuid,
    name: String,
    properties: Arc<[ProfileProperty]>,
}

impl ProfileRecord {
    pub fn new(uuid: Uuid, name: impl Into<String>, properties: Vec<ProfileProperty>) -> Self {
        Self {
            uuid,
            name: name.into(),
            properties: properties.into(),
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> &[ProfileProperty] {
        &self.properties
    }

    /// A copy with every property named like `property` replaced by it.
    pub fn with_property(&self, property: ProfileProperty) -> Self {
        let mut properties: Vec<ProfileProperty> = self
            .properties
            .iter()
            .filter(|p| p.name != property.name)
            .cloned()
            .collect();
        properties.push(property);
        Self::new(self.uuid, self.name.clone(), properties)
    }
}

// multimap

pub(crate) fn multimap_read(member: &dyn Any) -> Result<Option<ProfileProperty>, ShapeMismatch> {
    let map = member.downcast_ref::<PropertyMultimap>().ok_or(ShapeMismatch)?;
    Ok(map.get(TEXTURES_PROPERTY_NAME).first().cloned())
}

pub(crate) fn multimap_write(
    member: &mut dyn Any,
    property: ProfileProperty,
) -> Result<(), ShapeMismatch> {
    let map = member.downcast_mut::<PropertyMultimap>().ok_or(ShapeMismatch)?;
    map.remove_all(&property.name);
    map.put(property);
    Ok(())
}

pub(crate) fn multimap_blank(uuid: Uuid, name: &str) -> Box<dyn Any + Send> {
    Box::new(PropertyMultimap::new(uuid, name))
}

// list

pub(crate) fn list_read(member: &dyn Any) -> Result<Option<ProfileProperty>, ShapeMismatch> {
    let list = member.downcast_ref::<PropertyList>().ok_or(ShapeMismatch)?;
    Ok(list
        .properties
        .iter()
        .find(|p| p.name == TEXTURES_PROPERTY_NAME)
        .cloned())
}

pub(crate) fn list_write(member: &mut dyn Any, property: ProfileProperty) -> Result<(), ShapeMismatch> {
    let list = member.downcast_mut::<PropertyList>().ok_or(ShapeMismatch)?;
    list.properties.retain(|p| p.name != property.name);
    list.properties.push(property);
    Ok(())
}

pub(crate) fn list_blank(uuid: Uuid, name: &str) -> Box<dyn Any + Send> {
    Box::new(PropertyList {
        uuid,
        name: name.to_string(),
        properties: Vec::new(),
    })
}

// record

pub(crate) fn record_read(member: &dyn Any) -> Result<Option<ProfileProperty>, ShapeMismatch> {
    let record = member.downcast_ref::<ProfileRecord>().ok_or(ShapeMismatch)?;
    Ok(record
        .properties()
        .iter()
        .find(|p| p.name == TEXTURES_PROPERTY_NAME)
        .cloned())
}

pub(crate) fn record_write(member: &mut dyn Any, property: ProfileProperty) -> Result<(), ShapeMismatch> {
    let record = member.downcast_mut::<ProfileRecord>().ok_or(ShapeMismatch)?;
    *record = record.with_property(property);
    Ok(())
}

pub(crate) fn record_blank(uuid: Uuid, name: &str) -> Box<dyn Any + Send> {
    Box::new(ProfileRecord::new(uuid, name, Vec::new()))
}
