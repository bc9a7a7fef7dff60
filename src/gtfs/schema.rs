use std::{collections::HashMap, fmt, marker::PhantomData, sync::Arc};

use thiserror::Error;

use crate::{
    gtfs::Row,
    problems::Reporter,
    schedule::{
        Schedule,
        entities::{
            Agency, Entity, FareAttribute, FareRule, FeedInfo, Frequency, Route, RowOutcome,
            ServiceDate, ServicePeriod, Shape, ShapePoint, Stop, StopTime, Transfer, Trip,
        },
    },
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Mapping {0} already exists")]
    DuplicateMapping(String),
    #[error("Mapping {0} does not exist")]
    NonexistentMapping(String),
    #[error("Mapping is missing the required field {missing_field}")]
    InvalidMapping { missing_field: &'static str },
    #[error("File {0} maps to more than one class")]
    NonStandardMapping(String),
    #[error("Mapping refers to the unknown class {0}")]
    UnknownClass(String),
}

/// Column sets a file is read with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Columns {
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
    /// Deprecated column names with the column that replaces them, if any.
    pub deprecated: &'static [(&'static str, Option<&'static str>)],
}

impl Columns {
    /// Required followed by optional columns, the order files are written in.
    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.required.iter().chain(self.optional.iter()).copied()
    }

    pub fn is_field(&self, column: &str) -> bool {
        self.fields().any(|field| field == column)
    }

    pub fn is_known(&self, column: &str) -> bool {
        self.is_field(column) || self.deprecated_replacement(column).is_some()
    }

    /// `Some(replacement)` when `column` is deprecated.
    pub fn deprecated_replacement(&self, column: &str) -> Option<Option<&'static str>> {
        self.deprecated
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, replacement)| *replacement)
    }
}

/// Turns rows of a file into schedule entities.
///
/// The built-in entity types are wrapped by [`Builtin`]; extensions can
/// register their own implementation under a new or an existing name.
pub trait EntityClass: Send + Sync {
    fn name(&self) -> &str;
    fn columns(&self) -> Columns;
    fn load_row(&self, row: &Row, schedule: &mut Schedule, reporter: &mut Reporter);

    /// Built-in classes of calendar.txt, calendar_dates.txt and shapes.txt
    /// are merged by the loader before anything is added. Rows of any other
    /// class go through [`EntityClass::load_row`] one by one.
    fn is_builtin(&self) -> bool {
        false
    }
}

pub struct Builtin<T>(PhantomData<fn() -> T>);

impl<T> Default for Builtin<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T: Entity> EntityClass for Builtin<T> {
    fn name(&self) -> &str {
        T::NAME
    }

    fn columns(&self) -> Columns {
        T::COLUMNS
    }

    fn load_row(&self, row: &Row, schedule: &mut Schedule, reporter: &mut Reporter) {
        if let RowOutcome::Accepted(entity) = T::from_row(row, reporter) {
            schedule.add(entity, reporter);
        }
    }

    fn is_builtin(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMapping {
    pub classes: Vec<String>,
    pub required: bool,
    /// Position in the generic loading pass, `None` for files loaded by a
    /// dedicated pass.
    pub loading_order: Option<u32>,
}

/// A possibly partial [`FileMapping`], used to add or update a mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingFields {
    pub classes: Option<Vec<String>>,
    pub required: Option<bool>,
    pub loading_order: Option<Option<u32>>,
}

impl From<FileMapping> for MappingFields {
    fn from(mapping: FileMapping) -> Self {
        Self {
            classes: Some(mapping.classes),
            required: Some(mapping.required),
            loading_order: Some(mapping.loading_order),
        }
    }
}

/// Maps file names to the classes that load them and class names to their
/// implementation.
///
/// A registry is a plain value: build one with [`Registry::standard`], adjust
/// it and hand it to the loader.
#[derive(Clone)]
pub struct Registry {
    files: HashMap<String, FileMapping>,
    classes: HashMap<String, Arc<dyn EntityClass>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut classes: Vec<&String> = self.classes.keys().collect();
        classes.sort();
        f.debug_struct("Registry")
            .field("files", &self.files)
            .field("classes", &classes)
            .finish()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}

impl Registry {
    /// A registry without any file or class.
    pub fn empty() -> Self {
        Self {
            files: HashMap::new(),
            classes: HashMap::new(),
        }
    }

    /// The standard GTFS file set.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.insert_class::<Agency>();
        registry.insert_class::<ServicePeriod>();
        registry.insert_class::<ServiceDate>();
        registry.insert_class::<FareAttribute>();
        registry.insert_class::<FareRule>();
        registry.insert_class::<Frequency>();
        registry.insert_class::<FeedInfo>();
        registry.insert_class::<Shape>();
        registry.insert_class::<ShapePoint>();
        registry.insert_class::<Stop>();
        registry.insert_class::<StopTime>();
        registry.insert_class::<Route>();
        registry.insert_class::<Transfer>();
        registry.insert_class::<Trip>();

        let standard: [(&str, bool, Option<u32>, &[&str]); 13] = [
            ("agency.txt", true, Some(0), &["Agency"]),
            ("calendar.txt", false, None, &["ServicePeriod"]),
            ("calendar_dates.txt", false, None, &["ServiceDate"]),
            ("fare_attributes.txt", false, Some(50), &["FareAttribute"]),
            ("fare_rules.txt", false, Some(60), &["FareRule"]),
            ("feed_info.txt", false, Some(100), &["FeedInfo"]),
            ("frequencies.txt", false, Some(70), &["Frequency"]),
            ("shapes.txt", false, None, &["Shape", "ShapePoint"]),
            ("stops.txt", true, Some(10), &["Stop"]),
            ("stop_times.txt", true, None, &["StopTime"]),
            ("routes.txt", true, Some(20), &["Route"]),
            ("transfers.txt", false, Some(30), &["Transfer"]),
            ("trips.txt", true, Some(40), &["Trip"]),
        ];
        for (file_name, required, loading_order, classes) in standard {
            registry.files.insert(
                file_name.to_string(),
                FileMapping {
                    classes: classes.iter().map(|class| class.to_string()).collect(),
                    required,
                    loading_order,
                },
            );
        }
        registry
    }

    fn insert_class<T: Entity + 'static>(&mut self) {
        self.classes
            .insert(T::NAME.to_string(), Arc::new(Builtin::<T>::default()));
    }

    pub fn mapping(&self, file_name: &str) -> Option<&FileMapping> {
        self.files.get(file_name)
    }

    /// Adds a file mapping. Every field of `mapping` must be set.
    pub fn add_mapping(
        &mut self,
        file_name: &str,
        mapping: impl Into<MappingFields>,
    ) -> Result<(), RegistryError> {
        let mapping = mapping.into();
        let classes = mapping.classes.ok_or(RegistryError::InvalidMapping {
            missing_field: "classes",
        })?;
        let required = mapping.required.ok_or(RegistryError::InvalidMapping {
            missing_field: "required",
        })?;
        let loading_order = mapping.loading_order.ok_or(RegistryError::InvalidMapping {
            missing_field: "loading_order",
        })?;
        if self.files.contains_key(file_name) {
            return Err(RegistryError::DuplicateMapping(file_name.to_string()));
        }
        self.files.insert(
            file_name.to_string(),
            FileMapping {
                classes,
                required,
                loading_order,
            },
        );
        Ok(())
    }

    /// Overwrites the fields set in `update`.
    pub fn update_mapping(
        &mut self,
        file_name: &str,
        update: MappingFields,
    ) -> Result<(), RegistryError> {
        let mapping = self
            .files
            .get_mut(file_name)
            .ok_or_else(|| RegistryError::NonexistentMapping(file_name.to_string()))?;
        if let Some(classes) = update.classes {
            mapping.classes = classes;
        }
        if let Some(required) = update.required {
            mapping.required = required;
        }
        if let Some(loading_order) = update.loading_order {
            mapping.loading_order = loading_order;
        }
        Ok(())
    }

    /// Removing an unknown file is a no-op.
    pub fn remove_mapping(&mut self, file_name: &str) {
        self.files.remove(file_name);
    }

    pub fn add_class(
        &mut self,
        name: &str,
        class: Arc<dyn EntityClass>,
    ) -> Result<(), RegistryError> {
        if self.classes.contains_key(name) {
            return Err(RegistryError::DuplicateMapping(name.to_string()));
        }
        self.classes.insert(name.to_string(), class);
        Ok(())
    }

    pub fn update_class(
        &mut self,
        name: &str,
        class: Arc<dyn EntityClass>,
    ) -> Result<(), RegistryError> {
        let slot = self
            .classes
            .get_mut(name)
            .ok_or_else(|| RegistryError::NonexistentMapping(name.to_string()))?;
        *slot = class;
        Ok(())
    }

    pub fn remove_class(&mut self, name: &str) -> Result<(), RegistryError> {
        self.classes
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| RegistryError::NonexistentMapping(name.to_string()))
    }

    pub fn class(&self, name: &str) -> Option<&Arc<dyn EntityClass>> {
        self.classes.get(name)
    }

    /// The single class loading `file_name`, `None` for unknown files.
    pub fn class_for_file(
        &self,
        file_name: &str,
    ) -> Result<Option<&Arc<dyn EntityClass>>, RegistryError> {
        let Some(mapping) = self.files.get(file_name) else {
            return Ok(None);
        };
        let [class_name] = mapping.classes.as_slice() else {
            return Err(RegistryError::NonStandardMapping(file_name.to_string()));
        };
        self.classes
            .get(class_name)
            .map(Some)
            .ok_or_else(|| RegistryError::UnknownClass(class_name.clone()))
    }

    /// Files of the generic loading pass, in loading order.
    pub fn loading_order(&self) -> Vec<&str> {
        let mut ordered: Vec<(u32, &str)> = self
            .files
            .iter()
            .filter_map(|(name, mapping)| Some((mapping.loading_order?, name.as_str())))
            .collect();
        ordered.sort();
        ordered.into_iter().map(|(_, name)| name).collect()
    }

    /// Unknown files are never required.
    pub fn is_required(&self, file_name: &str) -> bool {
        self.files
            .get(file_name)
            .is_some_and(|mapping| mapping.required)
    }

    pub fn is_known(&self, file_name: &str) -> bool {
        self.files.contains_key(file_name)
    }

    pub fn known_files(&self) -> Vec<&str> {
        let mut files: Vec<&str> = self.files.keys().map(String::as_str).collect();
        files.sort();
        files
    }

    pub fn required_files(&self) -> Vec<&str> {
        let mut files: Vec<&str> = self
            .files
            .iter()
            .filter(|(_, mapping)| mapping.required)
            .map(|(name, _)| name.as_str())
            .collect();
        files.sort();
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_loading_order() {
        let registry = Registry::standard();
        assert_eq!(
            registry.loading_order(),
            vec![
                "agency.txt",
                "stops.txt",
                "routes.txt",
                "transfers.txt",
                "trips.txt",
                "fare_attributes.txt",
                "fare_rules.txt",
                "frequencies.txt",
                "feed_info.txt",
            ]
        );
    }

    #[test]
    fn shapes_are_non_standard() {
        let registry = Registry::standard();
        assert_eq!(
            registry.class_for_file("shapes.txt").err(),
            Some(RegistryError::NonStandardMapping("shapes.txt".into()))
        );
        assert!(registry.class_for_file("nope.txt").unwrap().is_none());
        let stops = registry.class_for_file("stops.txt").unwrap().unwrap();
        assert_eq!(stops.name(), "Stop");
    }

    #[test]
    fn partial_mapping_is_rejected() {
        let mut registry = Registry::standard();
        let partial = MappingFields {
            classes: Some(vec!["Stop".into()]),
            required: Some(false),
            loading_order: None,
        };
        assert_eq!(
            registry.add_mapping("extra_stops.txt", partial),
            Err(RegistryError::InvalidMapping {
                missing_field: "loading_order"
            })
        );
    }
}
