use std::{collections::HashMap, sync::Arc};

type IdToIndex = HashMap<Arc<str>, usize>;

/// Entities of one type, in insertion order, with an id lookup.
#[derive(Debug, Clone)]
pub struct EntityTable<T> {
    ids: Vec<Arc<str>>,
    rows: Vec<T>,
    lookup: IdToIndex,
}

impl<T> Default for EntityTable<T> {
    fn default() -> Self {
        Self {
            ids: Vec::new(),
            rows: Vec::new(),
            lookup: HashMap::new(),
        }
    }
}

impl<T> EntityTable<T> {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lookup.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.lookup.get(id).map(|index| &self.rows[*index])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        self.lookup.get(id).map(|index| &mut self.rows[*index])
    }

    /// Inserts `row` under `id`, handing back the row it replaced.
    pub fn insert(&mut self, id: &str, row: T) -> Option<T> {
        if let Some(index) = self.lookup.get(id) {
            return Some(std::mem::replace(&mut self.rows[*index], row));
        }
        let id: Arc<str> = id.into();
        self.lookup.insert(id.clone(), self.rows.len());
        self.ids.push(id);
        self.rows.push(row);
        None
    }

    /// Removes the row with `id`. Later rows keep their relative order.
    pub fn remove(&mut self, id: &str) -> Option<T> {
        let index = self.lookup.remove(id)?;
        self.ids.remove(index);
        let row = self.rows.remove(index);
        for (offset, id) in self.ids[index..].iter().enumerate() {
            self.lookup.insert(id.clone(), index + offset);
        }
        Some(row)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(|id| id.as_ref())
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.rows.iter()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.ids.iter().map(|id| id.as_ref()).zip(self.rows.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_keeps_order_and_lookup() {
        let mut table = EntityTable::new();
        table.insert("a", 1);
        table.insert("b", 2);
        table.insert("c", 3);
        assert_eq!(table.remove("a"), Some(1));
        assert_eq!(table.ids().collect::<Vec<_>>(), ["b", "c"]);
        assert_eq!(table.get("c"), Some(&3));
        assert!(!table.contains("a"));
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut table = EntityTable::new();
        table.insert("a", 1);
        table.insert("b", 2);
        assert_eq!(table.insert("a", 10), Some(1));
        assert_eq!(table.values().copied().collect::<Vec<_>>(), [10, 2]);
    }
}
