//! The in-memory catalog: records (most recent first) and the category set.
//!
//! A `Catalog` is a plain value owned by the caller and passed by reference
//! into the import pool. It knows nothing about persistence; the
//! [`crate::library::Library`] facade saves it through a
//! [`crate::store::KeyValueStore`] after each mutation.

use crate::config::DEFAULT_CATEGORIES;
use crate::model::{CategoryFilter, RecipeRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    records: Vec<RecipeRecord>,
    categories: Vec<String>,
}

impl Catalog {
    /// Empty catalog with the built-in category list.
    pub fn with_default_categories() -> Self {
        Self {
            records: Vec::new(),
            categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Rebuild from persisted parts. Duplicate ids and categories are dropped,
    /// keeping the first occurrence.
    pub fn from_parts(records: Vec<RecipeRecord>, categories: Vec<String>) -> Self {
        let mut seen = HashSet::new();
        let records = records.into_iter().filter(|r| seen.insert(r.id)).collect();
        let mut catalog = Self {
            records,
            categories: Vec::new(),
        };
        for c in categories {
            catalog.add_category(&c);
        }
        catalog
    }

    pub fn records(&self) -> &[RecipeRecord] {
        &self.records
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&RecipeRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Insert at the front so the newest record is listed first.
    pub fn prepend(&mut self, record: RecipeRecord) {
        debug_assert!(self.get(record.id).is_none(), "duplicate record id");
        self.records.insert(0, record);
    }

    /// Add a category if it is new. Returns `true` when something was added.
    pub fn add_category(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.categories.iter().any(|c| c == name) {
            return false;
        }
        self.categories.push(name.to_string());
        true
    }

    /// Change a record's title and/or category.
    ///
    /// A blank title keeps the current one. Returns `false` if `id` is unknown.
    pub fn edit(&mut self, id: Uuid, title: Option<&str>, category: Option<&str>) -> bool {
        let Some(rec) = self.records.iter_mut().find(|r| r.id == id) else {
            return false;
        };
        if let Some(t) = title.map(str::trim).filter(|t| !t.is_empty()) {
            rec.title = t.to_string();
        }
        if let Some(c) = category.map(str::trim).filter(|c| !c.is_empty()) {
            rec.category = c.to_string();
        }
        rec.refresh_search_text();
        true
    }

    /// Detach the records with the given ids and hand them back.
    ///
    /// The caller owns the removed records and must release their documents.
    /// Categories are never pruned.
    pub fn remove(&mut self, ids: &[Uuid]) -> Vec<RecipeRecord> {
        let wanted: HashSet<Uuid> = ids.iter().copied().collect();
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.records)
            .into_iter()
            .partition(|r| wanted.contains(&r.id));
        self.records = kept;
        removed
    }

    /// Records passing the category filter and containing `term`.
    pub fn filter<'a>(&'a self, filter: &CategoryFilter, term: &str) -> Vec<&'a RecipeRecord> {
        self.records
            .iter()
            .filter(|r| r.matches(filter, term))
            .collect()
    }

    /// Records with the given ids, in catalog order.
    pub fn select(&self, ids: &[Uuid]) -> Vec<RecipeRecord> {
        let wanted: HashSet<Uuid> = ids.iter().copied().collect();
        self.records
            .iter()
            .filter(|r| wanted.contains(&r.id))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DocumentHandle;

    fn rec(title: &str, category: &str) -> RecipeRecord {
        RecipeRecord::new(title, category, DocumentHandle::new(), "", title)
    }

    #[test]
    fn prepend_keeps_newest_first() {
        let mut c = Catalog::default();
        c.prepend(rec("first", "General"));
        c.prepend(rec("second", "General"));
        assert_eq!(c.records()[0].title, "second");
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn add_category_trims_and_dedups() {
        let mut c = Catalog::with_default_categories();
        let n = c.categories().len();
        assert!(!c.add_category("Desserts"));
        assert!(!c.add_category("   "));
        assert!(c.add_category("  Brunch "));
        assert_eq!(c.categories().len(), n + 1);
        assert_eq!(c.categories().last().unwrap(), "Brunch");
    }

    #[test]
    fn edit_keeps_title_when_blank() {
        let mut c = Catalog::default();
        let r = rec("Pie", "General");
        let id = r.id;
        c.prepend(r);
        assert!(c.edit(id, Some("  "), Some("Desserts")));
        let r = c.get(id).unwrap();
        assert_eq!(r.title, "Pie");
        assert_eq!(r.category, "Desserts");
        assert!(!c.edit(Uuid::new_v4(), Some("x"), None));
    }

    #[test]
    fn edit_rebuilds_search_text() {
        let mut c = Catalog::default();
        let r = rec("Pie", "General");
        let id = r.id;
        c.prepend(r);
        c.edit(id, Some("Apple Pie"), None);
        assert_eq!(c.get(id).unwrap().searchable_text, "apple pie pie");
    }

    #[test]
    fn remove_leaves_categories() {
        let mut c = Catalog::with_default_categories();
        let r = rec("Stew", "Soups");
        let id = r.id;
        c.prepend(r);
        c.prepend(rec("Toast", "Breakfast"));
        let removed = c.remove(&[id]);
        assert_eq!(removed.len(), 1);
        assert_eq!(c.len(), 1);
        assert!(c.categories().iter().any(|x| x == "Soups"));
    }

    #[test]
    fn filter_matches_definition() {
        let mut c = Catalog::default();
        c.prepend(rec("Tomato Soup", "Soups"));
        c.prepend(rec("Pea Soup", "Soups"));
        c.prepend(rec("Tomato Salad", "Salads"));

        let cats = [
            CategoryFilter::All,
            CategoryFilter::Only("Soups".into()),
            CategoryFilter::Only("Salads".into()),
            CategoryFilter::Only("Missing".into()),
        ];
        for cat in &cats {
            for term in ["", "tomato", "SOUP", "zzz"] {
                let got: Vec<Uuid> = c.filter(cat, term).iter().map(|r| r.id).collect();
                let expected: Vec<Uuid> = c
                    .records()
                    .iter()
                    .filter(|r| {
                        let ok_cat = match cat {
                            CategoryFilter::All => true,
                            CategoryFilter::Only(x) => &r.category == x,
                        };
                        let t = term.to_lowercase();
                        ok_cat && (t.is_empty() || r.searchable_text.contains(&t))
                    })
                    .map(|r| r.id)
                    .collect();
                assert_eq!(got, expected, "cat={cat:?} term={term}");
            }
        }
        assert_eq!(c.filter(&cats[1], "tomato").len(), 1);
    }

    #[test]
    fn from_parts_drops_duplicates() {
        let r = rec("A", "General");
        let c = Catalog::from_parts(
            vec![r.clone(), r],
            vec!["General".into(), "General".into(), "Vegan".into()],
        );
        assert_eq!(c.len(), 1);
        assert_eq!(c.categories(), &["General".to_string(), "Vegan".to_string()]);
    }
}
