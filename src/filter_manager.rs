//! Filter management: listing, template updates, regex replacement and commit
use crate::element::FilterElement;
use crate::error::{GmailError, Result};
use crate::filter_store::FilterStore;
use crate::models::{CriteriaField, GmailFilter};
use crate::parser::parse;
use crate::propagation::plan_meta_group_updates;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// A planned change to one filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterUpdate {
    pub original: GmailFilter,
    pub updated: GmailFilter,
}

impl FilterUpdate {
    pub fn id(&self) -> &str {
        &self.original.id
    }

    /// Criteria fields whose value differs between the two versions
    pub fn changed_fields(&self) -> Vec<CriteriaField> {
        CriteriaField::ALL
            .iter()
            .copied()
            .filter(|field| {
                field.get(&self.original.criteria) != field.get(&self.updated.criteria)
            })
            .collect()
    }
}

/// Manages the filters of a [`FilterStore`]
pub struct FilterManager {
    store: Box<dyn FilterStore>,
}

impl FilterManager {
    pub fn new(store: Box<dyn FilterStore>) -> Self {
        Self { store }
    }

    /// Filters whose criteria summary matches `pattern`, or all filters
    pub fn list_filters(&self, pattern: Option<&Regex>) -> Result<Vec<GmailFilter>> {
        let filters = self.store.list_filters()?;
        let total = filters.len();
        let matching: Vec<GmailFilter> = match pattern {
            Some(pattern) => filters
                .into_iter()
                .filter(|filter| pattern.is_match(&filter.criteria.summary()))
                .collect(),
            None => filters,
        };
        debug!("{} of {} filters match", matching.len(), total);
        Ok(matching)
    }

    /// Propagate primary templates through the queries of every stored filter
    ///
    /// # Algorithm:
    /// 1. Parse every non-empty query; any parse error aborts the whole run
    /// 2. Plan the template rewrite over the whole batch
    /// 3. Turn each rewritten tree back into a query on a copy of its filter
    ///
    /// Nothing is written; pass the result to [`FilterManager::apply_updates`].
    pub fn plan_template_updates(&self) -> Result<Vec<FilterUpdate>> {
        let filters = self.store.list_filters()?;

        let mut trees: BTreeMap<String, FilterElement> = BTreeMap::new();
        for filter in &filters {
            let query = match filter.criteria.query.as_deref() {
                Some(query) if !query.is_empty() => query,
                _ => continue,
            };
            let tree = parse(query).map_err(|source| GmailError::QueryParse {
                filter_id: filter.id.clone(),
                source,
            })?;
            if trees.insert(filter.id.clone(), tree).is_some() {
                return Err(GmailError::FilterError(format!(
                    "Duplicate filter id {}",
                    filter.id
                )));
            }
        }
        info!("Parsed queries of {} of {} filters", trees.len(), filters.len());

        let mut rewritten: HashMap<String, FilterElement> =
            plan_meta_group_updates(&trees)?.into_iter().collect();

        // Keep the store's order for display
        let updates: Vec<FilterUpdate> = filters
            .into_iter()
            .filter_map(|original| {
                let tree = rewritten.remove(&original.id)?;
                let mut updated = original.clone();
                updated.criteria.query = Some(tree.render());
                Some(FilterUpdate { original, updated })
            })
            .collect();

        info!("{} filters need template updates", updates.len());
        Ok(updates)
    }

    /// Regex substitution on one criteria field of every matching filter
    ///
    /// `replacement` may refer to capture groups as `$1` or `${name}`. Unset
    /// fields match as the empty string, and a substitution producing an empty
    /// string clears the field.
    pub fn plan_replacements(
        &self,
        field: CriteriaField,
        pattern: &Regex,
        replacement: &str,
    ) -> Result<Vec<FilterUpdate>> {
        let filters = self.store.list_filters()?;

        let mut updates = Vec::new();
        for original in filters {
            let current = field.get(&original.criteria).unwrap_or_default();
            if !pattern.is_match(current) {
                continue;
            }
            let replaced = pattern.replace_all(current, replacement).into_owned();
            if replaced == current {
                debug!("Filter {}: {} matches but is unchanged", original.id, field);
                continue;
            }

            let mut updated = original.clone();
            field.set(&mut updated.criteria, replaced);
            updates.push(FilterUpdate { original, updated });
        }

        info!("{} filters matched for replacement in {}", updates.len(), field);
        Ok(updates)
    }

    /// Write all updates to the store, then persist them at once
    pub fn apply_updates(&mut self, updates: &[FilterUpdate]) -> Result<usize> {
        if updates.is_empty() {
            warn!("No filter updates to apply");
            return Ok(0);
        }

        for update in updates {
            self.store.update_filter(&update.updated)?;
            debug!("Staged update of filter {}", update.id());
        }
        self.store.flush()?;

        info!("Applied {} filter updates", updates.len());
        Ok(updates.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TemplateError;
    use crate::models::FilterCriteria;

    mockall::mock! {
        pub TestFilterStore {}

        impl FilterStore for TestFilterStore {
            fn list_filters(&self) -> Result<Vec<GmailFilter>>;
            fn update_filter(&mut self, filter: &GmailFilter) -> Result<()>;
            fn flush(&mut self) -> Result<()>;
        }
    }

    fn query_filter(id: &str, query: &str) -> GmailFilter {
        GmailFilter {
            id: id.to_string(),
            criteria: FilterCriteria {
                query: Some(query.to_string()),
                ..Default::default()
            },
            action: Default::default(),
        }
    }

    fn manager_with(filters: Vec<GmailFilter>) -> FilterManager {
        let mut store = MockTestFilterStore::new();
        store
            .expect_list_filters()
            .returning(move || Ok(filters.clone()));
        store.expect_update_filter().never();
        store.expect_flush().never();
        FilterManager::new(Box::new(store))
    }

    #[test]
    fn test_list_filters_with_pattern() {
        let mut from_filter = query_filter("2", "x");
        from_filter.criteria.query = None;
        from_filter.criteria.from = Some("news@example.com".to_string());
        let manager = manager_with(vec![query_filter("1", "label:work"), from_filter]);

        assert_eq!(manager.list_filters(None).unwrap().len(), 2);

        let pattern = Regex::new("example\\.com").unwrap();
        let matching = manager.list_filters(Some(&pattern)).unwrap();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].id, "2");

        // Field names are part of the summary
        let pattern = Regex::new("^query: label").unwrap();
        assert_eq!(manager.list_filters(Some(&pattern)).unwrap()[0].id, "1");
    }

    #[test]
    fn test_plan_template_updates() {
        let mut unrelated = query_filter("0", "");
        unrelated.criteria.query = None;
        let manager = manager_with(vec![
            query_filter("b", "bla {(M3TA foo) old} x"),
            unrelated,
            query_filter("a", "{(M3TAP foo) new}"),
            query_filter("c", "{(M3TA foo) new}"),
        ]);

        let updates = manager.plan_template_updates().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].id(), "b");
        assert_eq!(
            updates[0].updated.criteria.query.as_deref(),
            Some("bla {(M3TA foo) new} x")
        );
        assert_eq!(updates[0].changed_fields(), vec![CriteriaField::Query]);
    }

    #[test]
    fn test_plan_template_updates_keeps_store_order() {
        let manager = manager_with(vec![
            query_filter("z", "{(M3TA foo) 1}"),
            query_filter("m", "{(M3TAP foo) new}"),
            query_filter("a", "{(M3TA foo) 2}"),
        ]);
        let ids: Vec<String> = manager
            .plan_template_updates()
            .unwrap()
            .iter()
            .map(|u| u.id().to_string())
            .collect();
        assert_eq!(ids, vec!["z", "a"]);
    }

    #[test]
    fn test_plan_template_updates_parse_error() {
        let manager = manager_with(vec![
            query_filter("ok", "{(M3TAP foo) new}"),
            query_filter("bad", "{(M3TA foo) old"),
        ]);
        match manager.plan_template_updates() {
            Err(GmailError::QueryParse { filter_id, .. }) => assert_eq!(filter_id, "bad"),
            other => panic!("expected QueryParse, got {:?}", other),
        }
    }

    #[test]
    fn test_plan_template_updates_template_error() {
        let manager = manager_with(vec![
            query_filter("1", "{(M3TAP foo) new}"),
            query_filter("2", "{(M3TAP foo) other}"),
        ]);
        let err = manager.plan_template_updates().unwrap_err();
        assert!(err.is_filter_content_error());
        assert!(matches!(
            err,
            GmailError::Template(TemplateError::PrimaryKeyCollision { .. })
        ));
    }

    #[test]
    fn test_plan_replacements() {
        let mut subject_filter = query_filter("3", "x");
        subject_filter.criteria.subject = Some("weekly report".to_string());
        let manager = manager_with(vec![
            query_filter("1", "from:(alice@old.com OR bob@old.com)"),
            query_filter("2", "from:carol@new.com"),
            subject_filter,
        ]);

        let pattern = Regex::new(r"(\w+)@old\.com").unwrap();
        let updates = manager
            .plan_replacements(CriteriaField::Query, &pattern, "$1@new.com")
            .unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].id(), "1");
        assert_eq!(
            updates[0].updated.criteria.query.as_deref(),
            Some("from:(alice@new.com OR bob@new.com)")
        );

        let pattern = Regex::new("weekly").unwrap();
        let updates = manager
            .plan_replacements(CriteriaField::Subject, &pattern, "monthly")
            .unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].changed_fields(), vec![CriteriaField::Subject]);
    }

    #[test]
    fn test_plan_replacements_sets_and_clears_fields() {
        let manager = manager_with(vec![query_filter("1", "x")]);

        // Unset field matches as empty
        let pattern = Regex::new("^$").unwrap();
        let updates = manager
            .plan_replacements(CriteriaField::To, &pattern, "me@example.com")
            .unwrap();
        assert_eq!(updates[0].updated.criteria.to.as_deref(), Some("me@example.com"));

        let pattern = Regex::new(".*").unwrap();
        let updates = manager
            .plan_replacements(CriteriaField::Query, &pattern, "")
            .unwrap();
        assert_eq!(updates[0].updated.criteria.query, None);
    }

    #[test]
    fn test_apply_updates_flushes_once() {
        let mut store = MockTestFilterStore::new();
        store
            .expect_update_filter()
            .times(2)
            .returning(|_| Ok(()));
        store.expect_flush().times(1).returning(|| Ok(()));

        let mut manager = FilterManager::new(Box::new(store));
        let updates = vec![
            FilterUpdate {
                original: query_filter("1", "a"),
                updated: query_filter("1", "b"),
            },
            FilterUpdate {
                original: query_filter("2", "a"),
                updated: query_filter("2", "b"),
            },
        ];
        assert_eq!(manager.apply_updates(&updates).unwrap(), 2);
    }

    #[test]
    fn test_apply_updates_stops_before_flush_on_error() {
        let mut store = MockTestFilterStore::new();
        store
            .expect_update_filter()
            .times(1)
            .returning(|f| Err(GmailError::FilterError(format!("No filter with id {}", f.id))));
        store.expect_flush().never();

        let mut manager = FilterManager::new(Box::new(store));
        let updates = vec![FilterUpdate {
            original: query_filter("1", "a"),
            updated: query_filter("1", "b"),
        }];
        assert!(manager.apply_updates(&updates).is_err());
    }

    #[test]
    fn test_apply_no_updates() {
        let mut store = MockTestFilterStore::new();
        store.expect_flush().never();
        let mut manager = FilterManager::new(Box::new(store));
        assert_eq!(manager.apply_updates(&[]).unwrap(), 0);
    }
}
