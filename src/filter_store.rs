//! Storage seam for Gmail filters
//!
//! [`FilterStore`] is what the filter manager reads from and commits to.
//! [`JsonFilterStore`] backs it with a filter export file, either a bare JSON
//! array of filters or the `{"filter": [...]}` body of a settings list response.
use crate::error::{GmailError, Result};
use crate::models::GmailFilter;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Filter storage operations, abstracted for testing
pub trait FilterStore {
    /// All filters, in stored order
    fn list_filters(&self) -> Result<Vec<GmailFilter>>;

    /// Replace the stored filter that has the same id as `filter`
    fn update_filter(&mut self, filter: &GmailFilter) -> Result<()>;

    /// Persist pending updates
    fn flush(&mut self) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum FilterExport {
    Bare(Vec<GmailFilter>),
    Listing {
        #[serde(default)]
        filter: Vec<GmailFilter>,
    },
}

/// Filter store backed by a JSON export file
#[derive(Debug)]
pub struct JsonFilterStore {
    path: PathBuf,
    filters: Vec<GmailFilter>,
    listing_format: bool,
    dirty: bool,
}

impl JsonFilterStore {
    /// Load filters from `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(GmailError::FilterError(format!(
                "Filter export not found: {}",
                path.display()
            )));
        }

        let json = std::fs::read_to_string(&path)?;
        let export: FilterExport = serde_json::from_str(&json)?;
        let (filters, listing_format) = match export {
            FilterExport::Listing { filter } => (filter, true),
            FilterExport::Bare(filters) => (filters, false),
        };

        info!("Loaded {} filters from {}", filters.len(), path.display());
        Ok(Self {
            path,
            filters,
            listing_format,
            dirty: false,
        })
    }

    /// Store over an in-memory filter list that flushes to `path`
    pub fn new(path: impl Into<PathBuf>, filters: Vec<GmailFilter>) -> Self {
        Self {
            path: path.into(),
            filters,
            listing_format: false,
            dirty: true,
        }
    }

}

impl FilterStore for JsonFilterStore {
    fn list_filters(&self) -> Result<Vec<GmailFilter>> {
        Ok(self.filters.clone())
    }

    fn update_filter(&mut self, filter: &GmailFilter) -> Result<()> {
        let slot = self
            .filters
            .iter_mut()
            .find(|existing| existing.id == filter.id)
            .ok_or_else(|| GmailError::FilterError(format!("No filter with id {}", filter.id)))?;
        *slot = filter.clone();
        self.dirty = true;
        debug!("Updated filter {} in store", filter.id);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            debug!("No pending filter changes to write");
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = if self.listing_format {
            serde_json::to_string_pretty(&FilterExport::Listing {
                filter: self.filters.clone(),
            })?
        } else {
            serde_json::to_string_pretty(&self.filters)?
        };

        // Write next to the target and rename over it, so readers never see a
        // partially written export
        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);
        std::fs::write(&tmp_path, json)?;
        if let Err(e) = std::fs::rename(&tmp_path, &self.path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        self.dirty = false;
        info!("Wrote {} filters to {}", self.filters.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FilterCriteria;
    use tempfile::TempDir;

    fn filter(id: &str, query: &str) -> GmailFilter {
        GmailFilter {
            id: id.to_string(),
            criteria: FilterCriteria {
                query: Some(query.to_string()),
                ..Default::default()
            },
            action: Default::default(),
        }
    }

    #[test]
    fn test_load_bare_array() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("filters.json");
        std::fs::write(
            &path,
            r#"[{"id": "a", "criteria": {"query": "x"}}, {"id": "b"}]"#,
        )
        .unwrap();

        let store = JsonFilterStore::load(&path).unwrap();
        let filters = store.list_filters().unwrap();
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0].criteria.query.as_deref(), Some("x"));
        assert_eq!(filters[1].id, "b");
        assert!(!store.dirty);
    }

    #[test]
    fn test_load_listing_and_flush_keeps_shape() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("filters.json");
        std::fs::write(&path, r#"{"filter": [{"id": "a", "criteria": {"query": "old"}}]}"#)
            .unwrap();

        let mut store = JsonFilterStore::load(&path).unwrap();
        store.update_filter(&filter("a", "new")).unwrap();
        assert!(store.dirty);
        store.flush().unwrap();
        assert!(!store.dirty);

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["filter"][0]["criteria"]["query"], "new");

        let reloaded = JsonFilterStore::load(&path).unwrap();
        assert_eq!(reloaded.list_filters().unwrap(), vec![filter("a", "new")]);
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = JsonFilterStore::load(temp_dir.path().join("nope.json")).unwrap_err();
        assert!(err.to_string().contains("Filter export not found"));
    }

    #[test]
    fn test_load_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("filters.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            JsonFilterStore::load(&path),
            Err(GmailError::SerializationError(_))
        ));
    }

    #[test]
    fn test_update_unknown_filter() {
        let temp_dir = TempDir::new().unwrap();
        let mut store =
            JsonFilterStore::new(temp_dir.path().join("f.json"), vec![filter("a", "x")]);
        let err = store.update_filter(&filter("zzz", "y")).unwrap_err();
        assert!(err.to_string().contains("No filter with id zzz"));
    }

    #[test]
    fn test_flush_creates_parent_and_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("filters.json");
        let mut store = JsonFilterStore::new(&path, vec![filter("a", "x")]);
        store.flush().unwrap();

        assert!(path.exists());
        let entries: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("filters.json")]);

        let reloaded = JsonFilterStore::load(&path).unwrap();
        assert_eq!(reloaded.list_filters().unwrap(), vec![filter("a", "x")]);
    }

    #[test]
    fn test_failed_rename_removes_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        // A non-empty directory where the export should go makes the rename fail
        let path = temp_dir.path().join("filters.json");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "x").unwrap();

        let mut store = JsonFilterStore::new(&path, vec![filter("a", "x")]);
        assert!(matches!(store.flush(), Err(GmailError::IoError(_))));
        assert!(store.dirty);
        assert!(!temp_dir.path().join("filters.json.tmp").exists());
        assert!(path.join("keep").exists());
    }
}
