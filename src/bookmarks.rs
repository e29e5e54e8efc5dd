use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::NodeId;
use crate::store::{Store, StoreError, source_key};

/// A saved window on one source file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub center: NodeId,
    pub radius: usize,
    pub description: String,
}

/// Bookmarks of one source file, written through to the store on every change.
pub struct Bookmarks {
    store: Store,
    key: String,
    entries: Vec<Bookmark>,
}

impl Bookmarks {
    pub fn open(store: Store, source: &Path) -> Result<Self, StoreError> {
        let key = format!("{}.bookmarks", source_key(source));
        let entries = store.load(&key)?.unwrap_or_default();
        Ok(Self {
            store,
            key,
            entries,
        })
    }

    pub fn list(&self) -> &[Bookmark] {
        &self.entries
    }

    /// Adds `bookmark`, replacing an existing one for the same window.
    pub fn add(&mut self, bookmark: Bookmark) -> Result<(), StoreError> {
        match self
            .entries
            .iter_mut()
            .find(|entry| entry.center == bookmark.center && entry.radius == bookmark.radius)
        {
            Some(entry) => entry.description = bookmark.description,
            None => self.entries.push(bookmark),
        }
        self.store.save(&self.key, &self.entries)
    }

    pub fn remove(&mut self, index: usize) -> Result<Option<Bookmark>, StoreError> {
        if index >= self.entries.len() {
            return Ok(None);
        }
        let removed = self.entries.remove(index);
        self.store.save(&self.key, &self.entries)?;
        Ok(Some(removed))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::FsStore;

    fn bookmark(center: NodeId, radius: usize, description: &str) -> Bookmark {
        Bookmark {
            center,
            radius,
            description: description.into(),
        }
    }

    #[test]
    fn bookmarks_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(Arc::new(FsStore::new(dir.path())));
        let source = dir.path().join("sample.gfa");

        let mut bookmarks = Bookmarks::open(store.clone(), &source).unwrap();
        bookmarks.add(bookmark(4, 10, "bubble")).unwrap();
        bookmarks.add(bookmark(9, 2, "tip")).unwrap();
        bookmarks.add(bookmark(4, 10, "bubble near tip")).unwrap();

        let reopened = Bookmarks::open(store, &source).unwrap();
        assert_eq!(
            reopened.list(),
            [bookmark(4, 10, "bubble near tip"), bookmark(9, 2, "tip")]
        );
    }

    #[test]
    fn remove_out_of_range_is_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(Arc::new(FsStore::new(dir.path())));
        let mut bookmarks = Bookmarks::open(store, &dir.path().join("x.gfa")).unwrap();
        bookmarks.add(bookmark(1, 1, "one")).unwrap();

        assert_eq!(bookmarks.remove(3).unwrap(), None);
        assert_eq!(bookmarks.remove(0).unwrap(), Some(bookmark(1, 1, "one")));
        assert!(bookmarks.list().is_empty());
    }
}
