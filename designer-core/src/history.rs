//! Undo/redo history for design edits.
//!
//! The manager keeps a list of [`HistoryItem`]s and a cursor pointing at the
//! most recently applied entry (`None` when everything has been undone).
//! Each item holds independent copies of the design before and after the
//! edit, so nothing the caller does to its live state afterwards can leak
//! into history.
//!
//! # Invariants
//!
//! 1. `cursor` is `None` or a valid index into the list.
//! 2. `len() <= max_history_size` after every mutation.
//! 3. Adding an entry discards everything after the cursor (redo branch).
//! 4. Compression only merges entries at or before the cursor.
//! 5. Eviction never removes the newest entry.
//!
//! # Compression
//!
//! Once the list grows past `compression_threshold`, runs of adjacent
//! entries with the same action type and the same component, each within
//! `compression_window` of the previous one, collapse into a single
//! `batch_operation` entry keeping the first before-state and the last
//! after-state. A trailing batch keeps absorbing matching edits, so a long
//! burst of edits stays one entry.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DesignerResult, HistoryError};
use crate::storage::HistoryStorage;
use crate::tree::{ComponentMap, ComponentTree};
use crate::ComponentId;

/// Version written by [`HistoryManager::export_history`].
pub const EXPORT_VERSION: &str = "1.0";

/// Design state captured before or after an edit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignSnapshot {
    /// Every component, keyed by id.
    pub components: ComponentMap,
    /// Hierarchy index of `components`.
    pub component_tree: ComponentTree,
    /// Selection at capture time.
    pub selected_ids: Vec<ComponentId>,
}

impl DesignSnapshot {
    /// Capture a snapshot, deriving the tree from the components.
    #[must_use]
    pub fn new(components: ComponentMap, selected_ids: Vec<ComponentId>) -> Self {
        let component_tree = ComponentTree::build(&components);
        Self {
            components,
            component_tree,
            selected_ids,
        }
    }
}

/// The kind of edit an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryActionType {
    /// A component was added.
    AddComponent,
    /// A component was removed.
    DeleteComponent,
    /// A prop changed.
    UpdateProperty,
    /// A style changed.
    UpdateStyle,
    /// A component was dragged.
    MoveComponent,
    /// A component was resized.
    ResizeComponent,
    /// Sibling order changed.
    ReorderComponent,
    /// A component was duplicated.
    DuplicateComponent,
    /// Components were pasted.
    PasteComponent,
    /// Components were grouped into a container.
    GroupComponents,
    /// A group was dissolved.
    UngroupComponents,
    /// Several compressed edits.
    BatchOperation,
}

impl fmt::Display for HistoryActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AddComponent => "add_component",
            Self::DeleteComponent => "delete_component",
            Self::UpdateProperty => "update_property",
            Self::UpdateStyle => "update_style",
            Self::MoveComponent => "move_component",
            Self::ResizeComponent => "resize_component",
            Self::ReorderComponent => "reorder_component",
            Self::DuplicateComponent => "duplicate_component",
            Self::PasteComponent => "paste_component",
            Self::GroupComponents => "group_components",
            Self::UngroupComponents => "ungroup_components",
            Self::BatchOperation => "batch_operation",
        };
        f.write_str(name)
    }
}

/// What a `batch_operation` entry merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchInfo {
    /// Action type of the merged edits.
    pub original_type: HistoryActionType,
    /// Number of merged edits.
    pub count: usize,
}

/// One recorded edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    /// Unique id.
    pub id: String,
    /// Action type.
    #[serde(rename = "type")]
    pub action: HistoryActionType,
    /// Human-readable description.
    pub description: String,
    /// When the edit happened.
    pub timestamp: DateTime<Utc>,
    /// The edited component.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_id: Option<ComponentId>,
    /// All edited components, for multi-component edits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_ids: Option<Vec<ComponentId>>,
    /// State before the edit.
    pub before_state: DesignSnapshot,
    /// State after the edit.
    pub after_state: DesignSnapshot,
    /// Free-form caller data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// Set on `batch_operation` entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch: Option<BatchInfo>,
    #[serde(skip)]
    size_bytes: usize,
}

impl HistoryItem {
    /// Serialized size recorded for memory accounting.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// Whether this entry touches `id`.
    #[must_use]
    pub fn involves(&self, id: &ComponentId) -> bool {
        self.component_id.as_ref() == Some(id)
            || self
                .component_ids
                .as_ref()
                .is_some_and(|ids| ids.contains(id))
    }

    /// Action type used for merging: the merged type for batches.
    fn merge_type(&self) -> HistoryActionType {
        self.batch.map_or(self.action, |b| b.original_type)
    }

    fn merge_count(&self) -> usize {
        self.batch.map_or(1, |b| b.count)
    }

    fn measure(&mut self) {
        self.size_bytes = serde_json::to_vec(self).map_or(0, |bytes| bytes.len());
    }

    fn can_absorb(&self, next: &Self, window: Duration) -> bool {
        let window_ms = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);
        self.merge_type() == next.merge_type()
            && self.component_id.is_some()
            && self.component_id == next.component_id
            && (next.timestamp - self.timestamp).num_milliseconds().abs() <= window_ms
    }

    /// Fold `next` into this entry, turning it into a batch.
    fn absorb(&mut self, next: Self) {
        let original_type = self.merge_type();
        let count = self.merge_count() + next.merge_count();
        self.action = HistoryActionType::BatchOperation;
        self.batch = Some(BatchInfo {
            original_type,
            count,
        });
        self.description = format!("{count} x {original_type}");
        self.after_state = next.after_state;
        self.timestamp = next.timestamp;
        self.measure();
    }
}

/// Builder for an entry passed to [`HistoryManager::add_history_item`].
///
/// The snapshots are cloned on construction.
#[derive(Debug, Clone)]
pub struct NewHistoryItem {
    action: HistoryActionType,
    description: String,
    before: DesignSnapshot,
    after: DesignSnapshot,
    component_id: Option<ComponentId>,
    component_ids: Option<Vec<ComponentId>>,
    metadata: Option<serde_json::Value>,
    timestamp: Option<DateTime<Utc>>,
}

impl NewHistoryItem {
    /// Describe an edit from `before` to `after`.
    #[must_use]
    pub fn new(
        action: HistoryActionType,
        description: impl Into<String>,
        before: &DesignSnapshot,
        after: &DesignSnapshot,
    ) -> Self {
        Self {
            action,
            description: description.into(),
            before: before.clone(),
            after: after.clone(),
            component_id: None,
            component_ids: None,
            metadata: None,
            timestamp: None,
        }
    }

    /// Set the edited component.
    #[must_use]
    pub fn with_component(mut self, id: impl Into<ComponentId>) -> Self {
        self.component_id = Some(id.into());
        self
    }

    /// Set all edited components.
    #[must_use]
    pub fn with_components(mut self, ids: Vec<ComponentId>) -> Self {
        self.component_ids = Some(ids);
        self
    }

    /// Attach caller data.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Record the edit at a specific time instead of now.
    #[must_use]
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    fn into_item(self) -> HistoryItem {
        let mut item = HistoryItem {
            id: Uuid::new_v4().to_string(),
            action: self.action,
            description: self.description,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            component_id: self.component_id,
            component_ids: self.component_ids,
            before_state: self.before,
            after_state: self.after,
            metadata: self.metadata,
            batch: None,
            size_bytes: 0,
        };
        item.measure();
        item
    }
}

/// Where and for how long history is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistenceConfig {
    /// Key of the persisted document.
    pub storage_key: String,
    /// Entries older than this are dropped on load.
    #[serde(with = "crate::config::duration_ms")]
    pub max_age: Duration,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            storage_key: "designer-history".to_string(),
            max_age: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// History limits and persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryConfig {
    /// Maximum number of entries.
    pub max_history_size: usize,
    /// Length above which compression runs.
    pub compression_threshold: usize,
    /// Maximum gap between two edits merged into one batch.
    #[serde(with = "crate::config::duration_ms")]
    pub compression_window: Duration,
    /// Budget for the recorded serialized size of all entries.
    pub max_memory_bytes: usize,
    /// Persistence settings; `None` keeps history in memory only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence: Option<PersistenceConfig>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_history_size: 50,
            compression_threshold: 20,
            compression_window: Duration::from_millis(1000),
            max_memory_bytes: 10 * 1024 * 1024,
            persistence: None,
        }
    }
}

impl HistoryConfig {
    /// Set the maximum number of entries.
    #[must_use]
    pub fn with_max_history_size(mut self, size: usize) -> Self {
        self.max_history_size = size;
        self
    }

    /// Set the compression threshold.
    #[must_use]
    pub fn with_compression_threshold(mut self, threshold: usize) -> Self {
        self.compression_threshold = threshold;
        self
    }

    /// Set the compression window.
    #[must_use]
    pub fn with_compression_window(mut self, window: Duration) -> Self {
        self.compression_window = window;
        self
    }

    /// Set the memory budget.
    #[must_use]
    pub fn with_max_memory_bytes(mut self, bytes: usize) -> Self {
        self.max_memory_bytes = bytes;
        self
    }

    /// Enable persistence.
    #[must_use]
    pub fn with_persistence(mut self, persistence: PersistenceConfig) -> Self {
        self.persistence = Some(persistence);
        self
    }
}

/// Summary of the history state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStats {
    /// Number of entries.
    pub total_items: usize,
    /// Cursor, -1 when nothing is applied.
    pub current_index: i64,
    /// Whether undo is possible.
    pub can_undo: bool,
    /// Whether redo is possible.
    pub can_redo: bool,
    /// Recorded serialized size of all entries.
    pub memory_bytes: usize,
    /// Number of `batch_operation` entries.
    pub batch_items: usize,
    /// Timestamp of the oldest entry.
    pub oldest: Option<DateTime<Utc>>,
    /// Timestamp of the newest entry.
    pub newest: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PersistedHistoryRef<'a> {
    history: &'a VecDeque<HistoryItem>,
    current_index: i64,
    timestamp: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedHistory {
    history: Vec<HistoryItem>,
    current_index: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportDocumentRef<'a> {
    version: &'static str,
    exported_at: DateTime<Utc>,
    history: &'a VecDeque<HistoryItem>,
    current_index: i64,
}

/// Exported history document, as produced by
/// [`HistoryManager::export_history`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    /// Format version.
    pub version: String,
    /// Export time.
    pub exported_at: DateTime<Utc>,
    /// Entries, oldest first.
    pub history: Vec<HistoryItem>,
    /// Cursor, -1 when nothing is applied.
    pub current_index: i64,
}

impl ExportDocument {
    /// Parse and check an exported document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed, the version is not 1.x, or
    /// the cursor is out of range.
    pub fn parse(json: &str) -> Result<Self, HistoryError> {
        let document: Self = serde_json::from_str(json)?;
        if !document.version.starts_with("1.") {
            return Err(HistoryError::UnsupportedVersion(document.version));
        }
        cursor_from_index(document.current_index, document.history.len())?;
        Ok(document)
    }
}

fn cursor_from_index(index: i64, len: usize) -> Result<Option<usize>, HistoryError> {
    if index == -1 {
        return Ok(None);
    }
    match usize::try_from(index) {
        Ok(i) if i < len => Ok(Some(i)),
        _ => Err(HistoryError::CursorOutOfRange { index, len }),
    }
}

fn index_from_cursor(cursor: Option<usize>) -> i64 {
    cursor.map_or(-1, |c| i64::try_from(c).unwrap_or(i64::MAX))
}

/// Bounded undo/redo stack with a cursor.
#[derive(Debug)]
pub struct HistoryManager {
    items: VecDeque<HistoryItem>,
    cursor: Option<usize>,
    config: HistoryConfig,
    storage: Option<Box<dyn HistoryStorage>>,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl HistoryManager {
    /// Create an in-memory manager.
    #[must_use]
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            items: VecDeque::new(),
            cursor: None,
            config,
            storage: None,
        }
    }

    /// Create a manager backed by `storage`, restoring any persisted
    /// history younger than the configured maximum age.
    ///
    /// Persistence is enabled with default settings if `config` has none.
    /// Load failures are logged and leave the history empty.
    #[must_use]
    pub fn with_storage(mut config: HistoryConfig, storage: impl HistoryStorage + 'static) -> Self {
        if config.persistence.is_none() {
            config.persistence = Some(PersistenceConfig::default());
        }
        let mut manager = Self::new(config);
        manager.storage = Some(Box::new(storage));
        manager.restore(Utc::now());
        manager
    }

    /// Record an edit.
    ///
    /// Entries after the cursor are discarded, the entry is appended (or
    /// folded into a trailing batch of the same edits), then compression and
    /// eviction run. Returns the id of the entry now holding the edit.
    pub fn add_history_item(&mut self, entry: NewHistoryItem) -> String {
        let item = entry.into_item();
        self.items.truncate(self.cursor.map_or(0, |c| c + 1));

        let window = self.config.compression_window;
        let extends_batch = self
            .items
            .back()
            .is_some_and(|last| last.batch.is_some() && last.can_absorb(&item, window));
        if extends_batch {
            if let Some(last) = self.items.back_mut() {
                last.absorb(item);
            }
        } else {
            self.items.push_back(item);
        }
        self.cursor = self.items.len().checked_sub(1);

        self.auto_cleanup();
        self.persist();
        self.items.back().map(|i| i.id.clone()).unwrap_or_default()
    }

    /// Step back. Returns the entry that was undone; apply its
    /// `before_state`.
    pub fn undo(&mut self) -> Option<&HistoryItem> {
        let current = self.cursor?;
        self.cursor = current.checked_sub(1);
        self.persist();
        self.items.get(current)
    }

    /// Step forward. Returns the entry that was redone; apply its
    /// `after_state`.
    pub fn redo(&mut self) -> Option<&HistoryItem> {
        let next = self.cursor.map_or(0, |c| c + 1);
        if next >= self.items.len() {
            return None;
        }
        self.cursor = Some(next);
        self.persist();
        self.items.get(next)
    }

    /// Move the cursor to `index` (`None` for "before the first entry") and
    /// return the snapshot to apply. Out-of-range indices are ignored.
    pub fn go_to(&mut self, index: Option<usize>) -> Option<&DesignSnapshot> {
        match index {
            Some(i) if i >= self.items.len() => return None,
            None if self.items.is_empty() => return None,
            _ => {}
        }
        self.cursor = index;
        self.persist();
        match index {
            Some(i) => self.items.get(i).map(|item| &item.after_state),
            None => self.items.front().map(|item| &item.before_state),
        }
    }

    /// Whether [`undo`](Self::undo) would return an entry.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor.is_some()
    }

    /// Whether [`redo`](Self::redo) would return an entry.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor.map_or(0, |c| c + 1) < self.items.len()
    }

    /// Description of the entry [`undo`](Self::undo) would revert.
    #[must_use]
    pub fn undo_description(&self) -> Option<&str> {
        self.cursor
            .and_then(|c| self.items.get(c))
            .map(|item| item.description.as_str())
    }

    /// Description of the entry [`redo`](Self::redo) would apply.
    #[must_use]
    pub fn redo_description(&self) -> Option<&str> {
        self.items
            .get(self.cursor.map_or(0, |c| c + 1))
            .map(|item| item.description.as_str())
    }

    /// Cursor position.
    #[must_use]
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Cursor position, -1 when nothing is applied.
    #[must_use]
    pub fn current_index(&self) -> i64 {
        index_from_cursor(self.cursor)
    }

    /// All entries, oldest first.
    #[must_use]
    pub fn history(&self) -> &VecDeque<HistoryItem> {
        &self.items
    }

    /// Entries touching a component, oldest first.
    #[must_use]
    pub fn items_for_component(&self, id: &ComponentId) -> Vec<&HistoryItem> {
        self.items.iter().filter(|item| item.involves(id)).collect()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Recorded serialized size of all entries.
    #[must_use]
    pub fn memory_bytes(&self) -> usize {
        self.items.iter().map(HistoryItem::size_bytes).sum()
    }

    /// Configuration.
    #[must_use]
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Summary of the current state.
    #[must_use]
    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            total_items: self.items.len(),
            current_index: self.current_index(),
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
            memory_bytes: self.memory_bytes(),
            batch_items: self
                .items
                .iter()
                .filter(|item| item.action == HistoryActionType::BatchOperation)
                .count(),
            oldest: self.items.front().map(|item| item.timestamp),
            newest: self.items.back().map(|item| item.timestamp),
        }
    }

    /// Drop every entry, including the persisted copy.
    pub fn clear(&mut self) {
        self.items.clear();
        self.cursor = None;
        if let (Some(storage), Some(persistence)) = (&self.storage, &self.config.persistence) {
            if let Err(e) = storage.remove(&persistence.storage_key) {
                tracing::warn!("Failed to remove history {}: {e}", persistence.storage_key);
            }
        }
    }

    /// Serialize the whole history as a versioned document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn export_history(&self) -> DesignerResult<String> {
        let document = ExportDocumentRef {
            version: EXPORT_VERSION,
            exported_at: Utc::now(),
            history: &self.items,
            current_index: self.current_index(),
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Replace the history with an exported document.
    ///
    /// Returns `false`, leaving the current history untouched, if the
    /// document is malformed.
    pub fn import_history(&mut self, json: &str) -> bool {
        match self.try_import_history(json) {
            Ok(count) => {
                tracing::info!(entries = count, "Imported history");
                true
            }
            Err(e) => {
                tracing::warn!("Rejected history import: {e}");
                false
            }
        }
    }

    /// Replace the history with an exported document, returning the number
    /// of entries imported.
    ///
    /// # Errors
    ///
    /// Returns an error, leaving the current history untouched, if the
    /// document is malformed.
    pub fn try_import_history(&mut self, json: &str) -> Result<usize, HistoryError> {
        let document = ExportDocument::parse(json)?;
        let cursor = cursor_from_index(document.current_index, document.history.len())?;
        self.replace(document.history, cursor);
        self.auto_cleanup();
        self.persist();
        Ok(self.items.len())
    }

    fn replace(&mut self, items: Vec<HistoryItem>, cursor: Option<usize>) {
        self.items = items
            .into_iter()
            .map(|mut item| {
                item.measure();
                item
            })
            .collect();
        self.cursor = cursor;
    }

    /// Compress, then evict from the front until within bounds.
    fn auto_cleanup(&mut self) {
        if self.items.len() > self.config.compression_threshold {
            self.compress();
        }

        let max_len = self.config.max_history_size.max(1);
        let mut evicted = 0_usize;
        while self.items.len() > max_len
            || (self.items.len() > 1 && self.memory_bytes() > self.config.max_memory_bytes)
        {
            self.items.pop_front();
            self.cursor = self.cursor.and_then(|c| c.checked_sub(1));
            evicted += 1;
        }
        if evicted > 0 {
            tracing::debug!(
                evicted,
                remaining = self.items.len(),
                "Evicted oldest history entries"
            );
        }
    }

    /// Merge runs of similar edits at or before the cursor.
    fn compress(&mut self) {
        let Some(cursor) = self.cursor else {
            return;
        };
        let before = self.items.len();
        let window = self.config.compression_window;
        let mut merged: VecDeque<HistoryItem> = VecDeque::with_capacity(before);
        let mut new_cursor = cursor;

        for (i, item) in std::mem::take(&mut self.items).into_iter().enumerate() {
            if i <= cursor {
                if let Some(last) = merged.back_mut() {
                    if last.can_absorb(&item, window) {
                        last.absorb(item);
                        if i == cursor {
                            new_cursor = merged.len() - 1;
                        }
                        continue;
                    }
                }
            }
            merged.push_back(item);
            if i == cursor {
                new_cursor = merged.len() - 1;
            }
        }

        self.items = merged;
        self.cursor = Some(new_cursor);
        if self.items.len() < before {
            tracing::debug!(before, after = self.items.len(), "Compressed history");
        }
    }

    fn persist(&self) {
        let (Some(storage), Some(persistence)) = (&self.storage, &self.config.persistence) else {
            return;
        };
        let blob = PersistedHistoryRef {
            history: &self.items,
            current_index: self.current_index(),
            timestamp: Utc::now(),
        };
        let json = match serde_json::to_string(&blob) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Failed to serialize history {}: {e}", persistence.storage_key);
                return;
            }
        };
        if let Err(e) = storage.save(&persistence.storage_key, &json) {
            tracing::warn!("Failed to persist history {}: {e}", persistence.storage_key);
        }
    }

    /// Load persisted history, dropping entries older than the maximum age
    /// relative to `now`.
    fn restore(&mut self, now: DateTime<Utc>) {
        let (Some(storage), Some(persistence)) = (&self.storage, &self.config.persistence) else {
            return;
        };
        let key = persistence.storage_key.clone();
        let max_age = chrono::Duration::from_std(persistence.max_age)
            .unwrap_or_else(|_| chrono::Duration::days(365 * 100));

        let json = match storage.load(&key) {
            Ok(Some(json)) => json,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!("Failed to load history {key}: {e}");
                return;
            }
        };
        let persisted: PersistedHistory = match serde_json::from_str(&json) {
            Ok(persisted) => persisted,
            Err(e) => {
                tracing::warn!("Discarding corrupt history {key}: {e}");
                return;
            }
        };
        let Ok(cursor) = cursor_from_index(persisted.current_index, persisted.history.len()) else {
            tracing::warn!("Discarding history {key} with out-of-range cursor");
            return;
        };

        let total = persisted.history.len();
        let mut kept = Vec::with_capacity(total);
        let mut kept_at_or_before_cursor = 0_usize;
        for (i, item) in persisted.history.into_iter().enumerate() {
            if now - item.timestamp > max_age {
                continue;
            }
            if cursor.is_some_and(|c| i <= c) {
                kept_at_or_before_cursor += 1;
            }
            kept.push(item);
        }
        let dropped = total - kept.len();
        self.replace(kept, kept_at_or_before_cursor.checked_sub(1));
        self.auto_cleanup();
        tracing::debug!(
            restored = self.items.len(),
            expired = dropped,
            "Restored persisted history"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::{ComponentInstance, ComponentProps, Dimension, Styles};

    fn snapshot(width: f32) -> DesignSnapshot {
        let component = ComponentInstance::new("box", ComponentProps::Container).with_styles(Styles {
            width: Some(Dimension::Px(width)),
            ..Styles::default()
        });
        let components = [(component.id.clone(), component)].into_iter().collect();
        DesignSnapshot::new(components, vec!["box".into()])
    }

    fn width_of(snapshot: &DesignSnapshot) -> Option<Dimension> {
        snapshot.components.get(&"box".into()).and_then(|c| c.styles.width)
    }

    fn edit(action: HistoryActionType, from: f32, to: f32) -> NewHistoryItem {
        NewHistoryItem::new(action, format!("{from} -> {to}"), &snapshot(from), &snapshot(to))
            .with_component("box")
    }

    #[test]
    fn test_undo_on_fresh_manager() {
        let mut history = HistoryManager::default();
        assert!(history.undo().is_none());
        assert_eq!(history.current_index(), -1);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_undo_redo_cycle() {
        let mut history = HistoryManager::default();
        history.add_history_item(edit(HistoryActionType::AddComponent, 0.0, 1.0));
        history.add_history_item(edit(HistoryActionType::MoveComponent, 1.0, 2.0));
        assert_eq!(history.current_index(), 1);
        assert!(history.can_undo());
        assert!(!history.can_redo());

        let undone = history.undo().expect("undo");
        assert_eq!(width_of(&undone.before_state), Some(Dimension::Px(1.0)));
        assert_eq!(history.current_index(), 0);
        assert!(history.can_redo());

        let redone = history.redo().expect("redo");
        assert_eq!(width_of(&redone.after_state), Some(Dimension::Px(2.0)));
        assert!(history.redo().is_none());

        history.undo();
        history.undo();
        assert!(history.undo().is_none());
        assert_eq!(history.current_index(), -1);
    }

    #[test]
    fn test_new_edit_discards_redo_branch() {
        let mut history = HistoryManager::default();
        history.add_history_item(edit(HistoryActionType::AddComponent, 0.0, 1.0));
        history.add_history_item(edit(HistoryActionType::MoveComponent, 1.0, 2.0));
        history.undo();
        history.add_history_item(edit(HistoryActionType::ResizeComponent, 1.0, 5.0));

        assert!(!history.can_redo());
        assert_eq!(history.len(), 2);
        assert_eq!(history.history()[1].action, HistoryActionType::ResizeComponent);
    }

    #[test]
    fn test_snapshots_are_isolated_from_caller() {
        let mut history = HistoryManager::default();
        let before = snapshot(1.0);
        let mut after = snapshot(2.0);
        history.add_history_item(
            NewHistoryItem::new(HistoryActionType::UpdateStyle, "w", &before, &after).with_component("box"),
        );

        if let Some(component) = after.components.get_mut(&"box".into()) {
            component.styles.width = Some(Dimension::Px(999.0));
        }

        let undone = history.undo().expect("undo");
        assert_eq!(width_of(&undone.after_state), Some(Dimension::Px(2.0)));
    }

    #[test]
    fn test_burst_of_edits_compresses_to_one_batch() {
        let config = HistoryConfig::default().with_compression_threshold(20);
        let mut history = HistoryManager::new(config);
        let start = Utc::now();
        for i in 0..25_u8 {
            let from = f32::from(i);
            history.add_history_item(
                edit(HistoryActionType::UpdateProperty, from, from + 1.0)
                    .at(start + chrono::Duration::milliseconds(i64::from(i) * 30)),
            );
        }

        assert_eq!(history.len(), 1);
        let batch = &history.history()[0];
        assert_eq!(batch.action, HistoryActionType::BatchOperation);
        assert_eq!(
            batch.batch,
            Some(BatchInfo {
                original_type: HistoryActionType::UpdateProperty,
                count: 25
            })
        );
        assert_eq!(width_of(&batch.before_state), Some(Dimension::Px(0.0)));
        assert_eq!(width_of(&batch.after_state), Some(Dimension::Px(25.0)));
        assert_eq!(history.current_index(), 0);
    }

    #[test]
    fn test_edits_outside_window_are_not_merged() {
        let config = HistoryConfig::default().with_compression_threshold(2);
        let mut history = HistoryManager::new(config);
        let start = Utc::now();
        for i in 0..4_u8 {
            history.add_history_item(
                edit(HistoryActionType::UpdateProperty, f32::from(i), f32::from(i) + 1.0)
                    .at(start + chrono::Duration::seconds(i64::from(i) * 2)),
            );
        }
        assert_eq!(history.len(), 4);
    }

    #[test]
    fn test_different_types_are_not_merged() {
        let config = HistoryConfig::default().with_compression_threshold(2);
        let mut history = HistoryManager::new(config);
        let start = Utc::now();
        let actions = [
            HistoryActionType::UpdateProperty,
            HistoryActionType::UpdateStyle,
            HistoryActionType::UpdateProperty,
        ];
        for (i, action) in actions.into_iter().enumerate() {
            let step = i64::try_from(i).expect("small");
            history.add_history_item(edit(action, 0.0, 1.0).at(start + chrono::Duration::milliseconds(step)));
        }
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_length_is_bounded() {
        let config = HistoryConfig::default()
            .with_max_history_size(5)
            .with_compression_threshold(100);
        let mut history = HistoryManager::new(config);
        for i in 0..12_u8 {
            history.add_history_item(edit(HistoryActionType::AddComponent, f32::from(i), f32::from(i) + 1.0));
            assert!(history.len() <= 5);
        }
        assert_eq!(history.current_index(), 4);
        assert_eq!(width_of(&history.history()[4].after_state), Some(Dimension::Px(12.0)));
    }

    #[test]
    fn test_memory_budget_keeps_newest() {
        let config = HistoryConfig::default().with_max_memory_bytes(1);
        let mut history = HistoryManager::new(config);
        history.add_history_item(edit(HistoryActionType::AddComponent, 0.0, 1.0));
        history.add_history_item(edit(HistoryActionType::MoveComponent, 1.0, 2.0));
        assert_eq!(history.len(), 1);
        assert_eq!(history.history()[0].action, HistoryActionType::MoveComponent);
        assert!(history.memory_bytes() > 0);
    }

    #[test]
    fn test_go_to_index() {
        let mut history = HistoryManager::default();
        for i in 0..3_u8 {
            history.add_history_item(edit(HistoryActionType::AddComponent, f32::from(i), f32::from(i) + 1.0));
        }
        let first = history.go_to(Some(0)).cloned().expect("valid index");
        assert_eq!(width_of(&first), Some(Dimension::Px(1.0)));
        assert_eq!(history.current_index(), 0);

        let initial = history.go_to(None).cloned().expect("before first");
        assert_eq!(width_of(&initial), Some(Dimension::Px(0.0)));
        assert_eq!(history.current_index(), -1);

        assert!(history.go_to(Some(3)).is_none());
        assert_eq!(history.current_index(), -1);
    }

    #[test]
    fn test_descriptions_and_component_lookup() {
        let mut history = HistoryManager::default();
        history.add_history_item(edit(HistoryActionType::AddComponent, 0.0, 1.0));
        history.add_history_item(
            NewHistoryItem::new(HistoryActionType::GroupComponents, "group", &snapshot(1.0), &snapshot(1.0))
                .with_components(vec!["box".into(), "other".into()]),
        );
        assert_eq!(history.undo_description(), Some("group"));
        assert_eq!(history.redo_description(), None);
        history.undo();
        assert_eq!(history.redo_description(), Some("group"));

        assert_eq!(history.items_for_component(&"box".into()).len(), 2);
        assert_eq!(history.items_for_component(&"other".into()).len(), 1);
    }

    #[test]
    fn test_stats_and_clear() {
        let mut history = HistoryManager::default();
        history.add_history_item(edit(HistoryActionType::AddComponent, 0.0, 1.0));
        let stats = history.stats();
        assert_eq!(stats.total_items, 1);
        assert_eq!(stats.current_index, 0);
        assert!(stats.can_undo);
        assert!(stats.memory_bytes > 0);

        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.current_index(), -1);
    }

    #[test]
    fn test_export_import() {
        let mut history = HistoryManager::default();
        history.add_history_item(edit(HistoryActionType::AddComponent, 0.0, 1.0));
        history.add_history_item(edit(HistoryActionType::MoveComponent, 1.0, 2.0));
        history.undo();
        let exported = history.export_history().expect("export");

        let json: serde_json::Value = serde_json::from_str(&exported).expect("valid json");
        assert_eq!(json["version"], EXPORT_VERSION);
        assert_eq!(json["currentIndex"], 0);
        assert_eq!(json["history"][0]["type"], "add_component");

        let mut restored = HistoryManager::default();
        assert!(restored.import_history(&exported));
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.current_index(), 0);
        assert_eq!(restored.history()[1].timestamp, history.history()[1].timestamp);
        assert!(restored.can_redo());
    }

    #[test]
    fn test_failed_import_leaves_state() {
        let mut history = HistoryManager::default();
        history.add_history_item(edit(HistoryActionType::AddComponent, 0.0, 1.0));

        assert!(!history.import_history("not json"));
        assert!(!history.import_history(r#"{"version":"1.0","exportedAt":"2024-01-01T00:00:00Z","history":[],"currentIndex":3}"#));
        assert!(!history.import_history(r#"{"version":"9.0","exportedAt":"2024-01-01T00:00:00Z","history":[],"currentIndex":-1}"#));
        assert_eq!(history.len(), 1);
        assert_eq!(history.current_index(), 0);
    }

    #[test]
    fn test_persistence_survives_restart() {
        let storage = MemoryStorage::new();
        let config = HistoryConfig::default().with_persistence(PersistenceConfig::default());
        {
            let mut history = HistoryManager::with_storage(config.clone(), storage.clone());
            history.add_history_item(edit(HistoryActionType::AddComponent, 0.0, 1.0));
            history.add_history_item(edit(HistoryActionType::MoveComponent, 1.0, 2.0));
            history.undo();
        }
        assert_eq!(storage.keys(), vec!["designer-history".to_string()]);

        let restored = HistoryManager::with_storage(config, storage);
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.current_index(), 0);
    }

    #[test]
    fn test_expired_entries_dropped_on_load() {
        let storage = MemoryStorage::new();
        let config = HistoryConfig::default();
        let now = Utc::now();
        {
            let mut history = HistoryManager::with_storage(config.clone(), storage.clone());
            history.add_history_item(
                edit(HistoryActionType::AddComponent, 0.0, 1.0).at(now - chrono::Duration::hours(30)),
            );
            history.add_history_item(
                edit(HistoryActionType::MoveComponent, 1.0, 2.0).at(now - chrono::Duration::hours(25)),
            );
            history.add_history_item(edit(HistoryActionType::ResizeComponent, 2.0, 3.0).at(now));
        }

        let restored = HistoryManager::with_storage(config, storage);
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.history()[0].action, HistoryActionType::ResizeComponent);
        assert_eq!(restored.current_index(), 0);
    }

    #[test]
    fn test_clear_removes_persisted_history() {
        let storage = MemoryStorage::new();
        let mut history = HistoryManager::with_storage(HistoryConfig::default(), storage.clone());
        history.add_history_item(edit(HistoryActionType::AddComponent, 0.0, 1.0));
        assert_eq!(storage.keys(), vec!["designer-history".to_string()]);

        history.clear();
        assert!(storage.keys().is_empty());
        assert!(HistoryManager::with_storage(HistoryConfig::default(), storage).is_empty());
    }

    #[test]
    fn test_corrupt_storage_starts_empty() {
        let storage = MemoryStorage::new();
        storage.save("designer-history", "{oops").expect("save");
        let history = HistoryManager::with_storage(HistoryConfig::default(), storage);
        assert!(history.is_empty());
    }
}
