//! Folder tree synthesis from per-message labels.
//!
//! A pure function of the index: the same archive always yields the same
//! folder ids, because every id is derived from label text alone.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use tracing::debug;

use crate::model::folder::FolderNode;
use crate::model::mail::MessageIndexEntry;

/// Pseudo-label mapped to every message of a labeled archive.
pub const ALL_MAIL: &str = "All Mail";

/// Id of the synthetic parent of all `Category …` labels.
pub const CATEGORIES_ID: &str = "@categories";

/// Display name of the synthetic categories parent.
pub const CATEGORIES_NAME: &str = "Categories";

/// Labels starting with this prefix are grouped under "Categories".
pub const CATEGORY_PREFIX: &str = "Category ";

/// Id of the single folder of an archive without labels.
pub const MAILBOX_ID: &str = "@mailbox";

/// Separator of hierarchical label paths.
pub const PATH_SEPARATOR: char = '/';

/// System labels, displayed first and in this order.
pub const SYSTEM_LABELS: [&str; 8] = [
    "Inbox",
    "Starred",
    "Important",
    "Sent",
    "Drafts",
    "Spam",
    "Trash",
    "Chats",
];

/// Folder tree plus the folder id → ordinals lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FolderLayout {
    /// Top-level folders in display order.
    pub tree: Vec<FolderNode>,
    /// Sorted message ordinals per folder id.
    pub members: HashMap<String, Vec<usize>>,
}

impl FolderLayout {
    /// Ordinals of a folder, or `None` for an unknown folder id.
    pub fn ordinals(&self, folder_id: &str) -> Option<&[usize]> {
        self.members.get(folder_id).map(Vec::as_slice)
    }

    /// `true` if `ordinal` belongs to `folder_id`.
    pub fn contains(&self, folder_id: &str, ordinal: usize) -> bool {
        self.ordinals(folder_id)
            .is_some_and(|ords| ords.binary_search(&ordinal).is_ok())
    }
}

/// Build the folder layout for an index.
///
/// Without any label, the archive becomes a single folder named after the
/// file stem. Otherwise every label becomes a folder (nested on `/`,
/// grouped under "Categories" for `Category …`), plus "All Mail".
pub fn synthesize(index: &[MessageIndexEntry], archive_path: &Path) -> FolderLayout {
    if index.iter().all(|e| e.labels.is_empty()) {
        return single_folder(index.len(), archive_path);
    }

    let mut by_label: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (ordinal, entry) in index.iter().enumerate() {
        for label in &entry.labels {
            let ords = by_label.entry(label.clone()).or_default();
            if ords.last() != Some(&ordinal) {
                ords.push(ordinal);
            }
        }
    }
    by_label.insert(ALL_MAIL.to_string(), (0..index.len()).collect());

    let mut labels: Vec<&String> = by_label.keys().collect();
    labels.sort_by(|a, b| display_rank(a).cmp(&display_rank(b)).then_with(|| a.cmp(b)));

    let mut arena = Arena::default();
    for label in labels {
        let count = by_label[label].len();
        if let Some(short) = label.strip_prefix(CATEGORY_PREFIX).filter(|s| !s.is_empty()) {
            let parent = arena.node(CATEGORIES_ID, CATEGORIES_NAME, None);
            let idx = arena.node(label, short, Some(parent));
            arena.set_count(idx, count);
        } else if label.contains(PATH_SEPARATOR) {
            let idx = arena.path(label);
            arena.set_count(idx, count);
        } else {
            let idx = arena.node(label, label, None);
            arena.set_count(idx, count);
        }
    }

    debug!(
        labels = by_label.len(),
        roots = arena.roots.len(),
        "Synthesized label folders"
    );

    FolderLayout {
        tree: arena.freeze(),
        members: by_label.into_iter().collect(),
    }
}

/// Sort key: position in [`SYSTEM_LABELS`], everything else after.
fn display_rank(label: &str) -> usize {
    SYSTEM_LABELS
        .iter()
        .position(|s| *s == label)
        .unwrap_or(SYSTEM_LABELS.len())
}

fn single_folder(message_count: usize, archive_path: &Path) -> FolderLayout {
    let name = archive_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Mailbox".to_string());

    FolderLayout {
        tree: vec![FolderNode {
            id: MAILBOX_ID.to_string(),
            name,
            message_count,
            children: Vec::new(),
        }],
        members: HashMap::from([(MAILBOX_ID.to_string(), (0..message_count).collect())]),
    }
}

/// Flat node storage addressed by index; children refer to slots by index.
#[derive(Default)]
struct Arena {
    slots: Vec<Slot>,
    by_id: HashMap<String, usize>,
    roots: Vec<usize>,
}

struct Slot {
    id: String,
    name: String,
    count: usize,
    children: Vec<usize>,
}

impl Arena {
    /// Existing slot for `id`, or a new one attached under `parent`.
    fn node(&mut self, id: &str, name: &str, parent: Option<usize>) -> usize {
        if let Some(&idx) = self.by_id.get(id) {
            return idx;
        }
        let idx = self.slots.len();
        self.slots.push(Slot {
            id: id.to_string(),
            name: name.to_string(),
            count: 0,
            children: Vec::new(),
        });
        self.by_id.insert(id.to_string(), idx);
        match parent {
            Some(p) => self.slots[p].children.push(idx),
            None => self.roots.push(idx),
        }
        idx
    }

    /// Chain of nodes for `a/b/c`: ids `a`, `a/b`, `a/b/c`. Returns the leaf.
    fn path(&mut self, label: &str) -> usize {
        let mut parent = None;
        let mut segment_start = 0;
        for (pos, _) in label.match_indices(PATH_SEPARATOR) {
            let segment = &label[segment_start..pos];
            segment_start = pos + PATH_SEPARATOR.len_utf8();
            if segment.is_empty() {
                continue;
            }
            parent = Some(self.node(&label[..pos], segment, parent));
        }
        let leaf = &label[segment_start..];
        let name = if leaf.is_empty() { label } else { leaf };
        self.node(label, name, parent)
    }

    fn set_count(&mut self, idx: usize, count: usize) {
        self.slots[idx].count = count;
    }

    fn freeze(&self) -> Vec<FolderNode> {
        self.roots.iter().map(|&idx| self.freeze_node(idx)).collect()
    }

    fn freeze_node(&self, idx: usize) -> FolderNode {
        let slot = &self.slots[idx];
        FolderNode {
            id: slot.id.clone(),
            name: slot.name.clone(),
            message_count: slot.count,
            children: slot.children.iter().map(|&c| self.freeze_node(c)).collect(),
        }
    }
}
