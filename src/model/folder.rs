//! Folder tree nodes.

use serde::{Deserialize, Serialize};

/// One node of the folder tree shown to clients.
///
/// `message_count` is the number of messages mapped directly to `id`;
/// synthetic grouping nodes carry `0` and leave the counting to their
/// children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderNode {
    pub id: String,
    pub name: String,
    pub message_count: usize,
    pub children: Vec<FolderNode>,
}

impl FolderNode {
    /// Depth-first search for a node by id.
    pub fn find(&self, id: &str) -> Option<&FolderNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }
}

/// Depth-first search over a forest of folder nodes.
pub fn find_folder<'a>(roots: &'a [FolderNode], id: &str) -> Option<&'a FolderNode> {
    roots.iter().find_map(|n| n.find(id))
}
