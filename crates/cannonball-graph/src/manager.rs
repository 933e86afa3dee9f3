//! Graph manager façade
//!
//! Owns one [`Document`] behind a reader/writer lock. Every mutation takes
//! the write lock, applies the change and runs the propagation pass before
//! releasing it, so readers always observe a consistent tree with clean
//! status caches. Queries share the read lock and never block each other.

use crate::error::{ManagerError, ManagerResult};
use crate::query::{NodeRef, NodeView};
use crate::store::OutlineStore;
use cannonball_core::{Document, Node, NodeId, OutlineSnapshot, Result, Status, Traversal, Variant};
use cannonball_markdown::{Codec, CodecConfig};
use parking_lot::RwLock;

/// Thread-safe entry point for one outline document
#[derive(Debug)]
pub struct GraphManager {
    doc: RwLock<Document>,
    codec: Codec,
}

impl Default for GraphManager {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphManager {
    /// Empty document with the default codec
    #[must_use]
    pub fn new() -> Self {
        Self::with_codec(Codec::default())
    }

    /// Empty document with a configured codec
    #[must_use]
    pub fn with_codec(codec: Codec) -> Self {
        Self {
            doc: RwLock::new(Document::new()),
            codec,
        }
    }

    /// Empty document with codec settings
    ///
    /// # Errors
    /// Invalid configuration.
    pub fn with_config(config: CodecConfig) -> ManagerResult<Self> {
        Ok(Self::with_codec(Codec::new(config)?))
    }

    /// Parse markdown with the default codec
    ///
    /// # Errors
    /// Any codec error.
    pub fn load(text: &str) -> ManagerResult<Self> {
        let manager = Self::new();
        manager.replace_markdown(text)?;
        Ok(manager)
    }

    /// Codec used by [`GraphManager::save`] and [`GraphManager::replace_markdown`]
    #[inline]
    #[must_use]
    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    /// Replace the whole document with parsed markdown
    ///
    /// The current document is kept if parsing fails.
    ///
    /// # Errors
    /// Any codec error.
    pub fn replace_markdown(&self, text: &str) -> ManagerResult<()> {
        let parsed = self.codec.parse(text)?;
        self.replace(parsed);
        Ok(())
    }

    fn replace(&self, doc: Document) {
        let nodes = doc.len();
        *self.doc.write() = doc;
        tracing::debug!(nodes, "document replaced");
    }

    /// Render the document as markdown
    #[must_use]
    pub fn save(&self) -> String {
        self.codec.serialize(&self.doc.read())
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    fn mutate<T>(&self, op: impl FnOnce(&mut Document) -> Result<T>) -> ManagerResult<T> {
        let mut doc = self.doc.write();
        let out = op(&mut doc)?;
        doc.flush();
        Ok(out)
    }

    fn parent_id(doc: &Document, parent: Option<&NodeRef>) -> Result<NodeId> {
        match parent {
            Some(p) => p.resolve(doc),
            None => Ok(doc.root()),
        }
    }

    /// Append a new node under `parent` (top level for `None`)
    ///
    /// # Errors
    /// `NodeNotFound`, `DuplicateAnchor`, `InvalidAnchor`.
    pub fn add_node(
        &self,
        parent: Option<NodeRef>,
        variant: Variant,
        text: &str,
        anchor: Option<&str>,
    ) -> ManagerResult<NodeId> {
        self.mutate(|doc| {
            let parent = Self::parent_id(doc, parent.as_ref())?;
            doc.add_child(parent, variant, text, anchor)
        })
    }

    /// Remove a node, and with `cascade` its subtree
    ///
    /// # Errors
    /// `NodeHasChildren` without cascade, `NodeNotFound`.
    pub fn remove_node(&self, node: impl Into<NodeRef>, cascade: bool) -> ManagerResult<Vec<NodeId>> {
        let node = node.into();
        self.mutate(|doc| {
            let id = node.resolve(doc)?;
            doc.remove(id, cascade)
        })
    }

    /// Apply an explicit status change
    ///
    /// # Errors
    /// `InvalidTransition`.
    pub fn set_status(&self, node: impl Into<NodeRef>, status: Status) -> ManagerResult<()> {
        let node = node.into();
        self.mutate(|doc| {
            let id = node.resolve(doc)?;
            doc.set_status(id, status)
        })
    }

    /// Move a node under `new_parent` (top level for `None`)
    ///
    /// # Errors
    /// `CycleDetected`, `NodeNotFound`.
    pub fn reparent(&self, node: impl Into<NodeRef>, new_parent: Option<NodeRef>) -> ManagerResult<()> {
        let node = node.into();
        self.mutate(|doc| {
            let id = node.resolve(doc)?;
            let parent = Self::parent_id(doc, new_parent.as_ref())?;
            doc.reparent(id, parent)
        })
    }

    /// Add a dependency edge to `anchor`
    ///
    /// # Errors
    /// `UnknownAnchor`, `CycleDetected`.
    pub fn add_reference(&self, node: impl Into<NodeRef>, anchor: &str) -> ManagerResult<()> {
        let node = node.into();
        self.mutate(|doc| {
            let id = node.resolve(doc)?;
            doc.add_reference(id, anchor)
        })
    }

    /// Remove a dependency edge
    ///
    /// # Errors
    /// `UnknownAnchor` if the node holds no such reference.
    pub fn remove_reference(&self, node: impl Into<NodeRef>, anchor: &str) -> ManagerResult<()> {
        let node = node.into();
        self.mutate(|doc| {
            let id = node.resolve(doc)?;
            doc.remove_reference(id, anchor)
        })
    }

    /// Replace a node's text
    ///
    /// # Errors
    /// `NodeNotFound`.
    pub fn set_text(&self, node: impl Into<NodeRef>, text: &str) -> ManagerResult<()> {
        let node = node.into();
        self.mutate(|doc| {
            let id = node.resolve(doc)?;
            doc.set_text(id, text)
        })
    }

    /// Set, rename or clear a node's anchor
    ///
    /// # Errors
    /// `DuplicateAnchor`, `InvalidAnchor`, `AnchorInUse`.
    pub fn set_anchor(&self, node: impl Into<NodeRef>, anchor: Option<&str>) -> ManagerResult<()> {
        let node = node.into();
        self.mutate(|doc| {
            let id = node.resolve(doc)?;
            doc.set_anchor(id, anchor)
        })
    }

    /// Make `decision` select `alternative`
    ///
    /// # Errors
    /// `InvalidTransition` for wrong variants, `CycleDetected`.
    pub fn select_alternative(
        &self,
        decision: impl Into<NodeRef>,
        alternative: impl Into<NodeRef>,
    ) -> ManagerResult<()> {
        let (decision, alternative) = (decision.into(), alternative.into());
        self.mutate(|doc| {
            let d = decision.resolve(doc)?;
            let a = alternative.resolve(doc)?;
            doc.select_alternative(d, a)
        })
    }

    /// Drop a Decision's selection
    ///
    /// # Errors
    /// `InvalidTransition` for non-Decision nodes.
    pub fn clear_selection(&self, decision: impl Into<NodeRef>) -> ManagerResult<()> {
        let decision = decision.into();
        self.mutate(|doc| {
            let d = decision.resolve(doc)?;
            doc.clear_selection(d)
        })
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Run `f` against the document under the read lock
    pub fn read<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        f(&self.doc.read())
    }

    /// Node by id or anchor
    ///
    /// # Errors
    /// `NodeNotFound`, `UnknownAnchor`.
    pub fn get_node(&self, node: impl Into<NodeRef>) -> ManagerResult<NodeView> {
        let node = node.into();
        self.read(|doc| {
            let id = node.resolve(doc)?;
            Ok(NodeView::capture(doc, doc.node(id)?))
        })
    }

    /// Effective status of a node
    ///
    /// # Errors
    /// `NodeNotFound`, `UnknownAnchor`.
    pub fn get_effective_status(&self, node: impl Into<NodeRef>) -> ManagerResult<Status> {
        let node = node.into();
        self.read(|doc| {
            let id = node.resolve(doc)?;
            Ok(doc.peek_status(id)?)
        })
    }

    /// Children of a node (top-level entries for `None`)
    ///
    /// # Errors
    /// `NodeNotFound`, `UnknownAnchor`.
    pub fn children(&self, node: Option<NodeRef>) -> ManagerResult<Vec<NodeView>> {
        self.read(|doc| {
            let id = Self::parent_id(doc, node.as_ref())?;
            Ok(doc
                .children(id)?
                .iter()
                .filter_map(|c| doc.get(*c))
                .map(|n| NodeView::capture(doc, n))
                .collect())
        })
    }

    /// Walk the document in order under the read lock
    ///
    /// The traversal is lazy and can be cloned to restart it.
    pub fn traverse<R>(&self, f: impl FnOnce(Traversal<'_>) -> R) -> R {
        self.read(|doc| f(doc.traverse()))
    }

    /// Every node in document order
    #[must_use]
    pub fn nodes(&self) -> Vec<NodeView> {
        self.read(|doc| doc.traverse().map(|n| NodeView::capture(doc, n)).collect())
    }

    /// Number of nodes
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.read(Document::len)
    }

    /// Nodes whose effective status holds up their parent
    #[must_use]
    pub fn blocking_nodes(&self) -> Vec<NodeView> {
        self.views(Document::blocking_nodes)
    }

    /// Work items that are open or in progress and not blocked
    #[must_use]
    pub fn actionable_tasks(&self) -> Vec<NodeView> {
        self.views(Document::actionable)
    }

    fn views(&self, select: impl FnOnce(&Document) -> Vec<NodeId>) -> Vec<NodeView> {
        self.read(|doc| {
            select(doc)
                .into_iter()
                .filter_map(|id| doc.get(id))
                .map(|n: &Node| NodeView::capture(doc, n))
                .collect()
        })
    }

    // ------------------------------------------------------------------
    // Snapshots and persistence
    // ------------------------------------------------------------------

    /// Structured snapshot of the document
    #[must_use]
    pub fn to_snapshot(&self) -> OutlineSnapshot {
        self.read(Document::to_snapshot)
    }

    /// Replace the document with a snapshot
    ///
    /// # Errors
    /// Reference or status errors in the snapshot.
    pub fn replace_snapshot(&self, snapshot: &OutlineSnapshot) -> ManagerResult<()> {
        let doc = Document::from_snapshot(snapshot)?;
        self.replace(doc);
        Ok(())
    }

    /// Snapshot as pretty-printed JSON
    ///
    /// # Errors
    /// JSON encoding failures.
    pub fn export_json(&self) -> ManagerResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_snapshot())?)
    }

    /// Replace the document with a JSON snapshot
    ///
    /// # Errors
    /// Malformed JSON or an invalid snapshot.
    pub fn import_json(&self, json: &str) -> ManagerResult<()> {
        let snapshot: OutlineSnapshot = serde_json::from_str(json)?;
        self.replace_snapshot(&snapshot)
    }

    /// Save the markdown rendering to `store` under `key`
    ///
    /// # Errors
    /// Store failures.
    pub fn persist(&self, store: &dyn OutlineStore, key: &str) -> ManagerResult<()> {
        let text = self.save();
        store
            .save(key, &text)
            .map_err(|e| ManagerError::store(key, e))?;
        tracing::debug!(key, bytes = text.len(), "outline persisted");
        Ok(())
    }

    /// Replace the document with the outline stored under `key`
    ///
    /// # Errors
    /// Store failures or codec errors.
    pub fn restore(&self, store: &dyn OutlineStore, key: &str) -> ManagerResult<()> {
        let text = store.load(key).map_err(|e| ManagerError::store(key, e))?;
        self.replace_markdown(&text)
    }
}
