//! Presentation trees over hydrated invocation records
//!
//! Two modes:
//!
//! - [`TraceCorrelator::single`]: one node per record of a single call tree,
//!   preorder, original child order
//! - [`TraceCorrelator::aggregate`]: a forest over all records of a trace.
//!   A record whose span's parent span belongs to a node of another record is
//!   attached beneath that node; every other record is a root.
//!
//! Nodes live in an arena and refer to each other by [`NodeId`]. Every
//! traversal uses an explicit stack, so call-tree depth is bounded only by
//! memory.
//!
//! Span details are fetched from a [`SpanLookup`] at most once per node, on
//! first access. They are never written back to the records.

use invoscope_core::{InvocationSequence, SpanId, TraceId};
use once_cell::sync::OnceCell;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Index of a node within its [`InvocationTree`]
pub type NodeId = usize;

/// First node carrying each span id
type SpanIndex = FxHashMap<SpanId, NodeId>;

/// Correlation data of one span, as reported by a span-lookup service
#[derive(Debug, Clone, PartialEq)]
pub struct SpanDetails {
    /// Trace the span belongs to
    pub trace_id: TraceId,
    /// Span id
    pub span_id: SpanId,
    /// Operation name reported for the span
    pub operation: String,
    /// Span duration in milliseconds, if reported
    pub duration_ms: Option<f64>,
    /// Free-form span tags
    pub tags: Vec<(String, String)>,
}

/// External span-lookup collaborator
pub trait SpanLookup: Send + Sync {
    /// Details of a span, or `None` if the service does not know it
    fn lookup(&self, trace_id: TraceId, span_id: SpanId) -> Option<SpanDetails>;
}

/// One node of an [`InvocationTree`]
#[derive(Debug)]
pub struct TreeNode {
    /// Record of this node without its children
    pub record: InvocationSequence,
    /// Parent node, `None` for roots
    pub parent: Option<NodeId>,
    /// Child nodes in display order
    pub children: SmallVec<[NodeId; 4]>,
    span: OnceCell<Option<SpanDetails>>,
}

impl TreeNode {
    fn new(record: &InvocationSequence, parent: Option<NodeId>) -> Self {
        Self {
            record: record.detached(),
            parent,
            children: SmallVec::new(),
            span: OnceCell::new(),
        }
    }
}

/// Arena-backed tree (or forest) of invocation nodes
pub struct InvocationTree {
    nodes: Vec<TreeNode>,
    roots: Vec<NodeId>,
    lookup: Option<Arc<dyn SpanLookup>>,
}

impl InvocationTree {
    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the tree has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Root nodes in display order
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Node by id
    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    /// Child ids of a node (empty for an unknown id)
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    /// Span details of a node, fetched on first access
    pub fn span_details(&self, id: NodeId) -> Option<&SpanDetails> {
        let node = self.nodes.get(id)?;
        node.span
            .get_or_init(|| {
                let ident = node.record.span_ident?;
                self.lookup.as_ref()?.lookup(ident.trace_id, ident.span_id)
            })
            .as_ref()
    }

    /// Depth-first preorder over every tree of the forest, yielding
    /// `(node, depth)` with roots at depth 0
    pub fn iter_preorder(&self) -> impl Iterator<Item = (NodeId, usize)> + '_ {
        let mut stack: Vec<(NodeId, usize)> = self.roots.iter().rev().map(|&id| (id, 0)).collect();
        std::iter::from_fn(move || {
            let (id, depth) = stack.pop()?;
            stack.extend(self.children(id).iter().rev().map(|&child| (child, depth + 1)));
            Some((id, depth))
        })
    }

    /// Greatest depth of any node (0 for a lone root)
    pub fn max_depth(&self) -> usize {
        self.iter_preorder().map(|(_, depth)| depth).max().unwrap_or(0)
    }

    /// Append one record and its whole subtree in preorder, returning the
    /// id of the record's node
    fn append_subtree(&mut self, root: &InvocationSequence, parent: Option<NodeId>) -> NodeId {
        let first = self.nodes.len();
        let mut stack: Vec<(&InvocationSequence, Option<NodeId>)> = vec![(root, parent)];

        while let Some((record, parent)) = stack.pop() {
            let id = self.nodes.len();
            self.nodes.push(TreeNode::new(record, parent));
            if let Some(parent) = parent {
                self.nodes[parent].children.push(id);
            }
            // Reverse push keeps original child order on pop
            stack.extend(record.nested_sequences.iter().rev().map(|child| (child, Some(id))));
        }
        first
    }

    fn is_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.nodes[node].parent {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }
}

impl fmt::Debug for InvocationTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationTree")
            .field("nodes", &self.nodes.len())
            .field("roots", &self.roots)
            .field("span_lookup", &self.lookup.is_some())
            .finish()
    }
}

/// Builds [`InvocationTree`]s from hydrated records
#[derive(Clone, Default)]
pub struct TraceCorrelator {
    lookup: Option<Arc<dyn SpanLookup>>,
}

impl TraceCorrelator {
    /// Correlator without span details
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach span details from `lookup` to built trees
    pub fn with_span_lookup(mut self, lookup: Arc<dyn SpanLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    fn empty_tree(&self) -> InvocationTree {
        InvocationTree {
            nodes: Vec::new(),
            roots: Vec::new(),
            lookup: self.lookup.clone(),
        }
    }

    /// Tree of one record's own call structure, 1:1 with its nodes
    pub fn single(&self, record: &InvocationSequence) -> InvocationTree {
        let mut tree = self.empty_tree();
        let root = tree.append_subtree(record, None);
        tree.roots.push(root);
        tree
    }

    /// Forest over records of one trace
    ///
    /// Records are laid out by timestamp, then id. A record is placed under
    /// the node carrying its parent span when that node exists and is not
    /// inside the record's own subtree.
    pub fn aggregate<I, R>(&self, records: I) -> InvocationTree
    where
        I: IntoIterator<Item = R>,
        R: Borrow<InvocationSequence>,
    {
        let mut records: Vec<R> = records.into_iter().collect();
        records.sort_by_key(|r| {
            let r: &InvocationSequence = r.borrow();
            (r.timestamp, r.id)
        });

        let mut tree = self.empty_tree();
        let tops: Vec<NodeId> = records
            .iter()
            .map(|r| tree.append_subtree(r.borrow(), None))
            .collect();

        let mut spans = SpanIndex::default();
        for (id, node) in tree.nodes.iter().enumerate() {
            if let Some(ident) = node.record.span_ident {
                spans.entry(ident.span_id).or_insert(id);
            }
        }

        let mut attached = 0usize;
        for &top in &tops {
            let parent = tree.nodes[top]
                .record
                .span_ident
                .and_then(|ident| ident.parent_span_id)
                .and_then(|parent_span| spans.get(&parent_span).copied())
                .filter(|&candidate| !tree.is_ancestor(top, candidate));

            match parent {
                Some(parent) => {
                    tree.nodes[top].parent = Some(parent);
                    tree.nodes[parent].children.push(top);
                    attached += 1;
                }
                None => tree.roots.push(top),
            }
        }

        debug!(
            records = tops.len(),
            attached,
            roots = tree.roots.len(),
            "aggregated trace forest"
        );
        tree
    }
}

impl fmt::Debug for TraceCorrelator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceCorrelator")
            .field("span_lookup", &self.lookup.is_some())
            .finish()
    }
}
