//! Nested helper tree
//!
//! Procedure tags are split on `.` and the helpers are placed in a tree of
//! namespaces: `users.get` and `users.updateName` both live under the
//! `users` namespace. A segment is either a namespace or a procedure, never
//! both, whatever order the procedures are inserted in.

use crate::helper::{HelperContext, MutationHelper, ProcedureHelper, QueryHelper};
use crate::logging::log_procedure_registered;
use crate::{ClientError, ClientResult, ProcedureKind, RpcGroup};
use std::collections::BTreeMap;

/// Root-level names taken by the client's own methods.
pub const RESERVED_ROOT_NAMES: &[&str] = &["pathKey", "queryFilter"];

/// One entry of a [`HelperTree`].
#[derive(Debug, Clone)]
pub enum HelperNode {
    /// A procedure helper
    Procedure(ProcedureHelper),
    /// A nested namespace
    Namespace(HelperTree),
}

/// Immutable tree of procedure helpers keyed by tag segment.
#[derive(Debug, Clone, Default)]
pub struct HelperTree {
    nodes: BTreeMap<String, HelperNode>,
}

impl HelperTree {
    /// Build the tree for every procedure in `group`.
    pub(crate) fn build(group: &RpcGroup, context: &HelperContext) -> ClientResult<Self> {
        let mut root = Self::default();
        for procedure in group {
            let tag = procedure.tag().to_string();
            if RESERVED_ROOT_NAMES.contains(&tag.as_str()) {
                return Err(ClientError::ReservedName { tag });
            }

            let segments: Vec<String> = tag.split('.').map(str::to_string).collect();
            let helper = ProcedureHelper::new(procedure.clone(), context.clone());
            root.insert(&tag, &segments, helper)?;
            log_procedure_registered(&tag, procedure.kind, procedure.rpc.is_stream());
        }
        Ok(root)
    }

    fn insert(&mut self, tag: &str, segments: &[String], helper: ProcedureHelper) -> ClientResult<()> {
        let conflict = |segment: &str| ClientError::PathConflict {
            path: tag.to_string(),
            segment: segment.to_string(),
        };

        let Some((leaf, parents)) = segments.split_last() else {
            return Err(conflict(""));
        };

        let mut cursor = self;
        for segment in parents {
            let node = cursor
                .nodes
                .entry(segment.clone())
                .or_insert_with(|| HelperNode::Namespace(HelperTree::default()));
            cursor = match node {
                HelperNode::Namespace(tree) => tree,
                HelperNode::Procedure(_) => return Err(conflict(segment)),
            };
        }

        match cursor.nodes.get(leaf) {
            None => {
                cursor.nodes.insert(leaf.clone(), HelperNode::Procedure(helper));
                Ok(())
            }
            Some(HelperNode::Namespace(_)) => Err(conflict(leaf)),
            Some(HelperNode::Procedure(_)) => Err(ClientError::DuplicateTag {
                tag: tag.to_string(),
            }),
        }
    }

    /// The node directly under `segment`.
    pub fn get(&self, segment: &str) -> Option<&HelperNode> {
        self.nodes.get(segment)
    }

    /// The namespace directly under `segment`.
    pub fn namespace(&self, segment: &str) -> Option<&HelperTree> {
        match self.nodes.get(segment) {
            Some(HelperNode::Namespace(tree)) => Some(tree),
            _ => None,
        }
    }

    /// The helper at a dotted path, e.g. `users.get`.
    pub fn procedure(&self, path: &str) -> ClientResult<&ProcedureHelper> {
        let unknown = || ClientError::UnknownProcedure {
            path: path.to_string(),
        };

        let mut segments = path.split('.').peekable();
        let mut cursor = self;
        while let Some(segment) = segments.next() {
            let node = cursor.nodes.get(segment).ok_or_else(unknown)?;
            match (node, segments.peek().is_some()) {
                (HelperNode::Namespace(tree), true) => cursor = tree,
                (HelperNode::Procedure(helper), false) => return Ok(helper),
                _ => return Err(unknown()),
            }
        }
        Err(unknown())
    }

    /// The query helper at a dotted path.
    pub fn query(&self, path: &str) -> ClientResult<&QueryHelper> {
        match self.procedure(path)? {
            ProcedureHelper::Query(helper) => Ok(helper),
            ProcedureHelper::Mutation(_) => Err(ClientError::KindMismatch {
                path: path.to_string(),
                expected: ProcedureKind::Query,
                actual: ProcedureKind::Mutation,
            }),
        }
    }

    /// The mutation helper at a dotted path.
    pub fn mutation(&self, path: &str) -> ClientResult<&MutationHelper> {
        match self.procedure(path)? {
            ProcedureHelper::Mutation(helper) => Ok(helper),
            ProcedureHelper::Query(_) => Err(ClientError::KindMismatch {
                path: path.to_string(),
                expected: ProcedureKind::Mutation,
                actual: ProcedureKind::Query,
            }),
        }
    }

    /// Segment names at this level, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Every helper in the tree, depth first, in segment order.
    pub fn procedures(&self) -> Vec<&ProcedureHelper> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a ProcedureHelper>) {
        for node in self.nodes.values() {
            match node {
                HelperNode::Procedure(helper) => out.push(helper),
                HelperNode::Namespace(tree) => tree.collect(out),
            }
        }
    }

    /// Number of entries at this level.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when this level has no entries.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
