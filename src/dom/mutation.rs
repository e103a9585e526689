//! Mutation records, the equivalent of `MutationObserver` entries.

use compact_str::CompactString;
use smallvec::SmallVec;

use super::NodeId;

/// A single observed DOM change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRecord {
    /// Children were inserted into or removed from `target`.
    ChildList {
        target: NodeId,
        added: SmallVec<[NodeId; 4]>,
        removed: SmallVec<[NodeId; 4]>,
    },
    /// Attribute `name` of `target` changed.
    Attribute {
        target: NodeId,
        name: CompactString,
        old_value: Option<CompactString>,
    },
}

impl MutationRecord {
    /// Node the mutation happened on.
    pub fn target(&self) -> NodeId {
        match self {
            Self::ChildList { target, .. } | Self::Attribute { target, .. } => *target,
        }
    }

    /// Nodes inserted by this record.
    pub fn added_nodes(&self) -> &[NodeId] {
        match self {
            Self::ChildList { added, .. } => added,
            Self::Attribute { .. } => &[],
        }
    }

    /// Attribute name for attribute records.
    pub fn attribute_name(&self) -> Option<&str> {
        match self {
            Self::Attribute { name, .. } => Some(name),
            Self::ChildList { .. } => None,
        }
    }
}

/// Records delivered together in one observer callback.
pub type MutationBatch = Vec<MutationRecord>;
