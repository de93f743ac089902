//! Destructive-change analysis.
//!
//! [`classify`] reads each operation's own [`Destructiveness`] in one linear
//! pass. There is no cross-operation reasoning: an `AddColumn` after a
//! `DropColumn` of the same name does not make the drop safe. A sequence is
//! destructive if and only if at least one of its operations is.
//!
//! Row deletions are never destructive here. Destructiveness tracks loss of
//! schema structure, so a migration full of `DeleteRows` passes the gate.
//! Callers who want a data-loss gate must inspect [`OperationKind::DeleteRows`]
//! entries themselves.

use serde::Serialize;

use crate::migration::OperationSequence;
use crate::operations::{Destructiveness, Operation, OperationKind};

/// The classification of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OperationClass {
    /// Index of the operation within its sequence.
    pub index: usize,
    /// The operation's kind.
    pub kind: OperationKind,
    /// Its destructiveness.
    pub destructiveness: Destructiveness,
}

/// The result of classifying a sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// One entry per operation, in sequence order.
    pub per_operation: Vec<OperationClass>,
    /// `true` if any operation is destructive.
    pub is_destructive: bool,
}

impl Classification {
    /// Indices of the destructive operations.
    pub fn destructive_indices(&self) -> Vec<usize> {
        self.indices_where(Destructiveness::Destructive)
    }

    /// Indices of operations that rename a schema object.
    pub fn rename_indices(&self) -> Vec<usize> {
        self.indices_where(Destructiveness::RenamePreserving)
    }

    fn indices_where(&self, wanted: Destructiveness) -> Vec<usize> {
        self.per_operation
            .iter()
            .filter(|c| c.destructiveness == wanted)
            .map(|c| c.index)
            .collect()
    }
}

/// Classifies every operation in `sequence`.
///
/// This is a pure function of the operations' contents.
pub fn classify(sequence: &OperationSequence) -> Classification {
    let per_operation: Vec<OperationClass> = sequence
        .iter()
        .enumerate()
        .map(|(index, op)| OperationClass {
            index,
            kind: op.kind(),
            destructiveness: op.destructiveness(),
        })
        .collect();
    let is_destructive = per_operation
        .iter()
        .any(|c| c.destructiveness == Destructiveness::Destructive);
    Classification {
        per_operation,
        is_destructive,
    }
}
