//! Builds the boolean filter tree from a leveled item sequence.
//!
//! ## Splitting order
//!
//! At a fixed grouping level the sequence is split on the loosest-binding
//! junction present, so the root always reflects it:
//!
//! 1. `or`
//! 2. `and`
//! 3. `not and`
//! 4. `not or`
//!
//! Each part between split points is built again at the same level. When no
//! junction of the current level is left, a single item is the leaf itself and
//! anything longer is a deeper group, built at `level + 1`.
//!
//! ```text
//! A and B or C and D          (A or B) and (C or D)
//! ──────────────────          ─────────────────────
//!        OR                           AND
//!      /    \                       /     \
//!    AND    AND                   OR       OR
//!   /  \   /  \                  /  \     /  \
//!  A    B C    D                A    B   C    D
//! ```

use crate::ast::{HierarchyItem, JunctionOperator, Relation};
use crate::error::StructuralError;
use crate::filter::{FilterNode, FilterSet};
use tracing::debug;

/// Junction categories in the order they are split on.
const SPLIT_ORDER: [(Relation, bool); 4] = [
    (Relation::Or, false),
    (Relation::And, false),
    (Relation::And, true),
    (Relation::Or, true),
];

pub struct TreeBuilder {
    max_depth: usize,
}

impl TreeBuilder {
    /// `max_depth` bounds how many grouping levels deep the builder descends.
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Builds the tree for `items`, starting at grouping `level`.
    ///
    /// Returns `None` for an empty sequence. Leaves are cloned out of `items`.
    pub fn build(
        &self,
        items: &[HierarchyItem<FilterNode>],
        level: usize,
    ) -> Result<Option<FilterNode>, StructuralError> {
        if items.is_empty() {
            return Ok(None);
        }

        let ceiling = items.iter().map(HierarchyItem::level).max().unwrap_or(level);
        self.build_level(items, 0, level, ceiling).map(Some)
    }

    /// `offset` is the position of `items[0]` in the full sequence.
    fn build_level(
        &self,
        items: &[HierarchyItem<FilterNode>],
        offset: usize,
        level: usize,
        ceiling: usize,
    ) -> Result<FilterNode, StructuralError> {
        if level > self.max_depth {
            return Err(StructuralError::TooDeep {
                max_depth: self.max_depth,
            });
        }

        for (relation, negated) in SPLIT_ORDER {
            let splits: Vec<usize> = items
                .iter()
                .enumerate()
                .filter(|(_, item)| match item.as_junction() {
                    Some(junction) => is_split_point(junction, level, relation, negated),
                    None => false,
                })
                .map(|(index, _)| index)
                .collect();

            if splits.is_empty() {
                continue;
            }

            debug!(level, %relation, negated, parts = splits.len() + 1, "splitting");

            let mut set = FilterSet::new(relation, negated);
            let mut start = 0;

            for split in splits.iter().copied().chain(std::iter::once(items.len())) {
                let part = &items[start..split];

                if part.is_empty() {
                    let index = if split < items.len() { split } else { start - 1 };
                    return Err(StructuralError::DanglingJunction {
                        index: offset + index,
                        junction: items[index].as_junction().map(ToString::to_string).unwrap_or_default(),
                    });
                }

                set.children
                    .push(self.build_level(part, offset + start, level, ceiling)?);
                start = split + 1;
            }

            set.grouped = true;
            return Ok(FilterNode::Set(set));
        }

        match items {
            [HierarchyItem::Condition { item, .. }] => Ok(item.clone()),
            [HierarchyItem::Junction(junction)] => Err(StructuralError::MisplacedJunction {
                junction: junction.to_string(),
            }),
            _ if level >= ceiling => Err(StructuralError::Unresolved {
                remaining: items.len(),
                level,
            }),
            _ => self.build_level(items, offset, level + 1, ceiling),
        }
    }
}

/// A junction splits only in the category matching both relation and negation.
fn is_split_point(junction: &JunctionOperator, level: usize, relation: Relation, negated: bool) -> bool {
    junction.level == level && junction.relation == relation && junction.negated == negated
}

/// Checks that `items` alternates condition, junction, condition, ... and
/// ends on a condition.
pub fn validate<C>(items: &[HierarchyItem<C>]) -> Result<(), StructuralError> {
    for (index, item) in items.iter().enumerate() {
        let expect_condition = index % 2 == 0;

        if expect_condition && item.is_junction() {
            return Err(StructuralError::NotAlternating {
                index,
                expected: "condition",
            });
        }
        if !expect_condition && !item.is_junction() {
            return Err(StructuralError::NotAlternating {
                index,
                expected: "junction",
            });
        }
    }

    if let Some(last) = items.last().and_then(HierarchyItem::as_junction) {
        return Err(StructuralError::DanglingJunction {
            index: items.len() - 1,
            junction: last.to_string(),
        });
    }

    Ok(())
}
