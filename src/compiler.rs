//! End-to-end compilation of a condition list into a filter tree.

use crate::ast::{ConditionItem, HierarchyItem};
use crate::config::CompilerConfig;
use crate::error::CompileError;
use crate::filter::{FilterNode, VariableTable};
use crate::lowering::ConditionLowering;
use crate::model::QueryContext;
use crate::resolver::ExpressionResolver;
use crate::tree_builder::{validate, TreeBuilder};
use tracing::debug;

/// Result of one compile call, owned by the caller
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFilter {
    /// `None` when the condition list was empty.
    pub tree: Option<FilterNode>,
    pub variables: VariableTable,
}

/// Compiles condition lists: resolve, lower, then build the tree.
///
/// Holds configuration only. Each `compile` call uses a fresh lowering handler
/// and variable table, so one compiler can serve concurrent compiles as long as
/// every call gets its own `QueryContext`.
#[derive(Debug, Clone, Default)]
pub struct FilterCompiler {
    config: CompilerConfig,
    resolver: ExpressionResolver,
}

impl FilterCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: CompilerConfig) -> Self {
        Self {
            config,
            resolver: ExpressionResolver::new(),
        }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn compile(
        &self,
        items: &[HierarchyItem<ConditionItem>],
        ctx: &mut QueryContext,
    ) -> Result<CompiledFilter, CompileError> {
        validate(items)?;

        let mut lowering = ConditionLowering::new(&self.config);
        let mut variables = VariableTable::new();
        let mut lowered = Vec::with_capacity(items.len());

        for item in items {
            let node = item.try_map(|condition| {
                let target = self.resolver.resolve_typed(&condition.attribute, ctx)?;
                lowering.lower(&target, &condition.condition, ctx, &mut variables)
            })?;
            lowered.push(node);
        }

        let tree = TreeBuilder::new(self.config.max_depth).build(&lowered, 0)?;
        debug!(
            items = items.len(),
            parameters = variables.len(),
            tables = ctx.tables().len(),
            "compiled condition list"
        );

        Ok(CompiledFilter { tree, variables })
    }
}
