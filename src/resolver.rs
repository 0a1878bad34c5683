//! Resolves attribute references to SQL expressions.

use crate::ast::{AttributeRef, SqlType};
use crate::error::CompileError;
use crate::filter::Expression;
use crate::model::{Binding, QueryContext, TableRef};
use std::sync::Arc;

/// An expression together with the declared type of the column behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAttribute {
    pub expr: Expression,
    pub sql_type: Option<SqlType>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionResolver;

impl ExpressionResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(
        &self,
        attribute: &AttributeRef,
        ctx: &mut QueryContext,
    ) -> Result<Expression, CompileError> {
        Ok(self.resolve_typed(attribute, ctx)?.expr)
    }

    /// Resolves `attribute` and reports the column type it maps to.
    ///
    /// Against a logical model the physical table is registered into `ctx`
    /// (under its partition alias, once). Nothing else touches `ctx`.
    pub fn resolve_typed(
        &self,
        attribute: &AttributeRef,
        ctx: &mut QueryContext,
    ) -> Result<ResolvedAttribute, CompileError> {
        if let Some(expression) = &attribute.expression {
            return Ok(ResolvedAttribute {
                expr: Expression::Literal(expression.clone()),
                sql_type: attribute.sql_type,
            });
        }

        let Some(entity_name) = &attribute.entity else {
            return Ok(ResolvedAttribute {
                expr: Expression::Field(attribute.attribute.clone()),
                sql_type: attribute.sql_type,
            });
        };

        let model = match ctx.binding() {
            Binding::Logical(model) => Arc::clone(model),
            Binding::Physical => {
                return Ok(ResolvedAttribute {
                    expr: Expression::Field(format!("{}.{}", entity_name, attribute.attribute)),
                    sql_type: attribute.sql_type,
                });
            }
        };

        let entity = model
            .entity(entity_name)
            .ok_or_else(|| CompileError::EntityNotFound(entity_name.clone()))?;
        let column = entity
            .attribute(&attribute.attribute)
            .ok_or_else(|| CompileError::AttributeNotFound {
                entity: entity_name.clone(),
                attribute: attribute.attribute.clone(),
            })?;

        let alias = model.partition.alias_for(&column.table).map(str::to_string);
        let table = TableRef::new(column.table.clone(), alias);
        let qualifier = table.reference_name().to_string();
        ctx.register_table(table);

        Ok(ResolvedAttribute {
            expr: Expression::Field(format!("{}.{}", qualifier, column.column)),
            sql_type: column.sql_type.or(attribute.sql_type),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;

    fn logical_context() -> QueryContext {
        QueryContext::logical(Arc::new(ModelConfig::sample().model))
    }

    #[test]
    fn test_expression_reference_is_returned_verbatim() {
        let mut ctx = logical_context();
        let attribute = AttributeRef::expression("Margin", "o.total - o.cost");
        let expr = ExpressionResolver::new().resolve(&attribute, &mut ctx).unwrap();
        assert_eq!(expr, Expression::Literal("o.total - o.cost".to_string()));
        assert!(ctx.tables().is_empty());
    }

    #[test]
    fn test_unqualified_reference_is_a_bare_field() {
        let mut ctx = logical_context();
        let expr = ExpressionResolver::new()
            .resolve(&AttributeRef::column("state"), &mut ctx)
            .unwrap();
        assert_eq!(expr, Expression::Field("state".to_string()));
        assert!(ctx.tables().is_empty());
    }

    #[test]
    fn test_logical_reference_registers_aliased_table_once() {
        let mut ctx = logical_context();
        let resolver = ExpressionResolver::new();

        let name = resolver
            .resolve_typed(&AttributeRef::new("Customer", "Name"), &mut ctx)
            .unwrap();
        assert_eq!(name.expr, Expression::Field("c.cust_name".to_string()));
        assert_eq!(name.sql_type, Some(SqlType::Varchar));

        resolver
            .resolve(&AttributeRef::new("Customer", "State"), &mut ctx)
            .unwrap();
        resolver
            .resolve(&AttributeRef::new("Order", "Total"), &mut ctx)
            .unwrap();

        let tables: Vec<_> = ctx.tables().iter().map(|t| t.reference_name()).collect();
        assert_eq!(tables, vec!["c", "o"]);
    }

    #[test]
    fn test_missing_entity_and_attribute() {
        let mut ctx = logical_context();
        let resolver = ExpressionResolver::new();

        let err = resolver
            .resolve(&AttributeRef::new("Vendor", "Name"), &mut ctx)
            .unwrap_err();
        assert_eq!(err, CompileError::EntityNotFound("Vendor".to_string()));

        let err = resolver
            .resolve(&AttributeRef::new("Customer", "Phone"), &mut ctx)
            .unwrap_err();
        assert_eq!(
            err,
            CompileError::AttributeNotFound {
                entity: "Customer".to_string(),
                attribute: "Phone".to_string(),
            }
        );
        assert!(ctx.tables().is_empty());
    }

    #[test]
    fn test_physical_reference_leaves_context_untouched() {
        let mut ctx = QueryContext::physical();
        let attribute = AttributeRef::new("orders", "status").with_type(SqlType::Varchar);
        let resolved = ExpressionResolver::new()
            .resolve_typed(&attribute, &mut ctx)
            .unwrap();
        assert_eq!(resolved.expr, Expression::Field("orders.status".to_string()));
        assert_eq!(resolved.sql_type, Some(SqlType::Varchar));
        assert!(ctx.tables().is_empty());
    }
}
