//! Preview renderer: prints a compiled filter as a SELECT using sea-query.
//!
//! Bound parameters are inlined with the dialect's own value quoting, so the
//! output is meant for display and debugging, not for execution.

use crate::ast::{Relation, Value};
use crate::compiler::CompiledFilter;
use crate::config::Dialect;
use crate::error::RenderError;
use crate::filter::{Expression, FilterNode, VariableTable};
use crate::model::QueryContext;
use sea_query::{
    Asterisk, Condition as SqlCondition, Expr, Iden, MysqlQueryBuilder, PostgresQueryBuilder,
    QueryBuilder, SelectStatement, SqliteQueryBuilder, Value as SqlValue,
};

/// Table or alias identifier for sea-query
#[derive(Debug, Clone)]
pub struct TableName(pub String);

impl Iden for TableName {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        let _ = s.write_str(&self.0);
    }
}

/// Renders `SELECT * FROM <tables> WHERE <filter>`.
///
/// The FROM list is the context's registered tables, or `default_table`
/// when nothing was registered.
pub fn render_select(
    compiled: &CompiledFilter,
    ctx: &QueryContext,
    default_table: &str,
    dialect: Dialect,
) -> Result<String, RenderError> {
    match dialect {
        Dialect::MySql => render_with(MysqlQueryBuilder, compiled, ctx, default_table),
        Dialect::Sqlite => render_with(SqliteQueryBuilder, compiled, ctx, default_table),
        Dialect::Postgres | Dialect::Generic => {
            render_with(PostgresQueryBuilder, compiled, ctx, default_table)
        }
    }
}

fn render_with<B: QueryBuilder>(
    builder: B,
    compiled: &CompiledFilter,
    ctx: &QueryContext,
    default_table: &str,
) -> Result<String, RenderError> {
    let mut select = SelectStatement::new();
    select.column(Asterisk);

    if ctx.tables().is_empty() {
        select.from(TableName(default_table.to_string()));
    }
    for table in ctx.tables() {
        match &table.alias {
            Some(alias) => {
                select.from_as(TableName(table.name.clone()), TableName(alias.clone()));
            }
            None => {
                select.from(TableName(table.name.clone()));
            }
        }
    }

    if let Some(tree) = &compiled.tree {
        let renderer = NodeRenderer {
            builder: &builder,
            vars: &compiled.variables,
        };
        select.cond_where(renderer.condition(tree)?);
    }

    Ok(select.to_string(builder))
}

struct NodeRenderer<'a, B> {
    builder: &'a B,
    vars: &'a VariableTable,
}

impl<B: QueryBuilder> NodeRenderer<'_, B> {
    fn condition(&self, node: &FilterNode) -> Result<SqlCondition, RenderError> {
        let condition = match node {
            FilterNode::Set(set) => {
                let mut condition = match set.relation {
                    Relation::And => SqlCondition::all(),
                    Relation::Or => SqlCondition::any(),
                };
                for child in &set.children {
                    condition = condition.add(self.condition(child)?);
                }
                if set.negated {
                    condition = condition.not();
                }
                condition
            }
            leaf => SqlCondition::all().add(Expr::cust(self.leaf_text(leaf)?)),
        };

        Ok(if node.is_not() { condition.not() } else { condition })
    }

    fn leaf_text(&self, node: &FilterNode) -> Result<String, RenderError> {
        Ok(match node {
            FilterNode::Unary { expr, op, .. } => format!("{} {}", self.expression(expr)?, op),
            FilterNode::Binary {
                expr1, expr2, op, ..
            } => format!(
                "{} {} {}",
                self.expression(expr1)?,
                op,
                self.expression(expr2)?
            ),
            FilterNode::Trinary {
                expr1,
                expr2,
                expr3,
                op,
                ..
            } => format!(
                "{} {} {} AND {}",
                self.expression(expr1)?,
                op,
                self.expression(expr2)?,
                self.expression(expr3)?
            ),
            FilterNode::Set(_) => String::new(),
        })
    }

    fn expression(&self, expr: &Expression) -> Result<String, RenderError> {
        expr.substitute(|name| {
            let value = self
                .vars
                .get(name)
                .ok_or_else(|| RenderError::UnboundParameter(name.to_string()))?;
            Ok(self.builder.value_to_string(&to_sql_value(value)))
        })
    }
}

/// Convert a bound literal to a sea-query value
fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::String(s) | Value::Date(s) | Value::Time(s) | Value::Timestamp(s) => {
            SqlValue::String(Some(Box::new(s.clone())))
        }
        Value::Integer(n) => SqlValue::BigInt(Some(*n)),
        Value::Double(d) => SqlValue::Double(Some(*d)),
        Value::Boolean(b) => SqlValue::Bool(Some(*b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{
        AttributeRef, Condition, ConditionItem, ConditionValue, HierarchyItem, JunctionOperator,
        Operator,
    };
    use crate::compiler::FilterCompiler;
    use crate::config::ModelConfig;
    use crate::filter::FilterOp;
    use std::sync::Arc;

    fn condition(entity: &str, attribute: &str, condition: Condition) -> HierarchyItem<ConditionItem> {
        HierarchyItem::Condition {
            level: 0,
            item: ConditionItem {
                attribute: AttributeRef::new(entity, attribute),
                condition,
            },
        }
    }

    #[test]
    fn test_render_logical_compile() {
        let config = ModelConfig::sample();
        let mut ctx = QueryContext::logical(Arc::new(config.model));
        let items = vec![
            condition(
                "Customer",
                "State",
                Condition::new(Operator::EqualTo, vec![ConditionValue::Literal(Value::string("CA"))]),
            ),
            HierarchyItem::Junction(JunctionOperator::or(0)),
            condition(
                "Order",
                "Status",
                Condition::new(Operator::StartingWith, vec![ConditionValue::Literal(Value::string("ship"))]),
            ),
        ];

        let compiled = FilterCompiler::new().compile(&items, &mut ctx).unwrap();
        let sql = render_select(&compiled, &ctx, "unused", Dialect::Postgres).unwrap();

        assert!(sql.starts_with("SELECT * FROM"));
        assert!(sql.contains(r#""customers" AS "c""#));
        assert!(sql.contains(r#""orders" AS "o""#));
        assert!(sql.contains("c.state = 'CA'"));
        assert!(sql.contains("o.status LIKE 'ship%'"));
        assert!(sql.contains(" OR "));
        assert!(!sql.contains("unused"));
    }

    #[test]
    fn test_render_negation_and_default_table() {
        let mut ctx = QueryContext::physical();
        let items = vec![HierarchyItem::Condition {
            level: 0,
            item: ConditionItem {
                attribute: AttributeRef::column("qty"),
                condition: Condition::new(
                    Operator::Between,
                    vec![
                        ConditionValue::Literal(Value::Integer(1)),
                        ConditionValue::Literal(Value::Integer(5)),
                    ],
                )
                .negate(),
            },
        }];

        let compiled = FilterCompiler::new().compile(&items, &mut ctx).unwrap();
        let sql = render_select(&compiled, &ctx, "stock", Dialect::Sqlite).unwrap();

        assert!(sql.contains(r#"FROM "stock""#));
        assert!(sql.contains("NOT"));
        assert!(sql.contains("qty BETWEEN 1 AND 5"));
    }

    #[test]
    fn test_render_without_filter() {
        let compiled = CompiledFilter {
            tree: None,
            variables: VariableTable::new(),
        };
        let sql = render_select(&compiled, &QueryContext::physical(), "stock", Dialect::MySql).unwrap();
        assert_eq!(sql, "SELECT * FROM `stock`");
    }

    #[test]
    fn test_unbound_parameter() {
        let compiled = CompiledFilter {
            tree: Some(FilterNode::binary(
                Expression::Field("a".to_string()),
                Expression::Variable("p9".to_string()),
                FilterOp::Eq,
            )),
            variables: VariableTable::new(),
        };
        let err = render_select(&compiled, &QueryContext::physical(), "t", Dialect::Generic).unwrap_err();
        assert_eq!(err, RenderError::UnboundParameter("p9".to_string()));
    }

    #[test]
    fn test_bound_text_resembling_a_reference_is_inlined_verbatim() {
        let mut ctx = QueryContext::physical();
        let values = ConditionValue::Array(vec![Value::string("$(p2)"), Value::string("x")]);
        let items = vec![HierarchyItem::Condition {
            level: 0,
            item: ConditionItem {
                attribute: AttributeRef::column("name"),
                condition: Condition::new(Operator::OneOf, vec![values]),
            },
        }];

        let compiled = FilterCompiler::new().compile(&items, &mut ctx).unwrap();
        let sql = render_select(&compiled, &ctx, "t", Dialect::Postgres).unwrap();
        assert!(sql.contains("name IN ('$(p2)','x')"), "{}", sql);
    }

    #[test]
    fn test_pattern_text_resembling_a_reference_is_not_a_parameter() {
        let mut ctx = QueryContext::physical();
        let items = vec![HierarchyItem::Condition {
            level: 0,
            item: ConditionItem {
                attribute: AttributeRef::column("note"),
                condition: Condition::new(
                    Operator::Contains,
                    vec![ConditionValue::Literal(Value::string("$(p1)"))],
                ),
            },
        }];

        let compiled = FilterCompiler::new().compile(&items, &mut ctx).unwrap();
        assert!(compiled.variables.is_empty());
        let sql = render_select(&compiled, &ctx, "t", Dialect::Postgres).unwrap();
        assert!(sql.contains("note LIKE '%$(p1)%'"), "{}", sql);
    }
}
