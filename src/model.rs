//! Logical model and the per-compile query context.

use crate::ast::SqlType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Business-facing entities mapped onto the physical tables of a partition.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LogicalModel {
    pub name: String,
    pub partition: Partition,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

impl LogicalModel {
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl Entity {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attribute| attribute.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub table: String,
    pub column: String,
    #[serde(default)]
    pub sql_type: Option<SqlType>,
}

/// Physical tables of a data source, with optional aliases.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Partition {
    pub name: String,
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

impl Partition {
    pub fn alias_for(&self, table: &str) -> Option<&str> {
        self.aliases.get(table).map(String::as_str)
    }
}

/// What attribute references are compiled against.
#[derive(Debug, Clone, Default)]
pub enum Binding {
    /// `entity.attribute` names physical `table.column` directly.
    #[default]
    Physical,
    Logical(Arc<LogicalModel>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

impl TableRef {
    pub fn new(name: impl Into<String>, alias: Option<String>) -> Self {
        Self {
            name: name.into(),
            alias,
        }
    }

    pub fn reference_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// The enclosing query: its binding and active table list.
///
/// Owned by the caller and mutated in place during resolution. Not meant to be
/// shared between concurrent compiles; give each compile its own context.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    binding: Binding,
    tables: Vec<TableRef>,
}

impl QueryContext {
    pub fn physical() -> Self {
        Self::default()
    }

    pub fn logical(model: Arc<LogicalModel>) -> Self {
        Self {
            binding: Binding::Logical(model),
            tables: Vec::new(),
        }
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    pub fn tables(&self) -> &[TableRef] {
        &self.tables
    }

    /// Adds `table` unless a table with the same reference name is present.
    /// Returns whether the list changed.
    pub fn register_table(&mut self, table: TableRef) -> bool {
        if self
            .tables
            .iter()
            .any(|existing| existing.reference_name() == table.reference_name())
        {
            return false;
        }

        tracing::debug!(table = %table.name, alias = ?table.alias, "registering table");
        self.tables.push(table);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_table_is_idempotent() {
        let mut ctx = QueryContext::physical();
        assert!(ctx.register_table(TableRef::new("orders", Some("o".to_string()))));
        assert!(!ctx.register_table(TableRef::new("orders", Some("o".to_string()))));
        assert!(ctx.register_table(TableRef::new("customers", None)));
        assert_eq!(ctx.tables().len(), 2);
        assert_eq!(ctx.tables()[0].reference_name(), "o");
        assert_eq!(ctx.tables()[1].reference_name(), "customers");
    }

    #[test]
    fn test_model_lookup() {
        let model = LogicalModel {
            name: "sales".to_string(),
            partition: Partition::default(),
            entities: vec![Entity {
                name: "Customer".to_string(),
                attributes: vec![Attribute {
                    name: "Name".to_string(),
                    table: "customers".to_string(),
                    column: "cust_name".to_string(),
                    sql_type: Some(SqlType::Varchar),
                }],
            }],
        };

        let entity = model.entity("Customer").unwrap();
        assert_eq!(entity.attribute("Name").unwrap().column, "cust_name");
        assert!(entity.attribute("Missing").is_none());
        assert!(model.entity("Missing").is_none());
    }
}
