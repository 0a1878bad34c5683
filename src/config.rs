//! Configuration: compiler options and JSON loading of the logical model.

use crate::ast::SqlType;
use crate::error::ConfigError;
use crate::model::{Attribute, Entity, LogicalModel, Partition};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// SQL dialect of the target database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    #[default]
    Generic,
    MySql,
    Postgres,
    Sqlite,
}

/// Marker strings the condition editor uses for values it cannot express directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentinelMarkers {
    /// Forces an IS NULL test.
    pub null: String,
    pub empty_string: String,
    // the literal text `null`
    pub null_string: String,
}

impl Default for SentinelMarkers {
    fn default() -> Self {
        Self {
            null: "__NULL__".to_string(),
            empty_string: "__EMPTY_STRING__".to_string(),
            null_string: "__NULL_STRING__".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub dialect: Dialect,
    pub parameter_prefix: String,
    pub markers: SentinelMarkers,
    /// Deepest grouping the tree builder accepts.
    pub max_depth: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::Generic,
            parameter_prefix: "p".to_string(),
            markers: SentinelMarkers::default(),
            max_depth: 64,
        }
    }
}

/// On-disk form of a logical model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub model: LogicalModel,
    #[serde(default)]
    pub compiler: CompilerConfig,
}

impl ModelConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(ConfigError::Missing(path_ref.display().to_string()));
        }

        let content = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_ref.display().to_string(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path_ref.display().to_string(),
            source,
        })
    }

    /// Built-in sample model (for the demo or as a fallback).
    pub fn sample() -> Self {
        let attribute = |name: &str, table: &str, column: &str, sql_type: SqlType| Attribute {
            name: name.to_string(),
            table: table.to_string(),
            column: column.to_string(),
            sql_type: Some(sql_type),
        };

        let mut aliases = HashMap::new();
        aliases.insert("customers".to_string(), "c".to_string());
        aliases.insert("orders".to_string(), "o".to_string());

        let model = LogicalModel {
            name: "Sales".to_string(),
            partition: Partition {
                name: "sales_partition".to_string(),
                aliases,
            },
            entities: vec![
                Entity {
                    name: "Customer".to_string(),
                    attributes: vec![
                        attribute("Name", "customers", "cust_name", SqlType::Varchar),
                        attribute("State", "customers", "state", SqlType::Varchar),
                        attribute("Active", "customers", "active", SqlType::Boolean),
                    ],
                },
                Entity {
                    name: "Order".to_string(),
                    attributes: vec![
                        attribute("Id", "orders", "order_id", SqlType::Integer),
                        attribute("Total", "orders", "total", SqlType::Double),
                        attribute("Placed", "orders", "placed_at", SqlType::Time),
                        attribute("Status", "orders", "status", SqlType::Varchar),
                    ],
                },
            ],
        };

        Self {
            model,
            compiler: CompilerConfig::default(),
        }
    }
}
