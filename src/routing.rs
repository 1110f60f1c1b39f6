//! Static table → routing group mapping.
//!
//! The routing file is a YAML map from group name to the tables it owns:
//!
//! ```yaml
//! orders:
//!   - orders
//!   - order_items
//! customers:
//!   - customers
//! ```
//!
//! It is inverted once at startup and never mutated afterwards, so lookups
//! need no locking.

use crate::{Error, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    table_to_group: HashMap<String, String>,
}

impl RoutingTable {
    /// Loads and inverts the YAML routing file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the file is missing, is not a `group -> [tables]` map,
    /// or lists the same table under two groups.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let groups: HashMap<String, Vec<String>> =
            serde_yaml::from_str(&content).map_err(|e| {
                Error::Routing(format!("invalid table groups in {}: {}", path.display(), e))
            })?;

        let table = Self::from_groups(groups)?;
        info!(
            path = %path.display(),
            tables = table.len(),
            "Loaded table groups"
        );
        Ok(table)
    }

    /// Builds the table from an in-memory `group -> [tables]` map.
    pub fn from_groups<I, T>(groups: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, T)>,
        T: IntoIterator<Item = String>,
    {
        let mut table_to_group = HashMap::new();

        for (group, tables) in groups {
            for table in tables {
                if let Some(existing) = table_to_group.get(&table) {
                    if existing != &group {
                        return Err(Error::Routing(format!(
                            "table '{}' is listed under both '{}' and '{}'",
                            table, existing, group
                        )));
                    }
                    continue;
                }
                debug!(table = %table, group = %group, "Routing entry");
                table_to_group.insert(table, group.clone());
            }
        }

        Ok(Self { table_to_group })
    }

    /// Returns the group a table is routed to, or `None` if it is not monitored.
    pub fn lookup(&self, table: &str) -> Option<&str> {
        self.table_to_group.get(table).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.table_to_group.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table_to_group.is_empty()
    }
}
