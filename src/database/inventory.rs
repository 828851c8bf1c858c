//! Instance/hypervisor inventory query building and fetching
//!
//! The query joins the instance, hypervisor-service, network-info-cache, and
//! flavor metadata tables, restricted to active instances with non-deleted
//! flavor metadata. User filters are collected as structured predicate pairs
//! (SQL fragment + bound parameters appended as one unit), so the placeholder
//! order and the parameter order cannot drift apart.

use anyhow::{anyhow, Result};
use rusqlite::{params_from_iter, Connection};
use tracing::debug;

/// One row per active compute instance, immutable once fetched
#[derive(Debug, Clone)]
pub struct InstanceRecord {
    pub hostname: String,
    pub uuid: String,
    pub user_id: String,
    pub project_id: String,
    pub created_at: String,
    /// Hypervisor service host name
    pub host: String,
    /// Non-zero when the hypervisor service is administratively disabled
    pub disabled: i64,
    pub disabled_reason: Option<String>,
    /// Serialized network-info blob (JSON)
    pub network_info: String,
    /// Flavor (instance type) name
    pub flavor: String,
}

/// User-supplied filters for the inventory query
#[derive(Debug, Clone, Default)]
pub struct InstanceFilters {
    /// Fuzzy hostname substring
    pub name: Option<String>,
    /// Environment prefix on the hostname
    pub env: Option<String>,
    /// Project identifier (already resolved from a name)
    pub project_id: Option<String>,
    /// Owning user identifier
    pub user_id: Option<String>,
    /// Fuzzy hypervisor host substrings, OR-combined
    pub hypervisors: Vec<String>,
}

const BASE_QUERY: &str = "\
SELECT  instances.hostname,
        instances.uuid,
        instances.user_id,
        instances.project_id,
        instances.created_at,
        services.host,
        services.disabled,
        services.disabled_reason,
        instance_info_caches.network_info,
        instance_types.name
FROM services
JOIN instances ON services.host = instances.host
JOIN instance_info_caches ON instance_info_caches.instance_uuid = instances.uuid
JOIN instance_system_metadata ON instance_system_metadata.instance_uuid = instances.uuid
JOIN instance_types ON instance_system_metadata.value = instance_types.flavorid
WHERE instances.vm_state = 'active'
  AND instance_types.deleted_at IS NULL
  AND instance_system_metadata.key = 'instance_type_flavorid'";

/// A single WHERE predicate with its bound parameters
#[derive(Debug, Clone)]
struct Predicate {
    fragment: String,
    params: Vec<String>,
}

/// Parameterized inventory query
///
/// Predicates carry their parameters with them; `sql()` and `params()`
/// flatten both in the same insertion order.
#[derive(Debug, Clone, Default)]
pub struct InventoryQuery {
    predicates: Vec<Predicate>,
}

impl InventoryQuery {
    /// Build a query from the user-supplied filter set
    pub fn from_filters(filters: &InstanceFilters) -> Self {
        let mut query = Self::default();

        if let Some(name) = &filters.name {
            query.push("instances.hostname LIKE ?", vec![format!("%{}%", name)]);
        }
        if let Some(env) = &filters.env {
            query.push("instances.hostname LIKE ?", vec![format!("{}%", env)]);
        }
        if let Some(project_id) = &filters.project_id {
            query.push("instances.project_id = ?", vec![project_id.clone()]);
        }
        if let Some(user_id) = &filters.user_id {
            query.push("instances.user_id = ?", vec![user_id.clone()]);
        }
        if !filters.hypervisors.is_empty() {
            let fragment = format!(
                "({})",
                vec!["services.host LIKE ?"; filters.hypervisors.len()].join(" OR ")
            );
            let params = filters
                .hypervisors
                .iter()
                .map(|h| format!("%{}%", h))
                .collect();
            query.push(&fragment, params);
        }

        query
    }

    fn push(&mut self, fragment: &str, params: Vec<String>) {
        self.predicates.push(Predicate {
            fragment: fragment.to_string(),
            params,
        });
    }

    /// Final SQL text, ordered by hostname ascending
    pub fn sql(&self) -> String {
        let mut sql = BASE_QUERY.to_string();
        for predicate in &self.predicates {
            sql.push_str("\n  AND ");
            sql.push_str(&predicate.fragment);
        }
        sql.push_str("\nORDER BY instances.hostname ASC");
        sql
    }

    /// Bound parameters, flattened in predicate insertion order
    pub fn params(&self) -> Vec<String> {
        self.predicates
            .iter()
            .flat_map(|p| p.params.iter().cloned())
            .collect()
    }
}

/// Execute the inventory query, returning records in hostname order
///
/// Connection and query errors surface to the caller; there is no retry and
/// no partial-results mode.
pub fn fetch_instances(conn: &Connection, query: &InventoryQuery) -> Result<Vec<InstanceRecord>> {
    let sql = query.sql();
    let params = query.params();
    debug!("fetching instances with {} bound parameters", params.len());

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| anyhow!("Failed to prepare inventory query: {}", e))?;

    let rows = stmt
        .query_map(params_from_iter(params.iter()), |row| {
            Ok(InstanceRecord {
                hostname: row.get(0)?,
                uuid: row.get(1)?,
                user_id: row.get(2)?,
                project_id: row.get(3)?,
                created_at: row.get(4)?,
                host: row.get(5)?,
                disabled: row.get(6)?,
                disabled_reason: row.get(7)?,
                network_info: row.get(8)?,
                flavor: row.get(9)?,
            })
        })
        .map_err(|e| anyhow!("Failed to execute inventory query: {}", e))?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row.map_err(|e| anyhow!("Failed to read instance row: {}", e))?);
    }
    Ok(records)
}
