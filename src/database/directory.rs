//! Tenant/project directory lookup
//!
//! Loads the project table once and keeps two explicit read-only maps, one
//! per lookup direction, so project identifiers and names can never collide
//! in a shared key space.

use anyhow::{anyhow, Result};
use rusqlite::Connection;
use std::collections::HashMap;
use tracing::debug;

/// Read-only id <-> name lookup for tenant projects
pub struct ProjectDirectory {
    name_by_id: HashMap<String, String>,
    id_by_name: HashMap<String, String>,
}

impl ProjectDirectory {
    /// Load the full project table from the directory database
    pub fn load(conn: &Connection) -> Result<Self> {
        let mut stmt = conn
            .prepare("SELECT id, name FROM project")
            .map_err(|e| anyhow!("Failed to prepare project query: {}", e))?;

        let rows = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                let name: String = row.get(1)?;
                Ok((id, name))
            })
            .map_err(|e| anyhow!("Failed to query projects: {}", e))?;

        let mut name_by_id = HashMap::new();
        let mut id_by_name = HashMap::new();
        for row in rows {
            let (id, name) = row.map_err(|e| anyhow!("Failed to read project row: {}", e))?;
            name_by_id.insert(id.clone(), name.clone());
            id_by_name.insert(name, id);
        }

        debug!("loaded {} projects from directory", name_by_id.len());

        Ok(Self {
            name_by_id,
            id_by_name,
        })
    }

    /// Resolve a project identifier to its human-readable name
    pub fn name_of(&self, id: &str) -> Option<&str> {
        self.name_by_id.get(id).map(|s| s.as_str())
    }

    /// Resolve a project name back to its identifier
    pub fn id_of(&self, name: &str) -> Option<&str> {
        self.id_by_name.get(name).map(|s| s.as_str())
    }

    /// Display name for a project id, falling back to the raw id
    pub fn display_name(&self, id: &str) -> String {
        self.name_of(id).unwrap_or(id).to_string()
    }

    pub fn len(&self) -> usize {
        self.name_by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.name_by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Connection {
        let conn = Connection::open_in_memory().expect("in-memory db");
        conn.execute("CREATE TABLE project (id TEXT, name TEXT)", [])
            .expect("create table");
        conn.execute(
            "INSERT INTO project (id, name) VALUES
             ('a1b2', 'platform'),
             ('c3d4', 'billing')",
            [],
        )
        .expect("insert rows");
        conn
    }

    #[test]
    fn test_forward_and_reverse_lookup() {
        let conn = fixture();
        let dir = ProjectDirectory::load(&conn).expect("load");

        assert_eq!(dir.len(), 2);
        assert_eq!(dir.name_of("a1b2"), Some("platform"));
        assert_eq!(dir.id_of("billing"), Some("c3d4"));
        assert_eq!(dir.name_of("billing"), None);
        assert_eq!(dir.id_of("a1b2"), None);
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        let conn = fixture();
        let dir = ProjectDirectory::load(&conn).expect("load");

        assert_eq!(dir.display_name("a1b2"), "platform");
        assert_eq!(dir.display_name("unknown-id"), "unknown-id");
    }

    #[test]
    fn test_empty_directory() {
        let conn = Connection::open_in_memory().expect("in-memory db");
        conn.execute("CREATE TABLE project (id TEXT, name TEXT)", [])
            .expect("create table");
        let dir = ProjectDirectory::load(&conn).expect("load");
        assert!(dir.is_empty());
    }
}
