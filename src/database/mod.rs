//! Read-only SQLite access for hyperview
//!
//! Two logical databases back the report: the instance/hypervisor inventory
//! and the tenant/project directory. Both are opened read-only; hyperview has
//! no write path.

pub mod directory;
pub mod inventory;

use anyhow::{anyhow, Result};
use rusqlite::{Connection, OpenFlags};

/// Open a database read-only at the specified path
pub fn open_readonly(path: &str) -> Result<Connection> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| anyhow!("Failed to open database at '{}': {}", path, e))
}
