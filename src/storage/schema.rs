//! Database schema definitions
//!
//! Column order is part of the file format: row decoders read columns by
//! index, so statements must keep the order used here.

use rusqlite::Connection;

use crate::{Error, Result};

/// SQL to create the texture table
pub const CREATE_TEXTURES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS TEXTURES (
    ID INTEGER NOT NULL PRIMARY KEY,
    NAME TEXT UNIQUE NOT NULL,
    WIDTH INTEGER NOT NULL,
    HEIGHT INTEGER NOT NULL,
    COMPONENTS INTEGER NOT NULL,
    CONTENT BLOB NOT NULL,
    UNCOMPRESSED_SIZE INTEGER NOT NULL
)
"#;

/// SQL to create the shader type lookup table
pub const CREATE_SHADER_TYPE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS SHADER_TYPE (
    ID INTEGER NOT NULL PRIMARY KEY,
    TYPE TEXT UNIQUE NOT NULL
)
"#;

/// SQL to create the shader table
/// References SHADER_TYPE, so it must run after CREATE_SHADER_TYPE_TABLE
pub const CREATE_SHADERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS SHADERS (
    ID INTEGER NOT NULL PRIMARY KEY,
    NAME TEXT UNIQUE NOT NULL,
    TYPE INTEGER NOT NULL REFERENCES SHADER_TYPE(ID),
    CONTENT BLOB NOT NULL,
    UNCOMPRESSED_SIZE INTEGER NOT NULL
)
"#;

/// All schema creation statements, in dependency order
pub fn all_schema_statements() -> [&'static str; 3] {
    [
        CREATE_TEXTURES_TABLE,
        CREATE_SHADER_TYPE_TABLE,
        CREATE_SHADERS_TABLE,
    ]
}

/// Apply the schema in a single transaction.
///
/// Either all three tables exist afterwards or none of the statements took
/// effect.
pub fn apply(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction().map_err(Error::Schema)?;
    for stmt in all_schema_statements() {
        tx.execute(stmt, []).map_err(Error::Schema)?;
    }
    tx.commit().map_err(Error::Schema)?;
    Ok(())
}

/// Layout generation of a content table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaGeneration {
    /// No UNCOMPRESSED_SIZE column; sizes are measured by decompressing.
    Legacy,
    /// UNCOMPRESSED_SIZE is stored next to CONTENT.
    Sized,
}

impl SchemaGeneration {
    /// Inspect an existing table's columns.
    ///
    /// A table that does not exist yet reports `Sized`, since it will be
    /// created with the latest layout (or statement preparation fails on it).
    pub fn detect(conn: &Connection, table: &str) -> Result<Self> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({})", table))
            .map_err(Error::Schema)?;
        let columns: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .map_err(Error::Schema)?
            .collect::<rusqlite::Result<_>>()
            .map_err(Error::Schema)?;

        if columns.is_empty()
            || columns
                .iter()
                .any(|c| c.eq_ignore_ascii_case("UNCOMPRESSED_SIZE"))
        {
            Ok(SchemaGeneration::Sized)
        } else {
            Ok(SchemaGeneration::Legacy)
        }
    }

    pub fn is_sized(&self) -> bool {
        matches!(self, SchemaGeneration::Sized)
    }
}
