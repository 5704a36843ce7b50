//! Statement cache - the parameterized SQL each repository runs
//!
//! Statements are compiled once when the store opens and live in the
//! connection's prepared statement cache afterwards; repositories fetch them
//! with `prepare_cached`, which hands back the already compiled statement.

use rusqlite::{CachedStatement, Connection};

use super::schema::SchemaGeneration;
use super::store::AccessMode;
use crate::{Error, Result};

/// Room for every statement the packer mode prepares, with headroom.
pub const STATEMENT_CACHE_CAPACITY: usize = 16;

const SELECT_TEXTURE: &str =
    "SELECT WIDTH, HEIGHT, COMPONENTS, CONTENT, UNCOMPRESSED_SIZE FROM TEXTURES WHERE NAME = ?1";
const SELECT_TEXTURE_LEGACY: &str =
    "SELECT WIDTH, HEIGHT, COMPONENTS, CONTENT FROM TEXTURES WHERE NAME = ?1";

const SELECT_SHADER: &str = "SELECT CONTENT, UNCOMPRESSED_SIZE FROM SHADERS WHERE NAME = ?1";
const SELECT_SHADER_LEGACY: &str = "SELECT CONTENT FROM SHADERS WHERE NAME = ?1";

const INSERT_TEXTURE: &str = "INSERT INTO TEXTURES (NAME, WIDTH, HEIGHT, COMPONENTS, CONTENT, UNCOMPRESSED_SIZE) VALUES (?1, ?2, ?3, ?4, ?5, ?6)";
const INSERT_TEXTURE_LEGACY: &str =
    "INSERT INTO TEXTURES (NAME, WIDTH, HEIGHT, COMPONENTS, CONTENT) VALUES (?1, ?2, ?3, ?4, ?5)";

const INSERT_SHADER: &str =
    "INSERT INTO SHADERS (NAME, TYPE, CONTENT, UNCOMPRESSED_SIZE) VALUES (?1, ?2, ?3, ?4)";
const INSERT_SHADER_LEGACY: &str = "INSERT INTO SHADERS (NAME, TYPE, CONTENT) VALUES (?1, ?2, ?3)";

const SELECT_SHADER_TYPE: &str = "SELECT ID FROM SHADER_TYPE WHERE TYPE = ?1";
const INSERT_SHADER_TYPE: &str = "INSERT INTO SHADER_TYPE (TYPE) VALUES (?1)";

/// The SQL text chosen for this connection's mode and table layouts.
#[derive(Debug, Clone, Copy)]
pub struct Statements {
    mode: AccessMode,
    textures: SchemaGeneration,
    shaders: SchemaGeneration,
}

impl Statements {
    /// Compile every statement `mode` needs into the connection cache.
    ///
    /// Fails with [`Error::Prepare`] on the first statement that does not
    /// compile, e.g. when a reader opens a file without the expected tables.
    pub fn prepare(
        conn: &Connection,
        mode: AccessMode,
        textures: SchemaGeneration,
        shaders: SchemaGeneration,
    ) -> Result<Self> {
        conn.set_prepared_statement_cache_capacity(STATEMENT_CACHE_CAPACITY);

        let statements = Self {
            mode,
            textures,
            shaders,
        };
        for sql in statements.all() {
            tracing::debug!("preparing: {}", sql);
            conn.prepare_cached(sql).map_err(Error::Prepare)?;
        }
        Ok(statements)
    }

    fn all(&self) -> Vec<&'static str> {
        let mut sql = vec![self.select_texture_sql(), self.select_shader_sql()];
        if self.mode.is_packer() {
            sql.extend([
                self.insert_texture_sql(),
                self.insert_shader_sql(),
                SELECT_SHADER_TYPE,
                INSERT_SHADER_TYPE,
            ]);
        }
        sql
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn texture_generation(&self) -> SchemaGeneration {
        self.textures
    }

    pub fn shader_generation(&self) -> SchemaGeneration {
        self.shaders
    }

    fn select_texture_sql(&self) -> &'static str {
        if self.textures.is_sized() {
            SELECT_TEXTURE
        } else {
            SELECT_TEXTURE_LEGACY
        }
    }

    fn select_shader_sql(&self) -> &'static str {
        if self.shaders.is_sized() {
            SELECT_SHADER
        } else {
            SELECT_SHADER_LEGACY
        }
    }

    fn insert_texture_sql(&self) -> &'static str {
        if self.textures.is_sized() {
            INSERT_TEXTURE
        } else {
            INSERT_TEXTURE_LEGACY
        }
    }

    fn insert_shader_sql(&self) -> &'static str {
        if self.shaders.is_sized() {
            INSERT_SHADER
        } else {
            INSERT_SHADER_LEGACY
        }
    }

    pub fn select_texture<'c>(&self, conn: &'c Connection) -> Result<CachedStatement<'c>> {
        cached(conn, self.select_texture_sql())
    }

    pub fn select_shader<'c>(&self, conn: &'c Connection) -> Result<CachedStatement<'c>> {
        cached(conn, self.select_shader_sql())
    }

    pub fn insert_texture<'c>(&self, conn: &'c Connection) -> Result<CachedStatement<'c>> {
        self.require_packer()?;
        cached(conn, self.insert_texture_sql())
    }

    pub fn insert_shader<'c>(&self, conn: &'c Connection) -> Result<CachedStatement<'c>> {
        self.require_packer()?;
        cached(conn, self.insert_shader_sql())
    }

    pub fn select_shader_type<'c>(&self, conn: &'c Connection) -> Result<CachedStatement<'c>> {
        self.require_packer()?;
        cached(conn, SELECT_SHADER_TYPE)
    }

    pub fn insert_shader_type<'c>(&self, conn: &'c Connection) -> Result<CachedStatement<'c>> {
        self.require_packer()?;
        cached(conn, INSERT_SHADER_TYPE)
    }

    fn require_packer(&self) -> Result<()> {
        if self.mode.is_packer() {
            Ok(())
        } else {
            Err(Error::ReadOnly)
        }
    }
}

fn cached<'c>(conn: &'c Connection, sql: &str) -> Result<CachedStatement<'c>> {
    conn.prepare_cached(sql).map_err(Error::Prepare)
}
