//! Asset store - owns the connection and hands out repositories

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, OpenFlags};

use super::schema::{self, SchemaGeneration};
use super::shaders::ShaderRepository;
use super::statements::Statements;
use super::textures::TextureRepository;
use crate::confirm::TypePolicy;
use crate::loader::ImageLoader;
use crate::{Error, Result};

/// Which side of the store this instance plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Runtime loader: reads only, never touches the schema.
    Reader,
    /// Offline packer: creates the schema and writes resources.
    Packer,
}

impl AccessMode {
    pub fn is_packer(&self) -> bool {
        matches!(self, AccessMode::Packer)
    }
}

/// Fixed platform store location, used when no path is given.
pub fn default_store_path() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from(r"C:\Program Files\Resources\resources.sqlite")
    } else {
        PathBuf::from("/opt/resources/resources.sqlite")
    }
}

/// A single-file store of named, compressed textures and shaders.
///
/// One instance owns one connection and its prepared statements. It is not
/// meant to be shared between threads; open one instance per thread instead.
pub struct AssetStore {
    conn: Connection,
    statements: Statements,
    policy: Cell<TypePolicy>,
}

impl AssetStore {
    /// Open (or create) the store file at `path`.
    ///
    /// The parent directory is created when missing (one level only). In
    /// packer mode the schema is created if absent.
    pub fn open(path: &Path, mode: AccessMode) -> Result<Self> {
        ensure_parent_dir(path)?;

        let access = match mode {
            AccessMode::Packer => OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
            AccessMode::Reader => OpenFlags::SQLITE_OPEN_READ_ONLY,
        };
        let flags = access | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(path, flags).map_err(|source| Error::Open {
            path: path.display().to_string(),
            source,
        })?;

        tracing::debug!("opened {} in {:?} mode", path.display(), mode);
        Self::init(conn, mode)
    }

    /// Open the store at the platform default location.
    pub fn open_default(mode: AccessMode) -> Result<Self> {
        Self::open(&default_store_path(), mode)
    }

    /// Open an in-memory store (for testing)
    pub fn open_in_memory(mode: AccessMode) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::Open {
            path: ":memory:".to_string(),
            source,
        })?;
        Self::init(conn, mode)
    }

    fn init(mut conn: Connection, mode: AccessMode) -> Result<Self> {
        // Busy statements are retried by the executor, not by an engine-side timeout.
        conn.busy_timeout(Duration::ZERO)?;

        if mode.is_packer() {
            conn.execute_batch("PRAGMA foreign_keys = ON")
                .map_err(Error::Schema)?;
            schema::apply(&mut conn)?;
        }

        let textures = SchemaGeneration::detect(&conn, "TEXTURES")?;
        let shaders = SchemaGeneration::detect(&conn, "SHADERS")?;
        if !textures.is_sized() || !shaders.is_sized() {
            tracing::warn!(
                "legacy store layout (textures: {:?}, shaders: {:?}); sizes are measured on read",
                textures,
                shaders
            );
        }

        let statements = Statements::prepare(&conn, mode, textures, shaders)?;

        Ok(Self {
            conn,
            statements,
            policy: Cell::new(TypePolicy::Ask),
        })
    }

    /// Seed the shader type policy, e.g. from `--yes` or config.
    pub fn with_type_policy(self, policy: TypePolicy) -> Self {
        self.policy.set(policy);
        self
    }

    pub fn type_policy(&self) -> TypePolicy {
        self.policy.get()
    }

    pub fn mode(&self) -> AccessMode {
        self.statements.mode()
    }

    pub fn textures(&self) -> TextureRepository<'_> {
        TextureRepository::new(&self.conn, &self.statements)
    }

    pub fn shaders(&self) -> ShaderRepository<'_> {
        ShaderRepository::new(&self.conn, &self.statements, &self.policy)
    }

    /// Decode an image file and store it as a texture.
    pub fn store_texture_file(
        &self,
        path: &Path,
        name: &str,
        loader: &dyn ImageLoader,
    ) -> Result<()> {
        let image = loader.load(path)?;
        self.textures().store(
            name,
            image.width,
            image.height,
            image.components,
            &image.pixels,
        )
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Layout generations of the texture and shader tables.
    pub fn generations(&self) -> (SchemaGeneration, SchemaGeneration) {
        (
            self.statements.texture_generation(),
            self.statements.shader_generation(),
        )
    }
}

/// Create the store's parent directory if it is missing.
///
/// Only the last level is created; a missing grandparent is an error.
fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir(parent).map_err(|source| Error::Directory {
                path: parent.display().to_string(),
                source,
            })?;
        }
    }
    Ok(())
}
