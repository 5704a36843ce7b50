//! Texture repository

use rusqlite::{Connection, params};

use super::executor;
use super::statements::Statements;
use crate::{Error, Result, codec};

/// A decompressed texture, rows flipped so the origin is bottom-left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Channels per pixel, 3 for RGB or 4 for RGBA
    pub components: u32,
}

impl Texture {
    /// Byte length the pixel buffer must have for these dimensions, or
    /// `None` when `w*h*c` does not fit in a `u64`.
    pub fn expected_len(width: u32, height: u32, components: u32) -> Option<u64> {
        u64::from(width)
            .checked_mul(u64::from(height))?
            .checked_mul(u64::from(components))
    }
}

/// One TEXTURES row before its content is inflated.
struct StoredTexture {
    width: u32,
    height: u32,
    components: u32,
    content: Vec<u8>,
    uncompressed_size: Option<i64>,
}

/// Stateless accessor over the TEXTURES table.
pub struct TextureRepository<'a> {
    conn: &'a Connection,
    statements: &'a Statements,
}

impl<'a> TextureRepository<'a> {
    pub fn new(conn: &'a Connection, statements: &'a Statements) -> Self {
        Self { conn, statements }
    }

    /// Compress and insert a texture under a new unique name.
    pub fn store(
        &self,
        name: &str,
        width: u32,
        height: u32,
        components: u32,
        pixels: &[u8],
    ) -> Result<()> {
        let expected = Texture::expected_len(width, height, components).ok_or_else(|| {
            Error::InvalidTexture(format!(
                "texture '{}' dimensions {}x{}x{} overflow",
                name, width, height, components
            ))
        })?;
        if pixels.len() as u64 != expected {
            return Err(Error::InvalidTexture(format!(
                "texture '{}' has {} bytes of pixels, expected {}x{}x{} = {}",
                name,
                pixels.len(),
                width,
                height,
                components,
                expected
            )));
        }

        let stmt = self.statements.insert_texture(self.conn)?;
        let content = codec::compress(pixels)?;
        let uncompressed_size = pixels.len() as i64;

        let result = if self.statements.texture_generation().is_sized() {
            executor::execute(
                stmt,
                params![name, width, height, components, content, uncompressed_size],
            )
        } else {
            executor::execute(stmt, params![name, width, height, components, content])
        };
        result.map_err(|e| executor::map_duplicate(e, name))?;

        tracing::debug!(
            "stored texture '{}' ({}x{}x{}, {} -> {} bytes)",
            name,
            width,
            height,
            components,
            pixels.len(),
            content.len()
        );
        Ok(())
    }

    /// Fetch and decompress a texture by name.
    ///
    /// Returns `Ok(None)` when no texture has that name.
    pub fn get(&self, name: &str) -> Result<Option<Texture>> {
        let stmt = self.statements.select_texture(self.conn)?;
        let sized = self.statements.texture_generation().is_sized();

        let rows = executor::query(stmt, params![name], |row| {
            Ok(StoredTexture {
                width: row.get(0)?,
                height: row.get(1)?,
                components: row.get(2)?,
                content: row.get(3)?,
                uncompressed_size: if sized { Some(row.get(4)?) } else { None },
            })
        })?;

        let Some(stored) = rows.into_iter().next() else {
            tracing::debug!("texture '{}' not found", name);
            return Ok(None);
        };

        let expected = Texture::expected_len(stored.width, stored.height, stored.components)
            .ok_or_else(|| {
                Error::Codec(format!(
                    "texture '{}' has stored dimensions {}x{}x{} that overflow",
                    name, stored.width, stored.height, stored.components
                ))
            })?;

        let expected_size = stored
            .uncompressed_size
            .map(|size| {
                usize::try_from(size)
                    .map_err(|_| Error::Codec(format!("stored size {} does not fit in memory", size)))
            })
            .transpose()?;
        let pixels = codec::decompress(&stored.content, expected_size)?;

        if pixels.len() as u64 != expected {
            return Err(Error::Codec(format!(
                "texture '{}' decompressed to {} bytes, expected {}",
                name,
                pixels.len(),
                expected
            )));
        }

        Ok(Some(Texture {
            pixels,
            width: stored.width,
            height: stored.height,
            components: stored.components,
        }))
    }

    /// Number of stored textures.
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM TEXTURES", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
