//! Shader repository
//!
//! Shader rows reference a SHADER_TYPE row ("vertex", "fragment", ...).
//! Unknown types are created on demand once the caller's confirmer agrees;
//! the type insert and the shader insert commit together.

use std::cell::Cell;
use std::path::Path;

use rusqlite::{Connection, params};

use super::executor;
use super::statements::Statements;
use crate::confirm::{TypeConfirmer, TypePolicy};
use crate::{Error, Result, codec};

/// A row of the SHADER_TYPE lookup table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderType {
    pub id: i64,
    pub label: String,
}

/// Stateless accessor over the SHADERS and SHADER_TYPE tables.
pub struct ShaderRepository<'a> {
    conn: &'a Connection,
    statements: &'a Statements,
    policy: &'a Cell<TypePolicy>,
}

impl<'a> ShaderRepository<'a> {
    pub fn new(
        conn: &'a Connection,
        statements: &'a Statements,
        policy: &'a Cell<TypePolicy>,
    ) -> Self {
        Self {
            conn,
            statements,
            policy,
        }
    }

    /// Read a shader source file and store it under a new unique name.
    pub fn store(
        &self,
        name: &str,
        source_path: &Path,
        type_label: &str,
        confirmer: &mut dyn TypeConfirmer,
    ) -> Result<()> {
        let source = std::fs::read(source_path)?;
        self.store_source(name, &source, type_label, confirmer)
    }

    /// Store shader source bytes under a new unique name.
    ///
    /// Fails with [`Error::UserDeclined`] when `type_label` is unknown and the
    /// confirmer refuses to create it; nothing is written in that case.
    pub fn store_source(
        &self,
        name: &str,
        source: &[u8],
        type_label: &str,
        confirmer: &mut dyn TypeConfirmer,
    ) -> Result<()> {
        // Ask before opening the transaction so no lock is held while a human decides.
        if self.find_type(type_label)?.is_none() {
            let mut policy = self.policy.get();
            let answer = policy.confirm(type_label, confirmer);
            self.policy.set(policy);
            if !answer.accepted() {
                return Err(Error::UserDeclined(type_label.to_string()));
            }
        }

        let content = codec::compress(source)?;
        let uncompressed_size = source.len() as i64;

        executor::transaction(self.conn, || {
            let type_id = match self.find_type(type_label)? {
                Some(id) => id,
                None => self.create_type(type_label)?,
            };

            let stmt = self.statements.insert_shader(self.conn)?;
            let result = if self.statements.shader_generation().is_sized() {
                executor::execute(stmt, params![name, type_id, content, uncompressed_size])
            } else {
                executor::execute(stmt, params![name, type_id, content])
            };
            result.map_err(|e| executor::map_duplicate(e, name))
        })?;

        tracing::debug!(
            "stored {} shader '{}' ({} -> {} bytes)",
            type_label,
            name,
            source.len(),
            content.len()
        );
        Ok(())
    }

    /// Fetch and decompress a shader's source by name.
    ///
    /// Returns `Ok(None)` when no shader has that name.
    pub fn get(&self, name: &str) -> Result<Option<String>> {
        let stmt = self.statements.select_shader(self.conn)?;
        let sized = self.statements.shader_generation().is_sized();

        let rows = executor::query(stmt, params![name], |row| {
            let content: Vec<u8> = row.get(0)?;
            let size: Option<i64> = if sized { Some(row.get(1)?) } else { None };
            Ok((content, size))
        })?;

        let Some((content, size)) = rows.into_iter().next() else {
            tracing::debug!("shader '{}' not found", name);
            return Ok(None);
        };

        let expected_size = size
            .map(|size| {
                usize::try_from(size)
                    .map_err(|_| Error::Codec(format!("stored size {} does not fit in memory", size)))
            })
            .transpose()?;
        let source = codec::decompress(&content, expected_size)?;
        Ok(Some(String::from_utf8(source)?))
    }

    /// Id of the shader type labelled `label`, if it exists.
    pub fn find_type(&self, label: &str) -> Result<Option<i64>> {
        let stmt = self.statements.select_shader_type(self.conn)?;
        let ids = executor::query(stmt, params![label], |row| row.get::<_, i64>(0))?;
        Ok(ids.into_iter().next())
    }

    fn create_type(&self, label: &str) -> Result<i64> {
        let stmt = self.statements.insert_shader_type(self.conn)?;
        executor::execute(stmt, params![label])?;
        let id = self.conn.last_insert_rowid();
        tracing::info!("created shader type '{}' (id {})", label, id);
        Ok(id)
    }

    /// All shader types, oldest first.
    pub fn types(&self) -> Result<Vec<ShaderType>> {
        let mut stmt = self
            .conn
            .prepare("SELECT ID, TYPE FROM SHADER_TYPE ORDER BY ID")?;
        let types = stmt
            .query_map([], |row| {
                Ok(ShaderType {
                    id: row.get(0)?,
                    label: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(types)
    }

    /// Number of stored shaders.
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM SHADERS", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use crate::confirm::{Confirmation, FixedAnswer, TypeConfirmer};
    use crate::storage::{AccessMode, AssetStore};
    use crate::{Error, TypePolicy};

    const VERTEX: &str = "#version 330 core\nlayout (location = 0) in vec3 pos;\nvoid main() { gl_Position = vec4(pos, 1.0); }\n";
    const FRAGMENT: &str = "#version 330 core\nout vec4 color;\nvoid main() { color = vec4(1.0); }\n";

    fn type_of(store: &AssetStore, shader: &str) -> i64 {
        store
            .connection()
            .query_row("SELECT TYPE FROM SHADERS WHERE NAME = ?1", [shader], |row| row.get(0))
            .unwrap()
    }

    struct Scripted {
        answers: Vec<Confirmation>,
        asked: usize,
    }

    impl TypeConfirmer for Scripted {
        fn confirm_create_type(&mut self, _label: &str) -> Confirmation {
            let answer = self.answers[self.asked];
            self.asked += 1;
            answer
        }
    }

    #[test]
    fn test_new_type_created_after_yes() {
        let store = AssetStore::open_in_memory(AccessMode::Packer).unwrap();
        let shaders = store.shaders();

        shaders
            .store_source("basic.vert", VERTEX.as_bytes(), "vertex", &mut FixedAnswer(Confirmation::Yes))
            .unwrap();

        let types = shaders.types().unwrap();
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].label, "vertex");
        assert_eq!(shaders.count().unwrap(), 1);
        assert_eq!(type_of(&store, "basic.vert"), types[0].id);
        assert_eq!(shaders.get("basic.vert").unwrap().as_deref(), Some(VERTEX));
    }

    #[test]
    fn test_each_new_type_is_referenced_by_its_shader() {
        let store = AssetStore::open_in_memory(AccessMode::Packer).unwrap();
        let shaders = store.shaders();
        let mut yes = FixedAnswer(Confirmation::Yes);

        shaders
            .store_source("basic.vert", VERTEX.as_bytes(), "vertex", &mut yes)
            .unwrap();
        shaders
            .store_source("basic.frag", FRAGMENT.as_bytes(), "fragment", &mut yes)
            .unwrap();
        shaders
            .store_source("other.vert", VERTEX.as_bytes(), "vertex", &mut yes)
            .unwrap();

        let vertex = shaders.find_type("vertex").unwrap().unwrap();
        let fragment = shaders.find_type("fragment").unwrap().unwrap();
        assert_ne!(vertex, fragment);
        assert_eq!(type_of(&store, "basic.vert"), vertex);
        assert_eq!(type_of(&store, "basic.frag"), fragment);
        assert_eq!(type_of(&store, "other.vert"), vertex);
    }

    #[test]
    fn test_corrupt_stored_size_fails_on_get() {
        let store = AssetStore::open_in_memory(AccessMode::Packer).unwrap();
        store
            .shaders()
            .store_source("s", VERTEX.as_bytes(), "vertex", &mut FixedAnswer(Confirmation::Yes))
            .unwrap();

        for size in [-1, VERTEX.len() as i64 + 1] {
            store
                .connection()
                .execute("UPDATE SHADERS SET UNCOMPRESSED_SIZE = ?1 WHERE NAME = 's'", [size])
                .unwrap();
            assert!(
                matches!(store.shaders().get("s"), Err(Error::Codec(_))),
                "size {} was accepted",
                size
            );
        }
    }

    #[test]
    fn test_existing_type_is_reused_without_asking() {
        let store = AssetStore::open_in_memory(AccessMode::Packer).unwrap();
        let shaders = store.shaders();
        let mut confirmer = Scripted {
            answers: vec![Confirmation::Yes],
            asked: 0,
        };

        shaders
            .store_source("a.frag", FRAGMENT.as_bytes(), "fragment", &mut confirmer)
            .unwrap();
        shaders
            .store_source("b.frag", FRAGMENT.as_bytes(), "fragment", &mut confirmer)
            .unwrap();

        assert_eq!(confirmer.asked, 1);
        assert_eq!(shaders.types().unwrap().len(), 1);
        assert_eq!(shaders.count().unwrap(), 2);
    }

    #[test]
    fn test_declined_type_writes_nothing() {
        let store = AssetStore::open_in_memory(AccessMode::Packer).unwrap();
        let shaders = store.shaders();

        let err = shaders
            .store_source("x.geom", b"void main() {}", "geometry", &mut FixedAnswer(Confirmation::No))
            .unwrap_err();

        assert!(matches!(err, Error::UserDeclined(ref label) if label == "geometry"));
        assert!(shaders.types().unwrap().is_empty());
        assert_eq!(shaders.count().unwrap(), 0);
    }

    #[test]
    fn test_yes_to_all_skips_later_prompts() {
        let store = AssetStore::open_in_memory(AccessMode::Packer).unwrap();
        let mut confirmer = Scripted {
            answers: vec![Confirmation::YesToAll],
            asked: 0,
        };

        store
            .shaders()
            .store_source("v", VERTEX.as_bytes(), "vertex", &mut confirmer)
            .unwrap();
        store
            .shaders()
            .store_source("f", FRAGMENT.as_bytes(), "fragment", &mut confirmer)
            .unwrap();

        assert_eq!(confirmer.asked, 1);
        assert_eq!(store.type_policy(), TypePolicy::CreateAll);
        assert_eq!(store.shaders().types().unwrap().len(), 2);
    }

    #[test]
    fn test_duplicate_shader_leaves_no_orphan_type() {
        let store = AssetStore::open_in_memory(AccessMode::Packer).unwrap();
        let shaders = store.shaders();
        let mut yes = FixedAnswer(Confirmation::Yes);

        shaders
            .store_source("s", VERTEX.as_bytes(), "vertex", &mut yes)
            .unwrap();
        let err = shaders
            .store_source("s", FRAGMENT.as_bytes(), "fragment", &mut yes)
            .unwrap_err();

        assert!(matches!(err, Error::DuplicateName { .. }));
        let labels: Vec<String> = shaders.types().unwrap().into_iter().map(|t| t.label).collect();
        assert_eq!(labels, vec!["vertex"]);
    }

    #[test]
    fn test_missing_shader_is_none() {
        let store = AssetStore::open_in_memory(AccessMode::Packer).unwrap();
        assert!(store.shaders().get("missing").unwrap().is_none());
    }

    #[test]
    fn test_store_reads_source_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("basic.vert");
        std::fs::write(&path, VERTEX).unwrap();

        let store = AssetStore::open_in_memory(AccessMode::Packer).unwrap();
        store
            .shaders()
            .store("basic", &path, "vertex", &mut FixedAnswer(Confirmation::Yes))
            .unwrap();

        assert_eq!(store.shaders().get("basic").unwrap().as_deref(), Some(VERTEX));
    }
}
