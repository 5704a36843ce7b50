//! Storage Layer - SQLite-backed asset store
//!
//! System of record is a single SQLite file with tables:
//! - TEXTURES(id, name, width, height, components, content, uncompressed_size)
//! - SHADER_TYPE(id, type)
//! - SHADERS(id, name, type, content, uncompressed_size)
//!
//! `uncompressed_size` is absent from files written by older packers.

pub mod executor;
pub mod schema;
pub mod shaders;
pub mod statements;
pub mod store;
pub mod textures;

pub use schema::SchemaGeneration;
pub use shaders::{ShaderRepository, ShaderType};
pub use store::{AccessMode, AssetStore, default_store_path};
pub use textures::{Texture, TextureRepository};
