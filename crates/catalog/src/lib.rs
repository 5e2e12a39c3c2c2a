//! Example catalog for the shader playground.
//!
//! The catalog is pure data: an ordered list of sections, each holding an
//! ordered list of examples keyed by title. It knows how to load example
//! sources from disk (or from the shaders bundled into the binary) and how to
//! write edited sources back, but nothing about compiling or rendering them.
//!
//! ```text
//!   seed table ──▶ SourceResolver ──▶ Example ──▶ Section ──▶ Catalog
//!                    │  bundle dir / plain path / create-empty
//!                    └──▶ persist (atomic replace)
//! ```

mod catalog;
mod example;
mod seed;
mod source;

pub use catalog::Catalog;
pub use example::{Example, Section};
pub use seed::{bundled_shader, bundled_shaders, BundledShader, SeedSection, BUILTIN_SEED};
pub use source::{
    persist_source, ResolvedSource, SourceError, SourceOrigin, SourceResolver, SOURCE_EXTENSION,
};
