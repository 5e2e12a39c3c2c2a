//! Built-in catalog seed and the shader sources bundled into the binary.
use tracing::debug;

use crate::catalog::Catalog;
use crate::example::Example;
use crate::source::SourceResolver;

/// One section of the built-in seed: a title and `(example title, source ref)` pairs.
#[derive(Debug, Clone, Copy)]
pub struct SeedSection {
    pub title: &'static str,
    pub examples: &'static [(&'static str, &'static str)],
}

pub const BUILTIN_SEED: &[SeedSection] = &[
    SeedSection {
        title: "Hello World",
        examples: &[("Solid Color", "02-hello-world")],
    },
    SeedSection {
        title: "Uniforms",
        examples: &[
            ("Time", "03a-uniforms-time"),
            ("Fragment Coordinates", "03b-fragment-coord"),
        ],
    },
    SeedSection {
        title: "Shaping Functions",
        examples: &[
            ("Line", "05a-shape-line"),
            ("Quintic Curve", "05b-shape-quintic"),
            ("Step", "05c-shape-step"),
            ("Smoothstep", "05d-shape-smoothstep"),
        ],
    },
    SeedSection {
        title: "Colors",
        examples: &[("Mixing Colors", "06a-color-mix")],
    },
];

/// Shader source compiled into the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BundledShader {
    pub name: &'static str,
    pub source: &'static str,
}

macro_rules! bundled {
    ($($name:literal),+ $(,)?) => {
        &[$(BundledShader {
            name: $name,
            source: include_str!(concat!("../shaders/", $name, ".frag")),
        }),+]
    };
}

const BUNDLED: &[BundledShader] = bundled![
    "02-hello-world",
    "03a-uniforms-time",
    "03b-fragment-coord",
    "05a-shape-line",
    "05b-shape-quintic",
    "05c-shape-step",
    "05d-shape-smoothstep",
    "06a-color-mix",
];

pub fn bundled_shaders() -> &'static [BundledShader] {
    BUNDLED
}

pub fn bundled_shader(name: &str) -> Option<&'static BundledShader> {
    BUNDLED.iter().find(|shader| shader.name == name)
}

impl Catalog {
    /// Builds the startup catalog from [`BUILTIN_SEED`], resolving every
    /// example's source through `resolver`.
    pub fn seeded(resolver: &SourceResolver) -> Self {
        let mut catalog = Catalog::new();
        for section in BUILTIN_SEED {
            catalog.add_section(section.title);
            for (title, reference) in section.examples {
                let resolved = resolver.resolve(reference);
                debug!(
                    example = %title,
                    origin = ?resolved.origin,
                    "seeded example"
                );
                catalog.add_example(section.title, Example::from_resolved(*title, resolved));
            }
        }
        catalog
    }
}
