//! GLSL front half of the compile pipeline.
//!
//! Example shaders are written against the WebGL-flavoured conventions of the
//! Book of Shaders: `gl_FragColor`, a bottom-left `gl_FragCoord`, and loose
//! `u_time`/`u_resolution`/`u_mouse` uniforms. [`wrap_fragment`] rewrites such a
//! source into Vulkan-style GLSL 450 that naga accepts, and [`compile_fragment`]
//! parses and validates the result without touching a GPU.
use std::borrow::Cow;
use std::ops::Range;

use naga::front::glsl::{Frontend, Options, ParseErrors};
use naga::valid::{Capabilities, ModuleInfo, ValidationError, ValidationFlags, Validator};
use naga::{ShaderStage, Span, WithSpan};
use thiserror::Error;
use tracing::debug;

use crate::pipeline::ProgramBuilder;

/// Why a source could not become a program. The payload is the rendered
/// diagnostic shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("{0}")]
    Parse(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Pipeline(String),
}

/// Parsed and validated fragment module, ready to hand to wgpu.
#[derive(Debug)]
pub struct CompiledFragment {
    pub module: naga::Module,
    pub info: ModuleInfo,
}

/// Uniform names the preview supplies; user declarations of them are dropped.
const PROVIDED_UNIFORMS: [&str; 5] = ["u_resolution", "u_mouse", "u_time", "u_time_delta", "u_frame"];

/// Rewrites a Book-of-Shaders style fragment source into self-contained GLSL 450.
///
/// The first `#version` directive, `precision` statements, and declarations of
/// the provided uniforms are blanked rather than removed, so the user's lines
/// keep their numbering inside the wrapped text.
pub fn wrap_fragment(source: &str) -> String {
    WrappedFragment::new(source).text
}

/// Wrapped shader text plus the byte range holding the user's lines.
struct WrappedFragment {
    text: String,
    body: Range<usize>,
}

impl WrappedFragment {
    fn new(source: &str) -> Self {
        let mut sanitized = String::with_capacity(source.len());
        let mut skipped_version = false;
        for line in source.lines() {
            let trimmed = line.trim_start();
            let is_version = !skipped_version && trimmed.starts_with("#version");
            skipped_version |= is_version;
            let is_precision = trimmed.starts_with("precision ");
            let is_provided_uniform = trimmed.starts_with("uniform ")
                && PROVIDED_UNIFORMS
                    .iter()
                    .any(|name| declares_identifier(trimmed, name));

            if !(is_version || is_precision || is_provided_uniform) {
                sanitized.push_str(line);
            }
            sanitized.push('\n');
        }

        let prologue = format!("{HEADER}#line 1\n");
        let body = prologue.len()..prologue.len() + sanitized.len();
        Self {
            text: format!("{prologue}{sanitized}{FOOTER}"),
            body,
        }
    }

    fn body_text(&self) -> &str {
        &self.text[self.body.clone()]
    }

    /// Moves a span over the wrapped text onto the user's lines. Spans that
    /// land in the injected prologue or epilogue become undefined.
    fn user_span(&self, span: Span) -> Span {
        match span.to_range() {
            Some(range) if range.start >= self.body.start && range.end <= self.body.end => {
                let start = range.start - self.body.start;
                let end = range.end - self.body.start;
                match (u32::try_from(start), u32::try_from(end)) {
                    (Ok(start), Ok(end)) => Span::new(start, end),
                    _ => Span::UNDEFINED,
                }
            }
            _ => Span::UNDEFINED,
        }
    }

    fn render_parse_errors(&self, errors: ParseErrors) -> String {
        let errors: Vec<_> = errors
            .errors
            .into_iter()
            .map(|mut error| {
                error.meta = self.user_span(error.meta);
                error
            })
            .collect();
        ParseErrors::from(errors).emit_to_string(self.body_text())
    }

    fn render_validation_error(&self, error: WithSpan<ValidationError>) -> String {
        let spans: Vec<(Span, String)> = error
            .spans()
            .map(|(span, label)| (self.user_span(*span), label.clone()))
            .collect();
        spans
            .into_iter()
            .fold(WithSpan::new(error.into_inner()), |error, (span, label)| {
                error.with_span(span, label)
            })
            .emit_to_string_with_path(self.body_text(), "glsl")
    }
}

/// Parses and validates `source` as a fragment shader.
///
/// Diagnostics are rendered against the user's own lines.
pub fn compile_fragment(source: &str) -> Result<CompiledFragment, CompileError> {
    let wrapped = WrappedFragment::new(source);

    let mut frontend = Frontend::default();
    let module = frontend
        .parse(&Options::from(ShaderStage::Fragment), &wrapped.text)
        .map_err(|errors| CompileError::Parse(wrapped.render_parse_errors(errors)))?;

    let info = Validator::new(ValidationFlags::all(), Capabilities::default())
        .validate(&module)
        .map_err(|error| CompileError::Validation(wrapped.render_validation_error(error)))?;

    debug!(
        functions = module.functions.len(),
        globals = module.global_variables.len(),
        "validated fragment shader"
    );
    Ok(CompiledFragment { module, info })
}

/// Shader-only builder: a program is the validated naga module.
///
/// Used headlessly (`shaderbook check`, tests) where no device exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedShaderBuilder;

impl ProgramBuilder for ValidatedShaderBuilder {
    type Program = CompiledFragment;

    fn build(&self, source: &str) -> Result<Self::Program, CompileError> {
        compile_fragment(source)
    }
}

pub(crate) fn vertex_shader_source() -> Cow<'static, str> {
    Cow::Borrowed(VERTEX_SHADER_GLSL)
}

fn declares_identifier(line: &str, name: &str) -> bool {
    line.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .any(|token| token == name)
}

/// Prologue injected ahead of every user shader.
///
/// The block layout must match `PreviewUniforms`.
const HEADER: &str = r"#version 450
layout(location = 0) out vec4 shaderbook_frag_color;

layout(std140, set = 0, binding = 0) uniform PreviewParams {
    vec2 _u_resolution;
    vec2 _u_mouse;
    float _u_time;
    float _u_time_delta;
    int _u_frame;
    float _padding0;
} params;

#define u_resolution params._u_resolution
#define u_mouse params._u_mouse
#define u_time params._u_time
#define u_time_delta params._u_time_delta
#define u_frame params._u_frame

#define gl_FragColor shaderbook_frag_color

vec4 shaderbook_frag_coord;
#define gl_FragCoord shaderbook_frag_coord

#define main shaderbook_user_main
";

/// Epilogue: flips the framebuffer origin to bottom-left and calls the user's `main`.
const FOOTER: &str = r"
#undef main
#undef gl_FragCoord
void main() {
    shaderbook_frag_coord = vec4(
        gl_FragCoord.x,
        u_resolution.y - gl_FragCoord.y,
        gl_FragCoord.z,
        gl_FragCoord.w
    );
    shaderbook_frag_color = vec4(0.0, 0.0, 0.0, 1.0);
    shaderbook_user_main();
}
";

/// Full-screen triangle; the fragment stage only needs `gl_FragCoord`.
const VERTEX_SHADER_GLSL: &str = r"#version 450
const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    gl_Position = vec4(positions[vertex_index], 0.0, 1.0);
}
";
