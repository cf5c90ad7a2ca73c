use smol_str::SmolStr;
use thiserror::Error;

/// A property value that could not be converted to the type of its style field.
///
/// Produced by the property setters and logged by the resolver; the field keeps
/// whatever value it had before.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot set `{key}` from {value}: expected {expected}")]
pub struct StyleParseError {
    pub key: SmolStr,
    pub value: String,
    pub expected: &'static str,
}

impl StyleParseError {
    pub fn new(key: &str, value: impl std::fmt::Debug, expected: &'static str) -> Self {
        Self {
            key: SmolStr::new(key),
            value: format!("{value:?}"),
            expected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeInvalid {
    #[error("mesh `{mesh}` has no vertices")]
    NoVertices { mesh: SmolStr },
    #[error("mesh `{mesh}` number of normals: {normals} != vertices: {vertices}")]
    NormalCount {
        mesh: SmolStr,
        normals: usize,
        vertices: usize,
    },
    #[error("mesh `{mesh}` number of texcoords: {texcoords} != vertices: {vertices}")]
    TexCoordCount {
        mesh: SmolStr,
        texcoords: usize,
        vertices: usize,
    },
    #[error("mesh `{mesh}` number of colors: {colors} != vertices: {vertices}")]
    ColorCount {
        mesh: SmolStr,
        colors: usize,
        vertices: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GpuError {
    #[error("program `{program}` failed to compile: {message}")]
    ShaderCompile { program: SmolStr, message: String },
    #[error("no such program")]
    UnknownProgram,
    #[error("program `{program}` has no uniform named `{uniform}`")]
    UnknownUniform { program: SmolStr, uniform: SmolStr },
    #[error("uniform `{uniform}` expects {expected}")]
    UniformType {
        uniform: SmolStr,
        expected: &'static str,
    },
    #[error("no such buffer")]
    UnknownBuffer,
    #[error("no buffers are bound for drawing")]
    NothingBound,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeshError {
    #[error(transparent)]
    ShapeInvalid(#[from] ShapeInvalid),
    #[error("mesh `{0}` needs an active render context")]
    ContextInactive(SmolStr),
    #[error("mesh `{0}` has no vectors; call make_vectors first")]
    NotMade(SmolStr),
    #[error(transparent)]
    Gpu(#[from] GpuError),
}
