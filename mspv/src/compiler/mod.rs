//! Compilation of one shader stage from GLSL source to a binary.
//!
//! A [`ShaderCompiler`] turns the assembled source text of a stage into the bytes that go into a
//! container. The default implementation, [`Glslc`], runs the `glslc` command line compiler from
//! the Vulkan SDK. With the `shaderc` feature, [`Shaderc`] compiles in-process instead.
//!
//! Compilation failures are never retried; they're returned to the caller with the compiler's
//! diagnostics.

use crate::{fs::IoError, stage::ShaderStage, NonExhaustive};
use std::{
    error::Error,
    fmt::{Display, Error as FmtError, Formatter},
    path::{Path, PathBuf},
};

pub use self::glslc::Glslc;
#[cfg(feature = "shaderc")]
pub use self::shaderc::Shaderc;

pub mod glslc;
#[cfg(feature = "shaderc")]
pub mod shaderc;

/// Compiles the source text of a single stage.
pub trait ShaderCompiler {
    /// Compiles `source`, the complete text of a `stage` shader, and returns the binary.
    fn compile(
        &self,
        stage: ShaderStage,
        source: &str,
        info: &CompileInfo<'_>,
    ) -> Result<Vec<u8>, CompileError>;
}

impl<T> ShaderCompiler for &T
where
    T: ShaderCompiler + ?Sized,
{
    #[inline]
    fn compile(
        &self,
        stage: ShaderStage,
        source: &str,
        info: &CompileInfo<'_>,
    ) -> Result<Vec<u8>, CompileError> {
        (**self).compile(stage, source, info)
    }
}

impl<T> ShaderCompiler for Box<T>
where
    T: ShaderCompiler + ?Sized,
{
    #[inline]
    fn compile(
        &self,
        stage: ShaderStage,
        source: &str,
        info: &CompileInfo<'_>,
    ) -> Result<Vec<u8>, CompileError> {
        (**self).compile(stage, source, info)
    }
}

/// Parameters of a compilation.
#[derive(Clone, Debug)]
pub struct CompileInfo<'a> {
    /// Directories searched by `#include <...>` directives.
    ///
    /// The default value is empty.
    pub include_directories: &'a [PathBuf],

    /// Name of the function the stage starts executing at.
    ///
    /// The default value is `"main"`.
    pub entry_point: &'a str,

    /// Where compilers that work through files put their scratch files.
    ///
    /// The default value is `None`, which uses the system's temporary directory.
    pub scratch_directory: Option<&'a Path>,

    /// Whether the assembled source of a failed compilation is left on disk, so that the line
    /// numbers in the diagnostics can be looked up. Successful compilations never leave files
    /// behind.
    ///
    /// The default value is `true`.
    pub keep_failed_sources: bool,

    /// Arguments passed as-is to command line compilers, after the ones built from the other
    /// fields.
    ///
    /// The default value is empty.
    pub extra_arguments: &'a [String],

    pub _ne: NonExhaustive,
}

impl Default for CompileInfo<'_> {
    #[inline]
    fn default() -> Self {
        Self {
            include_directories: &[],
            entry_point: "main",
            scratch_directory: None,
            keep_failed_sources: true,
            extra_arguments: &[],
            _ne: NonExhaustive(()),
        }
    }
}

/// Error that can happen when compiling a stage.
#[derive(Debug)]
pub enum CompileError {
    /// The compiler rejected the source.
    CompilationFailed {
        stage: ShaderStage,
        /// What the compiler printed.
        diagnostics: String,
        /// The assembled source that was compiled, if it was kept on disk.
        retained_source: Option<PathBuf>,
    },

    /// The compiler program doesn't exist.
    CompilerNotFound { program: PathBuf },

    /// A scratch file couldn't be written or read back, or the compiler couldn't be started.
    Io(IoError),

    /// The compiler couldn't be set up for the compilation.
    Backend { stage: ShaderStage, message: String },
}

impl CompileError {
    /// Returns the stage being compiled, if the error is specific to one.
    pub fn stage(&self) -> Option<ShaderStage> {
        match self {
            Self::CompilationFailed { stage, .. } | Self::Backend { stage, .. } => Some(*stage),
            Self::CompilerNotFound { .. } | Self::Io(_) => None,
        }
    }
}

impl Error for CompileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl Display for CompileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            Self::CompilationFailed {
                stage,
                diagnostics,
                retained_source,
            } => {
                write!(f, "compiling the {} shader failed", stage)?;

                if let Some(path) = retained_source {
                    write!(f, " (the compiled source was kept at `{}`)", path.display())?;
                }

                if !diagnostics.is_empty() {
                    write!(f, ":\n{}", diagnostics)?;
                }

                Ok(())
            }
            Self::CompilerNotFound { program } => write!(
                f,
                "the shader compiler `{}` could not be found, make sure the Vulkan SDK is \
                installed or point `{}` at the compiler",
                program.display(),
                Glslc::ENV_VAR,
            ),
            Self::Io(_) => write!(f, "an I/O error happened while compiling a shader"),
            Self::Backend { stage, message } => write!(
                f,
                "the compiler could not be set up for the {} shader: {}",
                stage, message,
            ),
        }
    }
}

impl From<IoError> for CompileError {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}
