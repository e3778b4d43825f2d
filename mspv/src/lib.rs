//! Building and reading MSPV shader containers.
//!
//! An MSPV container holds the compiled vertex and fragment binaries of one shader, so that an
//! engine can load a whole shader program from a single file. This crate covers the steps that
//! produce one:
//!
//! - [`source`] joins the GLSL fragments a stage is made of, in inclusion order.
//! - [`compiler`] turns the source of one stage into a binary, by running `glslc` or, with the
//!   `shaderc` feature, in-process.
//! - [`container`] packs two binaries into a container and unpacks them again. This is the only
//!   part an engine needs at load time.
//! - [`pipeline`] chains the above together on files, writing outputs atomically so that a
//!   failed build never leaves a half-written file behind.
//!
//! ```no_run
//! use mspv::{compiler::{CompileInfo, Glslc}, pipeline};
//!
//! # fn main() -> Result<(), mspv::Error> {
//! let container = pipeline::build(
//!     &Glslc::from_env(),
//!     &["shaders/common.glsl", "shaders/triangle.vert"],
//!     &["shaders/common.glsl", "shaders/triangle.frag"],
//!     "assets/triangle.mspv",
//!     &CompileInfo::default(),
//! )?;
//! println!("{} bytes", container.encoded_len());
//! # Ok(())
//! # }
//! ```

pub use crate::{
    compiler::{CompileError, CompileInfo, ShaderCompiler},
    container::{Container, ContainerRef, FormatError},
    fs::IoError,
    stage::ShaderStage,
};
use std::{
    error::Error as StdError,
    fmt::{Display, Error as FmtError, Formatter},
    path::PathBuf,
};

pub mod compiler;
pub mod container;
pub mod fs;
pub mod pipeline;
pub mod source;
pub mod stage;

/// Error returned by the operations of [`pipeline`].
#[derive(Debug)]
pub enum Error {
    /// A stage failed to compile.
    Compile(CompileError),

    /// A container couldn't be encoded or decoded.
    Format {
        /// The file the container was read from, if any.
        path: Option<PathBuf>,
        source: FormatError,
    },

    /// A file couldn't be read or written.
    Io(IoError),
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Compile(err) => Some(err),
            Self::Format { source, .. } => Some(source),
            Self::Io(err) => Some(err),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            Self::Compile(_) => write!(f, "a shader failed to compile"),
            Self::Format { path: Some(path), .. } => {
                write!(f, "`{}` is not a valid MSPV container", path.display())
            }
            Self::Format { path: None, .. } => write!(f, "invalid MSPV container"),
            Self::Io(_) => write!(f, "a file operation failed"),
        }
    }
}

impl From<CompileError> for Error {
    fn from(err: CompileError) -> Self {
        Self::Compile(err)
    }
}

impl From<FormatError> for Error {
    fn from(err: FormatError) -> Self {
        Self::Format {
            path: None,
            source: err,
        }
    }
}

impl From<IoError> for Error {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

/// A helper type for non-exhaustive structs.
///
/// This type cannot be constructed outside this crate. Structures with a field of this type can
/// only be constructed by calling a constructor function or `Default::default()`. The effect is
/// similar to the standard Rust `#[non_exhaustive]` attribute, except that it does not prevent
/// update syntax from being used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NonExhaustive(pub(crate) ());
