//! In-process compilation through `shaderc`.
//!
//! No files are written: the source is handed to the compiler directly and `#include`
//! directives are resolved through a callback.

use super::{CompileError, CompileInfo, ShaderCompiler};
use crate::stage::ShaderStage;
use ::shaderc::{
    CompileOptions, Compiler, EnvVersion, IncludeType, ResolvedInclude, ShaderKind, TargetEnv,
};
use std::path::{Path, PathBuf};

/// Name the assembled source is compiled under. Diagnostics refer to it.
const ROOT_SOURCE_NAME: &str = "shader.glsl";

/// Compiles with the `shaderc` library.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Shaderc;

impl Shaderc {
    #[inline]
    pub const fn new() -> Self {
        Shaderc
    }
}

impl ShaderCompiler for Shaderc {
    fn compile(
        &self,
        stage: ShaderStage,
        source: &str,
        info: &CompileInfo<'_>,
    ) -> Result<Vec<u8>, CompileError> {
        let backend_error = |message: &str| CompileError::Backend {
            stage,
            message: message.to_owned(),
        };

        let mut compiler =
            Compiler::new().ok_or_else(|| backend_error("failed to create the GLSL compiler"))?;
        let mut options = CompileOptions::new()
            .ok_or_else(|| backend_error("failed to initialize the compile options"))?;

        options.set_target_env(TargetEnv::Vulkan, EnvVersion::Vulkan1_0 as u32);

        let include_directories = info.include_directories.to_vec();
        options.set_include_callback(move |requested, directive_type, contained_within, _depth| {
            resolve_include(requested, directive_type, contained_within, &include_directories)
        });

        let kind = match stage {
            ShaderStage::Vertex => ShaderKind::Vertex,
            ShaderStage::Fragment => ShaderKind::Fragment,
        };

        log::debug!("compiling the {} shader with shaderc", stage);

        let artifact = compiler
            .compile_into_spirv(source, kind, ROOT_SOURCE_NAME, info.entry_point, Some(&options))
            .map_err(|err| CompileError::CompilationFailed {
                stage,
                diagnostics: err.to_string(),
                retained_source: None,
            })?;

        if artifact.get_num_warnings() > 0 {
            log::warn!("{}", artifact.get_warning_messages());
        }

        Ok(artifact.as_binary_u8().to_vec())
    }
}

/// Finds the file an `#include` directive refers to and reads it.
///
/// `#include "..."` is looked up next to the including file first, then in the include
/// directories. `#include <...>` only searches the include directories.
fn resolve_include(
    requested: &str,
    directive_type: IncludeType,
    contained_within: &str,
    include_directories: &[PathBuf],
) -> Result<ResolvedInclude, String> {
    let requested_path = Path::new(requested);

    let relative_candidate = match directive_type {
        IncludeType::Relative if contained_within != ROOT_SOURCE_NAME => Path::new(contained_within)
            .parent()
            .map(|parent| parent.join(requested_path)),
        _ => None,
    };

    let resolved = if requested_path.is_absolute() {
        Some(requested_path.to_owned()).filter(|path| path.is_file())
    } else {
        relative_candidate
            .into_iter()
            .chain(
                include_directories
                    .iter()
                    .map(|directory| directory.join(requested_path)),
            )
            .find(|path| path.is_file())
    };

    let resolved = resolved.ok_or_else(|| {
        format!(
            "could not include the file `{}` from any include directory",
            requested,
        )
    })?;

    let content = std::fs::read_to_string(&resolved).map_err(|err| {
        format!(
            "could not read the file `{}` to be included: {}",
            resolved.display(),
            err,
        )
    })?;

    Ok(ResolvedInclude {
        resolved_name: resolved.to_string_lossy().into_owned(),
        content,
    })
}
