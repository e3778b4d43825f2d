//! Compilation through the `glslc` command line compiler.
//!
//! `glslc` works on files, so every compilation writes the assembled source to a scratch file
//! named `<name>.merge_temp.glsl` and lets the compiler write the binary next to it. Both files
//! are removed once the compilation is done, except for the source of a failed compilation when
//! [`CompileInfo::keep_failed_sources`] is set.

use super::{CompileError, CompileInfo, ShaderCompiler};
use crate::{
    fs::{self, IoError, IoOperation},
    stage::ShaderStage,
};
use std::{
    env,
    ffi::OsString,
    io,
    path::{Path, PathBuf},
    process::{Command, Output},
    sync::atomic::{AtomicUsize, Ordering},
};

/// Runs `glslc` once per compiled stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Glslc {
    program: PathBuf,
}

impl Glslc {
    /// Environment variable that overrides the compiler program in [`Glslc::from_env`].
    pub const ENV_VAR: &'static str = "MSPV_GLSLC";

    /// Uses the `glslc` found in `PATH`.
    #[inline]
    pub fn new() -> Self {
        Self::with_program("glslc")
    }

    /// Uses the given compiler program. It must accept `glslc`'s arguments.
    #[inline]
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Glslc {
            program: program.into(),
        }
    }

    /// Uses the program named by the `MSPV_GLSLC` environment variable, or `glslc` if it isn't
    /// set.
    pub fn from_env() -> Self {
        match env::var_os(Self::ENV_VAR) {
            Some(program) if !program.is_empty() => Self::with_program(program),
            _ => Self::new(),
        }
    }

    #[inline]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Builds the argument list of a compilation reading `input` and writing `output`.
    pub fn arguments(
        &self,
        stage: ShaderStage,
        info: &CompileInfo<'_>,
        output: &Path,
        input: &Path,
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        args.push(format!("-fshader-stage={}", stage.glslc_name()).into());

        for directory in info.include_directories {
            args.push("-I".into());
            args.push(directory.into());
        }

        if info.entry_point != "main" {
            args.push(format!("-fentry-point={}", info.entry_point).into());
        }

        args.extend(info.extra_arguments.iter().map(OsString::from));
        args.push("-o".into());
        args.push(output.into());
        args.push(input.into());

        args
    }

    fn run(&self, args: Vec<OsString>) -> Result<Output, CompileError> {
        log::debug!("running {} {:?}", self.program.display(), args);

        Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|err| {
                if err.kind() == io::ErrorKind::NotFound {
                    CompileError::CompilerNotFound {
                        program: self.program.clone(),
                    }
                } else {
                    IoError::new(IoOperation::Execute, &self.program, err).into()
                }
            })
    }
}

impl Default for Glslc {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl ShaderCompiler for Glslc {
    fn compile(
        &self,
        stage: ShaderStage,
        source: &str,
        info: &CompileInfo<'_>,
    ) -> Result<Vec<u8>, CompileError> {
        let mut scratch = ScratchFiles::new(info.scratch_directory, stage);

        std::fs::write(&scratch.source, source)
            .map_err(|err| IoError::new(IoOperation::Write, &scratch.source, err))?;

        let output = self.run(self.arguments(stage, info, &scratch.binary, &scratch.source))?;

        if !output.status.success() {
            let retained_source = if info.keep_failed_sources {
                scratch.keep_source();
                log::warn!(
                    "compiling the {} shader failed, its source was kept at {}",
                    stage,
                    scratch.source.display(),
                );
                Some(scratch.source.clone())
            } else {
                None
            };

            return Err(CompileError::CompilationFailed {
                stage,
                diagnostics: diagnostics(&output),
                retained_source,
            });
        }

        let warnings = diagnostics(&output);
        if !warnings.is_empty() {
            log::warn!("{}", warnings);
        }

        Ok(fs::read(&scratch.binary)?)
    }
}

/// Returns what the compiler printed, preferring stderr.
fn diagnostics(output: &Output) -> String {
    let stream = if output.stderr.iter().all(u8::is_ascii_whitespace) {
        &output.stdout
    } else {
        &output.stderr
    };

    String::from_utf8_lossy(stream).trim().to_owned()
}

/// Paths of the files one compilation works with. They're removed when this is dropped.
struct ScratchFiles {
    source: PathBuf,
    binary: PathBuf,
    keep_source: bool,
}

impl ScratchFiles {
    fn new(directory: Option<&Path>, stage: ShaderStage) -> Self {
        static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

        let directory = directory.map_or_else(env::temp_dir, ToOwned::to_owned);
        let base = directory.join(format!(
            "mspv-{}-{}-{}",
            std::process::id(),
            NEXT_ID.fetch_add(1, Ordering::Relaxed),
            stage.glslc_name(),
        ));

        ScratchFiles {
            source: fs::sibling_path(&base, ".merge_temp.glsl"),
            binary: fs::sibling_path(&base, ".spv"),
            keep_source: false,
        }
    }

    fn keep_source(&mut self) {
        self.keep_source = true;
    }
}

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        fs::remove_if_exists(&self.binary);

        if !self.keep_source {
            fs::remove_if_exists(&self.source);
        }
    }
}
