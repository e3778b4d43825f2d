//! Command line front-end for building MSPV shader containers.
//!
//! ```text
//! mspv compile <include-dir> <output> <stage> <input>...
//! mspv merge <vert.spv> <frag.spv> <output>
//! mspv build <include-dir> <output> <vert-input>... -- <frag-input>...
//! mspv unpack <container> <vert-output> <frag-output>
//! mspv info <container>
//! ```
//!
//! Inputs of `compile` and `build` are GLSL fragments, joined in the order they're given.
//!
//! Environment:
//!
//! - `MSPV_GLSLC`: the `glslc` program to run, `glslc` from `PATH` by default.
//! - `MSPV_COMPILER`: `shaderc` to compile in-process (requires the `shaderc` feature).
//! - `MSPV_KEEP_MERGE`: `0` to delete the assembled source of a failed compilation instead of
//!   keeping it next to the output.
//! - `RUST_LOG`: log filter, `info` by default.

use anyhow::{bail, Context, Result};
use log::LevelFilter;
use mspv::{
    compiler::{CompileInfo, Glslc, ShaderCompiler},
    pipeline, ShaderStage,
};
use std::{
    env,
    ffi::OsString,
    path::{Path, PathBuf},
    process::ExitCode,
};

const USAGE: &str = "\
usage:
    mspv compile <include-dir> <output> <stage> <input>...
    mspv merge <vert.spv> <frag.spv> <output>
    mspv build <include-dir> <output> <vert-input>... -- <frag-input>...
    mspv unpack <container> <vert-output> <frag-output>
    mspv info <container>";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Compile {
        include_dir: PathBuf,
        output: PathBuf,
        stage: ShaderStage,
        inputs: Vec<PathBuf>,
    },
    Merge {
        vertex: PathBuf,
        fragment: PathBuf,
        output: PathBuf,
    },
    Build {
        include_dir: PathBuf,
        output: PathBuf,
        vertex_inputs: Vec<PathBuf>,
        fragment_inputs: Vec<PathBuf>,
    },
    Unpack {
        container: PathBuf,
        vertex: PathBuf,
        fragment: PathBuf,
    },
    Info {
        container: PathBuf,
    },
}

fn parse_args(args: impl IntoIterator<Item = OsString>) -> Result<Command> {
    let mut args = args.into_iter();
    let command = args.next().context("no command given")?;
    let rest: Vec<PathBuf> = args.map(PathBuf::from).collect();

    let command = match command.to_str() {
        Some("compile") => match rest.as_slice() {
            [include_dir, output, stage, inputs @ ..] if !inputs.is_empty() => {
                let stage = stage.to_string_lossy();
                Command::Compile {
                    include_dir: include_dir.clone(),
                    output: output.clone(),
                    stage: stage.parse()?,
                    inputs: inputs.to_vec(),
                }
            }
            _ => bail!("`compile` takes an include directory, an output, a stage and inputs"),
        },
        Some("merge") => match rest.as_slice() {
            [vertex, fragment, output] => Command::Merge {
                vertex: vertex.clone(),
                fragment: fragment.clone(),
                output: output.clone(),
            },
            _ => bail!("`merge` takes a vertex binary, a fragment binary and an output"),
        },
        Some("build") => match rest.as_slice() {
            [include_dir, output, inputs @ ..] => {
                let separator = inputs
                    .iter()
                    .position(|arg| arg.as_os_str() == "--")
                    .context("`build` needs `--` between the vertex and fragment inputs")?;
                let (vertex_inputs, fragment_inputs) =
                    (&inputs[..separator], &inputs[separator + 1..]);

                if vertex_inputs.is_empty() || fragment_inputs.is_empty() {
                    bail!("`build` needs at least one vertex and one fragment input");
                }

                Command::Build {
                    include_dir: include_dir.clone(),
                    output: output.clone(),
                    vertex_inputs: vertex_inputs.to_vec(),
                    fragment_inputs: fragment_inputs.to_vec(),
                }
            }
            _ => bail!("`build` takes an include directory, an output and inputs"),
        },
        Some("unpack") => match rest.as_slice() {
            [container, vertex, fragment] => Command::Unpack {
                container: container.clone(),
                vertex: vertex.clone(),
                fragment: fragment.clone(),
            },
            _ => bail!("`unpack` takes a container, a vertex output and a fragment output"),
        },
        Some("info") => match rest.as_slice() {
            [container] => Command::Info {
                container: container.clone(),
            },
            _ => bail!("`info` takes a container"),
        },
        _ => bail!("unknown command `{}`", command.to_string_lossy()),
    };

    Ok(command)
}

fn compiler() -> Result<Box<dyn ShaderCompiler>> {
    match env::var("MSPV_COMPILER").as_deref() {
        Ok("shaderc") => {
            #[cfg(feature = "shaderc")]
            return Ok(Box::new(mspv::compiler::Shaderc::new()));
            #[cfg(not(feature = "shaderc"))]
            bail!("`MSPV_COMPILER=shaderc` requires building with the `shaderc` feature");
        }
        Ok("glslc") | Ok("") | Err(_) => Ok(Box::new(Glslc::from_env())),
        Ok(other) => bail!("unknown compiler `{}`, expected `glslc` or `shaderc`", other),
    }
}

fn keep_failed_sources() -> bool {
    env::var_os("MSPV_KEEP_MERGE").map_or(true, |value| value != "0")
}

/// Returns the directory `output` goes into, creating it if needed. Scratch files are put there,
/// so that a kept merge file sits next to the output it was meant for.
fn scratch_directory(output: &Path) -> Result<&Path> {
    let directory = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    mspv::fs::create_dir_all(directory)?;

    Ok(directory)
}

fn error_report(err: &anyhow::Error) -> String {
    format!("error: {:?}", err)
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Compile {
            include_dir,
            output,
            stage,
            inputs,
        } => {
            let include_directories = [include_dir];
            let scratch_directory = scratch_directory(&output)?;
            let info = CompileInfo {
                include_directories: &include_directories,
                scratch_directory: Some(scratch_directory),
                keep_failed_sources: keep_failed_sources(),
                ..Default::default()
            };

            pipeline::compile_file(&*compiler()?, stage, &inputs, &output, &info)
                .with_context(|| format!("failed to build `{}`", output.display()))?;
        }
        Command::Merge {
            vertex,
            fragment,
            output,
        } => {
            pipeline::merge_files(&vertex, &fragment, &output)
                .with_context(|| format!("failed to merge into `{}`", output.display()))?;
        }
        Command::Build {
            include_dir,
            output,
            vertex_inputs,
            fragment_inputs,
        } => {
            let include_directories = [include_dir];
            let scratch_directory = scratch_directory(&output)?;
            let info = CompileInfo {
                include_directories: &include_directories,
                scratch_directory: Some(scratch_directory),
                keep_failed_sources: keep_failed_sources(),
                ..Default::default()
            };

            pipeline::build(
                &*compiler()?,
                &vertex_inputs,
                &fragment_inputs,
                &output,
                &info,
            )
            .with_context(|| format!("failed to build `{}`", output.display()))?;
        }
        Command::Unpack {
            container,
            vertex,
            fragment,
        } => {
            pipeline::unpack(&container, &vertex, &fragment)
                .with_context(|| format!("failed to unpack `{}`", container.display()))?;
        }
        Command::Info { container } => {
            let decoded = pipeline::read_container(&container)?;

            println!("{}", container.display());
            println!("  size:     {} bytes", decoded.encoded_len());
            for stage in ShaderStage::ALL {
                println!(
                    "  {:<9} {} bytes",
                    format!("{}:", stage),
                    decoded.stage(stage).len(),
                );
            }
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let result = parse_args(env::args_os().skip(1))
        .map_err(|err| err.context(USAGE))
        .and_then(run);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", error_report(&err));
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command> {
        parse_args(args.iter().map(OsString::from))
    }

    #[test]
    fn compile() {
        assert_eq!(
            parse(&["compile", "lib", "out.spv", "vert", "a.glsl", "b.glsl"]).unwrap(),
            Command::Compile {
                include_dir: "lib".into(),
                output: "out.spv".into(),
                stage: ShaderStage::Vertex,
                inputs: vec!["a.glsl".into(), "b.glsl".into()],
            },
        );

        assert!(parse(&["compile", "lib", "out.spv", "vert"]).is_err());
        assert!(parse(&["compile", "lib", "out.spv", "geom", "a.glsl"]).is_err());
    }

    #[test]
    fn merge() {
        assert_eq!(
            parse(&["merge", "a.vert.spv", "a.frag.spv", "a.mspv"]).unwrap(),
            Command::Merge {
                vertex: "a.vert.spv".into(),
                fragment: "a.frag.spv".into(),
                output: "a.mspv".into(),
            },
        );

        assert!(parse(&["merge", "a.vert.spv", "a.mspv"]).is_err());
    }

    #[test]
    fn build() {
        assert_eq!(
            parse(&["build", "lib", "a.mspv", "c.glsl", "a.vert", "--", "c.glsl", "a.frag"])
                .unwrap(),
            Command::Build {
                include_dir: "lib".into(),
                output: "a.mspv".into(),
                vertex_inputs: vec!["c.glsl".into(), "a.vert".into()],
                fragment_inputs: vec!["c.glsl".into(), "a.frag".into()],
            },
        );

        assert!(parse(&["build", "lib", "a.mspv", "a.vert", "a.frag"]).is_err());
        assert!(parse(&["build", "lib", "a.mspv", "--", "a.frag"]).is_err());
    }

    #[test]
    fn unpack_and_info() {
        assert_eq!(
            parse(&["unpack", "a.mspv", "v.spv", "f.spv"]).unwrap(),
            Command::Unpack {
                container: "a.mspv".into(),
                vertex: "v.spv".into(),
                fragment: "f.spv".into(),
            },
        );
        assert_eq!(
            parse(&["info", "a.mspv"]).unwrap(),
            Command::Info {
                container: "a.mspv".into(),
            },
        );
    }

    #[test]
    fn scratch_files_go_next_to_the_output() {
        let dir = env::temp_dir().join(format!("mspv-tools-scratch-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let output = dir.join("shaders").join("triangle.spv");

        assert_eq!(scratch_directory(&output).unwrap(), dir.join("shaders"));
        assert!(dir.join("shaders").is_dir());
        assert_eq!(scratch_directory(Path::new("triangle.spv")).unwrap(), Path::new("."));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn errors_are_reported_with_their_causes() {
        let err = parse(&["merge", "a.spv"]).map_err(|err| err.context(USAGE)).unwrap_err();
        let report = error_report(&err);

        assert!(report.starts_with("error: usage:"), "{}", report);
        assert!(report.contains("`merge` takes"), "{}", report);
    }

    #[test]
    fn unknown_command() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["pack"]).is_err());
    }
}
