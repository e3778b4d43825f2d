//! File-level operations: the steps a shader build runs, from GLSL fragments on disk to a
//! container on disk and back.

use crate::{
    compiler::{CompileInfo, ShaderCompiler},
    container::{self, Container, ContainerRef},
    fs, source,
    stage::ShaderStage,
    Error,
};
use std::path::Path;

/// Reads the fragments in `inputs`, joins them in order and compiles the result as `stage`.
pub fn compile_stage<C, P>(
    compiler: &C,
    stage: ShaderStage,
    inputs: &[P],
    info: &CompileInfo<'_>,
) -> Result<Vec<u8>, Error>
where
    C: ShaderCompiler + ?Sized,
    P: AsRef<Path>,
{
    let source = source::read_sources(inputs)?;
    let binary = compiler.compile(stage, &source, info)?;
    log::debug!("compiled the {} shader into {} bytes", stage, binary.len());

    Ok(binary)
}

/// Same as [`compile_stage`], but writes the binary to `output`.
pub fn compile_file<C, P>(
    compiler: &C,
    stage: ShaderStage,
    inputs: &[P],
    output: impl AsRef<Path>,
    info: &CompileInfo<'_>,
) -> Result<(), Error>
where
    C: ShaderCompiler + ?Sized,
    P: AsRef<Path>,
{
    let binary = compile_stage(compiler, stage, inputs, info)?;
    fs::write_atomic(&output, &binary)?;
    log::info!("wrote the {} shader to {}", stage, output.as_ref().display());

    Ok(())
}

/// Packs two compiled binaries read from disk into a container written to `output`.
pub fn merge_files(
    vertex: impl AsRef<Path>,
    fragment: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> Result<Container, Error> {
    let container = Container::new(fs::read(vertex)?, fs::read(fragment)?);
    write_container(&container, output)?;

    Ok(container)
}

/// Compiles both stages and packs them into a container written to `output`.
///
/// Nothing is written if either stage fails to compile.
pub fn build<C, V, F>(
    compiler: &C,
    vertex_inputs: &[V],
    fragment_inputs: &[F],
    output: impl AsRef<Path>,
    info: &CompileInfo<'_>,
) -> Result<Container, Error>
where
    C: ShaderCompiler + ?Sized,
    V: AsRef<Path>,
    F: AsRef<Path>,
{
    let vertex = compile_stage(compiler, ShaderStage::Vertex, vertex_inputs, info)?;
    let fragment = compile_stage(compiler, ShaderStage::Fragment, fragment_inputs, info)?;

    let container = Container::new(vertex, fragment);
    write_container(&container, output)?;

    Ok(container)
}

/// Encodes `container` and writes it to `path`.
pub fn write_container(container: &Container, path: impl AsRef<Path>) -> Result<(), Error> {
    let data = container.encode()?;
    fs::write_atomic(&path, &data)?;
    log::info!(
        "wrote {} ({} bytes of vertex code, {} bytes of fragment code)",
        path.as_ref().display(),
        container.vertex.len(),
        container.fragment.len(),
    );

    Ok(())
}

/// Reads and decodes the container at `path`.
pub fn read_container(path: impl AsRef<Path>) -> Result<Container, Error> {
    let data = fs::read(&path)?;

    container::decode(&data)
        .map(ContainerRef::to_container)
        .map_err(|err| Error::Format {
            path: Some(path.as_ref().to_owned()),
            source: err,
        })
}

/// Reads the container at `path` and writes its payloads to `vertex` and `fragment`.
pub fn unpack(
    path: impl AsRef<Path>,
    vertex: impl AsRef<Path>,
    fragment: impl AsRef<Path>,
) -> Result<Container, Error> {
    let container = read_container(path)?;
    fs::write_atomic(vertex, &container.vertex)?;
    fs::write_atomic(fragment, &container.fragment)?;

    Ok(container)
}
