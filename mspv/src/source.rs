//! Assembly of a stage's source text from GLSL fragments.
//!
//! A shader is usually split over a few files: shared declarations first, the stage's `main`
//! last. They're joined in inclusion order before being handed to the compiler.

use crate::fs::{self, IoError};
use std::path::Path;

/// Separator written after every fragment.
const FRAGMENT_SEPARATOR: &str = "\n\n";

/// Joins `fragments` in order, each followed by a blank line, and ends the text with one more
/// blank line.
pub fn assemble_sources<S>(fragments: &[S]) -> String
where
    S: AsRef<str>,
{
    let len = fragments
        .iter()
        .map(|fragment| fragment.as_ref().len() + FRAGMENT_SEPARATOR.len())
        .sum::<usize>()
        + FRAGMENT_SEPARATOR.len();

    let mut source = String::with_capacity(len);
    for fragment in fragments {
        source.push_str(fragment.as_ref());
        source.push_str(FRAGMENT_SEPARATOR);
    }
    source.push_str(FRAGMENT_SEPARATOR);

    source
}

/// Reads every file in `paths` and joins their contents with [`assemble_sources`].
pub fn read_sources<P>(paths: &[P]) -> Result<String, IoError>
where
    P: AsRef<Path>,
{
    let fragments = paths
        .iter()
        .map(fs::read_to_string)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(assemble_sources(&fragments))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inclusion_order() {
        let source = assemble_sources(&[
            "#version 450",
            "layout(location = 0) in vec3 pos;",
            "void main() {}",
        ]);

        assert_eq!(
            source,
            "#version 450\n\nlayout(location = 0) in vec3 pos;\n\nvoid main() {}\n\n\n\n",
        );
    }

    #[test]
    fn no_fragments() {
        let fragments: [&str; 0] = [];
        assert_eq!(assemble_sources(&fragments), "\n\n");
    }

    #[test]
    fn missing_fragment() {
        let err = read_sources(&["/no/such/common.glsl"]).unwrap_err();
        assert_eq!(err.path, Path::new("/no/such/common.glsl"));
    }
}
