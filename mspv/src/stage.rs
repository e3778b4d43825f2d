//! Identifiers of the pipeline stages that can be stored in a container.

use std::{
    error::Error,
    fmt::{Display, Error as FmtError, Formatter},
    str::FromStr,
};

/// A stage of the graphics pipeline that is compiled as an independent binary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// All stages, in the order their segments appear in a container.
    pub const ALL: [ShaderStage; 2] = [ShaderStage::Vertex, ShaderStage::Fragment];

    /// Returns the four-byte tag that precedes the stage's segment in a container.
    #[inline]
    pub const fn tag(self) -> [u8; 4] {
        match self {
            Self::Vertex => *b"VERT",
            Self::Fragment => *b"FRAG",
        }
    }

    /// Returns the name `glslc` expects after `-fshader-stage=`.
    #[inline]
    pub const fn glslc_name(self) -> &'static str {
        match self {
            Self::Vertex => "vert",
            Self::Fragment => "frag",
        }
    }
}

impl Display for ShaderStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            Self::Vertex => write!(f, "vertex"),
            Self::Fragment => write!(f, "fragment"),
        }
    }
}

impl FromStr for ShaderStage {
    type Err = UnknownStageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vert" | "vertex" => Ok(Self::Vertex),
            "frag" | "fragment" => Ok(Self::Fragment),
            _ => Err(UnknownStageError {
                name: s.to_owned(),
            }),
        }
    }
}

/// Error returned when parsing a stage name that isn't `vert`, `vertex`, `frag` or `fragment`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownStageError {
    pub name: String,
}

impl Error for UnknownStageError {}

impl Display for UnknownStageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        write!(
            f,
            "unknown shader stage `{}`, expected `vert` or `frag`",
            self.name,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::ShaderStage;

    #[test]
    fn parse_names() {
        assert_eq!("vert".parse(), Ok(ShaderStage::Vertex));
        assert_eq!("vertex".parse(), Ok(ShaderStage::Vertex));
        assert_eq!("frag".parse(), Ok(ShaderStage::Fragment));
        assert_eq!("fragment".parse(), Ok(ShaderStage::Fragment));

        let err = "comp".parse::<ShaderStage>().unwrap_err();
        assert_eq!(err.name, "comp");
    }

    #[test]
    fn stage_names_are_case_sensitive() {
        assert!("VERT".parse::<ShaderStage>().is_err());
    }

    #[test]
    fn tags() {
        assert_eq!(&ShaderStage::Vertex.tag(), b"VERT");
        assert_eq!(&ShaderStage::Fragment.tag(), b"FRAG");
        assert_eq!(ShaderStage::ALL[0], ShaderStage::Vertex);
    }
}
