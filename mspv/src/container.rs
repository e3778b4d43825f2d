//! The MSPV container format.
//!
//! An MSPV container packs the compiled vertex and fragment binaries of one shader into a
//! single file that an engine can load in one read. The layout is:
//!
//! | Field            | Size | Content                              |
//! |------------------|------|--------------------------------------|
//! | magic            | 4    | `MSPV`                               |
//! | vertex tag       | 4    | `VERT`                               |
//! | vertex length    | 4    | little-endian `u32`                  |
//! | vertex payload   | n    | vertex binary                        |
//! | fragment tag     | 4    | `FRAG`                               |
//! | fragment length  | 4    | little-endian `u32`                  |
//! | fragment payload | m    | fragment binary                      |
//!
//! The vertex segment always comes first. Payloads are opaque; nothing here looks inside
//! them.
//!
//! ```
//! use mspv::container::{self, ContainerRef};
//!
//! let data = container::encode(&[1, 2, 3], &[0xAA, 0xBB]).unwrap();
//! assert_eq!(data.len(), 25);
//!
//! let ContainerRef { vertex, fragment } = container::decode(&data).unwrap();
//! assert_eq!(vertex, &[1, 2, 3]);
//! assert_eq!(fragment, &[0xAA, 0xBB]);
//! ```

use crate::stage::ShaderStage;
use std::{
    error::Error,
    fmt::{Display, Error as FmtError, Formatter},
    mem,
};

/// The four bytes every container starts with.
pub const MAGIC: [u8; 4] = *b"MSPV";

const MAGIC_LEN: usize = MAGIC.len();

/// Size of a tag followed by a length field.
const SEGMENT_HEADER_LEN: usize = 8;

/// Returns the size in bytes of a container holding payloads of the given lengths.
#[inline]
pub const fn encoded_len(vertex_len: usize, fragment_len: usize) -> usize {
    MAGIC_LEN + SEGMENT_HEADER_LEN + vertex_len + SEGMENT_HEADER_LEN + fragment_len
}

/// Builds a container from a vertex and a fragment binary.
///
/// The output only depends on the two payloads, so encoding the same pair twice gives the same
/// bytes.
pub fn encode(vertex: &[u8], fragment: &[u8]) -> Result<Vec<u8>, FormatError> {
    let mut out = Vec::with_capacity(encoded_len(vertex.len(), fragment.len()));
    encode_into(vertex, fragment, &mut out)?;

    Ok(out)
}

/// Same as [`encode`], but appends the container to `out`.
///
/// On error `out` is left untouched.
pub fn encode_into(vertex: &[u8], fragment: &[u8], out: &mut Vec<u8>) -> Result<(), FormatError> {
    let vertex_len = segment_len(ShaderStage::Vertex, vertex)?;
    let fragment_len = segment_len(ShaderStage::Fragment, fragment)?;

    out.reserve(encoded_len(vertex.len(), fragment.len()));
    out.extend_from_slice(&MAGIC);
    write_segment(out, ShaderStage::Vertex, vertex_len, vertex);
    write_segment(out, ShaderStage::Fragment, fragment_len, fragment);

    Ok(())
}

fn segment_len(stage: ShaderStage, payload: &[u8]) -> Result<u32, FormatError> {
    u32::try_from(payload.len()).map_err(|_| FormatError::PayloadTooLarge {
        stage,
        len: payload.len(),
    })
}

fn write_segment(out: &mut Vec<u8>, stage: ShaderStage, len: u32, payload: &[u8]) {
    out.extend_from_slice(&stage.tag());
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(payload);
}

/// Parses a container, borrowing both payloads from `data`.
///
/// The buffer must hold exactly one container: bytes after the fragment payload are an error.
pub fn decode(data: &[u8]) -> Result<ContainerRef<'_>, FormatError> {
    let mut reader = Reader { rest: data };

    let magic: [u8; 4] = reader.take_array(Field::Magic)?;
    if magic != MAGIC {
        return Err(FormatError::BadMagic { found: magic });
    }

    let vertex = reader.segment(ShaderStage::Vertex)?;
    let fragment = reader.segment(ShaderStage::Fragment)?;

    if !reader.rest.is_empty() {
        return Err(FormatError::TrailingBytes {
            count: reader.rest.len(),
        });
    }

    Ok(ContainerRef { vertex, fragment })
}

/// Forward-only view over the bytes that haven't been consumed yet.
struct Reader<'a> {
    rest: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take_array<const N: usize>(&mut self, field: Field) -> Result<[u8; N], FormatError> {
        if self.rest.len() < N {
            return Err(FormatError::Truncated {
                field,
                needed: N,
                available: self.rest.len(),
            });
        }

        let (head, rest) = self.rest.split_at(N);
        self.rest = rest;

        let mut array = [0; N];
        array.copy_from_slice(head);

        Ok(array)
    }

    fn segment(&mut self, stage: ShaderStage) -> Result<&'a [u8], FormatError> {
        let header: [u8; SEGMENT_HEADER_LEN] = self.take_array(Field::SegmentHeader(stage))?;
        let (tag, len) = header.split_at(4);

        if tag != stage.tag() {
            let mut found = [0; 4];
            found.copy_from_slice(tag);

            return Err(FormatError::BadTag {
                expected: stage,
                found,
            });
        }

        let mut len_bytes = [0; 4];
        len_bytes.copy_from_slice(len);
        let declared = u32::from_le_bytes(len_bytes);

        if declared as usize > self.rest.len() {
            return Err(FormatError::LengthOverrun {
                stage,
                declared,
                available: self.rest.len(),
            });
        }

        let (payload, rest) = self.rest.split_at(declared as usize);
        self.rest = rest;

        Ok(payload)
    }
}

/// A decoded container whose payloads borrow from the decoded buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContainerRef<'a> {
    pub vertex: &'a [u8],
    pub fragment: &'a [u8],
}

impl<'a> ContainerRef<'a> {
    /// Returns the payload of `stage`.
    #[inline]
    pub fn stage(&self, stage: ShaderStage) -> &'a [u8] {
        match stage {
            ShaderStage::Vertex => self.vertex,
            ShaderStage::Fragment => self.fragment,
        }
    }

    /// Copies the payload of `stage` into 32-bit words in native byte order, which is the form
    /// shader module creation takes.
    pub fn words(&self, stage: ShaderStage) -> Result<Vec<u32>, FormatError> {
        payload_words(stage, self.stage(stage))
    }

    /// Copies both payloads into an owned [`Container`].
    pub fn to_container(self) -> Container {
        Container {
            vertex: self.vertex.to_vec(),
            fragment: self.fragment.to_vec(),
        }
    }
}

fn payload_words(stage: ShaderStage, payload: &[u8]) -> Result<Vec<u32>, FormatError> {
    if payload.len() % mem::size_of::<u32>() != 0 {
        return Err(FormatError::MisalignedPayload {
            stage,
            len: payload.len(),
        });
    }

    Ok(bytemuck::pod_collect_to_vec(payload))
}

/// A vertex and fragment binary pair, owned.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Container {
    pub vertex: Vec<u8>,
    pub fragment: Vec<u8>,
}

impl Container {
    #[inline]
    pub fn new(vertex: Vec<u8>, fragment: Vec<u8>) -> Self {
        Self { vertex, fragment }
    }

    /// Parses a container and copies its payloads out of `data`.
    pub fn decode(data: &[u8]) -> Result<Self, FormatError> {
        decode(data).map(ContainerRef::to_container)
    }

    /// Serializes the container. See [`encode`].
    pub fn encode(&self) -> Result<Vec<u8>, FormatError> {
        encode(&self.vertex, &self.fragment)
    }

    /// Returns the size of the serialized container.
    #[inline]
    pub fn encoded_len(&self) -> usize {
        encoded_len(self.vertex.len(), self.fragment.len())
    }

    /// Returns the payload of `stage`.
    #[inline]
    pub fn stage(&self, stage: ShaderStage) -> &[u8] {
        self.view().stage(stage)
    }

    /// See [`ContainerRef::words`].
    pub fn words(&self, stage: ShaderStage) -> Result<Vec<u32>, FormatError> {
        payload_words(stage, self.stage(stage))
    }

    /// Borrows the payloads as a [`ContainerRef`].
    #[inline]
    pub fn view(&self) -> ContainerRef<'_> {
        ContainerRef {
            vertex: &self.vertex,
            fragment: &self.fragment,
        }
    }
}

/// The fixed-size part of a container that a truncated buffer ended in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Magic,
    /// The tag and length field in front of a stage's payload.
    SegmentHeader(ShaderStage),
}

impl Display for Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            Self::Magic => write!(f, "magic"),
            Self::SegmentHeader(stage) => write!(f, "{} segment header", stage),
        }
    }
}

/// Error that can happen when reading or writing a container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormatError {
    /// The buffer doesn't start with `MSPV`.
    BadMagic { found: [u8; 4] },

    /// A segment doesn't start with the tag of the stage expected at that position.
    BadTag {
        expected: ShaderStage,
        found: [u8; 4],
    },

    /// The buffer ends in the middle of a fixed-size field.
    Truncated {
        field: Field,
        needed: usize,
        available: usize,
    },

    /// A length field declares more bytes than the buffer has left.
    LengthOverrun {
        stage: ShaderStage,
        declared: u32,
        available: usize,
    },

    /// Bytes follow the fragment segment.
    TrailingBytes { count: usize },

    /// A payload is too long for its length field.
    PayloadTooLarge { stage: ShaderStage, len: usize },

    /// A payload can't be viewed as 32-bit words because its length isn't a multiple of 4.
    MisalignedPayload { stage: ShaderStage, len: usize },
}

impl FormatError {
    /// Returns whether the error means the buffer ended before the container did, either
    /// inside a fixed-size field or inside a payload.
    pub fn is_truncation(&self) -> bool {
        matches!(self, Self::Truncated { .. } | Self::LengthOverrun { .. })
    }
}

impl Error for FormatError {}

impl Display for FormatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            Self::BadMagic { found } => write!(
                f,
                "not an MSPV container: expected magic `MSPV`, found `{}`",
                found.escape_ascii(),
            ),
            Self::BadTag { expected, found } => write!(
                f,
                "expected the {} segment tag `{}`, found `{}`",
                expected,
                expected.tag().escape_ascii(),
                found.escape_ascii(),
            ),
            Self::Truncated {
                field,
                needed,
                available,
            } => write!(
                f,
                "the container is truncated: the {} needs {} bytes but only {} remain",
                field, needed, available,
            ),
            Self::LengthOverrun {
                stage,
                declared,
                available,
            } => write!(
                f,
                "the {} segment declares {} bytes but only {} remain",
                stage, declared, available,
            ),
            Self::TrailingBytes { count } => write!(
                f,
                "{} unexpected bytes follow the fragment segment",
                count,
            ),
            Self::PayloadTooLarge { stage, len } => write!(
                f,
                "the {} payload is {} bytes long, which doesn't fit a 32-bit length field",
                stage, len,
            ),
            Self::MisalignedPayload { stage, len } => write!(
                f,
                "the {} payload is {} bytes long, which is not a multiple of 4",
                stage, len,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_layout() {
        let data = encode(&[0x01, 0x02, 0x03], &[0xAA, 0xBB]).unwrap();

        let mut expected = Vec::new();
        expected.extend_from_slice(b"MSPV");
        expected.extend_from_slice(b"VERT");
        expected.extend_from_slice(&3u32.to_le_bytes());
        expected.extend_from_slice(&[0x01, 0x02, 0x03]);
        expected.extend_from_slice(b"FRAG");
        expected.extend_from_slice(&2u32.to_le_bytes());
        expected.extend_from_slice(&[0xAA, 0xBB]);

        assert_eq!(data, expected);
        assert_eq!(data.len(), 25);
        assert_eq!(encoded_len(3, 2), 25);
    }

    #[test]
    fn round_trip() {
        let vertex: Vec<u8> = (0..=255).collect();
        let fragment = b"\x03\x02\x23\x07 not really spir-v".to_vec();

        let data = encode(&vertex, &fragment).unwrap();
        let decoded = decode(&data).unwrap();

        assert_eq!(decoded.vertex, &vertex[..]);
        assert_eq!(decoded.fragment, &fragment[..]);
        assert_eq!(data.len(), 4 + 8 + vertex.len() + 8 + fragment.len());
    }

    #[test]
    fn empty_payloads() {
        let data = encode(&[], &[]).unwrap();
        assert_eq!(data.len(), 20);

        let decoded = decode(&data).unwrap();
        assert!(decoded.vertex.is_empty());
        assert!(decoded.fragment.is_empty());
    }

    #[test]
    fn deterministic() {
        let first = encode(b"vertex", b"fragment").unwrap();
        let second = encode(b"vertex", b"fragment").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn encode_into_appends() {
        let mut out = b"prefix".to_vec();
        encode_into(&[1], &[2], &mut out).unwrap();

        assert_eq!(&out[..6], b"prefix");
        assert_eq!(decode(&out[6..]).unwrap().vertex, &[1]);
    }

    #[test]
    fn bad_magic() {
        let mut data = encode(&[1], &[2]).unwrap();
        data[..4].copy_from_slice(b"mspv");

        assert_eq!(
            decode(&data),
            Err(FormatError::BadMagic { found: *b"mspv" }),
        );
        assert_eq!(
            decode(b"SPV\x07"),
            Err(FormatError::BadMagic {
                found: *b"SPV\x07"
            }),
        );
    }

    #[test]
    fn bad_tags() {
        let mut data = encode(&[1, 2], &[3]).unwrap();
        data[4..8].copy_from_slice(b"FRAG");
        assert_eq!(
            decode(&data),
            Err(FormatError::BadTag {
                expected: ShaderStage::Vertex,
                found: *b"FRAG",
            }),
        );

        let mut data = encode(&[1, 2], &[3]).unwrap();
        let frag_tag = 4 + 8 + 2;
        data[frag_tag..frag_tag + 4].copy_from_slice(b"frag");
        assert_eq!(
            decode(&data),
            Err(FormatError::BadTag {
                expected: ShaderStage::Fragment,
                found: *b"frag",
            }),
        );
    }

    #[test]
    fn every_truncation_is_rejected() {
        let data = encode(&[1, 2, 3], &[0xAA, 0xBB]).unwrap();

        for len in 0..data.len() {
            let err = decode(&data[..len]).unwrap_err();
            assert!(err.is_truncation(), "cut at {}: {:?}", len, err);
        }
    }

    #[test]
    fn truncated_fields() {
        let data = encode(&[1, 2, 3], &[0xAA, 0xBB]).unwrap();

        assert_eq!(
            decode(&data[..2]),
            Err(FormatError::Truncated {
                field: Field::Magic,
                needed: 4,
                available: 2,
            }),
        );
        assert_eq!(
            decode(&data[..9]),
            Err(FormatError::Truncated {
                field: Field::SegmentHeader(ShaderStage::Vertex),
                needed: 8,
                available: 5,
            }),
        );
        assert_eq!(
            decode(&data[..17]),
            Err(FormatError::Truncated {
                field: Field::SegmentHeader(ShaderStage::Fragment),
                needed: 8,
                available: 2,
            }),
        );
    }

    #[test]
    fn length_overrun() {
        let mut data = encode(&[1, 2, 3], &[0xAA, 0xBB]).unwrap();
        data[8..12].copy_from_slice(&1000u32.to_le_bytes());

        assert_eq!(
            decode(&data),
            Err(FormatError::LengthOverrun {
                stage: ShaderStage::Vertex,
                declared: 1000,
                available: 13,
            }),
        );

        let mut data = encode(&[1, 2, 3], &[0xAA, 0xBB]).unwrap();
        data[19..23].copy_from_slice(&3u32.to_le_bytes());
        assert_eq!(
            decode(&data),
            Err(FormatError::LengthOverrun {
                stage: ShaderStage::Fragment,
                declared: 3,
                available: 2,
            }),
        );
    }

    #[test]
    fn trailing_bytes() {
        let mut data = encode(&[1], &[2]).unwrap();
        data.extend_from_slice(b"xyz");

        assert_eq!(decode(&data), Err(FormatError::TrailingBytes { count: 3 }));
    }

    #[test]
    fn shorter_declared_length_leaves_trailing_bytes() {
        let mut data = encode(&[1, 2, 3], &[0xAA, 0xBB]).unwrap();
        data[19..23].copy_from_slice(&1u32.to_le_bytes());

        assert_eq!(decode(&data), Err(FormatError::TrailingBytes { count: 1 }));
    }

    #[test]
    fn owned_container() {
        let container = Container::new(vec![1, 2, 3, 4], vec![5, 6]);
        let data = container.encode().unwrap();

        assert_eq!(data.len(), container.encoded_len());
        assert_eq!(Container::decode(&data).unwrap(), container);
        assert_eq!(container.stage(ShaderStage::Fragment), &[5, 6]);
    }

    #[test]
    fn words() {
        let container = Container::new(
            [0x0723_0203u32, 1].iter().flat_map(|w| w.to_ne_bytes()).collect(),
            vec![1, 2, 3],
        );

        assert_eq!(
            container.words(ShaderStage::Vertex),
            Ok(vec![0x0723_0203, 1]),
        );
        assert_eq!(
            container.view().words(ShaderStage::Fragment),
            Err(FormatError::MisalignedPayload {
                stage: ShaderStage::Fragment,
                len: 3,
            }),
        );
    }

    #[test]
    fn error_messages_name_the_field() {
        let msg = decode(b"MSPVVERT").unwrap_err().to_string();
        assert!(msg.contains("vertex segment header"), "{}", msg);

        let msg = decode(b"ABCD").unwrap_err().to_string();
        assert!(msg.contains("`ABCD`"), "{}", msg);
    }
}
