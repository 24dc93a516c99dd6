//! Binary VDF codec
//!
//! Steam stores `shortcuts.vdf` as a binary keyed tree. Every node is a type
//! byte, a NUL-terminated key and a payload; maps are closed with `0x08` and
//! the document itself is closed by one more `0x08`.
//!
//! This module knows nothing about shortcuts. It reads bytes into an ordered
//! tree and writes the tree back, keeping key order and key spelling so that
//! `write_document(&read_document(bytes)?) == bytes` for any well-formed input.

use thiserror::Error;

const TYPE_MAP: u8 = 0x00;
const TYPE_STRING: u8 = 0x01;
const TYPE_INT32: u8 = 0x02;
const TYPE_FLOAT32: u8 = 0x03;
const TYPE_POINTER: u8 = 0x04;
const TYPE_WIDE_STRING: u8 = 0x05;
const TYPE_COLOR: u8 = 0x06;
const TYPE_UINT64: u8 = 0x07;
const TYPE_END: u8 = 0x08;
const TYPE_INT64: u8 = 0x0A;

/// Nested maps deeper than this are rejected instead of recursing further.
const MAX_DEPTH: usize = 64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VdfError {
    #[error("unexpected end of data at offset {offset}")]
    UnexpectedEof { offset: usize },

    #[error("unterminated string starting at offset {offset}")]
    UnterminatedString { offset: usize },

    #[error("invalid UTF-8 in string at offset {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("invalid UTF-16 in wide string at offset {offset}")]
    InvalidUtf16 { offset: usize },

    #[error("unknown node type 0x{type_byte:02x} at offset {offset}")]
    UnknownType { type_byte: u8, offset: usize },

    #[error("maps nested deeper than 64 levels")]
    TooDeep,

    #[error("document ended at offset {offset} but data is {len} bytes long")]
    TrailingData { offset: usize, len: usize },
}

/// Payload of a single node
#[derive(Debug, Clone, PartialEq)]
pub enum VdfValue {
    Map(Vec<VdfNode>),
    String(String),
    Int32(u32),
    Float32(f32),
    Pointer(u32),
    WideString(String),
    Color(u32),
    UInt64(u64),
    Int64(i64),
}

impl VdfValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            VdfValue::String(s) | VdfValue::WideString(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            VdfValue::Int32(v) | VdfValue::Pointer(v) | VdfValue::Color(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[VdfNode]> {
        match self {
            VdfValue::Map(children) => Some(children),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VdfNode {
    pub key: String,
    pub value: VdfValue,
}

impl VdfNode {
    pub fn new(key: impl Into<String>, value: VdfValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, VdfValue::String(value.into()))
    }

    pub fn int(key: impl Into<String>, value: u32) -> Self {
        Self::new(key, VdfValue::Int32(value))
    }

    pub fn map(key: impl Into<String>, children: Vec<VdfNode>) -> Self {
        Self::new(key, VdfValue::Map(children))
    }
}

/// Parse a whole binary VDF document into its top-level nodes.
///
/// Empty input is an empty document, not an error.
pub fn read_document(data: &[u8]) -> Result<Vec<VdfNode>, VdfError> {
    if data.is_empty() {
        return Ok(Vec::new());
    }

    let mut reader = Reader { data, pos: 0 };
    let nodes = reader.read_map_body(0)?;

    if reader.pos != data.len() {
        return Err(VdfError::TrailingData {
            offset: reader.pos,
            len: data.len(),
        });
    }

    Ok(nodes)
}

/// Serialize top-level nodes into a binary VDF document.
pub fn write_document(nodes: &[VdfNode]) -> Vec<u8> {
    let mut buf = Vec::new();
    write_map_body(&mut buf, nodes);
    buf
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn read_map_body(&mut self, depth: usize) -> Result<Vec<VdfNode>, VdfError> {
        if depth > MAX_DEPTH {
            return Err(VdfError::TooDeep);
        }

        let mut nodes = Vec::new();
        loop {
            let type_offset = self.pos;
            let type_byte = self.read_u8()?;
            if type_byte == TYPE_END {
                return Ok(nodes);
            }

            let key = self.read_cstr()?;
            let value = match type_byte {
                TYPE_MAP => VdfValue::Map(self.read_map_body(depth + 1)?),
                TYPE_STRING => VdfValue::String(self.read_cstr()?),
                TYPE_INT32 => VdfValue::Int32(u32::from_le_bytes(self.read_array()?)),
                TYPE_FLOAT32 => VdfValue::Float32(f32::from_le_bytes(self.read_array()?)),
                TYPE_POINTER => VdfValue::Pointer(u32::from_le_bytes(self.read_array()?)),
                TYPE_WIDE_STRING => VdfValue::WideString(self.read_wide_cstr()?),
                TYPE_COLOR => VdfValue::Color(u32::from_le_bytes(self.read_array()?)),
                TYPE_UINT64 => VdfValue::UInt64(u64::from_le_bytes(self.read_array()?)),
                TYPE_INT64 => VdfValue::Int64(i64::from_le_bytes(self.read_array()?)),
                other => {
                    return Err(VdfError::UnknownType {
                        type_byte: other,
                        offset: type_offset,
                    });
                }
            };

            nodes.push(VdfNode { key, value });
        }
    }

    fn read_u8(&mut self) -> Result<u8, VdfError> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or(VdfError::UnexpectedEof { offset: self.pos })?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], VdfError> {
        let end = self.pos + N;
        let bytes = self
            .data
            .get(self.pos..end)
            .ok_or(VdfError::UnexpectedEof { offset: self.pos })?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        self.pos = end;
        Ok(out)
    }

    fn read_cstr(&mut self) -> Result<String, VdfError> {
        let start = self.pos;
        let len = self.data[start..]
            .iter()
            .position(|&b| b == 0x00)
            .ok_or(VdfError::UnterminatedString { offset: start })?;
        let value = std::str::from_utf8(&self.data[start..start + len])
            .map_err(|_| VdfError::InvalidUtf8 { offset: start })?
            .to_string();
        self.pos = start + len + 1;
        Ok(value)
    }

    fn read_wide_cstr(&mut self) -> Result<String, VdfError> {
        let start = self.pos;
        let mut units = Vec::new();
        loop {
            let unit = u16::from_le_bytes(
                self.read_array()
                    .map_err(|_| VdfError::UnterminatedString { offset: start })?,
            );
            if unit == 0 {
                break;
            }
            units.push(unit);
        }
        String::from_utf16(&units).map_err(|_| VdfError::InvalidUtf16 { offset: start })
    }
}

fn write_map_body(buf: &mut Vec<u8>, nodes: &[VdfNode]) {
    for node in nodes {
        write_node(buf, node);
    }
    buf.push(TYPE_END);
}

fn write_node(buf: &mut Vec<u8>, node: &VdfNode) {
    let type_byte = match &node.value {
        VdfValue::Map(_) => TYPE_MAP,
        VdfValue::String(_) => TYPE_STRING,
        VdfValue::Int32(_) => TYPE_INT32,
        VdfValue::Float32(_) => TYPE_FLOAT32,
        VdfValue::Pointer(_) => TYPE_POINTER,
        VdfValue::WideString(_) => TYPE_WIDE_STRING,
        VdfValue::Color(_) => TYPE_COLOR,
        VdfValue::UInt64(_) => TYPE_UINT64,
        VdfValue::Int64(_) => TYPE_INT64,
    };
    buf.push(type_byte);
    write_cstr(buf, &node.key);

    match &node.value {
        VdfValue::Map(children) => write_map_body(buf, children),
        VdfValue::String(s) => write_cstr(buf, s),
        VdfValue::Int32(v) | VdfValue::Pointer(v) | VdfValue::Color(v) => {
            buf.extend_from_slice(&v.to_le_bytes())
        }
        VdfValue::Float32(v) => buf.extend_from_slice(&v.to_le_bytes()),
        VdfValue::WideString(s) => {
            for unit in s.encode_utf16() {
                buf.extend_from_slice(&unit.to_le_bytes());
            }
            buf.extend_from_slice(&[0x00, 0x00]);
        }
        VdfValue::UInt64(v) => buf.extend_from_slice(&v.to_le_bytes()),
        VdfValue::Int64(v) => buf.extend_from_slice(&v.to_le_bytes()),
    }
}

fn write_cstr(buf: &mut Vec<u8>, value: &str) {
    buf.extend_from_slice(value.as_bytes());
    buf.push(0x00);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> Vec<VdfNode> {
        vec![VdfNode::map(
            "shortcuts",
            vec![VdfNode::map(
                "0",
                vec![
                    VdfNode::string("AppName", "Chrome"),
                    VdfNode::int("IsHidden", 0),
                    VdfNode::map("tags", vec![VdfNode::string("0", "Browsers")]),
                ],
            )],
        )]
    }

    #[test]
    fn empty_input_is_empty_document() {
        assert_eq!(read_document(&[]).unwrap(), Vec::new());
    }

    #[test]
    fn writes_expected_bytes() {
        let doc = vec![VdfNode::map("s", vec![VdfNode::int("n", 258)])];
        let bytes = write_document(&doc);
        assert_eq!(
            bytes,
            vec![
                0x00, b's', 0x00, // map "s"
                0x02, b'n', 0x00, 0x02, 0x01, 0x00, 0x00, // int n = 258
                0x08, // end of "s"
                0x08, // end of document
            ]
        );
    }

    #[test]
    fn parse_then_write_is_byte_identical() {
        let mut original = write_document(&sample_document());
        // Splice in node types the shortcut layer never produces.
        let doc = vec![VdfNode::map(
            "root",
            vec![
                VdfNode::new("f", VdfValue::Float32(1.5)),
                VdfNode::new("w", VdfValue::WideString("wide ü".into())),
                VdfNode::new("u", VdfValue::UInt64(u64::MAX - 3)),
                VdfNode::new("i", VdfValue::Int64(-42)),
                VdfNode::new("c", VdfValue::Color(0x00ff00ff)),
                VdfNode::new("p", VdfValue::Pointer(7)),
            ],
        )];
        let extra = write_document(&doc);
        original.pop();
        original.extend_from_slice(&extra[..extra.len() - 1]);
        original.push(TYPE_END);

        let parsed = read_document(&original).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(write_document(&parsed), original);
    }

    #[test]
    fn preserves_key_spelling_and_order() {
        let doc = vec![VdfNode::map(
            "shortcuts",
            vec![VdfNode::map(
                "0",
                vec![
                    VdfNode::string("exe", "/usr/bin/flatpak"),
                    VdfNode::string("appname", "Edge"),
                ],
            )],
        )];
        let parsed = read_document(&write_document(&doc)).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn truncated_input_is_rejected() {
        let bytes = write_document(&sample_document());
        let err = read_document(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, VdfError::UnexpectedEof { .. }));
    }

    #[test]
    fn truncated_integer_is_rejected() {
        let bytes = [0x00, b's', 0x00, 0x02, b'n', 0x00, 0x01, 0x02];
        let err = read_document(&bytes).unwrap_err();
        assert_eq!(err, VdfError::UnexpectedEof { offset: 6 });
    }

    #[test]
    fn unterminated_string_is_rejected() {
        let bytes = [0x00, b's', b'h'];
        let err = read_document(&bytes).unwrap_err();
        assert_eq!(err, VdfError::UnterminatedString { offset: 1 });
    }

    #[test]
    fn unknown_type_is_rejected() {
        let bytes = [0x00, b's', 0x00, 0x0b, b'x', 0x00, 0x08, 0x08];
        let err = read_document(&bytes).unwrap_err();
        assert_eq!(
            err,
            VdfError::UnknownType {
                type_byte: 0x0b,
                offset: 3
            }
        );
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = write_document(&sample_document());
        bytes.push(0x08);
        let err = read_document(&bytes).unwrap_err();
        assert!(matches!(err, VdfError::TrailingData { .. }));
    }

    #[test]
    fn text_garbage_is_rejected() {
        assert!(read_document(b"\"shortcuts\"\n{\n}\n").is_err());
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let mut bytes = Vec::new();
        for _ in 0..=MAX_DEPTH + 1 {
            bytes.extend_from_slice(&[0x00, b'm', 0x00]);
        }
        assert_eq!(read_document(&bytes).unwrap_err(), VdfError::TooDeep);
    }
}
