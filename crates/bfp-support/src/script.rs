//! OP_RETURN script codec.
//!
//! A metadata script is a fixed sequence of eleven items:
//!
//! ```text
//! OP_RETURN <42465000> <01> <chunk_count:1> <name> <ext> <size:2> <sha256> <prev_sha256> <uri> <chunk>
//! ```
//!
//! A chunk script is just `OP_RETURN <chunk>`. Absent fields are written as a
//! zero length `OP_PUSHDATA1` so every field keeps its position.

use crate::constants::{
    CHUNK_COUNT_WIDTH, DIGEST_LEN, FILE_SIZE_WIDTH, LOKAD_ID, MAX_SCRIPT_LEN, MSG_TYPE_FILE,
};
use crate::error::{BfpError, Result};
use crate::message::{BfpMessage, FileMetadata};
use crate::utils::{int_from_be_bytes, int_to_fixed_bytes};
use bitcoin::opcodes::all::{OP_PUSHDATA1, OP_PUSHDATA2, OP_PUSHNUM_1, OP_PUSHNUM_16, OP_RETURN};
use bitcoin::opcodes::Opcode;
use bitcoin::script::Instruction;
use bitcoin::{Script, ScriptBuf, Transaction};

const METADATA_ITEM_COUNT: usize = 11;

/// Largest payload a single push opcode written by this codec can carry.
const MAX_PUSH_LEN: usize = u16::MAX as usize;

/// Encodes a message, failing if the script would exceed the relay limit.
pub fn encode(message: &BfpMessage) -> Result<ScriptBuf> {
    let bytes = match message {
        BfpMessage::Metadata(metadata) => encode_metadata(metadata)?,
        BfpMessage::Chunk { data } => encode_chunk(data)?,
    };
    if bytes.len() > MAX_SCRIPT_LEN {
        return Err(BfpError::field(
            "script",
            format!(
                "script is {} bytes, must be at most {MAX_SCRIPT_LEN}",
                bytes.len()
            ),
        ));
    }
    Ok(ScriptBuf::from_bytes(bytes))
}

pub fn encode_metadata(metadata: &FileMetadata) -> Result<Vec<u8>> {
    let mut script = vec![OP_RETURN.to_u8()];
    push_data(&mut script, &LOKAD_ID)?;
    push_data(&mut script, &[MSG_TYPE_FILE])?;

    let chunk_count = int_to_fixed_bytes(
        "chunk_count",
        u64::from(metadata.chunk_count),
        CHUNK_COUNT_WIDTH,
    )?;
    push_data(&mut script, &chunk_count)?;

    push_optional(&mut script, "file_name", metadata.file_name.as_deref().map(str::as_bytes))?;
    push_optional(&mut script, "file_ext", metadata.file_ext.as_deref().map(str::as_bytes))?;

    let file_size = metadata
        .file_size
        .map(|size| int_to_fixed_bytes("file_size", size, FILE_SIZE_WIDTH))
        .transpose()?;
    push_optional(&mut script, "file_size", file_size.as_deref())?;

    push_optional(&mut script, "file_sha256", metadata.file_sha256.as_ref().map(|d| &d[..]))?;
    push_optional(
        &mut script,
        "prev_file_sha256",
        metadata.prev_file_sha256.as_ref().map(|d| &d[..]),
    )?;
    push_optional(&mut script, "file_uri", metadata.file_uri.as_deref().map(str::as_bytes))?;
    push_optional(&mut script, "chunk", metadata.chunk.as_deref())?;
    Ok(script)
}

pub fn encode_chunk(data: &[u8]) -> Result<Vec<u8>> {
    let mut script = vec![OP_RETURN.to_u8()];
    push_data(&mut script, data)?;
    Ok(script)
}

/// Appends `data` with the smallest push opcode for its length.
fn push_data(script: &mut Vec<u8>, data: &[u8]) -> Result<()> {
    let len = data.len();
    match len {
        0 => script.extend_from_slice(&[OP_PUSHDATA1.to_u8(), 0x00]),
        1..=75 => script.push(len as u8),
        76..=255 => script.extend_from_slice(&[OP_PUSHDATA1.to_u8(), len as u8]),
        256..=MAX_PUSH_LEN => {
            script.push(OP_PUSHDATA2.to_u8());
            script.extend_from_slice(&(len as u16).to_le_bytes());
        }
        _ => {
            return Err(BfpError::field(
                "push",
                format!("{len} bytes is too large for a single push"),
            ))
        }
    }
    script.extend_from_slice(data);
    Ok(())
}

/// Absent fields are written as an empty push, so `Some(&[])` would decode as `None`.
fn push_optional(script: &mut Vec<u8>, field: &'static str, data: Option<&[u8]>) -> Result<()> {
    match data {
        Some([]) => Err(BfpError::field(
            field,
            "must be omitted rather than set to an empty value",
        )),
        data => push_data(script, data.unwrap_or_default()),
    }
}

#[derive(Debug, Clone, Copy)]
enum Item<'a> {
    Push(&'a [u8]),
    Op(Opcode),
}

impl<'a> Item<'a> {
    fn small_int(&self) -> Option<u8> {
        match self {
            Item::Op(op) => {
                let code = op.to_u8();
                (OP_PUSHNUM_1.to_u8()..=OP_PUSHNUM_16.to_u8())
                    .contains(&code)
                    .then(|| code - OP_PUSHNUM_1.to_u8() + 1)
            }
            Item::Push(_) => None,
        }
    }

    /// Pushed bytes, with `OP_1`..`OP_16` standing in for their single byte value.
    fn data(&self, field: &'static str) -> Result<Option<Vec<u8>>> {
        match self {
            Item::Push(bytes) if bytes.is_empty() => Ok(None),
            Item::Push(bytes) => Ok(Some(bytes.to_vec())),
            Item::Op(op) => match self.small_int() {
                Some(n) => Ok(Some(vec![n])),
                None => Err(BfpError::invalid_script(format!(
                    "{field}: unexpected opcode {op}"
                ))),
            },
        }
    }

    fn number(&self, field: &'static str) -> Result<Option<u64>> {
        match self {
            Item::Push(bytes) if bytes.is_empty() => Ok(None),
            Item::Push(bytes) => int_from_be_bytes(field, bytes).map(Some),
            Item::Op(op) => match self.small_int() {
                Some(n) => Ok(Some(u64::from(n))),
                None => Err(BfpError::invalid_script(format!(
                    "{field}: unexpected opcode {op}"
                ))),
            },
        }
    }

    fn text(&self, field: &'static str) -> Result<Option<String>> {
        self.data(field)?
            .map(|bytes| {
                String::from_utf8(bytes)
                    .map_err(|_| BfpError::invalid_script(format!("{field} is not valid utf-8")))
            })
            .transpose()
    }

    fn digest(&self, field: &'static str) -> Result<Option<[u8; DIGEST_LEN]>> {
        self.data(field)?
            .map(|bytes| {
                <[u8; DIGEST_LEN]>::try_from(bytes.as_slice()).map_err(|_| {
                    BfpError::invalid_script(format!(
                        "{field} is {} bytes, expected {DIGEST_LEN}",
                        bytes.len()
                    ))
                })
            })
            .transpose()
    }
}

fn split_items(script: &Script) -> Result<Vec<Item<'_>>> {
    script
        .instructions()
        .map(|instruction| match instruction {
            Ok(Instruction::PushBytes(bytes)) => Ok(Item::Push(bytes.as_bytes())),
            Ok(Instruction::Op(op)) => Ok(Item::Op(op)),
            Err(e) => Err(BfpError::invalid_script(format!("malformed script: {e}"))),
        })
        .collect()
}

/// Decodes a BFP script. Two item scripts are always chunks.
pub fn decode(script: &Script) -> Result<BfpMessage> {
    let items = split_items(script)?;
    if items.len() == 2 {
        let data = match items[1] {
            Item::Push(bytes) => bytes.to_vec(),
            item => item
                .small_int()
                .map(|n| vec![n])
                .ok_or_else(|| BfpError::invalid_script("chunk data is not a push"))?,
        };
        return Ok(BfpMessage::Chunk { data });
    }
    decode_metadata(&items).map(BfpMessage::Metadata)
}

fn decode_metadata(items: &[Item<'_>]) -> Result<FileMetadata> {
    match items.first() {
        Some(Item::Op(op)) if *op == OP_RETURN => {}
        Some(_) => return Err(BfpError::invalid_script("not an OP_RETURN")),
        None => return Err(BfpError::invalid_script("script is empty")),
    }
    match items.get(1) {
        Some(Item::Push(id)) if *id == LOKAD_ID.as_slice() => {}
        _ => return Err(BfpError::invalid_script("not a BFP OP_RETURN")),
    }
    let is_file = match items.get(2) {
        Some(Item::Push(tag)) => *tag == [MSG_TYPE_FILE].as_slice(),
        Some(item) => item.small_int() == Some(MSG_TYPE_FILE),
        None => false,
    };
    if !is_file {
        return Err(BfpError::invalid_script("unsupported file-message type"));
    }

    let fields: [Item<'_>; METADATA_ITEM_COUNT] = items
        .get(..METADATA_ITEM_COUNT)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| {
            BfpError::invalid_script(format!(
                "metadata has {} items, expected {METADATA_ITEM_COUNT}",
                items.len()
            ))
        })?;
    if items.len() > METADATA_ITEM_COUNT {
        log::debug!(
            "ignoring {} trailing metadata items",
            items.len() - METADATA_ITEM_COUNT
        );
    }
    let [_, _, _, chunk_count, file_name, file_ext, file_size, file_sha256, prev_file_sha256, file_uri, chunk] =
        fields;

    let chunk_count = chunk_count.number("chunk_count")?.unwrap_or(0);
    let chunk_count = u32::try_from(chunk_count)
        .map_err(|_| BfpError::invalid_script(format!("chunk_count {chunk_count} out of range")))?;

    Ok(FileMetadata {
        chunk_count,
        file_name: file_name.text("file_name")?,
        file_ext: file_ext.text("file_ext")?,
        file_size: file_size.number("file_size")?,
        file_sha256: file_sha256.digest("file_sha256")?,
        prev_file_sha256: prev_file_sha256.digest("prev_file_sha256")?,
        file_uri: file_uri.text("file_uri")?,
        chunk: chunk.data("chunk")?,
    })
}

pub fn decode_hex(script_hex: &str) -> Result<BfpMessage> {
    let bytes = hex::decode(script_hex)?;
    decode(Script::from_bytes(&bytes))
}

/// Decodes the data-carrying first output of a chain transaction.
pub fn decode_transaction(tx: &Transaction) -> Result<BfpMessage> {
    let output = tx
        .output
        .first()
        .ok_or_else(|| BfpError::invalid_script("transaction has no outputs"))?;
    decode(&output.script_pubkey)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::CHUNK_CAPACITY;
    use pretty_assertions::assert_eq;

    fn full_metadata() -> FileMetadata {
        FileMetadata {
            chunk_count: 3,
            file_name: Some("report".to_string()),
            file_ext: Some("pdf".to_string()),
            file_size: Some(600),
            file_sha256: Some([0x11; 32]),
            prev_file_sha256: Some([0x22; 32]),
            file_uri: Some("ipfs://x".to_string()),
            chunk: Some(vec![1, 2, 3]),
        }
    }

    #[test]
    fn test_metadata_layout_is_byte_exact() {
        let metadata = FileMetadata {
            chunk_count: 1,
            file_name: Some("a".to_string()),
            file_size: Some(1),
            ..Default::default()
        };
        let script = encode(&BfpMessage::Metadata(metadata)).unwrap();
        assert_eq!(
            hex::encode(script.as_bytes()),
            concat!(
                "6a",
                "0442465000",
                "0101",
                "0101",
                "0161",
                "4c00",
                "020001",
                "4c00",
                "4c00",
                "4c00",
                "4c00"
            )
        );
    }

    #[test]
    fn test_empty_fields_use_pushdata1_zero() {
        let script = encode(&BfpMessage::Metadata(FileMetadata::default())).unwrap();
        assert_eq!(script.len(), 24);
        assert!(hex::encode(script.as_bytes()).ends_with(&"4c00".repeat(7)));
    }

    #[test]
    fn test_round_trip_metadata() {
        let message = BfpMessage::Metadata(full_metadata());
        let script = encode(&message).unwrap();
        assert_eq!(decode(&script).unwrap(), message);
    }

    #[test]
    fn test_round_trip_sparse_metadata() {
        let message = BfpMessage::Metadata(FileMetadata {
            chunk_count: 0,
            file_size: Some(0),
            ..Default::default()
        });
        assert_eq!(decode(&encode(&message).unwrap()).unwrap(), message);
    }

    #[test]
    fn test_round_trip_chunks() {
        for len in [0usize, 1, 75, 76, 200, CHUNK_CAPACITY] {
            let data: Vec<u8> = (0..len).map(|i| i as u8).collect();
            let message = BfpMessage::chunk(data);
            assert_eq!(decode(&encode(&message).unwrap()).unwrap(), message);
        }
    }

    #[test]
    fn test_round_trip_field_lengths() {
        type Setter = fn(&mut FileMetadata, Vec<u8>);
        let fields: [(&str, Setter); 4] = [
            ("file_name", |m, v| m.file_name = String::from_utf8(v).ok()),
            ("file_ext", |m, v| m.file_ext = String::from_utf8(v).ok()),
            ("file_uri", |m, v| m.file_uri = String::from_utf8(v).ok()),
            ("chunk", |m, v| m.chunk = Some(v)),
        ];
        for (field, set) in fields {
            for len in [0usize, 1, 75, 76, CHUNK_CAPACITY] {
                let mut metadata = FileMetadata::default();
                set(&mut metadata, vec![b'a'; len]);
                let message = BfpMessage::Metadata(metadata);
                match (len, encode(&message)) {
                    (0, Err(BfpError::FieldValidation { field: f, .. })) => assert_eq!(f, field),
                    (CHUNK_CAPACITY, Err(BfpError::FieldValidation { field: f, .. })) => {
                        assert_eq!(f, "script")
                    }
                    (1 | 75 | 76, Ok(script)) => {
                        assert_eq!(decode(&script).unwrap(), message, "{field} at {len}")
                    }
                    (_, other) => panic!("{field} at {len}: unexpected {other:?}"),
                }
            }
        }

        for file_size in [0u64, 1, 255, 65_535] {
            let message = BfpMessage::Metadata(FileMetadata {
                file_size: Some(file_size),
                ..Default::default()
            });
            assert_eq!(decode(&encode(&message).unwrap()).unwrap(), message);
        }
        for chunk_count in [0u32, 1, 255] {
            let message = BfpMessage::Metadata(FileMetadata {
                chunk_count,
                ..Default::default()
            });
            assert_eq!(decode(&encode(&message).unwrap()).unwrap(), message);
        }

        for len in [0usize, 1, 75, 76, CHUNK_CAPACITY] {
            let message = BfpMessage::chunk(vec![0x51; len]);
            assert_eq!(decode(&encode(&message).unwrap()).unwrap(), message);
            let json = serde_json::to_string(&message).unwrap();
            assert_eq!(serde_json::from_str::<BfpMessage>(&json).unwrap(), message);
        }
    }

    #[test]
    fn test_pushdata1_used_above_75_bytes() {
        let script = encode(&BfpMessage::chunk(vec![7u8; 76])).unwrap();
        assert_eq!(&script.as_bytes()[..3], &[0x6a, 0x4c, 76]);
        let script = encode(&BfpMessage::chunk(vec![7u8; 75])).unwrap();
        assert_eq!(&script.as_bytes()[..2], &[0x6a, 75]);
    }

    #[test]
    fn test_pushdata2_form() {
        let mut script = Vec::new();
        push_data(&mut script, &[0u8; 300]).unwrap();
        assert_eq!(&script[..3], &[0x4d, 0x2c, 0x01]);
        assert_eq!(script.len(), 303);
    }

    #[test]
    fn test_size_limit_boundary() {
        let full = encode(&BfpMessage::chunk(vec![0u8; CHUNK_CAPACITY])).unwrap();
        assert_eq!(full.len(), MAX_SCRIPT_LEN);

        let err = encode(&BfpMessage::chunk(vec![0u8; CHUNK_CAPACITY + 1])).unwrap_err();
        assert!(matches!(err, BfpError::FieldValidation { field: "script", .. }));
    }

    #[test]
    fn test_metadata_over_limit_fails() {
        let mut metadata = full_metadata();
        metadata.chunk = Some(vec![0u8; 150]);
        assert!(matches!(
            encode(&BfpMessage::Metadata(metadata)),
            Err(BfpError::FieldValidation { field: "script", .. })
        ));
    }

    #[test]
    fn test_numeric_overflow_fails() {
        let mut metadata = FileMetadata::default();
        metadata.chunk_count = 256;
        assert!(matches!(
            encode(&BfpMessage::Metadata(metadata)),
            Err(BfpError::FieldValidation { field: "chunk_count", .. })
        ));

        let mut metadata = FileMetadata::default();
        metadata.file_size = Some(70_000);
        assert!(matches!(
            encode(&BfpMessage::Metadata(metadata)),
            Err(BfpError::FieldValidation { field: "file_size", .. })
        ));
    }

    #[test]
    fn test_decode_deadbeef_chunk() {
        assert_eq!(
            decode_hex("6a04deadbeef").unwrap(),
            BfpMessage::chunk(vec![0xde, 0xad, 0xbe, 0xef])
        );
    }

    #[test]
    fn test_decode_chunk_without_data() {
        // OP_RETURN OP_CHECKSIG
        assert!(matches!(
            decode_hex("6aac"),
            Err(BfpError::InvalidScript(_))
        ));
        // OP_RETURN OP_5
        assert_eq!(decode_hex("6a55").unwrap(), BfpMessage::chunk(vec![5]));
    }

    #[test]
    fn test_decode_wrong_identifier() {
        let hex = "6a04000000000101010100";
        assert!(matches!(
            decode_hex(hex),
            Err(BfpError::InvalidScript(reason)) if reason.contains("not a BFP")
        ));
    }

    #[test]
    fn test_decode_wrong_message_type() {
        let mut bytes = encode_metadata(&FileMetadata::default()).unwrap();
        bytes[7] = 0x02;
        assert!(matches!(
            decode(Script::from_bytes(&bytes)),
            Err(BfpError::InvalidScript(reason)) if reason.contains("unsupported")
        ));
    }

    #[test]
    fn test_decode_requires_op_return() {
        assert!(matches!(
            decode_hex("76a90442465000"),
            Err(BfpError::InvalidScript(reason)) if reason.contains("OP_RETURN")
        ));
    }

    #[test]
    fn test_decode_truncated_metadata() {
        // OP_RETURN <id> <01> <count>
        assert!(matches!(
            decode_hex("6a044246500001010101"),
            Err(BfpError::InvalidScript(reason)) if reason.contains("expected 11")
        ));
    }

    #[test]
    fn test_decode_malformed_push() {
        assert!(matches!(
            decode_hex("6a044246500002ff"),
            Err(BfpError::InvalidScript(reason)) if reason.contains("malformed")
        ));
    }

    #[test]
    fn test_decode_small_int_opcodes() {
        // type as OP_1, chunk count as OP_3, remaining fields empty
        let mut hex = String::from("6a044246500051");
        hex.push_str("53");
        hex.push_str(&"00".repeat(7));
        let message = decode_hex(&hex).unwrap();
        let metadata = message.as_metadata().unwrap();
        assert_eq!(metadata.chunk_count, 3);
        assert_eq!(metadata.file_name, None);
        assert_eq!(metadata.chunk, None);
    }

    #[test]
    fn test_decode_ignores_trailing_items() {
        let mut bytes = encode_metadata(&full_metadata()).unwrap();
        bytes.extend_from_slice(&[0x01, 0xff]);
        assert_eq!(
            decode(Script::from_bytes(&bytes)).unwrap(),
            BfpMessage::Metadata(full_metadata())
        );
    }

    #[test]
    fn test_decode_rejects_short_digest() {
        let mut hex = String::from("6a04424650000101010100");
        hex.push_str("4c004c00");
        hex.push_str("03aabbcc");
        hex.push_str("4c004c004c00");
        assert!(matches!(
            decode_hex(&hex),
            Err(BfpError::InvalidScript(reason)) if reason.contains("file_sha256")
        ));
    }

    #[test]
    fn test_decode_transaction_without_outputs() {
        let tx = Transaction {
            version: bitcoin::transaction::Version::ONE,
            lock_time: bitcoin::absolute::LockTime::ZERO,
            input: vec![],
            output: vec![],
        };
        assert!(decode_transaction(&tx).is_err());
    }
}
