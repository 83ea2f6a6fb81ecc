//! Persisted form of an IR.
//!
//! Layout of a persisted file:
//!
//! ```text
//! offset  size  field
//! 0       4     magic "BLIR"
//! 4       4     format version (u32, little-endian)
//! 8       32    BLAKE3 digest of the payload
//! 40      ..    payload: bincode (serde, standard config) encoding of the IR
//! ```
//!
//! Decoding is all-or-nothing: the payload is decoded into a fresh IR, every
//! structural invariant is re-checked and derived indices are rebuilt before
//! the IR is handed back. Any failure discards the partial result.
//!
//! The payload decoder runs under an allocation limit derived from the
//! payload length, so a forged length prefix is reported as corruption
//! rather than attempted.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::config::CodecConfig;
use crate::core::ir::Ir;
use crate::error::{IrError, Result};

/// Magic bytes at the start of every persisted IR.
pub const MAGIC: [u8; 4] = *b"BLIR";

/// Newest format version this codec reads and the one it writes.
pub const FORMAT_VERSION: u32 = 1;

const DIGEST_LEN: usize = 32;
const HEADER_LEN: usize = MAGIC.len() + 4 + DIGEST_LEN;

// bincode claims the in-memory size of every value it decodes; a varint can
// expand to at most 16 bytes (u128), so a well-formed payload never claims
// more than this multiple of its own length.
const CLAIM_FACTOR: usize = 16;
const CLAIM_SLACK: usize = 4096;

pub(crate) fn encode_payload(ir: &Ir) -> Result<Vec<u8>> {
    bincode::serde::encode_to_vec(ir, bincode::config::standard())
        .map_err(|e| IrError::Serialization(e.to_string()))
}

/// Encode an IR into its persisted byte form.
pub fn encode(ir: &Ir) -> Result<Vec<u8>> {
    let payload = encode_payload(ir)?;
    let digest = blake3::hash(&payload);

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(digest.as_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Decode a persisted IR with the default configuration.
pub fn decode(bytes: &[u8]) -> Result<Ir> {
    decode_with(bytes, &CodecConfig::default())
}

/// Decode a persisted IR.
pub fn decode_with(bytes: &[u8], config: &CodecConfig) -> Result<Ir> {
    if bytes.len() < HEADER_LEN {
        return Err(IrError::CorruptEncoding(format!(
            "truncated header: {} bytes, need {}",
            bytes.len(),
            HEADER_LEN
        )));
    }
    let (magic, rest) = bytes.split_at(MAGIC.len());
    if magic != MAGIC {
        return Err(IrError::CorruptEncoding(format!(
            "bad magic {}",
            hex::encode(magic)
        )));
    }
    let (version_bytes, rest) = rest.split_at(4);
    let mut raw_version = [0u8; 4];
    raw_version.copy_from_slice(version_bytes);
    let version = u32::from_le_bytes(raw_version);
    if version == 0 {
        return Err(IrError::CorruptEncoding("format version 0".to_string()));
    }
    if version > FORMAT_VERSION {
        return Err(IrError::UnsupportedVersion {
            found: version,
            supported: FORMAT_VERSION,
        });
    }

    let (digest, payload) = rest.split_at(DIGEST_LEN);
    if config.verify_checksum {
        let actual = blake3::hash(payload);
        if actual.as_bytes().as_slice() != digest {
            return Err(IrError::CorruptEncoding(format!(
                "payload digest mismatch: stored {}, computed {}",
                hex::encode(digest),
                actual.to_hex()
            )));
        }
    }

    let (mut ir, read) = decode_payload(payload)?;
    if read != payload.len() {
        return Err(IrError::CorruptEncoding(format!(
            "{} trailing bytes after payload",
            payload.len() - read
        )));
    }
    ir.reindex().map_err(IrError::CorruptEncoding)?;

    debug!(version, modules = ir.modules().len(), "Decoded IR");
    Ok(ir)
}

fn decode_payload(payload: &[u8]) -> Result<(Ir, usize)> {
    let budget = payload
        .len()
        .saturating_mul(CLAIM_FACTOR)
        .saturating_add(CLAIM_SLACK);
    let decoded = if budget <= 1 << 20 {
        decode_limited::<{ 1 << 20 }>(payload)
    } else if budget <= 1 << 24 {
        decode_limited::<{ 1 << 24 }>(payload)
    } else if budget <= 1 << 28 {
        decode_limited::<{ 1 << 28 }>(payload)
    } else {
        decode_limited::<{ u32::MAX as usize }>(payload)
    };
    decoded.map_err(|e| IrError::CorruptEncoding(e.to_string()))
}

fn decode_limited<const LIMIT: usize>(
    payload: &[u8],
) -> std::result::Result<(Ir, usize), bincode::error::DecodeError> {
    bincode::serde::decode_from_slice(payload, bincode::config::standard().with_limit::<LIMIT>())
}

/// Save an IR to `path` with the default configuration.
pub fn save<P: AsRef<Path>>(ir: &Ir, path: P) -> Result<()> {
    save_with(ir, path, &CodecConfig::default())
}

/// Save an IR to `path`.
pub fn save_with<P: AsRef<Path>>(ir: &Ir, path: P, config: &CodecConfig) -> Result<()> {
    let path = path.as_ref();
    let _span = crate::span_trace!("save_ir", path = %path.display()).entered();
    let bytes = encode(ir)?;

    if config.atomic_save {
        // Each save gets its own temp file; it is removed on drop if the
        // rename never happens.
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::Builder::new()
            .prefix(".binlift-")
            .suffix(".tmp")
            .tempfile_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
    } else {
        fs::write(path, &bytes)?;
    }

    info!(
        path = %path.display(),
        bytes = bytes.len(),
        modules = ir.modules().len(),
        "Saved IR"
    );
    Ok(())
}

/// Load an IR from `path` with the default configuration.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Ir> {
    load_with(path, &CodecConfig::default())
}

/// Load an IR from `path`.
pub fn load_with<P: AsRef<Path>>(path: P, config: &CodecConfig) -> Result<Ir> {
    let path = path.as_ref();
    let _span = crate::span_trace!("load_ir", path = %path.display()).entered();

    let size = fs::metadata(path)?.len();
    if size > config.max_file_size {
        return Err(IrError::FileTooLarge {
            limit: config.max_file_size,
            found: size,
        });
    }
    let bytes = fs::read(path)?;
    let ir = decode_with(&bytes, config).map_err(|e| crate::log_error!("load", e))?;

    info!(
        path = %path.display(),
        bytes = bytes.len(),
        modules = ir.modules().len(),
        "Loaded IR"
    );
    Ok(ir)
}

#[derive(Serialize)]
struct JsonEnvelopeRef<'a> {
    format_version: u32,
    ir: &'a Ir,
}

#[derive(Deserialize)]
struct JsonEnvelope {
    format_version: u32,
    ir: Ir,
}

/// Render an IR as pretty-printed JSON, for inspection and diffs.
pub fn to_json(ir: &Ir) -> Result<String> {
    let envelope = JsonEnvelopeRef {
        format_version: FORMAT_VERSION,
        ir,
    };
    serde_json::to_string_pretty(&envelope).map_err(|e| IrError::Serialization(e.to_string()))
}

/// Parse the JSON form produced by [`to_json`].
pub fn from_json(s: &str) -> Result<Ir> {
    let envelope: JsonEnvelope =
        serde_json::from_str(s).map_err(|e| IrError::CorruptEncoding(e.to_string()))?;
    if envelope.format_version > FORMAT_VERSION {
        return Err(IrError::UnsupportedVersion {
            found: envelope.format_version,
            supported: FORMAT_VERSION,
        });
    }
    let mut ir = envelope.ir;
    ir.reindex().map_err(IrError::CorruptEncoding)?;
    Ok(ir)
}
