// src/exec/decode.rs

use tracing::warn;

use crate::types::Encoding;

/// Decode one output chunk. An undecodable chunk is replaced by a
/// placeholder naming its length; the stream carries on.
pub fn decode_chunk(encoding: Encoding, bytes: &[u8], cmd: &str) -> String {
    match encoding.decode(bytes) {
        Some(text) => text,
        None => {
            warn!(cmd, len = bytes.len(), ?encoding, "dropping undecodable output chunk");
            lost_chunk_placeholder(cmd, bytes.len())
        }
    }
}

pub fn lost_chunk_placeholder(cmd: &str, len: usize) -> String {
    format!("<< Lost chunk of process output for {cmd} - length was {len}>>")
}
