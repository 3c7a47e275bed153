//! Context assembly for answer prompts.

/// Placed between passages so the model can tell them apart.
pub const CHUNK_SEPARATOR: &str = "\n\n---\n\n";

/// Appended when the joined context is cut.
pub const TRUNCATION_MARKER: &str = "...";

/// Join passages in order, bounded to `max_length` characters.
///
/// When the join is longer than `max_length`, the first `max_length`
/// characters are kept and [`TRUNCATION_MARKER`] is appended.
pub fn assemble(chunks: &[String], max_length: usize) -> String {
    let joined = chunks.join(CHUNK_SEPARATOR);

    match joined.char_indices().nth(max_length) {
        Some((byte_idx, _)) => {
            let mut truncated = String::with_capacity(byte_idx + TRUNCATION_MARKER.len());
            truncated.push_str(&joined[..byte_idx]);
            truncated.push_str(TRUNCATION_MARKER);
            truncated
        }
        None => joined,
    }
}
