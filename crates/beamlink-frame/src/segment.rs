//! Outbound payload segmentation.
//!
//! Constrained links (classic RFCOMM on older handsets in particular) drop
//! writes above a small MTU. Oversized payloads are sliced into ordered
//! segments of at most `segment_len` characters; the receiver reassembles them
//! with its own brace framer, so segments carry no header.

/// Default segment size in characters.
pub const DEFAULT_SEGMENT_LEN: usize = 60;

/// Length of `payload` in characters, the unit segments are measured in.
pub fn char_len(payload: &str) -> usize {
    payload.chars().count()
}

/// Slice `payload` into ordered segments of at most `segment_len` characters.
///
/// A payload that already fits is returned as a single segment. Segments never
/// split a character. A `segment_len` of zero is treated as one.
pub fn segment_payload(payload: &str, segment_len: usize) -> Vec<String> {
    let segment_len = segment_len.max(1);
    if char_len(payload) <= segment_len {
        return vec![payload.to_string()];
    }

    let mut segments = Vec::with_capacity(char_len(payload).div_ceil(segment_len));
    let mut current = String::new();
    let mut count = 0usize;

    for c in payload.chars() {
        current.push(c);
        count += 1;
        if count == segment_len {
            segments.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }

    segments
}
