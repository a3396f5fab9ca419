//! Byte-scanning primitives for reconstructing source lines from offsets.
//!
//! The error formatter slices a bounded window of context lines out of the
//! original source without scanning the whole document. These helpers work on
//! raw bytes; the grammar is ASCII-delimited, so newline searches never land
//! inside a UTF-8 sequence.

/// Finds the next occurrence of `byte` at or after `start`.
///
/// The start position is inclusive: searching from an offset that itself
/// matches returns that offset.
pub fn next_index(text: &str, byte: u8, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut pos = start;

    while pos < bytes.len() {
        if bytes[pos] == byte {
            return Some(pos);
        }
        pos += 1;
    }

    None
}

/// Finds the previous occurrence of `byte` at or before `start`.
///
/// Mirror of [`next_index`]: the start position is inclusive.
pub fn previous_index(text: &str, byte: u8, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();

    if bytes.is_empty() {
        return None;
    }

    let mut pos = start.min(bytes.len() - 1);

    loop {
        if bytes[pos] == byte {
            return Some(pos);
        }
        if pos == 0 {
            return None;
        }
        pos -= 1;
    }
}

/// Counts occurrences of `byte` strictly before `start`.
///
/// Used to derive 1-based line numbers from a byte offset.
pub fn previous_count(text: &str, byte: u8, start: usize) -> usize {
    let bytes = text.as_bytes();
    bytes[..start.min(bytes.len())]
        .iter()
        .filter(|&&b| b == byte)
        .count()
}

/// Collects up to `max` occurrence indices of `byte` scanning forward from
/// `start`, in ascending order.
pub fn next_indices(text: &str, byte: u8, start: usize, max: usize) -> Vec<usize> {
    let mut items = Vec::new();
    let mut current = start;

    while items.len() < max {
        match next_index(text, byte, current) {
            Some(idx) => {
                items.push(idx);
                current = idx + 1;
            }
            None => break,
        }
    }

    items
}

/// Collects up to `max` occurrence indices of `byte` scanning backward from
/// `start`, in descending order.
pub fn previous_indices(text: &str, byte: u8, start: usize, max: usize) -> Vec<usize> {
    let mut items = Vec::new();
    let mut current = start;

    while items.len() < max {
        match previous_index(text, byte, current) {
            Some(idx) => {
                items.push(idx);
                if idx == 0 {
                    break;
                }
                current = idx - 1;
            }
            None => break,
        }
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLON: u8 = b':';

    #[test]
    fn next_index_from_start() {
        assert_eq!(next_index("aaaa:bbbb:cccc:dddd", COLON, 0), Some(4));
    }

    #[test]
    fn next_index_from_within() {
        assert_eq!(next_index("aaaa:bbbb:cccc:dddd", COLON, 5), Some(9));
    }

    #[test]
    fn next_index_at_match_is_inclusive() {
        assert_eq!(next_index("aaaa:bbbb:cccc:dddd", COLON, 4), Some(4));
    }

    #[test]
    fn next_index_without_match() {
        assert_eq!(next_index("aaaa", COLON, 0), None);
    }

    #[test]
    fn previous_index_from_end() {
        let text = "aaaa:bbbb:cccc:dddd";
        assert_eq!(previous_index(text, COLON, text.len() - 1), Some(14));
    }

    #[test]
    fn previous_index_from_within() {
        assert_eq!(previous_index("aaaa:bbbb:cccc:dddd", COLON, 10), Some(9));
    }

    #[test]
    fn previous_index_at_match_is_inclusive() {
        assert_eq!(previous_index("aaaa:bbbb:cccc:dddd", COLON, 4), Some(4));
    }

    #[test]
    fn previous_index_without_match() {
        assert_eq!(previous_index("aaaa", COLON, 0), None);
    }

    #[test]
    fn bounded_index_lists() {
        let text = "a:b:c:d";
        assert_eq!(next_indices(text, COLON, 0, 2), vec![1, 3]);
        assert_eq!(next_indices(text, COLON, 0, 10), vec![1, 3, 5]);
        assert_eq!(previous_indices(text, COLON, text.len() - 1, 2), vec![5, 3]);
        assert_eq!(previous_indices(text, COLON, text.len() - 1, 10), vec![5, 3, 1]);
    }

    #[test]
    fn previous_count_before_offset() {
        assert_eq!(previous_count("a\nb\nc", b'\n', 4), 2);
        assert_eq!(previous_count("a\nb\nc", b'\n', 1), 0);
    }
}
