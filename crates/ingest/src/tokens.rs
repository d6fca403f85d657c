//! Length-based token estimate used for chunk budgeting.

/// Characters per token assumed by [`estimate_tokens`].
pub const CHARS_PER_TOKEN: usize = 4;

/// Approximate token count: `ceil(chars / 4)`.
///
/// Not tied to any tokenizer; only needs to be stable and monotonic.
pub fn estimate_tokens(text: &str) -> usize {
    tokens_for_chars(text.chars().count())
}

/// Same estimate for a text whose char count is already known.
pub fn tokens_for_chars(chars: usize) -> usize {
    chars.div_ceil(CHARS_PER_TOKEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("a"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(estimate_tokens(&"x".repeat(8000)), 2000);
    }

    #[test]
    fn counts_chars_not_bytes() {
        // 4 chars, 8 bytes
        assert_eq!(estimate_tokens("éééé"), 1);
    }

    #[test]
    fn monotonic_in_length() {
        let mut last = 0;
        for n in 0..64 {
            let t = estimate_tokens(&"y".repeat(n));
            assert!(t >= last);
            last = t;
        }
    }
}
