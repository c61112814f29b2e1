use serde::{Deserialize, Serialize};

/// Minimal single-window description of how one string became another:
/// replacing `old[start..end]` with `insert_text` yields the new string.
/// All indexes are code point offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextDiff {
    pub start: usize,
    pub end: usize,
    pub insert_text: String,
}

impl TextDiff {
    pub fn is_insert_only(&self) -> bool {
        self.start == self.end && !self.insert_text.is_empty()
    }

    pub fn is_delete_only(&self) -> bool {
        self.insert_text.is_empty()
    }
}

/// Compute the single-window diff between two strings.
///
/// Longest common prefix and suffix, with the suffix clamped so the two
/// windows never overlap; everything between is the replacement. This is
/// deliberately not a general multi-hunk diff: a surface mutation batch
/// represents one contiguous edit, so one window is always enough.
///
/// Identity input yields `start == end == len(old)` with empty insert
/// text, i.e. an empty replacement at the end of the string.
pub fn diff_text(old: &str, new: &str) -> TextDiff {
    let old_chars: Vec<char> = old.chars().collect();
    let new_chars: Vec<char> = new.chars().collect();
    let old_len = old_chars.len();
    let new_len = new_chars.len();

    let max_common = old_len.min(new_len);

    let mut prefix = 0;
    while prefix < max_common && old_chars[prefix] == new_chars[prefix] {
        prefix += 1;
    }

    // The suffix window must not reach into the prefix window.
    let max_suffix = max_common - prefix;
    let mut suffix = 0;
    while suffix < max_suffix
        && old_chars[old_len - 1 - suffix] == new_chars[new_len - 1 - suffix]
    {
        suffix += 1;
    }

    TextDiff {
        start: prefix,
        end: old_len - suffix,
        insert_text: new_chars[prefix..new_len - suffix].iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    /// Apply a diff back to the old string; used to check reconstruction.
    fn patch(old: &str, diff: &TextDiff) -> String {
        let chars: Vec<char> = old.chars().collect();
        let mut out: String = chars[..diff.start].iter().collect();
        out.push_str(&diff.insert_text);
        out.extend(&chars[diff.end..]);
        out
    }

    #[rstest]
    #[case("helo", "hello", 3, 3, "l")]
    #[case("hello", "helo", 3, 4, "")]
    #[case("hello", "hellos", 5, 5, "s")]
    #[case("hello", "jello", 0, 1, "j")]
    #[case("", "abc", 0, 0, "abc")]
    #[case("abc", "", 0, 3, "")]
    #[case("abc", "axc", 1, 2, "x")]
    // Repeated characters: the prefix wins the overlap, suffix is clamped.
    #[case("aaa", "aaaa", 3, 3, "a")]
    #[case("aaaa", "aaa", 3, 4, "")]
    // Code points, not bytes.
    #[case("héllo", "héllos", 5, 5, "s")]
    #[case("caf", "café", 3, 3, "é")]
    fn diff_cases(
        #[case] old: &str,
        #[case] new: &str,
        #[case] start: usize,
        #[case] end: usize,
        #[case] insert: &str,
    ) {
        let diff = diff_text(old, new);
        assert_eq!(diff.start, start);
        assert_eq!(diff.end, end);
        assert_eq!(diff.insert_text, insert);
        assert_eq!(patch(old, &diff), new);
    }

    #[rstest]
    #[case("")]
    #[case("a")]
    #[case("hello world")]
    #[case("ααα")]
    fn identity_diff_is_empty_at_end(#[case] s: &str) {
        let len = s.chars().count();
        assert_eq!(
            diff_text(s, s),
            TextDiff {
                start: len,
                end: len,
                insert_text: String::new(),
            }
        );
    }

    #[rstest]
    #[case("the quick fox", "the slow fox")]
    #[case("abcdef", "abXYef")]
    #[case("composition", "compostion")]
    #[case("하나둘", "하나둘셋")]
    fn reconstruction_round_trips(#[case] old: &str, #[case] new: &str) {
        let diff = diff_text(old, new);
        assert_eq!(patch(old, &diff), new);
        // The prefix is maximal and the windows never overlap.
        assert!(diff.start <= old.chars().count().min(new.chars().count()));
        assert!(diff.start <= diff.end);
    }
}
