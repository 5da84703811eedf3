//! Fuzzy string similarity used throughout matching.
//!
//! The edit distance is Levenshtein extended with a restricted adjacent
//! transposition step that only applies once both positions are past the
//! second character. The 0.8 feature dedup and the 0.2/0.75 match floors
//! assume this variant, not textbook Damerau-Levenshtein.

/// Similarity of two strings in `[0.0, 1.0]`, case-insensitive.
///
/// Returns 0.0 when either string is empty, otherwise
/// `1 - distance / max(len(a), len(b))`. Lengths are counted in characters
/// of the inputs as given, before lowercasing.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let max_len = a.chars().count().max(b.chars().count());
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();

    // Lowercasing can lengthen a string past the divisor
    (1.0 - edit_distance(&a, &b) as f64 / max_len as f64).max(0.0)
}

/// Edit distance with unit cost substitution, insertion, deletion and the
/// restricted adjacent swap.
fn edit_distance(a: &[char], b: &[char]) -> usize {
    let mut matrix = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=b.len() {
        matrix[0][j] = j;
    }

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            let above = matrix[i - 1][j] + 1;
            let left = matrix[i][j - 1] + 1;
            let diag = matrix[i - 1][j - 1] + cost;
            let mut cell = above.min(left).min(diag);

            if i > 2 && j > 2 {
                let mut swap = matrix[i - 2][j - 2] + 1;
                if a[i - 2] != b[j - 1] {
                    swap += 1;
                }
                if a[i - 1] != b[j - 2] {
                    swap += 1;
                }
                cell = cell.min(swap);
            }

            matrix[i][j] = cell;
        }
    }

    matrix[a.len()][b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_identical_strings() {
        for s in ["a", "Abbey Road", "The Beatles", "01", "Sigur Rós"] {
            assert_eq!(similarity(s, s), 1.0, "{}", s);
        }
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(similarity("", "abc"), 0.0);
        assert_eq!(similarity("abc", ""), 0.0);
        assert_eq!(similarity("", ""), 0.0);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(similarity("ABC", "abc"), similarity("abc", "abc"));
        assert_eq!(similarity("Come Together", "COME TOGETHER"), 1.0);
    }

    #[test]
    fn test_plain_levenshtein() {
        // kitten -> sitting: 3 edits over 7 chars
        assert!(close(similarity("kitten", "sitting"), 1.0 - 3.0 / 7.0));
        assert!(close(similarity("abc", "abd"), 1.0 - 1.0 / 3.0));
        assert!(close(similarity("abc", "abcd"), 0.75));
    }

    #[test]
    fn test_adjacent_swap_past_second_char() {
        // Swap of the last two characters counts as one edit
        assert!(close(similarity("abcd", "abdc"), 0.75));
        assert!(close(similarity("abc", "acb"), 1.0 - 1.0 / 3.0));
    }

    #[test]
    fn test_swap_not_applied_at_start() {
        // Swap within the first two characters is two substitutions
        assert_eq!(similarity("ab", "ba"), 0.0);
        assert!(close(similarity("bacd", "abcd"), 0.5));
    }

    #[test]
    fn test_bounded() {
        let samples = [
            "x", "Abbey Road", "zzzzzzzzzzzzzzzzzz", "The Beatles", "1", "10",
            "ab", "ba", "Come Together", "Something", "Ünïcödé",
        ];
        for a in samples {
            for b in samples {
                let s = similarity(a, b);
                assert!((0.0..=1.0).contains(&s), "{} vs {} = {}", a, b, s);
            }
        }
    }

    #[test]
    fn test_length_taken_before_lowercasing() {
        // 'İ' lowercases to two chars, "i" plus a combining dot, so the
        // lowered strings are one insertion apart but the divisor stays 3
        assert!(close(similarity("İab", "iab"), 1.0 - 1.0 / 3.0));
        assert_eq!(similarity("İ", "x"), 0.0);
    }

    #[test]
    fn test_completely_different() {
        assert_eq!(similarity("abc", "xyz"), 0.0);
    }
}
