//! Line-level change counting between two revisions of the entry document.

use std::collections::HashMap;

/// Count lines added and removed between `old` and `new`, treating each
/// side as a multiset of lines. Moved lines therefore do not count as
/// changes; a line counts once per extra occurrence.
pub fn count_line_changes(old: &str, new: &str) -> (u32, u32) {
    let mut counts: HashMap<&str, i64> = HashMap::new();
    for line in new.lines() {
        *counts.entry(line).or_insert(0) += 1;
    }
    for line in old.lines() {
        *counts.entry(line).or_insert(0) -= 1;
    }

    let mut added: i64 = 0;
    let mut removed: i64 = 0;
    for surplus in counts.values() {
        if *surplus > 0 {
            added += surplus;
        } else {
            removed -= surplus;
        }
    }
    (added as u32, removed as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_inputs() {
        let text = "a\nb\nc";
        assert_eq!(count_line_changes(text, text), (0, 0));
    }

    #[test]
    fn test_pure_addition() {
        assert_eq!(count_line_changes("a\nb", "a\nb\nc\nd"), (2, 0));
    }

    #[test]
    fn test_pure_removal() {
        assert_eq!(count_line_changes("a\nb\nc", "a"), (0, 2));
    }

    #[test]
    fn test_replacement_counts_both_sides() {
        assert_eq!(count_line_changes("old line", "new line"), (1, 1));
    }

    #[test]
    fn test_moved_lines_are_not_changes() {
        assert_eq!(count_line_changes("a\nb\nc", "c\na\nb"), (0, 0));
    }

    #[test]
    fn test_duplicate_lines_count_per_occurrence() {
        assert_eq!(count_line_changes("x", "x\nx\nx"), (2, 0));
    }

    #[test]
    fn test_empty_old_side() {
        assert_eq!(count_line_changes("", "a\nb"), (2, 0));
    }
}
