//! Per-line diff markers for the code browser.
//!
//! The memo is a raw difference array: each range adds `+1` at its first line
//! and `-1` one slot past its last line. It is deliberately left unsummed, and
//! a line counts as changed only when its own slot is positive. For a range
//! spanning several lines only the first line is flagged.

use crate::types::DiffRange;

/// Difference-array markers parallel to a file's lines.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiffMemo {
    slots: Vec<i32>,
}

impl DiffMemo {
    /// Builds the memo for a file with `line_count` lines.
    ///
    /// A file without diff information (`None`) gets an empty memo and no line
    /// is flagged. Range endpoints that fall outside the file are skipped.
    pub fn build(line_count: usize, diff: Option<&[DiffRange]>) -> Self {
        let Some(ranges) = diff else {
            return Self::default();
        };
        let mut slots = vec![0i32; line_count];
        for range in ranges {
            if let Some(slot) = range.start.checked_sub(1).and_then(|i| slots.get_mut(i)) {
                *slot += 1;
            }
            if let Some(slot) = slots.get_mut(range.end) {
                *slot -= 1;
            }
        }
        Self { slots }
    }

    /// Raw slot values.
    pub fn slots(&self) -> &[i32] {
        &self.slots
    }

    /// True when 0-indexed line `index` is flagged as changed.
    pub fn is_diff(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(|&v| v > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_range_marks_start_and_closes_after() {
        let memo = DiffMemo::build(3, Some(&[DiffRange { start: 2, end: 2 }]));
        assert_eq!(memo.slots(), &[0, 1, -1]);
        assert!(memo.is_diff(1));
        assert!(!memo.is_diff(2));
    }

    #[test]
    fn multi_line_range_only_flags_first_line() {
        let memo = DiffMemo::build(5, Some(&[DiffRange { start: 2, end: 4 }]));
        assert_eq!(memo.slots(), &[0, 1, 0, 0, -1]);
        assert!(memo.is_diff(1));
        assert!(!memo.is_diff(2));
    }

    #[test]
    fn no_diff_information_flags_nothing() {
        let memo = DiffMemo::build(4, None);
        assert!(memo.slots().is_empty());
        assert!((0..4).all(|i| !memo.is_diff(i)));
    }

    #[test]
    fn out_of_range_endpoints_are_ignored() {
        let memo = DiffMemo::build(2, Some(&[DiffRange { start: 2, end: 2 }, DiffRange { start: 0, end: 9 }]));
        assert_eq!(memo.slots(), &[0, 1]);
    }
}
