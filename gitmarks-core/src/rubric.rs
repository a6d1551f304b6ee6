//! Rubric item selection and quick-apply.

use std::collections::BTreeSet;

use serde::Deserialize;

use crate::types::{Feedback, FullRubric, RubricItem};

/// Whether a rubric item adds to or deducts from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemImpact {
    Addition,
    Deduction,
    #[default]
    Neutral,
}

impl ItemImpact {
    /// Impact implied by a stored point value.
    pub fn of(point_value: Option<i64>) -> Self {
        match point_value {
            Some(p) if p > 0 => ItemImpact::Addition,
            Some(p) if p < 0 => ItemImpact::Deduction,
            _ => ItemImpact::Neutral,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            ItemImpact::Addition => '+',
            ItemImpact::Deduction => '-',
            ItemImpact::Neutral => '~',
        }
    }
}

/// Point value to store for an item entered as `points` with `impact`.
/// Neutral items carry no points.
pub fn signed_points(points: i64, impact: ItemImpact) -> Option<i64> {
    match impact {
        ItemImpact::Addition => Some(points.abs()),
        ItemImpact::Deduction => Some(-points.abs()),
        ItemImpact::Neutral => None,
    }
}

/// Rubric item ids the grader has ticked, in selection order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RubricSelection {
    ids: Vec<i64>,
}

impl RubricSelection {
    pub fn select(&mut self, id: i64) {
        self.ids.push(id);
    }

    /// Removes every occurrence of `id`.
    pub fn deselect(&mut self, id: i64) {
        self.ids.retain(|&i| i != id);
    }

    pub fn toggle(&mut self, id: i64) {
        if self.contains(id) {
            self.deselect(id);
        } else {
            self.select(id);
        }
    }

    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

fn item_feedback(item: &RubricItem, path: &str, line: usize, ta_username: Option<&str>) -> Feedback {
    Feedback {
        rubric_item_id: item.id,
        path: path.to_owned(),
        line,
        body: item.explanation.clone(),
        points: item.point_value.unwrap_or(0),
        ta_username: ta_username.map(str::to_owned),
        ..Feedback::default()
    }
}

/// One feedback entry per selected item of `rubric`, attached to `path:line`.
///
/// Ids that match no item are skipped. Selecting an item twice yields two
/// entries; nothing is de-duplicated against existing feedback either.
pub fn quick_apply(
    rubric: &FullRubric,
    selected: &RubricSelection,
    path: &str,
    line: usize,
    ta_username: Option<&str>,
) -> Vec<Feedback> {
    selected
        .ids()
        .iter()
        .filter_map(|id| rubric.rubric_items.iter().find(|item| item.id == Some(*id)))
        .map(|item| item_feedback(item, path, line, ta_username))
        .collect()
}

/// Item ids of `rubric` already applied to `path:line` by `feedback`.
pub fn applied_items<'a>(
    feedback: impl IntoIterator<Item = &'a Feedback>,
    path: &str,
    line: usize,
) -> BTreeSet<i64> {
    feedback
        .into_iter()
        .filter(|fb| fb.is_at(path, line))
        .filter_map(|fb| fb.rubric_item_id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rubric;

    fn rubric() -> FullRubric {
        FullRubric {
            rubric: Rubric {
                id: Some(1),
                name: "Style".into(),
                ..Rubric::default()
            },
            rubric_items: vec![
                RubricItem {
                    id: Some(10),
                    point_value: Some(-2),
                    explanation: "Missing docs".into(),
                    ..RubricItem::default()
                },
                RubricItem {
                    id: Some(11),
                    point_value: None,
                    explanation: "Nice naming".into(),
                    ..RubricItem::default()
                },
            ],
        }
    }

    #[test]
    fn one_entry_per_selected_item() {
        let mut sel = RubricSelection::default();
        sel.select(11);
        sel.select(10);
        let fbs = quick_apply(&rubric(), &sel, "lib.rs", 4, Some("ta1"));
        assert_eq!(fbs.len(), 2);
        assert_eq!(fbs[0].body, "Nice naming");
        assert_eq!(fbs[0].points, 0);
        assert_eq!(fbs[1].points, -2);
        assert_eq!(fbs[1].rubric_item_id, Some(10));
        assert_eq!(fbs[1].ta_username.as_deref(), Some("ta1"));
    }

    #[test]
    fn unknown_ids_are_skipped() {
        let mut sel = RubricSelection::default();
        sel.select(99);
        assert!(quick_apply(&rubric(), &sel, "lib.rs", 1, None).is_empty());
    }

    #[test]
    fn toggle_and_deselect() {
        let mut sel = RubricSelection::default();
        sel.toggle(3);
        assert!(sel.contains(3));
        sel.toggle(3);
        assert!(sel.is_empty());
    }

    #[test]
    fn deductions_are_always_negative() {
        assert_eq!(signed_points(5, ItemImpact::Deduction), Some(-5));
        assert_eq!(signed_points(-5, ItemImpact::Addition), Some(5));
        assert_eq!(signed_points(5, ItemImpact::Neutral), None);
        assert_eq!(ItemImpact::of(Some(-1)), ItemImpact::Deduction);
    }
}
