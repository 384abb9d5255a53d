// src/engine/grade.rs

use std::collections::BTreeSet;

use serde::Serialize;

use crate::{engine::shuffle::AnswerMapping, error::AppError};

/// How to treat submitted ids that are absent from the shuffle mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeMode {
    /// An unmapped id invalidates the submission. Used for all token
    /// carrying submissions, where every selected id must be a display
    /// label the server handed out.
    Strict,
    /// An unmapped id passes through unchanged as a canonical id.
    /// Kept for grading unshuffled legacy submissions.
    Lenient,
}

/// Grading outcome. `canonical_selected` is the deduplicated resolved
/// selection in stable (sorted) order.
#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    pub correct: bool,
    pub canonical_selected: Vec<String>,
}

/// Resolves submitted display ids through the mapping and compares the
/// resulting set against the canonical correct-answer set. Set equality,
/// order- and duplicate-independent; no partial credit.
pub fn grade(
    correct_ids: &BTreeSet<String>,
    submitted: &[String],
    mapping: &AnswerMapping,
    mode: GradeMode,
) -> Result<Verdict, AppError> {
    let mut resolved = BTreeSet::new();
    for id in submitted {
        match mapping.get(id) {
            Some(canonical) => {
                resolved.insert(canonical.clone());
            }
            None if mode == GradeMode::Lenient => {
                resolved.insert(id.clone());
            }
            None => {
                return Err(AppError::BadRequest(format!(
                    "Unknown option id '{}'",
                    id
                )));
            }
        }
    }

    let correct = resolved == *correct_ids;
    Ok(Verdict {
        correct,
        canonical_selected: resolved.into_iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> AnswerMapping {
        AnswerMapping::from([
            ("A".to_string(), "q1-c".to_string()),
            ("B".to_string(), "q1-a".to_string()),
            ("C".to_string(), "q1-d".to_string()),
            ("D".to_string(), "q1-b".to_string()),
        ])
    }

    fn correct(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn single_choice_correct_and_incorrect() {
        let correct = correct(&["q1-a"]);
        let v = grade(&correct, &ids(&["B"]), &mapping(), GradeMode::Strict).unwrap();
        assert!(v.correct);
        assert_eq!(v.canonical_selected, vec!["q1-a"]);

        let v = grade(&correct, &ids(&["A"]), &mapping(), GradeMode::Strict).unwrap();
        assert!(!v.correct);
    }

    #[test]
    fn order_and_duplicates_do_not_matter() {
        let correct = correct(&["q1-a", "q1-d"]);
        let forward = grade(&correct, &ids(&["B", "C"]), &mapping(), GradeMode::Strict).unwrap();
        let backward = grade(&correct, &ids(&["C", "B"]), &mapping(), GradeMode::Strict).unwrap();
        let duplicated =
            grade(&correct, &ids(&["B", "C", "B"]), &mapping(), GradeMode::Strict).unwrap();

        assert!(forward.correct && backward.correct && duplicated.correct);
        assert_eq!(forward.canonical_selected, backward.canonical_selected);
        assert_eq!(forward.canonical_selected, duplicated.canonical_selected);
    }

    #[test]
    fn multi_select_is_all_or_nothing() {
        let correct = correct(&["q1-a", "q1-d"]);
        // Only one of the two required answers: no partial credit.
        let v = grade(&correct, &ids(&["B"]), &mapping(), GradeMode::Strict).unwrap();
        assert!(!v.correct);
        // Superset is wrong too.
        let v = grade(&correct, &ids(&["B", "C", "D"]), &mapping(), GradeMode::Strict).unwrap();
        assert!(!v.correct);
    }

    #[test]
    fn strict_mode_rejects_unmapped_ids() {
        let correct = correct(&["q1-a"]);
        let err = grade(&correct, &ids(&["q1-a"]), &mapping(), GradeMode::Strict);
        assert!(matches!(err, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn lenient_mode_passes_unmapped_ids_through() {
        let correct = correct(&["q1-a"]);
        // Canonical-id submission bypassing the shuffle entirely.
        let v = grade(&correct, &ids(&["q1-a"]), &mapping(), GradeMode::Lenient).unwrap();
        assert!(v.correct);
    }

    #[test]
    fn empty_submission_only_matches_empty_correct_set() {
        let v = grade(&correct(&["q1-a"]), &[], &mapping(), GradeMode::Strict).unwrap();
        assert!(!v.correct);
    }
}
