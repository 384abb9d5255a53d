// src/engine/shuffle.rs

use std::collections::{BTreeSet, HashMap};

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::{config::DISPLAY_ALPHABET, error::AppError, models::question::StoredOption};

/// One option as shown to the client: a fresh display label and the
/// option text. Correctness never appears here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayOption {
    pub id: String,
    pub text: String,
}

/// display id -> canonical option id, a total bijection over the
/// options actually shown.
pub type AnswerMapping = HashMap<String, String>;

/// Produces a random permutation of a question's options, assigns each
/// position a display label from the fixed alphabet and records the
/// display->canonical mapping used later for grading.
pub fn shuffle_options(
    options: &[StoredOption],
) -> Result<(Vec<DisplayOption>, AnswerMapping), AppError> {
    if options.len() < 2 {
        return Err(AppError::BadRequest(
            "A question needs at least two options to present".to_string(),
        ));
    }
    if options.len() > DISPLAY_ALPHABET.len() {
        return Err(AppError::Configuration(format!(
            "{} options exceed the {}-label display alphabet",
            options.len(),
            DISPLAY_ALPHABET.len()
        )));
    }

    let mut ids = BTreeSet::new();
    for option in options {
        if !ids.insert(option.id.as_str()) {
            return Err(AppError::BadRequest(format!(
                "Duplicate canonical option id '{}'",
                option.id
            )));
        }
    }

    let mut order: Vec<&StoredOption> = options.iter().collect();
    order.shuffle(&mut rand::rng());

    let mut display = Vec::with_capacity(order.len());
    let mut mapping = HashMap::with_capacity(order.len());
    for (i, option) in order.iter().enumerate() {
        let label = DISPLAY_ALPHABET[i].to_string();
        mapping.insert(label.clone(), option.id.clone());
        display.push(DisplayOption {
            id: label,
            text: option.text.clone(),
        });
    }

    Ok((display, mapping))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(n: usize) -> Vec<StoredOption> {
        (0..n)
            .map(|i| StoredOption {
                id: format!("opt-{i}"),
                text: format!("text {i}"),
                correct: i == 0,
            })
            .collect()
    }

    #[test]
    fn mapping_is_a_bijection_for_every_presentable_size() {
        for n in 2..=DISPLAY_ALPHABET.len() {
            let opts = options(n);
            let (display, mapping) = shuffle_options(&opts).unwrap();

            assert_eq!(display.len(), n);
            assert_eq!(mapping.len(), n);

            // Every display label resolves to a distinct canonical id,
            // and together they cover exactly the input ids.
            let canonical: BTreeSet<&str> = mapping.values().map(String::as_str).collect();
            let expected: BTreeSet<&str> = opts.iter().map(|o| o.id.as_str()).collect();
            assert_eq!(canonical, expected);

            for (i, d) in display.iter().enumerate() {
                assert_eq!(d.id, DISPLAY_ALPHABET[i].to_string());
                assert!(mapping.contains_key(&d.id));
            }
        }
    }

    #[test]
    fn display_text_follows_its_canonical_option() {
        let opts = options(4);
        let (display, mapping) = shuffle_options(&opts).unwrap();
        for d in &display {
            let canonical = &mapping[&d.id];
            let source = opts.iter().find(|o| &o.id == canonical).unwrap();
            assert_eq!(d.text, source.text);
        }
    }

    #[test]
    fn inverting_the_correct_set_through_the_mapping_grades_correct() {
        use crate::engine::grade::{GradeMode, grade};

        for n in 2..=DISPLAY_ALPHABET.len() {
            let mut opts = options(n);
            opts[n - 1].correct = true; // multi-select: first and last are correct
            let correct: std::collections::BTreeSet<String> =
                opts.iter().filter(|o| o.correct).map(|o| o.id.clone()).collect();

            let (_, mapping) = shuffle_options(&opts).unwrap();
            let submission: Vec<String> = mapping
                .iter()
                .filter(|(_, canonical)| correct.contains(*canonical))
                .map(|(display, _)| display.clone())
                .collect();

            let verdict = grade(&correct, &submission, &mapping, GradeMode::Strict).unwrap();
            assert!(verdict.correct, "size {}", n);
        }
    }

    #[test]
    fn rejects_too_few_options() {
        assert!(matches!(
            shuffle_options(&options(1)),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn rejects_options_past_the_alphabet() {
        assert!(matches!(
            shuffle_options(&options(DISPLAY_ALPHABET.len() + 1)),
            Err(AppError::Configuration(_))
        ));
    }

    #[test]
    fn rejects_duplicate_canonical_ids() {
        let mut opts = options(3);
        opts[2].id = opts[0].id.clone();
        assert!(matches!(
            shuffle_options(&opts),
            Err(AppError::BadRequest(_))
        ));
    }
}
