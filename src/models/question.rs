// src/models/question.rs

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};

/// One canonical option of a stored question. The `id` is the canonical
/// option id; it is never shown to the client during shuffled presentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredOption {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub correct: bool,
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    pub library_id: i64,

    /// Question type: 'single', 'multiple' or 'true_false'.
    /// Mapped from the database column 'type' since `type` is a reserved keyword in Rust.
    #[sqlx(rename = "type")]
    pub question_type: String,

    /// The text content of the question.
    pub content: String,

    /// Canonical option list, stored as a JSON array.
    pub options: Json<Vec<StoredOption>>,

    /// Explanation of the correct answer, shown after grading.
    pub analysis: Option<String>,

    pub tags: Json<Vec<String>>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Question {
    /// The set of canonical correct-answer option ids.
    pub fn correct_ids(&self) -> BTreeSet<String> {
        self.options
            .iter()
            .filter(|o| o.correct)
            .map(|o| o.id.clone())
            .collect()
    }
}

/// Unshuffled option view for browsing (correctness stripped).
#[derive(Debug, Serialize)]
pub struct PublicOption {
    pub id: String,
    pub text: String,
}

/// DTO for sending a question to the client (excludes answers and analysis).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub library_id: i64,
    #[serde(rename = "type")]
    pub question_type: String,
    pub content: String,
    pub options: Vec<PublicOption>,
    pub tags: Vec<String>,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        PublicQuestion {
            id: q.id,
            library_id: q.library_id,
            question_type: q.question_type,
            content: q.content,
            options: q
                .options
                .0
                .into_iter()
                .map(|o| PublicOption {
                    id: o.id,
                    text: o.text,
                })
                .collect(),
            tags: q.tags.0,
        }
    }
}

/// Represents the 'libraries' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Library {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Library row joined with its question count for the browsing list.
#[derive(Debug, Serialize, FromRow)]
pub struct LibrarySummary {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub question_count: i64,
}

// ---------------------------------------------------------------------------
// Import normalization
//
// Upstream question dumps are heterogeneous: options arrive either as bare
// strings with a separate answer key, or as objects flagging correctness
// under several spellings; tags arrive as a string or an array. All accepted
// shapes are converted to the canonical `StoredOption` representation here,
// at the ingest boundary. Nothing past this point branches on shape.
// ---------------------------------------------------------------------------

/// An option as it may appear in an import payload.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ImportedOption {
    Full {
        #[serde(default)]
        id: Option<String>,
        text: String,
        #[serde(default, alias = "is_correct", alias = "isCorrect")]
        correct: bool,
    },
    Text(String),
}

/// A value that upstream data encodes either as one string or a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    Many(Vec<String>),
    One(String),
}

/// One question of a bulk import payload, prior to normalization.
#[derive(Debug, Deserialize)]
pub struct ImportQuestion {
    #[serde(rename = "type", alias = "question_type")]
    pub question_type: String,
    pub content: String,
    pub options: Vec<ImportedOption>,
    /// Answer key used when options carry no correctness flags:
    /// canonical option ids, display letters, or a joined string ("AC", "a,c").
    #[serde(default)]
    pub answer: Option<OneOrMany>,
    #[serde(default)]
    pub analysis: Option<String>,
    #[serde(default)]
    pub tags: Option<OneOrMany>,
}

/// Canonical internal representation produced by normalization.
#[derive(Debug, Clone)]
pub struct NormalizedQuestion {
    pub question_type: String,
    pub content: String,
    pub options: Vec<StoredOption>,
    pub analysis: Option<String>,
    pub tags: Vec<String>,
}

fn normalize_type(raw: &str) -> Result<&'static str, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "single" | "single_choice" | "radio" => Ok("single"),
        "multiple" | "multi" | "checkbox" => Ok("multiple"),
        "true_false" | "true-false" | "truefalse" | "boolean" | "judgement" => Ok("true_false"),
        other => Err(format!("Unknown question type '{}'", other)),
    }
}

fn split_tokens(raw: &str, allow_joined_letters: bool) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.contains([',', ';']) || trimmed.contains(char::is_whitespace) {
        trimmed
            .split([',', ';'])
            .flat_map(|part| part.split_whitespace())
            .map(|s| s.to_string())
            .filter(|s| !s.is_empty())
            .collect()
    } else if allow_joined_letters
        && trimmed.len() > 1
        && trimmed.chars().all(|c| c.is_ascii_alphabetic())
    {
        // "AC" style joined answer letters
        trimmed.chars().map(|c| c.to_string()).collect()
    } else {
        vec![trimmed.to_string()]
    }
}

impl ImportQuestion {
    pub fn normalize(self) -> Result<NormalizedQuestion, String> {
        let question_type = normalize_type(&self.question_type)?;

        let content = self.content.trim().to_string();
        if content.is_empty() {
            return Err("Question content must not be empty".to_string());
        }

        if self.options.len() < 2 {
            return Err("A question must have at least two options".to_string());
        }
        if question_type == "true_false" && self.options.len() != 2 {
            return Err("A true/false question must have exactly two options".to_string());
        }

        let mut options = Vec::with_capacity(self.options.len());
        let mut any_flag = false;
        for (i, imported) in self.options.into_iter().enumerate() {
            // Positional letter fallback keeps canonical ids stable after import.
            let fallback_id = ((b'a' + i as u8) as char).to_string();
            let (id, text, correct) = match imported {
                ImportedOption::Full { id, text, correct } => {
                    any_flag |= correct;
                    (
                        id.map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .unwrap_or(fallback_id),
                        text,
                        correct,
                    )
                }
                ImportedOption::Text(text) => (fallback_id, text, false),
            };

            let text = text.trim().to_string();
            if text.is_empty() {
                return Err(format!("Option {} has empty text", i + 1));
            }
            options.push(StoredOption { id, text, correct });
        }

        let mut seen = BTreeSet::new();
        for opt in &options {
            if !seen.insert(opt.id.to_ascii_lowercase()) {
                return Err(format!("Duplicate option id '{}'", opt.id));
            }
        }

        // Correctness flags on the options win; the answer key is the
        // fallback for string-option imports.
        if !any_flag {
            let answer = self
                .answer
                .ok_or_else(|| "No correctness flags and no answer key".to_string())?;
            let tokens = match answer {
                OneOrMany::Many(list) => list,
                OneOrMany::One(s) => split_tokens(&s, question_type != "single"),
            };
            if tokens.is_empty() {
                return Err("Answer key is empty".to_string());
            }
            for token in tokens {
                let token_lower = token.trim().to_ascii_lowercase();
                let position = if token_lower.len() == 1 {
                    let c = token_lower.as_bytes()[0];
                    c.is_ascii_lowercase().then(|| (c - b'a') as usize)
                } else {
                    None
                };

                let matched = options.iter_mut().enumerate().find(|(i, o)| {
                    o.id.to_ascii_lowercase() == token_lower || position == Some(*i)
                });
                match matched {
                    Some((_, o)) => o.correct = true,
                    None => return Err(format!("Answer token '{}' matches no option", token)),
                }
            }
        }

        let correct_count = options.iter().filter(|o| o.correct).count();
        if correct_count == 0 {
            return Err("A question must have at least one correct option".to_string());
        }
        if question_type != "multiple" && correct_count != 1 {
            return Err(format!(
                "A {} question must have exactly one correct option",
                question_type
            ));
        }

        let tags = match self.tags {
            None => Vec::new(),
            Some(OneOrMany::Many(list)) => list
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            Some(OneOrMany::One(s)) => s
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
        };

        let analysis = self
            .analysis
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());

        Ok(NormalizedQuestion {
            question_type: question_type.to_string(),
            content,
            options,
            analysis,
            tags,
        })
    }
}
