//! Code injection: merge student source with the instructor's validation
//! harness using the combination rule for the target language.
//!
//! Pure functions only — same inputs always yield the same output, no I/O.

use gradex_common::types::Language;
use gradex_common::{Error, Result};

/// Literal marker a Java/C++ harness must carry at the spot where the
/// student's code is spliced in.
pub const PLACEHOLDER: &str = "{{USER_CODE}}";

/// Build the final source text to execute.
///
/// - Java and C++: single literal replacement of [`PLACEHOLDER`] inside the
///   harness. A harness without the marker is a configuration error, caught
///   here so nothing is ever dispatched for a broken question.
/// - Python and Javascript: concatenation — student code first, harness
///   appended below, calling into the definitions the student supplied.
/// - Anything else has no combination rule and is rejected.
pub fn compose_source(student_code: &str, harness: &str, language: Language) -> Result<String> {
    match language {
        Language::Java | Language::Cpp => {
            if !harness.contains(PLACEHOLDER) {
                return Err(Error::Configuration(format!(
                    "{language} validation program is missing the {PLACEHOLDER} marker"
                )));
            }
            Ok(harness.replacen(PLACEHOLDER, student_code, 1))
        }
        Language::Python | Language::Javascript => {
            Ok(format!("{student_code}\n\n{harness}"))
        }
        Language::C => Err(Error::UnsupportedLanguage(language.to_string())),
    }
}
