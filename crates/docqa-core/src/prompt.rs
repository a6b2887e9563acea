//! Prompt assembly and answer extraction.
//!
//! The generation request is a fixed instruction, the retrieved chunk texts
//! joined by blank lines in retrieval order, the literal question, and a
//! trailing [`ANSWER_MARKER`] for the model to complete. The answer is the
//! text after the *last* marker in the model output.

/// Marker the model is expected to complete.
pub const ANSWER_MARKER: &str = "Answer:";

const INSTRUCTION: &str = "Answer the following question based on the provided context:";

/// Build the generation request for `question` over `contexts`.
///
/// ```rust
/// use docqa_core::prompt::build_prompt;
///
/// let prompt = build_prompt(&["Paris is in France."], "Where is Paris?");
/// assert!(prompt.ends_with("Answer:"));
/// ```
pub fn build_prompt<S: AsRef<str>>(contexts: &[S], question: &str) -> String {
    let context = contexts
        .iter()
        .map(|c| c.as_ref())
        .collect::<Vec<&str>>()
        .join("\n\n");
    format!(
        "{}\n\nContext:\n{}\n\nQuestion: {}\n\n{}",
        INSTRUCTION, context, question, ANSWER_MARKER
    )
}

/// Result of pulling the answer out of raw model output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub answer: String,
    /// `false` when the output had no marker and `answer` is the whole
    /// trimmed output. Callers should surface this as a weak result.
    pub marker_found: bool,
}

/// Extract the answer: the trimmed text after the last [`ANSWER_MARKER`].
///
/// Without a marker the whole output is returned trimmed and
/// `marker_found` is `false`. A model that echoes the marker inside its own
/// completion will truncate the answer at that echo.
pub fn extract_answer(output: &str) -> Extraction {
    match output.rfind(ANSWER_MARKER) {
        Some(pos) => Extraction {
            answer: output[pos + ANSWER_MARKER.len()..].trim().to_string(),
            marker_found: true,
        },
        None => Extraction {
            answer: output.trim().to_string(),
            marker_found: false,
        },
    }
}
