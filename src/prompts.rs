//! Prompt file names and the text framing sent to the model.
//!
//! The prompt *content* lives in the user's prompt directory (see
//! [`crate::pipeline::store::PromptStore`]); this module only owns the
//! well-known file names, the system instruction that precedes the context
//! documents, and the small string assembly rules shared by every gateway.

use crate::output::ContextDocument;

/// First-pass prompt run against the syllabus and every question paper.
pub const GENERAL_PROMPT_FILE: &str = "general-prompt.md";

/// Meta prompt that turns the first-pass output into a refined prompt.
pub const META_PROMPT_FILE: &str = "prompt-for-prompt.md";

/// Instruction prepended to a saved refined prompt by the feeding workflow.
pub const FEEDING_PROMPT_FILE: &str = "feeding-refinedmax-prompt.md";

/// Suffix of refined prompt files: `{subject}-refinedmax.md`.
pub const REFINED_PROMPT_SUFFIX: &str = "-refinedmax.md";

/// Context name given to the syllabus in the general and final calls.
pub const SYLLABUS_DOC_NAME: &str = "syllabus.pdf";

/// Context names used for the meta (prompt-refinement) call.
pub const META_SYLLABUS_DOC_NAME: &str = "syllabus.md";
pub const META_OUTPUT_DOC_NAME: &str = "output.md";

/// Instruction that opens the system preamble.
pub const CONTEXT_INSTRUCTION: &str = "Use the following source material to answer the request. \
Treat it as the only authoritative reference for the syllabus and the question papers.";

/// File name of a refined prompt for `subject`.
pub fn refined_prompt_file(subject: &str) -> String {
    format!("{}{}", subject.to_lowercase(), REFINED_PROMPT_SUFFIX)
}

/// File name of the categorised output for `subject` (case preserved).
pub fn categorized_output_file(subject: &str) -> String {
    format!("{subject}_categorized_questions.md")
}

/// Frame every document as `Source: {name}\n{content}`, joined by a blank line.
///
/// Input order is preserved.
pub fn format_context_documents(documents: &[ContextDocument]) -> String {
    documents
        .iter()
        .map(|d| format!("Source: {}\n{}", d.name, d.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Build the system preamble: the instruction followed by every document.
pub fn build_context_preamble(documents: &[ContextDocument]) -> String {
    if documents.is_empty() {
        return CONTEXT_INSTRUCTION.to_string();
    }
    format!(
        "{}\n\n{}",
        CONTEXT_INSTRUCTION,
        format_context_documents(documents)
    )
}

/// Prompt for the feeding workflow: instruction, blank line, refined prompt.
pub fn feeding_prompt(instruction: &str, refined_prompt: &str) -> String {
    format!("{instruction}\n\n{refined_prompt}")
}
