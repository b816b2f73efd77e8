//! Instructions sent to the completion service.
//!
//! The defaults pin down the contract the renderer and readers rely on: source-only content,
//! a fixed phrase for anything the material does not cover, and two markdown parts (long-form
//! study notes, then a bullet-only rapid review). Deployments may swap the wording through
//! `NOTES_SYSTEM_PROMPT_FILE` / `NOTES_USER_PROMPT_FILE`.

/// Default system instruction.
pub(crate) const DEFAULT_SYSTEM_PROMPT: &str = "You are a pharmacy educator preparing exam study material. \
Use ONLY the source material supplied by the user; do not add general knowledge. \
Whenever something is not explicitly stated in the source, write exactly: 'Not covered in these slides'. \
Respond with clean Markdown that converts well to DOCX and PDF.";

/// Default user instruction. The source text is appended after the closing banner.
pub(crate) const DEFAULT_USER_PROMPT: &str = r#"Produce TWO documents in ONE Markdown response.

# DOCUMENT 1: STUDY NOTES (PHARMACY)

Reader: a pharmacy student meeting this topic for the first time.

Rules:
- Keep everything that relates to the learning objectives.
- Group the core content by learning objective.
- Be concise, consolidated and accurate.
- Never infer beyond the source; write 'Not covered in these slides' for any missing detail.

Structure:
## Title
## Learning Objectives
## Big Picture Overview (how the concepts connect)
## Core Notes (grouped by learning objective)
## Diagrams & Flowcharts
   - Add plain-text diagrams or flowcharts (arrows, boxes, numbered steps) wherever they aid understanding,
     especially for mechanisms, pathways, comparisons and cause-effect chains.
## Additional Information
   - Only material that is not essential to the learning objectives.
## Key Terms

# DOCUMENT 2: RAPID REVIEW (PHARMACY EXAM)

Reader: a student revising shortly before the exam.

Rules:
- Bullet points only, as short as possible.
- Explanations only where exam clarity depends on them.
- Prioritise high-yield exam facts.

Structure:
## High-Yield Facts
## High-Yield Drug Points (mechanism, use, cautions, interactions where present)
## Interactions & Monitoring
## Common Exam Traps / Confusions
## Exam-Style Questions

================================
SOURCE MATERIAL (USE ONLY THIS)
================================
"#;

/// System and user instructions for one notes request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    /// System-role instruction.
    pub system: String,
    /// User-role instruction; the source bundle is appended verbatim.
    pub user: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            system: DEFAULT_SYSTEM_PROMPT.to_string(),
            user: DEFAULT_USER_PROMPT.to_string(),
        }
    }
}

impl PromptTemplate {
    /// User message with the source text embedded at its end.
    pub fn user_message(&self, source_text: &str) -> String {
        let mut message = String::with_capacity(self.user.len() + source_text.len() + 1);
        message.push_str(&self.user);
        if !message.is_empty() && !message.ends_with('\n') {
            message.push('\n');
        }
        message.push_str(source_text);
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOT_COVERED_PHRASE: &str = "Not covered in these slides";

    #[test]
    fn default_prompt_carries_the_contract() {
        let prompt = PromptTemplate::default();
        assert!(prompt.system.contains(NOT_COVERED_PHRASE));
        assert!(prompt.user.contains(NOT_COVERED_PHRASE));
        assert!(prompt.user.contains("STUDY NOTES"));
        assert!(prompt.user.contains("RAPID REVIEW"));
        assert!(prompt.user.contains("## Key Terms"));
        assert!(prompt.user.contains("## Exam-Style Questions"));
    }

    #[test]
    fn source_text_is_appended_verbatim() {
        let prompt = PromptTemplate::default();
        let source = "=== File: a.txt ===\nline one\n  indented";
        let message = prompt.user_message(source);
        assert!(message.ends_with(source));
        assert!(message.starts_with(DEFAULT_USER_PROMPT));
    }

    #[test]
    fn custom_template_without_newline_is_separated() {
        let prompt = PromptTemplate {
            system: "sys".into(),
            user: "Summarize:".into(),
        };
        assert_eq!(prompt.user_message("body"), "Summarize:\nbody");
    }
}
