//! Prompt templates for the four inference operations.
//!
//! Each template is a system/user pair with `{name}` placeholders filled by
//! [`PromptTemplate::render`]. Unknown placeholders are left as-is.

/// A system + user prompt pair.
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub system: &'static str,
    pub user: &'static str,
}

impl PromptTemplate {
    /// Substitute `{key}` placeholders in both halves.
    ///
    /// Returns `(system, user)`.
    pub fn render(&self, vars: &[(&str, &str)]) -> (String, String) {
        (fill(self.system, vars), fill(self.user, vars))
    }
}

// Single pass, so substituted values are never scanned for placeholders.
fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let (before, from_brace) = rest.split_at(start);
        out.push_str(before);
        let substituted = vars.iter().find_map(|(key, value)| {
            from_brace
                .strip_prefix('{')
                .and_then(|s| s.strip_prefix(key))
                .and_then(|s| s.strip_prefix('}'))
                .map(|remainder| (*value, remainder))
        });
        match substituted {
            Some((value, remainder)) => {
                out.push_str(value);
                rest = remainder;
            }
            None => {
                out.push('{');
                rest = from_brace.strip_prefix('{').unwrap_or_default();
            }
        }
    }
    out.push_str(rest);
    out
}

const SUMMARY_SYSTEM: &str = "\
Date: {date}
Condense the document you are given into a concise summary that captures its main points and themes.";

/// Whole-document summary for inputs that fit in one chunk.
pub const SUMMARIZE_ONESHOT: PromptTemplate = PromptTemplate {
    system: SUMMARY_SYSTEM,
    user: "\
Read the Original section below and summarize it. Work through it in chunks, summarizing each \
one in order and starting each with \"Chunk (X of Y):\". Ignore sponsorships and advertisements.

Then write a Final Summary: identify the main themes across your chunk summaries, merge the \
information without redundancy, and keep the details needed to understand the document. \
Start that section with \"Final Summary:\".

Original:
{document}",
};

/// One chunk of a level, with the preceding chunk's summary as context.
pub const SUMMARIZE_CHUNK: PromptTemplate = PromptTemplate {
    system: SUMMARY_SYSTEM,
    user: "\
Summarize the Original section below so that it reads coherently after the Prior Summary.

- The Prior Summary covers the chunk directly before this one.
- Do not repeat details already in the Prior Summary.
- Ignore sponsorships and advertisements.

Prior Summary:
{prior_summary}

Original (Chunk {chunk_no} of {total_chunks}):
{chunk}

Summary (Chunk {chunk_no} of {total_chunks}):",
};

/// Light condensation of one summary that is slightly over budget.
pub const COMPRESS: PromptTemplate = PromptTemplate {
    system: "\
Date: {date}
Condense the document you are given slightly. Keep every key point and avoid unnecessary cuts.",
    user: "\
Rewrite the Original section below as a slightly condensed version that keeps its relevant \
details and stays coherent.

Original:
{original}

Slightly Condensed Version:",
};

/// Final pass over the labeled section summaries.
pub const SUMMARIZE_FINAL: PromptTemplate = PromptTemplate {
    system: SUMMARY_SYSTEM,
    user: "\
Write a Final Summary of the document from its summarized sections:

1. Review every section and note its main points.
2. Identify the themes that run through the whole document.
3. Merge the sections around those themes without redundancy.
4. Keep the details that are essential to understanding the document.
5. Check the result reflects the document's content and purpose.

Summarized Sections:
{summary}

Concise Summary:",
};
