//! Prompt builders for each backend invocation of an analysis run.

use serde_json::Value;

/// Prompt asking for plain-English bullets about one section of the document.
pub(crate) fn chunk_prompt(section: usize, total: usize, content: &str) -> String {
    format!(
        "You extract key information from Terms of Service documents for ordinary users.\n\n\
         Read the section below and list what a user should know about it: data collection and \
         sharing, user rights and limits, payments and renewals, account termination, liability \
         and dispute resolution, and any other unusual clause.\n\n\
         Respond with JSON only, shaped as \
         {{\"bullets\":[{{\"text\":\"<explanation, at most 200 characters>\",\"excerpt\":\"<quote, at most 150 characters>\"}}]}}. \
         Return {{\"bullets\":[]}} when the section has no meaningful content.\n\n\
         Section {section} of {total}:\n{content}"
    )
}

/// Prompt merging every per-chunk result into one summary.
pub(crate) fn consolidation_prompt(chunk_results: &[Value]) -> String {
    let rendered = serde_json::to_string(chunk_results).unwrap_or_else(|_| "[]".into());
    format!(
        "You are consolidating section summaries of a Terms of Service document.\n\n\
         Merge similar points, drop duplicates, and keep the five most important points a user \
         should know, covering privacy, account rights, billing, legal limits, and concerning \
         clauses.\n\n\
         Respond with JSON only, shaped as \
         {{\"summary\":[{{\"text\":\"<point>\",\"excerpt\":\"<supporting quote>\"}}]}}.\n\n\
         Section summaries:\n{rendered}"
    )
}

/// Prompt extracting at least `min_risks` risks from the full text.
pub(crate) fn risk_prompt(text: &str, min_risks: usize) -> String {
    format!(
        "You review Terms of Service documents for clauses that put users at risk. Identify at \
         least {min_risks} such clauses; standard clauses that limit user rights count.\n\n\
         Consider data sharing and selling, account termination and content removal, \
         arbitration and class action waivers, liability limits, automatic renewals and fees, \
         licenses over user content, and changes without notice.\n\n\
         Respond with a JSON array only. Each item is \
         {{\"type\":\"<category>\",\"severity\":\"Low|Medium|High\",\"excerpt\":\"<quote, at most 200 characters>\",\"note\":\"<why it matters>\"}}.\n\n\
         Document:\n{text}"
    )
}

/// Simplified retry prompt over a prefix of the document.
pub(crate) fn risk_retry_prompt(prefix: &str, min_risks: usize) -> String {
    format!(
        "List {min_risks} potential concerns in this Terms of Service excerpt. Common clauses \
         such as data collection, termination rights, liability limits, dispute resolution, or \
         automatic renewal all qualify.\n\n\
         Respond with a JSON array only: \
         [{{\"type\":\"<category>\",\"severity\":\"Low|Medium|High\",\"excerpt\":\"<quote>\",\"note\":\"<why it matters>\"}}]\n\n\
         Excerpt:\n{prefix}"
    )
}

/// Prompt answering a user question about an analyzed document.
pub(crate) fn question_prompt(document: &str, question: &str) -> String {
    format!(
        "You answer questions about a Terms of Service document.\n\n\
         Document:\n{document}\n\n\
         Question: {question}\n\n\
         Answer clearly and concisely from the document. If the document does not cover the \
         question, say so."
    )
}

/// Take the first `max_chars` characters, marking truncation with an ellipsis.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((offset, _)) => format!("{}...", &text[..offset]),
        None => text.to_string(),
    }
}
