//! Prompt construction and response cleanup.
//!
//! Pure string logic; no I/O and no subprocesses.

/// Instruction that opens every planning prompt.
pub const PLAN_INSTRUCTION: &str = "You are an assistant that writes a step-by-step plan for a file or \
folder creation request. Number every step, say which standard-library call \
performs it, and justify each choice (for example os.makedirs versus pathlib). \
Assume the script runs on the user's own machine from the current working \
directory, with only the Python standard library available and no network access.";

/// Instruction that opens every code-generation prompt.
pub const CODE_INSTRUCTION: &str = "You are an assistant that writes a Python script implementing the \
plan below for the user's request.
- Use the Python standard library only.
- Comment each step.
- Handle edge cases such as existing files or directories and permission errors.
- Build paths portably (os.path.join or pathlib).";

/// Formatting rules appended after the plan and request.
pub const CODE_FORMAT_RULES: &str = "Reply with a clean, directly executable Python script and nothing else: \
no markdown, no code fences or backticks, no explanation before or after the code. \
Work within the current directory and check for existing files before writing.";

/// Cue that ends the planning prompt.
pub const PLAN_CUE: &str = "Plan:";

/// Cue that ends the code prompt.
pub const CODE_CUE: &str = "Python code:";

const FENCE: &str = "```";

/// Build the planning prompt:
/// `<instruction>\n\nUser request:\n<request>\n\nPlan:`.
pub fn plan_prompt(request: &str) -> String {
    format!("{PLAN_INSTRUCTION}\n\nUser request:\n{request}\n\n{PLAN_CUE}")
}

/// Build the code-generation prompt from the approved plan and the request.
pub fn code_prompt(plan: &str, request: &str) -> String {
    format!(
        "{CODE_INSTRUCTION}\n\nPlan:\n{plan}\n\nUser request:\n{request}\n\n{CODE_FORMAT_RULES}\n\n{CODE_CUE}\n"
    )
}

/// Remove markdown code fences from a model response.
///
/// Both the plain (```` ``` ````) and language-tagged (```` ```python ````)
/// forms are removed. A tag is a run of tag characters right after the fence.
/// It is dropped when only horizontal whitespace follows it on the line, or
/// when it names a script language and code follows on the same line.
/// Removal repeats until no fence remains, so the result never contains a
/// fence and `strip_markup(strip_markup(t)) == strip_markup(t)`.
pub fn strip_markup(text: &str) -> String {
    let mut current = text.to_string();
    while current.contains(FENCE) {
        current = strip_fences_once(&current);
    }
    current.trim().to_string()
}

fn strip_fences_once(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find(FENCE) {
        out.push_str(&rest[..idx]);
        rest = skip_language_tag(&rest[idx + FENCE.len()..]);
    }
    out.push_str(rest);
    out
}

/// Tags dropped even when code shares the fence's line.
const INLINE_TAGS: &[&str] = &[
    "python", "python3", "py", "py3", "sh", "bash", "shell", "zsh", "powershell", "ps1",
];

/// Return `after` (the text following a fence) without its language tag.
fn skip_language_tag(after: &str) -> &str {
    let tag_len = after.find(|c: char| !is_tag_char(c)).unwrap_or(after.len());
    if tag_len == 0 {
        return after;
    }
    let (tag, tail) = after.split_at(tag_len);
    let padded = tail.trim_start_matches([' ', '\t', '\r']);
    if padded.is_empty() || padded.starts_with('\n') {
        return padded;
    }
    let separated = padded.len() < tail.len();
    if separated && INLINE_TAGS.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
        return padded;
    }
    after
}

fn is_tag_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '#' | '.' | '_')
}
