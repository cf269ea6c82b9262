//! Parses `vlm_text` into `tool_calls_out` (§3, §4.2 step 7).
//!
//! The VLM replies with a story-text blob containing zero or more
//! `name(arg1, arg2, ...)` fragments — the same shape the action executor
//! parses on the other side of a turn (§1: "story text... containing
//! tool-call fragments"). A well-formed call is an identifier immediately
//! followed by a parenthesized, comma-separated argument list; anything
//! else in the text is prose and is ignored rather than rejected.

use va_domain::ToolCall;

/// Extract every well-formed `name(args...)` fragment from `text`, in the
/// order they appear, each carrying its `source_span` offset range.
pub fn parse_tool_calls(text: &str) -> Vec<ToolCall> {
    let bytes = text.as_bytes();
    let mut calls = Vec::new();
    let mut i = 0usize;

    while i < bytes.len() {
        if !is_ident_start(bytes[i]) {
            i += 1;
            continue;
        }
        let name_start = i;
        let mut j = i + 1;
        while j < bytes.len() && is_ident_continue(bytes[j]) {
            j += 1;
        }
        let name_end = j;

        // Skip whitespace between the identifier and an opening paren —
        // but only treat it as a call if `(` follows directly or after
        // spaces, mirroring a permissive story-text grammar.
        let mut k = j;
        while k < bytes.len() && bytes[k] == b' ' {
            k += 1;
        }
        if k >= bytes.len() || bytes[k] != b'(' {
            i = name_end.max(i + 1);
            continue;
        }

        if let Some((args_end, args)) = parse_args(text, k + 1) {
            let name = text[name_start..name_end].to_string();
            calls.push(ToolCall {
                name,
                args,
                source_span: Some((name_start, args_end)),
            });
            i = args_end;
        } else {
            i = name_end.max(i + 1);
        }
    }

    calls
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Parses a comma-separated argument list starting just after `(` at
/// `start`, returning the offset just past the matching `)` and the
/// trimmed argument strings. Returns `None` if no matching `)` is found
/// before the text ends (malformed / truncated call).
fn parse_args(text: &str, start: usize) -> Option<(usize, Vec<String>)> {
    let bytes = text.as_bytes();
    let close = find_close_paren(bytes, start)?;
    let inner = &text[start..close];
    let args = if inner.trim().is_empty() {
        Vec::new()
    } else {
        inner.split(',').map(|s| s.trim().to_string()).collect()
    };
    Some((close + 1, args))
}

fn find_close_paren(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 1i32;
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}
