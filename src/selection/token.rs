//! Tokenizer for selection strings.
//!
//! Splits one nesting level of a selection string into a flat token list.
//! Commas separate tokens; `name(` opens a relation whose body runs to the
//! matching `)`, found with a level-counting scan. Bodies are not tokenized
//! here: the compiler tokenizes each body when it descends into the relation.
//!
//! ```text
//! titulo,-precio,id=3,autor(nombre,pais(all)),all
//! ──┬─── ───┬─── ─┬── ──────────┬──────────── ─┬─
//!   │       │     │             │              └ All
//!   │       │     │             └ Relation { name: "autor", body: "nombre,pais(all)" }
//!   │       │     └ Filter { name: "id", value: "3" }
//!   │       └ Exclude("precio")
//!   └ Include("titulo")
//! ```

use std::ops::Range;

/// Byte range into the scanned string.
pub type Span = Range<usize>;

/// One token of a selection level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionToken {
    /// `all` (any case): every fetchable field at this level.
    All,
    /// `name`
    Include(String),
    /// `-name`
    Exclude(String),
    /// `name=value`
    Filter { name: String, value: String },
    /// `name(body)`; an empty body reads as `all`.
    Relation { name: String, body: String },
}

/// A token with its location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedToken {
    pub token: SelectionToken,
    /// Span of the whole token.
    pub span: Span,
    /// Offset of the trimmed relation body; `None` for other tokens.
    pub body_offset: Option<usize>,
}

/// Structural problems found while scanning. Neither stops the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanIssue {
    /// `(` at this offset has no matching `)`; the rest of the string became its body.
    UnmatchedOpen(usize),
    /// `)` at this offset closes nothing; it stays part of the surrounding word.
    StrayClose(usize),
}

/// Result of scanning one level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenizeOutput {
    pub tokens: Vec<ScannedToken>,
    pub issues: Vec<ScanIssue>,
}

/// Scan one level of a selection string.
pub fn tokenize(input: &str) -> TokenizeOutput {
    let bytes = input.as_bytes();
    let mut output = TokenizeOutput::default();
    let mut word_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b',' => {
                push_word(&mut output, input, word_start..i);
                word_start = i + 1;
            }
            b'(' => {
                let body_start = i + 1;
                let (body_end, next) = match find_matching_close(input, body_start) {
                    Some(close) => (close, close + 1),
                    None => {
                        output.issues.push(ScanIssue::UnmatchedOpen(i));
                        (bytes.len(), bytes.len())
                    }
                };

                let name = input[word_start..i].trim();
                let raw_body = &input[body_start..body_end];
                let body = raw_body.trim();
                let body_offset = body_start + (raw_body.len() - raw_body.trim_start().len());
                output.tokens.push(ScannedToken {
                    token: SelectionToken::Relation {
                        name: name.to_string(),
                        body: if body.is_empty() { "all" } else { body }.to_string(),
                    },
                    span: word_start..next,
                    body_offset: Some(body_offset),
                });

                word_start = next;
                i = next;
                continue;
            }
            b')' => output.issues.push(ScanIssue::StrayClose(i)),
            _ => {}
        }
        i += 1;
    }

    push_word(&mut output, input, word_start..bytes.len());
    output
}

/// Index of the `)` closing the level that starts at `from`.
///
/// `from` is the first byte after an opening `(`. Returns `None` when the
/// string ends before the level closes.
pub fn find_matching_close(input: &str, from: usize) -> Option<usize> {
    let mut level = 0usize;
    for (i, byte) in input.bytes().enumerate().skip(from) {
        match byte {
            b'(' => level += 1,
            b')' if level == 0 => return Some(i),
            b')' => level -= 1,
            _ => {}
        }
    }
    None
}

fn push_word(output: &mut TokenizeOutput, input: &str, span: Span) {
    let Some(raw) = input.get(span.clone()) else {
        return;
    };
    let word = raw.trim();
    if word.is_empty() {
        return;
    }

    output.tokens.push(ScannedToken {
        token: classify(word),
        span,
        body_offset: None,
    });
}

fn classify(word: &str) -> SelectionToken {
    if word.eq_ignore_ascii_case("all") {
        return SelectionToken::All;
    }

    if let Some(name) = word.strip_prefix('-') {
        // `-name=value` is still an exclusion; the value is meaningless there.
        let name = name.split('=').next().unwrap_or(name);
        return SelectionToken::Exclude(name.trim().to_string());
    }

    let parts: Vec<&str> = word.split('=').collect();
    match parts.as_slice() {
        [name, value] => SelectionToken::Filter {
            name: name.trim().to_string(),
            value: value.trim().to_string(),
        },
        _ => SelectionToken::Include(word.to_string()),
    }
}
