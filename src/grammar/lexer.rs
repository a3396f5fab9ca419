//! Tokenizer over the declarative catalog.
//!
//! At each position the scanner attempts every catalog pattern in precedence
//! order; the first match wins, unless the matched spec declares a longer
//! alternative that matches a strictly longer span at the same offset, in
//! which case the alternative is emitted instead (longest-match-wins). This
//! retry is what keeps `optionalFoo` a single identifier and `0x1F` a single
//! hex constant.
//!
//! Unmatched input never aborts the scan: consecutive unmatched characters
//! are merged into one lexical error and tokenization resumes.

use crate::diagnostics::LexError;

use super::token::{CompiledSpec, Token, CATALOG};

/// Result of one tokenization pass.
#[derive(Debug, Clone, PartialEq)]
pub struct LexOutcome {
    /// Emitted tokens, trivia (whitespace, line terminators) excluded.
    pub tokens: Vec<Token>,
    pub errors: Vec<LexError>,
}

fn match_at<'c>(spec: &'c CompiledSpec, text: &str, offset: usize) -> Option<(&'c CompiledSpec, usize)> {
    spec.regex
        .find(&text[offset..])
        .map(|m| (spec, m.end()))
}

/// Tokenizes `text` into a stream plus lexical errors. Never fails.
pub fn tokenize(text: &str) -> LexOutcome {
    let catalog = &*CATALOG;
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    let mut offset = 0;
    // Open unmatched span, merged into one error when matching resumes.
    let mut unmatched_start: Option<usize> = None;

    while offset < text.len() {
        let mut matched = None;

        for spec in &catalog.specs {
            if let Some(hit) = match_at(spec, text, offset) {
                matched = Some(hit);
                break;
            }
        }

        // Longest-match retry against the declared longer alternative.
        if let Some((spec, len)) = matched {
            if let Some(alt_kind) = spec.longer_alt {
                let alt = catalog.spec_for(alt_kind);
                if let Some((_, alt_len)) = match_at(alt, text, offset) {
                    if alt_len > len {
                        matched = Some((alt, alt_len));
                    }
                }
            }
        }

        match matched {
            Some((spec, len)) => {
                if let Some(start) = unmatched_start.take() {
                    errors.push(LexError::unexpected(start, offset));
                }

                if !spec.skipped {
                    let image = &text[offset..offset + len];
                    tokens.push(Token {
                        kind: spec.kind,
                        image: image.to_string(),
                        start: offset,
                        end: offset + len,
                        payload: spec.payload.and_then(|extract| extract(image)),
                    });
                }

                offset += len;
            }
            None => {
                if unmatched_start.is_none() {
                    unmatched_start = Some(offset);
                }
                // Skip one character (not one byte) so we stay on UTF-8
                // boundaries.
                let width = text[offset..]
                    .chars()
                    .next()
                    .map(char::len_utf8)
                    .unwrap_or(1);
                offset += width;
            }
        }
    }

    if let Some(start) = unmatched_start {
        errors.push(LexError::unexpected(start, text.len()));
    }

    LexOutcome { tokens, errors }
}
