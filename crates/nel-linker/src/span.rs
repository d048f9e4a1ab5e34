//! Span selection
//!
//! Walks the tokens of each sentence in text order and groups linkable
//! tokens into mention candidates. Grouping follows chunk boundaries unless
//! the language configuration says to ignore chunks.

use nel_core::{AnalysedText, LanguageProcessingConfig, Sentence, TextView, Token};

use crate::Span;

/// Tokens collected for the span under construction
struct Group {
    /// Indexes of the span tokens
    tokens: Vec<usize>,
    /// Non-linkable tokens after the last span token, inside the same chunk
    pending: Vec<usize>,
    /// Chunk the group belongs to
    chunk: Option<usize>,
}

impl Group {
    fn new(token: usize, chunk: Option<usize>) -> Self {
        Self {
            tokens: vec![token],
            pending: Vec::new(),
            chunk,
        }
    }
}

/// Select mention candidates from annotated text.
///
/// Spans are returned in text order and never overlap.
pub fn select_spans(text: &AnalysedText, config: &LanguageProcessingConfig) -> Vec<Span> {
    select_spans_in(text, &text.view(), config)
}

/// Select mention candidates, slicing the text through a prebuilt view
pub fn select_spans_in(
    text: &AnalysedText,
    view: &TextView<'_>,
    config: &LanguageProcessingConfig,
) -> Vec<Span> {
    let mut spans = Vec::new();

    for (sentence_idx, sentence) in text.sentences.iter().enumerate() {
        select_in_sentence(view, sentence_idx, sentence, config, &mut spans);
    }

    tracing::debug!("Selected {} spans", spans.len());
    spans
}

fn select_in_sentence(
    text: &TextView<'_>,
    sentence_idx: usize,
    sentence: &Sentence,
    config: &LanguageProcessingConfig,
    spans: &mut Vec<Span>,
) {
    // Sentences without chunks are grouped by eligibility alone
    let use_chunks = !config.ignore_chunks && !sentence.chunks.is_empty();
    let mut chunk_cursor = 0;
    let mut group: Option<Group> = None;

    for (idx, token) in sentence.tokens.iter().enumerate() {
        let chunk = if use_chunks {
            chunk_of(sentence, token, &mut chunk_cursor)
        } else {
            None
        };
        let eligible = is_eligible(text, token, idx == 0, chunk.is_some(), config);

        if eligible {
            match group.as_mut() {
                Some(g) if !use_chunks || (chunk.is_some() && g.chunk == chunk) => {
                    // Tokens between two linkable tokens of a chunk belong to the span
                    g.tokens.append(&mut g.pending);
                    g.tokens.push(idx);
                }
                _ => {
                    flush(text, sentence_idx, sentence, group.take(), spans);
                    group = Some(Group::new(idx, chunk));
                }
            }
        } else {
            match group.as_mut() {
                Some(g) if use_chunks && g.chunk.is_some() && g.chunk == chunk => g.pending.push(idx),
                _ => flush(text, sentence_idx, sentence, group.take(), spans),
            }
        }
    }

    flush(text, sentence_idx, sentence, group, spans);
}

/// Index of the chunk containing `token`, advancing `cursor` over chunks
/// that end before it
fn chunk_of(sentence: &Sentence, token: &Token, cursor: &mut usize) -> Option<usize> {
    while *cursor < sentence.chunks.len() && sentence.chunks[*cursor].end <= token.start {
        *cursor += 1;
    }

    sentence
        .chunks
        .get(*cursor)
        .filter(|chunk| chunk.contains(token))
        .map(|_| *cursor)
}

/// Whether a token may be part of a mention
fn is_eligible(
    text: &TextView<'_>,
    token: &Token,
    sentence_start: bool,
    in_chunk: bool,
    config: &LanguageProcessingConfig,
) -> bool {
    // Without token rules, chunks alone define mentions
    if !config.has_token_rules() {
        return in_chunk;
    }

    if let Some(pos) = token
        .best_pos()
        .filter(|p| p.probability >= config.min_pos_probability)
    {
        return config.linked_pos.contains(&pos.tag)
            || pos
                .categories
                .iter()
                .any(|c| config.linked_lexical_categories.contains(c));
    }

    config.link_upper_case_tokens
        && !sentence_start
        && text
            .span(token.start, token.end)
            .and_then(|t| t.chars().next())
            .is_some_and(char::is_uppercase)
}

fn flush(
    text: &TextView<'_>,
    sentence_idx: usize,
    sentence: &Sentence,
    group: Option<Group>,
    spans: &mut Vec<Span>,
) {
    let Some(group) = group else {
        return;
    };
    let (Some(&first), Some(&last)) = (group.tokens.first(), group.tokens.last()) else {
        return;
    };

    let start = sentence.tokens[first].start;
    let end = sentence.tokens[last].end;
    let Some(covered) = text.span(start, end) else {
        tracing::warn!("Span [{start}, {end}) lies outside the text, skipped");
        return;
    };

    spans.push(Span {
        start,
        end,
        text: covered.to_string(),
        tokens: group
            .tokens
            .iter()
            .map(|&i| sentence.tokens[i].clone())
            .collect(),
        sentence: sentence_idx,
        from_chunk: group.chunk.is_some(),
    });
}
