//! Shared fixtures for linking integration tests

#![allow(dead_code)]

use std::sync::Arc;

use nel_core::{
    AnalysedText, Chunk, Entity, EntityLinkerConfig, LanguageProcessingConfig, LexicalCategory,
    PosTag, RedirectProcessingMode, Sentence, Token,
};
use nel_index::InMemoryEntityIndex;
use nel_linker::{DefaultLabelTokenizer, EntityLinker};

pub const MARSHALL: &str = "Dr. Patrick Marshall (1869 - November 1950) was a geologist who lived in New Zealand and worked at the University of Otago.";

pub fn marshall_words() -> Vec<(&'static str, &'static str)> {
    vec![
        ("Dr.", "NNP"),
        ("Patrick", "NNP"),
        ("Marshall", "NNP"),
        ("(", "-LRB-"),
        ("1869", "CD"),
        ("-", ":"),
        ("November", "NNP"),
        ("1950", "CD"),
        (")", "-RRB-"),
        ("was", "VBD"),
        ("a", "DT"),
        ("geologist", "NN"),
        ("who", "WP"),
        ("lived", "VBD"),
        ("in", "IN"),
        ("New", "NNP"),
        ("Zealand", "NNP"),
        ("and", "CC"),
        ("worked", "VBD"),
        ("at", "IN"),
        ("the", "DT"),
        ("University", "NNP"),
        ("of", "IN"),
        ("Otago", "NNP"),
        (".", "."),
    ]
}

pub fn marshall_chunks() -> Vec<(usize, usize)> {
    vec![(1, 2), (6, 7), (10, 11), (15, 16), (20, 23)]
}

pub fn marshall_text() -> AnalysedText {
    tagged(MARSHALL, &marshall_words(), &marshall_chunks())
}

/// Build a single-sentence text from `(word, tag)` pairs located left to
/// right in `text`; `chunks` are inclusive word index ranges
pub fn tagged(text: &str, words: &[(&str, &str)], chunks: &[(usize, usize)]) -> AnalysedText {
    let mut sentence = Sentence::new(0, text.chars().count());
    let mut cursor = 0;
    let mut offsets = Vec::new();

    for (word, tag) in words {
        let byte_start = cursor + text[cursor..].find(word).expect("word in text");
        let start = text[..byte_start].chars().count();
        let end = start + word.chars().count();
        cursor = byte_start + word.len();
        offsets.push((start, end));

        let mut pos = PosTag::new(*tag, 0.95);
        if tag.starts_with("NN") {
            pos = pos.with_category(LexicalCategory::Noun);
        }
        sentence = sentence.with_token(Token::new(start, end).with_pos(pos));
    }

    for (first, last) in chunks {
        sentence = sentence
            .with_chunk(Chunk::new(offsets[*first].0, offsets[*last].1).with_phrase("NP", 0.9));
    }

    AnalysedText::new(text).with_sentence(sentence)
}

pub fn entities() -> Vec<Entity> {
    vec![
        Entity::new("urn:test:PatrickMarshall")
            .with_label("Patrick Marshall")
            .with_type("dbpedia:Person"),
        Entity::new("urn:test:Geologe")
            .with_language_label("Geologe", "de")
            .with_language_label("geologist", "en")
            .with_redirect("urn:test:redirect:Geologist"),
        Entity::new("urn:test:redirect:Geologist")
            .with_language_label("Geologist", "en")
            .with_type("dbpedia:Profession"),
        Entity::new("urn:test:NewZealand")
            .with_label("New Zealand")
            .with_type("dbpedia:Country"),
        Entity::new("urn:test:UniversityOfOtago")
            .with_label("University of Otago")
            .with_type("dbpedia:University"),
        Entity::new("urn:test:UniversityOfOtago_Texas")
            .with_label("University of Otago Texas")
            .with_type("dbpedia:University"),
        Entity::new("urn:test:Otago").with_label("Otago"),
        Entity::new("urn:test:MarshallIslands").with_label("Marshall Islands"),
        Entity::new("urn:test:Zealand").with_label("Zealand"),
    ]
}

pub fn index() -> InMemoryEntityIndex {
    InMemoryEntityIndex::from_entities(Arc::new(DefaultLabelTokenizer::new()), entities())
}

/// Links tokens tagged NN, NNS, NNP or NNPS
pub fn noun_tags() -> LanguageProcessingConfig {
    LanguageProcessingConfig {
        linked_pos: ["NN", "NNS", "NNP", "NNPS"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        linked_lexical_categories: Default::default(),
        ..Default::default()
    }
}

pub fn linker_config(mode: RedirectProcessingMode) -> EntityLinkerConfig {
    EntityLinkerConfig {
        min_found_tokens: 2,
        redirect_mode: mode,
        ..Default::default()
    }
}

pub fn linker(mode: RedirectProcessingMode) -> EntityLinker {
    EntityLinker::new(
        Arc::new(index()),
        Arc::new(DefaultLabelTokenizer::new()),
        linker_config(mode),
    )
    .expect("valid linker config")
}
