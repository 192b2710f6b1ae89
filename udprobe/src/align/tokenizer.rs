use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use failure::{format_err, Fallible};
use serde_derive::{Deserialize, Serialize};
use serde_json::json;
use tokenizers::Tokenizer;

/// Sub-word tokenizer.
///
/// Splits a single word into the sub-word units that an encoder
/// consumes and maps these units to vocabulary identifiers.
pub trait SubwordTokenizer {
    /// Split a word into sub-word tokens.
    fn tokenize(&self, word: &str) -> Fallible<Vec<String>>;

    /// Look up the identifier of a token.
    fn token_id(&self, token: &str) -> Option<u32>;

    /// Identifier used for tokens that are not in the vocabulary.
    fn unknown_id(&self) -> u32;

    /// Token that starts every encoder input.
    fn start_token(&self) -> &str;

    /// Token that ends every encoder input.
    fn end_token(&self) -> &str;
}

/// Special tokens of a BERT vocabulary.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpecialTokens {
    pub start: String,
    pub end: String,
    pub unknown: String,
}

impl Default for SpecialTokens {
    fn default() -> Self {
        SpecialTokens {
            start: "[CLS]".to_owned(),
            end: "[SEP]".to_owned(),
            unknown: "[UNK]".to_owned(),
        }
    }
}

/// Tokenizer backed by a Hugging Face tokenizer pipeline.
///
/// Words are encoded without special tokens, the start and end markers
/// are added by the aligner.
pub struct BertTokenizer {
    inner: Tokenizer,
    special: SpecialTokens,
    tokens: Vec<String>,
    unknown_id: u32,
}

impl BertTokenizer {
    /// Wrap a tokenizer, checking that the special tokens are known.
    pub fn new(inner: Tokenizer, special: SpecialTokens) -> Fallible<Self> {
        let mut special_ids = Vec::with_capacity(3);
        for token in &[&special.start, &special.end, &special.unknown] {
            special_ids.push(inner.token_to_id(token).ok_or_else(|| {
                format_err!("Special token '{}' is not in the vocabulary", token)
            })?);
        }
        let unknown_id = special_ids[2];

        let vocab = inner.get_vocab(true);
        let vocab_len = vocab.values().map(|&id| id as usize + 1).max().unwrap_or(0);
        let mut tokens = vec![String::new(); vocab_len];
        for (token, id) in vocab {
            tokens[id as usize] = token;
        }

        Ok(BertTokenizer {
            inner,
            special,
            tokens,
            unknown_id,
        })
    }

    /// Read a tokenizer in `tokenizer.json` format.
    pub fn from_file(path: impl AsRef<Path>, special: SpecialTokens) -> Fallible<Self> {
        let path = path.as_ref();
        let inner = Tokenizer::from_file(path).map_err(|e| {
            format_err!(
                "Cannot load tokenizer from {}: {}",
                path.to_string_lossy(),
                e
            )
        })?;

        Self::new(inner, special)
    }

    /// Construct the BERT WordPiece pipeline for a vocabulary.
    ///
    /// The identifier of a token is its position in `tokens`. The
    /// pipeline cleans the text, separates CJK characters and
    /// punctuation, optionally lowercases and strips accents, and
    /// splits the remaining pieces with WordPiece.
    pub fn from_vocab<S>(tokens: &[S], special: SpecialTokens, lowercase: bool) -> Fallible<Self>
    where
        S: AsRef<str>,
    {
        let vocab = tokens
            .iter()
            .enumerate()
            .map(|(idx, token)| (token.as_ref(), idx as u32))
            .collect::<HashMap<_, _>>();

        let pipeline = json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [],
            "normalizer": {
                "type": "BertNormalizer",
                "clean_text": true,
                "handle_chinese_chars": true,
                "strip_accents": null,
                "lowercase": lowercase,
            },
            "pre_tokenizer": { "type": "BertPreTokenizer" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordPiece",
                "unk_token": special.unknown,
                "continuing_subword_prefix": "##",
                "max_input_chars_per_word": 100,
                "vocab": vocab,
            },
        });

        let inner = Tokenizer::from_str(&pipeline.to_string())
            .map_err(|e| format_err!("Cannot construct tokenizer: {}", e))?;

        Self::new(inner, special)
    }

    /// Vocabulary entries in identifier order.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn vocab_len(&self) -> usize {
        self.tokens.len()
    }
}

impl SubwordTokenizer for BertTokenizer {
    fn tokenize(&self, word: &str) -> Fallible<Vec<String>> {
        let encoding = self
            .inner
            .encode(word, false)
            .map_err(|e| format_err!("Cannot tokenize '{}': {}", word, e))?;
        Ok(encoding.get_tokens().to_vec())
    }

    fn token_id(&self, token: &str) -> Option<u32> {
        self.inner.token_to_id(token)
    }

    fn unknown_id(&self) -> u32 {
        self.unknown_id
    }

    fn start_token(&self) -> &str {
        &self.special.start
    }

    fn end_token(&self) -> &str {
        &self.special.end
    }
}

#[cfg(test)]
mod tests {
    use super::{BertTokenizer, SpecialTokens, SubwordTokenizer};

    static VOCAB: &[&str] = &[
        "[PAD]", "[UNK]", "[CLS]", "[SEP]", "un", "##aff", "##able", "aff", "house", "##s", "'",
        "t", "don", ".", "你", "好", "##好", "قال", "،", "है", "।",
    ];

    fn tokenizer() -> BertTokenizer {
        BertTokenizer::from_vocab(VOCAB, SpecialTokens::default(), false).unwrap()
    }

    #[test]
    fn greedy_longest_match() {
        let tokenizer = tokenizer();
        assert_eq!(
            tokenizer.tokenize("unaffable").unwrap(),
            vec!["un", "##aff", "##able"]
        );
        assert_eq!(tokenizer.tokenize("houses").unwrap(), vec!["house", "##s"]);
        assert_eq!(tokenizer.tokenize("don't").unwrap(), vec!["don", "'", "t"]);
        assert!(tokenizer.tokenize("").unwrap().is_empty());
    }

    #[test]
    fn chinese_characters_are_separate_words() {
        assert_eq!(tokenizer().tokenize("你好").unwrap(), vec!["你", "好"]);
    }

    #[test]
    fn non_latin_punctuation_is_split() {
        let tokenizer = tokenizer();
        assert_eq!(tokenizer.tokenize("قال،").unwrap(), vec!["قال", "،"]);
        assert_eq!(tokenizer.tokenize("है।").unwrap(), vec!["है", "।"]);
    }

    #[test]
    fn unknown_words() {
        let tokenizer = tokenizer();
        assert_eq!(tokenizer.tokenize("housex").unwrap(), vec!["[UNK]"]);
        assert_eq!(tokenizer.tokenize(&"a".repeat(101)).unwrap(), vec!["[UNK]"]);
        assert_eq!(tokenizer.unknown_id(), 1);
    }

    #[test]
    fn lowercasing() {
        let lowercasing = BertTokenizer::from_vocab(VOCAB, SpecialTokens::default(), true).unwrap();
        assert_eq!(lowercasing.tokenize("House").unwrap(), vec!["house"]);
        assert_eq!(tokenizer().tokenize("House").unwrap(), vec!["[UNK]"]);
    }

    #[test]
    fn token_ids() {
        let tokenizer = tokenizer();
        assert_eq!(tokenizer.token_id("[CLS]"), Some(2));
        assert_eq!(tokenizer.token_id("##s"), Some(9));
        assert_eq!(tokenizer.token_id("houses"), None);
        assert_eq!(tokenizer.vocab_len(), VOCAB.len());
        assert_eq!(tokenizer.tokens()[14], "你");
    }

    #[test]
    fn missing_special_tokens() {
        assert!(BertTokenizer::from_vocab(
            &["[UNK]", "[CLS]"][..],
            SpecialTokens::default(),
            false
        )
        .is_err());
    }

    #[test]
    fn missing_tokenizer_file() {
        assert!(BertTokenizer::from_file("testdata/does-not-exist.json", SpecialTokens::default())
            .is_err());
    }
}
