use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::fmt;

use super::ParseError;

const ID: usize = 0;
const FORM: usize = 1;
const LEMMA: usize = 2;
const UPOS: usize = 3;
const XPOS: usize = 4;
const FEATS: usize = 5;

/// Number of leading CoNLL-U columns that a word line must provide.
pub const MIN_FIELDS: usize = 6;

/// Morphological features of a word.
pub type Features = BTreeMap<String, String>;

/// A single token of a CoNLL-U sentence.
///
/// All columns of the original line are retained, so that a word can
/// be written back exactly as it was read. The morphological features
/// are parsed on first access.
#[derive(Clone)]
pub struct Word {
    fields: Vec<String>,
    feats: OnceCell<Features>,
}

impl Word {
    /// Construct a word from its tab-separated fields.
    pub fn from_fields(fields: Vec<String>) -> Result<Self, ParseError> {
        if fields.len() < MIN_FIELDS {
            return Err(ParseError::TooFewFields {
                line: 0,
                fields: fields.len(),
            });
        }

        Ok(Word {
            fields,
            feats: OnceCell::new(),
        })
    }

    /// Parse a word from a CoNLL-U data line.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        Self::from_fields(line.split('\t').map(ToOwned::to_owned).collect())
    }

    pub fn id(&self) -> &str {
        &self.fields[ID]
    }

    pub fn form(&self) -> &str {
        &self.fields[FORM]
    }

    pub fn lemma(&self) -> &str {
        &self.fields[LEMMA]
    }

    /// Universal part-of-speech tag.
    pub fn upos(&self) -> &str {
        &self.fields[UPOS]
    }

    /// Language-specific part-of-speech tag.
    pub fn xpos(&self) -> &str {
        &self.fields[XPOS]
    }

    /// Morphological features.
    ///
    /// The features column is parsed once, subsequent calls return the
    /// cached mapping. The placeholder `_` results in an empty mapping.
    pub fn feats(&self) -> Result<&Features, ParseError> {
        if let Some(feats) = self.feats.get() {
            return Ok(feats);
        }

        let feats = parse_features(&self.fields[FEATS])?;
        Ok(self.feats.get_or_init(|| feats))
    }

    /// All fields of the word, in CoNLL-U column order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// The word as a tab-separated CoNLL-U line.
    pub fn to_line(&self) -> String {
        self.fields.join("\t")
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Word({:?})", self.to_line())
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} {}", self.id(), self.form(), self.upos())
    }
}

impl PartialEq for Word {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl Eq for Word {}

fn parse_features(feats: &str) -> Result<Features, ParseError> {
    let mut features = Features::new();

    if feats == "_" {
        return Ok(features);
    }

    for feature in feats.split('|') {
        let (key, value) =
            feature
                .split_once('=')
                .ok_or_else(|| ParseError::MalformedFeature {
                    feature: feature.to_owned(),
                })?;
        features.insert(key.to_owned(), value.to_owned());
    }

    Ok(features)
}
