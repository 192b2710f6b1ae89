use std::ops::Index;
use std::slice;

use failure::Fallible;

use super::Word;

/// A sentence: a non-empty sequence of words in token order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Sentence {
    words: Vec<Word>,
}

impl Sentence {
    /// Construct a sentence from its words.
    ///
    /// Returns `None` when `words` is empty.
    pub fn new(words: Vec<Word>) -> Option<Self> {
        if words.is_empty() {
            None
        } else {
            Some(Sentence { words })
        }
    }

    /// Reconstruct a sentence from tab-joined word lines.
    pub fn from_json<S>(lines: &[S]) -> Fallible<Self>
    where
        S: AsRef<str>,
    {
        let words = lines
            .iter()
            .map(|line| Word::parse(line.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(words).ok_or_else(|| failure::err_msg("Cannot construct an empty sentence"))
    }

    /// Serialize the sentence as tab-joined word lines.
    pub fn to_json(&self) -> Vec<String> {
        self.words.iter().map(Word::to_line).collect()
    }

    pub fn get(&self, idx: usize) -> Option<&Word> {
        self.words.get(idx)
    }

    pub fn iter(&self) -> slice::Iter<Word> {
        self.words.iter()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Always `false`, sentences contain at least one word.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Surface forms of the words.
    pub fn forms(&self) -> Vec<&str> {
        self.words.iter().map(Word::form).collect()
    }
}

impl Index<usize> for Sentence {
    type Output = Word;

    fn index(&self, idx: usize) -> &Self::Output {
        &self.words[idx]
    }
}

impl<'a> IntoIterator for &'a Sentence {
    type Item = &'a Word;
    type IntoIter = slice::Iter<'a, Word>;

    fn into_iter(self) -> Self::IntoIter {
        self.words.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::Sentence;
    use crate::corpus::Word;

    fn sentence() -> Sentence {
        Sentence::new(vec![
            Word::parse("1\tDogs\tdog\tNOUN\tNNS\tNumber=Plur").unwrap(),
            Word::parse("2\tbark\tbark\tVERB\tVBP\tTense=Pres\t0\troot\t_\t_").unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn empty_sentences_are_rejected() {
        assert!(Sentence::new(Vec::new()).is_none());
        assert!(Sentence::from_json::<String>(&[]).is_err());
    }

    #[test]
    fn indexing_and_iteration() {
        let sentence = sentence();
        assert_eq!(sentence.len(), 2);
        assert_eq!(sentence[1].form(), "bark");
        assert_eq!(sentence.get(2), None);
        assert_eq!(sentence.forms(), vec!["Dogs", "bark"]);
        assert_eq!(
            sentence.iter().map(|w| w.upos()).collect::<Vec<_>>(),
            vec!["NOUN", "VERB"]
        );
    }

    #[test]
    fn json_round_trip() {
        let sentence = sentence();
        let json = sentence.to_json();
        assert_eq!(json[1], "2\tbark\tbark\tVERB\tVBP\tTense=Pres\t0\troot\t_\t_");
        assert_eq!(Sentence::from_json(&json).unwrap(), sentence);
    }
}
