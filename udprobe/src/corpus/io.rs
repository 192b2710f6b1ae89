use std::io::BufRead;

use failure::Fallible;

use super::{ParseError, Sentence, Word};

/// Reader for CoNLL-U sentences.
///
/// Comment lines (starting with `#`) are skipped, a blank line ends
/// the current sentence. Runs of blank lines never result in empty
/// sentences.
pub struct Reader<R> {
    read: R,
    line: usize,
}

impl<R> Reader<R>
where
    R: BufRead,
{
    pub fn new(read: R) -> Self {
        Reader { read, line: 0 }
    }

    fn read_sentence(&mut self) -> Fallible<Option<Sentence>> {
        let mut words = Vec::new();
        let mut buf = String::new();

        loop {
            buf.clear();
            if self.read.read_line(&mut buf)? == 0 {
                return Ok(Sentence::new(words));
            }
            self.line += 1;

            let line = buf.trim_end_matches(&['\n', '\r'][..]);

            if line.trim().is_empty() {
                if let Some(sentence) = Sentence::new(std::mem::take(&mut words)) {
                    return Ok(Some(sentence));
                }
                continue;
            }

            if line.starts_with('#') {
                continue;
            }

            let word = Word::parse(line).map_err(|err| match err {
                ParseError::TooFewFields { fields, .. } => ParseError::TooFewFields {
                    line: self.line,
                    fields,
                },
                err => err,
            })?;
            words.push(word);
        }
    }
}

impl<R> Iterator for Reader<R>
where
    R: BufRead,
{
    type Item = Fallible<Sentence>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_sentence().transpose()
    }
}

/// Parse all sentences in a CoNLL-U string.
pub fn parse(text: &str) -> Fallible<Vec<Sentence>> {
    Reader::new(text.as_bytes()).collect()
}
