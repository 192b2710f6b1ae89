//! CoNLL-U corpus model.

mod data;
pub use self::data::{Data, Sampling, Split};

mod error;
pub use self::error::{ParseError, SamplingError};

mod io;
pub use self::io::{parse, Reader};

mod sentence;
pub use self::sentence::Sentence;

mod word;
pub use self::word::{Features, Word, MIN_FIELDS};
