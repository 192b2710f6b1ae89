mod evenness;
pub use evenness::EvennessApp;

mod prepare;
pub use prepare::PrepareApp;

mod probe;
pub use probe::ProbeApp;

mod unk_prop;
pub use unk_prop::UnkPropApp;

mod vocab_overlap;
pub use vocab_overlap::VocabOverlapApp;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use failure::{Fallible, ResultExt};
use udprobe::corpus::{Data, Sampling, Sentence};
use udprobe::wrapper::PREPROCESSED_JSON;

/// Read the training sentences of a preprocessed language.
fn read_train(dir: &Path) -> Fallible<Vec<Sentence>> {
    let path = dir.join(PREPROCESSED_JSON);
    let f = File::open(&path).context(format!("Cannot open '{}'", path.to_string_lossy()))?;
    let data = Data::from_json_read(BufReader::new(f))?;
    Ok(data.train(&Sampling::default())?.into_owned())
}
