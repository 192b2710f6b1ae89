//! Corpus analyses.
//!
//! These analyses characterize the probing data of a language: the
//! sub-word vocabulary it uses, how much of it is unknown to the
//! tokenizer, and how evenly the labels of a property are distributed.

use std::collections::{BTreeMap, BTreeSet};

use failure::Fallible;

use crate::align::{Aligner, SubwordTokenizer};
use crate::corpus::Sentence;
use crate::property::{Property, PropertyValue};

/// The set of token identifiers used by the sentences.
///
/// Identifiers include the start and end tokens.
pub fn vocab_ids<T>(
    sentences: &[Sentence],
    aligner: &Aligner,
    tokenizer: &T,
) -> Fallible<BTreeSet<u32>>
where
    T: ?Sized + SubwordTokenizer,
{
    let mut ids = BTreeSet::new();
    for sentence in sentences {
        let alignment = aligner.align(&sentence.forms(), tokenizer)?;
        ids.extend(alignment.token_ids);
    }

    Ok(ids)
}

/// Proportion of `ids` that also occur in `other`.
///
/// Returns `None` when `ids` is empty.
pub fn proportion_in_common(ids: &BTreeSet<u32>, other: &BTreeSet<u32>) -> Option<f64> {
    if ids.is_empty() {
        return None;
    }

    Some(ids.intersection(other).count() as f64 / ids.len() as f64)
}

/// Pairwise vocabulary overlap.
///
/// Row *i*, column *j* contains the proportion of the identifiers of
/// language *i* that occur in language *j*. Languages without
/// identifiers are left out.
pub fn overlap_matrix<'a>(
    vocabs: &'a [(String, BTreeSet<u32>)],
) -> (Vec<&'a str>, Vec<Vec<f64>>) {
    let vocabs: Vec<_> = vocabs.iter().filter(|(_, ids)| !ids.is_empty()).collect();
    let languages = vocabs.iter().map(|(lang, _)| lang.as_str()).collect();

    let matrix = vocabs
        .iter()
        .map(|(_, ids)| {
            vocabs
                .iter()
                .filter_map(|(_, other)| proportion_in_common(ids, other))
                .collect()
        })
        .collect();

    (languages, matrix)
}

/// Proportion of unknown token identifiers.
///
/// The start and end tokens are counted as well. Returns `None` when
/// there are no sentences.
pub fn unknown_proportion<T>(
    sentences: &[Sentence],
    aligner: &Aligner,
    tokenizer: &T,
) -> Fallible<Option<f64>>
where
    T: ?Sized + SubwordTokenizer,
{
    let unknown_id = tokenizer.unknown_id();
    let mut n_unknown = 0;
    let mut n_tokens = 0;

    for sentence in sentences {
        let alignment = aligner.align(&sentence.forms(), tokenizer)?;
        n_tokens += alignment.token_ids.len();
        n_unknown += alignment
            .token_ids
            .iter()
            .filter(|&&id| id == unknown_id)
            .count();
    }

    if n_tokens == 0 {
        return Ok(None);
    }

    Ok(Some(n_unknown as f64 / n_tokens as f64))
}

/// Count the values of a property.
///
/// Words that do not have the property are not counted.
pub fn label_counts(
    sentences: &[Sentence],
    property: Property,
) -> Fallible<BTreeMap<String, usize>> {
    let mut counts = BTreeMap::new();
    for word in sentences.iter().flat_map(Sentence::iter) {
        if let Some(label) = word.value(property)? {
            *counts.entry(label.to_owned()).or_insert(0) += 1;
        }
    }

    Ok(counts)
}

/// Shannon evenness index of a label distribution.
///
/// This is the Shannon entropy of the distribution divided by the
/// maximum entropy, *ln k* for *k* labels. Returns `None` for fewer
/// than two labels.
pub fn shannon_evenness(counts: &BTreeMap<String, usize>) -> Option<f64> {
    let n_labels = counts.values().filter(|&&count| count > 0).count();
    if n_labels < 2 {
        return None;
    }

    let total = counts.values().sum::<usize>() as f64;
    let entropy = -counts
        .values()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / total;
            p * p.ln()
        })
        .sum::<f64>();

    Some(entropy / (n_labels as f64).ln())
}
