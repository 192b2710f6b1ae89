//! Tab-separated reports.

use std::io::{self, Write};

use itertools::Itertools;
use udprobe::wrapper::LanguageResult;

/// Write probing results, one language per row.
pub fn write_probe_report<W>(
    mut write: W,
    classifier: &str,
    results: &[LanguageResult],
) -> io::Result<()>
where
    W: Write,
{
    writeln!(
        write,
        "Language\tClasses\t{clf} Accuracy\t{clf} Balanced Accuracy\t{clf} Sensitivity\t\
         Majority Baseline Balanced Accuracy\tRandom Baseline Balanced Accuracy\t\
         Majority Baseline Accuracy\tRandom Baseline Accuracy\tSmall Sample",
        clf = classifier
    )?;

    for result in results {
        writeln!(
            write,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            result.language,
            result.classes.iter().join(","),
            result.classifier.accuracy,
            result.classifier.balanced_accuracy,
            result.sensitivity,
            result.majority.balanced_accuracy,
            result.random.balanced_accuracy,
            result.majority.accuracy,
            result.random.accuracy,
            if result.small_sample { "*" } else { "" }
        )?;
    }

    Ok(())
}

/// Write label evenness per language.
pub fn write_evenness_report<W>(mut write: W, rows: &[(String, f64, usize)]) -> io::Result<()>
where
    W: Write,
{
    writeln!(write, "Language\tShannon Evenness Index\t#Labels")?;
    for (language, evenness, n_labels) in rows {
        writeln!(write, "{}\t{}\t{}", language, evenness, n_labels)?;
    }

    Ok(())
}

/// Write a vocabulary overlap matrix.
///
/// The cell in row *i* and column *j* is the proportion of the
/// vocabulary of language *i* that is shared with language *j*.
pub fn write_overlap_report<W>(
    mut write: W,
    languages: &[&str],
    matrix: &[Vec<f64>],
) -> io::Result<()>
where
    W: Write,
{
    writeln!(write, "\t{}", languages.iter().join("\t"))?;
    for (language, row) in languages.iter().zip(matrix) {
        writeln!(write, "{}\t{}", language, row.iter().join("\t"))?;
    }

    Ok(())
}

/// Write the proportion of unknown tokens per language.
pub fn write_unknown_report<W>(mut write: W, rows: &[(String, f64)]) -> io::Result<()>
where
    W: Write,
{
    writeln!(write, "Language\tUNK Prop")?;
    for (language, proportion) in rows {
        writeln!(write, "{}\t{}", language, proportion)?;
    }

    Ok(())
}
