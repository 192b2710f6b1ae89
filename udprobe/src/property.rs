use std::fmt;
use std::str::FromStr;

use crate::corpus::{ParseError, Word};
use crate::probe::ProbeError;

/// Linguistic property that is probed for.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Property {
    /// Universal part-of-speech tag.
    Upos,
    Number,
    Case,
    Tense,
    Gender,
}

impl Property {
    pub const ALL: [Property; 5] = [
        Property::Upos,
        Property::Number,
        Property::Case,
        Property::Tense,
        Property::Gender,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Property::Upos => "upos",
            Property::Number => "Number",
            Property::Case => "Case",
            Property::Tense => "Tense",
            Property::Gender => "Gender",
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Property {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Property::ALL
            .iter()
            .copied()
            .find(|property| property.as_str() == s)
            .ok_or_else(|| ProbeError::InvalidProperty {
                property: s.to_owned(),
            })
    }
}

/// Property values.
pub trait PropertyValue {
    /// Look up the value of a property.
    ///
    /// Returns `None` when the word does not have the (morphological)
    /// property.
    fn value(&self, property: Property) -> Result<Option<&str>, ParseError>;
}

impl PropertyValue for Word {
    fn value(&self, property: Property) -> Result<Option<&str>, ParseError> {
        match property {
            Property::Upos => Ok(Some(self.upos())),
            feature => Ok(self.feats()?.get(feature.as_str()).map(String::as_str)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Property, PropertyValue};
    use crate::corpus::Word;
    use crate::probe::ProbeError;

    #[test]
    fn property_names() {
        for &property in &Property::ALL {
            assert_eq!(property.as_str().parse::<Property>().unwrap(), property);
        }

        assert_eq!(
            "Mood".parse::<Property>().unwrap_err(),
            ProbeError::InvalidProperty {
                property: "Mood".to_owned()
            }
        );
        assert!("number".parse::<Property>().is_err());
    }

    #[test]
    fn property_values() {
        let word = Word::parse("1\tsie\tsie\tPRON\tPPER\tCase=Nom|Number=Plur|Person=3").unwrap();
        assert_eq!(word.value(Property::Upos).unwrap(), Some("PRON"));
        assert_eq!(word.value(Property::Case).unwrap(), Some("Nom"));
        assert_eq!(word.value(Property::Number).unwrap(), Some("Plur"));
        assert_eq!(word.value(Property::Gender).unwrap(), None);
        assert_eq!(word.value(Property::Tense).unwrap(), None);
    }
}
