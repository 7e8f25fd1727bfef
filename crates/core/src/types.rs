use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One row of the ingested dataset describing a web domain's metrics.
///
/// Every field is always populated: text columns default to an empty string
/// and the numeric `dr`/`da` columns default to `0`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainRecord {
    pub domain: String,
    pub niche1: String,
    pub niche2: String,
    pub traffic: String,
    pub dr: i64,
    pub da: i64,
    pub language: String,
    pub price: String,
    pub spam_score: String,
}

impl DomainRecord {
    /// Returns the value stored under `field`.
    pub fn value(&self, field: Field) -> FieldValue<'_> {
        match field {
            Field::Domain => FieldValue::Text(&self.domain),
            Field::Niche1 => FieldValue::Text(&self.niche1),
            Field::Niche2 => FieldValue::Text(&self.niche2),
            Field::Traffic => FieldValue::Text(&self.traffic),
            Field::Dr => FieldValue::Number(self.dr),
            Field::Da => FieldValue::Number(self.da),
            Field::Language => FieldValue::Text(&self.language),
            Field::Price => FieldValue::Text(&self.price),
            Field::SpamScore => FieldValue::Text(&self.spam_score),
        }
    }

    /// Iterates over all values in canonical column order.
    pub fn values(&self) -> impl Iterator<Item = FieldValue<'_>> + '_ {
        Field::ALL.iter().map(move |field| self.value(*field))
    }
}

/// Column of a [`DomainRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Domain,
    Niche1,
    Niche2,
    Traffic,
    Dr,
    Da,
    Language,
    Price,
    SpamScore,
}

impl Field {
    /// All fields in canonical column order.
    pub const ALL: [Field; 9] = [
        Field::Domain,
        Field::Niche1,
        Field::Niche2,
        Field::Traffic,
        Field::Dr,
        Field::Da,
        Field::Language,
        Field::Price,
        Field::SpamScore,
    ];

    /// Returns the record key used in query strings and JSON payloads.
    pub fn key(self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::Niche1 => "niche1",
            Self::Niche2 => "niche2",
            Self::Traffic => "traffic",
            Self::Dr => "dr",
            Self::Da => "da",
            Self::Language => "language",
            Self::Price => "price",
            Self::SpamScore => "spamScore",
        }
    }

    /// Returns the CSV header the field is read from.
    pub fn csv_header(self) -> &'static str {
        match self {
            Self::Domain => "Domain",
            Self::Niche1 => "Niche 1",
            Self::Niche2 => "Niche 2",
            Self::Traffic => "Traffic",
            Self::Dr => "DR",
            Self::Da => "DA",
            Self::Language => "Language",
            Self::Price => "Price",
            Self::SpamScore => "Spam Score",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Self::Dr | Self::Da => FieldKind::Numeric,
            _ => FieldKind::Text,
        }
    }

    /// Human readable column label, e.g. `spamScore` becomes "Spam Score".
    pub fn label(self) -> String {
        column_label(self.key())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Field {
    type Err = ParseFieldError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|field| field.key() == value)
            .ok_or_else(|| ParseFieldError(value.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown field: {0}")]
pub struct ParseFieldError(pub String);

/// Comparison semantics of a column during sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Numeric,
}

/// Borrowed view of a single record value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Number(i64),
}

impl FieldValue<'_> {
    pub fn as_number(self) -> Option<i64> {
        match self {
            Self::Number(value) => Some(value),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(value) => f.write_str(value),
            Self::Number(value) => write!(f, "{value}"),
        }
    }
}

/// Derives a display label from a camel-case key.
///
/// The first letter is capitalized and a space is inserted before every
/// interior ASCII uppercase letter.
pub fn column_label(key: &str) -> String {
    let mut chars = key.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };

    let mut label: String = first.to_uppercase().collect();
    for ch in chars {
        if ch.is_ascii_uppercase() {
            label.push(' ');
        }
        label.push(ch);
    }
    label.trim().to_string()
}

/// Parses the leading integer of `raw`, returning `0` when there is none.
///
/// Leading whitespace and a single sign are accepted; parsing stops at the
/// first non-digit, so `"12abc"` and `"12.9"` both yield `12`.
pub fn parse_leading_int(raw: &str) -> i64 {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = rest
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(rest.len());

    match rest[..end].parse::<i64>() {
        Ok(value) if negative => -value,
        Ok(value) => value,
        Err(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_split_camel_case() {
        assert_eq!(column_label("spamScore"), "Spam Score");
        assert_eq!(column_label("domain"), "Domain");
        assert_eq!(column_label("niche1"), "Niche1");
        assert_eq!(column_label("dr"), "Dr");
        assert_eq!(column_label(""), "");
        assert_eq!(Field::SpamScore.label(), "Spam Score");
    }

    #[test]
    fn parses_leading_integers() {
        assert_eq!(parse_leading_int("42"), 42);
        assert_eq!(parse_leading_int("  7 "), 7);
        assert_eq!(parse_leading_int("12abc"), 12);
        assert_eq!(parse_leading_int("3.9"), 3);
        assert_eq!(parse_leading_int("-4"), -4);
        assert_eq!(parse_leading_int("+5"), 5);
    }

    #[test]
    fn unparsable_integers_default_to_zero() {
        assert_eq!(parse_leading_int(""), 0);
        assert_eq!(parse_leading_int("n/a"), 0);
        assert_eq!(parse_leading_int("-"), 0);
        assert_eq!(parse_leading_int("99999999999999999999999"), 0);
    }

    #[test]
    fn field_keys_round_trip_through_from_str() {
        for field in Field::ALL {
            assert_eq!(field.key().parse::<Field>(), Ok(field));
        }
        assert_eq!(
            "SpamScore".parse::<Field>(),
            Err(ParseFieldError("SpamScore".to_string()))
        );
    }

    #[test]
    fn only_rating_columns_are_numeric() {
        let numeric: Vec<Field> = Field::ALL
            .into_iter()
            .filter(|field| field.kind() == FieldKind::Numeric)
            .collect();
        assert_eq!(numeric, vec![Field::Dr, Field::Da]);
    }

    #[test]
    fn values_render_as_text() {
        let record = DomainRecord {
            domain: "bigshop.com".into(),
            dr: 57,
            ..DomainRecord::default()
        };
        assert_eq!(record.value(Field::Domain).to_string(), "bigshop.com");
        assert_eq!(record.value(Field::Dr).to_string(), "57");
        assert_eq!(record.value(Field::Dr).as_number(), Some(57));
        assert_eq!(record.values().count(), Field::ALL.len());
    }

    #[test]
    fn serializes_with_record_keys() {
        let record = DomainRecord {
            spam_score: "2%".into(),
            ..DomainRecord::default()
        };
        let value = serde_json::to_value(&record).expect("serialize record");
        assert_eq!(value["spamScore"], "2%");
        assert_eq!(value["niche1"], "");
        assert_eq!(value["dr"], 0);
    }
}
