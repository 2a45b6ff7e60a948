//! LDAP style filters as used by `filter:=` directives.
//!
//! Comparisons are typed by the attribute being tested: a `Version`
//! attribute compares the operand as a version, a `Long` as an integer, and
//! so on. List attributes match when any element does.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::attrs::{AttrValue, Attributes};
use crate::version::coerce_version;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("empty filter")]
    Empty,
    #[error("invalid filter `{filter}` at offset {position}: {reason}")]
    Syntax {
        filter: String,
        position: usize,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Equal(String, String),
    Approx(String, String),
    GreaterEq(String, String),
    LessEq(String, String),
    Present(String),
    /// `attr=ini*any*fin`; the first and last parts may be empty.
    Substring(String, Vec<String>),
}

impl Filter {
    pub fn parse(raw: &str) -> Result<Self, FilterError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(FilterError::Empty);
        }
        let mut parser = Parser {
            source: trimmed,
            bytes: trimmed.as_bytes(),
            pos: 0,
        };
        let filter = parser.filter()?;
        parser.skip_ws();
        if parser.pos != parser.bytes.len() {
            return Err(parser.error("trailing characters after filter"));
        }
        Ok(filter)
    }

    pub fn matches(&self, attributes: &Attributes) -> bool {
        match self {
            Self::And(items) => items.iter().all(|item| item.matches(attributes)),
            Self::Or(items) => items.iter().any(|item| item.matches(attributes)),
            Self::Not(inner) => !inner.matches(attributes),
            Self::Present(attr) => attributes.get_ignore_case(attr).is_some(),
            Self::Equal(attr, operand) => lookup(attributes, attr, |value| {
                compare(value, operand) == Some(Ordering::Equal)
            }),
            Self::GreaterEq(attr, operand) => lookup(attributes, attr, |value| {
                matches!(
                    compare(value, operand),
                    Some(Ordering::Greater | Ordering::Equal)
                )
            }),
            Self::LessEq(attr, operand) => lookup(attributes, attr, |value| {
                matches!(
                    compare(value, operand),
                    Some(Ordering::Less | Ordering::Equal)
                )
            }),
            Self::Approx(attr, operand) => lookup(attributes, attr, |value| match value {
                AttrValue::String(text) => normalize_approx(text) == normalize_approx(operand),
                other => compare(other, operand) == Some(Ordering::Equal),
            }),
            Self::Substring(attr, parts) => lookup(attributes, attr, |value| match value {
                AttrValue::String(text) => substring_match(text, parts),
                _ => false,
            }),
        }
    }
}

impl FromStr for Filter {
    type Err = FilterError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And(items) | Self::Or(items) => {
                f.write_str(if matches!(self, Self::And(_)) { "(&" } else { "(|" })?;
                for item in items {
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
            Self::Not(inner) => write!(f, "(!{inner})"),
            Self::Equal(attr, value) => write!(f, "({attr}={})", escape_value(value)),
            Self::Approx(attr, value) => write!(f, "({attr}~={})", escape_value(value)),
            Self::GreaterEq(attr, value) => write!(f, "({attr}>={})", escape_value(value)),
            Self::LessEq(attr, value) => write!(f, "({attr}<={})", escape_value(value)),
            Self::Present(attr) => write!(f, "({attr}=*)"),
            Self::Substring(attr, parts) => {
                let rendered: Vec<String> = parts.iter().map(|part| escape_value(part)).collect();
                write!(f, "({attr}={})", rendered.join("*"))
            }
        }
    }
}

/// Escape the characters that carry meaning inside a filter value.
pub fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '(' | ')' | '*') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn lookup(attributes: &Attributes, attr: &str, test: impl Fn(&AttrValue) -> bool) -> bool {
    match attributes.get_ignore_case(attr) {
        Some(AttrValue::List(items)) => items.iter().any(&test),
        Some(value) => test(value),
        None => false,
    }
}

/// Order the attribute value against the textual operand, interpreting the
/// operand with the attribute's type. `None` when the operand does not parse.
fn compare(value: &AttrValue, operand: &str) -> Option<Ordering> {
    match value {
        AttrValue::String(text) => Some(text.as_str().cmp(operand)),
        AttrValue::Long(long) => operand.trim().parse::<i64>().ok().map(|rhs| long.cmp(&rhs)),
        AttrValue::Double(double) => operand
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(|rhs| double.partial_cmp(&rhs)),
        AttrValue::Version(version) => coerce_version(operand).ok().map(|rhs| version.cmp(&rhs)),
        AttrValue::List(items) => items.iter().find_map(|item| {
            compare(item, operand).filter(|ordering| *ordering == Ordering::Equal)
        }),
    }
}

fn normalize_approx(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn substring_match(text: &str, parts: &[String]) -> bool {
    let Some((first, rest)) = parts.split_first() else {
        return false;
    };
    let Some(mut remaining) = text.strip_prefix(first.as_str()) else {
        return false;
    };
    let Some((last, middle)) = rest.split_last() else {
        return remaining.is_empty();
    };
    for part in middle {
        match remaining.find(part.as_str()) {
            Some(idx) => remaining = &remaining[idx + part.len()..],
            None => return false,
        }
    }
    remaining.ends_with(last.as_str())
}

struct Parser<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, reason: &'static str) -> FilterError {
        FilterError::Syntax {
            filter: self.source.to_string(),
            position: self.pos,
            reason,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, byte: u8, reason: &'static str) -> Result<(), FilterError> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(reason))
        }
    }

    fn filter(&mut self) -> Result<Filter, FilterError> {
        self.skip_ws();
        self.expect(b'(', "expected `(`")?;
        self.skip_ws();
        let filter = match self.peek() {
            Some(b'&') => {
                self.pos += 1;
                Filter::And(self.filter_list()?)
            }
            Some(b'|') => {
                self.pos += 1;
                Filter::Or(self.filter_list()?)
            }
            Some(b'!') => {
                self.pos += 1;
                Filter::Not(Box::new(self.filter()?))
            }
            Some(_) => self.item()?,
            None => return Err(self.error("unexpected end of filter")),
        };
        self.skip_ws();
        self.expect(b')', "expected `)`")?;
        Ok(filter)
    }

    fn filter_list(&mut self) -> Result<Vec<Filter>, FilterError> {
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() != Some(b'(') {
                break;
            }
            items.push(self.filter()?);
        }
        if items.is_empty() {
            return Err(self.error("empty filter list"));
        }
        Ok(items)
    }

    fn item(&mut self) -> Result<Filter, FilterError> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if matches!(b, b'=' | b'~' | b'<' | b'>' | b'(' | b')') {
                break;
            }
            self.pos += 1;
        }
        let attr = self.source[start..self.pos].trim().to_string();
        if attr.is_empty() {
            return Err(self.error("missing attribute name"));
        }
        let op = match self.peek() {
            Some(b'=') => {
                self.pos += 1;
                b'='
            }
            Some(op @ (b'~' | b'<' | b'>')) => {
                self.pos += 1;
                self.expect(b'=', "expected `=` after comparison operator")?;
                op
            }
            _ => return Err(self.error("expected comparison operator")),
        };
        let parts = self.value()?;
        match op {
            b'=' => Ok(match parts.as_slice() {
                [single] => Filter::Equal(attr, single.clone()),
                [first, last] if first.is_empty() && last.is_empty() => Filter::Present(attr),
                _ => Filter::Substring(attr, parts),
            }),
            _ => {
                let [value] = parts.as_slice() else {
                    return Err(self.error("wildcard only allowed with `=`"));
                };
                let value = value.clone();
                Ok(match op {
                    b'~' => Filter::Approx(attr, value),
                    b'<' => Filter::LessEq(attr, value),
                    _ => Filter::GreaterEq(attr, value),
                })
            }
        }
    }

    /// Read a value up to the closing `)`, splitting on unescaped `*`.
    fn value(&mut self) -> Result<Vec<String>, FilterError> {
        let mut parts = Vec::new();
        let mut current = Vec::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated value")),
                Some(b')') => break,
                Some(b'(') => return Err(self.error("unescaped `(` in value")),
                Some(b'*') => {
                    self.pos += 1;
                    parts.push(self.take_text(&mut current)?);
                }
                Some(b'\\') => {
                    self.pos += 1;
                    let Some(escaped) = self.peek() else {
                        return Err(self.error("dangling escape"));
                    };
                    current.push(escaped);
                    self.pos += 1;
                }
                Some(b) => {
                    current.push(b);
                    self.pos += 1;
                }
            }
        }
        parts.push(self.take_text(&mut current)?);
        Ok(parts)
    }

    fn take_text(&self, buf: &mut Vec<u8>) -> Result<String, FilterError> {
        String::from_utf8(std::mem::take(buf)).map_err(|_| self.error("invalid utf-8 in value"))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use semver::Version;

    use super::*;

    fn attrs(entries: &[(&str, AttrValue)]) -> Attributes {
        entries
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn parses_nested_expressions() {
        let filter = Filter::parse("(&(osgi.wiring.package=com.x)(!(version>=2.0)))").unwrap();
        assert_eq!(
            filter,
            Filter::And(vec![
                Filter::Equal("osgi.wiring.package".into(), "com.x".into()),
                Filter::Not(Box::new(Filter::GreaterEq("version".into(), "2.0".into()))),
            ])
        );
    }

    #[test]
    fn version_attributes_compare_as_versions() {
        let capability = attrs(&[
            ("osgi.wiring.package", "com.x".into()),
            ("version", Version::new(1, 10, 0).into()),
        ]);
        let filter = Filter::parse("(&(osgi.wiring.package=com.x)(version>=1.9)(!(version>=2)))")
            .unwrap();
        assert!(filter.matches(&capability));
        assert!(!Filter::parse("(version>=1.11)").unwrap().matches(&capability));
        assert!(Filter::parse("(version=1.10.0)").unwrap().matches(&capability));
    }

    #[test]
    fn list_attributes_match_any_element() {
        let capability = attrs(&[(
            "osgi.ee",
            AttrValue::List(vec!["JavaSE".into(), "J2SE-1.5".into()]),
        )]);
        assert!(Filter::parse("(osgi.ee=J2SE-1.5)").unwrap().matches(&capability));
        assert!(!Filter::parse("(osgi.ee=J2SE-1.4)").unwrap().matches(&capability));
    }

    #[test]
    fn presence_substring_and_approx() {
        let capability = attrs(&[("osgi.identity", "org.example.api".into())]);
        assert!(Filter::parse("(osgi.identity=*)").unwrap().matches(&capability));
        assert!(Filter::parse("(osgi.identity=org.*.api)").unwrap().matches(&capability));
        assert!(!Filter::parse("(osgi.identity=com.*)").unwrap().matches(&capability));
        assert!(Filter::parse("(osgi.identity~=ORG.Example.API)").unwrap().matches(&capability));
        assert!(!Filter::parse("(missing=*)").unwrap().matches(&capability));
    }

    #[test]
    fn attribute_names_match_case_insensitively() {
        let capability = attrs(&[("Bundle-Version", Version::new(1, 0, 0).into())]);
        assert!(Filter::parse("(bundle-version>=1.0)").unwrap().matches(&capability));
    }

    #[test]
    fn escaped_characters_survive() {
        let filter = Filter::parse(r"(name=a\(b\)\*c)").unwrap();
        assert_eq!(filter, Filter::Equal("name".into(), "a(b)*c".into()));
        assert_eq!(filter.to_string(), r"(name=a\(b\)\*c)");
    }

    #[test]
    fn malformed_filters_are_rejected() {
        assert_eq!(Filter::parse("  "), Err(FilterError::Empty));
        for raw in ["name=x", "(name=x", "(&)", "(=x)", "(a>=b*)", "(a=x))", "(a=x\\"] {
            assert!(Filter::parse(raw).is_err(), "{raw} should not parse");
        }
    }

    fn leaf() -> impl Strategy<Value = Filter> {
        let name = "[a-z][a-z.\\-]{0,8}";
        let value = "[a-zA-Z0-9.()*\\\\]{1,8}";
        prop_oneof![
            (name, value).prop_map(|(a, v)| Filter::Equal(a, v)),
            (name, value).prop_map(|(a, v)| Filter::GreaterEq(a, v)),
            (name, value).prop_map(|(a, v)| Filter::LessEq(a, v)),
            name.prop_map(Filter::Present),
        ]
    }

    fn tree() -> impl Strategy<Value = Filter> {
        leaf().prop_recursive(3, 16, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 1..4).prop_map(Filter::And),
                prop::collection::vec(inner.clone(), 1..4).prop_map(Filter::Or),
                inner.prop_map(|f| Filter::Not(Box::new(f))),
            ]
        })
    }

    proptest! {
        #[test]
        fn rendered_filters_parse_back(filter in tree()) {
            let rendered = filter.to_string();
            prop_assert_eq!(Filter::parse(&rendered), Ok(filter));
        }
    }
}
