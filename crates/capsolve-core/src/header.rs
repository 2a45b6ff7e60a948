//! Manifest style header clauses:
//! `name[;name...][;attr[:Type]=value][;directive:=value], ...`.

use thiserror::Error;

use crate::attrs::{AttrError, AttrValue, Attributes, Directives};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("unterminated quote in header `{0}`")]
    UnterminatedQuote(String),
    #[error("clause `{0}` has parameters but no name")]
    MissingName(String),
    #[error("empty parameter key in clause `{0}`")]
    EmptyKey(String),
    #[error("attribute `{name}`: {source}")]
    Attribute {
        name: String,
        #[source]
        source: AttrError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Clause {
    pub name: String,
    pub attributes: Attributes,
    pub directives: Directives,
}

/// Parse a header into its clauses. A clause with several names
/// (`a;b;version=1`) yields one clause per name sharing the parameters.
pub fn parse_header(header: &str) -> Result<Vec<Clause>, HeaderError> {
    let mut clauses = Vec::new();
    for raw_clause in split_unquoted(header, ',')? {
        let raw_clause = raw_clause.trim();
        if raw_clause.is_empty() {
            continue;
        }
        let mut names = Vec::new();
        let mut attributes = Attributes::new();
        let mut directives = Directives::new();
        for part in split_unquoted(raw_clause, ';')? {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let Some(eq) = find_unquoted(part, '=') else {
                names.push(unquote(part).to_string());
                continue;
            };
            let (key, value) = (&part[..eq], unquote(part[eq + 1..].trim()));
            if let Some(directive) = key.strip_suffix(':') {
                let directive = directive.trim();
                if directive.is_empty() {
                    return Err(HeaderError::EmptyKey(raw_clause.to_string()));
                }
                directives.insert(directive, value);
                continue;
            }
            let (name, value) = match key.split_once(':') {
                Some((name, ty)) => {
                    let name = name.trim();
                    let typed =
                        AttrValue::parse_typed(ty, value).map_err(|source| HeaderError::Attribute {
                            name: name.to_string(),
                            source,
                        })?;
                    (name, typed)
                }
                None => (key.trim(), AttrValue::String(value.to_string())),
            };
            if name.is_empty() {
                return Err(HeaderError::EmptyKey(raw_clause.to_string()));
            }
            attributes.insert(name, value);
        }
        if names.is_empty() {
            return Err(HeaderError::MissingName(raw_clause.to_string()));
        }
        for name in names {
            clauses.push(Clause {
                name,
                attributes: attributes.clone(),
                directives: directives.clone(),
            });
        }
    }
    Ok(clauses)
}

fn split_unquoted(text: &str, separator: char) -> Result<Vec<&str>, HeaderError> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    for (idx, ch) in text.char_indices() {
        match ch {
            '"' => quoted = !quoted,
            c if c == separator && !quoted => {
                parts.push(&text[start..idx]);
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }
    if quoted {
        return Err(HeaderError::UnterminatedQuote(text.to_string()));
    }
    parts.push(&text[start..]);
    Ok(parts)
}

fn find_unquoted(text: &str, target: char) -> Option<usize> {
    let mut quoted = false;
    for (idx, ch) in text.char_indices() {
        if ch == '"' {
            quoted = !quoted;
        } else if ch == target && !quoted {
            return Some(idx);
        }
    }
    None
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use semver::Version;

    use super::*;

    #[test]
    fn parses_attributes_and_directives() {
        let clauses =
            parse_header(r#"com.x;version=1.2, osgi.ee;osgi.ee="JavaSE";version:Version="1.8";uses:="a,b""#)
                .unwrap();
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].name, "com.x");
        assert_eq!(clauses[0].attributes.get("version"), Some(&AttrValue::from("1.2")));

        let ee = &clauses[1];
        assert_eq!(ee.attributes.get("osgi.ee"), Some(&AttrValue::from("JavaSE")));
        assert_eq!(
            ee.attributes.get("version"),
            Some(&AttrValue::Version(Version::new(1, 8, 0)))
        );
        assert_eq!(ee.directives.get("uses"), Some("a,b"));
    }

    #[test]
    fn shared_parameters_fan_out_to_every_name() {
        let clauses = parse_header("a;b;version=2").unwrap();
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[1].name, "b");
        assert_eq!(clauses[1].attributes.get("version"), Some(&AttrValue::from("2")));
    }

    #[test]
    fn effective_skip_lists_stay_whole() {
        let clauses = parse_header(r#"active;skip:="osgi.service,osgi.extender", meta"#).unwrap();
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].directives.get("skip"), Some("osgi.service,osgi.extender"));
        assert!(clauses[1].directives.is_empty());
    }

    #[test]
    fn empty_header_has_no_clauses() {
        assert!(parse_header("").unwrap().is_empty());
        assert!(parse_header(" , ").unwrap().is_empty());
    }

    #[test]
    fn malformed_headers_are_errors() {
        assert!(matches!(
            parse_header(r#"a;x="open"#),
            Err(HeaderError::UnterminatedQuote(_))
        ));
        assert!(matches!(parse_header("version=1"), Err(HeaderError::MissingName(_))));
        assert!(matches!(
            parse_header("a;version:Long=one"),
            Err(HeaderError::Attribute { .. })
        ));
    }
}
