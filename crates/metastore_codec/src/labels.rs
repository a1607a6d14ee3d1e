//! Label sets identifying streams.
//!
//! A label set is a collection of `name="value"` pairs with unique names,
//! kept sorted by name so that equal sets have equal text forms:
//!
//! ```text
//! {__end__="3600000000000", __path__="objects/ab/cdef", __start__="0"}
//! ```

use crate::error::{CodecError, CodecResult};
use std::fmt;
use std::str::FromStr;

/// A single label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label {
    /// Label name.
    pub name: String,
    /// Label value.
    pub value: String,
}

impl Label {
    /// Creates a label.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A sorted set of labels with unique, valid names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Labels(Vec<Label>);

impl Labels {
    /// Builds a label set, sorting by name.
    ///
    /// # Errors
    ///
    /// Returns an error if a name is not a valid label name or appears
    /// more than once.
    pub fn new(labels: impl IntoIterator<Item = Label>) -> CodecResult<Self> {
        let mut labels: Vec<Label> = labels.into_iter().collect();
        labels.sort_by(|a, b| a.name.cmp(&b.name));

        for label in &labels {
            if !is_valid_name(&label.name) {
                return Err(CodecError::invalid_labels(format!(
                    "invalid label name {:?}",
                    label.name
                )));
            }
        }
        if let Some(dup) = labels.windows(2).find(|w| w[0].name == w[1].name) {
            return Err(CodecError::invalid_labels(format!(
                "duplicate label name {:?}",
                dup[0].name
            )));
        }

        Ok(Self(labels))
    }

    /// Returns the value of the label called `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .binary_search_by(|l| l.name.as_str().cmp(name))
            .ok()
            .map(|i| self.0[i].value.as_str())
    }

    /// Returns the number of labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no labels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates labels in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        self.0.iter()
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl fmt::Display for Labels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, label) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}=\"", label.name)?;
            for c in label.value.chars() {
                match c {
                    '\\' => f.write_str("\\\\")?,
                    '"' => f.write_str("\\\"")?,
                    '\n' => f.write_str("\\n")?,
                    c => write!(f, "{c}")?,
                }
            }
            f.write_str("\"")?;
        }
        f.write_str("}")
    }
}

impl FromStr for Labels {
    type Err = CodecError;

    fn from_str(s: &str) -> CodecResult<Self> {
        let inner = s
            .trim()
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .ok_or_else(|| CodecError::invalid_labels(format!("expected {{...}}, got {s:?}")))?;

        let mut labels = Vec::new();
        let mut chars = inner.chars().peekable();

        loop {
            while chars.peek().is_some_and(|c| c.is_whitespace()) {
                chars.next();
            }
            if chars.peek().is_none() {
                break;
            }

            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c == '=' || c.is_whitespace() {
                    break;
                }
                name.push(c);
                chars.next();
            }
            while chars.peek().is_some_and(|c| c.is_whitespace()) {
                chars.next();
            }
            if chars.next() != Some('=') || chars.next() != Some('"') {
                return Err(CodecError::invalid_labels(format!(
                    "expected name=\"value\" for label {name:?}"
                )));
            }

            let mut value = String::new();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some('n') => value.push('\n'),
                        Some(c @ ('\\' | '"')) => value.push(c),
                        other => {
                            return Err(CodecError::invalid_labels(format!(
                                "invalid escape {other:?} in label {name:?}"
                            )))
                        }
                    },
                    Some(c) => value.push(c),
                    None => {
                        return Err(CodecError::invalid_labels(format!(
                            "unterminated value for label {name:?}"
                        )))
                    }
                }
            }
            labels.push(Label { name, value });

            while chars.peek().is_some_and(|c| c.is_whitespace()) {
                chars.next();
            }
            match chars.next() {
                Some(',') | None => {}
                Some(c) => {
                    return Err(CodecError::invalid_labels(format!(
                        "unexpected {c:?} after label value"
                    )))
                }
            }
        }

        Labels::new(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn labels_are_sorted_by_name() {
        let labels = Labels::new(vec![Label::new("b", "2"), Label::new("a", "1")]).unwrap();
        assert_eq!(labels.to_string(), r#"{a="1", b="2"}"#);
        assert_eq!(labels.get("a"), Some("1"));
        assert_eq!(labels.get("c"), None);
    }

    #[test]
    fn duplicate_names_rejected() {
        let result = Labels::new(vec![Label::new("a", "1"), Label::new("a", "2")]);
        assert!(matches!(result, Err(CodecError::InvalidLabels { .. })));
    }

    #[test]
    fn invalid_names_rejected() {
        for name in ["", "1abc", "a-b", "a b"] {
            assert!(Labels::new(vec![Label::new(name, "v")]).is_err(), "{name:?}");
        }
        assert!(Labels::new(vec![Label::new("__path__", "v")]).is_ok());
    }

    #[test]
    fn parse_with_escapes() {
        let labels: Labels = r#"{__path__="a \"quoted\" \\ path", x="line\nbreak"}"#
            .parse()
            .unwrap();
        assert_eq!(labels.get("__path__"), Some(r#"a "quoted" \ path"#));
        assert_eq!(labels.get("x"), Some("line\nbreak"));
    }

    #[test]
    fn parse_empty_set() {
        let labels: Labels = "{}".parse().unwrap();
        assert!(labels.is_empty());
    }

    #[test]
    fn parse_rejects_garbage() {
        for s in ["", "a=\"b\"", "{a=b}", "{a=\"b}", "{a=\"b\" c=\"d\"}", r#"{a="\q"}"#] {
            assert!(s.parse::<Labels>().is_err(), "{s:?}");
        }
    }

    proptest! {
        #[test]
        fn display_then_parse_preserves_labels(
            pairs in prop::collection::btree_map("[a-zA-Z_][a-zA-Z0-9_]{0,12}", ".{0,24}", 0..6)
        ) {
            let labels = Labels::new(pairs.into_iter().map(|(n, v)| Label::new(n, v))).unwrap();
            let parsed: Labels = labels.to_string().parse().unwrap();
            prop_assert_eq!(parsed, labels);
        }
    }
}
