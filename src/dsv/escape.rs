//! Field escaping for serialized output.

use std::borrow::Cow;

use super::config::DsvConfig;

/// Render a field for comma-separated output.
///
/// Fields containing a quote, comma, CR or LF have their quotes doubled and
/// are wrapped in quotes. Anything else is returned borrowed.
///
/// # Examples
///
/// ```
/// use bigcsv::dsv::escape_field;
///
/// assert_eq!(escape_field("plain"), "plain");
/// assert_eq!(escape_field("a,b"), "\"a,b\"");
/// assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
/// ```
pub fn escape_field(field: &str) -> Cow<'_, str> {
    escape_field_with(field, &DsvConfig::default())
}

/// Render a field using the configured delimiter and quote character.
pub fn escape_field_with<'a>(field: &'a str, config: &DsvConfig) -> Cow<'a, str> {
    let delimiter = config.delimiter_char();
    let quote = config.quote();

    let needs_quoting = field
        .chars()
        .any(|c| c == quote || c == delimiter || c == '\r' || c == '\n');
    if !needs_quoting {
        return Cow::Borrowed(field);
    }

    let mut out = String::with_capacity(field.len() + 2);
    out.push(quote);
    for c in field.chars() {
        if c == quote {
            out.push(quote);
        }
        out.push(c);
    }
    out.push(quote);
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_is_borrowed() {
        assert!(matches!(
            escape_field("hello world"),
            Cow::Borrowed("hello world")
        ));
        assert!(matches!(escape_field(""), Cow::Borrowed("")));
    }

    #[test]
    fn test_quoting_triggers() {
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("line\nbreak"), "\"line\nbreak\"");
        assert_eq!(escape_field("cr\r"), "\"cr\r\"");
        assert_eq!(escape_field("\""), "\"\"\"\"");
    }

    #[test]
    fn test_tsv_does_not_quote_commas() {
        let config = DsvConfig::tsv();
        assert_eq!(escape_field_with("a,b", &config), "a,b");
        assert_eq!(escape_field_with("a\tb", &config), "\"a\tb\"");
    }
}
