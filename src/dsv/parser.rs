//! Quote-aware line parsing.
//!
//! A single left-to-right scan with an "inside quotes" flag. Quote characters
//! toggle the flag and are dropped from the output; delimiters inside quotes
//! are copied literally. Because every quote is dropped, a doubled quote
//! (`""`) collapses to nothing instead of producing one literal quote. This
//! is not the inverse of [`escape_field`](super::escape::escape_field), which
//! doubles quotes on output. Existing data may depend on this behavior, so it
//! is kept as is.

use super::config::DsvConfig;

/// Split one line into fields using comma delimiter and double-quote quoting.
///
/// # Examples
///
/// ```
/// use bigcsv::dsv::parse_line;
///
/// assert_eq!(parse_line("a,\"b,c\",d"), vec!["a", "b,c", "d"]);
/// assert_eq!(parse_line(""), vec![""]);
/// ```
pub fn parse_line(line: &str) -> Vec<String> {
    parse_line_with(line, &DsvConfig::default())
}

/// Split one line into fields using the configured delimiter and quote.
///
/// The result always holds `unquoted delimiters + 1` fields; the last field
/// is emitted even when empty.
pub fn parse_line_with(line: &str, config: &DsvConfig) -> Vec<String> {
    let delimiter = config.delimiter_char();
    let quote = config.quote();

    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quote = false;

    for c in line.chars() {
        if c == quote {
            in_quote = !in_quote;
        } else if c == delimiter && !in_quote {
            fields.push(std::mem::take(&mut field));
        } else {
            field.push(c);
        }
    }
    fields.push(field);

    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple() {
        assert_eq!(parse_line("a,b,c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_empty_fields() {
        assert_eq!(parse_line(""), vec![""]);
        assert_eq!(parse_line(","), vec!["", ""]);
        assert_eq!(parse_line("a,,"), vec!["a", "", ""]);
    }

    #[test]
    fn test_quoted_delimiter() {
        assert_eq!(parse_line("\"a,b\",c"), vec!["a,b", "c"]);
        assert_eq!(parse_line("x\"a,b\"y,c"), vec!["xa,by", "c"]);
    }

    #[test]
    fn test_doubled_quote_collapses() {
        // `""` toggles twice and copies nothing.
        assert_eq!(parse_line("\"say \"\"hi\"\"\""), vec!["say hi"]);
        assert_eq!(parse_line("\"\""), vec![""]);
    }

    #[test]
    fn test_unterminated_quote_swallows_rest() {
        assert_eq!(parse_line("a,\"b,c"), vec!["a", "b,c"]);
    }

    #[test]
    fn test_carriage_return_kept_inside_field() {
        assert_eq!(parse_line("a,b\r"), vec!["a", "b\r"]);
    }

    #[test]
    fn test_unicode() {
        assert_eq!(parse_line("日本,\"語,x\",é"), vec!["日本", "語,x", "é"]);
    }

    #[test]
    fn test_tsv() {
        let config = DsvConfig::tsv();
        assert_eq!(parse_line_with("a\tb,c\t", &config), vec!["a", "b,c", ""]);
    }

    #[test]
    fn test_custom_quote() {
        let config = DsvConfig::csv().with_quote_char(b'\'');
        assert_eq!(
            parse_line_with("'a,b',\"c\"", &config),
            vec!["a,b", "\"c\""]
        );
    }
}
