//! Quote-aware field splitting for a single CSV line

/// Split one line into fields.
///
/// Outside quotes a comma ends the field and a double quote enters quoted
/// mode. Inside quotes a comma is literal, `""` is one literal quote and a
/// lone quote leaves quoted mode. An empty line has no fields.
///
/// The line must already be separated from its neighbours, so a raw newline
/// inside a quoted field cannot be represented (the dumps never contain one).
pub fn split_fields(line: &str) -> Vec<String> {
    if line.is_empty() {
        return Vec::new();
    }

    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if quoted {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    quoted = false;
                }
            } else {
                field.push(c);
            }
        } else {
            match c {
                ',' => fields.push(std::mem::take(&mut field)),
                '"' => quoted = true,
                _ => field.push(c),
            }
        }
    }

    fields.push(field);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_fields() {
        assert_eq!(split_fields("1,abc,,x"), vec!["1", "abc", "", "x"]);
    }

    #[test]
    fn test_quoted_comma_is_literal() {
        assert_eq!(split_fields(r#""x,y",z"#), vec!["x,y", "z"]);
    }

    #[test]
    fn test_doubled_quote_decodes_to_one() {
        assert_eq!(split_fields(r#""he said ""hi""",2"#), vec![r#"he said "hi""#, "2"]);
    }

    #[test]
    fn test_empty_quoted_field_and_trailing_comma() {
        assert_eq!(split_fields(r#""",a,"#), vec!["", "a", ""]);
    }

    #[test]
    fn test_empty_line_has_no_fields() {
        assert!(split_fields("").is_empty());
    }

    #[test]
    fn test_unterminated_quote_swallows_rest_of_line() {
        assert_eq!(split_fields(r#"a,"b,c"#), vec!["a", "b,c"]);
    }
}
