// src/syntax/fstring.rs
// Replacement-field validation for f-string literals

use super::lexer::escape_len;

/// Deepest f-string nesting accepted (matches CPython's limit)
pub const MAX_FSTRING_LEVEL: usize = 150;

/// Check the body of an f-string (without prefix or quotes) and return the
/// source of every replacement field expression, in order.
///
/// Literal parts are checked for bad escapes and stray `}`. The expressions
/// themselves are left to the parser, which knows the enclosing scope.
pub fn check(body: &str, raw: bool, depth: usize) -> Result<Vec<String>, String> {
    if depth >= MAX_FSTRING_LEVEL {
        return Err("f-string: expressions nested too deeply".into());
    }

    let chars: Vec<char> = body.chars().collect();
    let mut fields = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '{' if chars.get(i + 1) == Some(&'{') => i += 2,
            '{' => i = replacement_field(&chars, i + 1, raw, depth, &mut fields)?,
            '}' if chars.get(i + 1) == Some(&'}') => i += 2,
            '}' => return Err("f-string: single '}' is not allowed".into()),
            '\\' if !raw => i += escape_len(&chars, i, false)?,
            _ => i += 1,
        }
    }
    Ok(fields)
}

/// Validate one `{...}` field starting just after the `{`. Returns the index
/// after its closing `}`.
fn replacement_field(
    chars: &[char],
    start: usize,
    raw: bool,
    depth: usize,
    fields: &mut Vec<String>,
) -> Result<usize, String> {
    if depth >= MAX_FSTRING_LEVEL {
        return Err("f-string: expressions nested too deeply".into());
    }

    let mut i = start;
    let mut nesting = 0usize;
    let expr_end = loop {
        let Some(&c) = chars.get(i) else {
            return Err("f-string: expecting '}'".into());
        };
        match c {
            '\'' | '"' => {
                i = skip_quoted(chars, i)?;
                continue;
            }
            '(' | '[' | '{' => nesting += 1,
            ')' | ']' => {
                if nesting == 0 {
                    return Err(format!("f-string: unmatched '{}'", c));
                }
                nesting -= 1;
            }
            '}' if nesting > 0 => nesting -= 1,
            '}' | ':' if nesting == 0 => break i,
            '!' if nesting == 0 && chars.get(i + 1) != Some(&'=') => break i,
            '=' if nesting == 0 && is_debug_marker(chars, i) => break i,
            '#' => return Err("f-string expression part cannot include '#'".into()),
            '\\' => return Err("f-string expression part cannot include a backslash".into()),
            _ => {}
        }
        i += 1;
    };

    let expr: String = chars[start..expr_end].iter().collect();
    if expr.trim().is_empty() {
        return Err(format!(
            "f-string: valid expression required before '{}'",
            chars[expr_end]
        ));
    }
    fields.push(expr);

    let mut i = expr_end;
    if chars[i] == '=' {
        i = skip_whitespace(chars, i + 1);
    }
    if chars.get(i) == Some(&'!') {
        match chars.get(i + 1) {
            Some('r' | 's' | 'a') => i = skip_whitespace(chars, i + 2),
            _ => {
                return Err("f-string: invalid conversion character: expected 's', 'r', or 'a'".into());
            }
        }
    }

    match chars.get(i) {
        Some('}') => Ok(i + 1),
        Some(':') => format_spec(chars, i + 1, raw, depth + 1, fields),
        _ => Err("f-string: expecting '}'".into()),
    }
}

fn skip_whitespace(chars: &[char], mut i: usize) -> usize {
    while chars.get(i).is_some_and(|c| matches!(c, ' ' | '\t' | '\n' | '\x0c')) {
        i += 1;
    }
    i
}

/// Scan a format spec, which may itself contain replacement fields.
fn format_spec(
    chars: &[char],
    start: usize,
    raw: bool,
    depth: usize,
    fields: &mut Vec<String>,
) -> Result<usize, String> {
    let mut i = start;
    loop {
        match chars.get(i) {
            None => return Err("f-string: expecting '}'".into()),
            Some('{') => i = replacement_field(chars, i + 1, raw, depth, fields)?,
            Some('}') => return Ok(i + 1),
            Some('\\') if !raw => i += escape_len(chars, i, false)?,
            Some(_) => i += 1,
        }
    }
}

/// `=` ends the expression for `{x=}` but not for `==`, `!=`, `<=` or `>=`
fn is_debug_marker(chars: &[char], i: usize) -> bool {
    let next_is_eq = chars.get(i + 1) == Some(&'=');
    let prev_is_cmp = i > 0 && matches!(chars[i - 1], '=' | '!' | '<' | '>');
    !next_is_eq && !prev_is_cmp
}

/// Skip a quoted string inside an expression. Returns the index after it.
fn skip_quoted(chars: &[char], start: usize) -> Result<usize, String> {
    let quote = chars[start];
    let triple = chars.get(start + 1) == Some(&quote) && chars.get(start + 2) == Some(&quote);
    let mut i = start + if triple { 3 } else { 1 };
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' {
            i += 2;
            continue;
        }
        if c == quote {
            if !triple {
                return Ok(i + 1);
            }
            if chars.get(i + 1) == Some(&quote) && chars.get(i + 2) == Some(&quote) {
                return Ok(i + 3);
            }
        }
        i += 1;
    }
    Err("f-string: unterminated string".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(body: &str) -> Vec<String> {
        check(body, false, 0).unwrap()
    }

    #[test]
    fn test_plain_fields() {
        assert_eq!(fields("hello {name}"), vec!["name"]);
        assert_eq!(fields("{a + b:>10}"), vec!["a + b"]);
        assert_eq!(fields("{x!r}"), vec!["x"]);
        assert_eq!(fields("{x=}"), vec!["x"]);
        assert_eq!(fields("{x == y}"), vec!["x == y"]);
        assert!(fields("{{literal}}").is_empty());
    }

    #[test]
    fn test_debug_marker_with_whitespace() {
        assert_eq!(fields("{x = }"), vec!["x "]);
        assert_eq!(fields("{x= }"), vec!["x"]);
        assert_eq!(fields("{x = !r}"), vec!["x "]);
        assert_eq!(fields("{x = :>10}"), vec!["x "]);
        assert_eq!(fields("{x!r }"), vec!["x"]);
        assert!(check("{x = y}", false, 0).is_err());
    }

    #[test]
    fn test_nested_format_spec() {
        assert_eq!(
            fields("{value:{width}.{precision}}"),
            vec!["value", "width", "precision"]
        );
    }

    #[test]
    fn test_quoted_strings_inside_field() {
        assert_eq!(fields("{d['key']}"), vec!["d['key']"]);
        assert_eq!(fields("{'}'}"), vec!["'}'"]);
    }

    #[test]
    fn test_bad_fields() {
        assert!(check("{}", false, 0).is_err());
        assert!(check("{x", false, 0).is_err());
        assert!(check("x}", false, 0).is_err());
        assert!(check("{x!z}", false, 0).is_err());
        assert!(check("{x # comment}", false, 0).is_err());
        assert!(check("{x)}", false, 0).is_err());
    }

    #[test]
    fn test_named_escape_is_not_a_field() {
        assert!(fields("\\N{BULLET} item").is_empty());
    }

    #[test]
    fn test_depth_limit() {
        assert!(check("{x}", false, MAX_FSTRING_LEVEL).is_err());
    }
}
