//! Query expression parser.
//!
//! Queries are parenthesized symbolic expressions:
//! `(and (todo "TODO") (tag "work"))`. An atom on its own is a
//! free-text term. Parsing is strict; malformed input never yields a
//! partial tree.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty query")]
    Empty,

    #[error("unbalanced parenthesis at position {0}")]
    Unbalanced(usize),

    #[error("unterminated string starting at position {0}")]
    UnterminatedString(usize),

    #[error("unexpected trailing input at position {0}")]
    TrailingInput(usize),

    #[error("empty list at position {0}")]
    EmptyList(usize),

    #[error("expected an operator name at position {0}")]
    ExpectedOperator(usize),
}

/// One node of a parsed query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryNode {
    /// `(name arg ...)` with the name lowercased and alias-normalized.
    Op { name: String, args: Vec<QueryNode> },
    /// A bare or quoted atom.
    Leaf(String),
}

enum Token {
    LParen(usize),
    RParen(usize),
    Atom { value: String, offset: usize },
}

impl Token {
    fn offset(&self) -> usize {
        match self {
            Token::LParen(o) | Token::RParen(o) | Token::Atom { offset: o, .. } => *o,
        }
    }
}

/// Parse one whole expression. Positions in errors are character
/// offsets into the input.
pub fn parse(input: &str) -> Result<QueryNode, ParseError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut pos = 0;
    let node = parse_expr(&tokens, &mut pos)?;
    if pos != tokens.len() {
        return Err(ParseError::TrailingInput(tokens[pos].offset()));
    }
    Ok(node)
}

/// Fold operator aliases onto their canonical names. Unrecognized
/// names pass through untouched.
pub(crate) fn canonical(name: &str) -> String {
    let lower = name.to_lowercase();
    match lower.as_str() {
        "status" | "state" => "todo",
        "prio" | "p" => "priority",
        "#" => "tag",
        "src" => "file",
        "dl" => "deadline",
        "sc" => "scheduled",
        "prop" => "property",
        "up" => "parent",
        "h" => "heading",
        "g" | "group" => "group-by",
        _ => return lower,
    }
    .to_string()
}

fn parse_expr(tokens: &[Token], pos: &mut usize) -> Result<QueryNode, ParseError> {
    match &tokens[*pos] {
        Token::Atom { value, .. } => {
            *pos += 1;
            Ok(QueryNode::Leaf(value.clone()))
        }
        Token::RParen(offset) => Err(ParseError::Unbalanced(*offset)),
        Token::LParen(open) => {
            *pos += 1;
            let name = match tokens.get(*pos) {
                Some(Token::RParen(_)) => return Err(ParseError::EmptyList(*open)),
                Some(Token::Atom { value, .. }) => canonical(value),
                Some(token) => return Err(ParseError::ExpectedOperator(token.offset())),
                None => return Err(ParseError::Unbalanced(*open)),
            };
            *pos += 1;

            let mut args = Vec::new();
            loop {
                match tokens.get(*pos) {
                    None => return Err(ParseError::Unbalanced(*open)),
                    Some(Token::RParen(_)) => {
                        *pos += 1;
                        break;
                    }
                    Some(_) => args.push(parse_expr(tokens, pos)?),
                }
            }
            Ok(QueryNode::Op { name, args })
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen(i));
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen(i));
                i += 1;
            }
            '"' => {
                let start = i;
                i += 1;
                let mut value = String::new();
                let mut closed = false;
                while i < chars.len() {
                    match chars[i] {
                        '\\' if i + 1 < chars.len() => {
                            value.push(chars[i + 1]);
                            i += 2;
                        }
                        '"' => {
                            closed = true;
                            i += 1;
                            break;
                        }
                        c => {
                            value.push(c);
                            i += 1;
                        }
                    }
                }
                if !closed {
                    return Err(ParseError::UnterminatedString(start));
                }
                tokens.push(Token::Atom { value, offset: start });
            }
            _ => {
                let start = i;
                let mut value = String::new();
                while i < chars.len()
                    && !chars[i].is_whitespace()
                    && !matches!(chars[i], '(' | ')' | '"')
                {
                    value.push(chars[i]);
                    i += 1;
                }
                tokens.push(Token::Atom { value, offset: start });
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn op(name: &str, args: Vec<QueryNode>) -> QueryNode {
        QueryNode::Op { name: name.to_string(), args }
    }

    fn leaf(value: &str) -> QueryNode {
        QueryNode::Leaf(value.to_string())
    }

    #[test]
    fn test_parses_flat_operator() {
        let node = parse(r#"(todo "TODO" "NEXT")"#).unwrap();
        assert_eq!(node, op("todo", vec![leaf("TODO"), leaf("NEXT")]));
    }

    #[test]
    fn test_parses_nested_expression() {
        let node = parse(r#"(and (todo "TODO") (not (tag "done")))"#).unwrap();
        assert_eq!(
            node,
            op(
                "and",
                vec![
                    op("todo", vec![leaf("TODO")]),
                    op("not", vec![op("tag", vec![leaf("done")])]),
                ]
            )
        );
    }

    #[test]
    fn test_bare_atom_is_free_text() {
        assert_eq!(parse("budget").unwrap(), leaf("budget"));
        assert_eq!(parse(r#""two words""#).unwrap(), leaf("two words"));
    }

    #[test]
    fn test_quoted_string_with_escape() {
        let node = parse(r#"(heading "say \"hi\"")"#).unwrap();
        assert_eq!(node, op("heading", vec![leaf(r#"say "hi""#)]));
    }

    #[rstest]
    #[case("status", "todo")]
    #[case("state", "todo")]
    #[case("prio", "priority")]
    #[case("p", "priority")]
    #[case("#", "tag")]
    #[case("src", "file")]
    #[case("dl", "deadline")]
    #[case("sc", "scheduled")]
    #[case("prop", "property")]
    #[case("up", "parent")]
    #[case("h", "heading")]
    #[case("g", "group-by")]
    #[case("group", "group-by")]
    #[case("TODO", "todo")]
    fn test_alias_normalization(#[case] alias: &str, #[case] expected: &str) {
        let node = parse(&format!(r#"({alias} "x")"#)).unwrap();
        assert_eq!(node, op(expected, vec![leaf("x")]));
    }

    #[test]
    fn test_unknown_operator_passes_through() {
        let node = parse(r#"(frobnicate "x")"#).unwrap();
        assert_eq!(node, op("frobnicate", vec![leaf("x")]));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse("").unwrap_err(), ParseError::Empty);
        assert_eq!(parse("   ").unwrap_err(), ParseError::Empty);
    }

    #[test]
    fn test_unbalanced() {
        assert_eq!(parse("(todo \"x\"").unwrap_err(), ParseError::Unbalanced(0));
        assert_eq!(parse(")").unwrap_err(), ParseError::Unbalanced(0));
    }

    #[test]
    fn test_trailing_input() {
        assert_eq!(
            parse(r#"(todo "x") extra"#).unwrap_err(),
            ParseError::TrailingInput(11)
        );
    }

    #[test]
    fn test_empty_list() {
        assert_eq!(parse("()").unwrap_err(), ParseError::EmptyList(0));
    }

    #[test]
    fn test_list_head_must_be_atom() {
        assert_eq!(
            parse(r#"((todo "x"))"#).unwrap_err(),
            ParseError::ExpectedOperator(1)
        );
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(
            parse(r#"(todo "x"#).unwrap_err(),
            ParseError::UnterminatedString(6)
        );
    }
}
