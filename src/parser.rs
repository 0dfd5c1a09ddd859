//! Recursive-descent parser turning a textual expression into a postfix
//! token stream (component D).
//!
//! `Parser` is a pure function from `&str` to `Vec<PostfixToken>` — no
//! scratch state survives a call, so unlike a shunting-yard
//! implementation built around a retained accumulator buffer, one
//! `Parser` can safely be shared across threads without locking
//! (spec.md §5, REDESIGN FLAGS).

use compact_str::CompactString;

use crate::element::SetOp;
use crate::error::ParseError;
use crate::groups::Leaf;

/// A single postfix token: a leaf atom, a binary operator, or the
/// `"unary -"` marker for a leading minus on a term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostfixToken {
    Leaf(Leaf),
    Op(SetOp),
    UnaryMinus,
}

/// Parses expressions of the grammar:
///
/// ```text
/// expr         := term ( op term )*
/// term         := ('-' | '+')* ( element | '(' element_list ')' | '(' expr ')' )
/// element      := [A-Za-z][A-Za-z0-9_]*
/// element_list := element ( ',' element )*
/// op           := '+' | '*' | '/' | '&' | '|' | '#|' | '#/'
/// ```
///
/// A single-element parenthesised list, `"(a)"`, collapses to the bare
/// element `a` rather than a 1-tuple, matching how the source grammar's
/// comma-list alternative is tried before the general sub-expression
/// alternative and a length-1 match degenerates to its sole member.
#[derive(Debug, Default, Clone, Copy)]
pub struct Parser;

impl Parser {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parse `input` into a postfix token stream.
    pub fn parse(self, input: &str) -> Result<Vec<PostfixToken>, ParseError> {
        let mut cursor = Cursor::new(input);
        let mut out = Vec::new();
        cursor.parse_expr(&mut out)?;
        cursor.skip_ws();
        if !cursor.at_end() {
            return Err(ParseError::UnmatchedCloseParen {
                position: cursor.pos,
            });
        }
        Ok(out)
    }
}

struct Cursor<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn parse_expr(&mut self, out: &mut Vec<PostfixToken>) -> Result<(), ParseError> {
        self.parse_term(out)?;
        loop {
            self.skip_ws();
            let before = self.pos;
            match self.try_consume_op()? {
                Some(op) => {
                    self.parse_term(out)?;
                    out.push(PostfixToken::Op(op));
                }
                None => {
                    self.pos = before;
                    break;
                }
            }
        }
        Ok(())
    }

    fn try_consume_op(&mut self) -> Result<Option<SetOp>, ParseError> {
        let start = self.pos;
        let Some(c) = self.peek() else {
            return Ok(None);
        };
        let (sign, len): (&str, usize) = match c {
            b'#' => match self.peek_at(1) {
                Some(b'|') => ("#|", 2),
                Some(b'/') => ("#/", 2),
                _ => return Err(ParseError::UnknownOperator {
                    sign: "#".to_string(),
                    position: start,
                }),
            },
            b'+' => ("+", 1),
            b'*' => ("*", 1),
            b'/' => ("/", 1),
            b'&' => ("&", 1),
            b'|' => ("|", 1),
            b'-' => ("-", 1),
            _ => return Ok(None),
        };
        match SetOp::from_sign(sign) {
            Some(op) => {
                self.pos += len;
                Ok(Some(op))
            }
            None => Err(ParseError::UnknownOperator {
                sign: sign.to_string(),
                position: start,
            }),
        }
    }

    fn parse_term(&mut self, out: &mut Vec<PostfixToken>) -> Result<(), ParseError> {
        let mut negations = 0usize;
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b'-') => {
                    negations += 1;
                    self.pos += 1;
                }
                Some(b'+') => {
                    self.pos += 1;
                }
                _ => break,
            }
        }
        self.parse_atom(out)?;
        for _ in 0..negations {
            out.push(PostfixToken::UnaryMinus);
        }
        Ok(())
    }

    fn parse_atom(&mut self, out: &mut Vec<PostfixToken>) -> Result<(), ParseError> {
        self.skip_ws();
        match self.peek() {
            Some(b'(') => {
                self.pos += 1;
                self.parse_parenthesised(out)
            }
            Some(c) if is_ident_start(c) => {
                let name = self.parse_identifier()?;
                out.push(PostfixToken::Leaf(Leaf::Name(name)));
                Ok(())
            }
            _ => Err(ParseError::MalformedElement { position: self.pos }),
        }
    }

    /// Having just consumed `'('`, decide between a comma-separated
    /// element list (a tuple atom) and a full sub-expression, trying the
    /// former first and backtracking to the latter on failure.
    fn parse_parenthesised(&mut self, out: &mut Vec<PostfixToken>) -> Result<(), ParseError> {
        let checkpoint = self.pos;
        if let Some(names) = self.try_parse_element_list() {
            match names.len() {
                1 => out.push(PostfixToken::Leaf(Leaf::Name(names.into_iter().next().unwrap()))),
                _ => out.push(PostfixToken::Leaf(Leaf::Tuple(names))),
            }
            return Ok(());
        }
        self.pos = checkpoint;

        self.parse_expr(out)?;
        self.skip_ws();
        if self.peek() == Some(b')') {
            self.pos += 1;
            Ok(())
        } else {
            Err(ParseError::UnmatchedOpenParen {
                position: checkpoint - 1,
            })
        }
    }

    /// Try to read `element (',' element)* ')'`. Returns `None` without
    /// consuming input (other than internally, restored by the caller)
    /// if the content is not a pure comma-separated identifier list.
    fn try_parse_element_list(&mut self) -> Option<Vec<CompactString>> {
        let mut names = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some(c) if is_ident_start(c) => {
                    names.push(self.parse_identifier().ok()?);
                }
                _ => return None,
            }
            self.skip_ws();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                }
                Some(b')') => {
                    self.pos += 1;
                    return Some(names);
                }
                _ => return None,
            }
        }
    }

    fn parse_identifier(&mut self) -> Result<CompactString, ParseError> {
        let start = self.pos;
        if !matches!(self.peek(), Some(c) if is_ident_start(c)) {
            return Err(ParseError::MalformedElement { position: start });
        }
        self.pos += 1;
        while matches!(self.peek(), Some(c) if is_ident_continue(c)) {
            self.pos += 1;
        }
        Ok(CompactString::from(&self.input[start..self.pos]))
    }
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic()
}

fn is_ident_continue(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> PostfixToken {
        PostfixToken::Leaf(Leaf::Name(CompactString::from(s)))
    }

    #[test]
    fn single_element() {
        let out = Parser::new().parse("green").unwrap();
        assert_eq!(out, vec![name("green")]);
    }

    #[test]
    fn binary_union() {
        let out = Parser::new().parse("green + red").unwrap();
        assert_eq!(out, vec![name("green"), name("red"), PostfixToken::Op(SetOp::Union)]);
    }

    #[test]
    fn weighted_and_precedence_is_left_to_right() {
        let out = Parser::new().parse("a & b & c").unwrap();
        assert_eq!(
            out,
            vec![
                name("a"),
                name("b"),
                PostfixToken::Op(SetOp::WeightedAnd),
                name("c"),
                PostfixToken::Op(SetOp::WeightedAnd),
            ]
        );
    }

    #[test]
    fn parenthesised_sub_expression() {
        let out = Parser::new().parse("(a + b) * c").unwrap();
        assert_eq!(
            out,
            vec![
                name("a"),
                name("b"),
                PostfixToken::Op(SetOp::Union),
                name("c"),
                PostfixToken::Op(SetOp::Intersection),
            ]
        );
    }

    #[test]
    fn single_element_tuple_collapses_to_bare_name() {
        let out = Parser::new().parse("(top)").unwrap();
        assert_eq!(out, vec![name("top")]);
    }

    #[test]
    fn multi_dim_tuple_atom() {
        let out = Parser::new().parse("(top, green)").unwrap();
        assert_eq!(
            out,
            vec![PostfixToken::Leaf(Leaf::Tuple(vec![
                CompactString::from("top"),
                CompactString::from("green"),
            ]))]
        );
    }

    #[test]
    fn multi_dim_expression() {
        let out = Parser::new().parse("(top, green) + (center, red)").unwrap();
        assert_eq!(
            out,
            vec![
                PostfixToken::Leaf(Leaf::Tuple(vec![
                    CompactString::from("top"),
                    CompactString::from("green")
                ])),
                PostfixToken::Leaf(Leaf::Tuple(vec![
                    CompactString::from("center"),
                    CompactString::from("red")
                ])),
                PostfixToken::Op(SetOp::Union),
            ]
        );
    }

    #[test]
    fn leading_unary_minus() {
        let out = Parser::new().parse("-green + red").unwrap();
        assert_eq!(
            out,
            vec![
                name("green"),
                PostfixToken::UnaryMinus,
                name("red"),
                PostfixToken::Op(SetOp::Union),
            ]
        );
    }

    #[test]
    fn unmatched_open_paren_is_an_error() {
        let err = Parser::new().parse("(a + b").unwrap_err();
        assert!(matches!(err, ParseError::UnmatchedOpenParen { .. }));
    }

    #[test]
    fn unmatched_close_paren_is_an_error() {
        let err = Parser::new().parse("a + b)").unwrap_err();
        assert!(matches!(err, ParseError::UnmatchedCloseParen { .. }));
    }

    #[test]
    fn unknown_operator_is_an_error() {
        let err = Parser::new().parse("a - b").unwrap_err();
        assert!(matches!(err, ParseError::UnknownOperator { .. }));
    }

    #[test]
    fn reusable_across_calls() {
        let parser = Parser::new();
        assert_eq!(parser.parse("a").unwrap(), vec![name("a")]);
        assert_eq!(parser.parse("b").unwrap(), vec![name("b")]);
    }
}
