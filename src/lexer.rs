use crate::error::ParseError;
use logos::{Logos, SpannedIter};
use std::{borrow::Cow, cell::Cell, iter::Peekable, ops::Range};

/// The raw lexemes; the [`Lexer`] assembles them into [`Token`]s and enforces the adjacency
/// rules between keys, colons and values.
#[derive(Clone, Copy, Debug, Logos, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
enum Lexeme {
    #[token("(")]
    BracketLeft,
    #[token(")")]
    BracketRight,
    #[token("!")]
    Not,
    #[token("&&")]
    And,
    #[token("||")]
    Or,
    #[token(":")]
    Colon,
    #[regex(r"[A-Za-z0-9_./\-]+")]
    Text,
    #[regex(r#""(\\.|[^"\\])*""#)]
    Quoted,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind<'source> {
    EndOfQuery,
    BracketLeft,
    BracketRight,
    Word(&'source str),
    OperatorNot,
    OperatorAnd,
    OperatorOr,
    KeyValuePair {
        key: &'source str,
        value: Cow<'source, str>,
    },
}

/// A token along with its 0-based character offset inside the query.
#[derive(Clone, Debug, PartialEq)]
pub struct Token<'source> {
    pub kind: TokenKind<'source>,
    pub position: usize,
}

pub struct Lexer<'source> {
    source: &'source str,
    lexemes: Peekable<SpannedIter<'source, Lexeme>>,
    /// Last converted `(byte, char)` offsets.
    cursor: Cell<(usize, usize)>,
    finished: bool,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source str) -> Self {
        Self {
            source,
            lexemes: Lexeme::lexer(source).spanned().peekable(),
            cursor: Cell::new((0, 0)),
            finished: false,
        }
    }

    fn token(&mut self, lexeme: Lexeme, span: Range<usize>) -> Result<Token<'source>, ParseError> {
        let kind = match lexeme {
            Lexeme::BracketLeft => TokenKind::BracketLeft,
            Lexeme::BracketRight => TokenKind::BracketRight,
            Lexeme::Not => TokenKind::OperatorNot,
            Lexeme::And => TokenKind::OperatorAnd,
            Lexeme::Or => TokenKind::OperatorOr,
            Lexeme::Text => return self.word(span),
            Lexeme::Colon => return Err(self.error("Missing key before ':'", span.start)),
            Lexeme::Quoted => {
                return Err(self.error("Missing key before quoted value", span.start))
            }
        };
        Ok(Token {
            kind,
            position: self.char_offset(span.start),
        })
    }

    fn word(&mut self, span: Range<usize>) -> Result<Token<'source>, ParseError> {
        let text = &self.source[span.clone()];
        if let Some(invalid) = text
            .chars()
            .next()
            .filter(|first| !(first.is_ascii_alphabetic() || matches!(first, '_' | '.' | '-')))
        {
            return Err(self.error(
                format!("Invalid character '{invalid}' at the start of a word"),
                span.start,
            ));
        }

        let colon = match self.lexemes.peek() {
            Some((Ok(Lexeme::Colon), colon)) if colon.start == span.end => colon.clone(),
            _ => return self.bare_word(text, span),
        };
        self.lexemes.next();

        let value = match self.lexemes.peek() {
            Some((Ok(Lexeme::Text), value)) if value.start == colon.end => {
                let value = value.clone();
                self.lexemes.next();
                (Cow::Borrowed(&self.source[value.clone()]), value.end)
            }
            Some((Ok(Lexeme::Quoted), value)) if value.start == colon.end => {
                let value = value.clone();
                self.lexemes.next();
                (unescape(&self.source[value.start + 1..value.end - 1]), value.end)
            }
            _ if self.source[colon.end..].starts_with('"') => {
                return Err(self.error("Missing matching '\"'", colon.end))
            }
            _ => return Err(self.error("Invalid character after ':'", colon.end)),
        };
        let (value, end) = value;
        self.expect_separator(end)?;

        Ok(Token {
            kind: TokenKind::KeyValuePair { key: text, value },
            position: self.char_offset(span.start),
        })
    }

    fn bare_word(
        &self,
        text: &'source str,
        span: Range<usize>,
    ) -> Result<Token<'source>, ParseError> {
        if text.starts_with('-') {
            return Err(self.error(
                "'-' is only allowed at the start of a key",
                span.start,
            ));
        }
        if let Some((offset, invalid)) = text
            .char_indices()
            .find(|(_, c)| !(c.is_ascii_alphabetic() || matches!(c, '_' | '.' | '-')))
        {
            return Err(self.error(
                format!("Invalid character '{invalid}' in word"),
                span.start + offset,
            ));
        }
        self.expect_separator(span.end)?;

        let kind = if text.eq_ignore_ascii_case("and") {
            TokenKind::OperatorAnd
        } else if text.eq_ignore_ascii_case("or") {
            TokenKind::OperatorOr
        } else if text.eq_ignore_ascii_case("not") {
            TokenKind::OperatorNot
        } else {
            TokenKind::Word(text)
        };
        Ok(Token {
            kind,
            position: self.char_offset(span.start),
        })
    }

    fn expect_separator(&self, end: usize) -> Result<(), ParseError> {
        match self.source[end..].chars().next() {
            None | Some(')') => Ok(()),
            Some(c) if c.is_whitespace() => Ok(()),
            Some(c) => Err(self.error(format!("Invalid character '{c}' after word"), end)),
        }
    }

    fn unexpected(&self, span: Range<usize>) -> ParseError {
        let mut rest = self.source[span.start..].chars();
        match (rest.next(), rest.next()) {
            (Some('&'), _) => self.error("Missing second '&' of '&&'", span.start + 1),
            (Some('|'), _) => self.error("Missing second '|' of '||'", span.start + 1),
            (Some('"'), _) => self.error("Missing matching '\"'", span.start),
            (Some(c), _) => self.error(format!("Unexpected character '{c}'"), span.start),
            (None, _) => self.error("Unexpected end of query", span.start),
        }
    }

    #[inline]
    fn error(&self, message: impl Into<String>, byte_offset: usize) -> ParseError {
        ParseError::new(message, self.char_offset(byte_offset))
    }

    fn char_offset(&self, byte_offset: usize) -> usize {
        let (byte, chars) = match self.cursor.get() {
            (byte, chars) if byte <= byte_offset => (byte, chars),
            _ => (0, 0),
        };
        let offset = chars + self.source[byte..byte_offset].chars().count();
        self.cursor.set((byte_offset, offset));
        offset
    }
}

impl<'source> Iterator for Lexer<'source> {
    type Item = Result<Token<'source>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let Some((lexeme, span)) = self.lexemes.next() else {
            self.finished = true;
            return Some(Ok(Token {
                kind: TokenKind::EndOfQuery,
                position: self.char_offset(self.source.len()),
            }));
        };

        let token = match lexeme {
            Ok(lexeme) => self.token(lexeme, span),
            Err(()) => Err(self.unexpected(span)),
        };
        if token.is_err() {
            self.finished = true;
        }
        Some(token)
    }
}

/// Tokenize the whole query; the last token is always [`TokenKind::EndOfQuery`].
pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>, ParseError> {
    Lexer::new(source).collect()
}

fn unescape(value: &str) -> Cow<'_, str> {
    if !value.contains('\\') {
        return Cow::Borrowed(value);
    }

    let mut unescaped = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => unescaped.extend(chars.next()),
            c => unescaped.push(c),
        }
    }
    Cow::Owned(unescaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_tokens(input: &str) -> Result<Vec<TokenKind<'_>>, ParseError> {
        tokenize(input).map(|tokens| tokens.into_iter().map(|token| token.kind).collect())
    }

    fn key_value<'a>(key: &'a str, value: &'a str) -> TokenKind<'a> {
        TokenKind::KeyValuePair {
            key,
            value: Cow::Borrowed(value),
        }
    }

    #[test]
    fn can_lex_an_empty_query() {
        let actual = tokenize("   ").unwrap();

        assert_eq!(
            vec![Token {
                kind: TokenKind::EndOfQuery,
                position: 3
            }],
            actual
        );
    }

    #[test]
    fn can_lex_brackets() {
        let actual = lex_tokens("( )").unwrap();

        assert_eq!(
            vec![
                TokenKind::BracketLeft,
                TokenKind::BracketRight,
                TokenKind::EndOfQuery
            ],
            actual
        );
    }

    #[test]
    fn can_lex_symbolic_operators() {
        let actual = lex_tokens("! && ||").unwrap();

        assert_eq!(
            vec![
                TokenKind::OperatorNot,
                TokenKind::OperatorAnd,
                TokenKind::OperatorOr,
                TokenKind::EndOfQuery
            ],
            actual
        );
    }

    #[test]
    fn can_lex_keywords_regardless_of_case() {
        let actual = lex_tokens("AND and Or NOT").unwrap();

        assert_eq!(
            vec![
                TokenKind::OperatorAnd,
                TokenKind::OperatorAnd,
                TokenKind::OperatorOr,
                TokenKind::OperatorNot,
                TokenKind::EndOfQuery
            ],
            actual
        );
    }

    #[test]
    fn can_lex_a_bare_word() {
        let actual = lex_tokens("untriaged_issues.vx-y").unwrap();

        assert_eq!(
            vec![TokenKind::Word("untriaged_issues.vx-y"), TokenKind::EndOfQuery],
            actual
        );
    }

    #[test]
    fn return_an_error_on_a_digit_inside_a_bare_word() {
        let actual = tokenize("label:bug untriaged2");

        assert_eq!(
            Err(ParseError::new("Invalid character '2' in word", 19)),
            actual
        );
    }

    #[test]
    fn can_lex_a_key_value_pair() {
        let actual = lex_tokens("milestone:8.0.0/preview-1").unwrap();

        assert_eq!(
            vec![key_value("milestone", "8.0.0/preview-1"), TokenKind::EndOfQuery],
            actual
        );
    }

    #[test]
    fn can_lex_a_negated_key() {
        let actual = lex_tokens("-label:bug").unwrap();

        assert_eq!(vec![key_value("-label", "bug"), TokenKind::EndOfQuery], actual);
    }

    #[test]
    fn can_lex_a_quoted_value_with_spaces() {
        let actual = lex_tokens(r#"label:"help wanted""#).unwrap();

        assert_eq!(
            vec![key_value("label", "help wanted"), TokenKind::EndOfQuery],
            actual
        );
    }

    #[test]
    fn can_lex_a_quoted_value_with_escaped_quotes() {
        let actual = lex_tokens(r#"label:"say \"hi\"""#).unwrap();

        assert_eq!(
            vec![
                TokenKind::KeyValuePair {
                    key: "label",
                    value: Cow::Owned(r#"say "hi""#.to_string())
                },
                TokenKind::EndOfQuery
            ],
            actual
        );
    }

    #[test]
    fn can_lex_a_key_value_pair_followed_by_a_bracket() {
        let actual = lex_tokens("(label:bug)").unwrap();

        assert_eq!(
            vec![
                TokenKind::BracketLeft,
                key_value("label", "bug"),
                TokenKind::BracketRight,
                TokenKind::EndOfQuery
            ],
            actual
        );
    }

    #[test]
    fn can_lex_a_complex_query() {
        let actual = tokenize(r#"!(label:bug || -label:"help wanted") AND is:open"#).unwrap();

        assert_eq!(
            vec![
                Token {
                    kind: TokenKind::OperatorNot,
                    position: 0
                },
                Token {
                    kind: TokenKind::BracketLeft,
                    position: 1
                },
                Token {
                    kind: key_value("label", "bug"),
                    position: 2
                },
                Token {
                    kind: TokenKind::OperatorOr,
                    position: 12
                },
                Token {
                    kind: key_value("-label", "help wanted"),
                    position: 15
                },
                Token {
                    kind: TokenKind::BracketRight,
                    position: 35
                },
                Token {
                    kind: TokenKind::OperatorAnd,
                    position: 37
                },
                Token {
                    kind: key_value("is", "open"),
                    position: 41
                },
                Token {
                    kind: TokenKind::EndOfQuery,
                    position: 48
                },
            ],
            actual
        );
    }

    #[test]
    fn report_character_offsets() {
        let actual = tokenize(r#"label:"été" is:open"#).unwrap();

        assert_eq!(12, actual[1].position);
    }

    #[test]
    fn report_character_offsets_across_many_non_ascii_tokens() {
        let query = (0..50)
            .map(|_| r#"label:"ünïcödé""#)
            .collect::<Vec<_>>()
            .join(" ");

        let actual = tokenize(&query).unwrap();

        assert_eq!(51, actual.len());
        for (index, token) in actual[..50].iter().enumerate() {
            assert_eq!(index * 16, token.position);
        }
        assert_eq!(799, actual[50].position);
    }

    #[test]
    fn report_character_offsets_of_errors_after_non_ascii_tokens() {
        let actual = tokenize(r#"label:"été" label:"ça" $"#);

        assert_eq!(Err(ParseError::new("Unexpected character '$'", 23)), actual);
    }

    #[test]
    fn return_an_error_on_unmatched_quote() {
        let actual = tokenize(r#"label:"help wanted"#);

        assert_eq!(Err(ParseError::new("Missing matching '\"'", 6)), actual);
    }

    #[test]
    fn return_an_error_on_invalid_first_character() {
        let actual = tokenize("is:open 5abc");

        assert_eq!(
            Err(ParseError::new(
                "Invalid character '5' at the start of a word",
                8
            )),
            actual
        );
    }

    #[test]
    fn return_an_error_on_invalid_character_after_a_word() {
        let actual = tokenize("label:bug(");

        assert_eq!(
            Err(ParseError::new("Invalid character '(' after word", 9)),
            actual
        );
    }

    #[test]
    fn return_an_error_on_a_dash_that_does_not_start_a_key() {
        let actual = tokenize("-label");

        assert_eq!(
            Err(ParseError::new(
                "'-' is only allowed at the start of a key",
                0
            )),
            actual
        );
    }

    #[test]
    fn return_an_error_on_missing_second_ampersand() {
        let actual = tokenize("label:bug & is:open");

        assert_eq!(
            Err(ParseError::new("Missing second '&' of '&&'", 11)),
            actual
        );
    }

    #[test]
    fn return_an_error_on_missing_second_pipe() {
        let actual = tokenize("label:bug | is:open");

        assert_eq!(
            Err(ParseError::new("Missing second '|' of '||'", 11)),
            actual
        );
    }

    #[test]
    fn return_an_error_on_invalid_character_after_colon() {
        let actual = tokenize("label: bug");

        assert_eq!(
            Err(ParseError::new("Invalid character after ':'", 6)),
            actual
        );
    }

    #[test]
    fn return_an_error_on_unexpected_character() {
        let actual = tokenize("label:bug $");

        assert_eq!(Err(ParseError::new("Unexpected character '$'", 10)), actual);
    }

    #[test]
    fn stop_after_the_first_error() {
        let tokens: Vec<_> = Lexer::new("$ label:bug").collect();

        assert_eq!(1, tokens.len());
        assert!(tokens[0].is_err());
    }
}
