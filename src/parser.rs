use crate::{
    ast::Expression,
    error::ParseError,
    lexer::{tokenize, Token, TokenKind},
};
use std::collections::HashMap;

/// The `is:` values that always win over a custom leaf of the same name.
pub(crate) const BUILT_IN_IS_VALUES: [&str; 4] = ["issue", "pr", "open", "closed"];

/// The expressions that `is:<name>` resolves to, on top of the built-in `is:` values.
///
/// Names are case-insensitive.
#[derive(Clone, Debug, Default)]
pub struct CustomLeaves {
    by_names: HashMap<String, Expression>,
}

impl CustomLeaves {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a leaf, returning the expression previously registered under the same name.
    pub fn insert(&mut self, name: &str, expression: Expression) -> Option<Expression> {
        self.by_names.insert(name.to_ascii_lowercase(), expression)
    }

    pub fn get(&self, name: &str) -> Option<&Expression> {
        self.by_names.get(&name.to_ascii_lowercase())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.by_names.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.by_names.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, Expression)> for CustomLeaves {
    fn from_iter<I: IntoIterator<Item = (&'a str, Expression)>>(iter: I) -> Self {
        let mut leaves = Self::new();
        for (name, expression) in iter {
            leaves.insert(name, expression);
        }
        leaves
    }
}

/// A recursive descent parser over the tokens of a single query.
///
/// From the lowest to the highest precedence:
///
/// ```text
/// or     := and ( ("OR" | "||") and )*
/// and    := single ( ["AND" | "&&"] single )*
/// single := ("NOT" | "!") single | "(" or ")" | key ":" value
/// ```
pub struct Parser<'source, 'leaves> {
    tokens: Vec<Token<'source>>,
    position: usize,
    custom_leaves: &'leaves CustomLeaves,
}

impl<'source, 'leaves> Parser<'source, 'leaves> {
    pub fn new(
        input: &'source str,
        custom_leaves: &'leaves CustomLeaves,
    ) -> Result<Self, ParseError> {
        Ok(Self {
            tokens: tokenize(input)?,
            position: 0,
            custom_leaves,
        })
    }

    /// Parse one expression, leaving any trailing token in place.
    pub fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        if self.peek().kind == TokenKind::EndOfQuery {
            return Err(ParseError::new("Empty query", self.peek().position));
        }
        self.parse_or()
    }

    /// Fail unless every token has been consumed.
    pub fn expect_end(&self) -> Result<(), ParseError> {
        let token = self.peek();
        match token.kind {
            TokenKind::EndOfQuery => Ok(()),
            TokenKind::BracketRight => Err(ParseError::new("Unmatched ')'", token.position)),
            _ => Err(ParseError::new("Unexpected token", token.position)),
        }
    }

    #[inline]
    fn peek(&self) -> &Token<'source> {
        // The lexer always terminates the tokens with an `EndOfQuery` that is never consumed.
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token<'source> {
        let token = self.peek().clone();
        if token.kind != TokenKind::EndOfQuery {
            self.position += 1;
        }
        token
    }

    fn starts_operand(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::OperatorNot
                | TokenKind::BracketLeft
                | TokenKind::KeyValuePair { .. }
                | TokenKind::Word(_)
        )
    }

    fn parse_or(&mut self) -> Result<Expression, ParseError> {
        let mut operands = vec![self.parse_and()?];
        while self.peek().kind == TokenKind::OperatorOr {
            let operator = self.advance();
            if !self.starts_operand() {
                return Err(ParseError::new(
                    "Missing expression after OR",
                    operator.position,
                ));
            }
            operands.push(self.parse_and()?);
        }

        Ok(single_or(operands, Expression::or))
    }

    fn parse_and(&mut self) -> Result<Expression, ParseError> {
        let mut operands = vec![self.parse_single()?];
        loop {
            if self.peek().kind == TokenKind::OperatorAnd {
                let operator = self.advance();
                if !self.starts_operand() {
                    return Err(ParseError::new(
                        "Missing expression after AND",
                        operator.position,
                    ));
                }
            } else if !self.starts_operand() {
                break;
            }
            operands.push(self.parse_single()?);
        }

        Ok(single_or(operands, Expression::and))
    }

    fn parse_single(&mut self) -> Result<Expression, ParseError> {
        let token = self.advance();
        match token.kind {
            TokenKind::OperatorNot => {
                if !self.starts_operand() {
                    return Err(ParseError::new(
                        "Missing expression after NOT",
                        token.position,
                    ));
                }
                Ok(!self.parse_single()?)
            }
            TokenKind::BracketLeft => {
                if self.peek().kind == TokenKind::BracketRight {
                    return Err(ParseError::new(
                        "Empty expression in brackets",
                        token.position,
                    ));
                }
                let expression = self.parse_or()?;
                if self.peek().kind != TokenKind::BracketRight {
                    return Err(ParseError::new(
                        "Missing matching bracket ')'",
                        token.position,
                    ));
                }
                self.advance();
                Ok(expression)
            }
            TokenKind::KeyValuePair { key, value } => self.leaf(key, &value, token.position),
            TokenKind::Word(word) => Err(ParseError::new(
                format!("Unexpected word '{word}'"),
                token.position,
            )),
            TokenKind::OperatorAnd => Err(ParseError::new(
                "Missing expression before AND",
                token.position,
            )),
            TokenKind::OperatorOr => Err(ParseError::new(
                "Missing expression before OR",
                token.position,
            )),
            TokenKind::BracketRight => Err(ParseError::new("Unmatched ')'", token.position)),
            TokenKind::EndOfQuery => Err(ParseError::new(
                "Unexpected end of query",
                token.position,
            )),
        }
    }

    fn leaf(&self, key: &str, value: &str, position: usize) -> Result<Expression, ParseError> {
        let expression = match key.to_ascii_lowercase().as_str() {
            "label" => Expression::label(value),
            "-label" => !Expression::label(value),
            "milestone" => Expression::milestone(value),
            "assignee" => Expression::assignee(value),
            "no" => match value.to_ascii_lowercase().as_str() {
                "milestone" => Expression::no_milestone(),
                "assignee" => Expression::no_assignee(),
                _ => {
                    return Err(ParseError::new(
                        format!("Unknown value '{value}' for 'no'"),
                        position,
                    ))
                }
            },
            "is" => match value.to_ascii_lowercase().as_str() {
                "issue" => Expression::issue_kind(true),
                "pr" => Expression::issue_kind(false),
                "open" => Expression::open(true),
                "closed" => Expression::open(false),
                name => self.custom_leaves.get(name).cloned().ok_or_else(|| {
                    ParseError::new(format!("Unknown value '{value}' for 'is'"), position)
                })?,
            },
            _ => return Err(ParseError::new(format!("Unknown key '{key}'"), position)),
        };

        Ok(expression)
    }
}

#[inline]
fn single_or(
    mut operands: Vec<Expression>,
    combine: fn(Vec<Expression>) -> Expression,
) -> Expression {
    if operands.len() == 1 {
        operands.swap_remove(0)
    } else {
        combine(operands)
    }
}

/// Parse a whole query.
///
/// # Examples
///
/// ```
/// use triage_query::{CustomLeaves, parse};
///
/// let leaves = CustomLeaves::default();
/// let expression = parse("label:bug (is:open OR milestone:Future)", &leaves).unwrap();
/// assert_eq!("label:bug AND (is:open OR milestone:Future)", expression.to_string());
///
/// let error = parse("label:bug OR", &CustomLeaves::default()).unwrap_err();
/// assert_eq!("Missing expression after OR at position 10", error.to_string());
/// ```
#[inline]
pub fn parse(input: &str, custom_leaves: &CustomLeaves) -> Result<Expression, ParseError> {
    let mut parser = Parser::new(input, custom_leaves)?;
    let expression = parser.parse_expression()?;
    parser.expect_end()?;
    Ok(expression)
}
