use crate::{multi_repo::MultiRepo, untriaged::UntriagedConfig};
use regex::{Regex, RegexBuilder};
use std::{
    fmt::{Debug, Display, Formatter},
    ops::Not,
    sync::{Arc, LazyLock, OnceLock},
};

static TRUE: LazyLock<Expression> =
    LazyLock::new(|| Expression::new(ExpressionKind::Constant(true)));
static FALSE: LazyLock<Expression> =
    LazyLock::new(|| Expression::new(ExpressionKind::Constant(false)));

/// An immutable boolean expression over issues.
///
/// Cloning an [`Expression`] only clones a shared handle, so sub-expressions can be reused
/// freely between trees and threads.
///
/// # Examples
///
/// ```
/// use triage_query::Expression;
///
/// let expression = Expression::label("bug") & !Expression::open(false);
///
/// assert_eq!(r#"label:bug AND !is:closed"#, expression.to_string());
/// ```
#[derive(Clone)]
pub struct Expression(Arc<Node>);

pub(crate) struct Node {
    pub(crate) kind: ExpressionKind,
    /// `None` when the expression is already in its normalized form.
    pub(crate) normalized: OnceLock<Option<Expression>>,
    pub(crate) is_normalized: OnceLock<bool>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExpressionKind {
    Constant(bool),
    Label(String),
    LabelPattern(Pattern),
    Milestone(Option<String>),
    MilestonePattern(Pattern),
    IsIssueKind(bool),
    IsOpen(bool),
    Assignee(Option<String>),
    Untriaged(Arc<UntriagedConfig>),
    Not(Expression),
    And(Vec<Expression>),
    Or(Vec<Expression>),
    MultiRepo(MultiRepo),
}

/// A case-insensitive regular expression; two patterns are equal when their text is.
#[derive(Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map(Self)
    }

    #[inline]
    pub fn is_match(&self, value: &str) -> bool {
        self.0.is_match(value)
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Pattern {}

impl Debug for Pattern {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "/{}/", self.as_str())
    }
}

impl Expression {
    pub fn new(kind: ExpressionKind) -> Self {
        Self(Arc::new(Node {
            kind,
            normalized: OnceLock::new(),
            is_normalized: OnceLock::new(),
        }))
    }

    #[inline]
    pub fn constant(value: bool) -> Self {
        if value {
            TRUE.clone()
        } else {
            FALSE.clone()
        }
    }

    pub fn label(name: impl Into<String>) -> Self {
        Self::new(ExpressionKind::Label(name.into()))
    }

    pub fn label_pattern(pattern: Pattern) -> Self {
        Self::new(ExpressionKind::LabelPattern(pattern))
    }

    pub fn milestone(name: impl Into<String>) -> Self {
        Self::new(ExpressionKind::Milestone(Some(name.into())))
    }

    pub fn no_milestone() -> Self {
        Self::new(ExpressionKind::Milestone(None))
    }

    pub fn milestone_pattern(pattern: Pattern) -> Self {
        Self::new(ExpressionKind::MilestonePattern(pattern))
    }

    pub fn assignee(name: impl Into<String>) -> Self {
        Self::new(ExpressionKind::Assignee(Some(name.into())))
    }

    pub fn no_assignee() -> Self {
        Self::new(ExpressionKind::Assignee(None))
    }

    /// `true` matches issues and issue comments, `false` matches pull requests.
    pub fn issue_kind(is_issue: bool) -> Self {
        Self::new(ExpressionKind::IsIssueKind(is_issue))
    }

    pub fn open(is_open: bool) -> Self {
        Self::new(ExpressionKind::IsOpen(is_open))
    }

    pub fn untriaged(config: Arc<UntriagedConfig>) -> Self {
        Self::new(ExpressionKind::Untriaged(config))
    }

    /// Combine the operands with an AND; an empty list is always true.
    pub fn and(operands: Vec<Expression>) -> Self {
        if operands.is_empty() {
            return Self::constant(true);
        }
        Self::new(ExpressionKind::And(operands))
    }

    /// Combine the operands with an OR; an empty list is always false.
    pub fn or(operands: Vec<Expression>) -> Self {
        if operands.is_empty() {
            return Self::constant(false);
        }
        Self::new(ExpressionKind::Or(operands))
    }

    pub fn multi_repo(multi_repo: MultiRepo) -> Self {
        Self::new(ExpressionKind::MultiRepo(multi_repo))
    }

    #[inline]
    pub fn kind(&self) -> &ExpressionKind {
        &self.0.kind
    }

    #[inline]
    pub(crate) fn node(&self) -> &Node {
        &self.0
    }

    #[inline]
    pub(crate) fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn is_leaf(&self) -> bool {
        !matches!(
            self.kind(),
            ExpressionKind::Constant(_)
                | ExpressionKind::Not(_)
                | ExpressionKind::And(_)
                | ExpressionKind::Or(_)
                | ExpressionKind::MultiRepo(_)
        )
    }

    #[inline]
    pub fn is_constant(&self, value: bool) -> bool {
        matches!(self.kind(), ExpressionKind::Constant(constant) if *constant == value)
    }

    /// The operands of an AND or an OR; empty for any other expression.
    pub fn operands(&self) -> &[Expression] {
        match self.kind() {
            ExpressionKind::And(operands) | ExpressionKind::Or(operands) => operands,
            _ => &[],
        }
    }
}

impl Not for Expression {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self::new(ExpressionKind::Not(self))
    }
}

impl std::ops::BitAnd for Expression {
    type Output = Self;

    fn bitand(self, other: Self) -> Self::Output {
        Self::and(vec![self, other])
    }
}

impl std::ops::BitOr for Expression {
    type Output = Self;

    fn bitor(self, other: Self) -> Self::Output {
        Self::or(vec![self, other])
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        match (self.kind(), other.kind()) {
            (ExpressionKind::And(left), ExpressionKind::And(right))
            | (ExpressionKind::Or(left), ExpressionKind::Or(right)) => same_operands(left, right),
            (left, right) => left == right,
        }
    }
}

impl Eq for Expression {}

/// Compare two operand lists as multisets.
fn same_operands(left: &[Expression], right: &[Expression]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    let mut matched = vec![false; right.len()];
    left.iter().all(|operand| {
        let found = right
            .iter()
            .enumerate()
            .position(|(i, candidate)| !matched[i] && candidate == operand);
        match found {
            Some(i) => {
                matched[i] = true;
                true
            }
            None => false,
        }
    })
}

impl Debug for Expression {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self.kind(), formatter)
    }
}

impl Display for Expression {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self.kind() {
            ExpressionKind::Constant(value) => write!(formatter, "{value}"),
            ExpressionKind::Label(name) => write!(formatter, "label:{}", Value(name)),
            ExpressionKind::LabelPattern(pattern) => write!(formatter, "label:{pattern:?}"),
            ExpressionKind::Milestone(Some(name)) => {
                write!(formatter, "milestone:{}", Value(name))
            }
            ExpressionKind::Milestone(None) => write!(formatter, "no:milestone"),
            ExpressionKind::MilestonePattern(pattern) => {
                write!(formatter, "milestone:{pattern:?}")
            }
            ExpressionKind::IsIssueKind(true) => write!(formatter, "is:issue"),
            ExpressionKind::IsIssueKind(false) => write!(formatter, "is:pr"),
            ExpressionKind::IsOpen(true) => write!(formatter, "is:open"),
            ExpressionKind::IsOpen(false) => write!(formatter, "is:closed"),
            ExpressionKind::Assignee(Some(name)) => write!(formatter, "assignee:{}", Value(name)),
            ExpressionKind::Assignee(None) => write!(formatter, "no:assignee"),
            ExpressionKind::Untriaged(_) => write!(formatter, "is:untriaged"),
            ExpressionKind::Not(operand) => write!(formatter, "!{}", Grouped(operand)),
            ExpressionKind::And(operands) => write_joined(formatter, operands, " AND "),
            ExpressionKind::Or(operands) => write_joined(formatter, operands, " OR "),
            ExpressionKind::MultiRepo(multi_repo) => {
                write!(formatter, "{{")?;
                for (repository, expression) in multi_repo.iter() {
                    write!(formatter, "{repository} => {expression}, ")?;
                }
                write!(formatter, "* => {}}}", multi_repo.default_expression())
            }
        }
    }
}

fn write_joined(
    formatter: &mut Formatter<'_>,
    operands: &[Expression],
    separator: &str,
) -> std::fmt::Result {
    for (i, operand) in operands.iter().enumerate() {
        if i > 0 {
            write!(formatter, "{separator}")?;
        }
        write!(formatter, "{}", Grouped(operand))?;
    }
    Ok(())
}

/// Wraps connectives in brackets.
struct Grouped<'a>(&'a Expression);

impl Display for Grouped<'_> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self.0.kind() {
            ExpressionKind::And(_) | ExpressionKind::Or(_) => write!(formatter, "({})", self.0),
            _ => write!(formatter, "{}", self.0),
        }
    }
}

/// Quotes a value that could not be read back as a bare value.
struct Value<'a>(&'a str);

impl Display for Value<'_> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        let is_bare = !self.0.is_empty()
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '/'));
        if is_bare {
            return write!(formatter, "{}", self.0);
        }

        write!(formatter, "\"")?;
        for c in self.0.chars() {
            if matches!(c, '"' | '\\') {
                write!(formatter, "\\")?;
            }
            write!(formatter, "{c}")?;
        }
        write!(formatter, "\"")
    }
}
