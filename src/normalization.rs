use crate::{
    ast::{Expression, ExpressionKind},
    issues::Repository,
    multi_repo::MultiRepo,
};
use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Distributing an AND over its OR operands is skipped once it would produce that many
/// conjunctions.
pub const MAX_DISTRIBUTED_COMBINATIONS: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Connective {
    And,
    Or,
}

impl Connective {
    #[inline]
    fn combine(self, operands: Vec<Expression>) -> Expression {
        match self {
            Self::And => conjunction(operands),
            Self::Or => disjunction(operands),
        }
    }
}

impl Expression {
    /// Rewrite the expression into its canonical
    /// `MultiRepo? → Or → And → Not → Leaf` shape.
    ///
    /// The result evaluates identically to the original expression and normalizing it again
    /// yields the same expression. When distributing an AND over its ORs would produce
    /// [`MAX_DISTRIBUTED_COMBINATIONS`] conjunctions or more, the AND is only flattened.
    ///
    /// # Examples
    ///
    /// ```
    /// use triage_query::{CustomLeaves, parse};
    ///
    /// let expression = parse("!(label:bug OR is:closed)", &CustomLeaves::default()).unwrap();
    /// let normalized = expression.normalize();
    ///
    /// assert_eq!("!label:bug AND !is:closed", normalized.to_string());
    /// assert!(normalized.is_normalized());
    /// ```
    pub fn normalize(&self) -> Expression {
        let normalized = self.node().normalized.get_or_init(|| {
            let normalized = normalize_children(self);
            if normalized.ptr_eq(self) {
                return None;
            }
            // The result is its own normalized form.
            let _ = normalized.node().normalized.set(None);
            Some(normalized)
        });

        normalized.clone().unwrap_or_else(|| self.clone())
    }

    /// Whether the expression already has the canonical normalized shape.
    pub fn is_normalized(&self) -> bool {
        *self.node().is_normalized.get_or_init(|| match self.kind() {
            ExpressionKind::MultiRepo(multi_repo) => {
                !multi_repo.is_empty()
                    && is_disjunction(multi_repo.default_expression())
                    && multi_repo.iter().all(|(_, expression)| {
                        expression != multi_repo.default_expression() && is_disjunction(expression)
                    })
            }
            _ => is_disjunction(self),
        })
    }
}

fn normalize_children(expression: &Expression) -> Expression {
    match expression.kind() {
        ExpressionKind::Not(operand) => negate(&operand.normalize()),
        ExpressionKind::And(operands) => {
            conjunction(operands.iter().map(Expression::normalize).collect())
        }
        ExpressionKind::Or(operands) => {
            disjunction(operands.iter().map(Expression::normalize).collect())
        }
        ExpressionKind::MultiRepo(multi_repo) => multi_repo_expression(
            multi_repo
                .iter()
                .map(|(repository, expression)| (repository.clone(), expression.normalize()))
                .collect(),
            multi_repo.default_expression().normalize(),
        ),
        _ => expression.clone(),
    }
}

/// Negate an expression that is already normalized.
fn negate(expression: &Expression) -> Expression {
    match expression.kind() {
        ExpressionKind::Constant(value) => Expression::constant(!value),
        ExpressionKind::Not(operand) => operand.clone(),
        ExpressionKind::And(operands) => disjunction(operands.iter().map(negate).collect()),
        ExpressionKind::Or(operands) => conjunction(operands.iter().map(negate).collect()),
        ExpressionKind::MultiRepo(multi_repo) => multi_repo_expression(
            multi_repo
                .iter()
                .map(|(repository, expression)| (repository.clone(), negate(expression)))
                .collect(),
            negate(multi_repo.default_expression()),
        ),
        _ => !expression.clone(),
    }
}

/// Combine normalized operands with an AND.
fn conjunction(operands: Vec<Expression>) -> Expression {
    if has_multi_repo(&operands) {
        return bubble_multi_repo(operands, Connective::And);
    }

    let mut flattened = flatten(operands, Connective::And);
    if flattened.iter().any(|operand| operand.is_constant(false)) {
        return Expression::constant(false);
    }
    flattened.retain(|operand| !operand.is_constant(true));
    let mut operands = deduplicate(flattened);
    if has_complement(&operands) {
        return Expression::constant(false);
    }

    match operands.len() {
        0 => Expression::constant(true),
        1 => operands.swap_remove(0),
        _ => distribute(operands),
    }
}

/// Combine normalized operands with an OR.
fn disjunction(operands: Vec<Expression>) -> Expression {
    if has_multi_repo(&operands) {
        return bubble_multi_repo(operands, Connective::Or);
    }

    let mut flattened = flatten(operands, Connective::Or);
    if flattened.iter().any(|operand| operand.is_constant(true)) {
        return Expression::constant(true);
    }
    flattened.retain(|operand| !operand.is_constant(false));
    let mut operands = deduplicate(flattened);
    if has_complement(&operands) {
        return Expression::constant(true);
    }

    match operands.len() {
        0 => Expression::constant(false),
        1 => operands.swap_remove(0),
        _ => Expression::or(operands),
    }
}

/// Turn a flattened AND into an OR of ANDs.
fn distribute(operands: Vec<Expression>) -> Expression {
    let (disjunctions, others): (Vec<_>, Vec<_>) = operands
        .iter()
        .cloned()
        .partition(|operand| matches!(operand.kind(), ExpressionKind::Or(_)));
    if disjunctions.is_empty() {
        return Expression::and(operands);
    }

    let combinations = disjunctions
        .iter()
        .map(|disjunction| disjunction.operands().len())
        .fold(1usize, usize::saturating_mul);
    if combinations >= MAX_DISTRIBUTED_COMBINATIONS {
        debug!(
            combinations,
            limit = MAX_DISTRIBUTED_COMBINATIONS,
            "skipping the distribution of an AND over its ORs"
        );
        return Expression::and(operands);
    }

    let conjunctions = disjunctions
        .iter()
        .map(|disjunction| disjunction.operands().iter().cloned())
        .multi_cartesian_product()
        .map(|branches| conjunction(others.iter().cloned().chain(branches).collect()))
        .collect();
    disjunction(conjunctions)
}

/// Move the MultiRepo operands of a connective to the top: every repository gets its own
/// combination and the defaults are combined into the new default.
fn bubble_multi_repo(operands: Vec<Expression>, connective: Connective) -> Expression {
    let repositories: BTreeSet<&Repository> = operands
        .iter()
        .filter_map(as_multi_repo)
        .flat_map(|multi_repo| multi_repo.repositories())
        .collect();

    let entries = repositories
        .into_iter()
        .map(|repository| {
            let combined = operands
                .iter()
                .map(|operand| match as_multi_repo(operand) {
                    Some(multi_repo) => multi_repo.get_expression(repository).clone(),
                    None => operand.clone(),
                })
                .collect();
            (repository.clone(), connective.combine(combined))
        })
        .collect();
    let default = operands
        .iter()
        .map(|operand| match as_multi_repo(operand) {
            Some(multi_repo) => multi_repo.default_expression().clone(),
            None => operand.clone(),
        })
        .collect();

    multi_repo_expression(entries, connective.combine(default))
}

/// Build a normalized MultiRepo out of normalized expressions, flattening the nested ones.
fn multi_repo_expression(
    entries: Vec<(Repository, Expression)>,
    default: Expression,
) -> Expression {
    let (default_entries, default) = match default.kind() {
        ExpressionKind::MultiRepo(nested) => (
            nested
                .iter()
                .map(|(repository, expression)| (repository.clone(), expression.clone()))
                .collect(),
            nested.default_expression().clone(),
        ),
        _ => (BTreeMap::new(), default),
    };

    let mut expressions: BTreeMap<Repository, Expression> = entries
        .into_iter()
        .map(|(repository, expression)| {
            let expression = match as_multi_repo(&expression) {
                Some(nested) => nested.get_expression(&repository).clone(),
                None => expression,
            };
            (repository, expression)
        })
        .collect();
    for (repository, expression) in default_entries {
        expressions.entry(repository).or_insert(expression);
    }
    expressions.retain(|_, expression| *expression != default);

    if expressions.is_empty() {
        return default;
    }
    Expression::multi_repo(MultiRepo::from_parts(expressions, default))
}

fn flatten(operands: Vec<Expression>, connective: Connective) -> Vec<Expression> {
    let mut flattened = Vec::with_capacity(operands.len());
    for operand in operands {
        match (operand.kind(), connective) {
            (ExpressionKind::And(nested), Connective::And)
            | (ExpressionKind::Or(nested), Connective::Or) => {
                flattened.extend(nested.iter().cloned())
            }
            _ => flattened.push(operand),
        }
    }
    flattened
}

fn deduplicate(operands: Vec<Expression>) -> Vec<Expression> {
    let mut unique: Vec<Expression> = Vec::with_capacity(operands.len());
    for operand in operands {
        if !unique.contains(&operand) {
            unique.push(operand);
        }
    }
    unique
}

fn has_complement(operands: &[Expression]) -> bool {
    operands.iter().any(|operand| match operand.kind() {
        ExpressionKind::Not(negated) => operands.contains(negated),
        _ => false,
    })
}

#[inline]
fn has_multi_repo(operands: &[Expression]) -> bool {
    operands.iter().any(|operand| as_multi_repo(operand).is_some())
}

#[inline]
fn as_multi_repo(expression: &Expression) -> Option<&MultiRepo> {
    match expression.kind() {
        ExpressionKind::MultiRepo(multi_repo) => Some(multi_repo),
        _ => None,
    }
}

fn is_disjunction(expression: &Expression) -> bool {
    match expression.kind() {
        ExpressionKind::Constant(_) => true,
        ExpressionKind::Or(operands) => {
            operands.len() >= 2
                && operands.iter().all(is_conjunction)
                && deduplicate(operands.clone()).len() == operands.len()
                && !has_complement(operands)
        }
        _ => is_conjunction(expression),
    }
}

fn is_conjunction(expression: &Expression) -> bool {
    match expression.kind() {
        ExpressionKind::And(operands) => {
            operands.len() >= 2
                && operands.iter().all(is_literal)
                && deduplicate(operands.clone()).len() == operands.len()
                && !has_complement(operands)
        }
        _ => is_literal(expression),
    }
}

#[inline]
fn is_literal(expression: &Expression) -> bool {
    match expression.kind() {
        ExpressionKind::Not(operand) => operand.is_leaf(),
        _ => expression.is_leaf(),
    }
}
