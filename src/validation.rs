use crate::{
    ast::{Expression, ExpressionKind},
    issues::IssueCollection,
};
use thiserror::Error;
use tracing::warn;

/// A name referenced by an expression that no issue of a collection uses.
///
/// Warnings are advisory only: they never change how an expression evaluates.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Error)]
pub enum ValidationWarning {
    #[error("label '{0}' is not used by any issue")]
    UnknownLabel(String),
    #[error("milestone '{0}' is not used by any issue")]
    UnknownMilestone(String),
    #[error("assignee '{0}' is not assigned to any issue")]
    UnknownAssignee(String),
}

impl Expression {
    /// Check that the labels, milestones and assignees referenced by the expression exist in the
    /// collection. Each miss is logged once.
    pub fn validate<C>(&self, collection: &C) -> Vec<ValidationWarning>
    where
        C: IssueCollection + ?Sized,
    {
        let mut warnings = vec![];
        collect_warnings(self, collection, &mut warnings);
        for warning in &warnings {
            warn!(%warning, "invalid query");
        }
        warnings
    }
}

fn collect_warnings<C>(
    expression: &Expression,
    collection: &C,
    warnings: &mut Vec<ValidationWarning>,
) where
    C: IssueCollection + ?Sized,
{
    let warning = match expression.kind() {
        ExpressionKind::Label(name) if !collection.has_label(name) => {
            ValidationWarning::UnknownLabel(name.clone())
        }
        ExpressionKind::Milestone(Some(name)) if !collection.has_milestone(name) => {
            ValidationWarning::UnknownMilestone(name.clone())
        }
        ExpressionKind::Assignee(Some(name)) if !collection.has_assignee(name) => {
            ValidationWarning::UnknownAssignee(name.clone())
        }
        ExpressionKind::Not(operand) => return collect_warnings(operand, collection, warnings),
        ExpressionKind::And(operands) | ExpressionKind::Or(operands) => {
            for operand in operands {
                collect_warnings(operand, collection, warnings);
            }
            return;
        }
        ExpressionKind::MultiRepo(multi_repo) => {
            for (_, operand) in multi_repo.iter() {
                collect_warnings(operand, collection, warnings);
            }
            return collect_warnings(multi_repo.default_expression(), collection, warnings);
        }
        _ => return,
    };

    if !warnings.contains(&warning) {
        warnings.push(warning);
    }
}
