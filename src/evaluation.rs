use crate::{
    ast::{Expression, ExpressionKind},
    issues::Issue,
};

impl Expression {
    /// Whether the issue matches the expression.
    ///
    /// # Examples
    ///
    /// ```
    /// use triage_query::{CustomLeaves, Issue, Repository};
    ///
    /// let leaves = CustomLeaves::default();
    /// let expression = triage_query::parse("label:bug AND is:open", &leaves).unwrap();
    /// let repository: Repository = "dotnet/runtime".parse().unwrap();
    /// let issue = Issue::new(repository, 1).with_labels(&["bug"]);
    ///
    /// assert!(expression.evaluate(&issue));
    /// ```
    pub fn evaluate(&self, issue: &Issue) -> bool {
        match self.kind() {
            ExpressionKind::Constant(value) => *value,
            ExpressionKind::Label(name) => issue.has_label(name),
            ExpressionKind::LabelPattern(pattern) => {
                issue.labels().iter().any(|label| pattern.is_match(label))
            }
            ExpressionKind::Milestone(milestone) => same_name(milestone, issue.milestone()),
            ExpressionKind::MilestonePattern(pattern) => issue
                .milestone()
                .is_some_and(|milestone| pattern.is_match(milestone)),
            ExpressionKind::IsIssueKind(is_issue) => issue.kind().is_issue() == *is_issue,
            ExpressionKind::IsOpen(is_open) => issue.is_open() == *is_open,
            ExpressionKind::Assignee(assignee) => same_name(assignee, issue.assignee()),
            ExpressionKind::Untriaged(config) => config.is_untriaged(issue),
            ExpressionKind::Not(operand) => !operand.evaluate(issue),
            ExpressionKind::And(operands) => operands.iter().all(|operand| operand.evaluate(issue)),
            ExpressionKind::Or(operands) => operands.iter().any(|operand| operand.evaluate(issue)),
            ExpressionKind::MultiRepo(multi_repo) => multi_repo
                .get_expression(issue.repository())
                .evaluate(issue),
        }
    }

    /// The matching issues, in their original order.
    pub fn filter<'a, I>(&self, issues: I) -> Vec<&'a Issue>
    where
        I: IntoIterator<Item = &'a Issue>,
    {
        issues
            .into_iter()
            .filter(|issue| self.evaluate(issue))
            .collect()
    }
}

#[inline]
fn same_name(expected: &Option<String>, actual: Option<&str>) -> bool {
    match (expected, actual) {
        (Some(expected), Some(actual)) => expected.eq_ignore_ascii_case(actual),
        (None, None) => true,
        _ => false,
    }
}
