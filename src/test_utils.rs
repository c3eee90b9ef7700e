use crate::{
    ast::{Expression, ExpressionKind},
    multi_repo::MultiRepo,
};

pub mod expressions {
    macro_rules! label {
        ($name:expr) => {
            $crate::ast::Expression::label($name)
        };
    }

    macro_rules! not {
        ($value:expr) => {
            !$value
        };
    }

    macro_rules! and {
        ($($operand:expr),+ $(,)?) => {
            $crate::ast::Expression::and(vec![$($operand),+])
        };
    }

    macro_rules! or {
        ($($operand:expr),+ $(,)?) => {
            $crate::ast::Expression::or(vec![$($operand),+])
        };
    }

    pub(crate) use and;
    pub(crate) use label;
    pub(crate) use not;
    pub(crate) use or;
}

pub mod issues {
    use crate::{
        issues::{Issue, IssueKind, IssueState, Repository},
        untriaged::{LabelSet, UntriagedConfig},
    };

    pub fn a_repository() -> Repository {
        Repository::new("dotnet", "runtime").unwrap()
    }

    pub fn another_repository() -> Repository {
        Repository::new("dotnet", "corefx").unwrap()
    }

    pub fn a_third_repository() -> Repository {
        Repository::new("dotnet", "aspnetcore").unwrap()
    }

    /// An open issue of [`a_repository`] without milestone.
    pub fn an_issue(labels: &[&str]) -> Issue {
        Issue::new(a_repository(), 1).with_labels(labels)
    }

    pub fn untriaged_config() -> UntriagedConfig {
        UntriagedConfig::new(
            LabelSet::new(&[], &["area-"]),
            LabelSet::new(&["bug", "enhancement"], &[]),
            true,
        )
    }

    pub fn fixtures() -> Vec<Issue> {
        vec![
            Issue::new(a_repository(), 1),
            Issue::new(a_repository(), 2)
                .with_labels(&["bug", "area-Meta"])
                .with_milestone("Future"),
            Issue::new(a_repository(), 3)
                .with_labels(&["enhancement"])
                .with_state(IssueState::Closed),
            Issue::new(a_repository(), 4)
                .with_labels(&["bug"])
                .with_kind(IssueKind::PullRequest)
                .with_assignee("karelz"),
            Issue::new(another_repository(), 5)
                .with_labels(&["bug", "area-System.IO", "area-Meta"])
                .with_milestone("8.0.0"),
            Issue::new(another_repository(), 6)
                .with_labels(&["help wanted"])
                .with_kind(IssueKind::Comment),
            Issue::new(a_third_repository(), 7)
                .with_labels(&["bug"])
                .with_state(IssueState::Closed)
                .with_assignee("danmoseley"),
            Issue::new(a_third_repository(), 8)
                .with_labels(&["area-Meta", "enhancement"])
                .with_milestone("Future"),
        ]
    }
}

pub mod strategies {
    use super::issues::{a_repository, a_third_repository, another_repository, untriaged_config};
    use crate::{
        ast::{Expression, Pattern},
        issues::{Issue, IssueKind, IssueState},
        multi_repo::MultiRepo,
    };
    use proptest::{collection::vec, option, prelude::*, sample::select, sample::subsequence};
    use std::sync::Arc;

    static LABELS: [&str; 5] = ["bug", "enhancement", "area-Meta", "area-System.IO", "blocked"];
    static MILESTONES: [&str; 2] = ["8.0.0", "Future"];
    static ASSIGNEES: [&str; 2] = ["karelz", "danmoseley"];

    fn arbitrary_leaf() -> impl Strategy<Value = Expression> {
        prop_oneof![
            any::<bool>().prop_map(Expression::constant),
            select(&LABELS[..]).prop_map(Expression::label),
            Just(Expression::label_pattern(Pattern::new("^area-").unwrap())),
            option::of(select(&MILESTONES[..])).prop_map(|milestone| match milestone {
                Some(milestone) => Expression::milestone(milestone),
                None => Expression::no_milestone(),
            }),
            Just(Expression::milestone_pattern(Pattern::new(r"^\d").unwrap())),
            option::of(select(&ASSIGNEES[..])).prop_map(|assignee| match assignee {
                Some(assignee) => Expression::assignee(assignee),
                None => Expression::no_assignee(),
            }),
            any::<bool>().prop_map(Expression::issue_kind),
            any::<bool>().prop_map(Expression::open),
            Just(Expression::untriaged(Arc::new(untriaged_config()))),
        ]
    }

    pub fn arbitrary_expression() -> impl Strategy<Value = Expression> {
        arbitrary_leaf().prop_recursive(4, 32, 4, |inner| {
            prop_oneof![
                inner.clone().prop_map(|expression| !expression),
                vec(inner.clone(), 1..4).prop_map(Expression::and),
                vec(inner.clone(), 1..4).prop_map(Expression::or),
                (
                    option::of(inner.clone()),
                    option::of(inner.clone()),
                    option::of(inner)
                )
                    .prop_map(|(first, second, default)| {
                        let entries = [
                            first.map(|expression| (Some(a_repository()), expression)),
                            second.map(|expression| (Some(another_repository()), expression)),
                            default.map(|expression| (None, expression)),
                        ];
                        let multi_repo = MultiRepo::new(entries.into_iter().flatten()).unwrap();
                        Expression::multi_repo(multi_repo)
                    }),
            ]
        })
    }

    fn arbitrary_issue() -> impl Strategy<Value = Issue> {
        (
            select(vec![a_repository(), another_repository(), a_third_repository()]),
            subsequence(&LABELS[..], 0..=LABELS.len()),
            option::of(select(&MILESTONES[..])),
            option::of(select(&ASSIGNEES[..])),
            any::<bool>(),
            select(vec![IssueKind::Issue, IssueKind::PullRequest, IssueKind::Comment]),
        )
            .prop_map(|(repository, labels, milestone, assignee, is_open, kind)| {
                let mut issue = Issue::new(repository, 1)
                    .with_labels(&labels)
                    .with_kind(kind)
                    .with_state(if is_open {
                        IssueState::Open
                    } else {
                        IssueState::Closed
                    });
                if let Some(milestone) = milestone {
                    issue = issue.with_milestone(milestone);
                }
                if let Some(assignee) = assignee {
                    issue = issue.with_assignee(assignee);
                }
                issue
            })
    }

    pub fn arbitrary_issues() -> impl Strategy<Value = Vec<Issue>> {
        vec(arbitrary_issue(), 1..16)
    }
}

/// A deep copy of the expression that shares no memoized state with the original.
pub fn rebuild(expression: &Expression) -> Expression {
    match expression.kind() {
        ExpressionKind::Not(operand) => !rebuild(operand),
        ExpressionKind::And(operands) => Expression::and(operands.iter().map(rebuild).collect()),
        ExpressionKind::Or(operands) => Expression::or(operands.iter().map(rebuild).collect()),
        ExpressionKind::MultiRepo(multi_repo) => Expression::multi_repo(MultiRepo::from_parts(
            multi_repo
                .iter()
                .map(|(repository, expression)| (repository.clone(), rebuild(expression)))
                .collect(),
            rebuild(multi_repo.default_expression()),
        )),
        kind => Expression::new(kind.clone()),
    }
}
