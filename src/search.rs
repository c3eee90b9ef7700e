use crate::{
    ast::{Expression, ExpressionKind},
    issues::{Repository, RepositoryRegistry},
};
use std::fmt::{Display, Formatter};

const SEARCH_URL: &str = "https://github.com/search";

/// A query for the issue tracker's search page, optionally scoped to a repository.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchQuery {
    repository: Option<Repository>,
    query: String,
}

impl SearchQuery {
    pub fn new(repository: Option<Repository>, query: impl Into<String>) -> Self {
        Self {
            repository,
            query: query.into(),
        }
    }

    #[inline]
    pub fn repository(&self) -> Option<&Repository> {
        self.repository.as_ref()
    }

    #[inline]
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn url(&self) -> String {
        let query = urlencoding::encode(&self.query);
        match &self.repository {
            Some(repository) => format!("{}/issues?q={query}", repository.html_url()),
            None => format!("{SEARCH_URL}?q={query}&type=issues"),
        }
    }
}

impl Display for SearchQuery {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.repository {
            Some(repository) if self.query.is_empty() => write!(formatter, "repo:{repository}"),
            Some(repository) => write!(formatter, "repo:{repository} {}", self.query),
            None => write!(formatter, "{}", self.query),
        }
    }
}

impl Expression {
    /// Translate the expression into a search query, or `None` when the search syntax cannot
    /// express it.
    ///
    /// # Examples
    ///
    /// ```
    /// use triage_query::{CustomLeaves, parse};
    ///
    /// let leaves = CustomLeaves::default();
    /// let query = parse(r#"label:"help wanted" -label:bug is:open"#, &leaves)
    ///     .unwrap()
    ///     .to_search_query()
    ///     .unwrap();
    ///
    /// assert_eq!(r#"label:"help wanted" -label:"bug" is:open"#, query.query());
    /// assert!(parse("label:bug OR is:open", &leaves).unwrap().to_search_query().is_none());
    /// ```
    pub fn to_search_query(&self) -> Option<SearchQuery> {
        match self.kind() {
            ExpressionKind::MultiRepo(multi_repo)
                if multi_repo.len() == 1 && multi_repo.default_expression().is_constant(false) =>
            {
                let (repository, expression) = multi_repo.iter().next()?;
                fragment(expression).map(|query| SearchQuery::new(Some(repository.clone()), query))
            }
            _ => fragment(self).map(|query| SearchQuery::new(None, query)),
        }
    }

    /// One search query per repository of the registry that the expression can match, with
    /// `None` for the repositories whose expression cannot be translated.
    pub fn search_links<'a>(
        &self,
        registry: &'a RepositoryRegistry,
    ) -> Vec<(&'a Repository, Option<SearchQuery>)> {
        registry
            .iter()
            .filter_map(|repository| {
                let expression = match self.kind() {
                    ExpressionKind::MultiRepo(multi_repo) => multi_repo.get_expression(repository),
                    _ => self,
                };
                if expression.is_constant(false) {
                    return None;
                }
                let query = fragment(expression)
                    .map(|query| SearchQuery::new(Some(repository.clone()), query));
                Some((repository, query))
            })
            .collect()
    }
}

fn fragment(expression: &Expression) -> Option<String> {
    match expression.kind() {
        ExpressionKind::Constant(true) => Some(String::new()),
        ExpressionKind::Label(name) => Some(format!("label:{}", quoted(name))),
        ExpressionKind::Milestone(Some(name)) => Some(format!("milestone:{}", value(name))),
        ExpressionKind::Milestone(None) => Some("no:milestone".to_string()),
        ExpressionKind::Assignee(Some(name)) => Some(format!("assignee:{}", value(name))),
        ExpressionKind::Assignee(None) => Some("no:assignee".to_string()),
        ExpressionKind::IsIssueKind(is_issue) => Some(issue_kind(*is_issue).to_string()),
        ExpressionKind::IsOpen(is_open) => Some(state(*is_open).to_string()),
        ExpressionKind::Not(operand) => negated_fragment(operand),
        ExpressionKind::And(operands) => {
            let fragments = operands
                .iter()
                .map(fragment)
                .collect::<Option<Vec<_>>>()?;
            Some(
                fragments
                    .into_iter()
                    .filter(|fragment| !fragment.is_empty())
                    .collect::<Vec<_>>()
                    .join(" "),
            )
        }
        ExpressionKind::Constant(false)
        | ExpressionKind::LabelPattern(_)
        | ExpressionKind::MilestonePattern(_)
        | ExpressionKind::Untriaged(_)
        | ExpressionKind::Or(_)
        | ExpressionKind::MultiRepo(_) => None,
    }
}

fn negated_fragment(operand: &Expression) -> Option<String> {
    match operand.kind() {
        ExpressionKind::Constant(value) => fragment(&Expression::constant(!value)),
        ExpressionKind::Label(name) => Some(format!("-label:{}", quoted(name))),
        ExpressionKind::Milestone(Some(name)) => Some(format!("-milestone:{}", value(name))),
        ExpressionKind::Assignee(Some(name)) => Some(format!("-assignee:{}", value(name))),
        ExpressionKind::IsIssueKind(is_issue) => Some(issue_kind(!is_issue).to_string()),
        ExpressionKind::IsOpen(is_open) => Some(state(!is_open).to_string()),
        ExpressionKind::Not(negated) => fragment(negated),
        _ => None,
    }
}

#[inline]
fn issue_kind(is_issue: bool) -> &'static str {
    if is_issue {
        "is:issue"
    } else {
        "is:pr"
    }
}

#[inline]
fn state(is_open: bool) -> &'static str {
    if is_open {
        "is:open"
    } else {
        "is:closed"
    }
}

fn value(name: &str) -> String {
    if name.chars().any(char::is_whitespace) {
        quoted(name)
    } else {
        name.to_string()
    }
}

fn quoted(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::Pattern,
        multi_repo::MultiRepo,
        test_utils::{
            expressions::{and, label, not, or},
            issues::{a_repository, a_third_repository, another_repository, untriaged_config},
        },
    };
    use std::sync::Arc;

    fn query_of(expression: &Expression) -> Option<String> {
        expression
            .to_search_query()
            .map(|query| query.query().to_string())
    }

    fn registry() -> RepositoryRegistry {
        RepositoryRegistry::new(&[a_repository(), another_repository(), a_third_repository()])
            .unwrap()
    }

    #[test]
    fn can_translate_leaves() {
        assert_eq!(Some(r#"label:"bug""#.to_string()), query_of(&label!("bug")));
        assert_eq!(
            Some("milestone:8.0.0".to_string()),
            query_of(&Expression::milestone("8.0.0"))
        );
        assert_eq!(
            Some("no:milestone".to_string()),
            query_of(&Expression::no_milestone())
        );
        assert_eq!(
            Some("assignee:karelz".to_string()),
            query_of(&Expression::assignee("karelz"))
        );
        assert_eq!(
            Some("no:assignee".to_string()),
            query_of(&Expression::no_assignee())
        );
        assert_eq!(
            Some("is:issue".to_string()),
            query_of(&Expression::issue_kind(true))
        );
        assert_eq!(
            Some("is:pr".to_string()),
            query_of(&Expression::issue_kind(false))
        );
        assert_eq!(
            Some("is:closed".to_string()),
            query_of(&Expression::open(false))
        );
    }

    #[test]
    fn can_quote_values_with_spaces() {
        assert_eq!(
            Some(r#"milestone:"Future release""#.to_string()),
            query_of(&Expression::milestone("Future release"))
        );
    }

    #[test]
    fn can_translate_negated_leaves() {
        assert_eq!(
            Some(r#"-label:"bug""#.to_string()),
            query_of(&not!(label!("bug")))
        );
        assert_eq!(
            Some("-milestone:Future".to_string()),
            query_of(&not!(Expression::milestone("Future")))
        );
        assert_eq!(
            Some("-assignee:karelz".to_string()),
            query_of(&not!(Expression::assignee("karelz")))
        );
        assert_eq!(
            Some("is:open".to_string()),
            query_of(&not!(Expression::open(false)))
        );
        assert_eq!(
            Some("is:issue".to_string()),
            query_of(&not!(Expression::issue_kind(false)))
        );
        assert_eq!(Some(r#"label:"bug""#.to_string()), query_of(&not!(not!(label!("bug")))));
    }

    #[test]
    fn can_translate_a_conjunction() {
        let expression = and!(label!("bug"), Expression::open(true), Expression::no_milestone());

        assert_eq!(
            Some(r#"label:"bug" is:open no:milestone"#.to_string()),
            query_of(&expression)
        );
    }

    #[test]
    fn true_translates_to_an_empty_query() {
        assert_eq!(Some(String::new()), query_of(&Expression::constant(true)));
        assert_eq!(
            Some(r#"label:"bug""#.to_string()),
            query_of(&and!(Expression::constant(true), label!("bug")))
        );
    }

    #[test]
    fn return_none_for_untranslatable_expressions() {
        assert_eq!(None, query_of(&Expression::constant(false)));
        assert_eq!(None, query_of(&or!(label!("a"), label!("b"))));
        assert_eq!(
            None,
            query_of(&Expression::label_pattern(Pattern::new("^area-").unwrap()))
        );
        assert_eq!(
            None,
            query_of(&Expression::untriaged(Arc::new(untriaged_config())))
        );
        assert_eq!(None, query_of(&not!(Expression::no_milestone())));
        assert_eq!(None, query_of(&not!(and!(label!("a"), label!("b")))));
        assert_eq!(
            None,
            query_of(&and!(label!("a"), or!(label!("b"), label!("c"))))
        );
    }

    #[test]
    fn can_scope_a_single_repository_query() {
        let expression = Expression::multi_repo(
            MultiRepo::new([(Some(a_repository()), label!("bug"))]).unwrap(),
        );

        let query = expression.to_search_query().unwrap();

        assert_eq!(Some(&a_repository()), query.repository());
        assert_eq!(
            "https://github.com/dotnet/runtime/issues?q=label%3A%22bug%22",
            query.url()
        );
        assert_eq!(r#"repo:dotnet/runtime label:"bug""#, query.to_string());
    }

    #[test]
    fn return_none_for_several_repositories() {
        let expression = Expression::multi_repo(
            MultiRepo::new([
                (Some(a_repository()), label!("bug")),
                (Some(another_repository()), label!("bug")),
            ])
            .unwrap(),
        );
        let with_default = Expression::multi_repo(
            MultiRepo::new([(Some(a_repository()), label!("bug")), (None, label!("a"))]).unwrap(),
        );

        assert_eq!(None, expression.to_search_query());
        assert_eq!(None, with_default.to_search_query());
    }

    #[test]
    fn can_build_a_global_search_url() {
        let query = and!(label!("bug"), Expression::open(true))
            .to_search_query()
            .unwrap();

        assert_eq!(
            "https://github.com/search?q=label%3A%22bug%22%20is%3Aopen&type=issues",
            query.url()
        );
    }

    #[test]
    fn can_list_a_link_per_repository() {
        let expression = Expression::multi_repo(
            MultiRepo::new([
                (Some(a_repository()), label!("bug")),
                (Some(another_repository()), or!(label!("a"), label!("b"))),
            ])
            .unwrap(),
        );

        let registry = registry();
        let links = expression.search_links(&registry);

        assert_eq!(2, links.len());
        assert_eq!(&a_repository(), links[0].0);
        assert_eq!(
            Some(SearchQuery::new(Some(a_repository()), r#"label:"bug""#)),
            links[0].1
        );
        assert_eq!(&another_repository(), links[1].0);
        assert_eq!(None, links[1].1);
    }

    #[test]
    fn can_list_a_link_for_every_repository_of_a_plain_expression() {
        let registry = registry();
        let links = label!("bug").search_links(&registry);

        assert_eq!(3, links.len());
        assert!(links.iter().all(|(_, query)| query.is_some()));
    }
}
