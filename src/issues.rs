use crate::error::ConfigError;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{
    collections::{HashMap, HashSet},
    fmt::{Display, Formatter},
    str::FromStr,
};

const GITHUB_URL: &str = "https://github.com";

/// The identity of a repository (`owner/name`).
///
/// Repository names are case-insensitive, so both parts are stored lowercased.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Repository {
    owner: String,
    name: String,
}

impl Repository {
    pub fn new(owner: &str, name: &str) -> Result<Self, ConfigError> {
        let is_valid = |part: &str| {
            !part.is_empty() && !part.contains('/') && !part.chars().any(char::is_whitespace)
        };
        if !is_valid(owner) || !is_valid(name) {
            return Err(ConfigError::InvalidRepository(format!("{owner}/{name}")));
        }

        Ok(Self {
            owner: owner.to_ascii_lowercase(),
            name: name.to_ascii_lowercase(),
        })
    }

    #[inline]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The stable key of the repository, i.e. `owner/name`.
    #[inline]
    pub fn key(&self) -> String {
        self.to_string()
    }

    pub fn html_url(&self) -> String {
        format!("{GITHUB_URL}/{}/{}", self.owner, self.name)
    }
}

impl FromStr for Repository {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (owner, name) = value
            .trim()
            .split_once('/')
            .ok_or_else(|| ConfigError::InvalidRepository(value.to_string()))?;
        Self::new(owner, name)
    }
}

impl TryFrom<String> for Repository {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Repository> for String {
    fn from(repository: Repository) -> Self {
        repository.to_string()
    }
}

impl Display for Repository {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}/{}", self.owner, self.name)
    }
}

/// The repositories known to a configuration, in definition order.
#[derive(Clone, Debug, Default)]
pub struct RepositoryRegistry {
    by_names: HashMap<Repository, usize>,
    repositories: Vec<Repository>,
}

impl RepositoryRegistry {
    pub fn new(repositories: &[Repository]) -> Result<Self, ConfigError> {
        let size = repositories.len();
        let mut by_names = HashMap::with_capacity(size);
        let mut ordered = Vec::with_capacity(size);
        for (i, repository) in repositories.iter().enumerate() {
            if by_names.contains_key(repository) {
                return Err(ConfigError::AlreadyPresent(repository.clone()));
            }

            by_names.insert(repository.clone(), i);
            ordered.push(repository.clone());
        }

        Ok(Self {
            by_names,
            repositories: ordered,
        })
    }

    /// Resolve a repository from its `owner/name` key.
    pub fn by_name(&self, name: &str) -> Option<&Repository> {
        let repository = name.parse::<Repository>().ok()?;
        self.by_names
            .get(&repository)
            .map(|index| &self.repositories[*index])
    }

    #[inline]
    pub fn contains(&self, repository: &Repository) -> bool {
        self.by_names.contains_key(repository)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Repository> {
        self.repositories.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueState {
    #[default]
    Open,
    Closed,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    #[default]
    Issue,
    PullRequest,
    Comment,
}

impl IssueKind {
    /// Comments belong to issues; only pull requests are not issues.
    #[inline]
    pub fn is_issue(&self) -> bool {
        !matches!(self, Self::PullRequest)
    }
}

/// An issue-tracker record as seen by the queries.
///
/// # Examples
///
/// ```rust
/// use triage_query::{Issue, IssueState, Repository};
///
/// let repository: Repository = "dotnet/runtime".parse().unwrap();
/// let issue = Issue::new(repository, 42)
///     .with_labels(&["bug", "area-System.Net"])
///     .with_milestone("8.0.0")
///     .with_state(IssueState::Closed);
///
/// assert!(issue.has_label("BUG"));
/// assert!(!issue.is_open());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    number: u64,
    repository: Repository,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    milestone: Option<String>,
    #[serde(default)]
    assignee: Option<String>,
    #[serde(default)]
    state: IssueState,
    #[serde(default)]
    kind: IssueKind,
}

impl Issue {
    pub fn new(repository: Repository, number: u64) -> Self {
        Self {
            number,
            repository,
            labels: vec![],
            milestone: None,
            assignee: None,
            state: IssueState::Open,
            kind: IssueKind::Issue,
        }
    }

    /// Deserialize a JSON array of issues, e.g. from an issue cache file.
    pub fn from_json_list(content: &str) -> Result<Vec<Self>, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Add the labels, ignoring the ones that are already present.
    pub fn with_labels(mut self, labels: &[&str]) -> Self {
        let labels = labels
            .iter()
            .filter(|label| !self.has_label(label))
            .map(|label| label.to_string())
            .unique_by(|label| label.to_ascii_lowercase())
            .collect_vec();
        self.labels.extend(labels);
        self
    }

    pub fn with_milestone(mut self, milestone: &str) -> Self {
        self.milestone = Some(milestone.to_string());
        self
    }

    pub fn with_assignee(mut self, assignee: &str) -> Self {
        self.assignee = Some(assignee.to_string());
        self
    }

    pub fn with_state(mut self, state: IssueState) -> Self {
        self.state = state;
        self
    }

    pub fn with_kind(mut self, kind: IssueKind) -> Self {
        self.kind = kind;
        self
    }

    #[inline]
    pub fn number(&self) -> u64 {
        self.number
    }

    #[inline]
    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    #[inline]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    #[inline]
    pub fn milestone(&self) -> Option<&str> {
        self.milestone.as_deref()
    }

    #[inline]
    pub fn assignee(&self) -> Option<&str> {
        self.assignee.as_deref()
    }

    #[inline]
    pub fn state(&self) -> IssueState {
        self.state
    }

    #[inline]
    pub fn kind(&self) -> IssueKind {
        self.kind
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.state == IssueState::Open
    }

    pub fn has_label(&self, name: &str) -> bool {
        self.labels
            .iter()
            .any(|label| label.eq_ignore_ascii_case(name))
    }

    pub fn html_url(&self) -> String {
        let segment = match self.kind {
            IssueKind::PullRequest => "pull",
            IssueKind::Issue | IssueKind::Comment => "issues",
        };
        format!("{}/{segment}/{}", self.repository.html_url(), self.number)
    }
}

/// A collection of issues that queries can be checked against.
pub trait IssueCollection {
    fn issues(&self) -> &[Issue];

    fn has_label(&self, name: &str) -> bool;

    fn has_milestone(&self, name: &str) -> bool;

    fn has_assignee(&self, name: &str) -> bool;
}

/// An [`IssueCollection`] that indexes the names used by its issues.
#[derive(Clone, Debug, Default)]
pub struct IssueSet {
    issues: Vec<Issue>,
    labels: HashSet<String>,
    milestones: HashSet<String>,
    assignees: HashSet<String>,
}

impl IssueSet {
    pub fn new(issues: Vec<Issue>) -> Self {
        let labels = issues
            .iter()
            .flat_map(|issue| issue.labels.iter())
            .map(|label| label.to_ascii_lowercase())
            .collect();
        let milestones = issues
            .iter()
            .filter_map(|issue| issue.milestone())
            .map(str::to_ascii_lowercase)
            .collect();
        let assignees = issues
            .iter()
            .filter_map(|issue| issue.assignee())
            .map(str::to_ascii_lowercase)
            .collect();
        Self {
            issues,
            labels,
            milestones,
            assignees,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

impl FromIterator<Issue> for IssueSet {
    fn from_iter<I: IntoIterator<Item = Issue>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl IssueCollection for IssueSet {
    #[inline]
    fn issues(&self) -> &[Issue] {
        &self.issues
    }

    fn has_label(&self, name: &str) -> bool {
        self.labels.contains(&name.to_ascii_lowercase())
    }

    fn has_milestone(&self, name: &str) -> bool {
        self.milestones.contains(&name.to_ascii_lowercase())
    }

    fn has_assignee(&self, name: &str) -> bool {
        self.assignees.contains(&name.to_ascii_lowercase())
    }
}
