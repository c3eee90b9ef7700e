use crate::{
    ast::{Expression, Pattern},
    error::{ConfigError, ParseError},
    issues::{Issue, Repository, RepositoryRegistry},
    multi_repo::MultiRepo,
    parser::{parse, CustomLeaves, BUILT_IN_IS_VALUES},
    search::SearchQuery,
    untriaged::UntriagedConfig,
};
use serde::Deserialize;
use std::{collections::HashMap, path::Path, sync::Arc};
use tracing::{debug, info};

const UNTRIAGED: &str = "untriaged";

/// The JSON definition of the repositories, custom leaves and named queries.
///
/// # Examples
///
/// ```
/// use triage_query::TriageConfig;
///
/// let catalog = TriageConfig::from_json(r#"{
///     "repositories": ["dotnet/runtime", "dotnet/corefx"],
///     "queries": [
///         { "name": "bugs", "query": "label:bug is:open" },
///         { "name": "areas", "variants": [
///             { "repository": "dotnet/runtime", "query": "label:area-Meta" },
///             { "query": "label:area-Infrastructure" }
///         ] }
///     ]
/// }"#).unwrap().build().unwrap();
///
/// assert_eq!(2, catalog.queries().len());
/// assert!(catalog.get("Bugs").is_some());
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TriageConfig {
    repositories: Vec<Repository>,
    untriaged: UntriagedConfig,
    custom_leaves: Vec<CustomLeafDefinition>,
    queries: Vec<QueryDefinition>,
}

/// An `is:<name>` leaf, defined by a query or by a pattern over the label or milestone names.
#[derive(Clone, Debug, Deserialize)]
pub struct CustomLeafDefinition {
    name: String,
    #[serde(flatten)]
    definition: LeafDefinition,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum LeafDefinition {
    Query(String),
    LabelPattern(String),
    MilestonePattern(String),
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryDefinition {
    name: String,
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    variants: Vec<QueryVariant>,
}

/// The query of a single repository, or the default query when no repository is given.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryVariant {
    #[serde(default)]
    repository: Option<Repository>,
    query: String,
}

impl TriageConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading triage configuration");
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Resolve the repositories, parse every custom leaf and query, and index the queries by
    /// name.
    pub fn build(&self) -> Result<QueryCatalog, ConfigError> {
        let repositories = RepositoryRegistry::new(&self.repositories)?;

        let mut custom_leaves = CustomLeaves::new();
        custom_leaves.insert(
            UNTRIAGED,
            Expression::untriaged(Arc::new(self.untriaged.clone())),
        );
        for leaf in &self.custom_leaves {
            if BUILT_IN_IS_VALUES
                .iter()
                .any(|name| name.eq_ignore_ascii_case(&leaf.name))
            {
                return Err(ConfigError::DuplicateName(leaf.name.clone()));
            }
            let expression = leaf.build(&custom_leaves)?;
            if custom_leaves.insert(&leaf.name, expression).is_some() {
                return Err(ConfigError::DuplicateName(leaf.name.clone()));
            }
        }

        let mut queries = Vec::with_capacity(self.queries.len());
        let mut by_names = HashMap::with_capacity(self.queries.len());
        for definition in &self.queries {
            let expression = definition.build(&repositories, &custom_leaves)?;
            if by_names
                .insert(definition.name.to_ascii_lowercase(), queries.len())
                .is_some()
            {
                return Err(ConfigError::DuplicateName(definition.name.clone()));
            }
            debug!(name = %definition.name, %expression, "added query");
            queries.push(NamedQuery {
                name: definition.name.clone(),
                expression,
            });
        }

        Ok(QueryCatalog {
            repositories,
            custom_leaves,
            queries,
            by_names,
        })
    }
}

impl CustomLeafDefinition {
    fn build(&self, custom_leaves: &CustomLeaves) -> Result<Expression, ConfigError> {
        let pattern = |pattern: &str| {
            Pattern::new(pattern).map_err(|source| ConfigError::Pattern {
                name: self.name.clone(),
                source,
            })
        };
        match &self.definition {
            LeafDefinition::Query(query) => {
                parse(query, custom_leaves).map_err(|source| ConfigError::Query {
                    name: self.name.clone(),
                    source,
                })
            }
            LeafDefinition::LabelPattern(label) => Ok(Expression::label_pattern(pattern(label)?)),
            LeafDefinition::MilestonePattern(milestone) => {
                Ok(Expression::milestone_pattern(pattern(milestone)?))
            }
        }
    }
}

impl QueryDefinition {
    fn build(
        &self,
        repositories: &RepositoryRegistry,
        custom_leaves: &CustomLeaves,
    ) -> Result<Expression, ConfigError> {
        let parse_query = |query: &str| {
            parse(query, custom_leaves).map_err(|source| ConfigError::Query {
                name: self.name.clone(),
                source,
            })
        };

        if self.variants.is_empty() {
            return match &self.query {
                Some(query) => parse_query(query),
                None => Err(ConfigError::EmptyQuery(self.name.clone())),
            };
        }

        let mut entries = Vec::with_capacity(self.variants.len() + 1);
        for variant in &self.variants {
            if let Some(repository) = &variant.repository {
                if !repositories.contains(repository) {
                    return Err(ConfigError::UnknownRepository {
                        name: self.name.clone(),
                        repository: repository.clone(),
                    });
                }
            }
            entries.push((variant.repository.clone(), parse_query(&variant.query)?));
        }
        if let Some(query) = &self.query {
            entries.push((None, parse_query(query)?));
        }

        let multi_repo = MultiRepo::new(entries).map_err(|source| ConfigError::Construction {
            name: self.name.clone(),
            source,
        })?;
        Ok(Expression::multi_repo(multi_repo))
    }
}

/// A query of the catalog.
#[derive(Clone, Debug)]
pub struct NamedQuery {
    name: String,
    expression: Expression,
}

impl NamedQuery {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn matches<'a, I>(&self, issues: I) -> Vec<&'a Issue>
    where
        I: IntoIterator<Item = &'a Issue>,
    {
        self.expression.filter(issues)
    }

    /// The search query of the normalized expression, when it has one.
    pub fn search_query(&self) -> Option<SearchQuery> {
        self.expression.normalize().to_search_query()
    }
}

/// The repositories, custom leaves and named queries built from a [`TriageConfig`].
#[derive(Clone, Debug)]
pub struct QueryCatalog {
    repositories: RepositoryRegistry,
    custom_leaves: CustomLeaves,
    queries: Vec<NamedQuery>,
    by_names: HashMap<String, usize>,
}

impl QueryCatalog {
    #[inline]
    pub fn repositories(&self) -> &RepositoryRegistry {
        &self.repositories
    }

    #[inline]
    pub fn custom_leaves(&self) -> &CustomLeaves {
        &self.custom_leaves
    }

    /// The queries, in their definition order.
    #[inline]
    pub fn queries(&self) -> &[NamedQuery] {
        &self.queries
    }

    pub fn get(&self, name: &str) -> Option<&NamedQuery> {
        self.by_names
            .get(&name.to_ascii_lowercase())
            .map(|index| &self.queries[*index])
    }

    /// Parse an ad hoc query with the custom leaves of the catalog.
    pub fn parse(&self, query: &str) -> Result<Expression, ParseError> {
        parse(query, &self.custom_leaves)
    }
}
