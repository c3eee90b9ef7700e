use crate::{ast::Expression, error::ConstructionError, issues::Repository};
use std::collections::{btree_map::Entry, BTreeMap};

/// An expression whose meaning depends on the repository of the issue being evaluated.
///
/// Repositories without a specific expression fall back to the default expression, which is
/// `false` unless one is supplied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultiRepo {
    expressions: BTreeMap<Repository, Expression>,
    default: Expression,
}

impl MultiRepo {
    /// Build from `(repository, expression)` entries where the entry without a repository is the
    /// default expression.
    ///
    /// # Examples
    ///
    /// ```
    /// use triage_query::{Expression, MultiRepo, Repository};
    ///
    /// let runtime: Repository = "dotnet/runtime".parse().unwrap();
    /// let corefx: Repository = "dotnet/corefx".parse().unwrap();
    /// let multi_repo = MultiRepo::new([
    ///     (Some(runtime.clone()), Expression::label("area-Meta")),
    ///     (None, Expression::label("area-Infrastructure")),
    /// ]).unwrap();
    ///
    /// assert_eq!(&Expression::label("area-Meta"), multi_repo.get_expression(&runtime));
    /// assert_eq!(&Expression::label("area-Infrastructure"), multi_repo.get_expression(&corefx));
    /// ```
    pub fn new<I>(entries: I) -> Result<Self, ConstructionError>
    where
        I: IntoIterator<Item = (Option<Repository>, Expression)>,
    {
        let mut expressions = BTreeMap::new();
        let mut default = None;
        for (repository, expression) in entries {
            match repository {
                Some(repository) => match expressions.entry(repository) {
                    Entry::Occupied(entry) => {
                        return Err(ConstructionError::DuplicateRepository(entry.key().clone()))
                    }
                    Entry::Vacant(entry) => {
                        entry.insert(expression);
                    }
                },
                None if default.is_some() => return Err(ConstructionError::DuplicateDefault),
                None => default = Some(expression),
            }
        }

        Ok(Self {
            expressions,
            default: default.unwrap_or_else(|| Expression::constant(false)),
        })
    }

    #[inline]
    pub(crate) fn from_parts(
        expressions: BTreeMap<Repository, Expression>,
        default: Expression,
    ) -> Self {
        Self {
            expressions,
            default,
        }
    }

    #[inline]
    pub fn get_expression(&self, repository: &Repository) -> &Expression {
        self.expressions.get(repository).unwrap_or(&self.default)
    }

    #[inline]
    pub fn default_expression(&self) -> &Expression {
        &self.default
    }

    pub fn repositories(&self) -> impl Iterator<Item = &Repository> {
        self.expressions.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Repository, &Expression)> {
        self.expressions.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.expressions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }
}
