//! A small boolean query language to filter, normalize and translate issue-tracker triage
//! queries.
//!
//! # Examples
//!
//! Filtering some issues and linking to the equivalent search:
//!
//! ```
//! use triage_query::{CustomLeaves, Issue, IssueState, Repository, parse};
//!
//! let runtime: Repository = "dotnet/runtime".parse().unwrap();
//! let issues = vec![
//!     Issue::new(runtime.clone(), 1).with_labels(&["bug", "area-Meta"]),
//!     Issue::new(runtime.clone(), 2).with_labels(&["bug"]).with_state(IssueState::Closed),
//!     Issue::new(runtime, 3).with_labels(&["enhancement"]),
//! ];
//!
//! // Parse the query
//! let expression = parse("label:bug AND is:open", &CustomLeaves::default()).unwrap();
//!
//! // Search for the matching issues
//! let matches = expression.filter(&issues);
//! assert_eq!(vec![1], matches.iter().map(|issue| issue.number()).collect::<Vec<_>>());
//!
//! // Link to the same search on the issue tracker
//! let query = expression.normalize().to_search_query().unwrap();
//! assert_eq!("https://github.com/search?q=label%3A%22bug%22%20is%3Aopen&type=issues", query.url());
//! ```
//!
//! # Domain Specific Language (DSL)
//!
//! A query is made of `key:value` leaves combined with boolean operators:
//!
//! * Boolean operators: `AND` (`&&`, or simply juxtaposing two operands), `OR` (`||`) and
//!   `NOT` (`!`). The keywords are case-insensitive and brackets group sub-expressions;
//! * `label:X` and `-label:X`: the issue has (or does not have) the label `X`;
//! * `milestone:X` and `no:milestone`;
//! * `assignee:X` and `no:assignee`;
//! * `is:issue`, `is:pr`, `is:open` and `is:closed`;
//! * `is:<name>` for the custom leaves supplied by the caller (e.g. `is:untriaged`).
//!
//! Values containing spaces are quoted (`label:"help wanted"`, with `\"` and `\\` escapes).
//! As an example, the following would all be valid queries:
//!
//! ```text
//! label:bug is:open no:milestone
//! (label:area-Meta OR label:area-Infrastructure) && !is:pr
//! is:untriaged -label:"needs more info" NOT assignee:karelz
//! ```
//!
//! # Normalization
//!
//! [`Expression::normalize`] rewrites any expression into an OR of ANDs of (possibly negated)
//! leaves, optionally split per repository by a top-level [`MultiRepo`]:
//!
//! * Negations are pushed down to the leaves with De Morgan's laws;
//! * Nested ANDs and ORs are flattened;
//! * Constants are folded, duplicates removed and `X` next to `!X` collapsed;
//! * ANDs are distributed over their ORs, unless that would produce
//!   [`MAX_DISTRIBUTED_COMBINATIONS`] conjunctions or more;
//! * [`MultiRepo`] sub-expressions are bubbled up to the top of the expression.
mod ast;
mod config;
mod error;
mod evaluation;
mod issues;
mod lexer;
mod multi_repo;
mod normalization;
mod parser;
mod search;
#[cfg(test)]
mod test_utils;
mod untriaged;
mod validation;

pub use crate::{
    ast::{Expression, ExpressionKind, Pattern},
    config::{NamedQuery, QueryCatalog, TriageConfig},
    error::{ConfigError, ConstructionError, ParseError},
    issues::{
        Issue, IssueCollection, IssueKind, IssueSet, IssueState, Repository, RepositoryRegistry,
    },
    lexer::{tokenize, Token, TokenKind},
    multi_repo::MultiRepo,
    normalization::MAX_DISTRIBUTED_COMBINATIONS,
    parser::{parse, CustomLeaves, Parser},
    search::SearchQuery,
    untriaged::{LabelSet, UntriagedConfig, UntriagedFlags},
    validation::ValidationWarning,
};
