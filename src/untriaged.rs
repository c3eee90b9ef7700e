use crate::issues::{Issue, IssueKind};
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    ops::BitOr,
};

/// A set of labels, matched by exact name or by prefix (case-insensitive).
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelSet {
    names: Vec<String>,
    prefixes: Vec<String>,
}

impl LabelSet {
    pub fn new(names: &[&str], prefixes: &[&str]) -> Self {
        Self {
            names: names.iter().map(|name| name.to_string()).collect(),
            prefixes: prefixes.iter().map(|prefix| prefix.to_string()).collect(),
        }
    }

    pub fn contains(&self, label: &str) -> bool {
        self.names.iter().any(|name| name.eq_ignore_ascii_case(label))
            || self.prefixes.iter().any(|prefix| {
                label.len() >= prefix.len()
                    && label.is_char_boundary(prefix.len())
                    && label[..prefix.len()].eq_ignore_ascii_case(prefix)
            })
    }

    #[inline]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    fn count(&self, labels: &[String]) -> usize {
        labels.iter().filter(|label| self.contains(label)).count()
    }
}

/// The label sets deciding whether an issue has been triaged.
///
/// An issue is triaged once it has exactly one area label, exactly one issue type label and, if
/// required, a milestone. Pull requests are never considered untriaged.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UntriagedConfig {
    area_labels: LabelSet,
    issue_type_labels: LabelSet,
    require_milestone: bool,
}

impl UntriagedConfig {
    pub fn new(
        area_labels: LabelSet,
        issue_type_labels: LabelSet,
        require_milestone: bool,
    ) -> Self {
        Self {
            area_labels,
            issue_type_labels,
            require_milestone,
        }
    }

    #[inline]
    pub fn area_labels(&self) -> &LabelSet {
        &self.area_labels
    }

    #[inline]
    pub fn issue_type_labels(&self) -> &LabelSet {
        &self.issue_type_labels
    }

    pub fn flags(&self, issue: &Issue) -> UntriagedFlags {
        if issue.kind() == IssueKind::PullRequest {
            return UntriagedFlags::empty();
        }

        let mut flags = UntriagedFlags::empty();
        match self.area_labels.count(issue.labels()) {
            0 => flags.insert(UntriagedFlags::MISSING_AREA),
            1 => {}
            _ => flags.insert(UntriagedFlags::MULTIPLE_AREAS),
        }
        match self.issue_type_labels.count(issue.labels()) {
            0 => flags.insert(UntriagedFlags::MISSING_ISSUE_TYPE),
            1 => {}
            _ => flags.insert(UntriagedFlags::MULTIPLE_ISSUE_TYPES),
        }
        if self.require_milestone && issue.milestone().is_none() {
            flags.insert(UntriagedFlags::MISSING_MILESTONE);
        }

        flags
    }

    #[inline]
    pub fn is_untriaged(&self, issue: &Issue) -> bool {
        !self.flags(issue).is_empty()
    }
}

/// The reasons why an issue is untriaged.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct UntriagedFlags(u8);

impl UntriagedFlags {
    pub const MISSING_AREA: Self = Self(1 << 0);
    pub const MULTIPLE_AREAS: Self = Self(1 << 1);
    pub const MISSING_ISSUE_TYPE: Self = Self(1 << 2);
    pub const MULTIPLE_ISSUE_TYPES: Self = Self(1 << 3);
    pub const MISSING_MILESTONE: Self = Self(1 << 4);

    const DESCRIPTIONS: [(Self, &'static str); 5] = [
        (Self::MISSING_AREA, "missing area label"),
        (Self::MULTIPLE_AREAS, "multiple area labels"),
        (Self::MISSING_ISSUE_TYPE, "missing issue type label"),
        (Self::MULTIPLE_ISSUE_TYPES, "multiple issue type labels"),
        (Self::MISSING_MILESTONE, "missing milestone"),
    ];

    #[inline]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl BitOr for UntriagedFlags {
    type Output = Self;

    fn bitor(self, other: Self) -> Self::Output {
        Self(self.0 | other.0)
    }
}

impl Display for UntriagedFlags {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        let mut descriptions = Self::DESCRIPTIONS
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, description)| *description);
        match descriptions.next() {
            None => write!(formatter, "triaged"),
            Some(first) => {
                write!(formatter, "{first}")?;
                descriptions.try_for_each(|description| write!(formatter, ", {description}"))
            }
        }
    }
}
