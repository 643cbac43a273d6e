//! Which settings field lives in which file, and who wins on load.

/// The file a field is persisted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// `~/.settings.json`: identity shared across projects.
    Global,
    /// `.dropstack.json`: per-project deployment settings.
    Project,
    /// Transient fields that are never written anywhere.
    Neither,
}

/// How a caller-supplied override combines with on-disk data in `load`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideRule {
    /// File data overwrites the override.
    FileWins,
    /// A truthy override is reasserted over file data.
    OverrideWins,
    /// Like `OverrideWins`, but empty arrays and strings are ignored.
    OverrideWinsIfNonEmpty,
}

#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub placement: Placement,
    pub rule: OverrideRule,
}

const fn field(name: &'static str, placement: Placement, rule: OverrideRule) -> Field {
    Field {
        name,
        placement,
        rule,
    }
}

use self::OverrideRule::*;
use self::Placement::*;

/// Every field with special handling. Anything not listed is a
/// `Project` field where file data wins.
pub const FIELDS: &[Field] = &[
    field("username", Global, FileWins),
    field("token", Global, FileWins),
    field("url", Global, OverrideWins),
    field("version", Global, FileWins),
    field("support-stateful", Global, FileWins),
    field("password", Neither, FileWins),
    field("message", Neither, FileWins),
    field("tarPath", Neither, FileWins),
    field("id", Neither, FileWins),
    field("metadata", Neither, FileWins),
    field("login", Neither, FileWins),
    field("signedUpAt", Neither, FileWins),
    field("alias", Project, OverrideWins),
    field("domain", Project, OverrideWins),
    field("instances", Project, OverrideWins),
    field("variables", Project, OverrideWins),
    field("https", Project, OverrideWins),
    field("aliveEndpoint", Project, OverrideWins),
    field("type", Project, OverrideWins),
    field("stateful", Project, OverrideWins),
    field("mappings", Project, OverrideWins),
    field("excludes", Project, OverrideWinsIfNonEmpty),
];

pub fn lookup(name: &str) -> Option<&'static Field> {
    FIELDS.iter().find(|f| f.name == name)
}

pub fn placement(name: &str) -> Placement {
    lookup(name).map_or(Project, |f| f.placement)
}

/// Fields reasserted from the overrides after the file merge.
pub fn reasserted() -> impl Iterator<Item = &'static Field> {
    FIELDS.iter().filter(|f| f.rule != FileWins)
}
