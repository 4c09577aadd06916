//! Namespace resolution for identifiers, functions and type names.
//!
//! A [`Container`] is a dotted namespace such as `acme.billing`. A reference
//! `R` written inside it may mean `acme.billing.R`, `acme.R` or `R`; the
//! container produces those candidates most-qualified first. Aliases
//! (including abbreviations) substitute before any container search.

use std::collections::BTreeMap;

/// Errors building a container, its aliases or abbreviations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContainerError {
    #[error("invalid container name '{0}'")]
    InvalidName(String),
    #[error("invalid qualified name '{0}': expected a dotted name such as 'a.b.c'")]
    InvalidQualifiedName(String),
    #[error("alias '{0}' must be a non-empty simple name")]
    InvalidAlias(String),
    #[error("alias '{alias}' collides with existing reference '{existing}'")]
    AliasCollision { alias: String, existing: String },
    #[error("alias '{alias}' collides with container name '{container}'")]
    ContainerCollision { alias: String, container: String },
}

fn valid_segments(name: &str) -> bool {
    name.split('.').all(|segment| {
        !segment.is_empty()
            && segment
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_')
    })
}

/// Qualified names made referable by their last segment, so that
/// `google.protobuf.Timestamp` can be written `Timestamp`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Abbreviations {
    names: Vec<String>,
}

impl Abbreviations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a qualified name. Two names sharing a last segment collide.
    pub fn add(mut self, qualified: &str) -> Result<Self, ContainerError> {
        let short = short_name(qualified)?;
        if let Some(existing) = self
            .names
            .iter()
            .find(|n| short_name(n).ok() == Some(short))
        {
            return Err(ContainerError::AliasCollision {
                alias: short.to_string(),
                existing: existing.clone(),
            });
        }
        self.names.push(qualified.to_string());
        Ok(self)
    }

    pub fn from_qualified_names(names: &[&str]) -> Result<Self, ContainerError> {
        names
            .iter()
            .try_fold(Self::new(), |abbrevs, name| abbrevs.add(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// The last segment of a qualified name.
fn short_name(qualified: &str) -> Result<&str, ContainerError> {
    let invalid = || ContainerError::InvalidQualifiedName(qualified.to_string());
    if qualified.starts_with('.') || !valid_segments(qualified) {
        return Err(invalid());
    }
    match qualified.rsplit_once('.') {
        Some((_, short)) => Ok(short),
        None => Err(invalid()),
    }
}

/// A namespace plus its aliases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Container {
    name: String,
    aliases: BTreeMap<String, String>,
}

impl Container {
    /// The root namespace.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new(name: &str) -> Result<Self, ContainerError> {
        let name = name.strip_prefix('.').unwrap_or(name);
        if !name.is_empty() && !valid_segments(name) {
            return Err(ContainerError::InvalidName(name.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            aliases: BTreeMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Makes `alias` stand for `qualified` in every reference.
    pub fn add_alias(&mut self, alias: &str, qualified: &str) -> Result<(), ContainerError> {
        if alias.is_empty() || alias.contains('.') {
            return Err(ContainerError::InvalidAlias(alias.to_string()));
        }
        short_name(qualified)?;
        if let Some(existing) = self.aliases.get(alias) {
            return Err(ContainerError::AliasCollision {
                alias: alias.to_string(),
                existing: existing.clone(),
            });
        }
        if self.name == alias || self.name.starts_with(&format!("{}.", alias)) {
            return Err(ContainerError::ContainerCollision {
                alias: alias.to_string(),
                container: self.name.clone(),
            });
        }
        self.aliases.insert(alias.to_string(), qualified.to_string());
        Ok(())
    }

    pub fn add_abbreviations(&mut self, abbrevs: &Abbreviations) -> Result<(), ContainerError> {
        for qualified in abbrevs.iter() {
            let short = short_name(qualified)?;
            self.add_alias(short, qualified)?;
        }
        Ok(())
    }

    /// Candidate fully-qualified names for `name`, most-qualified first.
    ///
    /// A leading `.` names the root namespace and skips container search;
    /// an alias matching the first segment replaces every other candidate.
    pub fn candidate_names(&self, name: &str) -> Vec<String> {
        if let Some(rooted) = name.strip_prefix('.') {
            return vec![self.find_alias(rooted).unwrap_or_else(|| rooted.to_string())];
        }
        if let Some(aliased) = self.find_alias(name) {
            return vec![aliased];
        }
        if self.name.is_empty() {
            return vec![name.to_string()];
        }

        let mut candidates = Vec::with_capacity(self.name.matches('.').count() + 2);
        let mut prefix = self.name.as_str();
        loop {
            candidates.push(format!("{}.{}", prefix, name));
            match prefix.rsplit_once('.') {
                Some((shorter, _)) => prefix = shorter,
                None => break,
            }
        }
        candidates.push(name.to_string());
        candidates
    }

    fn find_alias(&self, name: &str) -> Option<String> {
        let (simple, rest) = match name.split_once('.') {
            Some((simple, rest)) => (simple, Some(rest)),
            None => (name, None),
        };
        let target = self.aliases.get(simple)?;
        Some(match rest {
            Some(rest) => format!("{}.{}", target, rest),
            None => target.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_candidate_order() {
        let container = Container::new("a.b.c").unwrap();
        assert_eq!(
            container.candidate_names("R"),
            vec!["a.b.c.R", "a.b.R", "a.R", "R"]
        );
        assert_eq!(
            container.candidate_names("R.s"),
            vec!["a.b.c.R.s", "a.b.R.s", "a.R.s", "R.s"]
        );
    }

    #[test]
    fn test_root_reference() {
        let container = Container::new("a.b").unwrap();
        assert_eq!(container.candidate_names(".R"), vec!["R"]);
        assert_eq!(Container::root().candidate_names("x"), vec!["x"]);
    }

    #[test]
    fn test_abbreviation_overrides_container() {
        let mut container = Container::new("a.b.c").unwrap();
        container
            .add_abbreviations(&Abbreviations::new().add("x.y.R").unwrap())
            .unwrap();
        assert_eq!(container.candidate_names("R"), vec!["x.y.R"]);
        assert_eq!(container.candidate_names("R.field"), vec!["x.y.R.field"]);
        assert_eq!(container.candidate_names("S"), vec!["a.b.c.S", "a.b.S", "a.S", "S"]);
    }

    #[test]
    fn test_alias() {
        let mut container = Container::root();
        container.add_alias("bill", "acme.billing").unwrap();
        assert_eq!(container.candidate_names("bill.Invoice"), vec!["acme.billing.Invoice"]);
    }

    #[test]
    fn test_invalid_names() {
        assert!(Container::new("a..b").is_err());
        assert!(Abbreviations::new().add("R").is_err());
        assert!(Abbreviations::new().add(".a.R").is_err());
        assert_eq!(
            Abbreviations::new().add("a.R").unwrap().add("b.R"),
            Err(ContainerError::AliasCollision {
                alias: "R".to_string(),
                existing: "a.R".to_string(),
            })
        );
    }

    #[test]
    fn test_alias_collides_with_container() {
        let mut container = Container::new("acme.billing").unwrap();
        assert!(matches!(
            container.add_alias("acme", "x.acme"),
            Err(ContainerError::ContainerCollision { .. })
        ));
        assert!(matches!(
            container.add_alias("a.b", "x.y"),
            Err(ContainerError::InvalidAlias(_))
        ));
    }
}
