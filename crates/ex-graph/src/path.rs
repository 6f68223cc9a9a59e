//! Dotted property paths: `model.property` or `model.property.sub`.

use std::fmt;
use std::str::FromStr;

use crate::error::GraphError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyPath {
    pub model: String,
    pub property: String,
    pub sub: Option<String>,
}

impl PropertyPath {
    pub fn new(model: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            property: property.into(),
            sub: None,
        }
    }

    pub fn with_sub(mut self, sub: impl Into<String>) -> Self {
        self.sub = Some(sub.into());
        self
    }
}

impl FromStr for PropertyPath {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GraphError::InvalidPath {
            path: s.to_string(),
        };
        let mut parts = s.split('.');
        let model = parts.next().filter(|p| !p.is_empty()).ok_or_else(invalid)?;
        let property = parts.next().filter(|p| !p.is_empty()).ok_or_else(invalid)?;
        let sub = match parts.next() {
            Some("") => return Err(invalid()),
            other => other,
        };
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self {
            model: model.to_string(),
            property: property.to_string(),
            sub: sub.map(str::to_string),
        })
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.model, self.property)?;
        if let Some(sub) = &self.sub {
            write!(f, ".{sub}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_and_three_part_paths() {
        let p: PropertyPath = "LV.vol".parse().unwrap();
        assert_eq!(p, PropertyPath::new("LV", "vol"));
        let p: PropertyPath = "AA.solutes.na".parse().unwrap();
        assert_eq!(p, PropertyPath::new("AA", "solutes").with_sub("na"));
        assert_eq!(p.to_string(), "AA.solutes.na");
    }

    #[test]
    fn malformed_paths() {
        for bad in ["", "LV", "LV.", ".vol", "a.b.c.d", "a.b."] {
            assert!(bad.parse::<PropertyPath>().is_err(), "{bad}");
        }
    }
}
