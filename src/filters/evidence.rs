use crate::error::ConfigError;
use crate::types::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Evidence item attributes that can be constrained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterAttribute {
    Level,
    Type,
    Significance,
    Rating,
    Status,
    Direction,
}

impl FilterAttribute {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterAttribute::Level => "level",
            FilterAttribute::Type => "type",
            FilterAttribute::Significance => "significance",
            FilterAttribute::Rating => "rating",
            FilterAttribute::Status => "status",
            FilterAttribute::Direction => "direction",
        }
    }
}

impl fmt::Display for FilterAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterAttribute {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        let key = key.strip_prefix("evidence_").unwrap_or(&key);
        match key {
            "level" => Ok(FilterAttribute::Level),
            "type" => Ok(FilterAttribute::Type),
            "significance" => Ok(FilterAttribute::Significance),
            "rating" => Ok(FilterAttribute::Rating),
            "status" => Ok(FilterAttribute::Status),
            "direction" => Ok(FilterAttribute::Direction),
            _ => Err(ConfigError::UnknownAttribute(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// Accept levels at least as strong as the given one
    LevelFloor(EvidenceLevel),
    /// Accept lower-cased values from the set
    OneOf(BTreeSet<String>),
}

/// Conjunction of per-attribute constraints. An empty filter accepts everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvidenceFilter {
    constraints: BTreeMap<FilterAttribute, Constraint>,
}

impl EvidenceFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a filter from `attribute=value[,value...]` texts.
    pub fn from_constraints<I, S>(texts: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filter = Self::new();
        for text in texts {
            filter.parse_constraint(text.as_ref())?;
        }
        Ok(filter)
    }

    pub fn with_constraint<I, S>(mut self, attribute: FilterAttribute, values: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.add_constraint(attribute, values)?;
        Ok(self)
    }

    pub fn parse_constraint(&mut self, text: &str) -> Result<(), ConfigError> {
        let (key, values) = text
            .split_once('=')
            .ok_or_else(|| ConfigError::MalformedConstraint(text.to_string()))?;
        let attribute: FilterAttribute = key.parse()?;
        self.add_constraint(attribute, values.split(','))
    }

    /// Add accepted values for an attribute. Repeated attributes widen the
    /// accepted set.
    pub fn add_constraint<I, S>(&mut self, attribute: FilterAttribute, values: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let values: Vec<String> = values
            .into_iter()
            .map(|v| v.as_ref().trim().to_lowercase())
            .filter(|v| !v.is_empty())
            .collect();

        if values.is_empty() {
            return Err(ConfigError::EmptyValues(attribute.to_string()));
        }

        let constraint = match attribute {
            FilterAttribute::Level => {
                let mut weakest = EvidenceLevel::A;
                for value in &values {
                    weakest = weakest.max(value.parse::<EvidenceLevel>()?);
                }
                Constraint::LevelFloor(weakest)
            }
            _ => Constraint::OneOf(values.into_iter().collect()),
        };

        match (self.constraints.get_mut(&attribute), constraint) {
            (Some(Constraint::LevelFloor(current)), Constraint::LevelFloor(new)) => {
                *current = (*current).max(new);
            }
            (Some(Constraint::OneOf(current)), Constraint::OneOf(new)) => {
                current.extend(new);
            }
            (_, constraint) => {
                self.constraints.insert(attribute, constraint);
            }
        }

        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn constraint(&self, attribute: FilterAttribute) -> Option<&Constraint> {
        self.constraints.get(&attribute)
    }

    pub fn accepts(&self, item: &EvidenceItem) -> bool {
        self.constraints
            .iter()
            .all(|(attribute, constraint)| match (attribute, constraint) {
                (FilterAttribute::Level, Constraint::LevelFloor(floor)) => item.level <= *floor,
                (attribute, Constraint::OneOf(accepted)) => attribute_value(item, *attribute)
                    .map(|value| accepted.contains(&value.trim().to_lowercase()))
                    .unwrap_or(false),
                (_, Constraint::LevelFloor(_)) => false,
            })
    }

    /// Keep the accepted items and report how many were removed.
    pub fn apply<'a, I>(&self, items: I) -> (Vec<&'a EvidenceItem>, usize)
    where
        I: IntoIterator<Item = &'a EvidenceItem>,
    {
        let mut kept = Vec::new();
        let mut removed = 0;
        for item in items {
            if self.accepts(item) {
                kept.push(item);
            } else {
                log::debug!(
                    "Evidence item {} rejected by filter",
                    item.name.as_deref().unwrap_or("<unnamed>")
                );
                removed += 1;
            }
        }
        (kept, removed)
    }
}

fn attribute_value(item: &EvidenceItem, attribute: FilterAttribute) -> Option<String> {
    match attribute {
        FilterAttribute::Level => Some(item.level.to_string()),
        FilterAttribute::Type => item.evidence_type.clone(),
        FilterAttribute::Significance => item.significance.clone(),
        FilterAttribute::Rating => item.rating.map(|r| r.to_string()),
        FilterAttribute::Status => item.status.clone(),
        FilterAttribute::Direction => item.direction.clone(),
    }
}
