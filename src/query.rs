use crate::error::UsageError;
use crate::event::Event;
use std::fmt;

/// A predicate over events. Declining to select an event is the common case
/// and never an error.
pub trait Query: fmt::Debug + Send {
    fn selects(&self, event: &dyn Event) -> bool;
}

/// Selects events whose raw representation, or any property value, contains
/// the keyword
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordQuery {
    keyword: String,
}

impl KeywordQuery {
    pub fn new(keyword: impl Into<String>) -> Self {
        KeywordQuery {
            keyword: keyword.into(),
        }
    }
}

impl Query for KeywordQuery {
    fn selects(&self, event: &dyn Event) -> bool {
        if let Some(raw) = event.raw_representation() {
            if raw.contains(&self.keyword) {
                return true;
            }
        }
        event
            .properties()
            .iter()
            .filter_map(|p| p.value())
            .any(|v| v.to_string().contains(&self.keyword))
    }
}

/// Selects events carrying the named property with exactly the given value
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyQuery {
    name: String,
    value: String,
}

impl PropertyQuery {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        PropertyQuery {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl Query for PropertyQuery {
    fn selects(&self, event: &dyn Event) -> bool {
        event
            .property(&self.name)
            .and_then(|p| p.value())
            .map(|v| v.to_string() == self.value)
            .unwrap_or(false)
    }
}

/// Selects an event when any of its members does
#[derive(Debug, Default)]
pub struct AnyQuery {
    members: Vec<Box<dyn Query>>,
}

impl AnyQuery {
    pub fn new(members: Vec<Box<dyn Query>>) -> Self {
        AnyQuery { members }
    }
}

impl Query for AnyQuery {
    fn selects(&self, event: &dyn Event) -> bool {
        self.members.iter().any(|q| q.selects(event))
    }
}

/// Builds a query from command line tokens: `name:value` tokens become
/// property queries, anything else a keyword query. Tokens are OR-ed.
pub fn parse_query(tokens: &[String]) -> Result<Box<dyn Query>, UsageError> {
    let mut members: Vec<Box<dyn Query>> = Vec::new();
    for token in tokens.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        match token.split_once(':') {
            Some((name, value)) if !name.is_empty() => {
                members.push(Box::new(PropertyQuery::new(name, value)));
            }
            _ => members.push(Box::new(KeywordQuery::new(token))),
        }
    }

    match members.len() {
        0 => Err(UsageError::EmptyQuery),
        1 => Ok(members.remove(0)),
        _ => Ok(Box::new(AnyQuery::new(members))),
    }
}
