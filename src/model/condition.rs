use std::collections::BTreeMap;
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::{EngineError, Result, VariableValue};

lazy_static! {
    static ref CONDITION: Regex = Regex::new(
        r"^\s*(?:\$\{)?\s*([A-Za-z_][A-Za-z0-9_]*)\s*(==|!=)\s*(.+?)\s*\}?\s*$"
    )
    .expect("condition pattern is valid");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOperator {
    Equals,
    NotEquals,
}

/// A sequence-flow condition of the form `variable == value` or
/// `${variable != value}`. The right-hand side is read as JSON when it
/// parses, otherwise as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Condition {
    pub variable: String,
    pub operator: ConditionOperator,
    pub value: VariableValue,
    source: String,
}

impl Condition {
    pub fn parse(expression: &str) -> Result<Self> {
        let captures = CONDITION.captures(expression).ok_or_else(|| {
            EngineError::Model(format!("unsupported condition expression '{}'", expression))
        })?;
        let operator = match &captures[2] {
            "==" => ConditionOperator::Equals,
            _ => ConditionOperator::NotEquals,
        };
        let raw = &captures[3];
        let value = serde_json::from_str::<serde_json::Value>(raw)
            .map(VariableValue::from)
            .unwrap_or_else(|_| VariableValue::Text(raw.trim_matches('\'').to_string()));
        Ok(Self {
            variable: captures[1].to_string(),
            operator,
            value,
            source: expression.to_string(),
        })
    }

    /// A missing variable compares as null.
    pub fn evaluate(&self, variables: &BTreeMap<String, VariableValue>) -> bool {
        let actual = variables.get(&self.variable).unwrap_or(&VariableValue::Null);
        let equal = *actual == self.value;
        match self.operator {
            ConditionOperator::Equals => equal,
            ConditionOperator::NotEquals => !equal,
        }
    }
}

impl TryFrom<String> for Condition {
    type Error = EngineError;

    fn try_from(expression: String) -> Result<Self> {
        Condition::parse(&expression)
    }
}

impl From<Condition> for String {
    fn from(condition: Condition) -> Self {
        condition.source
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
