use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub u64);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Integral,
    Derivative,
    Thesis,
    Unrecognized,
}

impl Category {
    /// Categories that own a ledger, in reporting order.
    pub const LEDGERED: [Category; 3] = [Category::Integral, Category::Derivative, Category::Thesis];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Integral => "integral",
            Category::Derivative => "derivative",
            Category::Thesis => "thesis",
            Category::Unrecognized => "unrecognized",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TaskPayload {
    Expression { expression: String },
    Thesis { title: String, body: String },
    Unrecognized { text: String },
}

/// A classified unit of work. Built by [`crate::classify::classify`] and never mutated.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub raw: String,
    pub category: Category,
    pub payload: TaskPayload,
}

impl Task {
    pub fn expression(&self) -> Option<&str> {
        match &self.payload {
            TaskPayload::Expression { expression } => Some(expression),
            _ => None,
        }
    }
}
