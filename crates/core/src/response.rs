use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single respondent's entire response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Response {
    pub respondent_id: String,
    #[serde(default)]
    pub values: HashMap<String, String>,
}

impl Response {
    pub fn new(respondent_id: impl Into<String>) -> Self {
        Self {
            respondent_id: respondent_id.into(),
            values: HashMap::new(),
        }
    }

    pub fn with_value(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(column.into(), value.into());
        self
    }

    pub fn value(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }
}
