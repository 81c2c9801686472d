/// Maps category names to dense class indices in sorted name order.
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::TrainError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Learn the distinct labels, sorted.
    pub fn fit<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let classes: BTreeSet<String> = labels.into_iter().map(|l| l.as_ref().to_string()).collect();
        Self {
            classes: classes.into_iter().collect(),
        }
    }

    pub fn encode(&self, label: &str) -> Result<usize, TrainError> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(label))
            .map_err(|_| TrainError::UnknownLabel(label.to_string()))
    }

    #[must_use]
    pub fn decode(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
