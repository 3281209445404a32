use serde::{Deserialize, Serialize};

use super::func::Function;

/// A named collection of functions, the unit loaded from JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    #[serde(default)]
    pub functions: Vec<Function>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: Vec::new(),
        }
    }

    pub fn from_json(text: &str) -> Result<Self, crate::CoreError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_reader(reader: impl std::io::Read) -> Result<Self, crate::CoreError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}
