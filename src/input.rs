use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::models::Project;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    #[serde(default)]
    pub projects: Vec<Project>,
}

impl Portfolio {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Selects projects by UUID or case-insensitive name. `None` keeps all.
    pub fn select(&self, selector: Option<&str>) -> Result<Vec<&Project>, InputError> {
        let Some(selector) = selector else {
            return Ok(self.projects.iter().collect());
        };

        let matches: Vec<&Project> = self
            .projects
            .iter()
            .filter(|project| {
                project.id.to_string() == selector || project.name.eq_ignore_ascii_case(selector)
            })
            .collect();

        if matches.is_empty() {
            Err(InputError::UnknownProject(selector.to_string()))
        } else {
            Ok(matches)
        }
    }
}

pub fn load_portfolio(path: &Path) -> Result<Portfolio, InputError> {
    let text = std::fs::read_to_string(path).map_err(|source| InputError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Portfolio::from_json(&text).map_err(|source| InputError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
