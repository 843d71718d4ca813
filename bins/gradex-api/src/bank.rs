// Question bank collaborators. The real platform keeps tests and assignments
// in its own stores; this surface only needs to resolve a container id plus
// question id to a Question, so the seam is a small trait with a JSON-file
// implementation behind it.

use anyhow::{bail, Context};
use async_trait::async_trait;
use gradex_common::types::Question;
use gradex_common::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Read-only source of questions, addressed by container (test/assignment)
/// id and question id.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// What this source holds — "test" or "assignment"; used in errors and
    /// metrics labels.
    fn kind(&self) -> &'static str;

    async fn questions(&self, container_id: &str) -> Result<Vec<Question>>;

    async fn find_question(&self, container_id: &str, question_id: &str) -> Result<Question>;
}

#[derive(Debug, Deserialize)]
struct Container {
    #[serde(alias = "_id")]
    id: String,
    #[serde(default)]
    questions: Vec<Question>,
}

/// Question bank backed by a JSON file: an array of `{id, questions: [...]}`
/// containers, loaded and validated once at boot.
pub struct JsonBank {
    kind: &'static str,
    containers: HashMap<String, Vec<Question>>,
}

impl JsonBank {
    pub fn load(kind: &'static str, path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            bail!("{kind} bank file not found: {}", path.display());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let containers: Vec<Container> = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        Ok(Self {
            kind,
            containers: containers
                .into_iter()
                .map(|c| (c.id, c.questions))
                .collect(),
        })
    }

    #[cfg(test)]
    pub fn from_containers(kind: &'static str, containers: Vec<(&str, Vec<Question>)>) -> Self {
        Self {
            kind,
            containers: containers
                .into_iter()
                .map(|(id, qs)| (id.to_string(), qs))
                .collect(),
        }
    }
}

// Legacy records may lack an id; the positional index serialized as a string
// stands in for it. Intentional compatibility shim, not an accident.
fn lookup<'a>(questions: &'a [Question], question_id: &str) -> Option<&'a Question> {
    questions
        .iter()
        .enumerate()
        .find(|(index, q)| match &q.id {
            Some(id) => id == question_id,
            None => index.to_string() == question_id,
        })
        .map(|(_, q)| q)
}

#[async_trait]
impl QuestionSource for JsonBank {
    fn kind(&self) -> &'static str {
        self.kind
    }

    async fn questions(&self, container_id: &str) -> Result<Vec<Question>> {
        self.containers
            .get(container_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("{} {container_id}", self.kind)))
    }

    async fn find_question(&self, container_id: &str, question_id: &str) -> Result<Question> {
        let questions = self
            .containers
            .get(container_id)
            .ok_or_else(|| Error::NotFound(format!("{} {container_id}", self.kind)))?;

        lookup(questions, question_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("question {question_id}")))
    }
}
