//! Per-project LLM configuration lookup
//!
//! The dispatch path only reads project settings. Storage is abstracted behind
//! [`ConfigResolver`] so the SQLite table used in production and the in-memory
//! map used by tests are interchangeable.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_types::ProjectId;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::path::Path;

/// Resolved connection parameters for one project. Every field is non-blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLlmConfig {
    pub project_id: ProjectId,
    pub base_url: String,
    pub head_model: String,
    pub writer_model: String,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no LLM configuration for project {0}")]
    NotFound(ProjectId),
    #[error("LLM configuration for project {project_id} is missing: {}", .missing.join(", "))]
    Incomplete {
        project_id: ProjectId,
        missing: Vec<&'static str>,
    },
    #[error("config storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for ConfigError {
    fn from(e: sqlx::Error) -> Self {
        ConfigError::Storage(e.to_string())
    }
}

#[async_trait]
pub trait ConfigResolver: Send + Sync {
    async fn resolve(&self, project_id: &ProjectId) -> Result<ProjectLlmConfig, ConfigError>;
}

/// One stored row, fields possibly absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectCatalogEntry {
    pub base_url: Option<String>,
    pub head_model: Option<String>,
    pub writer_model: Option<String>,
}

impl ProjectCatalogEntry {
    pub fn complete(
        base_url: impl Into<String>,
        head_model: impl Into<String>,
        writer_model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: Some(base_url.into()),
            head_model: Some(head_model.into()),
            writer_model: Some(writer_model.into()),
        }
    }

    /// Turn a stored row into a usable config, listing every absent field.
    pub fn validate(&self, project_id: &ProjectId) -> Result<ProjectLlmConfig, ConfigError> {
        fn present(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(ToString::to_string)
        }

        let base_url = present(&self.base_url);
        let head_model = present(&self.head_model);
        let writer_model = present(&self.writer_model);

        match (base_url, head_model, writer_model) {
            (Some(base_url), Some(head_model), Some(writer_model)) => Ok(ProjectLlmConfig {
                project_id: project_id.clone(),
                base_url,
                head_model,
                writer_model,
            }),
            (base_url, head_model, writer_model) => {
                let mut missing = Vec::new();
                if base_url.is_none() {
                    missing.push("base_url");
                }
                if head_model.is_none() {
                    missing.push("head_model");
                }
                if writer_model.is_none() {
                    missing.push("writer_model");
                }
                Err(ConfigError::Incomplete {
                    project_id: project_id.clone(),
                    missing,
                })
            }
        }
    }
}

/// TOML catalog of project settings:
///
/// ```toml
/// [projects.p1]
/// base_url = "http://127.0.0.1:1234/v1"
/// head_model = "h1"
/// writer_model = "w1"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectCatalog {
    #[serde(default)]
    pub projects: BTreeMap<String, ProjectCatalogEntry>,
}

impl ProjectCatalog {
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read project catalog {}: {e}", path.display())
        })?;
        Self::from_toml_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse project catalog {}: {e}", path.display())
        })
    }
}

// ============================================================================
// In-memory resolver
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct StaticConfigResolver {
    entries: BTreeMap<ProjectId, ProjectCatalogEntry>,
}

impl StaticConfigResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_catalog(catalog: &ProjectCatalog) -> Self {
        Self {
            entries: catalog
                .projects
                .iter()
                .map(|(id, entry)| (ProjectId::new(id.clone()), entry.clone()))
                .collect(),
        }
    }

    pub fn with_project(
        mut self,
        project_id: impl Into<ProjectId>,
        entry: ProjectCatalogEntry,
    ) -> Self {
        self.entries.insert(project_id.into(), entry);
        self
    }
}

#[async_trait]
impl ConfigResolver for StaticConfigResolver {
    async fn resolve(&self, project_id: &ProjectId) -> Result<ProjectLlmConfig, ConfigError> {
        self.entries
            .get(project_id)
            .ok_or_else(|| ConfigError::NotFound(project_id.clone()))?
            .validate(project_id)
    }
}

// ============================================================================
// SQLite resolver
// ============================================================================

/// Reads `project_llm_config` rows.
#[derive(Debug, Clone)]
pub struct SqliteConfigResolver {
    pool: SqlitePool,
}

impl SqliteConfigResolver {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConfigResolver for SqliteConfigResolver {
    async fn resolve(&self, project_id: &ProjectId) -> Result<ProjectLlmConfig, ConfigError> {
        let row: Option<(Option<String>, Option<String>, Option<String>)> = sqlx::query_as(
            "SELECT base_url, head_model, writer_model FROM project_llm_config WHERE project_id = ?",
        )
        .bind(project_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some((base_url, head_model, writer_model)) = row else {
            return Err(ConfigError::NotFound(project_id.clone()));
        };

        ProjectCatalogEntry {
            base_url,
            head_model,
            writer_model,
        }
        .validate(project_id)
    }
}

/// Write or replace one project's settings.
pub async fn upsert_project(
    pool: &SqlitePool,
    project_id: &ProjectId,
    entry: &ProjectCatalogEntry,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO project_llm_config (project_id, base_url, head_model, writer_model)
         VALUES (?, ?, ?, ?)
         ON CONFLICT(project_id) DO UPDATE SET
             base_url = excluded.base_url,
             head_model = excluded.head_model,
             writer_model = excluded.writer_model,
             updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
    )
    .bind(project_id.as_str())
    .bind(&entry.base_url)
    .bind(&entry.head_model)
    .bind(&entry.writer_model)
    .execute(pool)
    .await?;
    Ok(())
}

/// Upsert every catalog entry. Returns the number of projects written.
pub async fn seed_from_catalog(
    pool: &SqlitePool,
    catalog: &ProjectCatalog,
) -> Result<usize, sqlx::Error> {
    for (id, entry) in &catalog.projects {
        upsert_project(pool, &ProjectId::new(id.clone()), entry).await?;
    }
    Ok(catalog.projects.len())
}
