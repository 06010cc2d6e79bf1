//! Engine configuration and backend selection.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use data_loader::{Catalog, DEFAULT_CATALOG_SIZE, RatingStore};
use similarity::JsonFileArtifact;

use crate::factorization::{FactorizationConfig, FactorizationRecommender};
use crate::item_based::{ItemBasedRecommender, MatrixInit};
use crate::session::SessionSampler;
use crate::traits::Recommender;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    #[default]
    ItemBased,
    Factorization,
}

impl std::str::FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "item-based" => Ok(Self::ItemBased),
            "factorization" | "mf" => Ok(Self::Factorization),
            other => anyhow::bail!(
                "Unknown backend '{}' (expected item-based or factorization)",
                other
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub catalog_size: u32,
    pub backend: BackendKind,
    /// Where the item-based backend persists its similarity matrix
    pub matrix_path: PathBuf,
    /// `false` forces a rebuild even when a saved matrix exists
    pub load_existing_matrix: bool,
    /// Fixes sampling and factor initialization
    pub seed: Option<u64>,
    pub factorization: FactorizationConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            catalog_size: DEFAULT_CATALOG_SIZE,
            backend: BackendKind::default(),
            matrix_path: PathBuf::from("w_matrix.json"),
            load_existing_matrix: true,
            seed: None,
            factorization: FactorizationConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Read a JSON config; missing fields keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn catalog(&self) -> Catalog {
        Catalog::new(self.catalog_size)
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_matrix_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.matrix_path = path.into();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Build the configured backend on top of an already loaded store
pub fn build_recommender(
    config: &EngineConfig,
    store: RatingStore,
) -> Result<Box<dyn Recommender>> {
    info!("Starting {:?} backend", config.backend);

    match config.backend {
        BackendKind::ItemBased => {
            let init = if config.load_existing_matrix {
                MatrixInit::LoadOrBuild
            } else {
                MatrixInit::Rebuild
            };
            let artifact = Box::new(JsonFileArtifact::new(&config.matrix_path));
            let mut recommender = ItemBasedRecommender::new(store, artifact, init)?;
            if let Some(seed) = config.seed {
                let sampler =
                    SessionSampler::new(recommender.store().catalog()).with_seed(seed);
                recommender = recommender.with_sampler(sampler);
            }
            Ok(Box::new(recommender))
        }
        BackendKind::Factorization => {
            let recommender =
                FactorizationRecommender::new(store, config.factorization.clone(), config.seed)?;
            Ok(Box::new(recommender))
        }
    }
}
