// src/db/ai_config_repo.rs

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::{common::error::AppError, models::chat::AiConfig};

// Guarda o provedor e a chave da IA num arquivo JSON local, para sobreviver
// a reinícios do servidor.
#[derive(Debug, Clone)]
pub struct AiConfigRepository {
    path: PathBuf,
}

impl AiConfigRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // Arquivo ausente = ainda não configurado (não é erro).
    pub async fn load(&self) -> Result<AiConfig, AppError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(AiConfig::default()),
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("Falha ao ler {}", self.path.display()))
                    .into());
            }
        };

        let config = serde_json::from_slice(&raw)
            .with_context(|| format!("Arquivo de configuração da IA inválido: {}", self.path.display()))?;

        Ok(config)
    }

    // Grava num arquivo temporário e renomeia, para nunca deixar JSON pela metade.
    pub async fn save(&self, config: &AiConfig) -> Result<(), AppError> {
        let json = serde_json::to_vec_pretty(config).context("Falha ao serializar a configuração da IA")?;

        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Falha ao criar {}", dir.display()))?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json)
            .await
            .with_context(|| format!("Falha ao gravar {}", tmp_path.display()))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .with_context(|| format!("Falha ao substituir {}", self.path.display()))?;

        Ok(())
    }
}
