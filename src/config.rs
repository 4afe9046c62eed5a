//! Configuração do transmute carregada a partir de `transmute.toml`.
//!
//! A struct [`TransmuteConfig`] agrupa os parâmetros por seção
//! (`[pricing]`, `[feed]`, `[lifecycle]`) e as listas de materiais e
//! alquimistas. Valores ausentes no arquivo usam defaults sensíveis.
//! Variáveis de ambiente têm precedência sobre o arquivo.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::catalog::{Alchemist, Material};
use crate::ids::{AlchemistId, MaterialId};

/// Nome do arquivo procurado no diretório atual.
pub const DEFAULT_CONFIG_FILE: &str = "transmute.toml";

/// Variável de ambiente com o caminho do arquivo de configuração.
pub const CONFIG_PATH_ENV: &str = "TRANSMUTE_CONFIG";

/// Variável de ambiente que sobrescreve `feed.reconnect_delay_ms`.
pub const RECONNECT_DELAY_ENV: &str = "TRANSMUTE_RECONNECT_DELAY_MS";

/// Configuração de nível superior carregada de `transmute.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct TransmuteConfig {
    #[serde(default)]
    pub pricing: PricingConfig,

    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    /// Catálogo de materiais. Sem entradas no arquivo, usa o catálogo inicial.
    #[serde(default = "default_materials")]
    pub materials: Vec<Material>,

    /// Alquimistas conhecidos pelo diretório.
    #[serde(default = "default_alchemists")]
    pub alchemists: Vec<Alchemist>,
}

/// Parâmetros do modelo de precificação.
#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    /// Duração base, em segundos, antes dos multiplicadores.
    #[serde(default = "default_base_duration_secs")]
    pub base_duration_secs: u64,
}

/// Parâmetros do feed de mudanças e das sessões observadoras.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Capacidade da fila de cada assinante antes de ser desconectado.
    #[serde(default = "default_session_queue_capacity")]
    pub session_queue_capacity: usize,

    /// Atraso fixo em milissegundos antes de reconectar.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

/// Regras do ciclo de vida.
#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleConfig {
    /// Conclui automaticamente uma transmutação aprovada após a duração estimada.
    #[serde(default = "default_true")]
    pub auto_complete: bool,

    /// Permite no máximo uma transmutação ativa por alquimista.
    #[serde(default = "default_true")]
    pub single_active_per_alchemist: bool,
}

// Valor padrão para a duração base: 30s.
fn default_base_duration_secs() -> u64 {
    30
}

// Valor padrão para a fila por sessão: 64 frames.
fn default_session_queue_capacity() -> usize {
    64
}

// Valor padrão para o atraso de reconexão: 1500ms.
fn default_reconnect_delay_ms() -> u64 {
    1500
}

fn default_true() -> bool {
    true
}

fn default_materials() -> Vec<Material> {
    [
        (1, "Mercury", "g", 10.0, 500.0),
        (2, "Sulfur", "g", 4.5, 800.0),
        (3, "Salt", "g", 1.2, 2000.0),
        (4, "Lead", "kg", 7.0, 120.0),
        (5, "Aqua regia", "ml", 22.0, 60.0),
    ]
    .into_iter()
    .map(|(id, name, unit, unit_cost, stock)| Material {
        id: MaterialId(id),
        name: name.to_string(),
        unit: unit.to_string(),
        unit_cost,
        stock,
    })
    .collect()
}

fn default_alchemists() -> Vec<Alchemist> {
    [(7, "Edward"), (8, "Izumi")]
        .into_iter()
        .map(|(id, name)| Alchemist {
            id: AlchemistId(id),
            name: name.to_string(),
        })
        .collect()
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            base_duration_secs: default_base_duration_secs(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            session_queue_capacity: default_session_queue_capacity(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
        }
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            auto_complete: true,
            single_active_per_alchemist: true,
        }
    }
}

impl Default for TransmuteConfig {
    fn default() -> Self {
        Self {
            pricing: PricingConfig::default(),
            feed: FeedConfig::default(),
            lifecycle: LifecycleConfig::default(),
            materials: default_materials(),
            alchemists: default_alchemists(),
        }
    }
}

impl FeedConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

impl TransmuteConfig {
    /// Carrega a configuração.
    ///
    /// Ordem de resolução do caminho: `path` explícito (`--config`), depois
    /// `TRANSMUTE_CONFIG`, depois `transmute.toml` no diretório atual. Um
    /// caminho explícito que não existe é erro; o arquivo padrão ausente
    /// resulta nos valores padrão.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)?
                } else {
                    Self::default()
                }
            }
        };

        // Variável de ambiente tem precedência sobre o arquivo para o atraso de reconexão.
        if let Ok(raw) = std::env::var(RECONNECT_DELAY_ENV)
            && !raw.is_empty()
        {
            config.feed.reconnect_delay_ms = raw
                .trim()
                .parse()
                .with_context(|| format!("{RECONNECT_DELAY_ENV} inválido: {raw:?}"))?;
        }

        Ok(config)
    }

    /// Lê e interpreta um arquivo TOML.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("falha ao ler {}", path.display()))?;
        toml::from_str::<TransmuteConfig>(&contents)
            .with_context(|| format!("falha ao interpretar {}", path.display()))
    }
}
