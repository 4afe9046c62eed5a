//! Interface de linha de comando do transmute baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (simulate, materials,
//! demo) e flags globais (--config, --verbose).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::pricing::{Complexity, MaterialLine, RiskLevel};

/// transmute — Precificação e ciclo de vida de transmutações alquímicas.
#[derive(Debug, Parser)]
#[command(name = "transmute", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do arquivo de configuração (padrão: transmute.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Simula o custo e a duração de uma transmutação sem registrá-la.
    Simulate(SimulateArgs),

    /// Lista o catálogo de materiais configurado.
    Materials,

    /// Executa a demonstração embutida: início, aprovação e conclusão
    /// observados por duas sessões.
    Demo,
}

/// Argumentos do subcomando `simulate`. Flags sobrescrevem o arquivo.
#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Caminho para um arquivo JSON com a requisição de simulação.
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Descrição livre da transmutação.
    #[arg(long, short)]
    pub description: Option<String>,

    /// Material no formato ID:QUANTIDADE (repetível).
    #[arg(long = "material", short, value_parser = parse_material_line)]
    pub materials: Vec<MaterialLine>,

    /// Nível de complexidade (TRIVIAL, LOW, MEDIUM, HIGH, MASTER).
    #[arg(long)]
    pub complexity: Option<Complexity>,

    /// Nível de risco (LOW, GUARDED, MEDIUM, HIGH, CRITICAL).
    #[arg(long)]
    pub risk: Option<RiskLevel>,

    /// Qualidade do catalisador, de 1 a 5.
    #[arg(long)]
    pub catalyst: Option<f64>,
}

// Converte "ID:QUANTIDADE" em uma linha de material.
fn parse_material_line(raw: &str) -> Result<MaterialLine, String> {
    let (id, qty) = raw
        .split_once(':')
        .ok_or_else(|| format!("esperado ID:QUANTIDADE, recebido {raw:?}"))?;
    let id: i64 = id
        .trim()
        .parse()
        .map_err(|_| format!("id de material inválido: {id:?}"))?;
    let qty: f64 = qty
        .trim()
        .parse()
        .map_err(|_| format!("quantidade inválida: {qty:?}"))?;
    Ok(MaterialLine::new(id, qty))
}
