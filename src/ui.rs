//! Interface de terminal do transmute: spinners e saída colorida.
//!
//! Usa as crates `indicatif` para spinners de progresso e `console` para
//! estilização com cores. O [`DemoProgress`] acompanha visualmente a
//! demonstração enquanto ela espera pelo agendador de conclusão.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::catalog::Material;
use crate::lifecycle::{Transmutation, TransmutationStatus};
use crate::pricing::SimulationResult;

/// Estilo associado a cada status do ciclo de vida.
fn status_style(status: TransmutationStatus) -> Style {
    match status {
        TransmutationStatus::PendingApproval => Style::new().yellow(),
        TransmutationStatus::InProgress => Style::new().cyan(),
        TransmutationStatus::Completed => Style::new().green().bold(),
        TransmutationStatus::Cancelled => Style::new().red(),
    }
}

/// Linha de uma transmutação: id, status colorido, custo, duração e descrição.
pub fn transmutation_line(t: &Transmutation) -> String {
    format!(
        "{:>5}  {:<18} {:>10.2}  {:>5}s  rev {}  {}",
        t.id.to_string(),
        status_style(t.status).apply_to(t.status),
        t.estimated_cost,
        t.estimated_duration_seconds,
        t.revision,
        t.description
    )
}

/// Imprime o resultado de uma simulação com o detalhamento por material.
pub fn print_simulation(result: &SimulationResult) {
    let bold = Style::new().bold();
    let dim = Style::new().dim();

    println!("{}", bold.apply_to("─── Simulation ───"));
    println!("  complexity        {} (×{})", result.complexity, result.complexity_weight);
    println!("  risk              {} (×{})", result.risk_level, result.risk_multiplier);
    println!(
        "  catalyst quality  {} (×{})",
        result.catalyst_quality, result.catalyst_modifier
    );
    println!("  materials         {:.2}", result.base_material_cost);
    println!("  arcane energy     {:.2}", result.arcane_energy_cost);
    println!(
        "  {}    {}",
        bold.apply_to("estimated cost"),
        Style::new().green().bold().apply_to(format!("{:.2}", result.estimated_cost))
    );
    println!("  duration          {}s", result.duration_seconds);

    if result.materials_breakdown.is_empty() {
        println!("  {}", dim.apply_to("(no priced materials)"));
        return;
    }
    println!();
    for row in &result.materials_breakdown {
        println!(
            "  {:>5}  {:<20} {:>8} × {:>8.2} = {:>10.2}",
            row.material_id.to_string(),
            row.name,
            row.quantity,
            row.unit_cost,
            row.subtotal
        );
    }
}

/// Imprime o catálogo de materiais.
pub fn print_materials(materials: &[&Material]) {
    let bold = Style::new().bold();
    println!("{}", bold.apply_to("─── Materials ───"));
    for m in materials {
        println!(
            "  {:>5}  {:<20} {:>8.2}/{:<4} stock {}",
            m.id.to_string(),
            m.name,
            m.unit_cost,
            m.unit,
            m.stock
        );
    }
}

/// Imprime a visão local reconciliada de uma sessão observadora.
pub fn print_view(label: &str, entries: &[Transmutation]) {
    println!("{}", Style::new().bold().apply_to(format!("─── {label} ───")));
    if entries.is_empty() {
        println!("  {}", Style::new().dim().apply_to("(empty)"));
    }
    for t in entries {
        println!("  {}", transmutation_line(t));
    }
}

/// Indicador visual de progresso para a demonstração.
pub struct DemoProgress {
    // Barra de progresso/spinner do indicatif.
    pb: ProgressBar,
    // Estilo verde para mensagens de sucesso.
    green: Style,
    // Estilo vermelho para mensagens de falha.
    red: Style,
}

impl DemoProgress {
    /// Inicia o spinner com a mensagem inicial.
    pub fn start(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
        }
    }

    /// Atualiza a mensagem do spinner.
    pub fn update(&self, message: impl Into<String>) {
        self.pb.set_message(message.into());
    }

    /// Registra uma etapa concluída acima do spinner.
    pub fn step(&self, t: &Transmutation) {
        self.pb.println(format!("  {} {}", self.green.apply_to("✓"), transmutation_line(t)));
    }

    /// Registra uma etapa que falhou acima do spinner.
    pub fn fail(&self, message: &str) {
        self.pb.println(format!("  {} {message}", self.red.apply_to("✗")));
    }

    /// Finaliza o spinner e exibe a mensagem final.
    pub fn finish(&self, message: &str) {
        self.pb.finish_and_clear();
        println!("  {} {message}", self.green.apply_to("✓"));
    }
}
