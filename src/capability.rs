use crate::config::RendererMode;

const FORCE_KITTY_ENV: &str = "MINKOWSKI_FORCE_KITTY";

#[derive(Debug, Clone)]
pub struct CapabilityReport {
    pub auto_probe: bool,
    pub requested: RendererMode,
    pub renderer: RendererMode,
    notes: Vec<String>,
}

impl CapabilityReport {
    pub fn changed(&self) -> bool {
        self.renderer != self.requested
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn push_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn status_label(&self) -> String {
        if !self.auto_probe {
            return format!("off ({:?})", self.renderer);
        }
        if self.changed() {
            return format!("fallback {:?}->{:?}", self.requested, self.renderer);
        }
        format!("ok {:?}", self.renderer)
    }
}

/// Check that the requested presenter can work in this terminal, falling
/// back to half-block when kitty graphics are missing.
pub fn probe_renderer(requested: RendererMode, auto_probe: bool) -> CapabilityReport {
    let mut report = CapabilityReport {
        auto_probe,
        requested,
        renderer: requested,
        notes: Vec::new(),
    };

    if !auto_probe {
        report.push_note("capability probe disabled by --auto-probe=false");
        return report;
    }

    if requested == RendererMode::Kitty && !kitty_graphics_available() {
        report.renderer = RendererMode::HalfBlock;
        report.push_note("kitty graphics unavailable in this terminal; using half-block");
    }

    report
}

fn kitty_graphics_available() -> bool {
    if let Ok(v) = std::env::var(FORCE_KITTY_ENV) {
        match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => return true,
            "0" | "false" | "no" | "off" => return false,
            _ => {}
        }
    }

    if std::env::var("KITTY_WINDOW_ID").is_ok() {
        return true;
    }

    let term = std::env::var("TERM").unwrap_or_default().to_ascii_lowercase();
    let term_program = std::env::var("TERM_PROGRAM").unwrap_or_default().to_ascii_lowercase();
    term.contains("kitty") || term_program.contains("ghostty") || term_program.contains("kitty")
}
