use crate::kind::RecordKind;
use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub error: Style,
    pub warn: Style,
    pub dim: Style,
    pub muted: Style,
    /// Record kinds: documents and evidence
    pub evidence: Style,
    /// Record kinds: groups, units, attributes and models
    pub entity: Style,
    /// Record kinds: rules
    pub rule: Style,
}

impl Theme {
    pub fn detect() -> Self {
        if !console::Term::stdout().is_term() {
            return Self::plain();
        }
        Self::colored()
    }

    pub fn colored() -> Self {
        Self {
            header: Style::new().cyan().bold(),
            success: Style::new().green().bold(),
            error: Style::new().red().bold(),
            warn: Style::new().yellow().bold(),
            dim: Style::new().white().dimmed(),
            muted: Style::new().bright_black(),
            evidence: Style::new().blue(),
            entity: Style::new().green(),
            rule: Style::new().yellow().bold(),
        }
    }

    pub fn plain() -> Self {
        Self {
            header: Style::new(),
            success: Style::new(),
            error: Style::new(),
            warn: Style::new(),
            dim: Style::new(),
            muted: Style::new(),
            evidence: Style::new(),
            entity: Style::new(),
            rule: Style::new(),
        }
    }

    pub fn kind(&self, kind: RecordKind) -> Style {
        match kind {
            RecordKind::Document | RecordKind::Source | RecordKind::TextSource => self.evidence.clone(),
            RecordKind::Group | RecordKind::Unit | RecordKind::Attribute | RecordKind::Model => self.entity.clone(),
            RecordKind::ValidatingRule | RecordKind::ComparativeRule => self.rule.clone(),
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}
