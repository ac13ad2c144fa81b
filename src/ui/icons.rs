use crate::kind::RecordKind;

pub struct Icons;

impl Icons {
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const LINK: &str = "🔗";
    pub const FILE: &str = "📄";
    pub const NEW: &str = "✨";
    pub const MOD: &str = "📝";
    pub const DEL: &str = "🗑️";
    pub const SEARCH: &str = "🔍";
    pub const MISSING: &str = "🔺";

    /// Marker shown in front of records of `kind`
    pub fn kind(kind: RecordKind) -> &'static str {
        match kind {
            RecordKind::Document => Self::FILE,
            RecordKind::Source | RecordKind::TextSource => Self::LINK,
            RecordKind::Group => "👥",
            RecordKind::Unit => "🧬",
            RecordKind::Attribute => "🏷️",
            RecordKind::Model => "📦",
            RecordKind::ValidatingRule | RecordKind::ComparativeRule => "⚖️",
        }
    }
}
