/// Fixed progress timeline shown while a research job runs.
///
/// Variants are declared in timeline order so `Ord` follows progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Stage {
    #[default]
    Initializing,
    CreatingOutline,
    GatheringLiterature,
    AnalyzingSources,
    DraftingContent,
    AddingCitations,
    FormattingDocument,
    GeneratingPdf,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageColor {
    Primary,
    Secondary,
    Accent,
    Green,
}

impl Stage {
    pub const ALL: [Stage; 9] = [
        Stage::Initializing,
        Stage::CreatingOutline,
        Stage::GatheringLiterature,
        Stage::AnalyzingSources,
        Stage::DraftingContent,
        Stage::AddingCitations,
        Stage::FormattingDocument,
        Stage::GeneratingPdf,
        Stage::Complete,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Stage> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::Initializing => "Initializing",
            Stage::CreatingOutline => "Creating outline",
            Stage::GatheringLiterature => "Gathering literature",
            Stage::AnalyzingSources => "Analyzing sources",
            Stage::DraftingContent => "Drafting content",
            Stage::AddingCitations => "Adding citations",
            Stage::FormattingDocument => "Formatting document",
            Stage::GeneratingPdf => "Generating PDF",
            Stage::Complete => "Complete",
        }
    }

    pub fn color(self) -> StageColor {
        match self {
            Stage::Initializing
            | Stage::CreatingOutline
            | Stage::GatheringLiterature
            | Stage::AnalyzingSources => StageColor::Primary,
            Stage::DraftingContent | Stage::AddingCitations => StageColor::Secondary,
            Stage::FormattingDocument | Stage::GeneratingPdf => StageColor::Accent,
            Stage::Complete => StageColor::Green,
        }
    }
}

/// Keyword patterns in priority order. Several may match one message; the
/// first one listed wins.
const STAGE_PATTERNS: &[(&str, Stage)] = &[
    ("initializing", Stage::Initializing),
    ("outline", Stage::CreatingOutline),
    ("gathering literature", Stage::GatheringLiterature),
    ("search arxiv", Stage::GatheringLiterature),
    ("analyzing", Stage::AnalyzingSources),
    ("drafting", Stage::DraftingContent),
    ("writing", Stage::DraftingContent),
    ("citation", Stage::AddingCitations),
    ("formatting", Stage::FormattingDocument),
    ("latex", Stage::FormattingDocument),
    ("generating pdf", Stage::GeneratingPdf),
    ("complete", Stage::Complete),
    ("finished", Stage::Complete),
];

/// Estimate the stage a free-text status message refers to.
///
/// Case-insensitive substring match against [`STAGE_PATTERNS`]; `None` when
/// nothing matches, in which case callers keep the stage they already have.
pub fn classify_message(message: &str) -> Option<Stage> {
    if message.is_empty() {
        return None;
    }
    let lower = message.to_lowercase();
    STAGE_PATTERNS
        .iter()
        .find(|(pattern, _)| lower.contains(pattern))
        .map(|(_, stage)| *stage)
}
