use serde::Serialize;
use std::fmt;

/// Photo editors recognized from `Software` / `CreatorTool` strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EditingSoftware {
    Lightroom,
    Photoshop,
    Gimp,
    Affinity,
}

impl EditingSoftware {
    pub fn label(self) -> &'static str {
        match self {
            Self::Lightroom => "Adobe Lightroom",
            Self::Photoshop => "Adobe Photoshop",
            Self::Gimp => "GIMP",
            Self::Affinity => "Affinity Photo",
        }
    }

    /// Match a software string against the known editors. First row wins.
    pub fn identify(software: &str) -> Option<Self> {
        let lower = software.to_lowercase();
        SIGNATURES
            .iter()
            .find(|(needle, _)| lower.contains(*needle))
            .map(|(_, editor)| *editor)
    }
}

impl fmt::Display for EditingSoftware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// Lightroom writes "Adobe Photoshop Lightroom Classic", so it must come first.
const SIGNATURES: &[(&str, EditingSoftware)] = &[
    ("lightroom", EditingSoftware::Lightroom),
    ("photoshop", EditingSoftware::Photoshop),
    ("gimp", EditingSoftware::Gimp),
    ("affinity", EditingSoftware::Affinity),
];
