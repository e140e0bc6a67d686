use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// What a run does to each file; fixed for the whole run
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
    /// Translate segment text, guided by an optional glossary
    #[default]
    Translate,
    /// Pull character names out of segment text
    ExtractName,
    /// Rewrite segment text according to the system prompt
    Normalize,
    /// Re-translate glossary entries whose target side still has CJK text
    FixName,
    /// Replace leftover CJK words in already translated files
    FixTranslation,
}

impl TaskKind {
    // @returns: Identifier used on the command line and in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Translate => "translate",
            Self::ExtractName => "extract-name",
            Self::Normalize => "normalize",
            Self::FixName => "fix-name",
            Self::FixTranslation => "fix-translation",
        }
    }

    /// Tasks that rewrite files line by line in place
    pub fn is_line_fix(&self) -> bool {
        matches!(self, Self::FixName | Self::FixTranslation)
    }

    /// Tasks whose output is rejected while it still carries CJK text
    pub fn checks_residual_cjk(&self) -> bool {
        matches!(self, Self::Translate)
    }

    /// Tasks that look for a glossary file next to each input
    pub fn uses_glossary(&self) -> bool {
        matches!(self, Self::Translate)
    }

    /// Tasks that send raw text and carry their instruction in the system prompt
    pub fn needs_system_prompt(&self) -> bool {
        matches!(self, Self::ExtractName | Self::Normalize)
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "translate" | "trans" => Ok(Self::Translate),
            "extract-name" | "get-name" => Ok(Self::ExtractName),
            "normalize" => Ok(Self::Normalize),
            "fix-name" => Ok(Self::FixName),
            "fix-translation" | "fix-trans" => Ok(Self::FixTranslation),
            _ => Err(anyhow!("Invalid task kind: {}", s)),
        }
    }
}
