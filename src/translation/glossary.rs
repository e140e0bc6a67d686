/*!
 * Name glossary handling.
 *
 * Glossary files hold one mapping per line in the form
 * `<cn> 林风 </cn> - <vi> Lâm Phong </vi>`. The translate task embeds the
 * mappings with the markup stripped; the fix-name task rewrites the lines
 * whose target side still contains ideographs.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use super::quality::has_cjk;

static NAME_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<cn>\s*(.*?)\s*</cn>\s*[-–—]\s*<vi>\s*(.*?)\s*</vi>")
        .expect("name pair pattern is valid")
});

/// Markup removed before a glossary is embedded in a prompt
const GLOSSARY_MARKUP: &[&str] = &["<cn>", "</cn>", "<vi>", "</vi>", "```", "*"];

/// One source/target name mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePair {
    pub source: String,
    pub target: String,
}

impl NamePair {
    /// Parse the first mapping found in `line`
    pub fn parse(line: &str) -> Option<Self> {
        let caps = NAME_PAIR.captures(line)?;
        Some(Self {
            source: caps.get(1)?.as_str().to_string(),
            target: caps.get(2)?.as_str().to_string(),
        })
    }

    /// Whether the target side still needs translating
    pub fn needs_fix(&self) -> bool {
        has_cjk(&self.target)
    }

    /// Render the mapping back to glossary markup
    pub fn render(&self) -> String {
        format!("<cn> {} </cn> - <vi> {} </vi>", self.source, self.target)
    }
}

/// Strip markup and surrounding whitespace from a glossary
pub fn strip_markup(text: &str) -> String {
    GLOSSARY_MARKUP
        .iter()
        .fold(text.trim().to_string(), |acc, tag| acc.replace(tag, ""))
}
