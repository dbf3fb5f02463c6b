//! Family configuration tables and the registry that serves them.
//!
//! A document family (FIR, victim examination, accused examination, witness
//! statement) is described entirely by data: its label table, narrative
//! phrases, signature cues, detection markers and redaction policy. The
//! built-in tables live in `families/*.json`; deployments may point
//! `FORMSIFT_FAMILY_DIR` at a directory of their own.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::labels::{FieldRole, LabelSpec};

pub const FAMILY_DIR_ENV: &str = "FORMSIFT_FAMILY_DIR";

const BUILTIN_FAMILIES: &[(&str, &str)] = &[
    ("fir.json", include_str!("../families/fir.json")),
    ("victim_medical.json", include_str!("../families/victim_medical.json")),
    ("accused_medical.json", include_str!("../families/accused_medical.json")),
    ("statement.json", include_str!("../families/statement.json")),
];

/// Caps on per-document work. Exceeding one degrades the result instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineLimits {
    /// Maximum lines a block capture may accumulate.
    #[serde(default = "default_max_block_lines")]
    pub max_block_lines: usize,
    /// Narrative window when no end phrase is found.
    #[serde(default = "default_max_narrative_chars")]
    pub max_narrative_chars: usize,
    /// Lines shorter than this are not prose for the narrative fallback.
    #[serde(default = "default_min_prose_chars")]
    pub min_prose_chars: usize,
}

fn default_max_block_lines() -> usize {
    50
}
fn default_max_narrative_chars() -> usize {
    5000
}
fn default_min_prose_chars() -> usize {
    25
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            max_block_lines: default_max_block_lines(),
            max_narrative_chars: default_max_narrative_chars(),
            min_prose_chars: default_min_prose_chars(),
        }
    }
}

/// What happens to a field the policy does not mention.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedactionAction {
    #[default]
    Disclose,
    Withhold,
}

/// Allow/deny table of fields (or whole sub-groups) to withhold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionPolicy {
    #[serde(default)]
    pub default_action: RedactionAction,
    #[serde(default)]
    pub withhold: Vec<String>,
    #[serde(default)]
    pub disclose: Vec<String>,
}

impl RedactionPolicy {
    pub fn withholding(fields: &[&str]) -> Self {
        Self {
            default_action: RedactionAction::Disclose,
            withhold: fields.iter().map(|f| f.to_string()).collect(),
            disclose: Vec::new(),
        }
    }
}

/// Everything the engine needs to know about one document family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyConfig {
    pub family: String,
    #[serde(default)]
    pub description: String,
    /// Phrases whose presence identifies the family.
    #[serde(default)]
    pub markers: Vec<String>,
    pub labels: Vec<LabelSpec>,
    /// Phrases opening the signature block; bound the narrative fallback.
    #[serde(default)]
    pub signature_cues: Vec<String>,
    #[serde(default)]
    pub redaction: RedactionPolicy,
    #[serde(default)]
    pub limits: EngineLimits,
}

impl FamilyConfig {
    pub fn new(family: &str, labels: Vec<LabelSpec>) -> Self {
        Self {
            family: family.to_string(),
            description: String::new(),
            markers: Vec::new(),
            labels,
            signature_cues: Vec::new(),
            redaction: RedactionPolicy::default(),
            limits: EngineLimits::default(),
        }
    }

    /// Parse and validate a table from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: FamilyConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a table from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Reject tables that would make every extraction meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.family.trim().is_empty() {
            return Err(Error::Config("family name is empty".into()));
        }
        if self.labels.is_empty() {
            return Err(Error::Config(format!(
                "family '{}' has an empty label table",
                self.family
            )));
        }

        let mut names = HashSet::new();
        for spec in &self.labels {
            if spec.name.trim().is_empty() {
                return Err(Error::Config(format!(
                    "family '{}' has a field with no name",
                    self.family
                )));
            }
            if !names.insert(spec.name.as_str()) {
                return Err(Error::Config(format!(
                    "family '{}' declares field '{}' twice",
                    self.family, spec.name
                )));
            }
            if spec.variants.iter().all(|v| v.trim().is_empty()) {
                return Err(Error::Config(format!(
                    "field '{}' has no label variants",
                    spec.name
                )));
            }
            if let Some((min, max)) = spec.bounds {
                if min > max {
                    return Err(Error::Config(format!(
                        "field '{}' has bounds {}..{} with min above max",
                        spec.name, min, max
                    )));
                }
            }
            if spec.role == FieldRole::Narrative && spec.group.is_some() {
                return Err(Error::Config(format!(
                    "narrative field '{}' cannot belong to a group",
                    spec.name
                )));
            }
        }

        for spec in &self.labels {
            if let Some(group) = &spec.group {
                if names.contains(group.as_str()) {
                    return Err(Error::Config(format!(
                        "group '{}' collides with a field of the same name",
                        group
                    )));
                }
            }
        }

        if self.limits.max_block_lines == 0 || self.limits.max_narrative_chars == 0 {
            return Err(Error::Config(format!(
                "family '{}' has a zero capture limit",
                self.family
            )));
        }

        Ok(())
    }
}

/// Ordered collection of family tables. Order breaks detection ties.
#[derive(Debug, Clone, Default)]
pub struct FamilyRegistry {
    families: Vec<FamilyConfig>,
}

impl FamilyRegistry {
    /// The tables shipped with the crate.
    pub fn builtin() -> Result<Self> {
        let mut registry = Self::default();
        for (file, json) in BUILTIN_FAMILIES {
            let config = FamilyConfig::from_json(json)
                .map_err(|e| Error::Config(format!("built-in table {}: {}", file, e)))?;
            registry.insert(config)?;
        }
        Ok(registry)
    }

    /// Load every `*.json` table in a directory, in file name order.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
            .collect();
        paths.sort();

        let mut registry = Self::default();
        for path in &paths {
            debug!("Loading family table {}", path.display());
            registry.insert(FamilyConfig::load(path)?)?;
        }

        if registry.families.is_empty() {
            return Err(Error::Config(format!(
                "no family tables found in {}",
                dir.display()
            )));
        }
        info!(
            "Loaded {} family tables from {}",
            registry.families.len(),
            dir.display()
        );
        Ok(registry)
    }

    /// Tables from `FORMSIFT_FAMILY_DIR` when set, the built-in ones otherwise.
    pub fn from_env() -> Result<Self> {
        match std::env::var(FAMILY_DIR_ENV) {
            Ok(dir) if !dir.trim().is_empty() => Self::from_dir(Path::new(&dir)),
            _ => Self::builtin(),
        }
    }

    /// Add a table, replacing any table of the same family.
    pub fn insert(&mut self, config: FamilyConfig) -> Result<()> {
        config.validate()?;
        match self.families.iter_mut().find(|f| f.family == config.family) {
            Some(existing) => *existing = config,
            None => self.families.push(config),
        }
        Ok(())
    }

    pub fn get(&self, family: &str) -> Result<&FamilyConfig> {
        self.families
            .iter()
            .find(|f| f.family == family)
            .ok_or_else(|| Error::UnknownFamily(family.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.families.iter().map(|f| f.family.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FamilyConfig> {
        self.families.iter()
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// The family whose markers occur most often in the text, if any occur.
    pub fn detect(&self, text: &str) -> Option<&FamilyConfig> {
        let haystack = squash(text);
        let mut best: Option<(&FamilyConfig, usize)> = None;

        for family in &self.families {
            let hits = family
                .markers
                .iter()
                .map(|m| squash(m))
                .filter(|m| !m.is_empty() && haystack.contains(m.as_str()))
                .count();
            if hits > 0 && best.map_or(true, |(_, b)| hits > b) {
                best = Some((family, hits));
            }
        }

        best.map(|(family, _)| family)
    }
}

/// Lower-case and collapse whitespace so markers survive OCR line wrapping.
fn squash(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
