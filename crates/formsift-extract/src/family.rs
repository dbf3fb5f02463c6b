//! A family table compiled for repeated use: dictionary, phrase sets, patterns.

use formsift_core::{Error, FamilyConfig, FieldRole, LabelSpec, Result};
use regex::Regex;

use crate::dictionary::LabelDictionary;
use crate::narrative::{NarrativeDetector, PhraseSet};

/// Immutable, shareable compiled form of a [`FamilyConfig`].
#[derive(Debug, Clone)]
pub struct CompiledFamily {
    config: FamilyConfig,
    dictionary: LabelDictionary,
    /// Indexed like `config.labels`; `Some` only for narrative fields.
    narratives: Vec<Option<NarrativeDetector>>,
    /// Fallback regexes per field.
    patterns: Vec<Vec<Regex>>,
    signature_cues: PhraseSet,
}

impl CompiledFamily {
    /// Validate the table and compile every phrase and pattern up front, so a
    /// bad table fails here and never halfway through a document.
    pub fn compile(config: FamilyConfig) -> Result<Self> {
        config.validate()?;

        let dictionary = LabelDictionary::new(&config.labels)
            .with_stop_phrases(config.signature_cues.as_slice());
        let narratives = config
            .labels
            .iter()
            .map(|spec| match spec.role {
                FieldRole::Narrative => {
                    NarrativeDetector::new(spec.variants.as_slice(), spec.end_phrases.as_slice())
                        .map(Some)
                }
                _ => Ok(None),
            })
            .collect::<Result<Vec<_>>>()?;
        let patterns = config
            .labels
            .iter()
            .map(compile_patterns)
            .collect::<Result<Vec<_>>>()?;
        let signature_cues = PhraseSet::compile(config.signature_cues.as_slice())?;

        Ok(Self {
            config,
            dictionary,
            narratives,
            patterns,
            signature_cues,
        })
    }

    pub fn name(&self) -> &str {
        &self.config.family
    }

    pub fn config(&self) -> &FamilyConfig {
        &self.config
    }

    pub fn specs(&self) -> &[LabelSpec] {
        &self.config.labels
    }

    pub fn dictionary(&self) -> &LabelDictionary {
        &self.dictionary
    }

    pub fn narrative(&self, field: usize) -> Option<&NarrativeDetector> {
        self.narratives.get(field).and_then(Option::as_ref)
    }

    pub fn patterns(&self, field: usize) -> &[Regex] {
        self.patterns.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn signature_cues(&self) -> &PhraseSet {
        &self.signature_cues
    }
}

fn compile_patterns(spec: &LabelSpec) -> Result<Vec<Regex>> {
    spec.patterns
        .iter()
        .map(|p| {
            let re = Regex::new(p)
                .map_err(|e| Error::Config(format!("{}: bad pattern {:?}: {}", spec.name, p, e)))?;
            if re.captures_len() < 2 {
                return Err(Error::Config(format!(
                    "{}: pattern {:?} has no capture group",
                    spec.name, p
                )));
            }
            Ok(re)
        })
        .collect()
}
