//! Content tables: units, skills, strengths, blessings, affixes
//!
//! Tables ship bundled into the binary and can be overridden per file
//! from a content directory; a missing file falls back to the bundled
//! table, a malformed one is an error.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::blessing::BlessingDef;
use crate::equipment::AffixDef;
use crate::skill::{Skill, Strength};
use crate::types::{SkillId, StrengthId, UnitId};
use crate::unit::UnitTemplate;

const BUNDLED_UNITS: &str = include_str!("../config/units.toml");
const BUNDLED_SKILLS: &str = include_str!("../config/skills.toml");
const BUNDLED_STRENGTHS: &str = include_str!("../config/strengths.toml");
const BUNDLED_BLESSINGS: &str = include_str!("../config/blessings.toml");
const BUNDLED_AFFIXES: &str = include_str!("../config/affixes.toml");

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("duplicate {kind} id {id}")]
    DuplicateId { kind: &'static str, id: String },
    #[error("unit table names no player unit")]
    MissingPlayer,
}

#[derive(Debug, Deserialize)]
struct UnitsFile {
    player_id: UnitId,
    #[serde(default)]
    unit: Vec<UnitTemplate>,
}

#[derive(Debug, Default, Deserialize)]
struct SkillsFile {
    #[serde(default)]
    skill: Vec<Skill>,
}

#[derive(Debug, Default, Deserialize)]
struct StrengthsFile {
    #[serde(default)]
    strength: Vec<Strength>,
}

#[derive(Debug, Default, Deserialize)]
struct BlessingsFile {
    #[serde(default)]
    blessing: Vec<BlessingDef>,
}

#[derive(Debug, Default, Deserialize)]
struct AffixesFile {
    #[serde(default)]
    affix: Vec<AffixDef>,
}

fn parse<T: serde::de::DeserializeOwned>(text: &str, path: &str) -> Result<T, ContentError> {
    toml::from_str(text).map_err(|source| ContentError::Parse {
        path: path.to_string(),
        source,
    })
}

fn load_or_bundled<T: serde::de::DeserializeOwned>(
    dir: &Path,
    file: &str,
    bundled: &str,
) -> Result<T, ContentError> {
    let path = dir.join(file);
    if path.exists() {
        let text = fs::read_to_string(&path).map_err(|source| ContentError::Io {
            path: path.display().to_string(),
            source,
        })?;
        parse(&text, &path.display().to_string())
    } else {
        parse(bundled, file)
    }
}

/// All static game data, indexed by id.
pub struct ContentTables {
    pub units: Vec<UnitTemplate>,
    pub skills: Vec<Skill>,
    pub strengths: Vec<Strength>,
    pub blessings: Vec<BlessingDef>,
    pub affixes: Vec<AffixDef>,
    /// Default player unit when the frontend makes no choice.
    pub player_id: UnitId,
    unit_index: HashMap<UnitId, usize>,
    skill_index: HashMap<SkillId, usize>,
    strength_index: HashMap<StrengthId, usize>,
}

impl ContentTables {
    /// Tables compiled into the binary.
    pub fn bundled() -> Result<Self, ContentError> {
        Self::assemble(
            parse(BUNDLED_UNITS, "units.toml")?,
            parse(BUNDLED_SKILLS, "skills.toml")?,
            parse(BUNDLED_STRENGTHS, "strengths.toml")?,
            parse(BUNDLED_BLESSINGS, "blessings.toml")?,
            parse(BUNDLED_AFFIXES, "affixes.toml")?,
        )
    }

    /// Tables from a content directory, falling back to the bundled
    /// copy per missing file.
    pub fn load_dir(dir: &Path) -> Result<Self, ContentError> {
        Self::assemble(
            load_or_bundled(dir, "units.toml", BUNDLED_UNITS)?,
            load_or_bundled(dir, "skills.toml", BUNDLED_SKILLS)?,
            load_or_bundled(dir, "strengths.toml", BUNDLED_STRENGTHS)?,
            load_or_bundled(dir, "blessings.toml", BUNDLED_BLESSINGS)?,
            load_or_bundled(dir, "affixes.toml", BUNDLED_AFFIXES)?,
        )
    }

    fn assemble(
        units: UnitsFile,
        skills: SkillsFile,
        strengths: StrengthsFile,
        blessings: BlessingsFile,
        affixes: AffixesFile,
    ) -> Result<Self, ContentError> {
        let mut unit_index = HashMap::new();
        for (i, unit) in units.unit.iter().enumerate() {
            if unit_index.insert(unit.id, i).is_some() {
                return Err(ContentError::DuplicateId {
                    kind: "unit",
                    id: unit.id.to_string(),
                });
            }
        }
        if !unit_index.contains_key(&units.player_id) {
            return Err(ContentError::MissingPlayer);
        }
        let mut skill_index = HashMap::new();
        for (i, skill) in skills.skill.iter().enumerate() {
            if skill_index.insert(skill.id, i).is_some() {
                return Err(ContentError::DuplicateId {
                    kind: "skill",
                    id: skill.id.to_string(),
                });
            }
        }
        let mut strength_index = HashMap::new();
        for (i, strength) in strengths.strength.iter().enumerate() {
            if strength_index.insert(strength.id, i).is_some() {
                return Err(ContentError::DuplicateId {
                    kind: "strength",
                    id: strength.id.to_string(),
                });
            }
        }
        let mut blessing_ids = HashMap::new();
        for blessing in &blessings.blessing {
            if blessing_ids.insert(blessing.id.clone(), ()).is_some() {
                return Err(ContentError::DuplicateId {
                    kind: "blessing",
                    id: blessing.id.clone(),
                });
            }
        }
        Ok(ContentTables {
            units: units.unit,
            skills: skills.skill,
            strengths: strengths.strength,
            blessings: blessings.blessing,
            affixes: affixes.affix,
            player_id: units.player_id,
            unit_index,
            skill_index,
            strength_index,
        })
    }

    pub fn unit(&self, id: UnitId) -> Option<&UnitTemplate> {
        self.unit_index.get(&id).map(|&i| &self.units[i])
    }

    pub fn skill(&self, id: SkillId) -> Option<&Skill> {
        self.skill_index.get(&id).map(|&i| &self.skills[i])
    }

    pub fn strength(&self, id: StrengthId) -> Option<&Strength> {
        self.strength_index.get(&id).map(|&i| &self.strengths[i])
    }

    pub fn blessing(&self, id: &str) -> Option<&BlessingDef> {
        self.blessings.iter().find(|b| b.id == id)
    }

    /// Resolve a unit's skill ids, skipping dangling references.
    pub fn skills_of(&self, ids: &[SkillId]) -> Vec<&Skill> {
        ids.iter().filter_map(|&id| self.skill(id)).collect()
    }

    /// Resolve a unit's passives, cloned for the resolution pipeline.
    pub fn strengths_of(&self, ids: &[StrengthId]) -> Vec<Strength> {
        ids.iter()
            .filter_map(|&id| self.strength(id))
            .cloned()
            .collect()
    }
}
