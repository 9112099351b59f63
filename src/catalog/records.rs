//! Configuration records held by the reference collections.
//!
//! `Default` is the zero-value record: it is what a session join reports in
//! place of a reference that no longer resolves.
//!
//! Records are exchanged with the VR engine using its field names: PascalCase
//! keys, `ID` and `ImageURL` spelled in capitals, and an empty trigger list
//! encoded as `null`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::traits::CatalogRecord;

/// A training scenario: the scene, difficulty and success criteria of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Scenario {
    #[serde(rename = "ID")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    /// 1-5 scale.
    pub difficulty: u8,
    /// Expected length in minutes.
    pub duration: u32,
    pub scene: String,
    pub background_noise: bool,
    pub success_criteria: String,
    pub keywords: String,
}

/// The virtual character the trainee talks to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Avatar {
    #[serde(rename = "ID")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub personality_type: String,
    pub communication_style: String,
    pub knowledge_level: u8,
    pub aggressiveness_level: u8,
    pub patience_level: u8,
    pub emotional_reactivity: u8,
    pub voice_type: String,
    /// 1-5 scale.
    pub speaking_speed: u8,
    #[serde(rename = "ImageURL")]
    pub image_url: String,
    pub keywords: String,
}

/// The observer ("coach") profile that evaluates the trainee.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Observer {
    #[serde(rename = "ID")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub feedback_style: String,
    /// 1 (minimal) to 5 (frequent).
    pub intervention_level: u8,
    /// 1 (brief) to 5 (comprehensive).
    pub detail_level: u8,
    pub feedback_tone: String,
    pub success_metrics: String,
    #[serde(serialize_with = "empty_as_null", deserialize_with = "null_as_empty")]
    pub intervention_triggers: Vec<String>,
    pub active: bool,
}

fn empty_as_null<S: Serializer>(values: &[String], serializer: S) -> Result<S::Ok, S::Error> {
    if values.is_empty() {
        serializer.serialize_none()
    } else {
        values.serialize(serializer)
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl CatalogRecord for Scenario {
    const KIND: &'static str = "scenario";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn search_fields(&self) -> [&str; 3] {
        [&self.name, &self.description, &self.category]
    }
}

impl CatalogRecord for Avatar {
    const KIND: &'static str = "avatar";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn search_fields(&self) -> [&str; 3] {
        [&self.name, &self.description, &self.personality_type]
    }
}

impl CatalogRecord for Observer {
    const KIND: &'static str = "observer";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn search_fields(&self) -> [&str; 3] {
        [&self.name, &self.description, &self.feedback_style]
    }
}
