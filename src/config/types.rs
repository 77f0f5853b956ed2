//! Model definition types, matching the JSON model file format.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryKeyConfig {
    Single(String),
    Composite(Vec<String>),
}

impl PrimaryKeyConfig {
    pub fn names(&self) -> Vec<&str> {
        match self {
            PrimaryKeyConfig::Single(s) => vec![s.as_str()],
            PrimaryKeyConfig::Composite(v) => v.iter().map(String::as_str).collect(),
        }
    }
}

/// One field of a model.
///
/// `ty` uses Go-like type names: `string`, `int`, `uint`, `float64`, `bool`, `time.Time`,
/// `uuid`, a scanner or model name, with `*` for optional and `[]` for lists.
/// `tag` carries ORM settings (`column:name;primaryKey;foreignKey:UserID;many2many:user_languages`),
/// `valid` carries validation rules (`required,length(6|20)~too short`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub valid: String,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        FieldDef {
            name: name.into(),
            ty: ty.into(),
            tag: String::new(),
            valid: String::new(),
        }
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn valid(mut self, valid: impl Into<String>) -> Self {
        self.valid = valid.into();
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<PrimaryKeyConfig>,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

impl ModelDef {
    pub fn new(name: impl Into<String>) -> Self {
        ModelDef {
            name: name.into(),
            table: None,
            primary_key: None,
            fields: Vec::new(),
        }
    }

    /// Adds the conventional `ID`, `CreatedAt` and `UpdatedAt` fields.
    pub fn with_id_and_timestamps(self) -> Self {
        self.field(FieldDef::new("ID", "uint").tag("primaryKey"))
            .field(FieldDef::new("CreatedAt", "time.Time"))
            .field(FieldDef::new("UpdatedAt", "time.Time"))
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn primary_key(mut self, names: &[&str]) -> Self {
        self.primary_key = Some(match names {
            [single] => PrimaryKeyConfig::Single((*single).to_string()),
            many => PrimaryKeyConfig::Composite(many.iter().map(|s| (*s).to_string()).collect()),
        });
        self
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }
}

/// Contents of a model definition file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ModelFile {
    #[serde(default)]
    pub models: Vec<ModelDef>,
}
