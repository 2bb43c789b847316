use serde::Deserialize;
use std::path::Path;

use crate::error::ConfigError;
use crate::types::DEFAULT_BATCH_SIZE;

/// TOML-backed tunables loaded from disk. Secrets stay as env vars.
///
/// Every section is optional; a missing file section falls back to defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FileConfig {
    pub source: SourceConfig,
    pub import: ImportConfig,
    pub fields: FieldMap,
    pub linker: LinkerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SourceConfig {
    pub database: String,
    pub collection: String,
    /// Documents whose identifier matches this pattern are design/meta
    /// documents and never leave the source.
    pub exclude_id_pattern: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            database: "sample_db".to_string(),
            collection: "sample_collection".to_string(),
            exclude_id_pattern: "^_design".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ImportConfig {
    pub batch_size: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LinkerConfig {
    pub members: Vec<String>,
    pub film_title: Option<String>,
}

/// Source keys consulted for each canonical field, in priority order.
/// The first key present with a non-null value wins.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FieldMap {
    pub source_id: Vec<String>,
    pub title: Vec<String>,
    pub year: Vec<String>,
    pub vote_count: Vec<String>,
    pub rating_class: Vec<String>,
    pub directors: Vec<String>,
    pub actors: Vec<String>,
    pub genres: Vec<String>,
    pub revenue: Vec<String>,
}

impl Default for FieldMap {
    fn default() -> Self {
        fn keys(names: &[&str]) -> Vec<String> {
            names.iter().map(|s| s.to_string()).collect()
        }

        Self {
            source_id: keys(&["_id", "id"]),
            title: keys(&["title", "Title"]),
            year: keys(&["year", "Year"]),
            vote_count: keys(&["Votes", "votes", "voteCount"]),
            rating_class: keys(&["rating", "Rating"]),
            directors: keys(&["Director", "director", "directors"]),
            actors: keys(&["Actors", "actors"]),
            genres: keys(&["genre", "genres", "Genre"]),
            revenue: keys(&["Revenue", "revenue"]),
        }
    }
}

impl FieldMap {
    fn groups(&self) -> [(&'static str, &Vec<String>); 9] {
        [
            ("source_id", &self.source_id),
            ("title", &self.title),
            ("year", &self.year),
            ("vote_count", &self.vote_count),
            ("rating_class", &self.rating_class),
            ("directors", &self.directors),
            ("actors", &self.actors),
            ("genres", &self.genres),
            ("revenue", &self.revenue),
        ]
    }

    /// Every distinct source key, in declaration order. Used as the source
    /// projection so only mapped fields cross the wire.
    pub fn all_keys(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for (_, keys) in self.groups() {
            for key in keys {
                if !out.contains(&key.as_str()) {
                    out.push(key.as_str());
                }
            }
        }
        out
    }
}

impl FileConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.import.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "import.batch_size must be greater than zero".to_string(),
            ));
        }
        for (field, keys) in self.fields.groups() {
            if keys.iter().all(|k| k.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "fields.{field} needs at least one source key"
                )));
            }
        }
        if self.source.collection.trim().is_empty() || self.source.database.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "source.database and source.collection must be set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load, parse and validate a TOML config file.
pub fn load_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: FileConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[source]
database = "cinema"
collection = "films"

[import]
batch_size = 100
"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.source.database, "cinema");
        assert_eq!(config.source.exclude_id_pattern, "^_design");
        assert_eq!(config.import.batch_size, 100);
        assert_eq!(config.fields, FieldMap::default());
        assert!(config.linker.members.is_empty());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[import]\nbatch_size = 0").unwrap();

        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_keys_fail_to_parse() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[import]\nbatchsize = 10").unwrap();

        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn empty_field_key_list_is_rejected() {
        let mut config = FileConfig::default();
        config.fields.title.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn all_keys_are_deduplicated() {
        let mut fields = FieldMap::default();
        fields.genres.push("title".to_string());
        let keys = fields.all_keys();
        assert_eq!(keys.iter().filter(|k| **k == "title").count(), 1);
        assert_eq!(keys[0], "_id");
    }
}
