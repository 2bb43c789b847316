use crate::error::ConfigError;

/// Connection secrets loaded from environment variables (and `.env`).
///
/// Every value is optional at load time: a dry run from a JSON Lines file
/// needs neither store, so each command asks only for what it touches.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    // MongoDB
    pub mongodb_uri: Option<String>,

    // Neo4j
    pub neo4j_uri: Option<String>,
    pub neo4j_user: Option<String>,
    pub neo4j_password: Option<String>,
}

/// Resolved Neo4j connection parameters.
#[derive(Debug, Clone)]
pub struct Neo4jCredentials {
    pub uri: String,
    pub user: String,
    pub password: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let config = Self {
            mongodb_uri: non_empty_env("MONGODB_URI"),
            neo4j_uri: non_empty_env("NEO4J_URI"),
            neo4j_user: non_empty_env("NEO4J_USER"),
            neo4j_password: non_empty_env("NEO4J_PASSWORD"),
        };

        config.log_keys();
        config
    }

    pub fn mongodb_uri(&self) -> Result<&str, ConfigError> {
        self.mongodb_uri
            .as_deref()
            .ok_or(ConfigError::MissingEnv("MONGODB_URI"))
    }

    pub fn neo4j(&self) -> Result<Neo4jCredentials, ConfigError> {
        Ok(Neo4jCredentials {
            uri: self
                .neo4j_uri
                .clone()
                .ok_or(ConfigError::MissingEnv("NEO4J_URI"))?,
            user: self
                .neo4j_user
                .clone()
                .ok_or(ConfigError::MissingEnv("NEO4J_USER"))?,
            password: self
                .neo4j_password
                .clone()
                .ok_or(ConfigError::MissingEnv("NEO4J_PASSWORD"))?,
        })
    }

    fn log_keys(&self) {
        fn preview(val: &Option<String>) -> String {
            match val {
                Some(v) => {
                    let head: String = v.chars().take(8).collect();
                    format!("{head}...({} chars)", v.chars().count())
                }
                None => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  MONGODB_URI: {}", preview(&self.mongodb_uri));
        tracing::info!("  NEO4J_URI: {}", preview(&self.neo4j_uri));
        tracing::info!("  NEO4J_USER: {}", preview(&self.neo4j_user));
        tracing::info!(
            "  NEO4J_PASSWORD: {}",
            if self.neo4j_password.is_some() { "<set>" } else { "<not set>" }
        );
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_neo4j_user_is_named() {
        let config = AppConfig {
            neo4j_uri: Some("bolt://localhost:7687".into()),
            neo4j_password: Some("secret".into()),
            ..Default::default()
        };
        let err = config.neo4j().unwrap_err();
        assert_eq!(err.to_string(), "NEO4J_USER environment variable is required");
    }

    #[test]
    fn mongodb_uri_is_returned_when_set() {
        let config = AppConfig {
            mongodb_uri: Some("mongodb://localhost:27017".into()),
            ..Default::default()
        };
        assert_eq!(config.mongodb_uri().unwrap(), "mongodb://localhost:27017");
        assert!(AppConfig::default().mongodb_uri().is_err());
    }
}
