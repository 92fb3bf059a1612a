use clap::{Parser, Subcommand};

use crate::export::ExportFormat;
use crate::models::{Entity, Realm};

#[derive(Parser)]
#[command(name = "eduadmin")]
#[command(about = "CLI client for the education-platform admin console: list, filter, export, and mutate entity collections")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in to a realm and store its bearer token
    Login {
        /// Realm to authenticate against (admin, university)
        #[arg(short, long, default_value = "admin")]
        realm: String,

        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: String,
    },

    /// Discard the stored token for a realm
    Logout {
        /// Realm to log out of (admin, university)
        #[arg(short, long, default_value = "admin")]
        realm: String,
    },

    /// List a collection with search, filters, pagination, and export
    List {
        /// Entity to list (run 'eduadmin entities' for the catalog)
        entity: String,

        /// Free-text search across the entity's searchable fields
        #[arg(short, long)]
        search: Option<String>,

        /// Exact-match filter as FIELD=VALUE (repeatable)
        #[arg(short, long = "filter")]
        filters: Vec<String>,

        /// Page to display
        #[arg(short, long, default_value = "1")]
        page: usize,

        /// Records per page (defaults to the configured page size)
        #[arg(long)]
        page_size: Option<usize>,

        /// Export the full filtered set instead of a page (csv, pdf)
        #[arg(short, long)]
        export: Option<String>,

        /// Output path for --export
        #[arg(short, long)]
        output: Option<String>,

        /// Print the filter options derived from the fetched data
        #[arg(long)]
        show_options: bool,
    },

    /// Refresh a collection on a fixed interval until interrupted
    Watch {
        /// Entity to watch
        entity: String,

        /// Refresh interval in milliseconds
        #[arg(short, long)]
        interval_ms: Option<u64>,
    },

    /// Create a record (inline JSON or @file.json)
    Create {
        entity: String,

        /// Record body as inline JSON, or @path to a JSON file
        #[arg(short, long)]
        data: String,
    },

    /// Update a record by id
    Update {
        entity: String,
        id: String,

        /// Record body as inline JSON, or @path to a JSON file
        #[arg(short, long)]
        data: String,
    },

    /// Delete a record by id
    Delete {
        entity: String,
        id: String,
    },

    /// List supported entities with their searchable and filter fields
    Entities,
}

impl Commands {
    pub fn parse_entity(name: &str) -> Result<Entity, anyhow::Error> {
        let normalized = name.to_lowercase();
        Entity::all()
            .iter()
            .copied()
            .find(|entity| entity.as_str() == normalized)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown entity: {}. Run 'eduadmin entities' for the supported list",
                    name
                )
            })
    }

    pub fn parse_realm(realm: &str) -> Result<Realm, anyhow::Error> {
        match realm.to_lowercase().as_str() {
            "admin" => Ok(Realm::Admin),
            "university" => Ok(Realm::University),
            other => Err(anyhow::anyhow!(
                "Unknown realm: {}. Supported realms: admin, university",
                other
            )),
        }
    }

    pub fn parse_export_format(format: &str) -> Result<ExportFormat, anyhow::Error> {
        match format.to_lowercase().as_str() {
            "csv" | "excel" => Ok(ExportFormat::Csv),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(anyhow::anyhow!(
                "Unsupported export format: {}. Supported formats: csv, pdf",
                other
            )),
        }
    }

    /// Split a FIELD=VALUE filter argument.
    pub fn parse_filter(spec: &str) -> Result<(String, String), anyhow::Error> {
        let (field, value) = spec.split_once('=').ok_or_else(|| {
            anyhow::anyhow!("Invalid filter '{}'. Expected FIELD=VALUE", spec)
        })?;
        if field.trim().is_empty() {
            return Err(anyhow::anyhow!("Invalid filter '{}'. Field name is empty", spec));
        }
        Ok((field.trim().to_string(), value.to_string()))
    }

    /// Mutation body: inline JSON, or @path to a JSON file. Must be a
    /// JSON object.
    pub fn parse_data(raw: &str) -> Result<serde_json::Value, anyhow::Error> {
        let text = if let Some(path) = raw.strip_prefix('@') {
            std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("Cannot read data file {}: {}", path, e))?
        } else {
            raw.to_string()
        };
        let value: serde_json::Value = serde_json::from_str(&text)?;
        if !value.is_object() {
            return Err(anyhow::anyhow!("Record body must be a JSON object"));
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entity_and_realm() {
        assert_eq!(
            Commands::parse_entity("Admission-Leads").unwrap(),
            Entity::AdmissionLeads
        );
        assert!(Commands::parse_entity("payroll").is_err());
        assert_eq!(Commands::parse_realm("university").unwrap(), Realm::University);
    }

    #[test]
    fn test_parse_filter_requires_field_and_separator() {
        assert_eq!(
            Commands::parse_filter("state=UP").unwrap(),
            ("state".to_string(), "UP".to_string())
        );
        // blank value means "no constraint" and is allowed
        assert_eq!(
            Commands::parse_filter("state=").unwrap(),
            ("state".to_string(), String::new())
        );
        assert!(Commands::parse_filter("state").is_err());
        assert!(Commands::parse_filter("=UP").is_err());
    }

    #[test]
    fn test_parse_data_rejects_non_objects() {
        assert!(Commands::parse_data(r#"{ "name": "x" }"#).is_ok());
        assert!(Commands::parse_data("[1, 2]").is_err());
        assert!(Commands::parse_data("not json").is_err());
    }
}
