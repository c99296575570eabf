//! Command-line interface for mongocursor
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading and argument overrides
//! - Turning query arguments into a `QueryDescriptor`

use bson::{Bson, Document};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::Config;
use crate::cursor::{Hint, QueryDescriptor, SortSpec};
use crate::error::{Result, ValidationError};

/// Run a query cursor against a MongoDB collection
#[derive(Parser, Debug)]
#[command(
    name = "mongocursor",
    version,
    about = "Run a query cursor against a MongoDB collection",
    long_about = "Runs a find query through the mongocursor engine and prints the \
resulting documents as relaxed extended JSON, one per line."
)]
pub struct CliArgs {
    /// MongoDB connection URI
    ///
    /// Format: mongodb://[username:password@]host[:port][/database][?options]
    #[arg(value_name = "URI")]
    pub uri: Option<String>,

    /// Database name to use
    #[arg(short = 'd', long, value_name = "NAME")]
    pub database: Option<String>,

    /// Collection to query
    #[arg(short = 'C', long, value_name = "NAME")]
    pub collection: String,

    /// Filter document (extended JSON)
    #[arg(short = 'f', long, value_name = "JSON", default_value = "{}")]
    pub filter: String,

    /// Projection document (extended JSON)
    #[arg(long, value_name = "JSON")]
    pub projection: Option<String>,

    /// Sort fields, e.g. `age:desc,name`
    #[arg(short = 's', long, value_name = "FIELD[:DIR],...")]
    pub sort: Option<String>,

    /// Number of documents to skip
    #[arg(long, default_value_t = 0)]
    pub skip: u32,

    /// Maximum number of documents (0 = no limit)
    #[arg(short = 'l', long, default_value_t = 0, allow_hyphen_values = true)]
    pub limit: i32,

    /// Index hint: key pattern as JSON, or an index name
    #[arg(long, value_name = "JSON|NAME")]
    pub hint: Option<String>,

    /// Request snapshot mode
    #[arg(long)]
    pub snapshot: bool,

    /// Disable the server-side cursor timeout
    #[arg(long)]
    pub no_timeout: bool,

    /// Page size for unbounded queries
    #[arg(long, value_name = "N")]
    pub batch_size: Option<u32>,

    /// How to consume the cursor
    #[arg(short = 'm', long, value_enum, default_value_t = Mode::Array)]
    pub mode: Mode,

    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Verbose mode (debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Very verbose mode (trace logging)
    #[arg(long = "vv")]
    pub very_verbose: bool,
}

/// Cursor consumption mode
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Materialize every document
    Array,
    /// Push documents one by one
    Each,
    /// Pull only the first document
    Next,
    /// Print the query plan
    Explain,
    /// Print the number of matching documents
    Count,
}

/// CLI interface handler
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Loaded configuration
    config: Config,
}

impl CliInterface {
    /// Parse arguments and load configuration
    pub fn new() -> Result<Self> {
        let args = CliArgs::parse();
        Self::from_args(args)
    }

    /// Build from already-parsed arguments
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let mut config = Config::load(args.config_file.as_deref())?;
        Self::apply_args_to_config(&mut config, &args);
        config.validate()?;
        Ok(Self { args, config })
    }

    /// Override configuration values with the arguments that were given
    fn apply_args_to_config(config: &mut Config, args: &CliArgs) {
        if let Some(uri) = &args.uri {
            config.connection.uri = uri.clone();
        }
        if let Some(database) = &args.database {
            config.connection.database = database.clone();
        }
        if let Some(batch_size) = args.batch_size {
            config.cursor.batch_size = batch_size;
        }
        if args.no_timeout {
            config.cursor.no_timeout = true;
        }
    }

    /// Build the query descriptor from the arguments
    pub fn descriptor(&self) -> Result<QueryDescriptor> {
        let args = &self.args;
        let mut descriptor = QueryDescriptor::new(parse_json_document(&args.filter, "filter")?)
            .skip(args.skip)
            .limit(args.limit)
            .snapshot(args.snapshot)
            .no_timeout(self.config.cursor.no_timeout);

        if let Some(projection) = &args.projection {
            descriptor = descriptor.projection(parse_json_document(projection, "projection")?);
        }
        if let Some(sort) = &args.sort {
            descriptor = descriptor.sort(parse_sort(sort)?);
        }
        if let Some(hint) = &args.hint {
            descriptor = descriptor.hint(parse_hint(hint)?);
        }

        Ok(descriptor)
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the CLI arguments
    pub fn args(&self) -> &CliArgs {
        &self.args
    }
}

/// Parse an extended-JSON object into a document
pub fn parse_json_document(input: &str, what: &str) -> Result<Document> {
    let value: serde_json::Value = serde_json::from_str(input)
        .map_err(|e| ValidationError::InvalidArgument(format!("{what}: {e}")))?;

    match Bson::try_from(value) {
        Ok(Bson::Document(doc)) => Ok(doc),
        Ok(_) => Err(ValidationError::InvalidArgument(format!("{what} must be a JSON object")).into()),
        Err(e) => Err(ValidationError::InvalidArgument(format!("{what}: {e}")).into()),
    }
}

/// Parse `field[:direction],...` into a sort list
///
/// Directions are passed through untouched; they are validated when the
/// query is generated.
pub fn parse_sort(input: &str) -> Result<SortSpec> {
    let mut elements = Vec::new();

    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let element = match part.split_once(':') {
            Some((field, direction)) => Bson::Array(vec![
                Bson::String(field.trim().to_string()),
                Bson::String(direction.trim().to_string()),
            ]),
            None => Bson::String(part.to_string()),
        };
        elements.push(element);
    }

    if elements.is_empty() {
        return Err(ValidationError::InvalidArgument("sort must name at least one field".into()).into());
    }

    Ok(SortSpec::from_bson(Bson::Array(elements)))
}

/// Parse a hint: a JSON key pattern or an index name
pub fn parse_hint(input: &str) -> Result<Hint> {
    let trimmed = input.trim();
    if trimmed.starts_with('{') {
        Ok(Hint::Keys(parse_json_document(trimmed, "hint")?))
    } else {
        Ok(Hint::Name(trimmed.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_parse_json_document() {
        let doc = parse_json_document(r#"{"status": "active", "age": {"$gt": 21}}"#, "filter").unwrap();
        assert_eq!(doc, doc! { "status": "active", "age": { "$gt": 21 } });

        assert!(parse_json_document("[1, 2]", "filter").is_err());
        assert!(parse_json_document("{not json", "filter").unwrap_err().is_validation_error());
    }

    #[test]
    fn test_parse_sort() {
        let spec = parse_sort("age:desc, name").unwrap();
        assert_eq!(spec.normalize().unwrap(), doc! { "age": -1, "name": 1 });

        assert!(parse_sort(" , ").is_err());
        // Bad directions only fail once normalized.
        assert!(parse_sort("age:up").unwrap().normalize().is_err());
    }

    #[test]
    fn test_parse_hint() {
        assert_eq!(parse_hint("age_1").unwrap(), Hint::Name("age_1".to_string()));
        assert_eq!(parse_hint(r#"{"age": 1}"#).unwrap(), Hint::Keys(doc! { "age": 1 }));
    }

    #[test]
    fn test_args_override_config() {
        let args = CliArgs::parse_from([
            "mongocursor",
            "mongodb://db.internal:27017",
            "--database",
            "shop",
            "--collection",
            "users",
            "--limit",
            "-5",
            "--batch-size",
            "50",
            "--no-timeout",
        ]);
        let mut config = Config::default();
        CliInterface::apply_args_to_config(&mut config, &args);

        assert_eq!(config.connection.uri, "mongodb://db.internal:27017");
        assert_eq!(config.connection.database, "shop");
        assert_eq!(config.cursor.batch_size, 50);
        assert!(config.cursor.no_timeout);
        assert_eq!(args.limit, -5);
        assert_eq!(args.mode, Mode::Array);
    }

    #[test]
    fn test_descriptor_from_args() {
        let args = CliArgs::parse_from([
            "mongocursor",
            "-C",
            "users",
            "--filter",
            r#"{"status": "active"}"#,
            "--sort",
            "age:desc",
            "--hint",
            "age_1",
            "--limit",
            "10",
            "--mode",
            "each",
        ]);
        let cli = CliInterface {
            args,
            config: Config::default(),
        };

        let descriptor = cli.descriptor().unwrap();

        assert_eq!(descriptor.filter, doc! { "status": "active" });
        assert_eq!(descriptor.limit, 10);
        assert_eq!(descriptor.hint, Some(Hint::Name("age_1".to_string())));
        assert!(descriptor.sort.is_some());
        assert!(!descriptor.no_timeout);
        assert_eq!(cli.args().mode, Mode::Each);
    }
}
