//! Schema loading.
//!
//! The splitter only needs one thing from the directory schema: the
//! equality matching rule for each attribute, so that filter evaluation can
//! honor case sensitivity. Schema files are LDIF entries carrying
//! `attributeTypes` definitions; everything else in them is ignored.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::ldif::reader::{parse_record, RecordScanner};

pub type Result<T> = std::result::Result<T, SchemaError>;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("no schema files found at '{0}'")]
    NoSchemaFiles(PathBuf),

    #[error("unable to read schema file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unable to parse schema file '{path}': {message}")]
    Parse { path: PathBuf, message: String },
}

/// How two values of an attribute are compared for equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EqualityRule {
    /// Case-insensitive, whitespace-collapsed. The default for unknown
    /// attributes and absent schemas.
    #[default]
    CaseIgnore,
    /// Case-sensitive, whitespace-collapsed.
    CaseExact,
    /// Values are DNs; comparison goes through DN canonicalization.
    DistinguishedName,
}

#[derive(Debug, Clone)]
pub struct AttributeType {
    pub oid: String,
    pub names: Vec<String>,
    pub equality: EqualityRule,
}

/// Attribute definitions keyed by lowercased name (every NAME alias maps to
/// the same definition).
#[derive(Debug, Clone, Default)]
pub struct Schema {
    attributes: HashMap<String, AttributeType>,
}

impl Schema {
    /// Loads schema definitions from the given files and/or directories.
    /// Directories contribute their `*.ldif` files sorted by file name.
    /// At least one schema file must be found.
    pub fn load_paths(paths: &[PathBuf]) -> Result<Schema> {
        let mut files = Vec::new();
        for path in paths {
            if path.is_file() {
                files.push(path.clone());
            } else {
                files.extend(ldif_files_sorted(path)?);
            }
        }
        if files.is_empty() {
            let shown = paths.first().cloned().unwrap_or_default();
            return Err(SchemaError::NoSchemaFiles(shown));
        }

        let mut schema = Schema::default();
        for file in &files {
            schema.load_file(file)?;
        }
        debug!(
            files = files.len(),
            attributes = schema.attributes.len(),
            "loaded schema definitions"
        );
        Ok(schema)
    }

    /// Schema fallback from `$INSTANCE_ROOT/config/schema/*.ldif`. Any
    /// problem here silently yields no schema; an explicit `--schemaPath`
    /// is the place where failures are hard errors.
    pub fn from_instance_root() -> Option<Schema> {
        let root = std::env::var_os("INSTANCE_ROOT")?;
        let dir = Path::new(&root).join("config").join("schema");
        if !dir.is_dir() {
            return None;
        }
        match Schema::load_paths(&[dir]) {
            Ok(schema) => Some(schema),
            Err(e) => {
                warn!(error = %e, "ignoring unreadable INSTANCE_ROOT schema");
                None
            }
        }
    }

    /// The equality rule for an attribute, defaulting to caseIgnore.
    pub fn equality_rule(&self, attr: &str) -> EqualityRule {
        self.attributes
            .get(&attr.to_ascii_lowercase())
            .map(|a| a.equality)
            .unwrap_or_default()
    }

    pub fn attribute_type(&self, attr: &str) -> Option<&AttributeType> {
        self.attributes.get(&attr.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    fn load_file(&mut self, path: &Path) -> Result<()> {
        let file = File::open(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut scanner = RecordScanner::new(BufReader::new(file));
        loop {
            let record = scanner
                .next_record()
                .map_err(|source| SchemaError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
            let Some(record) = record else { break };
            let entry = parse_record(&record).map_err(|e| SchemaError::Parse {
                path: path.to_path_buf(),
                message: e.message,
            })?;
            for value in entry.values("attributeTypes") {
                let text = String::from_utf8_lossy(value);
                match parse_attribute_type(&text) {
                    Some(at) => self.insert(at),
                    None => {
                        return Err(SchemaError::Parse {
                            path: path.to_path_buf(),
                            message: format!("unparsable attributeTypes definition: {text}"),
                        })
                    }
                }
            }
        }
        Ok(())
    }

    fn insert(&mut self, at: AttributeType) {
        for name in &at.names {
            self.attributes.insert(name.to_ascii_lowercase(), at.clone());
        }
    }
}

fn ldif_files_sorted(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|source| SchemaError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .map(|ext| ext.eq_ignore_ascii_case("ldif"))
                    .unwrap_or(false)
        })
        .collect();
    files.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));
    Ok(files)
}

/// Extracts OID, NAME alias(es) and EQUALITY rule from an attributeTypes
/// definition such as:
/// `( 2.5.4.3 NAME ( 'cn' 'commonName' ) SUP name EQUALITY caseIgnoreMatch )`
fn parse_attribute_type(definition: &str) -> Option<AttributeType> {
    let body = definition.trim().strip_prefix('(')?.strip_suffix(')')?;
    let tokens = tokenize(body);

    let oid = tokens.first().cloned()?;
    let mut names = Vec::new();
    let mut equality = EqualityRule::CaseIgnore;

    let mut i = 1;
    while i < tokens.len() {
        match tokens[i].to_ascii_uppercase().as_str() {
            "NAME" => {
                i += 1;
                if i < tokens.len() && tokens[i] == "(" {
                    i += 1;
                    while i < tokens.len() && tokens[i] != ")" {
                        names.push(unquote(&tokens[i]));
                        i += 1;
                    }
                } else if i < tokens.len() {
                    names.push(unquote(&tokens[i]));
                }
            }
            "EQUALITY" => {
                i += 1;
                if i < tokens.len() {
                    equality = equality_rule_for(&tokens[i]);
                }
            }
            _ => {}
        }
        i += 1;
    }

    if names.is_empty() {
        // Nameless definitions are addressable only by OID.
        names.push(oid.clone());
    }
    Some(AttributeType {
        oid,
        names,
        equality,
    })
}

fn equality_rule_for(rule: &str) -> EqualityRule {
    match rule.to_ascii_lowercase().as_str() {
        "caseexactmatch" | "caseexactia5match" => EqualityRule::CaseExact,
        "distinguishednamematch" => EqualityRule::DistinguishedName,
        _ => EqualityRule::CaseIgnore,
    }
}

fn tokenize(body: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = body.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '(' || c == ')' {
            chars.next();
            tokens.push(c.to_string());
        } else if c == '\'' {
            chars.next();
            let mut token = String::from("'");
            for c in chars.by_ref() {
                token.push(c);
                if c == '\'' {
                    break;
                }
            }
            tokens.push(token);
        } else {
            let mut token = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() || c == '(' || c == ')' {
                    break;
                }
                token.push(c);
                chars.next();
            }
            tokens.push(token);
        }
    }
    tokens
}

fn unquote(token: &str) -> String {
    token.trim_matches('\'').to_string()
}

#[cfg(test)]
#[path = "schema_test.rs"]
mod tests;
