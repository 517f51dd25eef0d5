use super::*;
use std::io::Write;

const SCHEMA_LDIF: &str = "\
dn: cn=schema
objectClass: top
objectClass: ldapSubentry
objectClass: subschema
attributeTypes: ( 2.5.4.3 NAME ( 'cn' 'commonName' ) SUP name
  EQUALITY caseIgnoreMatch SYNTAX 1.3.6.1.4.1.1466.115.121.1.15 )
attributeTypes: ( 0.9.2342.19200300.100.1.1 NAME 'uid' EQUALITY caseIgnoreMatch
  SYNTAX 1.3.6.1.4.1.1466.115.121.1.15 )
attributeTypes: ( 2.16.840.1.113730.3.1.500 NAME 'mailHost'
  EQUALITY caseExactIA5Match SYNTAX 1.3.6.1.4.1.1466.115.121.1.26 )
attributeTypes: ( 2.5.4.49 NAME 'distinguishedName'
  EQUALITY distinguishedNameMatch SYNTAX 1.3.6.1.4.1.1466.115.121.1.12 )
";

fn write_schema_file(dir: &std::path::Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(content.as_bytes()).unwrap();
    path
}

#[test]
fn loads_equality_rules_from_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_schema_file(dir.path(), "00-core.ldif", SCHEMA_LDIF);

    let schema = Schema::load_paths(&[path]).unwrap();
    assert_eq!(schema.equality_rule("cn"), EqualityRule::CaseIgnore);
    assert_eq!(schema.equality_rule("commonName"), EqualityRule::CaseIgnore);
    assert_eq!(schema.equality_rule("mailHost"), EqualityRule::CaseExact);
    assert_eq!(
        schema.equality_rule("distinguishedName"),
        EqualityRule::DistinguishedName
    );
    // Unknown attributes degrade to caseIgnore.
    assert_eq!(schema.equality_rule("noSuchAttr"), EqualityRule::CaseIgnore);
}

#[test]
fn directories_contribute_ldif_files_only() {
    let dir = tempfile::tempdir().unwrap();
    write_schema_file(dir.path(), "00-core.ldif", SCHEMA_LDIF);
    write_schema_file(dir.path(), "notes.txt", "not a schema file");

    let schema = Schema::load_paths(&[dir.path().to_path_buf()]).unwrap();
    assert!(schema.attribute_type("uid").is_some());
}

#[test]
fn empty_directory_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Schema::load_paths(&[dir.path().to_path_buf()]).unwrap_err();
    assert!(matches!(err, SchemaError::NoSchemaFiles(_)));
}

#[test]
fn name_aliases_share_one_definition() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_schema_file(dir.path(), "00-core.ldif", SCHEMA_LDIF);
    let schema = Schema::load_paths(&[path]).unwrap();
    let at = schema.attribute_type("commonname").unwrap();
    assert_eq!(at.oid, "2.5.4.3");
    assert_eq!(at.names, vec!["cn".to_string(), "commonName".to_string()]);
}
