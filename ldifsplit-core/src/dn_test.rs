use super::*;

fn dn(text: &str) -> Dn {
    Dn::parse(text).expect("valid DN")
}

#[test]
fn canonical_form_folds_case_and_whitespace() {
    let a = dn("UID=Alice , OU=People, DC=Example, DC=Com");
    let b = dn("uid=alice,ou=people,dc=example,dc=com");
    assert_eq!(a, b);
    assert_eq!(a.canonical(), "uid=alice,ou=people,dc=example,dc=com");
}

#[test]
fn internal_whitespace_runs_collapse() {
    let a = dn("cn=John   Q.    Public,dc=example,dc=com");
    let b = dn("cn=john q. public,dc=example,dc=com");
    assert_eq!(a, b);
}

#[test]
fn multi_valued_rdn_is_order_independent() {
    let a = dn("cn=Alice+uid=alice,dc=example,dc=com");
    let b = dn("uid=alice+cn=Alice,dc=example,dc=com");
    assert_eq!(a.canonical(), b.canonical());
    assert_eq!(a.canonical(), "cn=alice+uid=alice,dc=example,dc=com");
}

#[test]
fn escaped_separators_stay_in_the_value() {
    let a = dn(r"cn=Smith\, John,dc=example,dc=com");
    assert_eq!(a.len(), 3);
    assert_eq!(a.components()[0].avas()[0].value(), "smith, john");
}

#[test]
fn hex_escapes_decode() {
    let a = dn(r"cn=fo\3do,dc=example,dc=com");
    assert_eq!(a.components()[0].avas()[0].value(), "fo=o");
}

#[test]
fn dangling_escape_is_rejected() {
    assert!(matches!(
        Dn::parse(r"cn=foo\"),
        Err(DnError::DanglingEscape(_))
    ));
}

#[test]
fn missing_separator_is_rejected() {
    assert!(matches!(
        Dn::parse("cn=foo,bar,dc=example"),
        Err(DnError::MissingSeparator(_))
    ));
}

#[test]
fn empty_dn_is_the_root_dse() {
    let root = dn("");
    assert!(root.is_empty());
    assert_eq!(root.parent(), None);
}

#[test]
fn ancestry_checks_are_strict() {
    let base = dn("ou=People,dc=example,dc=com");
    let same = dn("ou=people,dc=example,dc=com");
    let child = dn("uid=alice,ou=People,dc=example,dc=com");
    let grandchild = dn("cn=x,uid=alice,ou=People,dc=example,dc=com");
    let other = dn("uid=alice,ou=Groups,dc=example,dc=com");

    assert!(!same.is_below(&base));
    assert!(child.is_below(&base));
    assert!(grandchild.is_below(&base));
    assert!(!other.is_below(&base));
    assert!(!base.is_below(&child));

    assert_eq!(child.depth_below(&base), Some(1));
    assert_eq!(grandchild.depth_below(&base), Some(2));
    assert_eq!(same.depth_below(&base), None);
}

#[test]
fn relative_component_is_the_rdn_one_below_base() {
    let base = dn("ou=People,dc=example,dc=com");
    let child = dn("uid=alice,ou=People,dc=example,dc=com");
    let grandchild = dn("cn=x,uid=alice,ou=People,dc=example,dc=com");

    assert_eq!(child.relative_component(&base).unwrap().canonical(), "uid=alice");
    assert_eq!(
        grandchild.relative_component(&base).unwrap().canonical(),
        "uid=alice"
    );
    assert_eq!(base.relative_component(&base), None);
}

#[test]
fn ancestor_one_below_base() {
    let base = dn("ou=People,dc=example,dc=com");
    let grandchild = dn("cn=x,uid=alice,ou=People,dc=example,dc=com");
    assert_eq!(
        grandchild.ancestor_one_below(&base).unwrap(),
        dn("uid=alice,ou=People,dc=example,dc=com")
    );
    let child = dn("uid=alice,ou=People,dc=example,dc=com");
    assert_eq!(child.ancestor_one_below(&base).unwrap(), child);
}

#[test]
fn parent_walks_one_level() {
    let child = dn("uid=alice,ou=People,dc=example,dc=com");
    assert_eq!(child.parent().unwrap(), dn("ou=People,dc=example,dc=com"));
}

#[test]
fn display_round_trips_through_parse() {
    let a = dn(r"cn=Smith\, John+uid=jsmith,ou=People,dc=example,dc=com");
    let reparsed = dn(&a.to_string());
    assert_eq!(a, reparsed);
}
