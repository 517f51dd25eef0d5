use super::*;
use crate::pipeline::StreamItem;
use ldifsplit_core::{Dn, Entry, MalformedRecord};
use ldifsplit_router::{OutsideHandling, SplitStrategy, Translator};
use std::io::Read;

fn base() -> Dn {
    Dn::parse("ou=People,dc=example,dc=com").unwrap()
}

fn entry(dn: &str, attrs: &[(&str, &str)]) -> Entry {
    let mut e = Entry::new(Dn::parse(dn).unwrap(), dn);
    for (name, value) in attrs {
        e.add_value(name, value.as_bytes().to_vec());
    }
    e
}

fn attribute_hash_translator() -> Arc<Translator> {
    Arc::new(Translator::new(
        SplitStrategy::hash_on_attribute(
            base(),
            4,
            "uid".to_string(),
            false,
            false,
            OutsideHandling::Omit,
        )
        .unwrap(),
    ))
}

fn read_file(path: &std::path::Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[test]
fn deferred_entries_get_a_second_chance_at_drain_time() {
    let translator = attribute_hash_translator();
    let dir = tempfile::tempdir().unwrap();

    // Worker race: the child is translated before its parent, so its
    // decision is deferred. By drain time the parent has been committed.
    let child = translator.translate(
        1,
        entry("cn=phone,uid=a,ou=People,dc=example,dc=com", &[]),
    );
    assert!(matches!(child.decision, RouteDecision::Deferred));
    let parent = translator.translate(
        0,
        entry("uid=a,ou=People,dc=example,dc=com", &[("uid", "a")]),
    );
    let RouteDecision::Route(parent_set) = parent.decision.clone() else {
        panic!("parent must route immediately");
    };
    let parent_suffix = parent_set[0].file_suffix();

    let dispatcher = Dispatcher::new(dir.path().join("out.ldif"), false, translator);
    let summary = dispatcher
        .run(vec![StreamItem::Entry(parent), StreamItem::Entry(child)].into_iter())
        .unwrap();

    assert!(summary.success);
    assert_eq!(summary.entries_read, 2);
    let shard = read_file(&dir.path().join(format!("out.ldif{parent_suffix}")));
    assert!(shard.contains("dn: uid=a,ou=People,dc=example,dc=com"));
    assert!(shard.contains("dn: cn=phone,uid=a,ou=People,dc=example,dc=com"));
}

#[test]
fn entries_with_no_parent_anywhere_go_to_the_errors_set() {
    let translator = attribute_hash_translator();
    let dir = tempfile::tempdir().unwrap();

    let orphan = translator.translate(
        0,
        entry("cn=phone,uid=ghost,ou=People,dc=example,dc=com", &[]),
    );
    assert!(matches!(orphan.decision, RouteDecision::Deferred));

    let dispatcher = Dispatcher::new(dir.path().join("out.ldif"), false, translator);
    let summary = dispatcher
        .run(vec![StreamItem::Entry(orphan)].into_iter())
        .unwrap();

    assert!(!summary.success);
    let errors = read_file(&dir.path().join("out.ldif.errors"));
    assert!(errors.starts_with(
        "# entry 'cn=phone,uid=ghost,ou=People,dc=example,dc=com' has no parent in a previously-seen shard\n"
    ));
    assert!(errors.contains("dn: cn=phone,uid=ghost,ou=People,dc=example,dc=com"));
    assert!(errors.ends_with("\n\n"));
}

#[test]
fn excluded_entries_are_counted_and_not_written() {
    let translator = attribute_hash_translator();
    let dir = tempfile::tempdir().unwrap();

    let outside = translator.translate(0, entry("dc=example,dc=com", &[]));
    let inside = translator.translate(
        1,
        entry("uid=a,ou=People,dc=example,dc=com", &[("uid", "a")]),
    );

    let dispatcher = Dispatcher::new(dir.path().join("out.ldif"), false, translator);
    let summary = dispatcher
        .run(vec![StreamItem::Entry(outside), StreamItem::Entry(inside)].into_iter())
        .unwrap();

    assert!(summary.success);
    assert_eq!(summary.entries_read, 2);
    assert_eq!(summary.entries_excluded, 1);
    // Only the one shard that received the inside entry exists.
    assert_eq!(summary.files.len(), 1);
    assert!(!dir.path().join("out.ldif.outside-split-base-dn").exists());
}

#[test]
fn malformed_records_are_preserved_in_the_errors_set() {
    let translator = attribute_hash_translator();
    let dir = tempfile::tempdir().unwrap();

    let good = translator.translate(
        0,
        entry("uid=a,ou=People,dc=example,dc=com", &[("uid", "a")]),
    );
    let malformed = StreamItem::Malformed {
        seq: 1,
        error: MalformedRecord {
            line: 4,
            message: "the record does not begin with a 'dn:' line".to_string(),
            lines: vec!["uid: broken".to_string(), "objectClass: person".to_string()],
        },
    };

    let dispatcher = Dispatcher::new(dir.path().join("out.ldif"), false, translator);
    let summary = dispatcher
        .run(vec![StreamItem::Entry(good), malformed].into_iter())
        .unwrap();

    // The valid entry is still routed; the run as a whole is failed.
    assert!(!summary.success);
    assert_eq!(summary.entries_read, 1);
    let errors = read_file(&dir.path().join("out.ldif.errors"));
    assert_eq!(
        errors,
        "# the record does not begin with a 'dn:' line\nuid: broken\nobjectClass: person\n\n"
    );
}

#[test]
fn compressed_output_carries_a_complete_gzip_stream() {
    let translator = attribute_hash_translator();
    let dir = tempfile::tempdir().unwrap();

    let e = translator.translate(
        0,
        entry("uid=a,ou=People,dc=example,dc=com", &[("uid", "a")]),
    );
    let RouteDecision::Route(set) = e.decision.clone() else {
        panic!("expected immediate routing");
    };
    let suffix = set[0].file_suffix();

    let dispatcher = Dispatcher::new(dir.path().join("out.ldif"), true, translator);
    let summary = dispatcher
        .run(vec![StreamItem::Entry(e)].into_iter())
        .unwrap();
    assert!(summary.success);

    let file = std::fs::File::open(dir.path().join(format!("out.ldif{suffix}"))).unwrap();
    let mut decoded = String::new();
    flate2::read::GzDecoder::new(file)
        .read_to_string(&mut decoded)
        .unwrap();
    assert!(decoded.contains("dn: uid=a,ou=People,dc=example,dc=com"));
}

#[test]
fn replicated_entries_count_once_per_shard() {
    let translator = Arc::new(Translator::new(
        SplitStrategy::hash_on_rdn(base(), 2, OutsideHandling::AllSets).unwrap(),
    ));
    let dir = tempfile::tempdir().unwrap();

    let outside = translator.translate(0, entry("dc=example,dc=com", &[]));
    let dispatcher = Dispatcher::new(dir.path().join("out.ldif"), false, translator);
    let summary = dispatcher
        .run(vec![StreamItem::Entry(outside)].into_iter())
        .unwrap();

    assert!(summary.success);
    assert_eq!(summary.files.len(), 2);
    for (path, entries) in &summary.files {
        assert_eq!(*entries, 1, "{}", path.display());
    }
}

#[test]
fn read_errors_stop_the_run_and_fail_it() {
    let translator = attribute_hash_translator();
    let dir = tempfile::tempdir().unwrap();

    let good = translator.translate(
        0,
        entry("uid=a,ou=People,dc=example,dc=com", &[("uid", "a")]),
    );
    let items = vec![
        StreamItem::Entry(good),
        StreamItem::ReadError {
            seq: 1,
            error: std::io::Error::other("disk pulled"),
        },
    ];

    let dispatcher = Dispatcher::new(dir.path().join("out.ldif"), false, translator);
    let summary = dispatcher.run(items.into_iter()).unwrap();
    assert!(!summary.success);
    assert_eq!(summary.entries_read, 1);
}
