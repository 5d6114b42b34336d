mod common;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use tracing::Level;
use zarp_samples::domain::{Accession, LibraryPaths, ReferenceKind};
use zarp_samples::error::ZarpError;
use zarp_samples::sample::{Sample, SampleConfig};
use zarp_samples::schema::{Column, ColumnKind, Schema};
use zarp_samples::store::{MergeKey, PathResolution, RecordStore};
use zarp_samples::table::Table;
use zarp_samples::value::Value;

fn schema() -> Schema {
    let column = |name: &str, kind| Column {
        name: name.to_string(),
        kind,
    };
    Schema::new(vec![
        column("name", ColumnKind::Text),
        column("identifier", ColumnKind::Text),
        column("paths_1", ColumnKind::Path),
        column("source", ColumnKind::Text),
    ])
    .unwrap()
}

fn rows(rows: &[[&str; 3]]) -> Table {
    Table::from_rows(
        ["name", "paths_1", "source"],
        rows.iter()
            .map(|row| {
                row.iter()
                    .map(|cell| match *cell {
                        "-" => Value::Null,
                        value => Value::from(value),
                    })
                    .collect::<Vec<_>>()
            })
            .collect(),
    )
    .unwrap()
}

fn store_with(table: &Table) -> RecordStore {
    let mut store = RecordStore::new(schema());
    store.append(table, &PathResolution::disabled());
    store
}

#[test]
fn appending_same_row_twice_keeps_one() {
    let mut store = RecordStore::new(schema());
    let table = rows(&[["a", "/data/a.fq", "human"]]);

    let (first, warnings) =
        common::capture_warnings(|| store.append(&table, &PathResolution::disabled()));
    assert_eq!(first, 1);
    assert!(warnings.is_empty(), "{warnings:?}");

    let (second, warnings) =
        common::capture_warnings(|| store.append(&table, &PathResolution::disabled()));
    assert_eq!(second, 0);
    assert_eq!(warnings.len(), 1, "{warnings:?}");
    assert!(warnings[0].contains("duplicate records"));
    assert_eq!(store.len(), 1);
}

#[test]
fn duplicates_within_one_batch_collapse() {
    let mut store = RecordStore::new(schema());
    let table = rows(&[
        ["a", "/data/a.fq", "human"],
        ["b", "/data/b.fq", "human"],
        ["a", "/data/a.fq", "human"],
    ]);

    assert_eq!(store.append(&table, &PathResolution::disabled()), 2);
    let names = store
        .records()
        .map(|record| record.get("name").unwrap().render())
        .collect::<Vec<_>>();
    assert_eq!(names, ["a", "b"]);
}

#[test]
fn append_projects_onto_schema() {
    let mut store = RecordStore::new(schema());
    let table = Table::from_rows(
        ["extra", "name"],
        vec![vec![Value::from("ignored"), Value::from("a")]],
    )
    .unwrap();
    store.append(&table, &PathResolution::disabled());

    let snapshot = store.table();
    assert_eq!(snapshot.columns(), ["name", "identifier", "paths_1", "source"]);
    assert_eq!(snapshot.get(0, "identifier"), Some(&Value::Null));
    assert!(!snapshot.has_column("extra"));
}

#[test]
fn nan_and_null_are_the_same_content() {
    let mut store = RecordStore::new(schema());
    let first = Table::from_rows(["name", "source"], vec![vec![Value::from("a"), Value::Null]]).unwrap();
    let second = Table::from_rows(
        ["name", "source"],
        vec![vec![Value::from("a"), Value::Float(f64::NAN)]],
    )
    .unwrap();

    store.append(&first, &PathResolution::disabled());
    assert_eq!(store.append(&second, &PathResolution::disabled()), 0);
}

#[test]
fn relative_paths_resolve_against_anchor() {
    let mut store = RecordStore::new(schema());
    let paths = PathResolution::for_schema(&schema(), "/anchor");
    store.append(
        &rows(&[["a", "reads/a.fq", "human"], ["b", "/abs/b.fq", "human"], ["c", "-", "x"]]),
        &paths,
    );

    let snapshot = store.table();
    assert_eq!(
        snapshot.get(0, "paths_1"),
        Some(&Value::Path(Utf8PathBuf::from("/anchor/reads/a.fq")))
    );
    assert_eq!(snapshot.get(1, "paths_1"), Some(&Value::from("/abs/b.fq")));
    assert_eq!(snapshot.get(2, "paths_1"), Some(&Value::Null));
    assert_eq!(snapshot.get(0, "source"), Some(&Value::from("human")));
}

#[test]
fn positional_update_requires_equal_length() {
    let mut store = store_with(&rows(&[["a", "-", "-"], ["b", "-", "-"]]));
    let before = store.table();

    let err = store
        .update(
            &rows(&[["a", "-", "human"]]),
            &MergeKey::Position,
            false,
            &PathResolution::disabled(),
        )
        .unwrap_err();
    assert_matches!(err, ZarpError::LengthMismatch { expected: 2, actual: 1 });
    assert_eq!(store.table(), before);
}

#[test]
fn keyed_update_requires_key_on_both_sides() {
    let mut store = store_with(&rows(&[["a", "-", "-"]]));
    let incoming = Table::from_rows(["source"], vec![vec![Value::from("human")]]).unwrap();

    let err = store
        .update(
            &incoming,
            &MergeKey::Column("name".to_string()),
            false,
            &PathResolution::disabled(),
        )
        .unwrap_err();
    assert_matches!(err, ZarpError::MissingColumn(column) if column == "name");

    let err = store
        .update(
            &incoming,
            &MergeKey::Column("missing".to_string()),
            false,
            &PathResolution::disabled(),
        )
        .unwrap_err();
    assert_matches!(err, ZarpError::MissingColumn(_));
}

#[test]
fn update_without_overwrite_fills_nulls_only() {
    let mut store = store_with(&rows(&[["a", "-", "mouse"], ["b", "-", "-"]]));
    let incoming = rows(&[["a", "/x/a.fq", "human"], ["b", "-", "human"]]);

    let matched = store
        .update(
            &incoming,
            &MergeKey::Column("name".to_string()),
            false,
            &PathResolution::disabled(),
        )
        .unwrap();
    assert_eq!(matched, 2);

    let snapshot = store.table();
    assert_eq!(snapshot.get(0, "source"), Some(&Value::from("mouse")));
    assert_eq!(snapshot.get(0, "paths_1"), Some(&Value::from("/x/a.fq")));
    assert_eq!(snapshot.get(1, "source"), Some(&Value::from("human")));
    assert_eq!(snapshot.get(1, "paths_1"), Some(&Value::Null));
}

#[test]
fn update_with_overwrite_replaces_values() {
    let mut store = store_with(&rows(&[["a", "-", "mouse"], ["b", "-", "rat"]]));
    let incoming = rows(&[["x", "-", "human"], ["y", "-", "-"]]);

    store
        .update(&incoming, &MergeKey::Position, true, &PathResolution::disabled())
        .unwrap();

    let snapshot = store.table();
    assert_eq!(snapshot.get(0, "name"), Some(&Value::from("x")));
    assert_eq!(snapshot.get(0, "source"), Some(&Value::from("human")));
    assert_eq!(snapshot.get(1, "source"), Some(&Value::from("rat")));
    assert_eq!(store.len(), 2);
}

#[test]
fn keyed_update_never_drops_unmatched_rows() {
    let mut store = store_with(&rows(&[["a", "-", "-"], ["b", "-", "-"]]));
    let incoming = rows(&[["b", "-", "human"], ["c", "-", "human"]]);

    let matched = store
        .update(
            &incoming,
            &MergeKey::Column("name".to_string()),
            false,
            &PathResolution::disabled(),
        )
        .unwrap();
    assert_eq!(matched, 1);
    assert_eq!(store.len(), 2);
    assert_eq!(store.table().get(0, "source"), Some(&Value::Null));
}

#[test]
fn duplicate_incoming_keys_are_rejected() {
    let mut store = store_with(&rows(&[["a", "-", "-"]]));
    let incoming = rows(&[["a", "-", "human"], ["a", "-", "mouse"]]);

    let err = store
        .update(
            &incoming,
            &MergeKey::Column("name".to_string()),
            false,
            &PathResolution::disabled(),
        )
        .unwrap_err();
    assert_matches!(err, ZarpError::DuplicateKey { key, .. } if key == "a");
    assert_eq!(store.table().get(0, "source"), Some(&Value::Null));
}

#[test]
fn update_rehashes_records() {
    let mut store = store_with(&rows(&[["a", "-", "-"]]));
    let before = store.records().next().unwrap().hash();

    store
        .update(
            &rows(&[["a", "-", "human"]]),
            &MergeKey::Position,
            false,
            &PathResolution::disabled(),
        )
        .unwrap();
    let after = store.records().next().unwrap().hash();
    assert_ne!(before, after);

    assert_eq!(
        store.append(&rows(&[["a", "-", "human"]]), &PathResolution::disabled()),
        0
    );
    assert!(store.contains(&after));
}

#[test]
fn samples_expand_into_record_columns() {
    let mut store = RecordStore::zarp();
    let defaults = SampleConfig::default();
    let single = Sample::new(
        ReferenceKind::LocalSingle,
        Some("single".to_string()),
        None,
        Some(&LibraryPaths::single(Utf8PathBuf::from("/data/s.fq"))),
        &defaults,
    );
    let paired = Sample::new(
        ReferenceKind::LocalPaired,
        Some("paired".to_string()),
        None,
        Some(&LibraryPaths::paired(
            Utf8PathBuf::from("/data/p_1.fq"),
            Utf8PathBuf::from("/data/p_2.fq"),
        )),
        &defaults,
    );
    let accession: Accession = "SRR1234567".parse().unwrap();
    let remote = Sample::new(
        ReferenceKind::RemoteAccession,
        None,
        Some(&accession),
        None,
        &defaults,
    );

    let paths = PathResolution::for_schema(store.schema(), "/anchor");
    assert_eq!(store.append_samples(&[single, paired, remote], &paths).unwrap(), 3);

    let snapshot = store.table();
    assert_eq!(snapshot.get(0, "paths_2"), Some(&Value::Null));
    assert_eq!(
        snapshot.get(1, "paths_2"),
        Some(&Value::Path(Utf8PathBuf::from("/data/p_2.fq")))
    );
    assert_eq!(snapshot.get(2, "paths_1"), Some(&Value::Null));
    assert_eq!(snapshot.get(2, "identifier"), Some(&Value::from("SRR1234567")));
    assert_eq!(snapshot.get(0, "salmon_kmer_size"), Some(&Value::Integer(31)));

    let remote = store
        .records_of_kind(ReferenceKind::RemoteAccession)
        .collect::<Vec<_>>();
    assert_eq!(remote.len(), 1);
    assert_eq!(remote[0].kind(), Some(ReferenceKind::RemoteAccession));
}

#[test]
fn view_does_not_mutate() {
    let store = store_with(&rows(&[["a", "-", "-"]]));
    let before = store.table();
    store.view(Level::INFO);
    store.view(Level::TRACE);
    assert_eq!(store.table(), before);
}
