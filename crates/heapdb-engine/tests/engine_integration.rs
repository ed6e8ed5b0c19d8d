//! End-to-end tests of the engine over a temporary data directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use heapdb_common::config::EngineConfig;
use heapdb_common::ErrorCode;
use heapdb_engine::{
    accept_all, Attribute, ColumnType, Comparison, Engine, EngineError, IndexKind, Record,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

const ALL: &[&str] = &[];

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn open(dir: &TempDir) -> Engine {
    init_tracing();
    Engine::open(EngineConfig::for_testing(dir.path())).unwrap()
}

fn create_t(engine: &Engine) {
    assert!(engine
        .create_table(
            "t",
            "id",
            vec![ColumnType::int(), ColumnType::float()],
            vec!["id".into(), "v".into()],
        )
        .unwrap());
}

fn row(engine: &Engine, table: &str, values: &[&str]) -> Record {
    engine.record_from_strings(table, values).unwrap()
}

fn ids(rows: Vec<Vec<String>>) -> Vec<i32> {
    rows.iter().map(|r| r[0].parse().unwrap()).collect()
}

fn avl_path(root: &Path, table: &str, column: &str) -> std::path::PathBuf {
    root.join("Indexes").join("AVL").join(table).join(format!("{}.idx", column))
}

#[test]
fn test_reference_scenario() {
    let dir = TempDir::new().unwrap();
    let engine = open(&dir);
    create_t(&engine);
    engine.create_index("t", "v", IndexKind::Avl).unwrap();

    for id in [5, 3, 8, 1, 4, 7, 9, 2, 6] {
        let v = format!("{}", id as f32 * 1.5);
        assert!(engine.add("t", &row(&engine, "t", &[&id.to_string(), &v])).unwrap());
    }

    let hit = engine
        .search("t", &Attribute::new("id", "6"), accept_all(), ALL)
        .unwrap();
    assert_eq!(hit.to_strings().unwrap(), vec![vec!["6", "9"]]);

    let range = engine
        .range_search(
            "t",
            &Attribute::new("id", "3"),
            &Attribute::new("id", "8"),
            accept_all(),
            ALL,
        )
        .unwrap();
    assert_eq!(ids(range.to_strings().unwrap()), vec![3, 4, 5, 6, 7, 8]);

    let avl = avl_path(dir.path(), "t", "v");
    let avl_len = fs::metadata(&avl).unwrap().len();

    assert!(engine.remove("t", &Attribute::new("id", "5")).unwrap());
    let err = engine
        .search("t", &Attribute::new("id", "5"), accept_all(), ALL)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::KeyNotFound);
    let err = engine
        .search("t", &Attribute::new("v", "7.5"), accept_all(), ALL)
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound { .. }));

    assert!(engine.add("t", &row(&engine, "t", &["10", "15"])).unwrap());
    assert_eq!(fs::metadata(&avl).unwrap().len(), avl_len);

    let by_v = engine
        .search("t", &Attribute::new("v", "15"), accept_all(), &["id"])
        .unwrap();
    assert_eq!(by_v.columns, vec!["id"]);
    assert_eq!(by_v.to_strings().unwrap(), vec![vec!["10"]]);
    engine.close().unwrap();
}

#[test]
fn test_duplicate_primary_key_leaves_table_unchanged() {
    let dir = TempDir::new().unwrap();
    let engine = open(&dir);
    create_t(&engine);
    engine.create_index("t", "v", IndexKind::Isam).unwrap();

    assert!(engine.add("t", &row(&engine, "t", &["1", "0.5"])).unwrap());
    let before = engine.table_stats("t").unwrap();

    assert!(!engine.add("t", &row(&engine, "t", &["1", "9.5"])).unwrap());
    let err = engine.insert("t", &row(&engine, "t", &["1", "9.5"])).unwrap_err();
    assert_eq!(err.code(), ErrorCode::KeyExists);
    assert_eq!(engine.table_stats("t").unwrap(), before);

    let err = engine
        .search("t", &Attribute::new("v", "9.5"), accept_all(), ALL)
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_malformed_rows_are_rejected_before_writing() {
    let dir = TempDir::new().unwrap();
    let engine = open(&dir);
    create_t(&engine);

    let err = engine.record_from_strings("t", &["x", "1.0"]).unwrap_err();
    assert_eq!(err.code(), ErrorCode::MalformedLiteral);

    let short = Record::new(vec![vec![1, 0, 0, 0]]);
    let err = engine.insert("t", &short).unwrap_err();
    assert_eq!(err.code(), ErrorCode::SchemaMismatch);

    let narrow = Record::new(vec![vec![1, 0, 0, 0], vec![0, 0]]);
    assert!(engine.insert("t", &narrow).is_err());
    assert_eq!(engine.table_stats("t").unwrap().live_records, 0);
    assert!(engine
        .search("t", &Attribute::new("id", "1"), accept_all(), ALL)
        .is_err());
}

#[test]
fn test_secondary_indexes_follow_removal() {
    let dir = TempDir::new().unwrap();
    let engine = open(&dir);
    assert!(engine
        .create_table(
            "people",
            "id",
            vec![ColumnType::int(), ColumnType::int(), ColumnType::varchar(12).unwrap()],
            vec!["id".into(), "age".into(), "name".into()],
        )
        .unwrap());
    engine.create_index("people", "age", IndexKind::Isam).unwrap();
    engine.create_index("people", "age", IndexKind::Sequential).unwrap();
    engine.create_index("people", "name", IndexKind::Avl).unwrap();

    let people = [
        ("1", "30", "ana"),
        ("2", "41", "bruno"),
        ("3", "25", "carla"),
        ("4", "30", "dario"),
        ("5", "52", "elena"),
    ];
    for (id, age, name) in people {
        assert!(engine.add("people", &row(&engine, "people", &[id, age, name])).unwrap());
    }

    // age 30 is indexed for ana only; dario's removal must not drop it
    assert!(engine.remove("people", &Attribute::new("id", "4")).unwrap());
    let hit = engine
        .search("people", &Attribute::new("age", "30"), accept_all(), &["name"])
        .unwrap();
    assert_eq!(hit.to_strings().unwrap(), vec![vec!["ana"]]);

    assert!(engine.remove("people", &Attribute::new("", "2")).unwrap());
    assert!(!engine.remove("people", &Attribute::new("id", "2")).unwrap());
    let err = engine
        .search("people", &Attribute::new("name", "bruno"), accept_all(), ALL)
        .unwrap_err();
    assert!(err.is_not_found());
    let err = engine
        .search("people", &Attribute::new("age", "41"), accept_all(), ALL)
        .unwrap_err();
    assert!(err.is_not_found());

    let range = engine
        .range_search(
            "people",
            &Attribute::new("age", "MIN"),
            &Attribute::new("", "MAX"),
            accept_all(),
            &["name", "id"],
        )
        .unwrap();
    assert_eq!(range.columns, vec!["id", "name"]);
    assert_eq!(
        range.to_strings().unwrap(),
        vec![vec!["3", "carla"], vec!["1", "ana"], vec!["5", "elena"]]
    );

    let stats = engine.table_stats("people").unwrap();
    assert_eq!(stats.live_records, 3);
    assert_eq!(stats.deleted_slots, 2);

    // dario shares ana's age; once ana goes the age indexes point at dario
    assert!(engine.add("people", &row(&engine, "people", &["4", "30", "dario"])).unwrap());
    assert!(engine.remove("people", &Attribute::new("id", "1")).unwrap());
    for dropped in [None, Some(IndexKind::Isam)] {
        if let Some(kind) = dropped {
            engine.drop_index("people", "age", kind).unwrap();
        }
        let hit = engine
            .search("people", &Attribute::new("age", "30"), accept_all(), &["name"])
            .unwrap();
        assert_eq!(hit.to_strings().unwrap(), vec![vec!["dario"]]);
    }
}

#[test]
fn test_removal_keeps_heap_size() {
    let dir = TempDir::new().unwrap();
    let engine = open(&dir);
    create_t(&engine);
    for id in 0..5 {
        engine
            .add("t", &row(&engine, "t", &[&id.to_string(), "1.0"]))
            .unwrap();
    }
    let before = engine.table_stats("t").unwrap();
    assert!(engine.remove("t", &Attribute::new("id", "2")).unwrap());
    let after = engine.table_stats("t").unwrap();
    assert_eq!(after.heap_bytes, before.heap_bytes);
    assert_eq!(after.live_records, 4);

    let err = engine.remove("t", &Attribute::new("v", "1.0")).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidArgument);
}

#[test]
fn test_range_rules() {
    let dir = TempDir::new().unwrap();
    let engine = open(&dir);
    create_t(&engine);
    for id in 1..=6 {
        let v = format!("{}", 10 - id);
        engine.add("t", &row(&engine, "t", &[&id.to_string(), &v])).unwrap();
    }

    let err = engine
        .range_search(
            "t",
            &Attribute::new("id", "1"),
            &Attribute::new("v", "3"),
            accept_all(),
            ALL,
        )
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::CrossColumnRange);

    // v has no index: scan, still ordered by v
    let range = engine
        .range_search(
            "t",
            &Attribute::new("id", "MIN"),
            &Attribute::new("v", "6"),
            accept_all(),
            ALL,
        )
        .unwrap();
    assert_eq!(ids(range.to_strings().unwrap()), vec![6, 5, 4]);

    let empty = engine
        .range_search(
            "t",
            &Attribute::new("id", "5"),
            &Attribute::new("id", "2"),
            accept_all(),
            ALL,
        )
        .unwrap();
    assert!(empty.is_empty());
}

#[test]
fn test_comparator_filters_results() {
    let dir = TempDir::new().unwrap();
    let engine = open(&dir);
    create_t(&engine);
    for (id, v) in [("1", "0.1"), ("2", "2.5"), ("3", "2.5004"), ("4", "7.0")] {
        engine.add("t", &row(&engine, "t", &[id, v])).unwrap();
    }

    let eq = engine.get_comparator("t", Comparison::Equal, "v", "2.5").unwrap();
    let range = engine
        .range_search(
            "t",
            &Attribute::new("id", "MIN"),
            &Attribute::new("id", "MAX"),
            &eq,
            &["id"],
        )
        .unwrap();
    assert_eq!(ids(range.to_strings().unwrap()), vec![2, 3]);

    let gt = engine.get_comparator("t", Comparison::Greater, "v", "2.5").unwrap();
    let hit = engine
        .search("t", &Attribute::new("id", "4"), &gt, ALL)
        .unwrap();
    assert_eq!(hit.len(), 1);
    let filtered = engine
        .search("t", &Attribute::new("id", "1"), &gt, ALL)
        .unwrap();
    assert!(filtered.is_empty());

    let err = engine
        .get_comparator("t", Comparison::Less, "missing", "1")
        .err()
        .unwrap();
    assert_eq!(err.code(), ErrorCode::ColumnNotFound);
}

#[test]
fn test_unindexed_bool_search() {
    let dir = TempDir::new().unwrap();
    let engine = open(&dir);
    assert!(engine
        .create_table(
            "flags",
            "id",
            vec![ColumnType::float(), ColumnType::bool()],
            vec!["id".into(), "on".into()],
        )
        .unwrap());
    for (id, on) in [("0.5", "si"), ("1.5", "no"), ("2.5", "TRUE")] {
        engine.add("flags", &row(&engine, "flags", &[id, on])).unwrap();
    }
    let hits = engine
        .search("flags", &Attribute::new("on", "yes"), accept_all(), &["id"])
        .unwrap();
    assert_eq!(hits.to_strings().unwrap(), vec![vec!["0.5"], vec!["2.5"]]);

    let err = engine.create_index("flags", "on", IndexKind::Avl).unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotIndexable);
}

#[test]
fn test_unindexed_bool_range() {
    let dir = TempDir::new().unwrap();
    let engine = open(&dir);
    assert!(engine
        .create_table(
            "flags",
            "id",
            vec![ColumnType::int(), ColumnType::bool()],
            vec!["id".into(), "on".into()],
        )
        .unwrap());
    for (id, on) in [("1", "yes"), ("2", "no"), ("3", "true"), ("4", "false")] {
        engine.add("flags", &row(&engine, "flags", &[id, on])).unwrap();
    }

    let all = engine
        .range_search(
            "flags",
            &Attribute::new("on", "no"),
            &Attribute::new("on", "yes"),
            accept_all(),
            &["id"],
        )
        .unwrap();
    assert_eq!(ids(all.to_strings().unwrap()), vec![2, 4, 1, 3]);

    let on = engine
        .range_search(
            "flags",
            &Attribute::new("on", "true"),
            &Attribute::new("", "MAX"),
            accept_all(),
            &["id"],
        )
        .unwrap();
    assert_eq!(ids(on.to_strings().unwrap()), vec![1, 3]);

    let off = engine
        .range_search(
            "flags",
            &Attribute::new("", "MIN"),
            &Attribute::new("on", "false"),
            accept_all(),
            &["id"],
        )
        .unwrap();
    assert_eq!(ids(off.to_strings().unwrap()), vec![2, 4]);
}

#[test]
fn test_table_and_index_management() {
    let dir = TempDir::new().unwrap();
    let engine = open(&dir);
    create_t(&engine);
    assert!(!engine
        .create_table("t", "id", vec![ColumnType::int()], vec!["id".into()])
        .unwrap());

    for (pk, ty) in [
        ("flag", ColumnType::bool()),
        ("name", ColumnType::varchar(4).unwrap()),
    ] {
        let err = engine
            .create_table("bad", pk, vec![ty], vec![pk.to_string()])
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotIndexable);
    }
    assert!(!engine.is_table("bad"));
    assert!(engine
        .create_table("../x", "id", vec![ColumnType::int()], vec!["id".into()])
        .is_err());

    engine.create_index("t", "v", IndexKind::Avl).unwrap();
    let err = engine.create_index("t", "v", IndexKind::Avl).unwrap_err();
    assert_eq!(err.code(), ErrorCode::IndexExists);
    let err = engine.create_index("t", "id", IndexKind::Sequential).unwrap_err();
    assert_eq!(err.code(), ErrorCode::IndexExists);
    engine.create_index("t", "id", IndexKind::Avl).unwrap();

    let indexes: Vec<(String, IndexKind)> = engine
        .get_indexes("t")
        .unwrap()
        .into_iter()
        .map(|(id, kind)| (id.column, kind))
        .collect();
    assert_eq!(
        indexes,
        vec![
            ("id".to_string(), IndexKind::Sequential),
            ("id".to_string(), IndexKind::Avl),
            ("v".to_string(), IndexKind::Avl),
        ]
    );
    assert_eq!(engine.get_indexes_names("t").unwrap(), vec!["id", "v"]);
    assert_eq!(engine.get_table_attributes("t").unwrap(), vec!["id", "v"]);

    let err = engine.drop_index("t", "id", IndexKind::Sequential).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidArgument);
    let err = engine.drop_index("t", "v", IndexKind::Isam).unwrap_err();
    assert_eq!(err.code(), ErrorCode::IndexNotFound);
    engine.drop_index("t", "v", IndexKind::Avl).unwrap();
    assert!(!avl_path(dir.path(), "t", "v").exists());
    assert_eq!(engine.get_indexes_names("t").unwrap(), vec!["id"]);

    assert_eq!(engine.get_table_names(), vec!["t"]);
    engine.drop_table("t").unwrap();
    assert!(!engine.is_table("t"));
    assert!(!dir.path().join("Tables").join("t").exists());
    assert!(!dir.path().join("Indexes").join("Sequential").join("t").exists());
    let err = engine.drop_table("t").unwrap_err();
    assert_eq!(err.code(), ErrorCode::TableNotFound);
    let err = engine
        .search("t", &Attribute::new("id", "1"), accept_all(), ALL)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::TableNotFound);
}

#[test]
fn test_index_built_over_existing_rows() {
    let dir = TempDir::new().unwrap();
    let engine = open(&dir);
    create_t(&engine);
    for id in 0..20 {
        let v = format!("{}", id * 2);
        engine.add("t", &row(&engine, "t", &[&id.to_string(), &v])).unwrap();
    }
    engine.remove("t", &Attribute::new("id", "3")).unwrap();

    for kind in IndexKind::ALL {
        engine.create_index("t", "v", kind).unwrap();
    }
    let range = engine
        .range_search(
            "t",
            &Attribute::new("v", "0"),
            &Attribute::new("v", "10"),
            accept_all(),
            &["id"],
        )
        .unwrap();
    assert_eq!(ids(range.to_strings().unwrap()), vec![0, 1, 2, 4, 5]);
}

#[test]
fn test_randomized_against_model() {
    let dir = TempDir::new().unwrap();
    let engine = open(&dir);
    create_t(&engine);
    engine.create_index("t", "v", IndexKind::Avl).unwrap();

    let mut rng = StdRng::seed_from_u64(2024);
    let mut model: BTreeMap<i32, i32> = BTreeMap::new();
    for step in 0..400 {
        let id = rng.gen_range(0..120);
        if rng.gen_bool(0.65) {
            // v is unique per step so secondary entries never collide
            let v = step * 1000 + id;
            let added = engine
                .add("t", &row(&engine, "t", &[&id.to_string(), &v.to_string()]))
                .unwrap();
            assert_eq!(added, !model.contains_key(&id));
            model.entry(id).or_insert(v);
        } else {
            let removed = engine.remove("t", &Attribute::new("id", id.to_string())).unwrap();
            assert_eq!(removed, model.remove(&id).is_some());
        }
    }

    assert_eq!(engine.table_stats("t").unwrap().live_records, model.len() as u64);
    for _ in 0..20 {
        let a = rng.gen_range(0..120);
        let b = rng.gen_range(a..125);
        let got = engine
            .range_search(
                "t",
                &Attribute::new("id", a.to_string()),
                &Attribute::new("id", b.to_string()),
                accept_all(),
                ALL,
            )
            .unwrap()
            .to_strings()
            .unwrap();
        let expected: Vec<Vec<String>> = model
            .range(a..=b)
            .map(|(id, v)| vec![id.to_string(), v.to_string()])
            .collect();
        assert_eq!(got, expected);
    }
    for (id, v) in &model {
        let hit = engine
            .search("t", &Attribute::new("v", v.to_string()), accept_all(), &["id"])
            .unwrap();
        assert_eq!(hit.to_strings().unwrap(), vec![vec![id.to_string()]]);
    }
}

#[test]
fn test_tables_are_independent_across_threads() {
    let dir = TempDir::new().unwrap();
    let engine = open(&dir);
    for name in ["a", "b"] {
        assert!(engine
            .create_table(name, "id", vec![ColumnType::int()], vec!["id".into()])
            .unwrap());
    }

    std::thread::scope(|scope| {
        for name in ["a", "b"] {
            let engine = &engine;
            scope.spawn(move || {
                for id in 0..50 {
                    let record = engine.record_from_strings(name, &[id.to_string()]).unwrap();
                    assert!(engine.add(name, &record).unwrap());
                }
            });
        }
    });

    for name in ["a", "b"] {
        assert_eq!(engine.table_stats(name).unwrap().live_records, 50);
    }
}
