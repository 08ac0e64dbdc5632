#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use relalg::relation::Format;
use relalg::{parse, Environment, Header, Relation, Value, ValueType};
use tempfile::TempDir;

fn people() -> Relation {
    let text = "id,name,age,joined\n\
                1,alice,30,2019-03-01\n\
                2,bob,25,2020-11-20\n\
                3,\"carol, jr\",41,2021-01-05\n";
    Relation::read_csv(text.as_bytes()).expect("people")
}

#[test]
fn saved_relations_reload_equal_in_both_formats() {
    let dir = TempDir::new().expect("tempdir");
    let original = people();
    for file in ["people.csv", "people.json", "PEOPLE.JSON"] {
        let path = dir.path().join(file);
        original.save(&path).expect("save");
        let reloaded = Relation::load(&path).expect("load");
        assert_eq!(reloaded, original, "{file}");
        assert_eq!(reloaded.header(), original.header());
    }
}

#[test]
fn loaded_columns_keep_their_types() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("people.json");
    people().save(&path).expect("save");
    let reloaded = Relation::load(&path).expect("load");
    let row = reloaded.iter().next().expect("row");
    let types: Vec<ValueType> = row.iter().map(Value::value_type).collect();
    assert_eq!(
        types,
        [ValueType::Int, ValueType::Str, ValueType::Int, ValueType::Date]
    );
}

#[test]
fn float_columns_survive_a_round_trip() {
    let dir = TempDir::new().expect("tempdir");
    let scores = Relation::read_csv("name,score\nann,1\nbea,2.5\n".as_bytes()).expect("scores");
    let path = dir.path().join("scores.csv");
    scores.save(&path).expect("save");
    let text = fs::read_to_string(&path).expect("read");
    assert!(text.contains("ann,1.0"), "{text}");
    assert_eq!(Relation::load(&path).expect("load"), scores);
}

#[test]
fn format_is_chosen_by_extension() {
    assert_eq!(
        Format::from_path(Path::new("a/b.csv")).expect("csv"),
        Format::Csv
    );
    assert_eq!(
        Format::from_path(Path::new("b.Json")).expect("json"),
        Format::Json
    );
    let err = Format::from_path(Path::new("b.parquet")).unwrap_err();
    assert_eq!(err.code(), "Unsupported");

    let dir = TempDir::new().expect("tempdir");
    let err = people().save(dir.path().join("people.txt")).unwrap_err();
    assert_eq!(err.code(), "Unsupported");
}

#[test]
fn malformed_files_are_reported() {
    let dir = TempDir::new().expect("tempdir");
    let json = dir.path().join("broken.json");
    fs::write(&json, r#"{"header": ["a"], "content": "#).expect("write");
    assert_eq!(Relation::load(&json).unwrap_err().code(), "JsonError");

    let csv = dir.path().join("dupes.csv");
    fs::write(&csv, "a,a\n1,2\n").expect("write");
    assert_eq!(Relation::load(&csv).unwrap_err().code(), "SchemaError");

    let missing = dir.path().join("missing.csv");
    assert_eq!(Relation::load(&missing).unwrap_err().code(), "IoError");
}

#[test]
fn directories_load_into_an_environment() {
    let dir = TempDir::new().expect("tempdir");
    people().save(dir.path().join("people.csv")).expect("save");
    fs::write(
        dir.path().join("skills.json"),
        r#"{"header": ["id", "skill"], "content": [[1, "C"], [2, "Rust"], [3, "C"]]}"#,
    )
    .expect("write");
    fs::write(dir.path().join("README.md"), "# data").expect("write");

    let mut env = Environment::new();
    let loaded = env.load_dir(dir.path()).expect("load_dir");
    assert_eq!(loaded, ["people", "skills"]);

    let result = parse("π name (people ⋈ σ skill == 'C' (skills))")
        .expect("parse")
        .compile(&env)
        .expect("query");
    assert_eq!(result.len(), 2);
    assert!(result.contains(&[Value::from("alice")]));
    assert!(result.contains(&[Value::from("carol, jr")]));
}

#[test]
fn single_files_bind_under_any_name() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("export-2021.csv");
    people().save(&path).expect("save");

    let mut env = Environment::new();
    env.load("staff", &path).expect("load");
    assert_eq!(env.get("staff").expect("staff").len(), 3);
    assert_eq!(env.load("bad name", &path).unwrap_err().code(), "ParseError");
    assert!(!env.contains("bad name"));
}

#[test]
fn insert_update_and_delete_report_counts() {
    let mut relation = people();
    let row: Vec<Value> = vec![
        Value::Int(4),
        Value::from("dave"),
        Value::Int(19),
        Value::infer("2022-02-02"),
    ];
    assert_eq!(relation.insert(row.clone()).expect("insert"), 1);
    assert_eq!(relation.insert(row).expect("insert again"), 0);
    assert_eq!(
        relation.insert(vec![Value::Int(5)]).unwrap_err().code(),
        "SchemaError"
    );

    let changes: BTreeMap<String, Value> = [("age".to_string(), Value::Int(20))].into();
    assert_eq!(relation.update("age < 26", &changes).expect("update"), 2);
    assert_eq!(relation.selection("age == 20").expect("select").len(), 2);

    assert_eq!(relation.delete("joined.year < 2021").expect("delete"), 2);
    assert_eq!(relation.delete("joined.year < 2021").expect("delete"), 0);
    assert_eq!(relation.len(), 2);
}

#[test]
fn failed_mutations_leave_the_relation_untouched() {
    let mut relation = people();
    let before = relation.clone();

    let bad_column: BTreeMap<String, Value> = [("salary".to_string(), Value::Int(1))].into();
    assert_eq!(
        relation.update("True", &bad_column).unwrap_err().code(),
        "SchemaError"
    );
    let changes: BTreeMap<String, Value> = [("age".to_string(), Value::Int(1))].into();
    assert_eq!(
        relation.update("name > 3", &changes).unwrap_err().code(),
        "EvaluationError"
    );
    assert_eq!(relation.delete("age >>").unwrap_err().code(), "ParseError");
    assert_eq!(relation, before);
}

#[test]
fn renamed_relations_share_content_until_written() {
    let original = people();
    let renamed = original
        .rename(&[("id".to_string(), "pid".to_string())].into())
        .expect("rename");
    assert!(original.is_shared());
    assert!(renamed.is_shared());
    assert_eq!(renamed.header().attributes()[0], "pid");

    let mut edited = renamed.clone();
    edited.delete("pid == 1").expect("delete");
    assert!(!edited.is_shared());
    assert_eq!(edited.len(), 2);
    assert_eq!(renamed.len(), 3);
    assert_eq!(original.len(), 3);
}

#[test]
fn empty_relations_round_trip() {
    let dir = TempDir::new().expect("tempdir");
    let empty = Relation::new(Header::new(["id", "name"]).expect("header"));
    for file in ["empty.csv", "empty.json"] {
        let path = dir.path().join(file);
        empty.save(&path).expect("save");
        let reloaded = Relation::load(&path).expect("load");
        assert!(reloaded.is_empty());
        assert_eq!(reloaded.header().attributes(), ["id", "name"]);
    }
}
