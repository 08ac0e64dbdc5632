#![allow(missing_docs)]

use relalg::relation::OUTER_JOIN_PADDING;
use relalg::{
    optimize_query, optimize_tree, parse, Environment, Header, OptimizerConfig, Relation, Value,
    ValueType,
};

fn relation(header: &[&str], rows: &[&[&str]]) -> Relation {
    let rows: Vec<Vec<&str>> = rows.iter().map(|row| row.to_vec()).collect();
    Relation::from_raw(Header::new(header.iter().copied()).expect("header"), &rows)
        .expect("relation")
}

fn company() -> Environment {
    let mut env = Environment::new();
    env.insert(
        "people",
        relation(
            &["id", "name", "age"],
            &[&["1", "alice", "30"], &["2", "bob", "25"], &["3", "carol", "41"]],
        ),
    )
    .expect("people");
    env.insert(
        "skills",
        relation(
            &["id", "skill"],
            &[&["1", "C"], &["1", "Rust"], &["2", "C"], &["3", "Python"]],
        ),
    )
    .expect("skills");
    env.insert(
        "dates",
        relation(&["id", "date"], &[&["1", "2020-01-01"], &["2", "2021-06-15"]]),
    )
    .expect("dates");
    env
}

fn eval(env: &Environment, text: &str) -> Relation {
    parse(text)
        .expect("parse")
        .compile(env)
        .unwrap_or_else(|err| panic!("{text}: {err}"))
}

fn ids(relation: &Relation) -> Vec<i64> {
    let idx = relation.header().position("id").expect("id column");
    relation
        .iter()
        .map(|row| match &row[idx] {
            Value::Int(id) => *id,
            other => panic!("unexpected id {other:?}"),
        })
        .collect()
}

#[test]
fn selection_keeps_matching_tuples() {
    let mut env = Environment::new();
    env.insert(
        "people",
        relation(&["id", "name", "age"], &[&["1", "alice", "30"], &["2", "bob", "25"]]),
    )
    .expect("people");
    let result = eval(&env, "σ age>26 (people)");
    let expected = relation(&["id", "name", "age"], &[&["1", "alice", "30"]]);
    assert_eq!(result, expected);
}

#[test]
fn projection_drops_columns() {
    let env = company();
    let result = eval(&env, "π id,name (people)");
    assert_eq!(result.header().attributes(), ["id", "name"]);
    assert_eq!(result.len(), 3);
    assert!(!result.header().contains("age"));
}

#[test]
fn nested_selections_merge_into_one() {
    let env = company();
    let text = "σ age>26 (σ age<40 (people))";
    let optimized = optimize_query(text, &env, OptimizerConfig::default()).expect("optimize");
    assert_eq!(optimized, "σ age<40 and age>26 (people)");
    assert_eq!(eval(&env, &optimized), eval(&env, text));
    assert_eq!(ids(&eval(&env, &optimized)), vec![1]);
}

#[test]
fn selection_is_pushed_onto_the_join_operand() {
    let env = company();
    let tree = parse("σ skill=='C' (people ⋈ skills)").expect("parse");
    let optimized = optimize_tree(&tree, &env, OptimizerConfig::default()).expect("optimize");
    assert_eq!(optimized.tree.to_string(), "people⋈σ skill=='C' (skills)");
    let before = tree.compile(&env).expect("original");
    let after = optimized.tree.compile(&env).expect("optimized");
    assert_eq!(before, after);
    assert_eq!(ids(&after), vec![1, 2]);
}

#[test]
fn columns_are_cast_as_a_whole() {
    let ints = relation(&["n"], &[&["1"], &["2"], &["3"]]);
    assert!(ints.iter().all(|row| row[0].value_type() == ValueType::Int));
    let dates = relation(&["d"], &[&["2020-01-01"], &["2020-02-02"]]);
    assert!(dates.iter().all(|row| row[0].value_type() == ValueType::Date));
    let mixed = relation(&["s"], &[&["1"], &["x"]]);
    assert!(mixed.iter().all(|row| row[0].value_type() == ValueType::Str));
    let floats = relation(&["f"], &[&["1"], &["2.5"]]);
    assert!(floats.iter().all(|row| row[0].value_type() == ValueType::Float));
}

#[test]
fn division_finds_complete_matches() {
    let env = company();
    let result = eval(&env, "skills ÷ π skill (σ skill == 'C' (skills))");
    assert_eq!(result.header().attributes(), ["id"]);
    assert_eq!(ids(&result), vec![1, 2]);
}

#[test]
fn outer_joins_pad_unmatched_rows() {
    let env = company();
    let left = eval(&env, "people ⧑ dates");
    assert_eq!(left.header().attributes(), ["id", "name", "age", "date"]);
    assert_eq!(left.len(), 3);
    let padded: Vec<_> = left
        .iter()
        .filter(|row| row[3] == Value::from(OUTER_JOIN_PADDING))
        .collect();
    assert_eq!(padded.len(), 1);
    assert_eq!(padded[0][1], Value::from("carol"));

    let right = eval(&env, "dates ⧒ people");
    assert_eq!(right.header().attributes(), ["id", "date", "name", "age"]);
    assert_eq!(right.len(), 3);

    let full = eval(&env, "people ⧓ dates");
    assert_eq!(full, left);
}

#[test]
fn dates_compare_with_strings_and_expose_fields() {
    let env = company();
    assert_eq!(ids(&eval(&env, "σ date > '2020-06-01' (dates)")), vec![2]);
    assert_eq!(ids(&eval(&env, "σ date.year == 2020 (dates)")), vec![1]);
}

#[test]
fn legacy_symbols_evaluate_like_current_ones() {
    let env = company();
    assert_eq!(eval(&env, "people ᐅᐊ skills"), eval(&env, "people ⋈ skills"));
    assert_eq!(
        eval(&env, "π id (people) ᑌ π id (skills)"),
        eval(&env, "π id (people) ∪ π id (skills)")
    );
}

#[test]
fn rename_and_product() {
    let env = company();
    let result = eval(&env, "π name (people) * ρ id➡sid (skills)");
    assert_eq!(result.header().attributes(), ["name", "sid", "skill"]);
    assert_eq!(result.len(), 12);
}

#[test]
fn theta_join_filters_the_product() {
    let env = company();
    let people = env.get("people").expect("people");
    let dates = env
        .get("dates")
        .expect("dates")
        .rename(&[("id".to_string(), "did".to_string())].into_iter().collect())
        .expect("rename");
    let result = people.thetajoin(&dates, "id == did").expect("thetajoin");
    assert_eq!(result.len(), 2);
}

#[test]
fn errors_carry_their_category() {
    let env = company();
    let code = |text: &str| parse(text).and_then(|tree| tree.compile(&env)).unwrap_err().code();
    assert_eq!(code("people ∪ skills"), "SchemaError");
    assert_eq!(code("people * skills"), "SchemaError");
    assert_eq!(code("π salary (people)"), "SchemaError");
    assert_eq!(code("ghosts ∪ people"), "NameError");
    assert_eq!(code("σ name > 3 (people)"), "EvaluationError");
    assert_eq!(code("σ age >> 3 (people)"), "ParseError");
    assert_eq!(code("(people"), "TokenizeError");
}
