#![allow(missing_docs)]

use relalg::query::rules::{find, GENERAL_RULES, SPECIFIC_RULES};
use relalg::{
    optimize_program, optimize_tree, parse, split, Environment, Header, OptimizerConfig, Relation,
};

fn relation(header: &[&str], rows: &[&[&str]]) -> Relation {
    let rows: Vec<Vec<&str>> = rows.iter().map(|row| row.to_vec()).collect();
    Relation::from_raw(Header::new(header.iter().copied()).expect("header"), &rows)
        .expect("relation")
}

fn env() -> Environment {
    let mut env = Environment::new();
    env.insert(
        "people",
        relation(
            &["id", "name", "age"],
            &[
                &["0", "jack", "22"],
                &["1", "carl", "20"],
                &["2", "john", "21"],
                &["3", "dean", "33"],
                &["4", "lara", "35"],
            ],
        ),
    )
    .expect("people");
    env.insert(
        "skills",
        relation(
            &["id", "skill"],
            &[&["0", "C"], &["0", "Python"], &["1", "Java"], &["3", "C"], &["4", "Rust"]],
        ),
    )
    .expect("skills");
    env.insert(
        "friends",
        relation(
            &["age", "name", "id"],
            &[&["20", "carl", "1"], &["40", "mike", "7"]],
        ),
    )
    .expect("friends");
    env.insert(
        "dates",
        relation(&["date"], &[&["2020-01-01"], &["2021-06-15"]]),
    )
    .expect("dates");
    env
}

const QUERIES: &[&str] = &[
    "σ age > 20 (σ age < 34 (people))",
    "σ age > 20 (people ∪ friends)",
    "σ age > 20 (people - σ age > 20 (friends))",
    "σ age > 20 (people ∩ friends)",
    "π name (π name,age (people))",
    "σ age > 20 (π name,age (people))",
    "ρ pid➡key (ρ id➡pid (people))",
    "ρ pid➡id (ρ id➡pid (skills))",
    "ρ id➡id,name➡label (people)",
    "σ pid > 1 (ρ id➡pid (people))",
    "π pid,name (ρ id➡pid,age➡years (people))",
    "people ∪ people",
    "people - people",
    "σ age > 21 (people) ∪ people",
    "people ∩ σ age > 21 (people)",
    "people - σ age > 21 (people)",
    "σ age > 21 (people) - people",
    "σ age > 30 (people) ∪ σ age < 21 (people)",
    "σ age > 20 (people) ∩ σ age < 34 (people)",
    "σ age > 20 (people) - σ age < 34 (people)",
    "ρ id➡pid (people) ∪ ρ id➡pid (friends)",
    "(π name (people) * dates) ∪ (π name (people) * σ date.year == 2020 (dates))",
    "σ age > 21 and skill == 'C' and date.year == 2020 (people ⋈ skills * dates)",
    "σ (age > 21 or skill == 'C') and id < 4 (people ⋈ skills)",
    "π name,id (people) ∪ π name,id (friends)",
    "π id,age,name (people)",
    "(people ⋈ skills) ∪ (people ⋈ σ skill == 'C' (skills))",
    "σ age > 20 (π id,age (people) ∪ π id,age (friends)) ⋈ skills",
];

#[test]
fn optimized_queries_evaluate_to_the_same_relation() {
    let env = env();
    let configs = [
        OptimizerConfig::default(),
        OptimizerConfig {
            specific: false,
            ..OptimizerConfig::default()
        },
        OptimizerConfig {
            general: false,
            ..OptimizerConfig::default()
        },
    ];
    for text in QUERIES {
        let tree = parse(text).unwrap_or_else(|err| panic!("{text}: {err}"));
        let expected = tree
            .compile(&env)
            .unwrap_or_else(|err| panic!("{text}: {err}"));
        for config in configs {
            let optimized = optimize_tree(&tree, &env, config).expect("optimize");
            let actual = optimized
                .tree
                .compile(&env)
                .unwrap_or_else(|err| panic!("{text} => {}: {err}", optimized.tree));
            assert_eq!(actual, expected, "{text} => {}", optimized.tree);
        }
    }
}

#[test]
fn every_rule_fires_somewhere() {
    let env = env();
    for rule in GENERAL_RULES.iter().chain(SPECIFIC_RULES.iter()) {
        let fired = QUERIES.iter().any(|text| {
            let tree = parse(text).expect("parse");
            rule.apply(&tree, &env).expect("apply").1 > 0
        });
        assert!(fired, "{} never fired", rule.name);
    }
}

#[test]
fn optimization_is_idempotent() {
    let env = env();
    for text in QUERIES {
        let tree = parse(text).expect("parse");
        let once = optimize_tree(&tree, &env, OptimizerConfig::default()).expect("optimize");
        let twice =
            optimize_tree(&once.tree, &env, OptimizerConfig::default()).expect("optimize again");
        assert_eq!(twice.changes, 0, "{text} => {}", once.tree);
        assert_eq!(twice.tree, once.tree);
    }
}

#[test]
fn selection_splits_across_a_product() {
    let env = env();
    let tree =
        parse("σ age > 21 and skill == 'C' and date.year == 2020 (people ⋈ skills * dates)")
            .expect("parse");
    let optimized = optimize_tree(&tree, &env, OptimizerConfig::default()).expect("optimize");
    assert_eq!(
        optimized.tree.to_string(),
        "σ age > 21 (people)⋈σ skill == 'C' (skills)*σ date.year == 2020 (dates)"
    );
}

#[test]
fn trace_lists_rules_in_order() {
    let env = env();
    let config = OptimizerConfig {
        trace: true,
        ..OptimizerConfig::default()
    };
    let tree = parse("π name (π name,age (σ age > 20 (σ age < 34 (people))))").expect("parse");
    let optimized = optimize_tree(&tree, &env, config).expect("optimize");
    let rules: Vec<_> = optimized.trace.iter().map(|step| step.rule).collect();
    assert_eq!(rules, ["duplicated_select", "duplicated_projection"]);
    assert_eq!(
        optimized.trace.last().map(|step| step.tree.as_str()),
        Some("π name (σ age < 34 and age > 20 (people))")
    );
    assert_eq!(optimized.changes, 2);
}

#[test]
fn rules_can_be_applied_one_at_a_time() {
    let env = env();
    let rule = find("selection_inside_projection").expect("rule");
    let tree = parse("σ age > 20 (π name,age (people))").expect("parse");
    let (rewritten, changes) = rule.apply(&tree, &env).expect("apply");
    assert_eq!(changes, 1);
    assert_eq!(rewritten.to_string(), "π name,age (σ age > 20 (people))");
    assert!(find("no_such_rule").is_none());
}

#[test]
fn program_optimization_shares_joins() {
    let program = "ppl_skills = people ⋈ skills\n\
                   ppl_skills1 = ppl_skills ∪ (people ⋈ skills)\n\
                   ppl_skills ∩ ppl_skills1 ⋈ dates";
    assert_eq!(
        optimize_program(program, &env()).expect("program"),
        "optm_a = people⋈skills\noptm_b = optm_a⋈dates"
    );
}

#[test]
fn split_programs_evaluate_like_the_query() {
    let env = env();
    let tree = parse("π name (people ⋈ skills) ∪ π name (σ age > 30 (people ⋈ skills))")
        .expect("parse");
    let expected = tree.compile(&env).expect("query");

    let program = split(&tree, &env);
    let mut steps = env.clone();
    let mut last = None;
    for line in program.lines() {
        let (name, expr) = line.split_once(" = ").expect("assignment");
        let value = parse(expr).expect("step").compile(&steps).expect("eval");
        steps.insert(name, value).expect("bind");
        last = Some(name.to_owned());
    }
    assert_eq!(program.lines().count(), 5);
    let result = steps.get(&last.expect("steps")).expect("result");
    assert_eq!(*result, expected);
}

#[test]
fn merged_selections_keep_the_inner_guard_first() {
    let mut env = Environment::new();
    env.insert("r", relation(&["a", "b"], &[&["0", "0"], &["1", "5"]]))
        .expect("r");
    env.insert("s", relation(&["b", "c"], &[&["5", "2"]])).expect("s");

    let tree = parse("σ a < c (σ c == 2 (r ⧑ s))").expect("parse");
    let expected = tree.compile(&env).expect("query");
    assert_eq!(expected.len(), 1);

    let optimized = optimize_tree(&tree, &env, OptimizerConfig::default()).expect("optimize");
    assert_eq!(optimized.tree.to_string(), "σ c == 2 and a < c (r⧑s)");
    assert_eq!(optimized.tree.compile(&env).expect("optimized"), expected);
}
