//! Tests for the prepare pipeline and the rebalancing session

use hierpart::tree_traits::{PartitionRender, TreeNodeConvert};
use hierpart::{prepare, ApplicationError, DomainError, Rebalancer, Settings, WorkloadInput};

fn workload() -> WorkloadInput {
    let child_to_parent = [
        ("org", "org"),
        ("sales", "org"),
        ("eng", "org"),
        ("eng-core", "eng"),
        ("eng-web", "eng"),
        ("sales-emea", "sales"),
    ]
    .iter()
    .map(|(c, p)| (c.to_string(), p.to_string()))
    .collect();

    let days = [
        vec![("org", 1), ("eng-core", 40), ("eng-web", 10), ("sales-emea", 5)],
        vec![("eng-core", 20), ("sales", 3)],
        vec![("eng-web", 1000)],
    ];
    let per_day_weights = days
        .iter()
        .map(|d| d.iter().map(|(n, w)| (n.to_string(), *w as i64)).collect())
        .collect();

    WorkloadInput::new(child_to_parent, per_day_weights)
}

fn settings(verify: bool) -> Settings {
    Settings {
        init_days: 2,
        verify_invariants: verify,
    }
}

#[test]
fn given_workload_when_preparing_then_weights_cover_init_window() {
    let input = workload();
    let prepared = prepare(&input, &settings(false)).unwrap();

    let tree = &prepared.partitions;
    let root = tree.get_node(tree.root()).unwrap();
    assert_eq!(root.subtree_size, input.total_weight(2));
    assert_eq!(root.subtree_size, 79);
    assert_eq!(prepared.hierarchy.len(), 6);
}

#[test]
fn given_session_when_peeling_heaviest_then_partitions_reported() {
    let prepared = prepare(&workload(), &settings(true)).unwrap();
    let mut session = Rebalancer::new(prepared.partitions, &settings(true));
    let org = session.tree().root();

    // eng = 60 + 10 = 70, sales = 3 + 5 = 8
    let sep = session.separate_max_child(org).unwrap();
    let eng = sep.reunitable[0];
    assert_eq!(sep.separated[0], eng);

    let parts: Vec<(String, i64)> = session
        .partitions()
        .into_iter()
        .map(|p| (p.name, p.subtree_size))
        .collect();
    assert_eq!(parts, vec![("eng".into(), 70), ("org".into(), 9)]);

    let rendered = session.tree().partition_to_tree_string(eng).to_string();
    assert!(rendered.starts_with("eng (0/70)"));

    session.unite_max_child(org, &sep.reunitable).unwrap();
    assert_eq!(session.partitions().len(), 1);
}

#[test]
fn given_session_when_separating_and_uniting_root_then_restored() {
    let prepared = prepare(&workload(), &settings(true)).unwrap();
    let mut session = Rebalancer::new(prepared.partitions, &settings(true));
    let org = session.tree().root();

    let sep = session.separate_root(org).unwrap();
    assert_eq!(sep.separated.len(), 3);
    session.unite_root(org, &sep.reunitable).unwrap();

    let tree = session.into_tree();
    assert_eq!(tree.get_node(org).unwrap().subtree_size, 79);
    assert!(tree.to_tree_string().to_string().starts_with("org (1/79)"));
}

#[test]
fn given_misuse_when_uniting_then_domain_error_surfaces() {
    let prepared = prepare(&workload(), &settings(false)).unwrap();
    let mut session = Rebalancer::new(prepared.partitions, &settings(false));
    let org = session.tree().root();
    let eng = session.tree().find("eng").unwrap();

    // eng is still attached
    let err = session.unite_root(org, &[eng]).unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::InvalidAttach { .. })
    ));
}

#[test]
fn given_hierarchy_rendered_when_prepared_then_lists_all_tenants() {
    let prepared = prepare(&workload(), &settings(false)).unwrap();
    let rendered = prepared.hierarchy.to_tree_string().to_string();
    for name in ["org", "eng", "eng-core", "eng-web", "sales", "sales-emea"] {
        assert!(rendered.contains(name), "missing {name} in\n{rendered}");
    }
}

#[test]
fn given_cyclic_input_when_preparing_then_structure_error() {
    let mut input = workload();
    input
        .child_to_parent
        .insert("eng".to_string(), "eng-core".to_string());
    let err = prepare(&input, &Settings::default()).unwrap_err();
    match err {
        ApplicationError::Domain(e) => assert_eq!(e.kind(), hierpart::ErrorKind::Structure),
        other => panic!("unexpected error: {other}"),
    }
}
