//! Tests for placement bin-packing

use cep_simulator_core_rs::generator::GeneratorConfig;
use cep_simulator_core_rs::placement::{Placement, PlacementError};
use cep_simulator_core_rs::query::{Edge, Query, Vertex, VertexId};

/// sensor -> op -> sink pipeline with namespaced vertex ids.
fn pipeline(n: usize) -> Query {
    let name = |stage: &str| format!("q{}_{}", n, stage);
    Query::new(
        format!("q{}", n),
        vec![
            Vertex::producer(name("src"), 1_000, GeneratorConfig::Uniform { rate: 10 }),
            Vertex::operator(name("op"), 25_000, 2048),
            Vertex::consumer(name("sink"), 1_000, 2048),
        ],
        vec![
            Edge::new(name("src"), name("op"), 1.0),
            Edge::new(name("op"), name("sink"), 1.0),
        ],
        100,
    )
    .unwrap()
}

#[test]
fn test_empty_query_set_rejected() {
    assert_eq!(
        Placement::with_queries(&[], 4).unwrap_err(),
        PlacementError::EmptyQuerySet
    );
}

#[test]
fn test_group_size_underflow_rejected() {
    assert_eq!(
        Placement::with_queries(&[pipeline(1)], 0).unwrap_err(),
        PlacementError::CapacityUnderflow(0)
    );
}

#[test]
fn test_single_query_single_group() {
    let placement = Placement::with_queries(&[pipeline(1)], 2).unwrap();
    assert_eq!(placement.num_groups(), 1);
    assert_eq!(placement.groups()[0].vertices().len(), 3);
}

#[test]
fn test_many_small_queries_share_groups() {
    // 8 queries x 2 capacity-consuming vertices, group size 4 -> 4 groups
    let queries: Vec<Query> = (1..=8).map(pipeline).collect();
    let placement = Placement::with_queries(&queries, 4).unwrap();
    assert_eq!(placement.num_groups(), 4);
}

#[test]
fn test_producers_do_not_count_toward_group_size() {
    // Each query has 1 producer + 2 counted vertices; with group size 2 each
    // query fills exactly one group of 3 vertices.
    let queries: Vec<Query> = (1..=3).map(pipeline).collect();
    let placement = Placement::with_queries(&queries, 2).unwrap();
    assert_eq!(placement.num_groups(), 3);
    for group in placement.groups() {
        assert_eq!(group.vertices().len(), 3);
    }
}

#[test]
fn test_fills_in_query_declaration_order() {
    let queries: Vec<Query> = (1..=2).map(pipeline).collect();
    let placement = Placement::with_queries(&queries, 2).unwrap();

    assert!(placement.groups()[0]
        .vertices()
        .iter()
        .all(|v| v.as_str().starts_with("q1_")));
    assert!(placement.groups()[1]
        .vertices()
        .iter()
        .all(|v| v.as_str().starts_with("q2_")));
}

#[test]
fn test_every_vertex_in_exactly_one_group() {
    let queries: Vec<Query> = (1..=5).map(pipeline).collect();
    let placement = Placement::with_queries(&queries, 3).unwrap();

    let mut expected = 0;
    for query in &queries {
        for vertex in query.vertices() {
            assert!(
                placement.group_of(vertex.id()).is_some(),
                "{} not placed",
                vertex.id()
            );
            expected += 1;
        }
    }
    let placed: usize = placement.groups().iter().map(|g| g.vertices().len()).sum();
    assert_eq!(placed, expected);
}

#[test]
fn test_group_of_unknown_vertex() {
    let placement = Placement::with_queries(&[pipeline(1)], 2).unwrap();
    assert_eq!(placement.group_of(&VertexId::new("ghost")), None);
}

#[test]
fn test_packing_is_deterministic() {
    let queries: Vec<Query> = (1..=6).map(pipeline).collect();
    let a = Placement::with_queries(&queries, 3).unwrap();
    let b = Placement::with_queries(&queries, 3).unwrap();
    assert_eq!(a.groups(), b.groups());
}
