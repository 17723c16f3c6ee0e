// Node lifecycle tests: the registry must track exactly the nodes that have
// been constructed and not yet torn down.

use combstruct::ast::{ErrorOrigin, Expression, NAryOp, Restriction, RestrictedOp, Unit};
use combstruct::registry::{Handle, NodeKind, NodeRegistry};
use combstruct::render::{to_json, to_text};

fn atom(registry: &mut NodeRegistry) -> Handle<Expression> {
    let unit = registry.new_unit(Unit::Atom);
    registry.new_literal(unit)
}

#[test]
fn test_live_count_tracks_construction_and_teardown() {
    let mut registry = NodeRegistry::new();
    assert_eq!(registry.len(), 0);

    let a = atom(&mut registry);
    assert_eq!(registry.len(), 2);

    let list = registry.new_expression_list(a);
    let b = atom(&mut registry);
    registry.append_expression(&list, b).unwrap();
    assert_eq!(registry.len(), 5);

    let prod = registry.new_nary(NAryOp::Prod, list);
    let name = registry.new_id("P");
    let statement = registry.new_statement(name, prod);
    assert_eq!(registry.len(), 8);

    let stray = atom(&mut registry);
    assert_eq!(registry.len(), 10);
    assert_eq!(registry.free_recursive(stray), 2);
    assert_eq!(registry.len(), 8);

    assert_eq!(registry.free_recursive(statement), 8);
    assert_eq!(registry.len(), 0);
    assert_eq!(registry.drain_all(), 0);
}

#[test]
fn test_drain_frees_partial_tree_regardless_of_wiring() {
    let mut registry = NodeRegistry::new();

    // Wired: Sequence(Union(Atom, Epsilon))
    let a = atom(&mut registry);
    let list = registry.new_expression_list(a);
    let eps = registry.new_unit(Unit::Epsilon);
    let eps = registry.new_literal(eps);
    registry.append_expression(&list, eps).unwrap();
    let union = registry.new_nary(NAryOp::Union, list);
    let _wired = registry.new_restricted(RestrictedOp::Sequence, union, Restriction::None);

    // Orphaned: an id and a unit that never got a parent.
    let _orphan_id = registry.new_id("Pending");
    let _orphan_unit = registry.new_unit(Unit::Z);

    assert_eq!(registry.len(), 9);
    assert_eq!(registry.drain_all(), 9);
    assert!(registry.is_empty());
}

#[test]
fn test_identifiers_survive_drain() {
    let mut registry = NodeRegistry::new();
    let before = registry.new_unit(Unit::Atom);
    registry.drain_all();
    let after = registry.new_unit(Unit::Atom);
    assert!(after.id() > before.id());
    assert!(!registry.contains(before.id()));
    assert_eq!(registry.kind_of(after.id()), Some(NodeKind::Unit));
}

#[test]
fn test_deregister_absent_id_is_harmless() {
    let mut registry = NodeRegistry::new();
    let unit = registry.new_unit(Unit::Z);
    let id = unit.id();
    assert_eq!(registry.free_recursive(unit), 1);
    assert!(!registry.deregister(id));
    assert_eq!(registry.len(), 0);
}

#[test]
fn test_detached_child_can_be_reparented() {
    let mut registry = NodeRegistry::new();
    let operand = atom(&mut registry);
    let set = registry.new_restricted(RestrictedOp::Set, operand, Restriction::AtLeast(1));

    let Some(Expression::Restricted { operand, .. }) = registry.free_node(set) else {
        panic!("expected a restricted expression");
    };
    let cycle = registry.new_restricted(RestrictedOp::Cycle, operand, Restriction::Exactly(3));

    assert_eq!(to_text(&registry, &cycle).unwrap(), "Cycle(Atom, card = 3)");
    assert_eq!(registry.len(), 3);
}

#[test]
fn test_error_grammar_round_trip() {
    let mut registry = NodeRegistry::new();
    let error = registry.new_error(ErrorOrigin::LexError, 4, "bad token");
    let grammar = registry.new_error_grammar(error);

    assert_eq!(
        to_text(&registry, &grammar).unwrap(),
        "Lexer Error (l. 4): bad token"
    );
    let value: serde_json::Value =
        serde_json::from_str(&to_json(&registry, &grammar).unwrap()).unwrap();
    assert_eq!(
        value,
        serde_json::json!({ "type": "error", "source": "lexer", "line": 4, "msg": "bad token" })
    );

    assert_eq!(registry.free_recursive(grammar), 2);
    assert_eq!(registry.drain_all(), 0);
}
