//! Edge case tests for wplc-sem

use crate::scope::ScopeManager;
use crate::symbol::Bindings;
use crate::types::WplType;
use wplc_tree::NodeId;

// ==================== SCOPE MANAGER TESTS ====================

/// EDGE CASE: Lookup in a fresh manager
#[test]
fn test_edge_fresh_manager_resolves_nothing() {
    let scopes = ScopeManager::new();
    assert!(scopes.find("anything").is_none());
    assert_eq!(scopes.depth(), 1);
}

/// EDGE CASE: Deeply nested frames resolve outward
#[test]
fn test_edge_deep_nesting() {
    let mut scopes = ScopeManager::new();
    let id = scopes.add("x", WplType::Int).unwrap();
    for _ in 0..16 {
        scopes.enter();
    }
    assert_eq!(scopes.find("x"), Some(id));
    for _ in 0..16 {
        scopes.exit();
    }
    assert_eq!(scopes.depth(), 1);
}

/// EDGE CASE: Same name redeclarable after frame exit
#[test]
fn test_edge_redeclare_after_exit() {
    let mut scopes = ScopeManager::new();
    scopes.enter();
    assert!(scopes.add("tmp", WplType::Str).is_some());
    scopes.exit();
    scopes.enter();
    assert!(scopes.add("tmp", WplType::Int).is_some());
}

/// EDGE CASE: Duplicate check only inspects the top frame
#[test]
fn test_edge_duplicate_check_is_per_frame() {
    let mut scopes = ScopeManager::new();
    assert!(scopes.add("x", WplType::Int).is_some());
    scopes.enter();
    assert!(scopes.add("x", WplType::Int).is_some());
    scopes.enter();
    assert!(scopes.add("x", WplType::Int).is_some());
}

/// EDGE CASE: Type promotion sticks on the arena record
#[test]
fn test_edge_promotion_survives_exit() {
    let mut scopes = ScopeManager::new();
    scopes.enter();
    let id = scopes.add("n", WplType::Undefined).unwrap();
    scopes.symbol_mut(id).ty = WplType::Int;
    scopes.exit();
    assert_eq!(scopes.symbol(id).ty, WplType::Int);
}

// ==================== BINDING MAP TESTS ====================

/// EDGE CASE: Rebinding a node overwrites, not duplicates
#[test]
fn test_edge_rebind_same_node() {
    let mut scopes = ScopeManager::new();
    let a = scopes.add("a", WplType::Int).unwrap();
    let b = scopes.add("b", WplType::Int).unwrap();

    let mut bindings = Bindings::new();
    bindings.bind(NodeId(0), a);
    bindings.bind(NodeId(0), b);

    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings.get(NodeId(0)), Some(b));
}
