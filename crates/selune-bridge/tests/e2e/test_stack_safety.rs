use super::helpers::*;
use pretty_assertions::assert_eq;
use selune_bridge::{BridgeError, Lua, LuaConfig, StackKind};
use std::collections::BTreeMap;

#[test]
fn test_push_with_exhausted_stack() {
    init_tracing();
    let mut lua = Lua::new();
    exhaust_stack_space(&mut lua);
    let top = lua.top();

    let err = lua.push(&BTreeMap::from([(1, 2)])).unwrap_err();
    assert!(err.is_stack_overflow());
    assert_eq!(lua.top(), top);
}

#[test]
fn test_empty_map_needs_headroom_too() {
    let mut lua = Lua::with_config(LuaConfig::default().with_max_stack(8));
    exhaust_stack_space(&mut lua);
    assert_eq!(lua.top(), 8);
    assert!(lua.push(&BTreeMap::<String, i32>::new()).is_err());
    assert_eq!(lua.top(), 8);
}

#[test]
fn test_limited_headroom() {
    let mut lua = Lua::with_config(LuaConfig::default().with_max_stack(10));
    for _ in 0..8 {
        lua.push_nil().unwrap();
    }
    // the table plus one key and one value need three slots
    let err = lua.push(&BTreeMap::from([(1, 2)])).unwrap_err();
    assert_eq!(
        err,
        BridgeError::StackOverflow {
            kind: StackKind::Values,
            limit: 10
        }
    );
    assert_eq!(lua.top(), 8);

    lua.pop(1);
    lua.push(&BTreeMap::from([(1, 2)])).unwrap();
    assert_eq!(lua.top(), 8);
}

#[test]
fn test_stack_recovers_after_overflow() {
    let mut lua = Lua::with_config(LuaConfig::default().with_max_stack(16));
    exhaust_stack_space(&mut lua);
    assert!(lua.push(&BTreeMap::from([("a", 1)])).is_err());
    lua.pop(lua.top());
    lua.push(&BTreeMap::from([("a", 1)])).unwrap();
    assert_eq!(lua.get::<BTreeMap<String, i32>>(-1).unwrap()["a"], 1);
}

#[test]
fn test_deep_nesting_is_bounded() {
    let depth_limit = 8;
    let mut lua = Lua::with_config(LuaConfig::default().with_max_c_stack_depth(depth_limit));

    // a chain of tables nested one level deeper than the limit allows
    let leaf = lua.new_table();
    let mut current = leaf;
    for _ in 0..depth_limit {
        let parent = lua.new_table();
        parent.set(&mut lua, &1, &current).unwrap();
        current = parent;
    }

    let err = current
        .try_cast::<BTreeMap<i32, BTreeMap<i32, BTreeMap<i32, BTreeMap<i32, BTreeMap<i32, BTreeMap<i32, BTreeMap<i32, BTreeMap<i32, BTreeMap<i32, i32>>>>>>>>>>(&lua)
        .unwrap_err();
    assert_eq!(
        err,
        BridgeError::StackOverflow {
            kind: StackKind::Nesting,
            limit: depth_limit
        }
    );
}

#[test]
fn test_nesting_within_limit() {
    let mut lua = Lua::with_config(LuaConfig::default().with_max_c_stack_depth(2));
    let nested = BTreeMap::from([(1, BTreeMap::from([(2, 3)]))]);
    lua.push(&nested).unwrap();
    assert!(lua.is_instance::<BTreeMap<i32, BTreeMap<i32, i32>>>(-1));
    assert_eq!(lua.get::<BTreeMap<i32, BTreeMap<i32, i32>>>(-1).unwrap(), nested);
}
