use super::helpers::*;
use pretty_assertions::assert_eq;
use selune_bridge::{impl_userdata, BridgeError, FromLua, Lua, LuaRef};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Token(u32);

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Stranger;

impl_userdata!(Token, Stranger);

#[test]
fn test_failed_push_leaves_collectable_table() {
    let mut lua = Lua::new();
    lua.register_class::<Token>("Token");
    lua.collect_garbage();
    let baseline = lua.heap_stats();

    // the key lands as userdata before the value fails
    let err = lua.push(&BTreeMap::from([(Token(3), Stranger)]));
    assert!(err.is_err());
    assert_eq!(lua.top(), 0);
    let after = lua.heap_stats();
    assert_eq!(after.tables, baseline.tables + 1);
    assert_eq!(after.userdata, baseline.userdata + 1);

    lua.collect_garbage();
    assert_eq!(lua.heap_stats(), baseline);
}

#[test]
fn test_popped_map_is_collected() {
    let mut lua = Lua::new();
    lua.register_class::<Token>("Token");
    let baseline = lua.heap_stats();

    lua.push(&BTreeMap::from([(1, Token(1)), (2, Token(2))])).unwrap();
    // reachable from the stack
    assert_eq!(lua.collect_garbage(), 0);

    lua.pop(1);
    assert_eq!(lua.collect_garbage(), 3);
    assert_eq!(lua.heap_stats(), baseline);
}

#[test]
fn test_global_map_survives_collection() {
    let mut lua = Lua::new();
    let map = BTreeMap::from([("a".to_string(), BTreeMap::from([(1, 2)]))]);
    set_result(&mut lua, &map);
    lua.collect_garbage();
    assert_eq!(
        result(&lua).cast::<BTreeMap<String, BTreeMap<i32, i32>>>(&lua),
        map
    );
}

#[test]
fn test_ref_map_keeps_entries_alive() {
    let mut lua = Lua::new();
    let inner = lua_table!(lua, { "x" => 1 });
    let outer = lua_table!(lua, { 1 => inner });
    drop(inner);

    let refs = outer.cast::<BTreeMap<i32, LuaRef>>(&lua);
    drop(outer);
    lua.collect_garbage();

    // the outer table is gone; the inner one is still held by `refs`
    assert_eq!(lua.heap_stats().tables, 2);
    let handle = &refs[&1];
    assert_eq!(handle.get::<i32, _>(&mut lua, "x").unwrap(), 1);

    drop(refs);
    assert_eq!(lua.collect_garbage(), 1);
}

#[test]
fn test_handle_outlives_stack_slot() {
    let mut lua = Lua::new();
    let map = BTreeMap::from([(1, 10), (2, 20)]);
    lua.push(&map).unwrap();
    let handle = LuaRef::from_stack(&lua, -1).unwrap();
    lua.pop(1);
    lua.collect_garbage();

    lua.push(&handle).unwrap();
    assert_eq!(lua.get::<BTreeMap<i32, i32>>(-1).unwrap(), map);
}

#[test]
fn test_stale_raw_value_is_error() {
    let mut lua = Lua::new();
    lua.push(&BTreeMap::from([(1, 10)])).unwrap();
    let stale = lua.value_at(-1).unwrap();
    lua.pop(1);
    assert_eq!(lua.collect_garbage(), 1);

    let err = <BTreeMap<i32, i32> as FromLua>::from_lua(&lua, stale).unwrap_err();
    assert!(matches!(err, BridgeError::Runtime(_)), "{err:?}");
    assert!(!<BTreeMap<i32, i32> as FromLua>::is_instance(&lua, stale));
}

#[test]
fn test_stale_userdata_is_mismatch() {
    let mut lua = Lua::new();
    lua.register_class::<Token>("Token");
    lua.push(&Token(7)).unwrap();
    let stale = lua.value_at(-1).unwrap();
    lua.pop(1);
    lua.collect_garbage();

    assert!(<Token as FromLua>::from_lua(&lua, stale).is_err());
    assert!(!<Token as FromLua>::is_instance(&lua, stale));
}
