use super::helpers::*;
use pretty_assertions::assert_eq;
use selune_bridge::{Lua, LuaRef, ValueKind};
use std::collections::BTreeMap;

#[test]
fn test_mixed_keys_as_ref_map() {
    let mut lua = Lua::new();
    let t = lua_table!(lua, { false => true, "a" => "abc", 1 => 5, 3.25 => -1.1 });
    set_result(&mut lua, &t);

    let mut expected = BTreeMap::new();
    expected.insert(
        LuaRef::new(&mut lua, &false).unwrap(),
        LuaRef::new(&mut lua, &true).unwrap(),
    );
    expected.insert(
        LuaRef::new(&mut lua, &'a').unwrap(),
        LuaRef::new(&mut lua, "abc").unwrap(),
    );
    expected.insert(
        LuaRef::new(&mut lua, &1).unwrap(),
        LuaRef::new(&mut lua, &5).unwrap(),
    );
    expected.insert(
        LuaRef::new(&mut lua, &3.25).unwrap(),
        LuaRef::new(&mut lua, &-1.1).unwrap(),
    );

    let r = result(&lua);
    assert!(r.is_instance::<BTreeMap<LuaRef, LuaRef>>(&lua));
    assert_eq!(r.cast::<BTreeMap<LuaRef, LuaRef>>(&lua), expected);
}

#[test]
fn test_ref_map_orders_by_kind() {
    let mut lua = Lua::new();
    let t = lua_table!(lua, { "z" => 1, 2 => 1, true => 1, 1.5 => 1 });
    let map = t.cast::<BTreeMap<LuaRef, i32>>(&lua);
    let kinds: Vec<ValueKind> = map.keys().map(LuaRef::kind).collect();
    assert_eq!(
        kinds,
        vec![
            ValueKind::Boolean,
            ValueKind::Number,
            ValueKind::Number,
            ValueKind::String
        ]
    );
    let numbers: Vec<f64> = map
        .keys()
        .filter_map(|k| k.value().as_number())
        .collect();
    assert_eq!(numbers, vec![1.5, 2.0]);
}

#[test]
fn test_ref_values_share_the_underlying_table() {
    let mut lua = Lua::new();
    let inner = lua_table!(lua, { "x" => 1 });
    let outer = lua_table!(lua, { "inner" => inner });

    let map = outer.cast::<BTreeMap<String, LuaRef>>(&lua);
    let handle = &map["inner"];
    assert!(handle.is_table());
    handle.set(&mut lua, "x", &99).unwrap();

    // no deep copy: the change is visible through the original handle
    assert_eq!(inner.get::<i32, _>(&mut lua, "x").unwrap(), 99);
    assert_eq!(handle, &inner);
}

#[test]
fn test_push_ref_map() {
    let mut lua = Lua::new();
    let f = lua.create_function("noop", |_| Ok(Vec::new()));
    let mut map = BTreeMap::new();
    map.insert(LuaRef::new(&mut lua, "callback").unwrap(), f.clone());
    map.insert(LuaRef::new(&mut lua, &7).unwrap(), LuaRef::nil(&lua));
    set_result(&mut lua, &map);

    let t = result(&lua);
    assert!(t.get::<LuaRef, _>(&mut lua, "callback").unwrap().is_function());
    // nil values do not create entries
    assert!(t.get::<LuaRef, _>(&mut lua, &7).unwrap().is_nil());
    assert_eq!(t.cast::<BTreeMap<String, LuaRef>>(&lua).len(), 1);
}

#[test]
fn test_nil_ref_key_is_rejected() {
    let mut lua = Lua::new();
    let map = BTreeMap::from([(LuaRef::nil(&lua), 1)]);
    assert!(lua.push(&map).is_err());
    assert_eq!(lua.top(), 0);
}

#[test]
fn test_string_keys_order_by_content() {
    let mut lua = Lua::new();
    // inserted out of byte order
    let t = lua_table!(lua, { "b" => 2, "a" => 1, "ba" => 3, "" => 0 });
    let map = t.cast::<BTreeMap<LuaRef, i32>>(&lua);
    let keys: Vec<String> = map.keys().map(|k| k.cast::<String>(&lua)).collect();
    assert_eq!(keys, vec!["", "a", "b", "ba"]);
    assert_eq!(map.values().copied().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
}
