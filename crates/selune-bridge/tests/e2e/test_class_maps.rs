use super::helpers::*;
use pretty_assertions::assert_eq;
use selune_bridge::{impl_userdata, BridgeError, Lua};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Data(i32);

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Unregistered(i32);

impl_userdata!(Data, Unregistered);

fn new_state() -> Lua {
    let mut lua = Lua::new();
    lua.register_class::<Data>("Data");
    lua
}

/// Adds each key's payload to its value's.
fn process_values(input: &BTreeMap<Data, Data>) -> BTreeMap<Data, Data> {
    input
        .iter()
        .map(|(k, v)| (k.clone(), Data(k.0 + v.0)))
        .collect()
}

fn process_pointers(input: &BTreeMap<Data, &Data>) -> BTreeMap<Data, Data> {
    input
        .iter()
        .map(|(k, v)| (k.clone(), Data(k.0 * v.0)))
        .collect()
}

#[test]
fn test_userdata_map_from_lua() {
    let mut lua = new_state();
    let t = lua_table!(lua, { Data(-1) => Data(2) });
    assert!(t.is_instance::<BTreeMap<Data, Data>>(&lua));

    let arg = t.cast::<BTreeMap<Data, Data>>(&lua);
    set_result(&mut lua, &process_values(&arg));

    let expected = BTreeMap::from([(Data(-1), Data(1))]);
    assert_eq!(result(&lua).cast::<BTreeMap<Data, Data>>(&lua), expected);
}

#[test]
fn test_referenced_values_push_by_value() {
    let mut lua = new_state();
    let pointees = vec![Data(-4), Data(5)];
    let input = BTreeMap::from([(Data(3), &pointees[0]), (Data(2), &pointees[1])]);
    set_result(&mut lua, &process_pointers(&input));
    assert_eq!(
        result(&lua).cast::<BTreeMap<Data, Data>>(&lua),
        BTreeMap::from([(Data(3), Data(-12)), (Data(2), Data(10))])
    );

    // a map of references lands as copies
    set_result(&mut lua, &input);
    drop(input);
    assert_eq!(
        result(&lua).cast::<BTreeMap<Data, Data>>(&lua),
        BTreeMap::from([(Data(3), Data(-4)), (Data(2), Data(5))])
    );
}

#[test]
fn test_unregistered_key_class() {
    let mut lua = new_state();
    let map = BTreeMap::from([(Unregistered(1), 1)]);
    let err = lua.push(&map).unwrap_err();
    assert!(matches!(err, BridgeError::UnsupportedType { type_name } if type_name.ends_with("Unregistered")));
    assert_eq!(lua.top(), 0);
}

#[test]
fn test_unregistered_value_class() {
    let mut lua = new_state();
    let map = BTreeMap::from([(1, Unregistered(1)), (2, Unregistered(2))]);
    let err = lua.push(&map).unwrap_err();
    assert!(matches!(err, BridgeError::UnsupportedType { .. }));
    assert_eq!(lua.top(), 0);
    assert_eq!(
        err.to_string(),
        format!(
            "no coercion available for type `{}`",
            std::any::type_name::<Unregistered>()
        )
    );
}

#[test]
fn test_registration_enables_push() {
    let mut lua = new_state();
    let map = BTreeMap::from([(1, Unregistered(7))]);
    assert!(lua.push(&map).is_err());

    lua.register_class::<Unregistered>("Unregistered");
    lua.push(&map).unwrap();
    assert_eq!(lua.get::<BTreeMap<i32, Unregistered>>(-1).unwrap(), map);
}

#[test]
fn test_wrong_class_value_is_mismatch() {
    let mut lua = new_state();
    lua.register_class::<Unregistered>("Unregistered");
    let t = lua_table!(lua, { 1 => Data(1), 2 => Unregistered(2) });
    assert!(!t.is_instance::<BTreeMap<i32, Data>>(&lua));
    let err = t.try_cast::<BTreeMap<i32, Data>>(&lua).unwrap_err();
    assert_eq!(
        err,
        BridgeError::TypeMismatch {
            expected: "Data",
            found: "userdata",
            element: Some("value at key 2".into()),
        }
    );
}
