use super::helpers::*;
use selune_bridge::{impl_userdata, Lua};
use std::collections::BTreeMap;
use std::process::Command;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Opaque;

impl_userdata!(Opaque);

const CHILD_ENV: &str = "SELUNE_BRIDGE_POLICY_CHILD";

/// Re-run one test of this binary in a child process with `CHILD_ENV` set,
/// and report whether the child exited cleanly.
fn child_succeeds(test_name: &str) -> bool {
    let exe = std::env::current_exe().unwrap_or_else(|e| panic!("current_exe: {e}"));
    Command::new(exe)
        .args(["--exact", test_name, "--test-threads", "1", "--nocapture"])
        .env(CHILD_ENV, "1")
        .output()
        .unwrap_or_else(|e| panic!("spawn child: {e}"))
        .status
        .success()
}

fn in_child() -> bool {
    std::env::var_os(CHILD_ENV).is_some()
}

// Both policies end the offending test: an unwind fails it, an abort kills
// the process. Either way the child must not exit cleanly.
#[test]
fn test_failed_cast_does_not_return() {
    if in_child() {
        let mut lua = Lua::new();
        let t = lua_table!(lua, { "a" => 1 });
        let _ = t.cast::<BTreeMap<i32, i32>>(&lua);
        return;
    }
    assert!(!child_succeeds("e2e::test_error_policy::test_failed_cast_does_not_return"));
}

#[test]
fn test_failed_push_or_raise_does_not_return() {
    if in_child() {
        let mut lua = Lua::new();
        lua.push_or_raise(&BTreeMap::from([(1, Opaque)]));
        return;
    }
    assert!(!child_succeeds(
        "e2e::test_error_policy::test_failed_push_or_raise_does_not_return"
    ));
}

#[test]
fn test_successful_cast_returns() {
    if in_child() {
        let mut lua = Lua::new();
        let t = lua_table!(lua, { "a" => 1 });
        assert_eq!(t.cast::<BTreeMap<String, i32>>(&lua).len(), 1);
        return;
    }
    assert!(child_succeeds("e2e::test_error_policy::test_successful_cast_returns"));
}

#[cfg(not(feature = "abort-on-error"))]
mod unwinding {
    use super::*;
    use selune_bridge::BridgeError;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    #[test]
    fn test_cast_panics_with_bridge_error() {
        let mut lua = Lua::new();
        let t = lua_table!(lua, { 1 => 2, "a" => 3 });
        let payload = catch_unwind(AssertUnwindSafe(|| t.cast::<BTreeMap<i32, i32>>(&lua)))
            .unwrap_err();
        let err = payload
            .downcast_ref::<BridgeError>()
            .unwrap_or_else(|| panic!("payload is not a BridgeError"));
        assert!(matches!(err, BridgeError::TypeMismatch { expected: "i32", .. }));
    }

    #[test]
    fn test_push_or_raise_panics_with_unsupported_type() {
        let mut lua = Lua::new();
        let payload = catch_unwind(AssertUnwindSafe(|| {
            lua.push_or_raise(&BTreeMap::from([(Opaque, 1)]))
        }))
        .unwrap_err();
        assert!(matches!(
            payload.downcast_ref::<BridgeError>(),
            Some(BridgeError::UnsupportedType { .. })
        ));
        assert_eq!(lua.top(), 0);
    }

    #[test]
    #[should_panic]
    fn test_cast_to_int_map_panics() {
        let mut lua = Lua::new();
        let t = lua_table!(lua, { 1 => 2, "a" => 3 });
        t.cast::<BTreeMap<i32, i32>>(&lua);
    }
}
