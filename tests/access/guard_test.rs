// Access control tests: administrator, pause gate, reentrancy guard

use capsale::access::{AccessError, Administrator, PauseGate, PausedError, ReentrancyError, ReentrancyGuard};
use capsale::identity::Address;

// ============================================================================
// ADMINISTRATOR TESTS
// ============================================================================

#[test]
fn test_zero_administrator_rejected() {
    assert!(matches!(Administrator::new(Address::ZERO), Err(AccessError::InvalidAddress)));
}

#[test]
fn test_only_admin_passes_ensure() {
    let alice = Address::from_label("alice");
    let admin = Administrator::new(alice).unwrap();

    assert!(admin.ensure(&alice).is_ok());
    assert!(matches!(
        admin.ensure(&Address::from_label("mallory")),
        Err(AccessError::Unauthorized)
    ));
}

#[test]
fn test_transfer_to_zero_rejected() {
    let alice = Address::from_label("alice");
    let mut admin = Administrator::new(alice).unwrap();

    assert!(matches!(admin.transfer(&alice, Address::ZERO), Err(AccessError::InvalidAddress)));
    assert_eq!(admin.current(), alice);
}

#[test]
fn test_previous_admin_loses_rights() {
    let alice = Address::from_label("alice");
    let bob = Address::from_label("bob");
    let mut admin = Administrator::new(alice).unwrap();

    admin.transfer(&alice, bob).unwrap();

    assert!(matches!(admin.ensure(&alice), Err(AccessError::Unauthorized)));
    assert!(admin.ensure(&bob).is_ok());
}

// ============================================================================
// PAUSE GATE TESTS
// ============================================================================

#[test]
fn test_pause_gate_starts_open() {
    let gate = PauseGate::new();
    assert!(!gate.is_paused());
    assert!(gate.ensure_open().is_ok());
}

#[test]
fn test_pause_gate_closes_and_reopens() {
    let mut gate = PauseGate::new();

    assert!(!gate.set(true));
    assert_eq!(gate.ensure_open(), Err(PausedError));

    assert!(gate.set(false));
    assert!(gate.ensure_open().is_ok());
}

// ============================================================================
// REENTRANCY GUARD TESTS
// ============================================================================

#[test]
fn test_guard_rejects_nested_entry() {
    let guard = ReentrancyGuard::new();
    let outer = guard.enter().unwrap();

    assert_eq!(guard.enter().unwrap_err(), ReentrancyError);

    drop(outer);
    assert!(guard.enter().is_ok());
}

#[test]
fn test_guard_released_on_error_path() {
    fn guarded(guard: &ReentrancyGuard, fail: bool) -> Result<(), &'static str> {
        let _entered = guard.enter().map_err(|_| "reentrant")?;
        if fail {
            return Err("failed inside");
        }
        Ok(())
    }

    let guard = ReentrancyGuard::new();
    assert_eq!(guarded(&guard, true), Err("failed inside"));
    assert!(!guard.is_entered());
    assert_eq!(guarded(&guard, false), Ok(()));
}

#[test]
fn test_guard_is_exclusive_across_threads() {
    use std::sync::{Arc, Barrier};

    let guard = Arc::new(ReentrancyGuard::new());
    let held = guard.enter().unwrap();
    let barrier = Arc::new(Barrier::new(2));

    let handle = {
        let guard = guard.clone();
        let barrier = barrier.clone();
        std::thread::spawn(move || {
            let result = guard.enter().is_err();
            barrier.wait();
            result
        })
    };

    barrier.wait();
    assert!(handle.join().unwrap());
    drop(held);
    assert!(!guard.is_entered());
}
