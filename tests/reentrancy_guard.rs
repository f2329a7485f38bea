use byte_table::{ByteTable, HashFunction, TableConfig};
use std::cell::Cell;

/// Digest that runs a hook once, used to reach back into the table while
/// it is hashing.
struct Hooked {
    hook: Cell<Option<Box<dyn Fn()>>>,
}

impl HashFunction for Hooked {
    fn hash32(&self, bytes: &[u8], _seed: u32) -> u32 {
        if let Some(hook) = self.hook.take() {
            hook();
        }
        bytes.len() as u32
    }
}

fn hooked_table() -> ByteTable<'static, Hooked> {
    let hooked = Hooked {
        hook: Cell::new(None),
    };
    let mut t = ByteTable::with_hasher(TableConfig::default(), hooked).unwrap();
    t.insert(b"a".to_vec(), b"1".to_vec()).unwrap();
    t
}

/// Arms the hook so the next digest call looks `key` up in `t` itself.
fn reach_back(t: &ByteTable<'static, Hooked>, key: &'static [u8]) {
    let ptr: *const ByteTable<'static, Hooked> = t;
    t.hasher().hook.set(Some(Box::new(move || {
        // SAFETY: the table outlives the outer call that runs this hook and
        // is only accessed through shared references meanwhile.
        let table = unsafe { &*ptr };
        let _ = table.contains(key);
    })));
}

#[test]
fn sequential_calls_are_fine() {
    let t = hooked_table();
    assert!(t.contains(b"a"));
    assert_eq!(t.get(b"a"), Some(&b"1"[..]));
    assert_eq!(t.keys(), vec![&b"a"[..]]);
}

#[cfg(debug_assertions)]
#[test]
fn reentry_from_digest_panics_in_debug() {
    let t = hooked_table();
    reach_back(&t, b"a");
    let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| t.contains(b"a")));
    assert!(res.is_err(), "expected reentrancy to panic in debug builds");
    // The outer guard was released during unwinding.
    assert!(t.contains(b"a"));
    assert_eq!(t.len(), 1);
}

#[cfg(not(debug_assertions))]
#[test]
fn reentry_is_unchecked_in_release() {
    let t = hooked_table();
    reach_back(&t, b"a");
    assert!(t.contains(b"a"));
}
