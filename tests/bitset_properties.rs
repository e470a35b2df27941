//! Property tests for the privilege bitmask

use privbit::*;
use rand::Rng;

fn random_mask(rng: &mut impl Rng) -> PrivBitSet {
    PrivBitSet::from_bits(rng.gen::<u64>() & PrivBitSet::all().bits()).unwrap()
}

// === set / unset / get ===

#[test]
fn set_then_get_for_every_index() {
    for i in 0..Privilege::COUNT {
        let mut m = PrivBitSet::new();
        m.set(i);
        assert!(m.get(i));
        m.unset(i);
        assert!(!m.get(i));
        assert!(m.is_empty());
    }
}

#[test]
fn unset_leaves_other_bits() {
    let mut m = PrivBitSet::all();
    m.unset(Privilege::Load.idx());
    assert_eq!(m.to_privilege_list().len(), Privilege::COUNT - 1);
    assert!(!m.get(Privilege::Load.idx()));
    assert!(m.get(Privilege::Select.idx()));
}

// === remove ===

#[test]
fn remove_matches_bitwise_reference() {
    let mut rng = rand::thread_rng();
    for _ in 0..10_000 {
        let a = random_mask(&mut rng);
        let b = random_mask(&mut rng);

        let mut got = a;
        got.remove(&b);

        let mut want = PrivBitSet::new();
        for i in 0..Privilege::COUNT {
            if a.get(i) && !b.get(i) {
                want.set(i);
            }
        }
        assert_eq!(got, want, "a={:#x} b={:#x}", a.bits(), b.bits());
        assert_eq!(got.bits(), a.bits() & !b.bits());
    }
}

#[test]
fn remove_raw_formula_on_full_width_values() {
    // The receiver-xor-other formula is plain subtraction for any 64-bit value
    let mut rng = rand::thread_rng();
    for _ in 0..10_000 {
        let a: u64 = rng.gen();
        let b: u64 = rng.gen();
        let got = a & (a ^ b);
        let mut want = 0u64;
        for i in 0..64 {
            if a & (1 << i) != 0 && b & (1 << i) == 0 {
                want |= 1 << i;
            }
        }
        assert_eq!(got, want);
    }
}

// === satisfy ===

#[test]
fn satisfy_all_of_and_any_of() {
    use Privilege::*;
    let want = PrivBitSet::of(&[Select, Load]);
    let all = PrivPredicate::all_of(want);
    let any = PrivPredicate::any_of(want);

    let mut rng = rand::thread_rng();
    for _ in 0..1_000 {
        let m = random_mask(&mut rng);
        let has_select = m.get(Select.idx());
        let has_load = m.get(Load.idx());
        assert_eq!(m.satisfy(&all), has_select && has_load);
        assert_eq!(m.satisfy(&any), has_select || has_load);
    }
}

#[test]
fn named_predicates() {
    use Privilege::*;
    assert!(PrivBitSet::of(&[Grant]).satisfy(&PrivPredicate::GRANT));
    assert!(PrivBitSet::of(&[Admin]).satisfy(&PrivPredicate::GRANT));
    assert!(PrivBitSet::of(&[Node]).satisfy(&PrivPredicate::OPERATOR));
    assert!(PrivBitSet::of(&[Drop]).satisfy(&PrivPredicate::SHOW));
    assert!(!PrivBitSet::of(&[Usage]).satisfy(&PrivPredicate::SHOW));
    assert_eq!(PrivPredicate::SELECT.op(), PredicateOp::Or);
}

// === serde ===

#[test]
fn serde_form_is_set_field() {
    let m = PrivBitSet::of(&[Privilege::Select, Privilege::Drop]);
    let json = serde_json::to_string(&m).unwrap();
    assert_eq!(json, format!("{{\"set\":{}}}", m.bits()));
    let back: PrivBitSet = serde_json::from_str(&json).unwrap();
    assert_eq!(back, m);
    assert!(serde_json::from_str::<PrivBitSet>("{\"set\":1099511627776}").is_err());
}
