//! Privilege bitmask
//!
//! Bit `i` is set iff `Privilege::from_idx(i)` is granted:
//!
//! ```text
//! ....0000000000
//!        ^     ^
//!        |     +-- first priv (0)
//!        +-------- last priv (COUNT - 1)
//! ```

use std::fmt;
use std::io::{Read, Write};
use std::ops::{BitAnd, BitOr, BitXor};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::error::{malformed, PrivError, Result};
use crate::privilege::{Privilege, DB_TABLE_PRIVS, IMPERSONATE_PRIVS, NODE_PRIVS, RESOURCE_PRIVS};

/// Bits that may legally be set
const VALID_BITS: u64 = (1u64 << Privilege::COUNT) - 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawBitSet")]
pub struct PrivBitSet {
    set: u64,
}

#[derive(Deserialize)]
struct RawBitSet {
    set: u64,
}

impl TryFrom<RawBitSet> for PrivBitSet {
    type Error = PrivError;
    fn try_from(raw: RawBitSet) -> Result<Self> {
        PrivBitSet::from_bits(raw.set)
    }
}

#[inline]
fn check_idx(idx: usize) {
    assert!(idx < Privilege::COUNT, "privilege index {} out of range (catalog size {})", idx, Privilege::COUNT);
}

impl PrivBitSet {
    pub const fn new() -> Self {
        PrivBitSet { set: 0 }
    }

    /// Build a mask from privileges in any order
    pub const fn of(privs: &[Privilege]) -> Self {
        let mut set = 0u64;
        let mut i = 0;
        while i < privs.len() {
            set |= 1u64 << (privs[i] as usize);
            i += 1;
        }
        PrivBitSet { set }
    }

    /// Every privilege in the catalog
    pub const fn all() -> Self {
        PrivBitSet { set: VALID_BITS }
    }

    /// Rebuild a mask from its raw integer, rejecting bits outside the catalog
    pub fn from_bits(set: u64) -> Result<Self> {
        if set & !VALID_BITS != 0 {
            return Err(PrivError::Malformed(format!("privilege mask {:#x} has bits outside the catalog", set)));
        }
        Ok(PrivBitSet { set })
    }

    #[inline]
    pub fn bits(&self) -> u64 {
        self.set
    }

    #[inline]
    pub fn set(&mut self, idx: usize) {
        check_idx(idx);
        self.set |= 1u64 << idx;
    }

    #[inline]
    pub fn unset(&mut self, idx: usize) {
        check_idx(idx);
        self.set &= !(1u64 << idx);
    }

    #[inline]
    pub fn get(&self, idx: usize) -> bool {
        check_idx(idx);
        self.set & (1u64 << idx) != 0
    }

    #[inline]
    pub fn or(&mut self, other: &PrivBitSet) {
        self.set |= other.set;
    }

    #[inline]
    pub fn and(&mut self, other: &PrivBitSet) {
        self.set &= other.set;
    }

    #[inline]
    pub fn xor(&mut self, other: &PrivBitSet) {
        self.set ^= other.set;
    }

    /// Drop every privilege present in `other`. Bits of `other` that are not
    /// set here have no effect.
    #[inline]
    pub fn remove(&mut self, other: &PrivBitSet) {
        let mut tmp = *self;
        tmp.xor(other);
        self.and(&tmp);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.set == 0
    }

    pub fn satisfy(&self, want: &PrivPredicate) -> bool {
        let w = want.privs.set;
        match want.op {
            PredicateOp::And => self.set & w == w,
            PredicateOp::Or => self.set & w != 0,
        }
    }

    pub fn contains_node_priv(&self) -> bool {
        self.contains_privs(NODE_PRIVS)
    }

    pub fn contains_resource_priv(&self) -> bool {
        self.contains_privs(RESOURCE_PRIVS)
    }

    pub fn contains_impersonate_priv(&self) -> bool {
        self.contains_privs(IMPERSONATE_PRIVS)
    }

    pub fn contains_db_table_priv(&self) -> bool {
        self.contains_privs(DB_TABLE_PRIVS)
    }

    /// True if any of `privs` is set
    pub fn contains_privs(&self, privs: &[Privilege]) -> bool {
        privs.iter().any(|p| self.get(p.idx()))
    }

    pub fn iter(&self) -> impl Iterator<Item = Privilege> + '_ {
        Privilege::ALL.iter().copied().filter(move |p| self.get(p.idx()))
    }

    /// Granted privileges, ascending by index
    pub fn to_privilege_list(&self) -> Vec<Privilege> {
        self.iter().collect()
    }

    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u64::<BigEndian>(self.set)?;
        Ok(())
    }

    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        Self::from_bits(r.read_u64::<BigEndian>().map_err(malformed)?)
    }
}

impl FromIterator<Privilege> for PrivBitSet {
    fn from_iter<I: IntoIterator<Item = Privilege>>(iter: I) -> Self {
        let mut s = PrivBitSet::new();
        for p in iter {
            s.set(p.idx());
        }
        s
    }
}

impl BitOr for PrivBitSet {
    type Output = PrivBitSet;
    fn bitor(mut self, rhs: Self) -> Self {
        self.or(&rhs);
        self
    }
}

impl BitAnd for PrivBitSet {
    type Output = PrivBitSet;
    fn bitand(mut self, rhs: Self) -> Self {
        self.and(&rhs);
        self
    }
}

impl BitXor for PrivBitSet {
    type Output = PrivBitSet;
    fn bitxor(mut self, rhs: Self) -> Self {
        self.xor(&rhs);
        self
    }
}

impl fmt::Display for PrivBitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for p in self.iter() {
            write!(f, "{} ", p)?;
        }
        Ok(())
    }
}

/// How a predicate's privileges combine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateOp {
    /// All privileges required
    And,
    /// Any one privilege suffices
    Or,
}

/// Privileges wanted by one authorization check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrivPredicate {
    privs: PrivBitSet,
    op: PredicateOp,
}

impl PrivPredicate {
    pub const SELECT: PrivPredicate = Self::any_of(PrivBitSet::of(&[Privilege::Select]));
    pub const LOAD: PrivPredicate = Self::any_of(PrivBitSet::of(&[Privilege::Load]));
    pub const ALTER: PrivPredicate = Self::any_of(PrivBitSet::of(&[Privilege::Alter]));
    pub const CREATE: PrivPredicate = Self::any_of(PrivBitSet::of(&[Privilege::Create]));
    pub const DROP: PrivPredicate = Self::any_of(PrivBitSet::of(&[Privilege::Drop]));
    pub const ADMIN: PrivPredicate = Self::any_of(PrivBitSet::of(&[Privilege::Admin]));
    pub const GRANT: PrivPredicate = Self::any_of(PrivBitSet::of(&[Privilege::Admin, Privilege::Grant]));
    pub const NODE: PrivPredicate = Self::any_of(PrivBitSet::of(&[Privilege::Node]));
    pub const USAGE: PrivPredicate = Self::any_of(PrivBitSet::of(&[Privilege::Usage]));
    pub const OPERATOR: PrivPredicate = Self::any_of(PrivBitSet::of(&[Privilege::Admin, Privilege::Node]));
    /// Anything that lets a user see a database exists
    pub const SHOW: PrivPredicate = Self::any_of(PrivBitSet::of(&[
        Privilege::Admin,
        Privilege::Select,
        Privilege::Load,
        Privilege::Alter,
        Privilege::Create,
        Privilege::Drop,
    ]));

    pub const fn new(privs: PrivBitSet, op: PredicateOp) -> Self {
        PrivPredicate { privs, op }
    }

    pub const fn all_of(privs: PrivBitSet) -> Self {
        Self::new(privs, PredicateOp::And)
    }

    pub const fn any_of(privs: PrivBitSet) -> Self {
        Self::new(privs, PredicateOp::Or)
    }

    pub fn privs(&self) -> PrivBitSet {
        self.privs
    }

    pub fn op(&self) -> PredicateOp {
        self.op
    }
}
