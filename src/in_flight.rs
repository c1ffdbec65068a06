use core::{
	borrow::Borrow,
	hash::{BuildHasher, Hash},
};
use hashbrown::{
	hash_map::{DefaultHashBuilder, Entry},
	HashMap,
};
use num_traits::{CheckedAdd, CheckedSub, One, Zero};

/// Counts concurrently pending actions per key (target id), dropping keys as they reach zero.
pub struct InFlight<K, C = u16, S = DefaultHashBuilder>(HashMap<K, C, S>)
where
	K: Hash + Eq,
	C: CheckedAdd + CheckedSub + One + Zero,
	S: BuildHasher;
impl<K, C, S> Default for InFlight<K, C, S>
where
	K: Hash + Eq,
	C: CheckedAdd + CheckedSub + One + Zero + Copy,
	S: Default + BuildHasher,
{
	fn default() -> Self {
		Self::new()
	}
}
impl<K, C, S> InFlight<K, C, S>
where
	K: Hash + Eq,
	C: CheckedAdd + CheckedSub + One + Zero + Copy,
	S: BuildHasher,
{
	#[must_use]
	pub fn new() -> Self
	where
		S: Default,
	{
		Self(HashMap::with_hasher(S::default()))
	}

	/// Returns the new count.
	pub fn increment(&mut self, k: K) -> Result<C, CountSaturatedError> {
		match self.0.entry(k) {
			Entry::Occupied(occupied) => {
				let c = occupied.into_mut();
				*c = c.checked_add(&C::one()).ok_or(CountSaturatedError)?;
				Ok(*c)
			}
			Entry::Vacant(vacant) => Ok(*vacant.insert(C::one())),
		}
	}

	/// Returns the remaining count. Unknown keys count as zero.
	pub fn decrement<Q: ?Sized>(&mut self, k: &Q) -> C
	where
		K: Borrow<Q>,
		Q: Eq + Hash,
	{
		let remaining = match self.0.get_mut(k) {
			Some(c) => match c.checked_sub(&C::one()) {
				Some(remaining) => {
					*c = remaining;
					remaining
				}
				None => C::zero(),
			},
			None => return C::zero(),
		};
		if remaining.is_zero() {
			self.0.remove(k);
		}
		remaining
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountSaturatedError;
