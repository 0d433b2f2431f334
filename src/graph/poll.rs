use std::cell::Cell;
use std::rc::Rc;

use log::debug;

/// At-most-one in-flight poll. The interval callback calls [`PollGate::try_begin`]
/// before spawning a fetch and skips the tick if the previous fetch has not
/// resolved yet; the fetch future calls [`PollGate::finish`] when it settles.
#[derive(Clone, Default)]
pub struct PollGate {
	in_flight: Rc<Cell<bool>>,
}

impl PollGate {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn try_begin(&self) -> bool {
		if self.in_flight.get() {
			debug!("skipping poll tick, previous fetch still in flight");
			return false;
		}
		self.in_flight.set(true);
		true
	}

	pub fn finish(&self) {
		self.in_flight.set(false);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn second_tick_is_skipped_until_finish() {
		let gate = PollGate::new();
		assert!(gate.try_begin());
		assert!(!gate.try_begin());
		gate.finish();
		assert!(gate.try_begin());
	}

	#[test]
	fn clones_share_state() {
		let gate = PollGate::new();
		let other = gate.clone();
		assert!(gate.try_begin());
		assert!(!other.try_begin());
		other.finish();
		assert!(gate.try_begin());
	}
}
