use std::collections::HashMap;

/// Base palette shared with the canvas renderer.
pub const COLORS: &[&str] = &[
	"#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
	"#bcbd22", "#17becf",
];

/// Deterministic palette state, keyed by a parent id so that nodes under the
/// same parent get visually related shades. Owned by the caller and threaded
/// into the canvas state builder; nothing here is process-global.
#[derive(Debug, Default)]
pub struct ColorAssigner {
	base: HashMap<String, String>,
	children: HashMap<String, usize>,
}

impl ColorAssigner {
	pub fn new() -> Self {
		Self::default()
	}

	/// Base palette color for a key, assigned round-robin on first use and
	/// memoized after that.
	pub fn base(&mut self, key: &str) -> String {
		if let Some(color) = self.base.get(key) {
			return color.clone();
		}
		let color = COLORS[self.base.len() % COLORS.len()].to_string();
		self.base.insert(key.to_string(), color.clone());
		color
	}

	/// A lighter variant of the key's base color. Successive calls for the
	/// same key step further toward white, so siblings stay distinguishable.
	pub fn shade(&mut self, key: &str) -> String {
		let base = self.base(key);
		let n = self.children.entry(key.to_string()).or_insert(0);
		*n += 1;
		lighten(&base, 0.12 * (*n as f64).min(5.0))
	}
}

/// Blend a `#rrggbb` color toward white by `amount` in [0, 1]. Colors that do
/// not parse pass through unchanged.
fn lighten(hex: &str, amount: f64) -> String {
	let Some(rgb) = parse_hex(hex) else {
		return hex.to_string();
	};
	let blend = |c: u8| -> u8 { (c as f64 + (255.0 - c as f64) * amount).round() as u8 };
	format!("#{:02x}{:02x}{:02x}", blend(rgb.0), blend(rgb.1), blend(rgb.2))
}

fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
	let hex = hex.strip_prefix('#')?;
	if hex.len() != 6 {
		return None;
	}
	let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
	let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
	let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
	Some((r, g, b))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn base_is_memoized_and_round_robin() {
		let mut colors = ColorAssigner::new();
		let a = colors.base("meetings/a");
		let b = colors.base("meetings/b");
		assert_ne!(a, b);
		assert_eq!(colors.base("meetings/a"), a);
	}

	#[test]
	fn shades_are_deterministic_given_call_order() {
		let mut one = ColorAssigner::new();
		let mut two = ColorAssigner::new();
		for key in ["meetings/a", "meetings/a", "meetings/b"] {
			assert_eq!(one.shade(key), two.shade(key));
		}
	}

	#[test]
	fn sibling_shades_differ() {
		let mut colors = ColorAssigner::new();
		let first = colors.shade("meetings/a");
		let second = colors.shade("meetings/a");
		assert_ne!(first, second);
	}

	#[test]
	fn lighten_handles_bad_input() {
		assert_eq!(lighten("not-a-color", 0.5), "not-a-color");
		assert_eq!(lighten("#000000", 1.0), "#ffffff");
	}
}
