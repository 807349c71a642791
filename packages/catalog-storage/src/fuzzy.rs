//! Bounded edit distance for fuzzy term matching.

/// Edit distance between `a` and `b` when it does not exceed `max`.
///
/// The length difference is a lower bound on the distance, and the DP is abandoned as soon as a
/// whole row exceeds `max`.
pub fn distance_within(a: &str, b: &str, max: usize) -> Option<usize> {
	let a_len = a.chars().count();
	let b_len = b.chars().count();

	if a_len.abs_diff(b_len) > max {
		return None;
	}

	let mut row: Vec<usize> = (0..=b_len).collect();

	for (i, ac) in a.chars().enumerate() {
		let mut diagonal = row[0];

		row[0] = i + 1;

		let mut min_row = row[0];

		for (j, bc) in b.chars().enumerate() {
			let above = row[j + 1];
			let cost = usize::from(ac != bc);

			row[j + 1] = (above + 1).min(row[j] + 1).min(diagonal + cost);
			diagonal = above;
			min_row = min_row.min(row[j + 1]);
		}

		if min_row > max {
			return None;
		}
	}

	Some(row[b_len]).filter(|distance| *distance <= max)
}
