use std::fmt;

use crate::database::EnrollmentDatabase;
use crate::Embedding;

pub const UNKNOWN: &str = "Unknown";

/// Outcome of matching one query face against the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prediction<'a> {
    Known(&'a str),
    Unknown,
}

impl Prediction<'_> {
    pub fn label(&self) -> &str {
        match self {
            Prediction::Known(label) => label,
            Prediction::Unknown => UNKNOWN,
        }
    }
}

impl fmt::Display for Prediction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One flag per database entry: is it within `tolerance` of the query.
pub fn matches(db: &EnrollmentDatabase, query: &Embedding, tolerance: f32) -> Vec<bool> {
    db.entries()
        .iter()
        .map(|e| e.embedding.distance(query) <= tolerance)
        .collect()
}

/// Majority vote over every entry within `tolerance`.
///
/// Ties go to the label whose first matching entry comes earliest in the
/// database.
pub fn predict<'a>(db: &'a EnrollmentDatabase, query: &Embedding, tolerance: f32) -> Prediction<'a> {
    // (label, votes) in order of first match
    let mut votes: Vec<(&'a str, usize)> = Vec::new();
    for (entry, hit) in db.entries().iter().zip(matches(db, query, tolerance)) {
        if !hit {
            continue;
        }
        match votes.iter_mut().find(|(label, _)| *label == entry.label) {
            Some((_, count)) => *count += 1,
            None => votes.push((entry.label.as_str(), 1)),
        }
    }

    let mut best: Option<(&'a str, usize)> = None;
    for (label, count) in votes {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((label, count));
        }
    }

    match best {
        Some((label, _)) => Prediction::Known(label),
        None => Prediction::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(values: &[f32]) -> Embedding {
        Embedding::from_vec(values.to_vec())
    }

    /// e1 and e2 sit near the origin, e3 far along x.
    fn alice_alice_bob() -> EnrollmentDatabase {
        let mut db = EnrollmentDatabase::new();
        db.push(e(&[0.0, 0.0]), "Alice");
        db.push(e(&[0.0, 0.2]), "Alice");
        db.push(e(&[1.0, 0.0]), "Bob");
        db
    }

    #[test]
    fn majority_wins() {
        let db = alice_alice_bob();
        assert_eq!(predict(&db, &e(&[0.0, 0.1]), 0.3), Prediction::Known("Alice"));
        assert_eq!(matches(&db, &e(&[0.0, 0.1]), 0.3), vec![true, true, false]);
    }

    #[test]
    fn no_match_is_unknown() {
        let db = alice_alice_bob();
        let p = predict(&db, &e(&[5.0, 5.0]), 0.3);
        assert_eq!(p, Prediction::Unknown);
        assert_eq!(p.to_string(), "Unknown");
    }

    #[test]
    fn empty_database_is_unknown() {
        let db = EnrollmentDatabase::new();
        assert_eq!(predict(&db, &e(&[0.0]), 100.0), Prediction::Unknown);
    }

    #[test]
    fn tie_goes_to_first_in_database_order() {
        let mut db = EnrollmentDatabase::new();
        db.push(e(&[0.0, 0.0]), "Alice");
        db.push(e(&[9.0, 9.0]), "Alice");
        db.push(e(&[0.5, 0.0]), "Bob");
        // Near e1 and e3 only: one vote each.
        let query = e(&[0.25, 0.0]);
        assert_eq!(matches(&db, &query, 0.3), vec![true, false, true]);
        assert_eq!(predict(&db, &query, 0.3), Prediction::Known("Alice"));

        let mut flipped = EnrollmentDatabase::new();
        flipped.push(e(&[0.5, 0.0]), "Bob");
        flipped.push(e(&[0.0, 0.0]), "Alice");
        assert_eq!(predict(&flipped, &query, 0.3), Prediction::Known("Bob"));
    }

    #[test]
    fn exact_copy_matches_at_zero_tolerance() {
        let db = alice_alice_bob();
        assert_eq!(predict(&db, &e(&[1.0, 0.0]), 0.0), Prediction::Known("Bob"));
    }

    #[test]
    fn later_label_can_overtake() {
        let mut db = EnrollmentDatabase::new();
        db.push(e(&[0.0]), "Alice");
        db.push(e(&[0.1]), "Bob");
        db.push(e(&[0.2]), "Bob");
        assert_eq!(predict(&db, &e(&[0.1]), 0.5), Prediction::Known("Bob"));
    }

    #[test]
    fn prediction_is_stable_and_enrolled() {
        let db = alice_alice_bob();
        for q in [[0.0, 0.1], [0.9, 0.0], [0.5, 0.0], [3.0, 3.0]] {
            let query = e(&q);
            for tolerance in [0.0, 0.1, 0.6, 2.0] {
                let first = predict(&db, &query, tolerance);
                assert_eq!(first, predict(&db, &query, tolerance));
                if let Prediction::Known(label) = first {
                    assert!(db.contains_label(label));
                }
            }
        }
    }

    #[test]
    fn mismatched_lengths_never_match() {
        let db = alice_alice_bob();
        assert_eq!(predict(&db, &e(&[0.0, 0.0, 0.0]), 10.0), Prediction::Unknown);
    }
}
