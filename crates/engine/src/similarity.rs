//! LIG3 string similarity.
//!
//! Edit-distance-normalized metric in [0,1]: with `C` the Levenshtein
//! distance and `I = len(longer) - C` the positions in common, the score is
//! `2I / (2I + C)`. Identical strings score 1, structurally unrelated
//! strings score 0.

/// Levenshtein edit distance over `char`s, two-row dynamic programming.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let sub = prev[j] + usize::from(ca != cb);
            cur[j + 1] = sub.min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    prev[b.len()]
}

/// LIG3 similarity between two sequences.
pub fn lig3(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }

    // Orient so that b is the longest
    let (a, b) = if a.chars().count() > b.chars().count() { (b, a) } else { (a, b) };

    let c = levenshtein(a, b);
    let i = b.chars().count() - c;

    (2 * i) as f64 / (2 * i + c) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_one() {
        assert_eq!(lig3("Smith", "Smith"), 1.0);
        assert_eq!(lig3("", ""), 1.0);
    }

    #[test]
    fn unrelated_strings_score_zero() {
        assert_eq!(lig3("abc", "xyz"), 0.0);
        assert_eq!(lig3("", "abc"), 0.0);
    }

    #[test]
    fn close_names_score_high() {
        // lev(Jon, John) = 1, I = 4 - 1 = 3, 6/7
        let s = lig3("John", "Jon");
        assert!((s - 6.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn bounds_hold() {
        let pairs = [
            ("John", "Jon"),
            ("Smith", "Smyth"),
            ("a", "aaaa"),
            ("Glavin", "Glawyn"),
            ("", "x"),
            ("kitten", "sitting"),
        ];
        for (a, b) in pairs {
            let s = lig3(a, b);
            assert!((0.0..=1.0).contains(&s), "lig3({a:?},{b:?}) = {s} out of bounds");
        }
    }

    #[test]
    fn symmetric() {
        let pairs = [("John", "Jon"), ("Smith", "Smyth"), ("a", "aaaa"), ("", "x")];
        for (a, b) in pairs {
            assert_eq!(lig3(a, b), lig3(b, a), "lig3 not symmetric for {a:?}/{b:?}");
        }
    }

    #[test]
    fn multibyte_input_counted_by_chars() {
        // lev(Jose, José) = 1 over chars, not bytes
        let s = lig3("Jose", "José");
        assert!((s - 6.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn levenshtein_reference_cases() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("flaw", "lawn"), 2);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }
}
