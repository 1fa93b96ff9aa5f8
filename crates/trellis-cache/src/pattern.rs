//! Glob matching for pattern-based invalidation.
//!
//! Supports `*` (any run of characters, including none) and `?` (exactly one
//! character). Every other character matches itself. Matching is over
//! `char`s, so multi-byte keys behave as expected.

/// Returns `true` if `candidate` matches the glob `pattern` in full.
#[must_use]
pub fn glob_match(pattern: &str, candidate: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    let p: Vec<char> = pattern.chars().collect();
    let c: Vec<char> = candidate.chars().collect();
    let mut pi = 0usize;
    let mut ci = 0usize;
    let mut star: Option<usize> = None;
    let mut match_ci = 0usize;

    while ci < c.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == c[ci]) {
            pi += 1;
            ci += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            pi += 1;
            match_ci = ci;
        } else if let Some(star_idx) = star {
            // Backtrack: let the last `*` swallow one more character.
            pi = star_idx + 1;
            match_ci += 1;
            ci = match_ci;
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}
