//! Myers O(N·D) shortest edit script over lines.
//!
//! Line equality is pre-screened with FNV-1a 32-bit hashes; the full
//! string comparison only runs when hashes match, so collisions cannot
//! produce a wrong script. Common prefix and suffix are trimmed before
//! the search, which keeps the trace small for the typical
//! few-lines-changed case.

/// One entry of the full edit script. Line numbers are 1-indexed and
/// refer to the pre-state (`old_line`) or post-state (`new_line`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptLine {
    Equal {
        old_line: u32,
        new_line: u32,
        text: String,
    },
    Add {
        new_line: u32,
        text: String,
    },
    Remove {
        old_line: u32,
        text: String,
    },
}

/// FNV-1a 32-bit over the line bytes.
fn fnv1a32(bytes: &[u8]) -> u32 {
    const FNV_OFFSET: u32 = 0x811c_9dc5;
    const FNV_PRIME: u32 = 0x0100_0193;
    let mut hash = FNV_OFFSET;
    for b in bytes {
        hash ^= *b as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Compute the full edit script between two snapshots, or `None` when the
/// edit distance exceeds `max_d`.
pub fn edit_script(old: &str, new: &str, max_d: usize) -> Option<Vec<ScriptLine>> {
    let a: Vec<&str> = crate::lines_of(old);
    let b: Vec<&str> = crate::lines_of(new);
    let ha: Vec<u32> = a.iter().map(|l| fnv1a32(l.as_bytes())).collect();
    let hb: Vec<u32> = b.iter().map(|l| fnv1a32(l.as_bytes())).collect();

    let eq = |x: usize, y: usize| ha[x] == hb[y] && a[x] == b[y];

    // Trim the common prefix and suffix.
    let mut prefix = 0usize;
    while prefix < a.len() && prefix < b.len() && eq(prefix, prefix) {
        prefix += 1;
    }
    let mut suffix = 0usize;
    while suffix < a.len() - prefix
        && suffix < b.len() - prefix
        && eq(a.len() - 1 - suffix, b.len() - 1 - suffix)
    {
        suffix += 1;
    }

    let mid_a = &a[prefix..a.len() - suffix];
    let mid_b = &b[prefix..b.len() - suffix];
    let mid_ha = &ha[prefix..a.len() - suffix];
    let mid_hb = &hb[prefix..b.len() - suffix];

    let moves = myers_moves(mid_a, mid_b, mid_ha, mid_hb, max_d)?;

    let mut script = Vec::with_capacity(a.len() + b.len());
    for i in 0..prefix {
        script.push(ScriptLine::Equal {
            old_line: i as u32 + 1,
            new_line: i as u32 + 1,
            text: a[i].to_string(),
        });
    }
    for mv in moves {
        match mv {
            Move::Equal(x, y) => script.push(ScriptLine::Equal {
                old_line: (prefix + x) as u32 + 1,
                new_line: (prefix + y) as u32 + 1,
                text: mid_a[x].to_string(),
            }),
            Move::Remove(x) => script.push(ScriptLine::Remove {
                old_line: (prefix + x) as u32 + 1,
                text: mid_a[x].to_string(),
            }),
            Move::Add(y) => script.push(ScriptLine::Add {
                new_line: (prefix + y) as u32 + 1,
                text: mid_b[y].to_string(),
            }),
        }
    }
    for i in 0..suffix {
        let old_line = (a.len() - suffix + i) as u32 + 1;
        let new_line = (b.len() - suffix + i) as u32 + 1;
        script.push(ScriptLine::Equal {
            old_line,
            new_line,
            text: a[a.len() - suffix + i].to_string(),
        });
    }
    Some(script)
}

/// Middle-section moves, 0-indexed into the trimmed slices.
#[derive(Debug, Clone, Copy)]
enum Move {
    Equal(usize, usize),
    Remove(usize),
    Add(usize),
}

/// Greedy forward Myers with a banded trace for backtracking. Returns
/// `None` once `d` would exceed `max_d`.
fn myers_moves(
    a: &[&str],
    b: &[&str],
    ha: &[u32],
    hb: &[u32],
    max_d: usize,
) -> Option<Vec<Move>> {
    let n = a.len();
    let m = b.len();
    if n == 0 && m == 0 {
        return Some(Vec::new());
    }

    let eq = |x: usize, y: usize| ha[x] == hb[y] && a[x] == b[y];

    let max = (n + m).min(max_d);
    let offset = max as i64;
    let mut v = vec![0i64; 2 * max + 1];
    // trace[d] holds the band v[-d..=d] as it stood before step d.
    let mut trace: Vec<Vec<i64>> = Vec::new();

    for d in 0..=(max as i64) {
        let lo = (offset - d) as usize;
        let hi = (offset + d) as usize;
        trace.push(v[lo..=hi].to_vec());

        let mut k = -d;
        while k <= d {
            let mut x = if k == -d || (k != d && v[(k - 1 + offset) as usize] < v[(k + 1 + offset) as usize])
            {
                v[(k + 1 + offset) as usize]
            } else {
                v[(k - 1 + offset) as usize] + 1
            };
            let mut y = x - k;
            while (x as usize) < n && (y as usize) < m && eq(x as usize, y as usize) {
                x += 1;
                y += 1;
            }
            v[(k + offset) as usize] = x;

            if x as usize >= n && y as usize >= m {
                return Some(backtrack(&trace, n, m));
            }
            k += 2;
        }
    }
    None
}

/// Walk the trace back from (n, m) to (0, 0) and emit moves in order.
fn backtrack(trace: &[Vec<i64>], n: usize, m: usize) -> Vec<Move> {
    let mut moves: Vec<Move> = Vec::new();
    let mut x = n as i64;
    let mut y = m as i64;

    for (d, band) in trace.iter().enumerate().rev() {
        let d = d as i64;
        // band[i] corresponds to diagonal k = i - d.
        let at = |k: i64| band[(k + d) as usize];

        if d == 0 {
            // Only the leading snake remains; x == y here by construction.
            while x > 0 && y > 0 {
                moves.push(Move::Equal((x - 1) as usize, (y - 1) as usize));
                x -= 1;
                y -= 1;
            }
            break;
        }

        let k = x - y;
        let prev_k = if k == -d || (k != d && at(k - 1) < at(k + 1)) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = at(prev_k);
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            moves.push(Move::Equal((x - 1) as usize, (y - 1) as usize));
            x -= 1;
            y -= 1;
        }
        if d > 0 {
            if x == prev_x {
                moves.push(Move::Add((y - 1) as usize));
            } else {
                moves.push(Move::Remove((x - 1) as usize));
            }
        }
        x = prev_x;
        y = prev_y;
    }

    moves.reverse();
    moves
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replay a script against the old text and compare with the new one.
    fn apply(script: &[ScriptLine]) -> (String, String) {
        let mut old = Vec::new();
        let mut new = Vec::new();
        for line in script {
            match line {
                ScriptLine::Equal { text, .. } => {
                    old.push(text.clone());
                    new.push(text.clone());
                }
                ScriptLine::Remove { text, .. } => old.push(text.clone()),
                ScriptLine::Add { text, .. } => new.push(text.clone()),
            }
        }
        (old.join("\n"), new.join("\n"))
    }

    #[test]
    fn script_reconstructs_both_sides() {
        let cases = [
            ("a\nb\nc", "a\nx\nc"),
            ("", "fresh\nfile"),
            ("gone", ""),
            ("a\nb\nc\nd", "c\nd\na\nb"),
            ("same\nsame\nsame", "same\nsame\nsame"),
            ("x\ny", "x\nmid\ny"),
        ];
        for (old, new) in cases {
            let script = edit_script(old, new, 8_000).unwrap();
            let (old_back, new_back) = apply(&script);
            assert_eq!(old_back, old, "old mismatch for {old:?} -> {new:?}");
            assert_eq!(new_back, new, "new mismatch for {old:?} -> {new:?}");
        }
    }

    #[test]
    fn line_numbers_are_one_indexed_and_monotonic() {
        let script = edit_script("a\nb\nc\nd\ne\nf", "a\nb\nX\nd\ne\nf", 8_000).unwrap();
        let mut last_old = 0;
        let mut last_new = 0;
        for line in &script {
            match line {
                ScriptLine::Equal { old_line, new_line, .. } => {
                    assert!(*old_line > last_old && *new_line > last_new);
                    last_old = *old_line;
                    last_new = *new_line;
                }
                ScriptLine::Remove { old_line, .. } => {
                    assert!(*old_line > last_old);
                    last_old = *old_line;
                }
                ScriptLine::Add { new_line, .. } => {
                    assert!(*new_line > last_new);
                    last_new = *new_line;
                }
            }
        }
    }

    #[test]
    fn exceeding_the_limit_returns_none() {
        let old: String = (0..50).map(|i| format!("a{i}\n")).collect();
        let new: String = (0..50).map(|i| format!("b{i}\n")).collect();
        assert!(edit_script(&old, &new, 8).is_none());
    }

    #[test]
    fn colliding_hashes_still_compare_content() {
        // Equal hashes with different text cannot be constructed cheaply
        // for FNV, but unequal text with equal-by-hash prefilter falls
        // through to the string comparison either way; a sanity pass over
        // near-identical lines covers the path.
        let script = edit_script("aa\nab", "aa\nba", 100).unwrap();
        let (o, n) = apply(&script);
        assert_eq!(o, "aa\nab");
        assert_eq!(n, "aa\nba");
    }
}
