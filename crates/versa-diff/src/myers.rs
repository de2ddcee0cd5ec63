//! Myers shortest-edit-script diff.
//!
//! Computes a minimal sequence of [`Edit`]s turning `a` into `b` in
//! O((N+M)·D) time. The frontier of every round is kept so the path can
//! be recovered by backtracking; each saved frontier only covers the
//! diagonals that round could have reached, so the trace grows with D²
//! rather than D·(N+M).

/// Kind of a single edit step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditKind {
    /// `a[old_pos] == b[new_pos]`
    Equal,
    /// `b[new_pos]` is inserted before `a[old_pos]`
    Insert,
    /// `a[old_pos]` is removed
    Delete,
}

/// One step of an edit script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edit {
    pub kind: EditKind,
    pub old_pos: usize,
    pub new_pos: usize,
}

impl Edit {
    fn new(kind: EditKind, old_pos: isize, new_pos: isize) -> Self {
        Self {
            kind,
            old_pos: old_pos as usize,
            new_pos: new_pos as usize,
        }
    }
}

/// Saved frontier for one edit distance `d`: `values[i]` is the furthest x
/// on diagonal `lo + i`.
struct Frontier {
    lo: isize,
    values: Vec<isize>,
}

impl Frontier {
    fn get(&self, k: isize) -> isize {
        let idx = k - self.lo;
        if idx < 0 {
            return 0;
        }
        self.values.get(idx as usize).copied().unwrap_or(0)
    }
}

/// Compute the minimal edit script from `a` to `b`, in forward order.
pub fn diff<T: PartialEq>(a: &[T], b: &[T]) -> Vec<Edit> {
    let n = a.len() as isize;
    let m = b.len() as isize;
    let max = n + m;
    let offset = max + 1;

    let mut v = vec![0isize; (2 * max + 3) as usize];
    let mut trace: Vec<Frontier> = Vec::new();

    for d in 0..=max {
        // Round d reads diagonals -(d+1)..=d+1 of the previous frontier.
        let lo = -(d + 1);
        let start = (offset + lo) as usize;
        let end = (offset + d + 1) as usize;
        trace.push(Frontier {
            lo,
            values: v[start..=end].to_vec(),
        });

        let mut k = -d;
        while k <= d {
            let idx = (offset + k) as usize;
            let mut x = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
                v[idx + 1]
            } else {
                v[idx - 1] + 1
            };
            let mut y = x - k;

            while x < n && y < m && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }

            v[idx] = x;

            if x >= n && y >= m {
                return backtrack(n, m, &trace);
            }
            k += 2;
        }
    }

    Vec::new()
}

fn backtrack(n: isize, m: isize, trace: &[Frontier]) -> Vec<Edit> {
    let mut x = n;
    let mut y = m;
    let mut edits = Vec::with_capacity((n + m) as usize);

    for (d, frontier) in trace.iter().enumerate().rev() {
        let d = d as isize;
        let k = x - y;

        let prev_k = if k == -d || (k != d && frontier.get(k - 1) < frontier.get(k + 1)) {
            k + 1
        } else {
            k - 1
        };

        let prev_x = frontier.get(prev_k);
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            edits.push(Edit::new(EditKind::Equal, x - 1, y - 1));
            x -= 1;
            y -= 1;
        }

        if d > 0 {
            if x == prev_x {
                edits.push(Edit::new(EditKind::Insert, prev_x, prev_y));
            } else {
                edits.push(Edit::new(EditKind::Delete, prev_x, prev_y));
            }
        }

        x = prev_x;
        y = prev_y;
    }

    edits.reverse();
    edits
}

/// Number of Insert and Delete steps in a script.
pub fn edit_distance(edits: &[Edit]) -> usize {
    edits.iter().filter(|e| e.kind != EditKind::Equal).count()
}
