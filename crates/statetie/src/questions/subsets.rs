//! Lexicographic enumeration of fixed-size index combinations.

/// Advance `indices` (an increasing `r`-combination of `0..n`) to its
/// lexicographic successor.
///
/// Finds the rightmost index not yet at its maximum `n - r + i`, increments it,
/// and resets every index to its right to consecutive values. Returns `false`
/// (leaving `indices` unchanged) when `indices` is already the last combination.
pub fn next_subset(indices: &mut [u32], n: u32) -> bool {
    let r = indices.len();
    if r == 0 || r as u32 > n {
        return false;
    }
    let base = n - r as u32;
    let Some(i) = (0..r).rev().find(|&i| indices[i] != base + i as u32) else {
        return false;
    };
    indices[i] += 1;
    for j in i + 1..r {
        indices[j] = indices[j - 1] + 1;
    }
    true
}

/// Binomial coefficient `C(n, r)`, or `None` on overflow.
pub fn n_choose_r(n: u64, r: u64) -> Option<u64> {
    if r > n {
        return Some(0);
    }
    let r = r.min(n - r);
    let mut acc: u64 = 1;
    for i in 0..r {
        // acc * (n - i) / (i + 1) stays integral at every step.
        acc = acc.checked_mul(n - i)? / (i + 1);
    }
    Some(acc)
}

/// Iterator over all `r`-combinations of `0..n` in lexicographic order.
#[derive(Clone, Debug)]
pub struct Combinations {
    n: u32,
    current: Vec<u32>,
    state: IterState,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum IterState {
    Fresh,
    Running,
    Done,
}

impl Combinations {
    pub fn new(n: u32, r: u32) -> Self {
        let state = if r == 0 || r > n { IterState::Done } else { IterState::Fresh };
        Self { n, current: (0..r).collect(), state }
    }
}

impl Iterator for Combinations {
    type Item = Vec<u32>;

    fn next(&mut self) -> Option<Vec<u32>> {
        match self.state {
            IterState::Done => None,
            IterState::Fresh => {
                self.state = IterState::Running;
                Some(self.current.clone())
            }
            IterState::Running => {
                if next_subset(&mut self.current, self.n) {
                    Some(self.current.clone())
                } else {
                    self.state = IterState::Done;
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_five_choose_two_in_order() {
        let all: Vec<Vec<u32>> = Combinations::new(5, 2).collect();
        assert_eq!(all.len(), 10);
        assert!(all.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(all.first().unwrap(), &vec![0, 1]);
        assert_eq!(all.last().unwrap(), &vec![3, 4]);

        let mut last = vec![3, 4];
        assert!(!next_subset(&mut last, 5));
        assert_eq!(last, vec![3, 4]);
    }

    #[test]
    fn test_successor_resets_tail() {
        let mut s = vec![0, 3, 4];
        assert!(next_subset(&mut s, 5));
        assert_eq!(s, vec![1, 2, 3]);
    }

    #[rstest]
    #[case(5, 2, 10)]
    #[case(6, 3, 20)]
    #[case(4, 4, 1)]
    #[case(3, 1, 3)]
    #[case(3, 0, 0)]
    #[case(2, 3, 0)]
    fn test_count_matches_binomial(#[case] n: u32, #[case] r: u32, #[case] expected: usize) {
        assert_eq!(Combinations::new(n, r).count(), expected);
        if r > 0 {
            assert_eq!(n_choose_r(n as u64, r as u64), Some(expected as u64));
        }
    }

    #[test]
    fn test_n_choose_r_overflow() {
        assert_eq!(n_choose_r(60, 30), Some(118_264_581_564_861_424));
        assert_eq!(n_choose_r(200, 100), None);
        assert_eq!(n_choose_r(10, 0), Some(1));
    }
}
