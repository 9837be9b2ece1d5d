//! Table-driven Hilbert curve over quantized integer coordinates.

/// Position along the curve of each quadrant (`xbit + 2*ybit`), per curve state.
const ORDER: [[u8; 4]; 8] = [
    [1, 2, 0, 3], [0, 3, 1, 2], [2, 1, 3, 0], [3, 0, 2, 1],
    [3, 2, 0, 1], [0, 1, 3, 2], [2, 3, 1, 0], [1, 0, 2, 3],
];

/// Curve state to descend into for each quadrant, per curve state.
const SUB_CELL: [[u8; 4]; 8] = [
    [0, 0, 4, 7], [5, 6, 1, 1], [2, 2, 5, 6], [4, 7, 3, 3],
    [3, 4, 0, 4], [1, 5, 2, 5], [6, 1, 6, 2], [7, 3, 7, 0],
];

/// Hilbert index of `(x, y)` using the lowest `bits` bits of each coordinate, MSB first.
pub fn hilbert_hash(x: u32, y: u32, bits: u32) -> u64 {
    debug_assert!(bits <= 32, "bits must be at most 32");
    let mut cell = 0usize;
    let mut hash = 0u64;
    for level in (0..bits).rev() {
        let id = ((x >> level) & 1) as usize + 2 * ((y >> level) & 1) as usize;
        hash = (hash << 2) | ORDER[cell][id] as u64;
        cell = SUB_CELL[cell][id] as usize;
    }
    hash
}

/// Permutation that visits the points in Hilbert order; ties keep input order.
pub(crate) fn hilbert_order(xs: &[u32], ys: &[u32], bits: u32) -> Vec<usize> {
    let mut keyed = xs.iter().zip(ys)
        .enumerate()
        .map(|(i, (&x, &y))| (hilbert_hash(x, y, bits), i))
        .collect::<Vec<_>>();
    keyed.sort_unstable();
    keyed.into_iter().map(|(_, i)| i).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_cell_gets_a_distinct_index() {
        for bits in 1..=5 {
            let n = 1u32 << bits;
            let mut hashes = (0..n).flat_map(|x| (0..n).map(move |y| hilbert_hash(x, y, bits))).collect::<Vec<_>>();
            hashes.sort_unstable();
            assert_eq!(hashes, (0..(n * n) as u64).collect::<Vec<_>>());
        }
    }

    #[test]
    fn consecutive_indices_are_neighbouring_cells() {
        let bits = 4;
        let n = 1u32 << bits;
        let mut cells = vec![(0u32, 0u32); (n * n) as usize];
        for x in 0..n {
            for y in 0..n {
                cells[hilbert_hash(x, y, bits) as usize] = (x, y);
            }
        }
        for pair in cells.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            assert_eq!(a.0.abs_diff(b.0) + a.1.abs_diff(b.1), 1, "{a:?} -> {b:?}");
        }
        assert_eq!(cells[0], (0, n - 1));
        assert_eq!(cells[cells.len() - 1], (n - 1, n - 1));
    }

    #[test]
    fn full_width_hash_uses_all_64_bits() {
        assert_eq!(hilbert_hash(0, u32::MAX, 32), 0);
        assert!(hilbert_hash(u32::MAX, u32::MAX, 32) > u32::MAX as u64);
    }

    #[test]
    fn order_is_sorted_and_groups_duplicates() {
        let xs = [5, 1, 5, 9, 1];
        let ys = [5, 2, 5, 0, 2];
        let order = hilbert_order(&xs, &ys, 4);
        let hashes = order.iter().map(|&i| hilbert_hash(xs[i], ys[i], 4)).collect::<Vec<_>>();
        assert!(hashes.windows(2).all(|w| w[0] <= w[1]));
        let pos = |i: usize| order.iter().position(|&j| j == i).unwrap();
        assert_eq!(pos(0).abs_diff(pos(2)), 1);
        assert_eq!(pos(1).abs_diff(pos(4)), 1);
    }
}
