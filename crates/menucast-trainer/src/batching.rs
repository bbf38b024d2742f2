use std::ops::Range;

/// Split `0..num_nodes` into consecutive batches of `batch_size` nodes.
///
/// Batches come back in index order; the last one holds the remainder.
/// A zero `batch_size` is treated as one.
pub fn node_batches(num_nodes: usize, batch_size: usize) -> Vec<Range<usize>> {
    let size = batch_size.max(1);
    (0..num_nodes)
        .step_by(size)
        .map(|start| start..(start + size).min(num_nodes))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_batch_holds_remainder() {
        let batches = node_batches(10, 4);
        let sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![4, 4, 2]);

        let covered: Vec<usize> = batches.into_iter().flatten().collect();
        assert_eq!(covered, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_batch_larger_than_node_set() {
        assert_eq!(node_batches(3, 32), vec![0..3]);
    }

    #[test]
    fn test_exact_multiple() {
        assert_eq!(node_batches(8, 4), vec![0..4, 4..8]);
    }

    #[test]
    fn test_no_nodes() {
        assert!(node_batches(0, 4).is_empty());
    }
}
