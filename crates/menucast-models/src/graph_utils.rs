//! Adjacency construction and normalisation.
//!
//! Adjacency matrices travel as row-major `Vec<f32>` of length `N * N` until
//! they are handed to a model as a tensor.
//!
//! ```
//! use menucast_models::graph_utils::{dense_adjacency, ring_graph};
//!
//! let graph = ring_graph(4);
//! let adj = dense_adjacency(&graph);
//! assert_eq!(adj[0 * 4 + 1], 1.0);
//! assert_eq!(adj[0 * 4 + 3], 1.0);
//! assert_eq!(adj[0 * 4 + 2], 0.0);
//! ```

use burn::tensor::{backend::Backend, Tensor, TensorData};
use menucast_core::error::{ForecastError, Result};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

/// Entity graph with edge weights.
pub type EntityGraph = UnGraph<(), f32>;

/// Check that `adjacency` is a square `n × n` matrix.
pub fn check_square(adjacency: &[f32], n: usize) -> Result<()> {
    if adjacency.len() != n * n {
        return Err(ForecastError::Shape(format!(
            "adjacency has {} entries, expected {}x{} = {}",
            adjacency.len(),
            n,
            n,
            n * n
        )));
    }
    Ok(())
}

/// Symmetric normalisation with self loops: `D^-1/2 (A + I) D^-1/2`.
///
/// Degrees are row sums of `A + I`; a node whose row sums to zero or less
/// (possible with negative weights) gets a zero row.
pub fn normalize_adjacency(adjacency: &[f32], n: usize) -> Result<Vec<f32>> {
    check_square(adjacency, n)?;

    let mut with_loops = adjacency.to_vec();
    for i in 0..n {
        with_loops[i * n + i] += 1.0;
    }

    let inv_sqrt_degree: Vec<f32> = (0..n)
        .map(|i| {
            let degree: f32 = with_loops[i * n..(i + 1) * n].iter().sum();
            if degree > 0.0 {
                degree.sqrt().recip()
            } else {
                0.0
            }
        })
        .collect();

    for i in 0..n {
        for j in 0..n {
            with_loops[i * n + j] *= inv_sqrt_degree[i] * inv_sqrt_degree[j];
        }
    }
    Ok(with_loops)
}

/// Upload a row-major `n × n` adjacency to `device`.
pub fn adjacency_tensor<B: Backend>(
    adjacency: &[f32],
    n: usize,
    device: &B::Device,
) -> Result<Tensor<B, 2>> {
    check_square(adjacency, n)?;
    Ok(Tensor::from_data(
        TensorData::new(adjacency.to_vec(), [n, n]),
        device,
    ))
}

/// Ring of `n` entities, each linked to its two neighbours.
pub fn ring_graph(n: usize) -> EntityGraph {
    let mut graph = EntityGraph::new_undirected();
    let nodes: Vec<NodeIndex> = (0..n).map(|_| graph.add_node(())).collect();
    if n > 1 {
        for i in 0..n {
            let j = (i + 1) % n;
            if graph.find_edge(nodes[i], nodes[j]).is_none() {
                graph.add_edge(nodes[i], nodes[j], 1.0);
            }
        }
    }
    graph
}

/// Dense symmetric adjacency of `graph`, node order = index order.
pub fn dense_adjacency(graph: &EntityGraph) -> Vec<f32> {
    let n = graph.node_count();
    let mut adj = vec![0.0; n * n];
    for edge in graph.edge_references() {
        let (a, b) = (edge.source().index(), edge.target().index());
        adj[a * n + b] = *edge.weight();
        adj[b * n + a] = *edge.weight();
    }
    adj
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_check_square() {
        assert!(check_square(&[0.0; 9], 3).is_ok());
        assert!(matches!(
            check_square(&[0.0; 8], 3),
            Err(ForecastError::Shape(_))
        ));
    }

    #[test]
    fn test_normalize_isolated_nodes_is_identity() {
        let norm = normalize_adjacency(&[0.0; 4], 2).unwrap();
        assert_eq!(norm, vec![1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_normalize_pair() {
        // A + I = [[1,1],[1,1]], degrees 2 -> every entry 1/2
        let norm = normalize_adjacency(&[0.0, 1.0, 1.0, 0.0], 2).unwrap();
        for v in norm {
            assert_relative_eq!(v, 0.5, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_ring_graph_degrees() {
        let graph = ring_graph(5);
        assert_eq!(graph.edge_count(), 5);
        let adj = dense_adjacency(&graph);
        for i in 0..5 {
            let degree: f32 = adj[i * 5..(i + 1) * 5].iter().sum();
            assert_eq!(degree, 2.0);
        }
    }

    #[test]
    fn test_tiny_rings() {
        assert_eq!(ring_graph(1).edge_count(), 0);
        // two nodes: the wrap-around edge duplicates the first one
        assert_eq!(ring_graph(2).edge_count(), 1);
    }
}
