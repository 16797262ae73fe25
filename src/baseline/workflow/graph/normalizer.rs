// SPDX-License-Identifier: MIT

//! Sequential lane normalization
//!
//! Sequential rules share one lane. Each one is made to wait for the previous
//! lane member in dependency order, which turns the lane into a total order
//! that never contradicts a declared dependency.

/// Add lane edges to `dependencies`, walking `order` (a topological order of
/// `dependencies`). Returns the combined edge lists.
pub fn chain_sequential_lane(
    dependencies: &[Vec<usize>],
    order: &[usize],
    sequential: &[bool],
) -> Vec<Vec<usize>> {
    let mut waits_for = dependencies.to_vec();
    let mut previous: Option<usize> = None;

    for &node in order {
        if !sequential[node] {
            continue;
        }
        if let Some(prev) = previous {
            if !waits_for[node].contains(&prev) {
                waits_for[node].push(prev);
            }
        }
        previous = Some(node);
    }

    waits_for
}
