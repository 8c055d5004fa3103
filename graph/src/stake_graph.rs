/*
 * SPDX-FileCopyrightText: 2026 The CyberGraph Authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! A stake-weighted link graph in dual CSR form.
//!
//! Users hold integer stakes and author *cyberlinks*, directed edges
//! between content nodes. The same link multiset is stored twice: an
//! outbound view keyed by source node and an inbound view keyed by target
//! node. Within each target's inbound slice, links are kept sorted by
//! source, so that multi-edges sharing a source form contiguous runs; the
//! compression stage of the ranking engine relies on this.

use crate::GraphError;
use crate::utils::exclusive_prefix_sum;

/// One CSR view of the link multiset.
///
/// For the outbound view, the endpoint of a link is its target; for the
/// inbound view, its source. The `author` array is parallel to the
/// endpoint array.
#[derive(Debug, Clone)]
pub struct Adjacency {
    start: Box<[usize]>,
    count: Box<[u32]>,
    node: Box<[usize]>,
    author: Box<[usize]>,
}

impl Adjacency {
    /// Creates a view from its parts.
    ///
    /// # Safety
    ///
    /// `start` must be the exclusive prefix sum of `count`, the counts must
    /// sum to the length of the parallel `node` and `author` arrays, and
    /// all indices must be in range for the graph the view belongs to.
    pub unsafe fn from_parts(
        start: Box<[usize]>,
        count: Box<[u32]>,
        node: Box<[usize]>,
        author: Box<[usize]>,
    ) -> Self {
        Self {
            start,
            count,
            node,
            author,
        }
    }

    /// Returns the number of nodes of the view.
    pub fn num_nodes(&self) -> usize {
        self.count.len()
    }

    /// Returns the number of links of the view.
    pub fn num_links(&self) -> u64 {
        self.node.len() as u64
    }

    /// Returns the start of the slice of the given node in the parallel
    /// link arrays.
    #[inline(always)]
    pub fn start(&self, node: usize) -> usize {
        self.start[node]
    }

    /// Returns the number of links in the slice of the given node.
    #[inline(always)]
    pub fn count(&self, node: usize) -> usize {
        self.count[node] as usize
    }

    /// Returns the endpoints of the links of the given node (targets for
    /// the outbound view, sources for the inbound view).
    #[inline(always)]
    pub fn endpoints(&self, node: usize) -> &[usize] {
        let start = self.start[node];
        &self.node[start..start + self.count[node] as usize]
    }

    /// Returns the authors of the links of the given node, parallel to
    /// [`endpoints`](Self::endpoints).
    #[inline(always)]
    pub fn authors(&self, node: usize) -> &[usize] {
        let start = self.start[node];
        &self.author[start..start + self.count[node] as usize]
    }

    /// Returns the per-node link counts.
    pub fn counts(&self) -> &[u32] {
        &self.count
    }
}

/// A stake-weighted link graph: user stakes plus the link multiset in dual
/// CSR form.
///
/// The checked constructors validate the structural invariants the ranking
/// engine relies on; see [`new`](Self::new). The cheapest way to build a
/// graph from scratch is [`from_links`](Self::from_links).
#[derive(Debug, Clone)]
pub struct StakeGraph {
    stakes: Box<[u64]>,
    outbound: Adjacency,
    inbound: Adjacency,
}

impl StakeGraph {
    /// Creates a graph from caller-supplied parallel arrays, validating
    /// every structural invariant.
    ///
    /// The outbound view is keyed by source node (`out_target[e]`,
    /// `out_author[e]`), the inbound view by target node (`in_source[e]`,
    /// `in_author[e]`). Both views must describe the same link multiset;
    /// this constructor checks that the sizes agree, that all indices are
    /// in range, and that each inbound slice is sorted by source. It does
    /// *not* compare the two multisets link by link: that the views agree
    /// is a precondition on the caller.
    pub fn new(
        stakes: Vec<u64>,
        out_count: Vec<u32>,
        out_target: Vec<usize>,
        out_author: Vec<usize>,
        in_count: Vec<u32>,
        in_source: Vec<usize>,
        in_author: Vec<usize>,
    ) -> Result<Self, GraphError> {
        let num_nodes = out_count.len();
        let num_users = stakes.len();
        let num_links = out_target.len();

        if in_count.len() != num_nodes {
            return Err(GraphError::LengthMismatch {
                array: "in_count",
                got: in_count.len(),
                expected: num_nodes,
            });
        }
        if out_author.len() != num_links {
            return Err(GraphError::LengthMismatch {
                array: "out_author",
                got: out_author.len(),
                expected: num_links,
            });
        }
        if in_source.len() != num_links {
            return Err(GraphError::LengthMismatch {
                array: "in_source",
                got: in_source.len(),
                expected: num_links,
            });
        }
        if in_author.len() != num_links {
            return Err(GraphError::LengthMismatch {
                array: "in_author",
                got: in_author.len(),
                expected: num_links,
            });
        }

        let (out_start, out_total) = exclusive_prefix_sum(&out_count);
        if out_total != num_links as u64 {
            return Err(GraphError::CountMismatch {
                view: "outbound",
                got: out_total,
                expected: num_links as u64,
            });
        }
        let (in_start, in_total) = exclusive_prefix_sum(&in_count);
        if in_total != num_links as u64 {
            return Err(GraphError::CountMismatch {
                view: "inbound",
                got: in_total,
                expected: num_links as u64,
            });
        }

        check_range("out_target", &out_target, num_nodes)?;
        check_range("in_source", &in_source, num_nodes)?;
        check_range("out_author", &out_author, num_users)?;
        check_range("in_author", &in_author, num_users)?;

        // Inbound slices must be sorted by source (non-decreasing).
        for node in 0..num_nodes {
            let start = in_start[node];
            let slice = &in_source[start..start + in_count[node] as usize];
            for offset in 1..slice.len() {
                if slice[offset] < slice[offset - 1] {
                    return Err(GraphError::UnsortedInbound { node, offset });
                }
            }
        }

        Ok(unsafe {
            Self::from_parts(
                stakes.into_boxed_slice(),
                Adjacency::from_parts(
                    out_start,
                    out_count.into_boxed_slice(),
                    out_target.into_boxed_slice(),
                    out_author.into_boxed_slice(),
                ),
                Adjacency::from_parts(
                    in_start,
                    in_count.into_boxed_slice(),
                    in_source.into_boxed_slice(),
                    in_author.into_boxed_slice(),
                ),
            )
        })
    }

    /// Creates a graph from its parts.
    ///
    /// # Safety
    ///
    /// The two views must describe the same link multiset over
    /// `outbound.num_nodes()` nodes and `stakes.len()` users, with every
    /// invariant checked by [`new`](Self::new) holding.
    pub unsafe fn from_parts(stakes: Box<[u64]>, outbound: Adjacency, inbound: Adjacency) -> Self {
        Self {
            stakes,
            outbound,
            inbound,
        }
    }

    /// Builds a graph from a list of `(source, target, author)` triples.
    ///
    /// Both CSR views are derived from the triples; inbound slices are
    /// stable-sorted by source, establishing the ordering invariant. The
    /// triples may be in any order and may contain duplicates (multi-edges
    /// are meaningful: distinct users may author the same link).
    ///
    /// # Examples
    ///
    /// ```
    /// use cybergraph::StakeGraph;
    ///
    /// # fn main() -> Result<(), cybergraph::GraphError> {
    /// // Two users; user 1 links node 0 to nodes 1 and 2.
    /// let g = StakeGraph::from_links(3, vec![3, 7], [(0, 1, 1), (0, 2, 1)])?;
    /// assert_eq!(g.num_nodes(), 3);
    /// assert_eq!(g.num_links(), 2);
    /// assert_eq!(g.outbound().endpoints(0), &[1, 2]);
    /// assert_eq!(g.inbound().endpoints(1), &[0]);
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_links(
        num_nodes: usize,
        stakes: Vec<u64>,
        links: impl IntoIterator<Item = (usize, usize, usize)>,
    ) -> Result<Self, GraphError> {
        let num_users = stakes.len();
        let links = links.into_iter().collect::<Vec<_>>();

        for (index, &(source, target, author)) in links.iter().enumerate() {
            if source >= num_nodes {
                return Err(GraphError::IndexOutOfRange {
                    array: "source",
                    index,
                    value: source,
                    bound: num_nodes,
                });
            }
            if target >= num_nodes {
                return Err(GraphError::IndexOutOfRange {
                    array: "target",
                    index,
                    value: target,
                    bound: num_nodes,
                });
            }
            if author >= num_users {
                return Err(GraphError::IndexOutOfRange {
                    array: "author",
                    index,
                    value: author,
                    bound: num_users,
                });
            }
        }

        let num_links = links.len();

        let mut out_count = vec![0_u32; num_nodes];
        let mut in_count = vec![0_u32; num_nodes];
        for &(source, target, _) in &links {
            out_count[source] += 1;
            in_count[target] += 1;
        }

        let (out_start, _) = exclusive_prefix_sum(&out_count);
        let mut cursor = out_start.to_vec();
        let mut out_target = vec![0_usize; num_links];
        let mut out_author = vec![0_usize; num_links];
        for &(source, target, author) in &links {
            let e = cursor[source];
            out_target[e] = target;
            out_author[e] = author;
            cursor[source] = e + 1;
        }

        // Stable sort by (target, source) groups each target's links into
        // source-sorted runs.
        let mut sorted = links;
        sorted.sort_by_key(|&(source, target, _)| (target, source));
        let (in_start, _) = exclusive_prefix_sum(&in_count);
        let mut in_source = vec![0_usize; num_links];
        let mut in_author = vec![0_usize; num_links];
        for (e, &(source, _, author)) in sorted.iter().enumerate() {
            in_source[e] = source;
            in_author[e] = author;
        }

        Ok(unsafe {
            Self::from_parts(
                stakes.into_boxed_slice(),
                Adjacency::from_parts(
                    out_start,
                    out_count.into_boxed_slice(),
                    out_target.into_boxed_slice(),
                    out_author.into_boxed_slice(),
                ),
                Adjacency::from_parts(
                    in_start,
                    in_count.into_boxed_slice(),
                    in_source.into_boxed_slice(),
                    in_author.into_boxed_slice(),
                ),
            )
        })
    }

    /// Returns the number of content nodes.
    pub fn num_nodes(&self) -> usize {
        self.outbound.num_nodes()
    }

    /// Returns the number of users.
    pub fn num_users(&self) -> usize {
        self.stakes.len()
    }

    /// Returns the number of links.
    pub fn num_links(&self) -> u64 {
        self.outbound.num_links()
    }

    /// Returns the user stakes.
    pub fn stakes(&self) -> &[u64] {
        &self.stakes
    }

    /// Returns the outbound view, keyed by source node.
    pub fn outbound(&self) -> &Adjacency {
        &self.outbound
    }

    /// Returns the inbound view, keyed by target node.
    pub fn inbound(&self) -> &Adjacency {
        &self.inbound
    }
}

fn check_range(
    array: &'static str,
    values: &[usize],
    bound: usize,
) -> Result<(), GraphError> {
    for (index, &value) in values.iter().enumerate() {
        if value >= bound {
            return Err(GraphError::IndexOutOfRange {
                array,
                index,
                value,
                bound,
            });
        }
    }
    Ok(())
}
