//! Walking transfer graph and its builder.
//!
//! # Data layout
//!
//! The graph uses **Compressed Sparse Row (CSR)** format for outgoing edges.
//! Given a `VertexId v`, its outgoing edges occupy the slice:
//!
//! ```text
//! edge_to[ vertex_out_start[v] .. vertex_out_start[v+1] ]
//! ```
//!
//! `edge_to` and `edge_travel_time` are sorted by source vertex and indexed
//! in parallel.  Iteration over a vertex's outgoing edges is a contiguous
//! memory scan — ideal for the backward profile sweep's inner loop.
//!
//! The first `|stops|` vertices are stops; the remaining vertices are
//! non-stop demand endpoints (zones, addresses).  The assignment engine also
//! needs the reverse adjacency (walks *into* a stop); [`TransferGraph::reversed`]
//! produces it as a second CSR graph.

use pax_core::{Time, VertexId};

// ── TransferGraph ─────────────────────────────────────────────────────────────

/// Directed weighted walking graph in CSR format.
///
/// Edge weights are walking travel times in seconds, `>= 0`.  All fields are
/// `pub(crate)`-free: construct via [`TransferGraphBuilder`], read via the
/// accessors.
#[derive(Clone, Debug, Default)]
pub struct TransferGraph {
    /// CSR row pointer.  Outgoing edges of vertex `v` are at positions
    /// `vertex_out_start[v] .. vertex_out_start[v+1]`.  Length = vertices + 1.
    vertex_out_start: Vec<u32>,
    /// Head vertex of each edge, sorted by tail vertex.
    edge_to: Vec<VertexId>,
    /// Walking travel time of each edge in seconds.
    edge_travel_time: Vec<Time>,
}

impl TransferGraph {
    pub fn num_vertices(&self) -> usize {
        self.vertex_out_start.len() - 1
    }

    pub fn num_edges(&self) -> usize {
        self.edge_to.len()
    }

    #[inline]
    pub fn is_vertex(&self, v: VertexId) -> bool {
        v.index() < self.num_vertices()
    }

    /// Out-degree of `v` (number of outgoing walking edges).
    #[inline]
    pub fn out_degree(&self, v: VertexId) -> usize {
        let start = self.vertex_out_start[v.index()] as usize;
        let end = self.vertex_out_start[v.index() + 1] as usize;
        end - start
    }

    /// Iterator over `(head, travel_time)` of all outgoing edges from `v`.
    ///
    /// This is a contiguous index range — no heap allocation.
    #[inline]
    pub fn edges_from(&self, v: VertexId) -> impl Iterator<Item = (VertexId, Time)> + '_ {
        let start = self.vertex_out_start[v.index()] as usize;
        let end = self.vertex_out_start[v.index() + 1] as usize;
        (start..end).map(move |i| (self.edge_to[i], self.edge_travel_time[i]))
    }

    /// Travel time of the edge `from -> to`, or `None` if absent.
    ///
    /// Linear scan of the out-slice; out-degrees in walking graphs are small.
    pub fn find_edge(&self, from: VertexId, to: VertexId) -> Option<Time> {
        self.edges_from(from)
            .find(|&(head, _)| head == to)
            .map(|(_, tt)| tt)
    }

    /// Build the reverse view: an edge `u -> v` becomes `v -> u` with the
    /// same travel time.
    pub fn reversed(&self) -> TransferGraph {
        let mut builder = TransferGraphBuilder::new(self.num_vertices());
        for v in 0..self.num_vertices() {
            let tail = VertexId(v as u32);
            for (head, tt) in self.edges_from(tail) {
                builder.add_edge(head, tail, tt);
            }
        }
        builder.build()
    }
}

// ── TransferGraphBuilder ──────────────────────────────────────────────────────

/// Construct a [`TransferGraph`] incrementally, then call [`build`](Self::build).
///
/// The builder accepts directed edges in any order.  `build()` sorts edges by
/// tail vertex (stable, so parallel edges keep insertion order) and
/// constructs the CSR arrays.
pub struct TransferGraphBuilder {
    num_vertices: usize,
    raw_edges: Vec<RawEdge>,
}

struct RawEdge {
    from: VertexId,
    to: VertexId,
    travel_time: Time,
}

impl TransferGraphBuilder {
    pub fn new(num_vertices: usize) -> Self {
        Self {
            num_vertices,
            raw_edges: Vec::new(),
        }
    }

    /// Add a **directed** walking edge from `from` to `to`.
    pub fn add_edge(&mut self, from: VertexId, to: VertexId, travel_time: Time) {
        debug_assert!(from.index() < self.num_vertices);
        debug_assert!(to.index() < self.num_vertices);
        debug_assert!(travel_time >= 0);
        self.raw_edges.push(RawEdge {
            from,
            to,
            travel_time,
        });
    }

    /// Convenience: add edges in **both directions** for a symmetric footpath
    /// (the common case in transit feeds).
    pub fn add_footpath(&mut self, a: VertexId, b: VertexId, travel_time: Time) {
        self.add_edge(a, b, travel_time);
        self.add_edge(b, a, travel_time);
    }

    pub fn num_edges(&self) -> usize {
        self.raw_edges.len()
    }

    /// Consume the builder and produce a [`TransferGraph`].
    ///
    /// Time complexity: O(E log E) for the edge sort.
    pub fn build(self) -> TransferGraph {
        let num_vertices = self.num_vertices;
        let mut raw = self.raw_edges;
        raw.sort_by_key(|e| e.from.0);

        let edge_to: Vec<VertexId> = raw.iter().map(|e| e.to).collect();
        let edge_travel_time: Vec<Time> = raw.iter().map(|e| e.travel_time).collect();

        let mut vertex_out_start = vec![0u32; num_vertices + 1];
        for e in &raw {
            vertex_out_start[e.from.index() + 1] += 1;
        }
        for i in 1..=num_vertices {
            vertex_out_start[i] += vertex_out_start[i - 1];
        }
        debug_assert_eq!(vertex_out_start[num_vertices] as usize, edge_to.len());

        TransferGraph {
            vertex_out_start,
            edge_to,
            edge_travel_time,
        }
    }
}
