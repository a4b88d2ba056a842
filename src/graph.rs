use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Sentinel for "no path" in the distance matrix.
const UNREACHABLE: u32 = u32::MAX;

/// A crawled page in the link graph.
///
/// Nodes live in the graph's arena and refer to their neighbours by index,
/// never by owning reference; the web's link structure is cyclic and an
/// ownership cycle would never drop. The neighbour list keeps insertion
/// order and duplicates: a page that links to the same target twice has two
/// entries, and degrees count both.
#[derive(Debug)]
pub struct Node {
    url: String,
    neighbours: Vec<usize>,
    in_degree: usize,
    page_rank: f64,
    shortest_paths: Vec<(usize, Vec<usize>)>,
}

impl Node {
    fn new(url: String) -> Self {
        Self {
            url,
            neighbours: Vec::new(),
            in_degree: 0,
            page_rank: 0.0,
            shortest_paths: Vec::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn neighbours(&self) -> &[usize] {
        &self.neighbours
    }

    pub fn in_degree(&self) -> usize {
        self.in_degree
    }

    pub fn out_degree(&self) -> usize {
        self.neighbours.len()
    }

    pub fn page_rank(&self) -> f64 {
        self.page_rank
    }

    /// Shortest paths from this node, one entry per reachable target, in
    /// node arena order. Each path lists every node index from this node to
    /// the target inclusive.
    pub fn shortest_paths(&self) -> &[(usize, Vec<usize>)] {
        &self.shortest_paths
    }
}

/// Aggregate metrics filled in by [`LinkGraph::analyze`].
#[derive(Debug, Default, Clone)]
pub struct GraphStats {
    pub average_distance: f64,
    pub diameter: u32,
    pub radius: u32,
    pub average_in_degree: f64,
    pub average_out_degree: f64,
    pub average_page_rank: f64,
    pub page_rank_iterations: usize,
    pub analysis_time: Duration,
    pub shortest_path_time: Duration,
}

/// Directed multigraph over crawled URLs.
///
/// Backed by a flat arena (`Vec<Node>`) plus a URL index; iteration order
/// everywhere is insertion order, which is what the report files promise to
/// reproduce.
#[derive(Debug, Default)]
pub struct LinkGraph {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    edges: usize,
    stats: GraphStats,
}

impl LinkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node for `url`, or returns the existing index if the URL is
    /// already registered.
    pub fn add_node(&mut self, url: &str) -> usize {
        if let Some(&idx) = self.index.get(url) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(Node::new(url.to_string()));
        self.index.insert(url.to_string(), idx);
        idx
    }

    /// Adds a directed edge between two registered URLs. Returns `false`
    /// (and adds nothing) when either endpoint is unknown, which is how
    /// links pointing outside the crawled set are dropped.
    pub fn add_link(&mut self, from: &str, to: &str) -> bool {
        let (Some(&from_idx), Some(&to_idx)) = (self.index.get(from), self.index.get(to)) else {
            return false;
        };
        self.nodes[from_idx].neighbours.push(to_idx);
        self.edges += 1;
        true
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node_url(&self, idx: usize) -> &str {
        &self.nodes[idx].url
    }

    pub fn stats(&self) -> &GraphStats {
        &self.stats
    }

    /// Runs the full analysis pass: degree counts, PageRank, all-pairs
    /// shortest paths, and the aggregate metrics derived from them.
    ///
    /// # Arguments
    ///
    /// * `damping` - PageRank damping factor, conventionally 0.85.
    /// * `epsilon` - L1 convergence threshold for the PageRank iteration.
    /// * `max_iterations` - Upper bound on PageRank iterations when the
    ///   scores refuse to settle.
    pub fn analyze(&mut self, damping: f64, epsilon: f64, max_iterations: usize) {
        let started = Instant::now();
        let n = self.nodes.len();

        for node in &mut self.nodes {
            node.in_degree = 0;
        }
        let targets: Vec<usize> = self
            .nodes
            .iter()
            .flat_map(|node| node.neighbours.iter().copied())
            .collect();
        for target in targets {
            self.nodes[target].in_degree += 1;
        }

        self.stats.page_rank_iterations = self.compute_page_rank(damping, epsilon, max_iterations);

        let floyd_started = Instant::now();
        self.compute_shortest_paths();
        self.stats.shortest_path_time = floyd_started.elapsed();

        self.stats.average_in_degree = average(self.edges, n);
        self.stats.average_out_degree = average(self.edges, n);
        self.stats.average_page_rank = if n == 0 {
            0.0
        } else {
            self.nodes.iter().map(|node| node.page_rank).sum::<f64>() / n as f64
        };

        self.stats.analysis_time = started.elapsed();
    }

    /// Power iteration with uniform teleport and dangling-mass
    /// redistribution. Returns the number of iterations it took to converge
    /// (or `max_iterations` if it never did).
    fn compute_page_rank(&mut self, damping: f64, epsilon: f64, max_iterations: usize) -> usize {
        let n = self.nodes.len();
        if n == 0 {
            return 0;
        }

        let mut ranks = vec![1.0 / n as f64; n];
        let mut iterations = 0;

        while iterations < max_iterations {
            let mut next = vec![(1.0 - damping) / n as f64; n];
            let mut dangling = 0.0;

            for (idx, node) in self.nodes.iter().enumerate() {
                if node.neighbours.is_empty() {
                    dangling += ranks[idx];
                    continue;
                }
                let share = damping * ranks[idx] / node.neighbours.len() as f64;
                for &target in &node.neighbours {
                    next[target] += share;
                }
            }

            let dangling_share = damping * dangling / n as f64;
            for rank in &mut next {
                *rank += dangling_share;
            }

            iterations += 1;
            let delta: f64 = ranks
                .iter()
                .zip(&next)
                .map(|(old, new)| (old - new).abs())
                .sum();
            ranks = next;

            if delta < epsilon {
                break;
            }
        }

        for (node, rank) in self.nodes.iter_mut().zip(ranks) {
            node.page_rank = rank;
        }
        iterations
    }

    /// Floyd-Warshall over the unweighted adjacency, with a next-hop matrix
    /// so full path sequences can be handed to the report. Also fills the
    /// distance aggregates (average distance, diameter, radius), computed
    /// over finite pairs of distinct nodes only.
    fn compute_shortest_paths(&mut self) {
        let n = self.nodes.len();
        let mut dist = vec![vec![UNREACHABLE; n]; n];
        let mut next_hop = vec![vec![usize::MAX; n]; n];

        for (i, node) in self.nodes.iter().enumerate() {
            dist[i][i] = 0;
            next_hop[i][i] = i;
            for &j in &node.neighbours {
                if i != j && dist[i][j] > 1 {
                    dist[i][j] = 1;
                    next_hop[i][j] = j;
                }
            }
        }

        for k in 0..n {
            for i in 0..n {
                if dist[i][k] == UNREACHABLE {
                    continue;
                }
                for j in 0..n {
                    if dist[k][j] == UNREACHABLE {
                        continue;
                    }
                    let through = dist[i][k] + dist[k][j];
                    if through < dist[i][j] {
                        dist[i][j] = through;
                        next_hop[i][j] = next_hop[i][k];
                    }
                }
            }
        }

        let mut total_distance: u64 = 0;
        let mut finite_pairs: u64 = 0;
        let mut diameter = 0;
        let mut radius = UNREACHABLE;

        for i in 0..n {
            let mut eccentricity = None;
            let mut paths = Vec::new();

            for j in 0..n {
                if i == j || dist[i][j] == UNREACHABLE {
                    continue;
                }
                total_distance += dist[i][j] as u64;
                finite_pairs += 1;
                eccentricity = Some(eccentricity.unwrap_or(0).max(dist[i][j]));

                let mut path = vec![i];
                let mut current = i;
                while current != j {
                    current = next_hop[current][j];
                    path.push(current);
                }
                paths.push((j, path));
            }

            if let Some(ecc) = eccentricity {
                diameter = diameter.max(ecc);
                radius = radius.min(ecc);
            }
            self.nodes[i].shortest_paths = paths;
        }

        self.stats.average_distance = if finite_pairs == 0 {
            0.0
        } else {
            total_distance as f64 / finite_pairs as f64
        };
        self.stats.diameter = diameter;
        self.stats.radius = if radius == UNREACHABLE { 0 } else { radius };
    }
}

fn average(total: usize, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}
