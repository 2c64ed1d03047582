use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::edge::TrustEdge;

/// Per-hop decay factor applied to transitive trust.
pub const TRUST_DECAY: f64 = 0.85;

/// Maximum hop count for path discovery.
pub const MAX_PATH_DEPTH: usize = 6;

/// Depth bound for transitive reputation (direct trusters sit at depth 1;
/// only hops 2 and 3 contribute transitively).
pub const MAX_REPUTATION_DEPTH: usize = 3;

/// Filter an edge set down to the edges that participate in traversal:
/// not revoked, and either without expiry or expiring after `now`.
pub fn valid_edges(edges: &[TrustEdge], now: DateTime<Utc>) -> Vec<&TrustEdge> {
    edges.iter().filter(|e| e.is_active(now)).collect()
}

/// Forward and reverse adjacency built from a valid edge set in one pass.
///
/// Neighbor lists preserve the enumeration order of the input (primary key
/// ascending when edges come from the store), which keeps BFS deterministic.
#[derive(Debug, Default)]
pub struct AdjacencyIndex {
    forward: HashMap<String, Vec<(String, u8)>>,
    reverse: HashMap<String, Vec<(String, u8)>>,
}

impl AdjacencyIndex {
    /// Build both indexes in a single O(N) pass.
    pub fn build(edges: &[&TrustEdge]) -> Self {
        let mut forward: HashMap<String, Vec<(String, u8)>> = HashMap::new();
        let mut reverse: HashMap<String, Vec<(String, u8)>> = HashMap::new();
        for edge in edges {
            forward
                .entry(edge.source.clone())
                .or_default()
                .push((edge.target.clone(), edge.level));
            reverse
                .entry(edge.target.clone())
                .or_default()
                .push((edge.source.clone(), edge.level));
        }
        Self { forward, reverse }
    }

    /// Outgoing `(target, level)` pairs for a node.
    pub fn outgoing(&self, did: &str) -> &[(String, u8)] {
        self.forward.get(did).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Incoming `(source, level)` pairs for a node.
    pub fn incoming(&self, did: &str) -> &[(String, u8)] {
        self.reverse.get(did).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// One vertex on a discovered path. The source vertex carries level 100;
/// every other vertex carries the level of the edge leading into it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathNode {
    pub did: String,
    #[serde(rename = "trustLevel")]
    pub trust_level: u8,
}

/// Result of a shortest-trust-path query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathResult {
    pub from: String,
    pub to: String,
    pub found: bool,
    pub path: Vec<PathNode>,
    #[serde(rename = "cumulativeTrust")]
    pub cumulative_trust: f64,
    pub hops: usize,
}

impl PathResult {
    fn not_found(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            found: false,
            path: Vec::new(),
            cumulative_trust: 0.0,
            hops: 0,
        }
    }
}

/// Queue entry for the BFS. Parent pointers index into the queue itself, so
/// no per-entry path vectors are copied during the search.
struct SearchEntry {
    did: String,
    depth: usize,
    trust: f64,
    via_level: u8,
    parent: Option<usize>,
}

/// Find the shortest trust path with the default depth bound of 6.
pub fn find_path(edges: &[TrustEdge], from: &str, to: &str) -> PathResult {
    find_path_with_depth(edges, from, to, MAX_PATH_DEPTH)
}

/// Breadth-first shortest trust path over the forward index.
///
/// The queue is dequeued by index (no array shifting); a visited set makes
/// cycles harmless. Each step from a node at depth `d` over an edge of raw
/// level `w` multiplies the cumulative trust by `(w/100) * decay^d`, with
/// `decay^d` precomputed for every depth up to the bound. The first dequeue
/// of the target is the reported path: shortest in hops, and among
/// equal-hop paths the one discovered first in edge-enumeration order.
pub fn find_path_with_depth(
    edges: &[TrustEdge],
    from: &str,
    to: &str,
    max_depth: usize,
) -> PathResult {
    let now = Utc::now();
    let valid = valid_edges(edges, now);
    let index = AdjacencyIndex::build(&valid);

    let decay_powers: Vec<f64> = (0..=max_depth).map(|d| TRUST_DECAY.powi(d as i32)).collect();

    let mut queue: Vec<SearchEntry> = vec![SearchEntry {
        did: from.to_string(),
        depth: 0,
        trust: 1.0,
        via_level: 100,
        parent: None,
    }];
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(from.to_string());

    let mut head = 0;
    while head < queue.len() {
        let current = head;
        head += 1;

        if queue[current].did == to {
            return reconstruct(&queue, current, from, to);
        }

        let depth = queue[current].depth;
        if depth >= max_depth {
            continue;
        }
        let trust = queue[current].trust;
        let did = queue[current].did.clone();

        for (target, level) in index.outgoing(&did) {
            if visited.contains(target) {
                continue;
            }
            visited.insert(target.clone());
            queue.push(SearchEntry {
                did: target.clone(),
                depth: depth + 1,
                trust: trust * (*level as f64 / 100.0) * decay_powers[depth],
                via_level: *level,
                parent: Some(current),
            });
        }
    }

    PathResult::not_found(from, to)
}

fn reconstruct(queue: &[SearchEntry], target: usize, from: &str, to: &str) -> PathResult {
    let mut path = Vec::with_capacity(queue[target].depth + 1);
    let mut cursor = Some(target);
    while let Some(i) = cursor {
        path.push(PathNode {
            did: queue[i].did.clone(),
            trust_level: queue[i].via_level,
        });
        cursor = queue[i].parent;
    }
    path.reverse();

    PathResult {
        from: from.to_string(),
        to: to.to_string(),
        found: true,
        path,
        cumulative_trust: queue[target].trust,
        hops: queue[target].depth,
    }
}

/// Aggregated inbound trust for a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputationScore {
    /// Combined score in [0, 1].
    pub score: f64,
    #[serde(rename = "directTrusters")]
    pub direct_trusters: usize,
    #[serde(rename = "transitiveTrusters")]
    pub transitive_trusters: usize,
}

/// Reputation over the valid edge set.
///
/// Direct score is the mean inbound level divided by 100. The transitive
/// component walks the reverse index breadth-first from the subject,
/// seeding direct trusters at depth 1 with a path trust of 1.0 and bounding
/// expansion at depth < 3; each traversed inbound edge contributes
/// `pathTrust * (level/100) * decay^depth`. The final score is
/// `min(1, 0.7*direct + 0.3*min(1, transitive))`.
pub fn reputation(edges: &[TrustEdge], subject: &str) -> ReputationScore {
    let now = Utc::now();
    let valid = valid_edges(edges, now);
    let index = AdjacencyIndex::build(&valid);

    let direct = index.incoming(subject);
    let direct_score = if direct.is_empty() {
        0.0
    } else {
        direct.iter().map(|(_, level)| *level as f64).sum::<f64>()
            / (direct.len() as f64 * 100.0)
    };

    let decay_powers: Vec<f64> = (0..=MAX_REPUTATION_DEPTH)
        .map(|d| TRUST_DECAY.powi(d as i32))
        .collect();

    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(subject.to_string());

    // (node, depth, path trust), dequeued by index like the path search.
    let mut queue: Vec<(String, usize, f64)> = Vec::new();
    for (truster, _) in direct {
        if visited.insert(truster.clone()) {
            queue.push((truster.clone(), 1, 1.0));
        }
    }

    let mut transitive_score = 0.0;
    let mut transitive_trusters: HashSet<String> = HashSet::new();

    let mut head = 0;
    while head < queue.len() {
        let (did, depth, path_trust) = queue[head].clone();
        head += 1;

        if depth >= MAX_REPUTATION_DEPTH {
            continue;
        }

        for (truster, level) in index.incoming(&did) {
            let contribution = path_trust * (*level as f64 / 100.0) * decay_powers[depth];
            transitive_score += contribution;
            if visited.insert(truster.clone()) {
                transitive_trusters.insert(truster.clone());
                queue.push((truster.clone(), depth + 1, contribution));
            }
        }
    }

    let score = (0.7 * direct_score + 0.3 * transitive_score.min(1.0)).min(1.0);

    ReputationScore {
        score,
        direct_trusters: direct.len(),
        transitive_trusters: transitive_trusters.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn edge(id: i64, source: &str, target: &str, level: u8) -> TrustEdge {
        TrustEdge {
            id,
            source: source.to_string(),
            target: target.to_string(),
            level,
            attestation_id: format!("att-{id}"),
            signature: String::new(),
            payload: String::new(),
            created_at: Utc::now(),
            expires_at: None,
            revoked_at: None,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_direct_path() {
        let edges = vec![edge(1, "A", "B", 80)];
        let result = find_path(&edges, "A", "B");
        assert!(result.found);
        assert_eq!(result.hops, 1);
        assert!(close(result.cumulative_trust, 0.8));
        assert_eq!(result.path.len(), 2);
        assert_eq!(result.path[0].did, "A");
        assert_eq!(result.path[1].did, "B");
        assert_eq!(result.path[1].trust_level, 80);
    }

    #[test]
    fn test_two_hop_path() {
        let edges = vec![edge(1, "A", "B", 100), edge(2, "B", "C", 100)];
        let result = find_path(&edges, "A", "C");
        assert!(result.found);
        assert_eq!(result.hops, 2);
        assert!(close(result.cumulative_trust, 0.85));
    }

    #[test]
    fn test_three_hop_path() {
        let edges = vec![
            edge(1, "A", "B", 100),
            edge(2, "B", "C", 100),
            edge(3, "C", "D", 100),
        ];
        let result = find_path(&edges, "A", "D");
        assert!(result.found);
        assert_eq!(result.hops, 3);
        // 0.85 * 0.7225
        assert!(close(result.cumulative_trust, 0.614125));
    }

    #[test]
    fn test_cycle_safety() {
        let edges = vec![
            edge(1, "A", "B", 80),
            edge(2, "B", "C", 90),
            edge(3, "C", "A", 70),
        ];
        let result = find_path(&edges, "A", "C");
        assert!(result.found);
        assert_eq!(result.hops, 2);
        // All vertices on the path are distinct.
        let mut seen = HashSet::new();
        assert!(result.path.iter().all(|n| seen.insert(n.did.clone())));
    }

    #[test]
    fn test_revoked_edge_excluded() {
        let mut revoked = edge(1, "A", "B", 80);
        revoked.revoked_at = Some(Utc::now());
        let result = find_path(&[revoked], "A", "B");
        assert!(!result.found);
        assert!(result.path.is_empty());
        assert_eq!(result.cumulative_trust, 0.0);
        assert_eq!(result.hops, 0);
    }

    #[test]
    fn test_expired_edge_excluded() {
        let mut expired = edge(1, "A", "B", 80);
        expired.expires_at = Some(Utc::now() - Duration::hours(1));
        assert!(!find_path(&[expired], "A", "B").found);
    }

    #[test]
    fn test_no_route() {
        let edges = vec![edge(1, "A", "B", 80)];
        let result = find_path(&edges, "A", "Z");
        assert!(!result.found);
    }

    #[test]
    fn test_path_at_exact_max_depth() {
        // Chain of 6 hops: N0 -> N1 -> ... -> N6.
        let edges: Vec<TrustEdge> = (0..6)
            .map(|i| edge(i + 1, &format!("N{i}"), &format!("N{}", i + 1), 100))
            .collect();
        let result = find_path(&edges, "N0", "N6");
        assert!(result.found);
        assert_eq!(result.hops, MAX_PATH_DEPTH);
    }

    #[test]
    fn test_path_beyond_max_depth_not_found() {
        // Chain of 7 hops exceeds the bound.
        let edges: Vec<TrustEdge> = (0..7)
            .map(|i| edge(i + 1, &format!("N{i}"), &format!("N{}", i + 1), 100))
            .collect();
        assert!(!find_path(&edges, "N0", "N7").found);
        // A tighter explicit bound cuts off a reachable target.
        assert!(!find_path_with_depth(&edges, "N0", "N3", 2).found);
        assert!(find_path_with_depth(&edges, "N0", "N3", 3).found);
    }

    #[test]
    fn test_shortest_path_wins() {
        // Direct edge and a longer detour; BFS reports the direct one.
        let edges = vec![
            edge(1, "A", "B", 50),
            edge(2, "A", "C", 100),
            edge(3, "C", "B", 100),
        ];
        let result = find_path(&edges, "A", "B");
        assert_eq!(result.hops, 1);
        assert!(close(result.cumulative_trust, 0.5));
    }

    #[test]
    fn test_equal_hop_tiebreak_is_enumeration_order() {
        // Two 2-hop routes; the one through the earlier edge id wins.
        let edges = vec![
            edge(1, "A", "X", 60),
            edge(2, "A", "Y", 90),
            edge(3, "X", "B", 60),
            edge(4, "Y", "B", 90),
        ];
        let result = find_path(&edges, "A", "B");
        assert_eq!(result.hops, 2);
        assert_eq!(result.path[1].did, "X");
    }

    #[test]
    fn test_self_path() {
        let edges = vec![edge(1, "A", "B", 80)];
        let result = find_path(&edges, "A", "A");
        assert!(result.found);
        assert_eq!(result.hops, 0);
        assert_eq!(result.path.len(), 1);
    }

    #[test]
    fn test_valid_edges_filters_lifecycle() {
        let now = Utc::now();
        let active = edge(1, "A", "B", 80);
        let mut revoked = edge(2, "A", "C", 80);
        revoked.revoked_at = Some(now);
        let mut expired = edge(3, "A", "D", 80);
        expired.expires_at = Some(now - Duration::seconds(5));
        let mut future_expiry = edge(4, "A", "E", 80);
        future_expiry.expires_at = Some(now + Duration::hours(1));

        let all = vec![active, revoked, expired, future_expiry];
        let valid = valid_edges(&all, now);
        let ids: Vec<i64> = valid.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 4]);
    }

    #[test]
    fn test_adjacency_single_pass_shape() {
        let edges = vec![edge(1, "A", "B", 80), edge(2, "A", "C", 60), edge(3, "B", "C", 90)];
        let valid = valid_edges(&edges, Utc::now());
        let index = AdjacencyIndex::build(&valid);
        assert_eq!(index.outgoing("A").len(), 2);
        assert_eq!(index.incoming("C").len(), 2);
        assert!(index.outgoing("Z").is_empty());
        assert!(index.incoming("A").is_empty());
    }

    #[test]
    fn test_reputation_no_trusters() {
        let score = reputation(&[], "S");
        assert_eq!(score.score, 0.0);
        assert_eq!(score.direct_trusters, 0);
        assert_eq!(score.transitive_trusters, 0);
    }

    #[test]
    fn test_reputation_single_direct() {
        let edges = vec![edge(1, "A", "S", 80)];
        let score = reputation(&edges, "S");
        assert_eq!(score.direct_trusters, 1);
        assert_eq!(score.transitive_trusters, 0);
        // 0.7 * 0.8
        assert!(close(score.score, 0.56));
    }

    #[test]
    fn test_reputation_direct_mean() {
        let edges = vec![edge(1, "A", "S", 100), edge(2, "B", "S", 50)];
        let score = reputation(&edges, "S");
        assert_eq!(score.direct_trusters, 2);
        // direct = 0.75, no transitive
        assert!(close(score.score, 0.7 * 0.75));
    }

    #[test]
    fn test_reputation_transitive_hop_two() {
        // A -> B -> S: A is a transitive truster of S at hop 2.
        let edges = vec![edge(1, "B", "S", 100), edge(2, "A", "B", 100)];
        let score = reputation(&edges, "S");
        assert_eq!(score.direct_trusters, 1);
        assert_eq!(score.transitive_trusters, 1);
        // direct = 1.0; transitive = 1.0 * 1.0 * 0.85
        assert!(close(score.score, (0.7 + 0.3 * 0.85_f64).min(1.0)));
    }

    #[test]
    fn test_reputation_depth_bound() {
        // Chain: D -> C -> B -> S. C contributes at hop 2, B is direct,
        // D contributes at hop 3; a fourth hop would not.
        let edges = vec![
            edge(1, "B", "S", 100),
            edge(2, "C", "B", 100),
            edge(3, "D", "C", 100),
            edge(4, "E", "D", 100),
        ];
        let score = reputation(&edges, "S");
        assert_eq!(score.direct_trusters, 1);
        // C at depth 2 and D at depth 3 are transitive; E is beyond the bound.
        assert_eq!(score.transitive_trusters, 2);
    }

    #[test]
    fn test_reputation_score_capped_at_one() {
        // Many strong trusters saturate the transitive term and the total.
        let mut edges = vec![];
        let mut id = 1;
        for i in 0..10 {
            edges.push(edge(id, &format!("D{i}"), "S", 100));
            id += 1;
        }
        for i in 0..10 {
            for j in 0..10 {
                edges.push(edge(id, &format!("T{i}-{j}"), &format!("D{i}"), 100));
                id += 1;
            }
        }
        let score = reputation(&edges, "S");
        assert!(score.score <= 1.0);
        assert!(close(score.score, 1.0));
    }

    #[test]
    fn test_reputation_ignores_revoked() {
        let mut revoked = edge(1, "A", "S", 100);
        revoked.revoked_at = Some(Utc::now());
        let score = reputation(&[revoked], "S");
        assert_eq!(score.direct_trusters, 0);
        assert_eq!(score.score, 0.0);
    }

    #[test]
    fn test_reputation_cycle_terminates() {
        let edges = vec![
            edge(1, "A", "S", 80),
            edge(2, "S", "A", 80),
            edge(3, "B", "A", 70),
            edge(4, "A", "B", 70),
        ];
        let score = reputation(&edges, "S");
        assert_eq!(score.direct_trusters, 1);
        assert!(score.score > 0.0 && score.score <= 1.0);
    }
}
