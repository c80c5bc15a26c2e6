//! BFS crawl of the known-node set via each node's `/peers` and `/info`
//! (§4.8), producing a `{nodes[], edges[]}` snapshot.

use std::collections::{HashSet, VecDeque};

use chain::Peer;
use serde::Serialize;
use serde_json::Value;

use crate::config::CRAWL_TIMEOUT;
use crate::state::AppState;

fn node_id(host: &str, port: u16) -> String {
    format!("{host}:{port}")
}

struct Visit {
    peers: Vec<Peer>,
    info: Value,
    reachable: bool,
}

async fn fetch_peers(http: &reqwest::Client, host: &str, port: u16) -> Option<Vec<Peer>> {
    http.get(format!("http://{host}:{port}/peers"))
        .timeout(CRAWL_TIMEOUT)
        .send()
        .await
        .ok()?
        .json::<Vec<Peer>>()
        .await
        .ok()
}

async fn fetch_info(http: &reqwest::Client, host: &str, port: u16) -> Value {
    let Ok(resp) = http.get(format!("http://{host}:{port}/info")).timeout(CRAWL_TIMEOUT).send().await else {
        return Value::Null;
    };
    resp.json::<Value>().await.unwrap_or(Value::Null)
}

#[derive(Serialize)]
struct GraphNode {
    id: String,
    label: String,
    color: Option<&'static str>,
    info: Value,
}

#[derive(Serialize)]
struct GraphEdge {
    from: String,
    to: String,
}

#[derive(Serialize)]
pub struct NetworkGraph {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
}

/// Crawls outward from `state`'s self-registered nodes, following every
/// peer relation an reachable node reports, until the frontier is exhausted.
pub async fn build_network_graph(state: &AppState) -> NetworkGraph {
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> =
        state.known_nodes().into_iter().map(|p| node_id(&p.host, &p.port)).collect();
    let mut data: std::collections::HashMap<String, Visit> = std::collections::HashMap::new();

    while let Some(id) = queue.pop_front() {
        if visited.contains(&id) {
            continue;
        }
        visited.insert(id.clone());

        let Some((host, port_str)) = id.rsplit_once(':') else { continue };
        let Ok(port) = port_str.parse::<u16>() else { continue };

        let peers = fetch_peers(&state.http, host, port).await;
        let reachable = peers.is_some();
        let peers = peers.unwrap_or_default();
        let info = if reachable { fetch_info(&state.http, host, port).await } else { Value::Null };

        for peer in &peers {
            let peer_id = node_id(&peer.host, peer.port);
            if !visited.contains(&peer_id) {
                queue.push_back(peer_id);
            }
        }

        data.insert(id, Visit { peers, info, reachable });
    }

    let mut ids: Vec<&String> = visited.iter().collect();
    ids.sort();

    let nodes = ids
        .iter()
        .map(|id| {
            let visit = data.get(*id);
            let reachable = visit.map(|v| v.reachable).unwrap_or(false);
            let balance = visit.and_then(|v| v.info.get("balance")).cloned().unwrap_or(Value::Null);
            let port = id.rsplit_once(':').map(|(_, p)| p).unwrap_or("?");
            GraphNode {
                id: (*id).clone(),
                label: format!("{port}\n{balance}"),
                color: if reachable { None } else { Some("#888") },
                info: visit.map(|v| v.info.clone()).unwrap_or(Value::Null),
            }
        })
        .collect();

    let mut edge_set: HashSet<(String, String)> = HashSet::new();
    for (id, visit) in &data {
        if !visit.reachable {
            continue;
        }
        for peer in &visit.peers {
            let peer_id = node_id(&peer.host, peer.port);
            let pair = if id < &peer_id { (id.clone(), peer_id) } else { (peer_id, id.clone()) };
            edge_set.insert(pair);
        }
    }
    let mut edges: Vec<GraphEdge> = edge_set.into_iter().map(|(from, to)| GraphEdge { from, to }).collect();
    edges.sort_by(|a, b| (&a.from, &a.to).cmp(&(&b.from, &b.to)));

    NetworkGraph { nodes, edges }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;

    #[tokio::test]
    async fn empty_known_nodes_yields_empty_graph() {
        let state = AppState::new(reqwest::Client::new());
        let graph = build_network_graph(&state).await;
        assert!(graph.nodes.is_empty());
        assert!(graph.edges.is_empty());
    }

    #[tokio::test]
    async fn unreachable_node_is_marked_and_contributes_no_edges() {
        let state = AppState::new(reqwest::Client::new());
        // Port 1 is reserved and will refuse the connection immediately.
        state.add_node(Peer { host: "127.0.0.1".to_string(), port: 1 });
        let graph = build_network_graph(&state).await;
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].color, Some("#888"));
        assert!(graph.edges.is_empty());
    }
}
