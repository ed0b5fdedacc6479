//! OpenStreetMap street networks via Nominatim and Overpass.
//!
//! `fetch` geocodes the place to a bounding box, downloads every drivable
//! `highway` way inside it and simplifies the ways into a [`RoadNetwork`]:
//! nodes are intersections and way ends, edges run between consecutive
//! intersections along a way and carry their haversine length in metres.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use centrum_core::config::ProviderConfig;
use centrum_core::graph::{Attributes, RoadEdge, RoadNode};
use centrum_core::{InputError, RoadNetwork};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use super::haversine_metres;
use crate::RoadNetworkSource;

/// `highway` values kept in the downloaded network.
const DRIVABLE: &str = "motorway|motorway_link|trunk|trunk_link|primary|primary_link|secondary|secondary_link|tertiary|tertiary_link|unclassified|residential|living_street|road";

/// Tags copied from a way onto each of its edges.
const KEPT_TAGS: [&str; 5] = ["highway", "name", "oneway", "lanes", "maxspeed"];

/// South, west, north, east in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

#[derive(Debug, Deserialize)]
struct Place {
    /// `[south, north, west, east]` as strings.
    boundingbox: [String; 4],
    #[serde(default)]
    display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Element {
    Node {
        id: i64,
        lat: f64,
        lon: f64,
    },
    Way {
        id: i64,
        nodes: Vec<i64>,
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone)]
pub struct OverpassSource {
    agent: ureq::Agent,
    nominatim_url: String,
    overpass_url: String,
    timeout_secs: u64,
}

fn provider_error(what: &str, err: &ureq::Error) -> InputError {
    InputError::Provider(format!("{what}: {err}"))
}

impl OverpassSource {
    #[must_use]
    pub fn new(config: &ProviderConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build();
        Self {
            agent,
            nominatim_url: config.nominatim_url.clone(),
            overpass_url: config.overpass_url.clone(),
            timeout_secs: config.timeout_secs,
        }
    }

    /// Resolve `place` to its bounding box.
    ///
    /// # Errors
    ///
    /// [`InputError::LocationNotFound`] when Nominatim has no match,
    /// [`InputError::Provider`] when the request fails.
    #[instrument(skip(self))]
    pub fn geocode(&self, place: &str) -> Result<BoundingBox, InputError> {
        let places: Vec<Place> = self
            .agent
            .get(&self.nominatim_url)
            .query("q", place)
            .query("format", "jsonv2")
            .query("limit", "1")
            .call()
            .map_err(|e| provider_error("geocoding request failed", &e))?
            .into_json()
            .map_err(|e| InputError::Provider(format!("invalid geocoding response: {e}")))?;

        let Some(found) = places.into_iter().next() else {
            return Err(InputError::LocationNotFound(place.to_string()));
        };
        let [south, north, west, east] = found
            .boundingbox
            .each_ref()
            .map(|v| v.trim().parse::<f64>().ok());
        let (Some(south), Some(north), Some(west), Some(east)) = (south, north, west, east) else {
            return Err(InputError::Provider(format!(
                "invalid bounding box {:?}",
                found.boundingbox
            )));
        };

        debug!(name = %found.display_name, south, west, north, east, "geocoded place");
        Ok(BoundingBox {
            south,
            west,
            north,
            east,
        })
    }

    /// Overpass QL selecting drivable ways in `bbox` with their nodes.
    #[must_use]
    pub fn query(&self, bbox: &BoundingBox) -> String {
        format!(
            "[out:json][timeout:{t}];(way[\"highway\"~\"^({DRIVABLE})$\"]({s},{w},{n},{e}););(._;>;);out body;",
            t = self.timeout_secs,
            s = bbox.south,
            w = bbox.west,
            n = bbox.north,
            e = bbox.east,
        )
    }

    /// Download the raw ways and nodes inside `bbox`.
    ///
    /// # Errors
    ///
    /// [`InputError::Provider`] when the request fails.
    #[instrument(skip(self))]
    pub fn download(&self, bbox: &BoundingBox) -> Result<OverpassResponse, InputError> {
        let query = self.query(bbox);
        self.agent
            .post(&self.overpass_url)
            .send_form(&[("data", query.as_str())])
            .map_err(|e| provider_error("overpass request failed", &e))?
            .into_json()
            .map_err(|e| InputError::Provider(format!("invalid overpass response: {e}")))
    }
}

impl RoadNetworkSource for OverpassSource {
    #[instrument(skip(self))]
    fn fetch(&self, place: &str) -> Result<RoadNetwork, InputError> {
        if place.trim().is_empty() {
            return Err(InputError::LocationNotFound(place.to_string()));
        }
        let bbox = self.geocode(place)?;
        let response = self.download(&bbox)?;
        Ok(road_network_from_overpass(&response))
    }
}

/// Simplify Overpass ways into an intersection graph.
///
/// A node is kept when it ends a way or is shared by more than one way
/// position. Ways referencing nodes missing from the response are cut at
/// the gap.
#[must_use]
pub fn road_network_from_overpass(response: &OverpassResponse) -> RoadNetwork {
    let mut positions = HashMap::new();
    let mut ways = Vec::new();
    for element in &response.elements {
        match element {
            Element::Node { id, lat, lon } => {
                positions.insert(*id, (*lon, *lat));
            }
            Element::Way { id, nodes, tags } => ways.push((*id, nodes, tags)),
            Element::Other => {}
        }
    }

    let mut uses: HashMap<i64, usize> = HashMap::new();
    for (_, nodes, _) in &ways {
        for id in nodes.iter() {
            *uses.entry(*id).or_default() += 1;
        }
        for end in [nodes.first(), nodes.last()].into_iter().flatten() {
            *uses.entry(*end).or_default() += 1;
        }
    }
    let is_junction = |id: i64| uses.get(&id).copied().unwrap_or(0) > 1;

    let mut network = RoadNetwork::default();
    let mut dropped = 0_usize;
    for (way_id, nodes, tags) in ways {
        let mut attributes = Attributes::new();
        attributes.insert("osmid".to_string(), json!(way_id));
        for key in KEPT_TAGS {
            if let Some(value) = tags.get(key) {
                attributes.insert(key.to_string(), json!(value));
            }
        }

        let mut start: Option<(i64, (f64, f64))> = None;
        let mut prev = (0.0, 0.0);
        let mut length = 0.0;
        for &id in nodes {
            let Some(&pos) = positions.get(&id) else {
                warn!(way = way_id, node = id, "way references a missing node");
                start = None;
                continue;
            };
            let Some((from, from_pos)) = start else {
                start = Some((id, pos));
                prev = pos;
                length = 0.0;
                continue;
            };

            length += haversine_metres(prev, pos);
            prev = pos;
            if !is_junction(id) {
                continue;
            }

            if from == id || length <= 0.0 {
                dropped += 1;
            } else {
                for (node, (lon, lat)) in [(from, from_pos), (id, pos)] {
                    network.nodes.insert(node, RoadNode { lat, lon });
                }
                network.edges.push(RoadEdge {
                    u: from,
                    v: id,
                    length,
                    attributes: attributes.clone(),
                });
            }
            start = Some((id, pos));
            length = 0.0;
        }
    }

    info!(
        nodes = network.nodes.len(),
        edges = network.edges.len(),
        dropped,
        "simplified overpass ways"
    );
    network
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(value: serde_json::Value) -> OverpassResponse {
        serde_json::from_value(value).expect("overpass json")
    }

    #[test]
    fn ways_split_at_shared_nodes() {
        // Way 100 runs 1-2-3-4; way 200 crosses it at 3 and runs 3-5.
        let r = response(json!({"elements": [
            {"type": "node", "id": 1, "lat": 6.900, "lon": 79.850},
            {"type": "node", "id": 2, "lat": 6.901, "lon": 79.850},
            {"type": "node", "id": 3, "lat": 6.902, "lon": 79.850},
            {"type": "node", "id": 4, "lat": 6.903, "lon": 79.850},
            {"type": "node", "id": 5, "lat": 6.902, "lon": 79.851},
            {"type": "way", "id": 100, "nodes": [1, 2, 3, 4], "tags": {"highway": "primary", "name": "Galle Road", "surface": "asphalt"}},
            {"type": "way", "id": 200, "nodes": [3, 5], "tags": {"highway": "residential"}},
            {"type": "relation", "id": 9, "members": []}
        ]}));
        let network = road_network_from_overpass(&r);

        let pairs: Vec<_> = network.edges.iter().map(|e| (e.u, e.v)).collect();
        assert_eq!(pairs, vec![(1, 3), (3, 4), (3, 5)]);
        assert_eq!(network.nodes.keys().copied().collect::<Vec<_>>(), vec![1, 3, 4, 5]);

        let first = &network.edges[0];
        assert!((first.length - 222.4).abs() < 1.0, "{}", first.length);
        assert_eq!(first.attributes["name"], json!("Galle Road"));
        assert_eq!(first.attributes["osmid"], json!(100));
        assert!(!first.attributes.contains_key("surface"));
    }

    #[test]
    fn closed_way_without_junction_is_dropped() {
        let r = response(json!({"elements": [
            {"type": "node", "id": 1, "lat": 0.0, "lon": 0.0},
            {"type": "node", "id": 2, "lat": 0.001, "lon": 0.0},
            {"type": "node", "id": 3, "lat": 0.001, "lon": 0.001},
            {"type": "way", "id": 7, "nodes": [1, 2, 3, 1], "tags": {"highway": "service"}}
        ]}));
        let network = road_network_from_overpass(&r);
        assert!(network.edges.is_empty());
    }

    #[test]
    fn missing_node_cuts_way() {
        let r = response(json!({"elements": [
            {"type": "node", "id": 1, "lat": 0.0, "lon": 0.0},
            {"type": "node", "id": 2, "lat": 0.001, "lon": 0.0},
            {"type": "node", "id": 4, "lat": 0.003, "lon": 0.0},
            {"type": "way", "id": 7, "nodes": [1, 2, 3, 4], "tags": {}}
        ]}));
        let network = road_network_from_overpass(&r);
        // 1-2 is cut before the gap; 4 alone cannot form an edge.
        assert!(network.edges.is_empty());
    }

    #[test]
    fn query_names_bbox_and_filter() {
        let source = OverpassSource::new(&ProviderConfig::default());
        let q = source.query(&BoundingBox {
            south: 6.8,
            west: 79.8,
            north: 7.0,
            east: 79.9,
        });
        assert!(q.contains("(6.8,79.8,7,79.9)"), "{q}");
        assert!(q.contains("residential"));
        assert!(q.starts_with("[out:json][timeout:180]"));
    }

    #[test]
    fn blank_place_is_not_found() {
        let source = OverpassSource::new(&ProviderConfig::default());
        assert!(matches!(source.fetch("  "), Err(InputError::LocationNotFound(_))));
    }

    #[test]
    fn unreachable_provider_is_provider_error() {
        let config = ProviderConfig {
            nominatim_url: "http://127.0.0.1:9/search".to_string(),
            timeout_secs: 2,
            ..ProviderConfig::default()
        };
        let source = OverpassSource::new(&config);
        assert!(matches!(source.fetch("Colombo"), Err(InputError::Provider(_))));
    }
}
