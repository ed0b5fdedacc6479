//! Pipeline-level behaviour: validation order and output shape.

use std::collections::BTreeMap;

use centrum_core::geojson::Geometry;
use centrum_core::geojson::crs::Crs;
use centrum_core::graph::{Attributes, InputFeature, RoadEdge, RoadNetwork, RoadNode};
use centrum_core::{
    CentralityError, ErrorCode, Granularity, InputError, NetworkInput, Pipeline, ValidationError,
};
use geo::{Geometry as GeoGeometry, point};
use serde_json::json;

fn street(coords: Vec<(f64, f64)>, name: &str, crs: Option<Crs>) -> InputFeature {
    let mut attrs = Attributes::new();
    attrs.insert("name".to_string(), json!(name));
    attrs.insert("lanes".to_string(), json!(2));
    InputFeature::line(coords, attrs, crs)
}

fn mercator_grid() -> Vec<InputFeature> {
    let crs = Some(Crs::WebMercator);
    vec![
        street(vec![(8_890_000.0, 757_000.0), (8_890_500.0, 757_000.0)], "Marine Drive", crs.clone()),
        street(vec![(8_890_500.0, 757_000.0), (8_890_500.0, 757_400.0)], "Duplication Road", crs.clone()),
        street(
            vec![(8_890_000.0, 757_000.0), (8_890_250.0, 757_300.0), (8_890_500.0, 757_400.0)],
            "Galle Road",
            crs,
        ),
    ]
}

#[test]
fn unknown_metric_is_validation_error_for_every_input() {
    let road = RoadNetwork {
        nodes: BTreeMap::from([(1, RoadNode { lat: 0.0, lon: 0.0 }), (2, RoadNode { lat: 0.0, lon: 0.001 })]),
        edges: vec![RoadEdge { u: 1, v: 2, length: 111.3, attributes: Attributes::new() }],
    };
    for input in [NetworkInput::Lines(mercator_grid()), NetworkInput::Road(road)] {
        for name in ["pagerank", "", "between ness"] {
            let err = Pipeline::default()
                .run(input.clone(), name, None)
                .expect_err("unknown metric");
            assert!(matches!(err, CentralityError::Validation(ValidationError::UnknownMetric(_))));
            assert_eq!(err.code(), ErrorCode::UnknownMetric);
        }
    }
}

#[test]
fn no_valid_lines_fails_before_metric_validation() {
    let points = vec![InputFeature {
        geometry: GeoGeometry::Point(point! { x: 1.0, y: 2.0 }),
        properties: Attributes::new(),
        crs: None,
    }];
    let degenerate = vec![street(vec![(5.0, 5.0), (5.0, 5.0)], "Dead End", None)];

    for input in [Vec::new(), points, degenerate] {
        // Even an invalid metric name reports the missing geometry first.
        let err = Pipeline::default()
            .run(NetworkInput::Lines(input), "pagerank", None)
            .expect_err("no geometry");
        assert!(matches!(err, CentralityError::Input(InputError::NoGeometryFound)));
        assert_eq!(err.code(), ErrorCode::NoGeometryFound);
    }
}

#[test]
fn reprojection_preserves_features_and_keys() {
    let fc = Pipeline::default()
        .run(NetworkInput::Lines(mercator_grid()), "betweenness", None)
        .expect("run");

    assert_eq!(fc.len(), 3);
    for feature in &fc.features {
        let keys: Vec<_> = feature.properties.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["lanes", "name", "value", "weight"]);

        let Geometry::LineString { coordinates } = &feature.geometry else {
            panic!("edge features are lines");
        };
        for [lon, lat] in coordinates {
            assert!((79.0..81.0).contains(lon), "lon {lon}");
            assert!((6.0..8.0).contains(lat), "lat {lat}");
        }
    }
    assert_eq!(fc.features[2].properties["name"], json!("Galle Road"));
}

#[test]
fn node_granularity_emits_points() {
    let fc = Pipeline::default()
        .run(NetworkInput::Lines(mercator_grid()), "closeness", Some(Granularity::Node))
        .expect("run");

    assert_eq!(fc.len(), 3);
    for (i, feature) in fc.features.iter().enumerate() {
        assert!(matches!(feature.geometry, Geometry::Point { .. }));
        assert_eq!(feature.properties["id"], json!(i));
        assert!(feature.value().is_some_and(|v| v > 0.0));
    }
}

#[test]
fn output_serializes_as_geojson() {
    let fc = Pipeline::default()
        .run(NetworkInput::Lines(mercator_grid()), "connectivity", None)
        .expect("run");
    let value = serde_json::to_value(&fc).expect("serialize");

    assert_eq!(value["type"], json!("FeatureCollection"));
    assert_eq!(value["features"][0]["type"], json!("Feature"));
    assert_eq!(value["features"][0]["geometry"]["type"], json!("LineString"));
}
