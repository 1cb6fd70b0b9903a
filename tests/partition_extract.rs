use geochunk::{
    BoundingBox, ChunkIndex, DirectoryStore, ExtractOptions, Feature, FeatureCollection,
    GeochunkError, MetadataStore, NoProgress, Partitioner, extract,
};
use geo::Intersects;
use geo::polygon;
use serde_json::json;
use tempfile::TempDir;

fn building(x: f64, y: f64, side: f64, id: u32) -> Feature {
    let mut attrs = geochunk::Attributes::new();
    attrs.insert("id".to_string(), json!(id));
    attrs.insert("height".to_string(), json!(3.0 + id as f64));
    Feature::new(
        geo::Geometry::Polygon(polygon![
            (x: x, y: y),
            (x: x + side, y: y),
            (x: x + side, y: y + side),
            (x: x, y: y + side),
            (x: x, y: y),
        ]),
        attrs,
    )
}

/// A 10x10 grid of small buildings over a (0,0)..(10,10) extent.
fn synthetic_city() -> FeatureCollection {
    let features = (0..10)
        .flat_map(|i| {
            (0..10).map(move |j| building(i as f64 + 0.4, j as f64 + 0.4, 0.2, (i * 10 + j) as u32))
        })
        .collect();
    FeatureCollection::new(features)
}

fn feature_ids(collection: &FeatureCollection) -> Vec<u64> {
    let mut ids: Vec<u64> = collection
        .features
        .iter()
        .map(|f| f.attributes["id"].as_u64().unwrap())
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[test]
fn test_partition_then_extract_full_extent() {
    let dir = TempDir::new().unwrap();
    let store = DirectoryStore::create(dir.path()).unwrap();
    let city = synthetic_city();

    let metadata = Partitioner::default()
        .partition(&city, "city", &store, &NoProgress)
        .unwrap();
    MetadataStore::new(dir.path()).save("city", &metadata).unwrap();

    // Reload through the metadata store, the way an extraction session does.
    let metadata = MetadataStore::new(dir.path()).load().unwrap();
    let index = ChunkIndex::build(&metadata);

    let full = city.bounding_box().unwrap();
    let extraction = extract(&index, &store, full, &ExtractOptions::default(), &NoProgress)
        .unwrap();

    // Boundary duplication may inflate the raw count but never lose features.
    assert!(extraction.count >= city.len());
    assert_eq!(feature_ids(&extraction.collection).len(), city.len());

    // Every returned feature actually intersects the query region.
    let full_polygon = full.to_polygon();
    for feature in &extraction.collection.features {
        assert!(feature.geometry.intersects(&full_polygon));
    }
}

#[test]
fn test_extract_region_covering_nothing() {
    let dir = TempDir::new().unwrap();
    let store = DirectoryStore::create(dir.path()).unwrap();
    let city = synthetic_city();

    let metadata = Partitioner::default()
        .partition(&city, "city", &store, &NoProgress)
        .unwrap();
    let index = ChunkIndex::build(&metadata);

    let far_away = BoundingBox::new(50.0, 50.0, 51.0, 51.0);
    let extraction = extract(
        &index,
        &store,
        far_away,
        &ExtractOptions::default(),
        &NoProgress,
    )
    .unwrap();
    assert_eq!(extraction.count, 0);
}

#[test]
fn test_extract_subregion_is_exact() {
    let dir = TempDir::new().unwrap();
    let store = DirectoryStore::create(dir.path()).unwrap();
    let city = synthetic_city();

    let metadata = Partitioner::default()
        .partition(&city, "city", &store, &NoProgress)
        .unwrap();
    let index = ChunkIndex::build(&metadata);

    // Covers exactly the buildings with 2 <= i < 4 and 3 <= j < 5.
    let region = BoundingBox::new(2.0, 3.0, 4.0, 5.0);
    let extraction = extract(&index, &store, region, &ExtractOptions::default(), &NoProgress)
        .unwrap();

    let expected: Vec<u64> = vec![23, 24, 33, 34];
    assert_eq!(feature_ids(&extraction.collection), expected);
}

#[test]
fn test_missing_chunk_is_skipped() {
    let dir = TempDir::new().unwrap();
    let store = DirectoryStore::create(dir.path()).unwrap();
    let city = synthetic_city();

    let metadata = Partitioner::default()
        .partition(&city, "city", &store, &NoProgress)
        .unwrap();

    // Remove one chunk after metadata was written.
    let victim = metadata.iter().next().unwrap().0.clone();
    std::fs::remove_file(dir.path().join(&victim)).unwrap();

    let index = ChunkIndex::build(&metadata);
    let full = city.bounding_box().unwrap();
    let extraction = extract(&index, &store, full, &ExtractOptions::default(), &NoProgress)
        .unwrap();

    // Extraction still succeeds, only the victim's exclusive features can
    // be absent.
    assert!(extraction.count > 0);
    assert!(feature_ids(&extraction.collection).len() < city.len() + 1);
}

#[test]
fn test_malformed_payload_does_not_block_neighbors() {
    let dir = TempDir::new().unwrap();
    let store = DirectoryStore::create(dir.path()).unwrap();

    // Two co-located features, one written with a broken payload.
    std::fs::write(
        dir.path().join("tile.geojson"),
        r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]},"properties":{"properties":"{\"id\":1}"}},
            {"type":"Feature","geometry":{"type":"Polygon","coordinates":[[[0.2,0.2],[0.8,0.2],[0.8,0.8],[0.2,0.8],[0.2,0.2]]]},"properties":{"properties":"not json"}}
        ]}"#,
    )
    .unwrap();
    std::fs::write(
        dir.path().join("tiles_metadata.json"),
        r#"{"tile.geojson": {"x_min": 0.0, "y_min": 0.0, "x_max": 1.0, "y_max": 1.0}}"#,
    )
    .unwrap();

    let metadata = MetadataStore::new(dir.path()).load().unwrap();
    let index = ChunkIndex::build(&metadata);
    let extraction = extract(
        &index,
        &store,
        BoundingBox::new(0.0, 0.0, 1.0, 1.0),
        &ExtractOptions::default(),
        &NoProgress,
    )
    .unwrap();

    assert_eq!(extraction.count, 1);
    assert_eq!(
        extraction.collection.features[0].attributes["id"],
        json!(1)
    );
}

#[test]
fn test_single_point_dataset_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = DirectoryStore::create(dir.path()).unwrap();

    let mut attrs = geochunk::Attributes::new();
    attrs.insert("name".to_string(), json!("lone"));
    let collection = FeatureCollection::new(vec![Feature::new(
        geo::Geometry::Point(geo::Point::new(36.8219, -1.2921)),
        attrs,
    )]);

    let metadata = Partitioner::default()
        .partition(&collection, "lone", &store, &NoProgress)
        .unwrap();
    assert_eq!(metadata.len(), 1);

    let index = ChunkIndex::build(&metadata);
    let extraction = extract(
        &index,
        &store,
        BoundingBox::from_corners((36.0, -2.0), (37.0, -1.0)),
        &ExtractOptions::default(),
        &NoProgress,
    )
    .unwrap();
    assert_eq!(extraction.count, 1);
    assert_eq!(
        extraction.collection.features[0].attributes["name"],
        json!("lone")
    );
}

#[test]
fn test_extraction_without_metadata_fails() {
    let dir = TempDir::new().unwrap();
    let result = MetadataStore::new(dir.path()).load();
    assert!(matches!(result, Err(GeochunkError::MetadataMissing(_))));
}

#[test]
fn test_chunk_files_keep_double_encoded_payloads() {
    let dir = TempDir::new().unwrap();
    let store = DirectoryStore::create(dir.path()).unwrap();

    let collection = FeatureCollection::new(vec![building(0.0, 0.0, 1.0, 7)]);
    let metadata = Partitioner::default()
        .partition(&collection, "fmt", &store, &NoProgress)
        .unwrap();

    // Inspect the raw document: the stored envelope must hold a single
    // string-valued "properties" field, not the decoded map.
    let id = metadata.iter().next().unwrap().0;
    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join(id)).unwrap()).unwrap();
    let envelope = &raw["features"][0]["properties"];
    assert!(envelope["properties"].is_string());

    let decoded: serde_json::Value =
        serde_json::from_str(envelope["properties"].as_str().unwrap()).unwrap();
    assert_eq!(decoded["id"], json!(7));
}

#[test]
fn test_output_collection_is_tagged_epsg_4326() {
    let dir = TempDir::new().unwrap();
    let store = DirectoryStore::create(dir.path()).unwrap();
    let collection = FeatureCollection::new(vec![building(0.0, 0.0, 1.0, 1)]);

    let metadata = Partitioner::default()
        .partition(&collection, "crs", &store, &NoProgress)
        .unwrap();
    let index = ChunkIndex::build(&metadata);
    let extraction = extract(
        &index,
        &store,
        BoundingBox::new(0.0, 0.0, 1.0, 1.0),
        &ExtractOptions::default(),
        &NoProgress,
    )
    .unwrap();

    let out = dir.path().join("out.geojson");
    extraction.collection.write_geojson(&out).unwrap();
    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(
        doc["crs"]["properties"]["name"],
        json!("urn:ogc:def:crs:EPSG::4326")
    );
}
