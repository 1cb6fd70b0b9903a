//! Remote catalog acquisition.
//!
//! The upstream dataset publishes a CSV catalog mapping location names to
//! per-tile download URLs; each tile is a gzip-compressed stream of
//! newline-delimited GeoJSON features. Catalog failures are structural and
//! fatal ([`GeochunkError::SourceUnavailable`], [`GeochunkError::NoDataForLocation`]);
//! a single failed tile or malformed line is logged and skipped.

use crate::error::{GeochunkError, Result};
use crate::progress::ProgressObserver;
use crate::types::{Feature, FeatureCollection};
use flate2::read::GzDecoder;
use serde::Deserialize;
use std::io::{BufRead, BufReader, Read};

/// Published catalog of per-location tile links.
pub const DATASET_LINKS_URL: &str =
    "https://minedbuildings.blob.core.windows.net/global-buildings/dataset-links.csv";

/// One row of the remote catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "QuadKey")]
    pub quad_key: String,
    #[serde(rename = "Url")]
    pub url: String,
    #[serde(rename = "Size", default)]
    pub size: Option<String>,
}

/// Parse catalog CSV from any reader.
pub fn parse_catalog<R: Read>(reader: R) -> Result<Vec<CatalogEntry>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    for row in csv_reader.deserialize() {
        let row: CatalogEntry = row
            .map_err(|e| GeochunkError::SourceUnavailable(format!("invalid catalog row: {e}")))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Fetch and parse the catalog from `url`.
pub fn fetch_catalog(url: &str) -> Result<Vec<CatalogEntry>> {
    let response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| GeochunkError::SourceUnavailable(format!("catalog fetch failed: {e}")))?;
    parse_catalog(response)
}

/// Select the catalog rows for one location.
///
/// An unknown location fails with [`GeochunkError::NoDataForLocation`]
/// carrying the sorted list of valid names so the caller can show
/// alternatives.
pub fn links_for_location<'a>(
    catalog: &'a [CatalogEntry],
    location: &str,
) -> Result<Vec<&'a CatalogEntry>> {
    let links: Vec<&CatalogEntry> = catalog
        .iter()
        .filter(|entry| entry.location == location)
        .collect();

    if links.is_empty() {
        let mut available: Vec<String> =
            catalog.iter().map(|entry| entry.location.clone()).collect();
        available.sort();
        available.dedup();
        return Err(GeochunkError::NoDataForLocation {
            location: location.to_string(),
            available,
        });
    }
    Ok(links)
}

/// Read one tile: newline-delimited GeoJSON features.
///
/// Malformed lines are logged and skipped; they never abort the tile.
pub fn read_tile<R: BufRead>(reader: R, source: &str) -> Vec<Feature> {
    let mut features = Vec::new();
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::warn!("tile '{source}': read error, dropping remainder: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let parsed = serde_json::from_str::<geojson::Feature>(&line)
            .map_err(GeochunkError::from)
            .and_then(Feature::from_geojson);
        match parsed {
            Ok(feature) => features.push(feature),
            Err(e) => log::warn!("tile '{source}': skipping feature: {e}"),
        }
    }
    features
}

/// Download every tile for a location and merge into one collection.
///
/// A tile that fails to download or decompress is logged and skipped. Fails
/// with [`GeochunkError::SourceUnavailable`] only when no tile yielded any
/// features at all.
pub fn download_location(
    links: &[&CatalogEntry],
    progress: &dyn ProgressObserver,
) -> Result<FeatureCollection> {
    let mut collection = FeatureCollection::default();

    progress.begin("download", links.len());
    for entry in links {
        match reqwest::blocking::get(&entry.url).and_then(|r| r.error_for_status()) {
            Ok(response) => {
                let reader = BufReader::new(GzDecoder::new(response));
                let features = read_tile(reader, &entry.quad_key);
                log::info!(
                    "tile '{}': {} features",
                    entry.quad_key,
                    features.len()
                );
                collection.features.extend(features);
            }
            Err(e) => {
                log::warn!("tile '{}': download failed, skipping: {e}", entry.quad_key);
            }
        }
        progress.advance();
    }
    progress.finish("download");

    if collection.is_empty() {
        return Err(GeochunkError::SourceUnavailable(
            "no tile data could be processed".to_string(),
        ));
    }
    Ok(collection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    const CATALOG_CSV: &str = "\
Location,QuadKey,Url,Size
Kenya,122331,https://example.com/kenya-1.csv.gz,12MB
Kenya,122333,https://example.com/kenya-2.csv.gz,9MB
Peru,031133,https://example.com/peru-1.csv.gz,44MB
";

    #[test]
    fn test_parse_catalog() {
        let catalog = parse_catalog(CATALOG_CSV.as_bytes()).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog[0].location, "Kenya");
        assert_eq!(catalog[2].quad_key, "031133");
        assert_eq!(catalog[1].size.as_deref(), Some("9MB"));
    }

    #[test]
    fn test_links_for_location() {
        let catalog = parse_catalog(CATALOG_CSV.as_bytes()).unwrap();
        let links = links_for_location(&catalog, "Kenya").unwrap();
        assert_eq!(links.len(), 2);
        assert!(links.iter().all(|e| e.location == "Kenya"));
    }

    #[test]
    fn test_unknown_location_lists_alternatives() {
        let catalog = parse_catalog(CATALOG_CSV.as_bytes()).unwrap();
        match links_for_location(&catalog, "Atlantis") {
            Err(GeochunkError::NoDataForLocation {
                location,
                available,
            }) => {
                assert_eq!(location, "Atlantis");
                assert_eq!(available, vec!["Kenya".to_string(), "Peru".to_string()]);
            }
            other => panic!("expected NoDataForLocation, got {other:?}"),
        }
    }

    #[test]
    fn test_read_tile_skips_malformed_lines() {
        let tile = concat!(
            r#"{"type":"Feature","geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]},"properties":{"height":4.0}}"#,
            "\n",
            "{ not a feature\n",
            "\n",
            r#"{"type":"Feature","geometry":{"type":"Polygon","coordinates":[[[2,2],[3,2],[3,3],[2,3],[2,2]]]},"properties":{"height":7.0}}"#,
            "\n",
        );
        let features = read_tile(tile.as_bytes(), "122331");
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].attributes["height"], serde_json::json!(4.0));
    }

    #[test]
    fn test_read_tile_through_gzip() {
        let line = concat!(
            r#"{"type":"Feature","geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]},"properties":{"height":4.0}}"#,
            "\n",
        );
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(line.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();

        let reader = BufReader::new(GzDecoder::new(compressed.as_slice()));
        let features = read_tile(reader, "gz");
        assert_eq!(features.len(), 1);
    }
}
