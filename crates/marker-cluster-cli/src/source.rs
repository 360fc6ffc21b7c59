//! Element sources: GPX files and a synthetic spiral

use crate::CliError;
use marker_cluster_lib::{GeoPoint, MapElement};
use std::path::Path;
use std::sync::Arc;

/// One located point read from a GPX file or generated
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub id: String,
    pub at: GeoPoint,
    pub note: Option<String>,
}

impl MapElement for Place {
    fn id(&self) -> Option<&str> {
        Some(&self.id)
    }

    fn location(&self) -> GeoPoint {
        self.at
    }

    fn sort_key(&self) -> Option<&str> {
        self.note.as_deref()
    }
}

/// Every waypoint and track point of a parsed GPX document
///
/// Waypoints keep their name as id when they have one; everything else is named after
/// `source` and its position in the file.
pub fn places_from_gpx(gpx: &gpx::Gpx, source: &str) -> Vec<Place> {
    let waypoints = gpx.waypoints.iter().enumerate().map(|(i, waypoint)| Place {
        id: waypoint
            .name
            .clone()
            .unwrap_or_else(|| format!("{source}:wpt{i}")),
        at: GeoPoint::from(waypoint.point()),
        note: waypoint.description.clone().or_else(|| waypoint.comment.clone()),
    });

    let track_points = gpx.tracks.iter().enumerate().flat_map(|(t, track)| {
        track
            .segments
            .iter()
            .flat_map(|segment| segment.points.iter())
            .enumerate()
            .map(move |(i, point)| Place {
                id: format!("{source}:trk{t}:{i}"),
                at: GeoPoint::from(point.point()),
                note: track.name.clone(),
            })
    });

    waypoints.chain(track_points).collect()
}

/// Load and concatenate the places of several GPX files
pub fn load_gpx_files<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Arc<Place>>, CliError> {
    let mut places = Vec::new();
    for path in paths {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let gpx = gpx::read(reader)?;
        let source = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let loaded = places_from_gpx(&gpx, &source);
        tracing::info!("Loaded {} places from {}", loaded.len(), path.display());
        places.extend(loaded.into_iter().map(Arc::new));
    }
    Ok(places)
}

/// Deterministic spiral of `count` places around Madrid, dense in the middle
pub fn synthetic(count: usize) -> Vec<Arc<Place>> {
    const CENTER: GeoPoint = GeoPoint::new(40.4168, -3.7038);
    const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;

    (0..count)
        .map(|i| {
            let t = (i as f64 + 0.5) / count.max(1) as f64;
            let angle = i as f64 * GOLDEN_ANGLE;
            let radius = t.sqrt() * 3.0;
            Arc::new(Place {
                id: format!("synthetic-{i}"),
                at: GeoPoint::new(
                    CENTER.lat + radius * angle.sin(),
                    CENTER.lng + radius * angle.cos(),
                ),
                note: Some(format!("{i:05}")),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <wpt lat="40.0" lon="20.0"><name>Summit</name><desc>Highest point</desc></wpt>
  <wpt lat="42.0" lon="21.0"></wpt>
  <trk>
    <name>Ridge</name>
    <trkseg>
      <trkpt lat="44.0" lon="21.0"></trkpt>
      <trkpt lat="20.0" lon="2.0"></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

    #[test]
    fn test_gpx_places() {
        let gpx = gpx::read(SAMPLE.as_bytes()).unwrap();
        let places = places_from_gpx(&gpx, "sample");
        assert_eq!(places.len(), 4);

        assert_eq!(places[0].id, "Summit");
        assert_eq!(places[0].at, GeoPoint::new(40.0, 20.0));
        assert_eq!(places[0].sort_key(), Some("Highest point"));

        assert_eq!(places[1].id, "sample:wpt1");
        assert_eq!(places[1].sort_key(), None);

        assert_eq!(places[2].id, "sample:trk0:0");
        assert_eq!(places[3].at, GeoPoint::new(20.0, 2.0));
        assert_eq!(places[3].sort_key(), Some("Ridge"));
    }

    #[test]
    fn test_synthetic_is_deterministic_and_located() {
        let first = synthetic(50);
        let second = synthetic(50);
        assert_eq!(first.len(), 50);
        assert!(first.iter().zip(&second).all(|(a, b)| a == b));
        assert!(first.iter().all(|place| !place.location().is_unknown()));
        assert!(synthetic(0).is_empty());
    }
}
