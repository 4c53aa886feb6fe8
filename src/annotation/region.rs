//! Hazard regions and per-image region sets

use serde::{Deserialize, Serialize};

use crate::geometry::{point_in_region, NormalizedRect, RatioPoint};

/// Drawn shape of a region. Only affects rendering; hit testing always uses the rect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RegionShape {
    #[default]
    #[serde(rename = "rect", alias = "rectangle")]
    Rectangle,
    #[serde(rename = "circle", alias = "ellipse")]
    Ellipse,
}

/// A labeled hazard hotspot on one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    /// Region identifier (`anno-<uuid>`)
    pub id: String,
    #[serde(default)]
    pub shape: RegionShape,
    /// Normalized bounds on the image
    pub rect: NormalizedRect,
    /// Opaque reference to a knowledge-taxonomy entry
    pub clause_id: String,
    /// Points awarded when found
    pub score_weight: u32,
    #[serde(default)]
    pub description: String,
}

impl Region {
    pub fn contains(&self, point: RatioPoint) -> bool {
        point_in_region(point, &self.rect)
    }
}

/// A completed draw gesture waiting for a taxonomy selection
#[derive(Debug, Clone, PartialEq)]
pub struct RegionDraft {
    pub id: String,
    pub shape: RegionShape,
    pub rect: NormalizedRect,
    /// Weight suggested to the classifier; the final weight is given at classification
    pub suggested_weight: u32,
}

impl RegionDraft {
    pub(crate) fn new(shape: RegionShape, rect: NormalizedRect, suggested_weight: u32) -> Self {
        Self {
            id: new_region_id(),
            shape,
            rect,
            suggested_weight,
        }
    }

    pub(crate) fn into_region(self, clause_id: String, score_weight: u32, description: String) -> Region {
        Region {
            id: self.id,
            shape: self.shape,
            rect: self.rect,
            clause_id,
            score_weight,
            description,
        }
    }
}

pub fn new_region_id() -> String {
    format!("anno-{}", uuid::Uuid::new_v4())
}

/// Ordered regions of one image. Insertion order is display order (#1, #2, ...)
/// and decides which region wins when overlapping regions are clicked.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionSet {
    regions: Vec<Region>,
}

impl RegionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Region> {
        self.regions.iter()
    }

    pub fn as_slice(&self) -> &[Region] {
        &self.regions
    }

    pub fn get(&self, id: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Region> {
        self.regions.iter_mut().find(|r| r.id == id)
    }

    /// 1-based display number of a region
    pub fn display_number(&self, id: &str) -> Option<usize> {
        self.regions.iter().position(|r| r.id == id).map(|i| i + 1)
    }

    pub(crate) fn push(&mut self, region: Region) {
        self.regions.push(region);
    }

    pub(crate) fn remove(&mut self, id: &str) -> Option<Region> {
        let pos = self.regions.iter().position(|r| r.id == id)?;
        Some(self.regions.remove(pos))
    }

    /// First region containing the point, in set order
    pub fn hit_test(&self, point: RatioPoint) -> Option<&Region> {
        self.regions.iter().find(|r| r.contains(point))
    }

    /// Sum of score weights over all regions
    pub fn total_weight(&self) -> u32 {
        self.regions.iter().map(|r| r.score_weight).sum()
    }
}

impl From<Vec<Region>> for RegionSet {
    fn from(regions: Vec<Region>) -> Self {
        Self { regions }
    }
}

impl FromIterator<Region> for RegionSet {
    fn from_iter<I: IntoIterator<Item = Region>>(iter: I) -> Self {
        Self {
            regions: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a RegionSet {
    type Item = &'a Region;
    type IntoIter = std::slice::Iter<'a, Region>;

    fn into_iter(self) -> Self::IntoIter {
        self.regions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(id: &str, rect: NormalizedRect, weight: u32) -> Region {
        Region {
            id: id.to_string(),
            shape: RegionShape::Rectangle,
            rect,
            clause_id: "c-1".to_string(),
            score_weight: weight,
            description: String::new(),
        }
    }

    #[test]
    fn test_hit_test_first_in_order_wins() {
        let set: RegionSet = vec![
            region("small", NormalizedRect::new(0.4, 0.4, 0.1, 0.1), 5),
            region("large", NormalizedRect::new(0.0, 0.0, 1.0, 1.0), 20),
        ]
        .into();

        let hit = set.hit_test(RatioPoint::new(0.45, 0.45)).unwrap();
        assert_eq!(hit.id, "small");

        let hit = set.hit_test(RatioPoint::new(0.9, 0.9)).unwrap();
        assert_eq!(hit.id, "large");
    }

    #[test]
    fn test_display_number_and_total_weight() {
        let set: RegionSet = vec![
            region("a", NormalizedRect::new(0.0, 0.0, 0.1, 0.1), 10),
            region("b", NormalizedRect::new(0.5, 0.5, 0.1, 0.1), 15),
        ]
        .into();
        assert_eq!(set.display_number("b"), Some(2));
        assert_eq!(set.display_number("zzz"), None);
        assert_eq!(set.total_weight(), 25);
    }

    #[test]
    fn test_region_json_matches_persisted_layout() {
        let json = r#"{
            "id": "anno-1",
            "shape": "circle",
            "rect": {"x": 0.1, "y": 0.2, "w": 0.3, "h": 0.4},
            "clauseId": "k-7",
            "scoreWeight": 15,
            "description": "Exposed wiring"
        }"#;
        let parsed: Region = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.shape, RegionShape::Ellipse);
        assert_eq!(parsed.clause_id, "k-7");
        assert_eq!(parsed.score_weight, 15);

        let out = serde_json::to_value(&parsed).unwrap();
        assert_eq!(out["shape"], "circle");
        assert_eq!(out["scoreWeight"], 15);
    }

    #[test]
    fn test_shape_accepts_long_names() {
        let shape: RegionShape = serde_json::from_str(r#""ellipse""#).unwrap();
        assert_eq!(shape, RegionShape::Ellipse);
        let shape: RegionShape = serde_json::from_str(r#""rectangle""#).unwrap();
        assert_eq!(shape, RegionShape::Rectangle);
    }

    #[test]
    fn test_region_id_prefix() {
        assert!(new_region_id().starts_with("anno-"));
    }
}
