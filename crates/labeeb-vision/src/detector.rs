//! Object-detection collaborator.

use std::time::Duration;

use async_trait::async_trait;
use labeeb_core::LabeebError;
use serde::{Deserialize, Serialize};

/// Axis-aligned box in pixel coordinates, `(x1, y1)` top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Integer centre point.
    pub fn center(&self) -> (i32, i32) {
        ((self.x1 + self.x2) / 2, (self.y1 + self.y2) / 2)
    }

    /// Whether `point` lies strictly inside the box.
    pub fn strictly_contains(&self, (x, y): (i32, i32)) -> bool {
        self.x1 < x && x < self.x2 && self.y1 < y && y < self.y2
    }
}

impl From<[i32; 4]> for BoundingBox {
    fn from([x1, y1, x2, y2]: [i32; 4]) -> Self {
        Self::new(x1, y1, x2, y2)
    }
}

impl From<BoundingBox> for [i32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// People and phones seen in one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detections {
    #[serde(default)]
    pub people: Vec<BoundingBox>,
    #[serde(default)]
    pub phones: Vec<BoundingBox>,
}

impl Detections {
    /// Whether any phone's centre lies inside any person box.
    pub fn phone_in_hand(&self) -> bool {
        self.phones.iter().any(|phone| {
            let c = phone.center();
            self.people.iter().any(|person| person.strictly_contains(c))
        })
    }
}

/// Detects people and phones in the current camera frame.
#[async_trait]
pub trait ObjectDetector: Send + Sync {
    async fn detect(&self) -> Result<Detections, LabeebError>;
}

/// Detector service that owns the camera and answers each GET with the
/// detections for its latest frame.
#[derive(Debug, Clone)]
pub struct HttpDetector {
    client: reqwest::Client,
    url: String,
}

impl HttpDetector {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, LabeebError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LabeebError::Config(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ObjectDetector for HttpDetector {
    async fn detect(&self) -> Result<Detections, LabeebError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| LabeebError::Vision(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LabeebError::Vision(format!("detector returned {}", status)));
        }

        response
            .json()
            .await
            .map_err(|e| LabeebError::Vision(format!("malformed detections: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_uses_integer_division() {
        assert_eq!(BoundingBox::new(0, 0, 5, 5).center(), (2, 2));
        assert_eq!(BoundingBox::new(10, 20, 30, 60).center(), (20, 40));
    }

    #[test]
    fn test_containment_is_strict() {
        let person = BoundingBox::new(0, 0, 100, 200);
        assert!(person.strictly_contains((50, 100)));
        assert!(!person.strictly_contains((0, 100)));
        assert!(!person.strictly_contains((100, 100)));
        assert!(!person.strictly_contains((50, 200)));
    }

    #[test]
    fn test_phone_in_hand() {
        let detections = Detections {
            people: vec![BoundingBox::new(100, 100, 300, 500)],
            phones: vec![BoundingBox::new(180, 250, 220, 310)],
        };
        assert!(detections.phone_in_hand());

        let apart = Detections {
            people: vec![BoundingBox::new(100, 100, 300, 500)],
            phones: vec![BoundingBox::new(400, 100, 450, 160)],
        };
        assert!(!apart.phone_in_hand());

        let no_people = Detections {
            people: vec![],
            phones: vec![BoundingBox::new(180, 250, 220, 310)],
        };
        assert!(!no_people.phone_in_hand());
    }

    #[test]
    fn test_detections_wire_format() {
        let raw = r#"{"people": [[10, 20, 110, 220]], "phones": []}"#;
        let d: Detections = serde_json::from_str(raw).unwrap();
        assert_eq!(d.people, vec![BoundingBox::new(10, 20, 110, 220)]);
        assert!(d.phones.is_empty());

        let d: Detections = serde_json::from_str("{}").unwrap();
        assert_eq!(d, Detections::default());
    }
}
