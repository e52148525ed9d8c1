//! Tour model matching the frontend TourItem interface.

use serde::{Deserialize, Deserializer, Serialize};

/// Geographic catalog partition. Every tour belongs to exactly one region.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Region {
    BinhDinh,
    MienTrungTayNguyen,
    MienNam,
    MienBac,
}

impl Region {
    pub const ALL: [Region; 4] = [
        Region::BinhDinh,
        Region::MienTrungTayNguyen,
        Region::MienNam,
        Region::MienBac,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::BinhDinh => "BinhDinh",
            Region::MienTrungTayNguyen => "MienTrungTayNguyen",
            Region::MienNam => "MienNam",
            Region::MienBac => "MienBac",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "BinhDinh" => Some(Region::BinhDinh),
            "MienTrungTayNguyen" => Some(Region::MienTrungTayNguyen),
            "MienNam" => Some(Region::MienNam),
            "MienBac" => Some(Region::MienBac),
            _ => None,
        }
    }

    /// Human-readable label shown in listings.
    pub fn display_name(&self) -> &'static str {
        match self {
            Region::BinhDinh => "Bình Định",
            Region::MienTrungTayNguyen => "Miền Trung & Tây Nguyên",
            Region::MienNam => "Miền Nam",
            Region::MienBac => "Miền Bắc",
        }
    }
}

/// One step of the day-by-day plan.
///
/// Only `time`/`activity`/`description` are produced by the itinerary text
/// decoder; the remaining fields are presentation extras carried for records
/// authored before the raw-text format existed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryStep {
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub activity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_title: Option<String>,
}

/// Legacy records store itinerary entries as plain strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ItineraryEntry {
    Text(String),
    Step(ItineraryStep),
}

/// Accepts both detailed step objects and legacy strings, normalizing the
/// latter to activity-only steps.
fn steps_or_strings<'de, D>(deserializer: D) -> Result<Vec<ItineraryStep>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Vec::<ItineraryEntry>::deserialize(deserializer)?;
    Ok(entries
        .into_iter()
        .map(|entry| match entry {
            ItineraryEntry::Text(activity) => ItineraryStep {
                activity,
                ..Default::default()
            },
            ItineraryEntry::Step(step) => step,
        })
        .collect())
}

/// A tour package: one catalog entry representing a bookable trip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TourRecord {
    /// Assigned once at creation, immutable afterwards.
    #[serde(default)]
    pub id: String,
    /// Human-readable URL key; unique among records.
    pub slug: String,
    pub title: String,
    pub region: Region,
    /// Primary cover image reference.
    pub image: String,
    /// Absent means "contact for price", not zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    pub duration: String,
    pub transport: String,
    #[serde(default)]
    pub summary: String,
    /// Structured mirror of `itinerary_text`, kept for records created
    /// before the raw-text format. Not authoritative once the text exists.
    #[serde(default, deserialize_with = "steps_or_strings")]
    pub itinerary: Vec<ItineraryStep>,
    /// Raw authored text; the source of truth for rendering when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub itinerary_text: Option<String>,
    #[serde(default)]
    pub included_services: Vec<String>,
    #[serde(default)]
    pub excluded_services: Vec<String>,
    #[serde(default)]
    pub policies: Vec<String>,
    /// Raw mirror of `policies`, preserved verbatim from the text editor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policies_text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gallery: Vec<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl TourRecord {
    /// Gallery for display; an empty gallery falls back to the cover image.
    pub fn display_gallery(&self) -> Vec<String> {
        if self.gallery.is_empty() {
            vec![self.image.clone()]
        } else {
            self.gallery.clone()
        }
    }

    /// Price label for display; absent prices show the contact prompt.
    pub fn price_label(&self) -> &str {
        self.price.as_deref().unwrap_or("Liên hệ")
    }
}

/// Detail-page payload: the record plus its derived display fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TourDetailView {
    pub tour: TourRecord,
    pub gallery: Vec<String>,
    pub price_label: String,
    pub region_label: String,
}

impl TourDetailView {
    pub fn new(tour: TourRecord) -> Self {
        let gallery = tour.display_gallery();
        let price_label = tour.price_label().to_string();
        let region_label = tour.region.display_name().to_string();
        Self {
            tour,
            gallery,
            price_label,
            region_label,
        }
    }
}

/// Admin form input for creating or updating a tour.
///
/// List-valued fields arrive as newline-delimited textarea content; all
/// fields default to empty so presence validation can report every missing
/// field at once instead of failing on the first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TourForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub transport: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub gallery: String,
    #[serde(default)]
    pub itinerary_text: String,
    #[serde(default)]
    pub included_services: String,
    #[serde(default)]
    pub excluded_services: String,
    #[serde(default)]
    pub policies: String,
}
