//! Admin editing workflow.
//!
//! Translates free-form form input into well-formed tour records: presence
//! validation, region parsing, newline-splitting of the textarea fields,
//! running the itinerary codec, and id/timestamp stamping. Also prepares
//! the edit form for existing records, synthesizing itinerary text for
//! records that predate the raw-text format.

use chrono::Utc;

use crate::errors::AppError;
use crate::itinerary;
use crate::models::{Region, TourForm, TourRecord};

/// Split a textarea value into trimmed, non-blank lines.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Build a persistable record from form input.
///
/// Pass the existing record when editing so its id and creation time are
/// preserved; `updated_at` is always stamped. All missing required fields
/// are reported together; nothing is dispatched on a failed validation.
pub fn build_record(
    form: &TourForm,
    existing: Option<&TourRecord>,
) -> Result<TourRecord, AppError> {
    let required = [
        ("title", &form.title),
        ("slug", &form.slug),
        ("region", &form.region),
        ("duration", &form.duration),
        ("transport", &form.transport),
        ("image", &form.image),
        ("itineraryText", &form.itinerary_text),
        ("includedServices", &form.included_services),
        ("excludedServices", &form.excluded_services),
        ("policies", &form.policies),
    ];
    let missing: Vec<String> = required
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(AppError::missing_fields(missing));
    }

    // Unrecognized regions are rejected here, not at storage.
    let region = Region::from_str(form.region.trim()).ok_or_else(|| AppError::Validation {
        message: format!("Unknown region: {}", form.region),
        fields: vec!["region".to_string()],
    })?;

    let price = form.price.trim();
    let now = Utc::now().to_rfc3339();

    Ok(TourRecord {
        id: existing
            .map(|t| t.id.clone())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        slug: form.slug.trim().to_string(),
        title: form.title.trim().to_string(),
        region,
        image: form.image.trim().to_string(),
        price: (!price.is_empty()).then(|| price.to_string()),
        duration: form.duration.trim().to_string(),
        transport: form.transport.trim().to_string(),
        summary: String::new(),
        itinerary: itinerary::decode(&form.itinerary_text),
        itinerary_text: Some(form.itinerary_text.clone()),
        included_services: split_lines(&form.included_services),
        excluded_services: split_lines(&form.excluded_services),
        policies: split_lines(&form.policies),
        policies_text: Some(form.policies.clone()),
        gallery: split_lines(&form.gallery),
        created_at: existing
            .map(|t| t.created_at.clone())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| now.clone()),
        updated_at: now,
    })
}

/// Prepare the form for editing an existing record.
///
/// List fields join back into textarea values; records without itinerary
/// text get one synthesized from their legacy structured steps.
pub fn edit_form(record: &TourRecord) -> TourForm {
    let itinerary_text = record
        .itinerary_text
        .clone()
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| itinerary::encode(&record.itinerary));

    TourForm {
        title: record.title.clone(),
        slug: record.slug.clone(),
        region: record.region.as_str().to_string(),
        duration: record.duration.clone(),
        transport: record.transport.clone(),
        price: record.price.clone().unwrap_or_default(),
        image: record.image.clone(),
        gallery: record.gallery.join("\n"),
        itinerary_text,
        included_services: record.included_services.join("\n"),
        excluded_services: record.excluded_services.join("\n"),
        policies: record
            .policies_text
            .clone()
            .unwrap_or_else(|| record.policies.join("\n")),
    }
}
