//! Rated disabilities normalization
//!
//! Accepts the snake_case and camelCase generations of the ratings payload,
//! with or without the `{data: {attributes}}` envelope.

use super::fields::{to_array, to_bool, to_date, to_i64, to_string_opt, Field, RecordView};
use serde_json::Value;
use vetclaim_common::model::{IndividualRating, Rating};

use Field::Attr;

const COMBINED: &[Field] = &[
    Attr("combinedDisabilityRating"),
    Attr("combined_disability_rating"),
    Attr("combinedRating"),
];
const INDIVIDUAL: &[Field] = &[
    Attr("individualRatings"),
    Attr("individual_ratings"),
];

const NAME: &[Field] = &[Attr("name"), Attr("diagnosticText"), Attr("diagnostic_text")];
const PERCENT: &[Field] = &[
    Attr("ratingPercentage"),
    Attr("rating_percentage"),
    Attr("rating"),
];
const DIAGNOSTIC_CODE: &[Field] = &[
    Attr("diagnosticCode"),
    Attr("diagnostic_code"),
    Attr("diagnosticTypeCode"),
    Attr("diagnostic_type_code"),
];
const EFFECTIVE_DATE: &[Field] = &[Attr("effectiveDate"), Attr("effective_date")];
const STATIC: &[Field] = &[Attr("staticInd"), Attr("static_ind"), Attr("static")];

/// `None` when the payload carries neither a combined nor an individual rating
pub fn normalize_rating(raw: &Value) -> Option<Rating> {
    let root = raw.get("data").filter(|d| d.is_object()).unwrap_or(raw);
    if !root.is_object() {
        return None;
    }

    let view = RecordView::new(root);
    let combined = view.first(COMBINED);
    let individual = view.first(INDIVIDUAL);
    if combined.is_none() && individual.is_none() {
        return None;
    }

    Some(Rating {
        combined_rating: combined.and_then(to_i64),
        individual_ratings: to_array(individual)
            .iter()
            .filter(|r| r.is_object())
            .map(normalize_individual)
            .collect(),
    })
}

fn normalize_individual(raw: &Value) -> IndividualRating {
    let view = RecordView::new(raw);
    IndividualRating {
        name: view.first_map(NAME, to_string_opt),
        rating: view.first_map(PERCENT, to_i64),
        diagnostic_code: view.first_map(DIAGNOSTIC_CODE, to_string_opt),
        effective_date: view.first_map(EFFECTIVE_DATE, to_date),
        is_static: to_bool(view.first(STATIC)),
    }
}
