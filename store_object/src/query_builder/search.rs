//! Free-text search across every field a term could plausibly match
//!
//! The shape of the term decides which field *types* are eligible; every
//! eligible field contributes an equality fragment and the fragments are ORed.

use crate::query_builder::predicate::Predicate;
use crate::schema::{FieldDescriptor, SchemaDescriptor};
use type_mapping::{FieldType, FieldValue};
use uuid::Uuid;

/// What a search term looks like
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchShape {
    pub digits: bool,
    pub small_int: bool,
    pub decimal: bool,
    pub uuid: bool,
    pub boolean: bool,
}

impl SearchShape {
    pub fn of(term: &str) -> Self {
        let digits = !term.is_empty() && term.chars().all(|c| c.is_ascii_digit());
        let small_int = digits && term.parse::<i16>().is_ok();

        Self {
            digits,
            small_int,
            decimal: digits || is_decimal(term),
            uuid: is_uuid4(term),
            boolean: term == "true" || term == "false",
        }
    }

    /// Whether a field of this type could hold the term
    pub fn admits(&self, field_type: FieldType) -> bool {
        match field_type {
            FieldType::Char | FieldType::Text => true,
            FieldType::SmallInt => self.small_int,
            FieldType::Int | FieldType::BigInt => self.digits,
            FieldType::Float | FieldType::Decimal => self.decimal,
            FieldType::Uuid => self.uuid,
            FieldType::Boolean => self.boolean,
            FieldType::Date | FieldType::Timestamp | FieldType::TimestampTz | FieldType::Json => false,
        }
    }
}

/// Builds the disjunctive search predicate
pub struct SearchPredicateBuilder;

impl SearchPredicateBuilder {
    /// Never fails: a term no field can hold yields a predicate matching nothing
    pub fn build(schema: &SchemaDescriptor, term: &str) -> Predicate {
        let shape = SearchShape::of(term);
        let term_length = term.chars().count();

        let primary_key = schema.primary_key();
        let pk_fragment = shape
            .admits(primary_key.field_type())
            .then(|| fragment(primary_key, term))
            .flatten();

        let data_fragments = schema.data_fields().iter().filter_map(|field| {
            if !shape.admits(field.field_type()) || !field.constraints().admits_length(term_length) {
                return None;
            }
            fragment(field, term)
        });

        let fragments: Vec<Predicate> = pk_fragment.into_iter().chain(data_fragments).collect();

        #[cfg(feature = "debug-logging")]
        tracing::debug!(
            collection = schema.collection(),
            term = term,
            eligible = fragments.len(),
            "built search predicate"
        );

        Predicate::or(fragments)
    }
}

// A term that passes the shape test but still cannot be held by the column
// (an integer beyond i32 for an INTEGER field) contributes nothing
fn fragment(field: &FieldDescriptor, term: &str) -> Option<Predicate> {
    FieldValue::parse_as(field.field_type(), term)
        .ok()
        .map(|value| Predicate::eq(field.name(), value))
}

fn is_decimal(term: &str) -> bool {
    match term.split_once('.') {
        Some((whole, fraction)) => {
            !(whole.is_empty() && fraction.is_empty())
                && whole.chars().all(|c| c.is_ascii_digit())
                && fraction.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

/// A canonical lowercase version-4 UUID, hyphenated or not
fn is_uuid4(term: &str) -> bool {
    match Uuid::try_parse(term) {
        Ok(uuid) => {
            uuid.get_version_num() == 4
                && uuid.get_variant() == uuid::Variant::RFC4122
                && uuid.simple().to_string() == term.replace('-', "")
        }
        Err(_) => false,
    }
}
