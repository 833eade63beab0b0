//! Collection schema descriptors
//!
//! A `SchemaDescriptor` is declared once per collection at startup and shared
//! by reference. It is the only source of truth for which field names a
//! filter, search or cursor may touch.

use crate::errors::StoreError;
use crate::validation::{camel_to_snake, ValidatedFieldName, ValidatedTableName};
use std::collections::HashSet;
use type_mapping::{FieldConstraints, FieldType};

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    name: ValidatedFieldName,
    field_type: FieldType,
    constraints: FieldConstraints,
}

impl FieldDescriptor {
    pub fn new(name: &str, field_type: FieldType) -> Result<Self, StoreError> {
        Self::with_constraints(name, field_type, FieldConstraints::default())
    }

    pub fn with_constraints(
        name: &str,
        field_type: FieldType,
        constraints: FieldConstraints,
    ) -> Result<Self, StoreError> {
        Ok(Self {
            name: ValidatedFieldName::new(name)?,
            field_type,
            constraints,
        })
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn constraints(&self) -> &FieldConstraints {
        &self.constraints
    }
}

#[derive(Debug, Clone)]
pub struct SchemaDescriptor {
    collection: String,
    table: Option<ValidatedTableName>,
    primary_key: FieldDescriptor,
    data_fields: Vec<FieldDescriptor>,
    paginate_on: usize,
}

impl SchemaDescriptor {
    pub fn builder(collection: &str) -> SchemaBuilder {
        SchemaBuilder {
            collection: collection.to_string(),
            table: None,
            primary_key: None,
            data_fields: Vec::new(),
            paginate_on: None,
        }
    }

    /// Name embedded in cursors and used as the default `__typename`
    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn table(&self) -> Option<&ValidatedTableName> {
        self.table.as_ref()
    }

    pub fn primary_key(&self) -> &FieldDescriptor {
        &self.primary_key
    }

    pub fn data_fields(&self) -> &[FieldDescriptor] {
        &self.data_fields
    }

    /// Primary key first, then data fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        std::iter::once(&self.primary_key).chain(self.data_fields.iter())
    }

    /// Exact-name lookup over the primary key and the data fields
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields().find(|f| f.name() == name)
    }

    /// Lookup accepting API-style camelCase names as well as column names
    pub fn resolve_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.field(name)
            .or_else(|| self.field(&camel_to_snake(name)))
    }

    /// Like `resolve_field`, failing with `UnknownField`
    pub fn require_field(&self, name: &str) -> Result<&FieldDescriptor, StoreError> {
        self.resolve_field(name)
            .ok_or_else(|| StoreError::unknown_field(&self.collection, name))
    }

    /// The single field this collection is ordered and paginated on
    pub fn pagination_field(&self) -> &FieldDescriptor {
        if self.paginate_on == 0 {
            &self.primary_key
        } else {
            &self.data_fields[self.paginate_on - 1]
        }
    }
}

pub struct SchemaBuilder {
    collection: String,
    table: Option<String>,
    primary_key: Option<(String, FieldType, FieldConstraints)>,
    data_fields: Vec<(String, FieldType, FieldConstraints)>,
    paginate_on: Option<String>,
}

impl SchemaBuilder {
    pub fn table(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    pub fn primary_key(mut self, name: &str, field_type: FieldType) -> Self {
        self.primary_key = Some((name.to_string(), field_type, FieldConstraints::default()));
        self
    }

    pub fn field(self, name: &str, field_type: FieldType) -> Self {
        self.field_with(name, field_type, FieldConstraints::default())
    }

    pub fn field_with(mut self, name: &str, field_type: FieldType, constraints: FieldConstraints) -> Self {
        self.data_fields.push((name.to_string(), field_type, constraints));
        self
    }

    /// Defaults to the primary key
    pub fn paginate_on(mut self, name: &str) -> Self {
        self.paginate_on = Some(name.to_string());
        self
    }

    pub fn build(self) -> Result<SchemaDescriptor, StoreError> {
        if self.collection.is_empty() || self.collection.contains(':') {
            return Err(StoreError::Schema(format!(
                "collection name '{}' must be non-empty and must not contain ':'",
                self.collection
            )));
        }

        let (pk_name, pk_type, pk_constraints) = self.primary_key.ok_or_else(|| {
            StoreError::Schema(format!("{} declares no primary key", self.collection))
        })?;
        let primary_key = FieldDescriptor::with_constraints(&pk_name, pk_type, pk_constraints)?;

        let data_fields = self
            .data_fields
            .into_iter()
            .map(|(name, ty, constraints)| FieldDescriptor::with_constraints(&name, ty, constraints))
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = HashSet::new();
        for field in std::iter::once(&primary_key).chain(data_fields.iter()) {
            if !seen.insert(field.name()) {
                return Err(StoreError::Schema(format!(
                    "{} declares field '{}' twice",
                    self.collection,
                    field.name()
                )));
            }
        }

        let paginate_on = match self.paginate_on {
            None => 0,
            Some(name) if name == primary_key.name() => 0,
            Some(name) => data_fields
                .iter()
                .position(|f| f.name() == name)
                .map(|i| i + 1)
                .ok_or_else(|| StoreError::unknown_field(&self.collection, &name))?,
        };

        let table = self.table.as_deref().map(ValidatedTableName::new).transpose()?;

        let schema = SchemaDescriptor {
            collection: self.collection,
            table,
            primary_key,
            data_fields,
            paginate_on,
        };

        let pagination_type = schema.pagination_field().field_type();
        if matches!(pagination_type, FieldType::Json | FieldType::Boolean) {
            return Err(StoreError::Schema(format!(
                "{} cannot paginate on a {:?} field",
                schema.collection, pagination_type
            )));
        }

        Ok(schema)
    }
}
