use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::models::{Field, Municipality, PropertyDraft, PropertyRecord};

/// Inclusive upper bounds for the six measures.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationLimits {
    pub size_terrain: f64,
    pub size_construction: f64,
    pub rooms: f64,
    pub bathrooms: f64,
    pub parking: f64,
    pub age: f64,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            size_terrain: 10_000.0,
            size_construction: 10_000.0,
            rooms: 20.0,
            bathrooms: 20.0,
            parking: 20.0,
            age: 100.0,
        }
    }
}

impl ValidationLimits {
    pub fn ceiling(&self, field: Field) -> Option<f64> {
        match field {
            Field::SizeTerrain => Some(self.size_terrain),
            Field::SizeConstruction => Some(self.size_construction),
            Field::Rooms => Some(self.rooms),
            Field::Bathrooms => Some(self.bathrooms),
            Field::Parking => Some(self.parking),
            Field::Age => Some(self.age),
            Field::Lat | Field::Lng | Field::Municipality => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateCheck {
    Presence,
    Municipality,
    NumericType,
    Range,
}

impl GateCheck {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Presence => "presence",
            Self::Municipality => "municipality",
            Self::NumericType => "numeric_type",
            Self::Range => "range",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum ValidationFailure {
    MissingFields { fields: Vec<Field> },
    InvalidMunicipality { value: String },
    InvalidNumbers { fields: Vec<Field> },
    OutOfRange { fields: Vec<Field> },
}

impl ValidationFailure {
    pub fn check(&self) -> GateCheck {
        match self {
            Self::MissingFields { .. } => GateCheck::Presence,
            Self::InvalidMunicipality { .. } => GateCheck::Municipality,
            Self::InvalidNumbers { .. } => GateCheck::NumericType,
            Self::OutOfRange { .. } => GateCheck::Range,
        }
    }

    pub fn fields(&self) -> &[Field] {
        match self {
            Self::MissingFields { fields }
            | Self::InvalidNumbers { fields }
            | Self::OutOfRange { fields } => fields,
            Self::InvalidMunicipality { .. } => &[Field::Municipality],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationGate {
    limits: ValidationLimits,
}

impl ValidationGate {
    pub fn new(limits: ValidationLimits) -> Self {
        Self { limits }
    }

    /// Runs presence, municipality, numeric type and range checks in that order.
    pub fn evaluate(&self, draft: &PropertyDraft) -> Result<PropertyRecord, ValidationFailure> {
        let result = check_presence(draft)
            .and_then(|()| check_municipality(draft))
            .and_then(|municipality| {
                let record = check_numbers(draft, municipality)?;
                check_ranges(&record, &self.limits)?;
                Ok(record)
            });

        if let Err(failure) = &result {
            info!(
                check = failure.check().as_str(),
                fields = ?failure.fields(),
                "property draft rejected"
            );
        }

        result
    }
}

pub fn check_presence(draft: &PropertyDraft) -> Result<(), ValidationFailure> {
    let missing = Field::ALL
        .into_iter()
        .filter(|field| draft.get(*field).is_none())
        .collect::<Vec<_>>();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationFailure::MissingFields { fields: missing })
    }
}

pub fn check_municipality(draft: &PropertyDraft) -> Result<Municipality, ValidationFailure> {
    let value = draft.get(Field::Municipality);
    match value {
        Some(Value::String(name)) => {
            Municipality::parse(name).ok_or_else(|| ValidationFailure::InvalidMunicipality {
                value: name.clone(),
            })
        }
        Some(other) => Err(ValidationFailure::InvalidMunicipality {
            value: other.to_string(),
        }),
        None => Err(ValidationFailure::InvalidMunicipality {
            value: String::new(),
        }),
    }
}

/// Measures must be JSON numbers and non-negative; coordinates only need to be numbers.
pub fn check_numbers(
    draft: &PropertyDraft,
    municipality: Municipality,
) -> Result<PropertyRecord, ValidationFailure> {
    let mut invalid = Vec::new();
    let mut number = |field: Field| -> f64 {
        let parsed = draft.get(field).and_then(Value::as_f64);
        let ok = match parsed {
            Some(value) if Field::MEASURES.contains(&field) => value >= 0.0,
            Some(_) => true,
            None => false,
        };
        if !ok {
            invalid.push(field);
        }
        parsed.unwrap_or_default()
    };

    let record = PropertyRecord {
        size_terrain: number(Field::SizeTerrain),
        size_construction: number(Field::SizeConstruction),
        rooms: number(Field::Rooms),
        bathrooms: number(Field::Bathrooms),
        parking: number(Field::Parking),
        age: number(Field::Age),
        lat: number(Field::Lat),
        lng: number(Field::Lng),
        municipality,
    };

    if invalid.is_empty() {
        Ok(record)
    } else {
        Err(ValidationFailure::InvalidNumbers { fields: invalid })
    }
}

pub fn check_ranges(
    record: &PropertyRecord,
    limits: &ValidationLimits,
) -> Result<(), ValidationFailure> {
    let exceeded = Field::MEASURES
        .into_iter()
        .filter(|field| {
            match (record.measure(*field), limits.ceiling(*field)) {
                (Some(value), Some(ceiling)) => value > ceiling,
                _ => false,
            }
        })
        .collect::<Vec<_>>();

    if exceeded.is_empty() {
        Ok(())
    } else {
        Err(ValidationFailure::OutOfRange { fields: exceeded })
    }
}
