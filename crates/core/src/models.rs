use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    #[default]
    Es,
    En,
    Fr,
    Pt,
}

impl Locale {
    pub const ALL: [Locale; 4] = [Locale::Es, Locale::En, Locale::Fr, Locale::Pt];

    pub fn from_optional_str(value: Option<&str>) -> Option<Self> {
        match value.map(|v| v.trim().to_lowercase()) {
            Some(v) if v == "es" || v == "es-mx" || v == "spanish" || v == "español" => {
                Some(Self::Es)
            }
            Some(v) if v == "en" || v == "en-us" || v == "english" => Some(Self::En),
            Some(v) if v == "fr" || v == "fr-fr" || v == "french" || v == "français" => {
                Some(Self::Fr)
            }
            Some(v) if v == "pt" || v == "pt-br" || v == "portuguese" || v == "português" => {
                Some(Self::Pt)
            }
            _ => None,
        }
    }

    pub fn as_code(self) -> &'static str {
        match self {
            Self::Es => "es",
            Self::En => "en",
            Self::Fr => "fr",
            Self::Pt => "pt",
        }
    }

    /// Command that re-sends the welcome text in this language.
    pub fn help_command(self) -> &'static str {
        match self {
            Self::Es => "/inicio",
            Self::En => "/english",
            Self::Fr => "/french",
            Self::Pt => "/portuguese",
        }
    }
}

/// The nine fields of a property description, in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    #[serde(rename = "Size_Terrain")]
    SizeTerrain,
    #[serde(rename = "Size_Construction")]
    SizeConstruction,
    Rooms,
    Bathrooms,
    Parking,
    Age,
    Lat,
    Lng,
    Municipality,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::SizeTerrain,
        Field::SizeConstruction,
        Field::Rooms,
        Field::Bathrooms,
        Field::Parking,
        Field::Age,
        Field::Lat,
        Field::Lng,
        Field::Municipality,
    ];

    /// Fields that must be non-negative and bounded.
    pub const MEASURES: [Field; 6] = [
        Field::SizeTerrain,
        Field::SizeConstruction,
        Field::Rooms,
        Field::Bathrooms,
        Field::Parking,
        Field::Age,
    ];

    pub fn wire_name(self) -> &'static str {
        match self {
            Self::SizeTerrain => "Size_Terrain",
            Self::SizeConstruction => "Size_Construction",
            Self::Rooms => "Rooms",
            Self::Bathrooms => "Bathrooms",
            Self::Parking => "Parking",
            Self::Age => "Age",
            Self::Lat => "Lat",
            Self::Lng => "Lng",
            Self::Municipality => "Municipality",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Municipality {
    AlvaroObregon,
    Azcapotzalco,
    BenitoJuarez,
    Coyoacan,
    Cuajimalpa,
    Cuauhtemoc,
    GustavoAMadero,
    Iztacalco,
    Iztapalapa,
    MagdalenaContreras,
    MiguelHidalgo,
    MilpaAlta,
    Tlahuac,
    Tlalpan,
    VenustianoCarranza,
    Xochimilco,
}

impl Municipality {
    pub const ALL: [Municipality; 16] = [
        Municipality::AlvaroObregon,
        Municipality::Azcapotzalco,
        Municipality::BenitoJuarez,
        Municipality::Coyoacan,
        Municipality::Cuajimalpa,
        Municipality::Cuauhtemoc,
        Municipality::GustavoAMadero,
        Municipality::Iztacalco,
        Municipality::Iztapalapa,
        Municipality::MagdalenaContreras,
        Municipality::MiguelHidalgo,
        Municipality::MilpaAlta,
        Municipality::Tlahuac,
        Municipality::Tlalpan,
        Municipality::VenustianoCarranza,
        Municipality::Xochimilco,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AlvaroObregon => "Álvaro Obregón",
            Self::Azcapotzalco => "Azcapotzalco",
            Self::BenitoJuarez => "Benito Juárez",
            Self::Coyoacan => "Coyoacán",
            Self::Cuajimalpa => "Cuajimalpa de Morelos",
            Self::Cuauhtemoc => "Cuauhtémoc",
            Self::GustavoAMadero => "Gustavo A. Madero",
            Self::Iztacalco => "Iztacalco",
            Self::Iztapalapa => "Iztapalapa",
            Self::MagdalenaContreras => "Magdalena Contreras",
            Self::MiguelHidalgo => "Miguel Hidalgo",
            Self::MilpaAlta => "Milpa Alta",
            Self::Tlahuac => "Tláhuac",
            Self::Tlalpan => "Tlalpan",
            Self::VenustianoCarranza => "Venustiano Carranza",
            Self::Xochimilco => "Xochimilco",
        }
    }

    /// Exact, case-sensitive match against the official borough names.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == value)
    }
}

impl Serialize for Municipality {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Raw extraction result. `None` means the key was null or could not be determined.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyDraft {
    #[serde(rename = "Size_Terrain", default)]
    pub size_terrain: Option<Value>,
    #[serde(rename = "Size_Construction", default)]
    pub size_construction: Option<Value>,
    #[serde(rename = "Rooms", default)]
    pub rooms: Option<Value>,
    #[serde(rename = "Bathrooms", default)]
    pub bathrooms: Option<Value>,
    #[serde(rename = "Parking", default)]
    pub parking: Option<Value>,
    #[serde(rename = "Age", default)]
    pub age: Option<Value>,
    #[serde(rename = "Lat", default)]
    pub lat: Option<Value>,
    #[serde(rename = "Lng", default)]
    pub lng: Option<Value>,
    #[serde(rename = "Municipality", default)]
    pub municipality: Option<Value>,
}

impl PropertyDraft {
    pub fn get(&self, field: Field) -> Option<&Value> {
        let slot = match field {
            Field::SizeTerrain => &self.size_terrain,
            Field::SizeConstruction => &self.size_construction,
            Field::Rooms => &self.rooms,
            Field::Bathrooms => &self.bathrooms,
            Field::Parking => &self.parking,
            Field::Age => &self.age,
            Field::Lat => &self.lat,
            Field::Lng => &self.lng,
            Field::Municipality => &self.municipality,
        };
        slot.as_ref().filter(|value| !value.is_null())
    }

    pub fn set(&mut self, field: Field, value: Option<Value>) {
        let value = value.filter(|value| !value.is_null());
        match field {
            Field::SizeTerrain => self.size_terrain = value,
            Field::SizeConstruction => self.size_construction = value,
            Field::Rooms => self.rooms = value,
            Field::Bathrooms => self.bathrooms = value,
            Field::Parking => self.parking = value,
            Field::Age => self.age = value,
            Field::Lat => self.lat = value,
            Field::Lng => self.lng = value,
            Field::Municipality => self.municipality = value,
        }
    }
}

/// A complete, validated property description. Only the validation gate builds one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyRecord {
    #[serde(rename = "Size_Terrain", serialize_with = "serialize_measure")]
    pub size_terrain: f64,
    #[serde(rename = "Size_Construction", serialize_with = "serialize_measure")]
    pub size_construction: f64,
    #[serde(rename = "Rooms", serialize_with = "serialize_measure")]
    pub rooms: f64,
    #[serde(rename = "Bathrooms", serialize_with = "serialize_measure")]
    pub bathrooms: f64,
    #[serde(rename = "Parking", serialize_with = "serialize_measure")]
    pub parking: f64,
    #[serde(rename = "Age", serialize_with = "serialize_measure")]
    pub age: f64,
    #[serde(rename = "Lat")]
    pub lat: f64,
    #[serde(rename = "Lng")]
    pub lng: f64,
    #[serde(rename = "Municipality")]
    pub municipality: Municipality,
}

impl PropertyRecord {
    pub fn measure(&self, field: Field) -> Option<f64> {
        match field {
            Field::SizeTerrain => Some(self.size_terrain),
            Field::SizeConstruction => Some(self.size_construction),
            Field::Rooms => Some(self.rooms),
            Field::Bathrooms => Some(self.bathrooms),
            Field::Parking => Some(self.parking),
            Field::Age => Some(self.age),
            Field::Lat => Some(self.lat),
            Field::Lng => Some(self.lng),
            Field::Municipality => None,
        }
    }
}

// Whole values go out as integers so the pricing service sees what was extracted.
fn serialize_measure<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceEstimate {
    pub random_forest: f64,
    pub svm: f64,
    pub neural_network: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub user_id: String,
    pub text: String,
}
