//! Localized user-facing text.
//!
//! Every message is a template looked up by `(MessageKind, Locale)` with
//! `{slot}` placeholders filled at render time. The lookup is an exhaustive
//! `match`, so a missing translation is a compile error.

use serde::Serialize;

use crate::models::{Field, Locale, PriceEstimate, PropertyRecord};
use crate::validation::ValidationFailure;

pub const CURRENCY_SYMBOL: &str = "$";
pub const CURRENCY_CODE: &str = "MXN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Welcome,
    Processing,
    ExtractionFailed,
    MissingFields,
    InvalidMunicipality,
    InvalidNumbers,
    OutOfRange,
    Details,
    PriceSummary,
    GenericError,
}

impl MessageKind {
    pub const ALL: [MessageKind; 10] = [
        MessageKind::Welcome,
        MessageKind::Processing,
        MessageKind::ExtractionFailed,
        MessageKind::MissingFields,
        MessageKind::InvalidMunicipality,
        MessageKind::InvalidNumbers,
        MessageKind::OutOfRange,
        MessageKind::Details,
        MessageKind::PriceSummary,
        MessageKind::GenericError,
    ];
}

#[derive(Debug, Clone, Copy)]
pub enum Message<'a> {
    Welcome,
    Processing,
    ExtractionFailed,
    MissingFields(&'a [Field]),
    InvalidMunicipality(&'a str),
    InvalidNumbers(&'a [Field]),
    OutOfRange(&'a [Field]),
    Details(&'a PropertyRecord),
    PriceSummary(&'a PriceEstimate),
    GenericError,
}

impl Message<'_> {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Welcome => MessageKind::Welcome,
            Self::Processing => MessageKind::Processing,
            Self::ExtractionFailed => MessageKind::ExtractionFailed,
            Self::MissingFields(_) => MessageKind::MissingFields,
            Self::InvalidMunicipality(_) => MessageKind::InvalidMunicipality,
            Self::InvalidNumbers(_) => MessageKind::InvalidNumbers,
            Self::OutOfRange(_) => MessageKind::OutOfRange,
            Self::Details(_) => MessageKind::Details,
            Self::PriceSummary(_) => MessageKind::PriceSummary,
            Self::GenericError => MessageKind::GenericError,
        }
    }
}

impl<'a> From<&'a ValidationFailure> for Message<'a> {
    fn from(failure: &'a ValidationFailure) -> Self {
        match failure {
            ValidationFailure::MissingFields { fields } => Message::MissingFields(fields),
            ValidationFailure::InvalidMunicipality { value } => Message::InvalidMunicipality(value),
            ValidationFailure::InvalidNumbers { fields } => Message::InvalidNumbers(fields),
            ValidationFailure::OutOfRange { fields } => Message::OutOfRange(fields),
        }
    }
}

pub fn render(locale: Locale, message: &Message<'_>) -> String {
    let template = template(message.kind(), locale);
    let help = locale.help_command();

    match message {
        Message::Welcome | Message::Processing => template.to_string(),
        Message::ExtractionFailed | Message::GenericError => fill(template, &[("help", help)]),
        Message::MissingFields(fields)
        | Message::InvalidNumbers(fields)
        | Message::OutOfRange(fields) => {
            let labels = field_list(locale, fields);
            fill(template, &[("fields", labels.as_str()), ("help", help)])
        }
        Message::InvalidMunicipality(value) => {
            fill(template, &[("municipality", *value), ("help", help)])
        }
        Message::Details(record) => {
            let values = [
                record.size_terrain.to_string(),
                record.size_construction.to_string(),
                record.rooms.to_string(),
                record.bathrooms.to_string(),
                record.parking.to_string(),
                record.age.to_string(),
                record.lat.to_string(),
                record.lng.to_string(),
            ];
            fill(
                template,
                &[
                    ("terrain", values[0].as_str()),
                    ("construction", values[1].as_str()),
                    ("rooms", values[2].as_str()),
                    ("bathrooms", values[3].as_str()),
                    ("parking", values[4].as_str()),
                    ("age", values[5].as_str()),
                    ("lat", values[6].as_str()),
                    ("lng", values[7].as_str()),
                    ("municipality", record.municipality.as_str()),
                ],
            )
        }
        Message::PriceSummary(estimate) => {
            let random_forest = format_price(estimate.random_forest);
            let svm = format_price(estimate.svm);
            let neural_network = format_price(estimate.neural_network);
            fill(
                template,
                &[
                    ("random_forest", random_forest.as_str()),
                    ("svm", svm.as_str()),
                    ("neural_network", neural_network.as_str()),
                ],
            )
        }
    }
}

/// `1234567.8` becomes `$1,234,567.80 MXN`.
pub fn format_price(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{CURRENCY_SYMBOL}{sign}{grouped}.{cents} {CURRENCY_CODE}")
}

pub fn field_label(locale: Locale, field: Field) -> &'static str {
    match (locale, field) {
        (Locale::Es, Field::SizeTerrain) => "Tamaño del terreno",
        (Locale::Es, Field::SizeConstruction) => "Tamaño de la construcción",
        (Locale::Es, Field::Rooms) => "Habitaciones",
        (Locale::Es, Field::Bathrooms) => "Baños",
        (Locale::Es, Field::Parking) => "Estacionamientos",
        (Locale::Es, Field::Age) => "Antigüedad",
        (Locale::Es, Field::Lat) => "Latitud",
        (Locale::Es, Field::Lng) => "Longitud",
        (Locale::Es, Field::Municipality) => "Alcaldía",
        (Locale::En, Field::SizeTerrain) => "Terrain size",
        (Locale::En, Field::SizeConstruction) => "Construction size",
        (Locale::En, Field::Rooms) => "Rooms",
        (Locale::En, Field::Bathrooms) => "Bathrooms",
        (Locale::En, Field::Parking) => "Parking spaces",
        (Locale::En, Field::Age) => "Age",
        (Locale::En, Field::Lat) => "Latitude",
        (Locale::En, Field::Lng) => "Longitude",
        (Locale::En, Field::Municipality) => "Municipality",
        (Locale::Fr, Field::SizeTerrain) => "Taille du terrain",
        (Locale::Fr, Field::SizeConstruction) => "Taille de la construction",
        (Locale::Fr, Field::Rooms) => "Chambres",
        (Locale::Fr, Field::Bathrooms) => "Salles de bains",
        (Locale::Fr, Field::Parking) => "Places de parking",
        (Locale::Fr, Field::Age) => "Âge",
        (Locale::Fr, Field::Lat) => "Latitude",
        (Locale::Fr, Field::Lng) => "Longitude",
        (Locale::Fr, Field::Municipality) => "Municipalité",
        (Locale::Pt, Field::SizeTerrain) => "Tamanho do terreno",
        (Locale::Pt, Field::SizeConstruction) => "Tamanho da construção",
        (Locale::Pt, Field::Rooms) => "Quartos",
        (Locale::Pt, Field::Bathrooms) => "Banheiros",
        (Locale::Pt, Field::Parking) => "Vagas de estacionamento",
        (Locale::Pt, Field::Age) => "Idade",
        (Locale::Pt, Field::Lat) => "Latitude",
        (Locale::Pt, Field::Lng) => "Longitude",
        (Locale::Pt, Field::Municipality) => "Município",
    }
}

fn field_list(locale: Locale, fields: &[Field]) -> String {
    fields
        .iter()
        .map(|field| field_label(locale, *field))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Single pass over the template; substituted values are never rescanned.
fn fill(template: &str, slots: &[(&str, &str)]) -> String {
    let mut text = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        text.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let slot = after.find('}').and_then(|close| {
            let name = &after[..close];
            slots
                .iter()
                .find(|(slot, _)| *slot == name)
                .map(|(_, value)| (close, *value))
        });
        match slot {
            Some((close, value)) => {
                text.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                text.push('{');
                rest = after;
            }
        }
    }

    text.push_str(rest);
    text
}

pub fn template(kind: MessageKind, locale: Locale) -> &'static str {
    match (kind, locale) {
        (MessageKind::Welcome, Locale::Es) => concat!(
            "🏡 ¡Hola! Soy el bot de SkyPrice. Envíame un mensaje con los detalles del departamento en la Ciudad de México y te diré el precio estimado. Los detalles deben incluir:\n\n",
            "📏 Tamaño del terreno\n",
            "🏗️ Tamaño de la construcción\n",
            "🛏️ Número de habitaciones\n",
            "🚽 Número de baños\n",
            "🚗 Número de estacionamientos\n",
            "🕰️ Antigüedad\n",
            "🌍 Alcaldía\n\n",
            "El bot utilizará OpenAI para extraer los detalles del texto y la API de SkyPrice para predecir el precio. ¡Inténtalo ahora! 🚀\n\n",
            "Ejemplo: \"el departamento tiene 100 m² de terreno, 80 m² de construcción, 2 habitaciones, 1 baño, 1 estacionamiento, 10 años de antigüedad y está en la alcaldía Benito Juárez\".\n\n",
            "For English instructions, type /english.\n",
            "Pour des instructions en français, tapez /french.\n",
            "Para instruções em português, digite /portuguese.",
        ),
        (MessageKind::Welcome, Locale::En) => concat!(
            "🏡 Hello! I am the SkyPrice bot. Send me a message with the details of the apartment in Mexico City and I will tell you the estimated price. The details must include:\n\n",
            "📏 Terrain size\n",
            "🏗️ Construction size\n",
            "🛏️ Number of rooms\n",
            "🚽 Number of bathrooms\n",
            "🚗 Number of parking spaces\n",
            "🕰️ Age\n",
            "🌍 Municipality\n\n",
            "The bot will use OpenAI to extract the details from the text and the SkyPrice API to predict the price. Try it now! 🚀\n\n",
            "Example: \"the apartment has 100 m² of terrain, 80 m² of construction, 2 rooms, 1 bathroom, 1 parking space, 10 years old and is in the Benito Juárez municipality\".\n\n",
            "Para instrucciones en español, escriba /inicio.\n",
            "Pour des instructions en français, tapez /french.\n",
            "Para instruções em português, digite /portuguese.",
        ),
        (MessageKind::Welcome, Locale::Fr) => concat!(
            "🏡 Bonjour! Je suis le bot SkyPrice. Envoyez-moi un message avec les détails de l'appartement à Mexico et je vous dirai le prix estimé. Les détails doivent inclure:\n\n",
            "📏 Taille du terrain\n",
            "🏗️ Taille de la construction\n",
            "🛏️ Nombre de chambres\n",
            "🚽 Nombre de salles de bains\n",
            "🚗 Nombre de places de parking\n",
            "🕰️ Âge\n",
            "🌍 Municipalité\n\n",
            "Le bot utilisera OpenAI pour extraire les détails du texte et l'API SkyPrice pour prédire le prix. Essayez maintenant! 🚀\n\n",
            "Exemple: \"l'appartement a 100 m² de terrain, 80 m² de construction, 2 chambres, 1 salle de bain, 1 place de parking, 10 ans et est dans la municipalité de Benito Juárez\".\n\n",
            "Para instrucciones en español, escriba /inicio.\n",
            "For English instructions, type /english.\n",
            "Para instruções em português, digite /portuguese.",
        ),
        (MessageKind::Welcome, Locale::Pt) => concat!(
            "🏡 Olá! Eu sou o bot SkyPrice. Envie-me uma mensagem com os detalhes do apartamento na Cidade do México e eu direi o preço estimado. Os detalhes devem incluir:\n\n",
            "📏 Tamanho do terreno\n",
            "🏗️ Tamanho da construção\n",
            "🛏️ Número de quartos\n",
            "🚽 Número de banheiros\n",
            "🚗 Número de vagas de estacionamento\n",
            "🕰️ Idade\n",
            "🌍 Município\n\n",
            "O bot usará o OpenAI para extrair os detalhes do texto e a API SkyPrice para prever o preço. Experimente agora! 🚀\n\n",
            "Exemplo: \"o apartamento tem 100 m² de terreno, 80 m² de construção, 2 quartos, 1 banheiro, 1 vaga de estacionamento, 10 anos de idade e está na municipalidade de Benito Juárez\".\n\n",
            "Para instrucciones en español, escriba /inicio.\n",
            "Pour des instructions en français, tapez /french.\n",
            "For English instructions, type /english.",
        ),

        (MessageKind::Processing, Locale::Es) => {
            "🏡 SkyPrice ChatBot 🤖\n\n📝 ¡Gracias! Mensaje recibido. 📩\n\n🔄 Procesando tu solicitud..."
        }
        (MessageKind::Processing, Locale::En) => {
            "🏡 SkyPrice ChatBot 🤖\n\n📝 Thank you! Message received. 📩\n\n🔄 Processing your request..."
        }
        (MessageKind::Processing, Locale::Fr) => {
            "🏡 SkyPrice ChatBot 🤖\n\n📝 Merci! Message reçu. 📩\n\n🔄 Traitement de votre demande..."
        }
        (MessageKind::Processing, Locale::Pt) => {
            "🏡 SkyPrice ChatBot 🤖\n\n📝 Obrigado! Mensagem recebida. 📩\n\n🔄 Processando sua solicitação..."
        }

        (MessageKind::ExtractionFailed, Locale::Es) => {
            "❌ Lo siento, no pude extraer los detalles del departamento de tu mensaje. Por favor, inténtalo de nuevo. Si necesitas ayuda, escribe {help}."
        }
        (MessageKind::ExtractionFailed, Locale::En) => {
            "❌ Sorry, I could not extract the apartment details from your message. Please try again. If you need help, type {help}."
        }
        (MessageKind::ExtractionFailed, Locale::Fr) => {
            "❌ Désolé, je n'ai pas pu extraire les détails de l'appartement de votre message. Veuillez réessayer. Si vous avez besoin d'aide, tapez {help}."
        }
        (MessageKind::ExtractionFailed, Locale::Pt) => {
            "❌ Desculpe, não consegui extrair os detalhes do apartamento da sua mensagem. Por favor, tente novamente. Se precisar de ajuda, digite {help}."
        }

        (MessageKind::MissingFields, Locale::Es) => {
            "❌ Lo siento, no pude extraer los siguientes detalles del departamento de tu mensaje: {fields}. Por favor, inténtalo de nuevo. Si necesitas ayuda, escribe {help}."
        }
        (MessageKind::MissingFields, Locale::En) => {
            "❌ Sorry, I could not extract the following apartment details from your message: {fields}. Please try again. If you need help, type {help}."
        }
        (MessageKind::MissingFields, Locale::Fr) => {
            "❌ Désolé, je n'ai pas pu extraire les détails de l'appartement suivants de votre message: {fields}. Veuillez réessayer. Si vous avez besoin d'aide, tapez {help}."
        }
        (MessageKind::MissingFields, Locale::Pt) => {
            "❌ Desculpe, não consegui extrair os seguintes detalhes do apartamento da sua mensagem: {fields}. Por favor, tente novamente. Se precisar de ajuda, digite {help}."
        }

        (MessageKind::InvalidMunicipality, Locale::Es) => {
            "❌ Lo siento, la alcaldía proporcionada ({municipality}) no es válida. Por favor, inténtalo de nuevo. Si necesitas ayuda, escribe {help}."
        }
        (MessageKind::InvalidMunicipality, Locale::En) => {
            "❌ Sorry, the provided municipality ({municipality}) is invalid. Please try again. If you need help, type {help}."
        }
        (MessageKind::InvalidMunicipality, Locale::Fr) => {
            "❌ Désolé, la municipalité fournie ({municipality}) est invalide. Veuillez réessayer. Si vous avez besoin d'aide, tapez {help}."
        }
        (MessageKind::InvalidMunicipality, Locale::Pt) => {
            "❌ Desculpe, a municipalidade fornecida ({municipality}) é inválida. Por favor, tente novamente. Se precisar de ajuda, digite {help}."
        }

        (MessageKind::InvalidNumbers, Locale::Es) => {
            "❌ Lo siento, los siguientes campos numéricos no son válidos: {fields}. Por favor, inténtalo de nuevo. Si necesitas ayuda, escribe {help}."
        }
        (MessageKind::InvalidNumbers, Locale::En) => {
            "❌ Sorry, the following numeric fields are not valid: {fields}. Please try again. If you need help, type {help}."
        }
        (MessageKind::InvalidNumbers, Locale::Fr) => {
            "❌ Désolé, les champs numériques suivants ne sont pas valides: {fields}. Veuillez réessayer. Si vous avez besoin d'aide, tapez {help}."
        }
        (MessageKind::InvalidNumbers, Locale::Pt) => {
            "❌ Desculpe, os seguintes campos numéricos não são válidos: {fields}. Por favor, tente novamente. Se precisar de ajuda, digite {help}."
        }

        (MessageKind::OutOfRange, Locale::Es) => {
            "❌ Lo siento, los siguientes campos numéricos exceden los límites esperados: {fields}. Por favor, inténtalo de nuevo. Si necesitas ayuda, escribe {help}."
        }
        (MessageKind::OutOfRange, Locale::En) => {
            "❌ Sorry, the following numeric fields exceed the expected limits: {fields}. Please try again. If you need help, type {help}."
        }
        (MessageKind::OutOfRange, Locale::Fr) => {
            "❌ Désolé, les champs numériques suivants dépassent les limites attendues: {fields}. Veuillez réessayer. Si vous avez besoin d'aide, tapez {help}."
        }
        (MessageKind::OutOfRange, Locale::Pt) => {
            "❌ Desculpe, os seguintes campos numéricos excedem os limites esperados: {fields}. Por favor, tente novamente. Se precisar de ajuda, digite {help}."
        }

        (MessageKind::Details, Locale::Es) => concat!(
            "🏢 Detalles del departamento extraídos:\n\n",
            "📏 Tamaño del terreno: {terrain}m²\n",
            "🏗️ Tamaño de la construcción: {construction}m²\n",
            "🛏️ Número de habitaciones: {rooms}\n",
            "🚽 Número de baños: {bathrooms}\n",
            "🚗 Número de estacionamientos: {parking}\n",
            "🕰️ Antigüedad: {age} años\n",
            "📍 Coordenadas: {lat}, {lng}\n",
            "🌍 Alcaldía: {municipality}",
        ),
        (MessageKind::Details, Locale::En) => concat!(
            "🏢 Extracted apartment details:\n\n",
            "📏 Terrain size: {terrain}m²\n",
            "🏗️ Construction size: {construction}m²\n",
            "🛏️ Number of rooms: {rooms}\n",
            "🚽 Number of bathrooms: {bathrooms}\n",
            "🚗 Number of parking spaces: {parking}\n",
            "🕰️ Age: {age} years\n",
            "📍 Coordinates: {lat}, {lng}\n",
            "🌍 Municipality: {municipality}",
        ),
        (MessageKind::Details, Locale::Fr) => concat!(
            "🏢 Détails de l'appartement extraits:\n\n",
            "📏 Taille du terrain: {terrain}m²\n",
            "🏗️ Taille de la construction: {construction}m²\n",
            "🛏️ Nombre de chambres: {rooms}\n",
            "🚽 Nombre de salles de bains: {bathrooms}\n",
            "🚗 Nombre de places de parking: {parking}\n",
            "🕰️ Âge: {age} ans\n",
            "📍 Coordonnées: {lat}, {lng}\n",
            "🌍 Municipalité: {municipality}",
        ),
        (MessageKind::Details, Locale::Pt) => concat!(
            "🏢 Detalhes do apartamento extraídos:\n\n",
            "📏 Tamanho do terreno: {terrain}m²\n",
            "🏗️ Tamanho da construção: {construction}m²\n",
            "🛏️ Número de quartos: {rooms}\n",
            "🚽 Número de banheiros: {bathrooms}\n",
            "🚗 Número de vagas de estacionamento: {parking}\n",
            "🕰️ Idade: {age} anos\n",
            "📍 Coordenadas: {lat}, {lng}\n",
            "🌍 Município: {municipality}",
        ),

        (MessageKind::PriceSummary, Locale::Es) => concat!(
            "💰 Precios estimados:\n\n",
            "🌳 Random Forest: {random_forest}\n",
            "📈 SVM: {svm}\n",
            "🧠 Neural Network: {neural_network}\n\n",
            "🔍 Puedes encontrar más detalles en https://skyprice.xyz 🏡",
        ),
        (MessageKind::PriceSummary, Locale::En) => concat!(
            "💰 Estimated prices:\n\n",
            "🌳 Random Forest: {random_forest}\n",
            "📈 SVM: {svm}\n",
            "🧠 Neural Network: {neural_network}\n\n",
            "🔍 You can find more details at https://skyprice.xyz 🏡",
        ),
        (MessageKind::PriceSummary, Locale::Fr) => concat!(
            "💰 Prix estimés:\n\n",
            "🌳 Random Forest: {random_forest}\n",
            "📈 SVM: {svm}\n",
            "🧠 Neural Network: {neural_network}\n\n",
            "🔍 Vous pouvez trouver plus de détails sur https://skyprice.xyz 🏡",
        ),
        (MessageKind::PriceSummary, Locale::Pt) => concat!(
            "💰 Preços estimados:\n\n",
            "🌳 Random Forest: {random_forest}\n",
            "📈 SVM: {svm}\n",
            "🧠 Neural Network: {neural_network}\n\n",
            "🔍 Você pode encontrar mais detalhes em https://skyprice.xyz 🏡",
        ),

        (MessageKind::GenericError, Locale::Es) => {
            "❌ Lo siento, ha ocurrido un error. Por favor, inténtalo de nuevo. Si necesitas ayuda, escribe {help}."
        }
        (MessageKind::GenericError, Locale::En) => {
            "❌ Sorry, an error occurred. Please try again. If you need help, type {help}."
        }
        (MessageKind::GenericError, Locale::Fr) => {
            "❌ Désolé, une erreur s'est produite. Veuillez réessayer. Si vous avez besoin d'aide, tapez {help}."
        }
        (MessageKind::GenericError, Locale::Pt) => {
            "❌ Desculpe, ocorreu um erro. Por favor, tente novamente. Se precisar de ajuda, digite {help}."
        }
    }
}
