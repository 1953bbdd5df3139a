use once_cell::sync::Lazy;
use skyprice_core::Municipality;

static INSTRUCTION: Lazy<String> = Lazy::new(build_instruction);

/// System prompt sent with every extraction request.
pub fn extraction_instruction() -> &'static str {
    INSTRUCTION.as_str()
}

fn build_instruction() -> String {
    let municipalities = Municipality::ALL
        .iter()
        .map(|municipality| format!("'{}'", municipality.as_str()))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        concat!(
            "Extract the following CDMX apartment details from the text in JSON format, if impossible to extract, leave null: \n",
            "{{\"Size_Terrain\":int,\"Size_Construction\":int,\"Rooms\":int,\"Bathrooms\":float,\"Parking\":int,\"Age\":int,\"Lat\":float,\"Lng\":float,\"Municipality\":str}} \n",
            "Units should be in meters for size and years for age. If given the date of construction, calculate age. \n",
            "Lat and Lng you should provide with the closer coordinates you can find for the apartment \n",
            "or fallback to the center of detected Municipality (always provide lat/lng). \n",
            "Municipality should be one of the 16 CDMX municipalities, spelled exactly as listed: [{}]\n",
            "Provide the response without any formatting or additional line breaks, just the minified JSON ready to serialize.\n",
        ),
        municipalities
    )
}
