//! Prompts for meter inspection

use crate::model::MeterReport;

/// Instructions sent with every batch of meter images
pub const INSPECTION_PROMPT: &str = r#"Eres un técnico inspector de medidores eléctricos.

Analiza la(s) imagen(es) de un medidor eléctrico y proporciona los siguientes datos:
tipo de medidor, cantidad de cables conectados, estado general visible y
cualquier anomalía o intervención.

Debes:
- Basarte solo en lo que es visible en las imágenes
- Usar null cuando un dato no se pueda determinar
- Listar cada anomalía como un elemento separado

No debes:
- Inventar datos que no se vean"#;

/// Build the full prompt, optionally replacing the built-in instructions.
///
/// In JSON mode the report schema is appended so the reply can be extracted.
pub fn build_inspection_prompt(
    instructions: Option<&str>,
    image_count: usize,
    with_schema: bool,
) -> String {
    let mut prompt = instructions.unwrap_or(INSPECTION_PROMPT).trim().to_string();

    if image_count > 1 {
        prompt.push_str(&format!(
            "\n\nSe adjuntan {} imágenes del mismo medidor; combínalas en un único informe.",
            image_count
        ));
    }

    if with_schema {
        prompt.push_str(
            "\n\nResponde únicamente con un objeto JSON, sin texto fuera de él, \
             que cumpla este esquema:\n",
        );
        prompt.push_str(&report_schema());
    }

    prompt
}

fn report_schema() -> String {
    let schema = schemars::schema_for!(MeterReport);
    // Serializing a derived schema cannot fail
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}
