//! Card document loader.
//!
//! Each card ships as one JSON file: an optional `common_terms` block shared
//! across the issuer's cards plus card-specific sections (fees, rewards,
//! milestones, benefits, ...). The loader flattens every top-level section
//! into one self-contained `Document` so retrieval can return chunks
//! independently and out of order.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use serde::Serialize;
use serde_json::Value;

const CARD_NAME_KEY: &str = "card_name";
const CARD_TYPE_KEY: &str = "card_type";
const COMMON_TERMS_KEY: &str = "common_terms";
const DEFAULT_CARD_TYPE: &str = "credit";

#[derive(Debug, Clone, Serialize)]
pub struct DocumentMetadata {
    pub section: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subsection: Option<String>,
    pub card_type: String,
}

/// Smallest independently retrievable unit of card-policy text.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub id: String,
    pub card_name: String,
    pub content: String,
    pub metadata: DocumentMetadata,
    /// Filled during index build; absent if the embedding call failed.
    #[serde(skip_serializing)]
    pub embedding: Option<Vec<f32>>,
}

/// Loads every `*.json` card file under `data_dir`, sorted by file name.
///
/// Section order within a file is preserved, so two loads of the same
/// directory always produce the same documents in the same order.
/// Any unreadable or malformed file aborts the whole load.
pub fn load_all(data_dir: &Path) -> anyhow::Result<Vec<Document>> {
    let entries = fs::read_dir(data_dir)
        .with_context(|| format!("Failed to read card data directory {}", data_dir.display()))?;

    let mut paths: Vec<_> = entries
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to list card data directory {}", data_dir.display()))?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort_by_key(|path| path.file_name().map(|name| name.to_os_string()));

    let mut documents = Vec::new();
    for path in &paths {
        documents.extend(load_card_file(path)?);
    }

    tracing::info!(
        "Loaded {} documents from {} card files in {}",
        documents.len(),
        paths.len(),
        data_dir.display()
    );
    Ok(documents)
}

fn load_card_file(path: &Path) -> anyhow::Result<Vec<Document>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read card file {}", path.display()))?;
    let root: Value = serde_json::from_str(&raw)
        .with_context(|| format!("Malformed JSON in card file {}", path.display()))?;

    let Some(sections) = root.as_object() else {
        bail!("Card file {} must contain a top-level JSON object", path.display());
    };

    let file_stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let card_name = sections
        .get(CARD_NAME_KEY)
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| title_case(&file_stem));
    let card_type = sections
        .get(CARD_TYPE_KEY)
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_CARD_TYPE)
        .to_string();

    let mut documents = Vec::new();
    for (key, value) in sections {
        if key == CARD_NAME_KEY || key == CARD_TYPE_KEY {
            continue;
        }

        if key == COMMON_TERMS_KEY {
            if let Some(terms) = value.as_object() {
                for (term_key, term_value) in terms {
                    documents.push(make_document(
                        &file_stem,
                        &card_name,
                        &card_type,
                        COMMON_TERMS_KEY,
                        Some(term_key),
                        term_value,
                    ));
                }
                continue;
            }
        }

        documents.push(make_document(&file_stem, &card_name, &card_type, key, None, value));
    }

    if documents.is_empty() {
        bail!("Card file {} contains no sections", path.display());
    }

    Ok(documents)
}

fn make_document(
    file_stem: &str,
    card_name: &str,
    card_type: &str,
    section: &str,
    subsection: Option<&str>,
    value: &Value,
) -> Document {
    let (id, label) = match subsection {
        Some(sub) => (
            format!("{file_stem}::{section}::{sub}"),
            format!("{} > {}", title_case(section), title_case(sub)),
        ),
        None => (format!("{file_stem}::{section}"), title_case(section)),
    };

    // The header makes the chunk interpretable on its own once retrieval
    // returns it detached from the rest of the card.
    let content = format!(
        "Card: {card_name}\nSection: {label}\n\n{}",
        render_section(value)
    );

    Document {
        id,
        card_name: card_name.to_string(),
        content,
        metadata: DocumentMetadata {
            section: section.to_string(),
            subsection: subsection.map(str::to_string),
            card_type: card_type.to_string(),
        },
        embedding: None,
    }
}

/// Renders a section value as indented, human-readable text.
/// Scalars are kept verbatim; `₹5,000` or `2.5%` are never parsed.
fn render_section(value: &Value) -> String {
    let mut out = String::new();
    render_value(value, 0, &mut out);
    out.trim_end().to_string()
}

fn render_value(value: &Value, indent: usize, out: &mut String) {
    let pad = "  ".repeat(indent);
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                render_entry(key, child, indent, out);
            }
        }
        Value::Array(items) if items.iter().all(is_scalar) => {
            out.push_str(&pad);
            out.push_str(&join_scalars(items));
            out.push('\n');
        }
        Value::Array(items) => {
            for item in items {
                render_value(item, indent, out);
            }
        }
        scalar => {
            out.push_str(&pad);
            out.push_str(&scalar_text(scalar));
            out.push('\n');
        }
    }
}

fn render_entry(key: &str, value: &Value, indent: usize, out: &mut String) {
    let pad = "  ".repeat(indent);
    let label = title_case(key);
    match value {
        Value::Array(items) if items.iter().all(is_scalar) => {
            out.push_str(&format!("{pad}{label}: {}\n", join_scalars(items)));
        }
        Value::Object(_) | Value::Array(_) => {
            out.push_str(&format!("{pad}{label}:\n"));
            render_value(value, indent + 1, out);
        }
        scalar => {
            out.push_str(&format!("{pad}{label}: {}\n", scalar_text(scalar)));
        }
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}

fn join_scalars(items: &[Value]) -> String {
    items
        .iter()
        .map(scalar_text)
        .collect::<Vec<_>>()
        .join(", ")
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

/// `"cash_withdrawal-fees"` -> `"Cash Withdrawal Fees"`.
pub fn title_case(raw: &str) -> String {
    raw.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn write_card(dir: &Path, name: &str, value: &Value) {
        let mut file = fs::File::create(dir.join(name)).expect("create card file");
        file.write_all(serde_json::to_string_pretty(value).expect("json").as_bytes())
            .expect("write card file");
    }

    #[test]
    fn title_case_splits_on_separators() {
        assert_eq!(title_case("annual_fee"), "Annual Fee");
        assert_eq!(title_case("cash-withdrawal terms"), "Cash Withdrawal Terms");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn one_document_per_section_and_per_common_term() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_card(
            dir.path(),
            "axis-atlas.json",
            &json!({
                "card_type": "travel",
                "common_terms": {
                    "grace_period": "Up to 50 days",
                    "finance_charges": {"rate": "3.6% per month"}
                },
                "fees": {"annual_fee": "₹5,000", "joining_fee": "₹5,000"},
                "rewards": {"rate": "2 EDGE Miles per ₹100"}
            }),
        );

        let documents = load_all(dir.path()).expect("load");
        assert_eq!(documents.len(), 4);

        let ids: Vec<&str> = documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "axis-atlas::common_terms::grace_period",
                "axis-atlas::common_terms::finance_charges",
                "axis-atlas::fees",
                "axis-atlas::rewards",
            ]
        );

        let grace = &documents[0];
        assert_eq!(grace.card_name, "Axis Atlas");
        assert_eq!(grace.metadata.section, "common_terms");
        assert_eq!(grace.metadata.subsection.as_deref(), Some("grace_period"));
        assert_eq!(grace.metadata.card_type, "travel");
        assert!(grace.content.contains("Card: Axis Atlas"));
        assert!(grace.content.contains("Section: Common Terms > Grace Period"));
        assert!(grace.content.contains("Up to 50 days"));
        assert!(grace.embedding.is_none());

        let fees = &documents[2];
        assert_eq!(fees.metadata.subsection, None);
        assert!(fees.content.contains("Annual Fee: ₹5,000"));
    }

    #[test]
    fn explicit_card_name_wins_over_file_stem() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_card(
            dir.path(),
            "hsbc-premier.json",
            &json!({
                "card_name": "HSBC Premier",
                "fees": {"annual_fee": "Nil"}
            }),
        );

        let documents = load_all(dir.path()).expect("load");
        assert_eq!(documents[0].card_name, "HSBC Premier");
    }

    #[test]
    fn scalar_values_are_preserved_verbatim() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_card(
            dir.path(),
            "card.json",
            &json!({
                "fees": {
                    "annual_fee": "₹5,000 + GST",
                    "forex_markup": "3.5%",
                    "free_replacements": 2,
                    "waiver_available": true
                }
            }),
        );

        let documents = load_all(dir.path()).expect("load");
        let content = &documents[0].content;
        assert!(content.contains("Annual Fee: ₹5,000 + GST"));
        assert!(content.contains("Forex Markup: 3.5%"));
        assert!(content.contains("Free Replacements: 2"));
        assert!(content.contains("Waiver Available: true"));
    }

    #[test]
    fn scalar_arrays_are_comma_joined() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_card(
            dir.path(),
            "card.json",
            &json!({
                "lounge_access": {"domestic_networks": ["Visa", "Mastercard", "RuPay"]}
            }),
        );

        let documents = load_all(dir.path()).expect("load");
        assert!(documents[0]
            .content
            .contains("Domestic Networks: Visa, Mastercard, RuPay"));
    }

    #[test]
    fn deep_nesting_is_rendered_with_indentation() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_card(
            dir.path(),
            "card.json",
            &json!({
                "milestones": {
                    "tiers": {
                        "silver": {
                            "spend": "₹3,00,000",
                            "benefit": {"bonus_miles": 2500}
                        }
                    }
                }
            }),
        );

        let documents = load_all(dir.path()).expect("load");
        let content = &documents[0].content;
        assert!(content.contains("Tiers:\n  Silver:\n    Spend: ₹3,00,000"));
        assert!(content.contains("    Benefit:\n      Bonus Miles: 2500"));
    }

    #[test]
    fn bare_array_and_scalar_sections_still_become_documents() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_card(
            dir.path(),
            "card.json",
            &json!({
                "policy_notes": ["Fees are subject to GST.", "Rates may be revised."],
                "eligibility": "Salaried, income above ₹12 lakh per annum"
            }),
        );

        let documents = load_all(dir.path()).expect("load");
        assert_eq!(documents.len(), 2);
        assert!(documents[0]
            .content
            .contains("Fees are subject to GST., Rates may be revised."));
        assert!(documents[1]
            .content
            .contains("Salaried, income above ₹12 lakh per annum"));
    }

    #[test]
    fn files_are_loaded_in_name_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_card(dir.path(), "b-card.json", &json!({"fees": {"annual_fee": "x"}}));
        write_card(dir.path(), "a-card.json", &json!({"fees": {"annual_fee": "y"}}));

        let documents = load_all(dir.path()).expect("load");
        assert_eq!(documents[0].card_name, "A Card");
        assert_eq!(documents[1].card_name, "B Card");
    }

    #[test]
    fn reloading_is_deterministic() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_card(
            dir.path(),
            "card.json",
            &json!({"fees": {"annual_fee": "₹500"}, "rewards": {"rate": "1%"}}),
        );

        let first = load_all(dir.path()).expect("first load");
        let second = load_all(dir.path()).expect("second load");
        let first_ids: Vec<_> = first.iter().map(|d| d.id.clone()).collect();
        let second_ids: Vec<_> = second.iter().map(|d| d.id.clone()).collect();
        assert_eq!(first_ids, second_ids);
        assert_eq!(first.len(), second.len());
    }

    #[test]
    fn malformed_file_fails_and_names_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("broken.json"), "{ not json").expect("write");
        write_card(dir.path(), "card.json", &json!({"fees": {"annual_fee": "x"}}));

        let err = load_all(dir.path()).expect_err("must fail on corrupt file");
        assert!(format!("{err}").contains("broken.json"));
    }

    #[test]
    fn non_object_root_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("list.json"), "[1, 2, 3]").expect("write");

        let err = load_all(dir.path()).expect_err("must fail");
        assert!(format!("{err}").contains("list.json"));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope");
        assert!(load_all(&missing).is_err());
    }
}
