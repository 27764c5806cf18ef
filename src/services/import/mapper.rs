// src/services/import/mapper.rs

use std::collections::{HashMap, HashSet};

use crate::{
    common::error::AppError,
    models::{
        import::{ColumnMapping, MappingTarget, TargetSchema},
        schema::{StandardField, TargetField},
    },
    services::import::{coerce::infer_field_type, reader::Row},
};

/// Mantém só letras e dígitos, em minúsculas.
pub fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Chave de extensão a partir do nome da coluna ("Loyalty Tier" -> "loyalty_tier").
pub fn extension_key(column: &str) -> String {
    let mut key = String::new();
    for c in column.trim().chars() {
        if c.is_alphanumeric() {
            key.extend(c.to_lowercase());
        } else if !key.is_empty() && !key.ends_with('_') {
            key.push('_');
        }
    }
    key.trim_end_matches('_').to_string()
}

/// Encontra o campo do schema para uma coluna:
/// chave exata -> rótulo exato -> substring em qualquer direção.
fn match_field(column: &str, fields: &[TargetField], taken: &HashSet<StandardField>) -> Option<StandardField> {
    let needle = normalize(column);
    if needle.is_empty() {
        return None;
    }

    let available = || fields.iter().filter(|f| !taken.contains(&f.key));

    if let Some(f) = available().find(|f| normalize(f.key.key()) == needle) {
        return Some(f.key);
    }
    if let Some(f) = available().find(|f| normalize(&f.label) == needle) {
        return Some(f.key);
    }
    available()
        .find(|f| {
            [normalize(f.key.key()), normalize(&f.label)]
                .iter()
                .any(|candidate| candidate.contains(&needle) || needle.contains(candidate.as_str()))
        })
        .map(|f| f.key)
}

/// Sugere um mapeamento para os cabeçalhos. É só uma sugestão:
/// o que vale na execução é o mapeamento aprovado pelo operador.
pub fn suggest_mapping(
    schema: TargetSchema,
    headers: &[String],
    sample_rows: &[Row],
    allow_extension: bool,
) -> Vec<ColumnMapping> {
    let fields = schema.fields();
    let mut taken = HashSet::new();

    headers
        .iter()
        .map(|header| {
            if let Some(field) = match_field(header, &fields, &taken) {
                taken.insert(field);
                return ColumnMapping {
                    source_column: header.clone(),
                    target: MappingTarget::Standard { field },
                    required: schema.required_fields().contains(&field),
                };
            }

            let key = extension_key(header);
            if allow_extension && !key.is_empty() {
                let samples = sample_rows
                    .iter()
                    .filter_map(|row| row.get(header).map(String::as_str));
                return ColumnMapping::extension(header, &key, infer_field_type(samples));
            }

            ColumnMapping::skip(header)
        })
        .collect()
}

/// Recusa o mapeamento antes de criar a execução.
pub fn validate_mapping(schema: TargetSchema, mappings: &[ColumnMapping]) -> Result<(), AppError> {
    let mut seen: HashMap<StandardField, &str> = HashMap::new();
    let mut missing: Vec<String> = Vec::new();

    for mapping in mappings {
        match &mapping.target {
            MappingTarget::Standard { field } => {
                if seen.insert(*field, &mapping.source_column).is_some() {
                    return Err(AppError::DuplicateFieldMapping(field.key().to_string()));
                }
            }
            MappingTarget::Skip if mapping.required => missing.push(mapping.source_column.clone()),
            _ => {}
        }
    }

    missing.extend(
        schema
            .required_fields()
            .iter()
            .filter(|field| !seen.contains_key(field))
            .map(|field| field.key().to_string()),
    );

    if !missing.is_empty() {
        return Err(AppError::MissingRequiredFields(missing));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::import::FieldType;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn target_of(mappings: &[ColumnMapping], column: &str) -> MappingTarget {
        mappings
            .iter()
            .find(|m| m.source_column == column)
            .map(|m| m.target.clone())
            .unwrap()
    }

    #[test]
    fn normalizes_names() {
        assert_eq!(normalize("Lineitem  Name!"), "lineitemname");
        assert_eq!(normalize("E-mail"), "email");
        assert_eq!(extension_key(" Loyalty Tier (2024) "), "loyalty_tier_2024");
    }

    #[test]
    fn matches_by_key_label_and_substring() {
        let mappings = suggest_mapping(
            TargetSchema::Orders,
            &headers(&["E-mail", "Name", "Order", "Total", "Lineitem quantity", "Billing City Name"]),
            &[],
            false,
        );

        let standard = |field| MappingTarget::Standard { field };
        assert_eq!(target_of(&mappings, "E-mail"), standard(StandardField::Email));
        assert_eq!(target_of(&mappings, "Name"), standard(StandardField::FullName));
        assert_eq!(target_of(&mappings, "Order"), standard(StandardField::OrderNumber));
        assert_eq!(target_of(&mappings, "Total"), standard(StandardField::TotalPrice));
        assert_eq!(
            target_of(&mappings, "Lineitem quantity"),
            standard(StandardField::LineItemQuantity)
        );
        assert_eq!(target_of(&mappings, "Billing City Name"), standard(StandardField::AddressCity));
    }

    #[test]
    fn a_field_is_suggested_only_once() {
        let mappings = suggest_mapping(TargetSchema::Customers, &headers(&["Email", "email"]), &[], false);
        assert_eq!(target_of(&mappings, "Email"), MappingTarget::Standard { field: StandardField::Email });
        assert_eq!(mappings[1].target, MappingTarget::Skip);
    }

    #[test]
    fn unmatched_columns_become_typed_extensions() {
        let mut row = Row::new();
        row.insert("Loyalty Points".to_string(), "120".to_string());
        let mappings = suggest_mapping(TargetSchema::Customers, &headers(&["Loyalty Points", "###"]), &[row], true);

        assert_eq!(
            mappings[0].target,
            MappingTarget::Extension { key: "loyalty_points".into(), field_type: FieldType::Number }
        );
        assert_eq!(mappings[1].target, MappingTarget::Skip);
    }

    #[test]
    fn customers_require_email() {
        let err = validate_mapping(TargetSchema::Customers, &[ColumnMapping::skip("Email")]).unwrap_err();
        assert!(matches!(err, AppError::MissingRequiredFields(ref f) if f == &vec!["email".to_string()]));

        assert!(validate_mapping(
            TargetSchema::Customers,
            &[ColumnMapping::standard("Email", StandardField::Email)]
        )
        .is_ok());
    }

    #[test]
    fn orders_without_email_are_accepted() {
        assert!(validate_mapping(TargetSchema::Orders, &[ColumnMapping::skip("Anything")]).is_ok());
    }

    #[test]
    fn required_column_cannot_be_skipped() {
        let mut skipped = ColumnMapping::skip("Order");
        skipped.required = true;
        let err = validate_mapping(TargetSchema::Orders, &[skipped]).unwrap_err();
        assert!(matches!(err, AppError::MissingRequiredFields(_)));
    }

    #[test]
    fn duplicate_standard_targets_are_refused() {
        let err = validate_mapping(
            TargetSchema::Orders,
            &[
                ColumnMapping::standard("Total", StandardField::TotalPrice),
                ColumnMapping::standard("Grand Total", StandardField::TotalPrice),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, AppError::DuplicateFieldMapping(ref k) if k == "total_price"));
    }
}
