// src/services/import/coerce.rs

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{json, Value};

use crate::models::import::FieldType;

/// Remove tudo que não é dígito, ponto ou sinal e converte.
/// Valor ilegível vira zero (a linha segue sendo importada).
pub fn parse_number(raw: &str) -> Decimal {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    Decimal::from_str(&cleaned).unwrap_or(Decimal::ZERO)
}

/// Soma sem pânico: se estourar, o total vira zero.
pub fn checked_sum<I>(values: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, value| acc.checked_add(value))
        .unwrap_or(Decimal::ZERO)
}

/// Quantidade inteira; frações são truncadas.
pub fn parse_quantity(raw: &str) -> i64 {
    parse_number(raw).trunc().to_i64().unwrap_or(0)
}

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M"];
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y"];

/// Formatos comuns de exportação. Sem fuso explícito, assume UTC.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    // Ex.: "2024-01-15 10:30:00 -0500"
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S %z") {
        return Some(dt.with_timezone(&Utc));
    }
    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    parse_date(raw).and_then(|d| d.and_hms_opt(0, 0, 0)).map(|naive| naive.and_utc())
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "sim" | "s" | "1" => Some(true),
        "false" | "no" | "n" | "nao" | "não" | "0" => Some(false),
        _ => None,
    }
}

fn looks_numeric(raw: &str) -> bool {
    let raw = raw.trim();
    let body = raw.strip_prefix('-').unwrap_or(raw);
    !body.is_empty()
        && body.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',')
        && body.chars().any(|c| c.is_ascii_digit())
}

/// Infere o tipo de um campo de extensão a partir de valores de amostra.
pub fn infer_field_type<'a, I>(samples: I) -> FieldType
where
    I: IntoIterator<Item = &'a str>,
{
    let values: Vec<&str> = samples
        .into_iter()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect();

    if values.is_empty() {
        return FieldType::Text;
    }
    // "0"/"1" também parecem booleanos; só vira BOOLEAN se houver uma palavra
    if values.iter().all(|v| parse_bool(v).is_some()) && values.iter().any(|v| !looks_numeric(v)) {
        return FieldType::Boolean;
    }
    if values.iter().all(|v| looks_numeric(v)) {
        return FieldType::Number;
    }
    if values.iter().all(|v| parse_date(v).is_some() || parse_datetime(v).is_some()) {
        return FieldType::Date;
    }
    FieldType::Text
}

/// Converte o texto bruto conforme o tipo do campo de extensão.
/// O que não converte é mantido como texto.
pub fn coerce_extension(raw: &str, field_type: FieldType) -> Value {
    let raw = raw.trim();
    match field_type {
        FieldType::Text => json!(raw),
        FieldType::Number => {
            if looks_numeric(raw) {
                json!(parse_number(raw))
            } else {
                json!(raw)
            }
        }
        FieldType::Boolean => parse_bool(raw).map(Value::Bool).unwrap_or_else(|| json!(raw)),
        FieldType::Date => parse_date(raw)
            .or_else(|| parse_datetime(raw).map(|dt| dt.date_naive()))
            .map(|d| json!(d.format("%Y-%m-%d").to_string()))
            .unwrap_or_else(|| json!(raw)),
    }
}
