// src/services/import/reader.rs

use std::collections::HashMap;

/// Uma linha do arquivo: cabeçalho -> valor bruto.
pub type Row = HashMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

/// Quebra o texto em registros de campos. Vírgula e tab separam campos fora de aspas;
/// dentro de aspas tudo é literal e `""` vira uma aspa.
fn tokenize(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' | '\t' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }

    // Último registro sem quebra de linha final
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    records
}

fn is_blank(record: &[String]) -> bool {
    record.iter().all(|f| f.trim().is_empty())
}

/// Converte o conteúdo bruto em cabeçalhos + linhas.
/// Linhas vazias somem, linhas curtas são completadas com "" e colunas extras são ignoradas.
pub fn parse_delimited(text: &str) -> ParsedTable {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut records = tokenize(text).into_iter().filter(|r| !is_blank(r));

    let Some(header_record) = records.next() else {
        return ParsedTable::default();
    };
    let headers: Vec<String> = header_record.iter().map(|h| h.trim().to_string()).collect();

    let rows = records
        .map(|record| {
            headers
                .iter()
                .enumerate()
                .map(|(i, header)| (header.clone(), record.get(i).cloned().unwrap_or_default()))
                .collect::<Row>()
        })
        .collect();

    ParsedTable { headers, rows }
}
