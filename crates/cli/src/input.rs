use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use csv::ReaderBuilder;
use flate2::read::MultiGzDecoder;
use rakeweight_core::Response;

#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Column holding the respondent id; defaults to the first column.
    #[arg(long = "id-column")]
    pub id_column: Option<String>,
    /// Field delimiter, a single character or `tab`.
    #[arg(long, default_value = ",")]
    pub delimiter: String,
}

/// Responses read from a delimited file.
#[derive(Debug, Clone)]
pub struct ResponseTable {
    pub id_column: String,
    pub responses: Vec<Response>,
}

pub fn parse_delimiter(raw: &str) -> Result<u8> {
    match raw {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        other => {
            let bytes = other.as_bytes();
            if bytes.len() == 1 && bytes[0].is_ascii() {
                Ok(bytes[0])
            } else {
                Err(anyhow!(
                    "delimiter must be a single ASCII character, got {other:?}"
                ))
            }
        }
    }
}

pub fn read_responses(path: &Path, args: &InputArgs) -> Result<ResponseTable> {
    let delimiter = parse_delimiter(&args.delimiter)?;
    let file = fs::File::open(path)
        .with_context(|| format!("failed to open responses {}", path.display()))?;
    let gzipped = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false);
    if gzipped {
        read_from(path, MultiGzDecoder::new(file), delimiter, args.id_column.as_deref())
    } else {
        read_from(path, file, delimiter, args.id_column.as_deref())
    }
}

fn read_from<R: Read>(
    path: &Path,
    reader: R,
    delimiter: u8,
    id_column: Option<&str>,
) -> Result<ResponseTable> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(reader);
    let headers = reader
        .headers()
        .map(|h| h.iter().map(|cell| cell.to_string()).collect::<Vec<_>>())
        .with_context(|| format!("missing headers in {}", path.display()))?;
    if headers.is_empty() {
        bail!("no columns in {}", path.display());
    }
    let id_idx = match id_column {
        Some(name) => headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| anyhow!("id column {name} not found in {}", path.display()))?,
        None => 0,
    };

    let mut responses = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record =
            record.with_context(|| format!("invalid row {} in {}", row + 2, path.display()))?;
        let id = record
            .get(id_idx)
            .ok_or_else(|| anyhow!("row {} in {} has no id", row + 2, path.display()))?;
        let mut response = Response::new(id);
        for (idx, (header, value)) in headers.iter().zip(record.iter()).enumerate() {
            if idx == id_idx {
                continue;
            }
            response.values.insert(header.clone(), value.to_string());
        }
        responses.push(response);
    }
    Ok(ResponseTable {
        id_column: headers[id_idx].clone(),
        responses,
    })
}
