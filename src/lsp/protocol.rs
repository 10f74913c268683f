//! LSP-over-stdio framing and the handful of JSON-RPC shapes the bridge
//! speaks: `Content-Length: N\r\n\r\n` followed by `N` bytes of JSON-RPC 2.0.

use std::io::{self, BufRead, Read, Write};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::lsp::client::Position;

/// Write one JSON-RPC frame (used for requests and notifications alike).
pub fn write_frame(writer: &mut impl Write, body: &Value) -> io::Result<()> {
    let text = serde_json::to_string(body)?;
    write!(writer, "Content-Length: {}\r\n\r\n{}", text.len(), text)?;
    writer.flush()
}

/// Read one JSON-RPC frame, blocking until the header and body are
/// available or the stream closes.
pub fn read_frame(reader: &mut impl BufRead) -> io::Result<Option<Value>> {
    let mut content_length: Option<usize> = None;
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line)?;
        if n == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            break;
        }
        if let Some(value) = trimmed.strip_prefix("Content-Length:") {
            content_length = value.trim().parse().ok();
        }
    }
    let Some(len) = content_length else {
        return Ok(None);
    };
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    Ok(Some(serde_json::from_slice(&buf)?))
}

pub fn request(id: u64, method: &str, params: Value) -> Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params,
    })
}

pub fn notification(method: &str, params: Value) -> Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
    })
}

pub fn text_document_position(uri: &str, pos: Position) -> Value {
    serde_json::json!({
        "textDocument": {"uri": uri},
        "position": {"line": pos.line, "character": pos.character},
    })
}

/// A `Location` response from `textDocument/definition` or
/// `textDocument/references`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Location {
    pub uri: String,
    pub line: u32,
    pub character: u32,
}

impl Location {
    /// Parse the handful of response shapes real servers send: a single
    /// `Location`, a `Location[]`, or a `LocationLink[]`.
    pub fn parse_many(value: &Value) -> Vec<Location> {
        let items: Vec<&Value> = match value {
            Value::Array(items) => items.iter().collect(),
            Value::Object(_) => vec![value],
            _ => Vec::new(),
        };
        items.iter().filter_map(|v| Self::parse_one(v)).collect()
    }

    fn parse_one(value: &Value) -> Option<Location> {
        let uri = value
            .get("uri")
            .or_else(|| value.get("targetUri"))
            .and_then(Value::as_str)?
            .to_string();
        let range = value.get("range").or_else(|| value.get("targetRange"))?;
        let start = range.get("start")?;
        let line = start.get("line")?.as_u64()? as u32;
        let character = start.get("character")?.as_u64()? as u32;
        Some(Location { uri, line, character })
    }
}

/// A flattened `textDocument/documentSymbol` result. Real servers return a
/// nested `DocumentSymbol[]` or a flat `SymbolInformation[]`; both are
/// flattened into this one shape.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DocumentSymbol {
    pub name: String,
    pub kind: u32,
    pub start_line: u32,
    pub end_line: u32,
}

impl DocumentSymbol {
    pub fn parse_many(value: &Value) -> Vec<DocumentSymbol> {
        let Value::Array(items) = value else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for item in items {
            Self::collect(item, &mut out);
        }
        out
    }

    fn collect(value: &Value, out: &mut Vec<DocumentSymbol>) {
        let name = value.get("name").and_then(Value::as_str).map(str::to_string);
        let kind = value.get("kind").and_then(Value::as_u64).unwrap_or(12) as u32;
        let range = value
            .get("range")
            .or_else(|| value.get("location").and_then(|l| l.get("range")));
        if let (Some(name), Some(range)) = (name.clone(), range) {
            if let (Some(start), Some(end)) = (range.get("start"), range.get("end")) {
                if let (Some(sl), Some(el)) = (
                    start.get("line").and_then(Value::as_u64),
                    end.get("line").and_then(Value::as_u64),
                ) {
                    out.push(DocumentSymbol {
                        name,
                        kind,
                        start_line: sl as u32 + 1,
                        end_line: el as u32 + 1,
                    });
                }
            }
        }
        if let Some(children) = value.get("children").and_then(Value::as_array) {
            for child in children {
                Self::collect(child, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_round_trips() {
        let mut buf: Vec<u8> = Vec::new();
        write_frame(&mut buf, &serde_json::json!({"jsonrpc": "2.0", "id": 1})).unwrap();
        let mut cursor = io::Cursor::new(buf);
        let value = read_frame(&mut cursor).unwrap().unwrap();
        assert_eq!(value["id"], 1);
    }

    #[test]
    fn eof_yields_none() {
        let mut cursor = io::Cursor::new(Vec::<u8>::new());
        assert!(read_frame(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn parses_nested_document_symbols() {
        let value = serde_json::json!([{
            "name": "Outer",
            "kind": 5,
            "range": {"start": {"line": 0, "character": 0}, "end": {"line": 10, "character": 0}},
            "children": [{
                "name": "inner",
                "kind": 6,
                "range": {"start": {"line": 2, "character": 0}, "end": {"line": 4, "character": 0}},
            }],
        }]);
        let symbols = DocumentSymbol::parse_many(&value);
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[0].name, "Outer");
        assert_eq!(symbols[1].start_line, 3);
    }
}
