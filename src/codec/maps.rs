//! Port-map and var-map annotation text.
//!
//! ```text
//! dat-ports  x=3:value,4:value;y=5:value;z=
//! dat-vars   x=12,13;y=14;z=
//! ```
//!
//! Both share one grammar: `;`-separated `param=list` segments where the
//! list is `,`-separated and may be empty. The empty string is the empty map.

use super::error::{DecodeError, DecodeResult};
use super::{ASSIGN, LIST_SEP, PORT_SEP, SEGMENT_SEP};
use crate::id::{ConnectionId, ModuleId};
use crate::types::{PortMap, PortTarget, VarMap};
use indexmap::IndexMap;

fn encode_map<T>(map: &IndexMap<String, Vec<T>>, item: impl Fn(&T) -> String) -> String {
    map.iter()
        .map(|(param, list)| {
            let items: Vec<String> = list.iter().map(&item).collect();
            format!("{}{}{}", param, ASSIGN, items.join(LIST_SEP))
        })
        .collect::<Vec<_>>()
        .join(SEGMENT_SEP)
}

fn decode_map<T>(
    text: &str,
    item: impl Fn(&str) -> DecodeResult<T>,
) -> DecodeResult<IndexMap<String, Vec<T>>> {
    let mut map = IndexMap::new();
    if text.is_empty() {
        return Ok(map);
    }

    for segment in text.split(SEGMENT_SEP) {
        let (param, list) = segment
            .split_once(ASSIGN)
            .ok_or_else(|| DecodeError::MalformedSegment(segment.to_string()))?;
        if param.is_empty() {
            return Err(DecodeError::MalformedSegment(segment.to_string()));
        }

        let values = if list.is_empty() {
            Vec::new()
        } else {
            list.split(LIST_SEP)
                .map(&item)
                .collect::<DecodeResult<Vec<T>>>()?
        };

        if map.insert(param.to_string(), values).is_some() {
            return Err(DecodeError::DuplicateParameter(param.to_string()));
        }
    }
    Ok(map)
}

fn decode_port(text: &str) -> DecodeResult<PortTarget> {
    let mut parts = text.split(PORT_SEP);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(module), Some(port), None) => {
            let module: ModuleId = module
                .parse()
                .map_err(|_| DecodeError::BadModuleId(module.to_string()))?;
            Ok(PortTarget::new(module, port))
        }
        _ => Err(DecodeError::MalformedPort(text.to_string())),
    }
}

/// Encode a port map as `param=mod:port,mod:port;...`
pub fn encode_port_map(port_map: &PortMap) -> String {
    encode_map(port_map, |t| format!("{}{}{}", t.module, PORT_SEP, t.port))
}

pub fn parse_port_map(text: &str) -> DecodeResult<PortMap> {
    decode_map(text, decode_port)
}

/// Decode a port map; any malformed entry discards the whole map.
pub fn decode_port_map(text: &str) -> Option<PortMap> {
    parse_port_map(text).ok()
}

/// Encode a var map as `param=conn,conn;...`
pub fn encode_var_map(var_map: &VarMap) -> String {
    encode_map(var_map, |c| c.to_string())
}

pub fn parse_var_map(text: &str) -> DecodeResult<VarMap> {
    decode_map(text, |item| {
        item.parse::<ConnectionId>()
            .map_err(|_| DecodeError::BadConnectionId(item.to_string()))
    })
}

/// Decode a var map; any malformed entry discards the whole map.
pub fn decode_var_map(text: &str) -> Option<VarMap> {
    parse_var_map(text).ok()
}
