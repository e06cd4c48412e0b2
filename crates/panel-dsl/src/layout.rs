//! Layout config codec
//!
//! A [`LayoutConfig`] is the ordered set of canonical spec strings describing
//! every live panel in a session. It is the only persisted state: files join
//! lines with `\n`, shared URLs join them with `?`.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::parser::trim_boundaries;

/// How layout lines are joined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutSeparator {
    /// Downloadable layout file
    Newline,
    /// URL query string
    Query,
}

impl LayoutSeparator {
    pub fn as_char(&self) -> char {
        match self {
            LayoutSeparator::Newline => '\n',
            LayoutSeparator::Query => '?',
        }
    }
}

/// One persisted panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutEntry {
    pub string: String,
}

/// Ordered `key -> {string}` map; insertion order is display order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutConfig {
    entries: Vec<(String, LayoutEntry)>,
}

impl LayoutConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&LayoutEntry> {
        self.position(key).map(|i| &self.entries[i].1)
    }

    /// Append a new entry, or overwrite an existing one in place
    pub fn insert(&mut self, key: impl Into<String>, string: impl Into<String>) {
        let key = key.into();
        let entry = LayoutEntry {
            string: string.into(),
        };
        match self.position(&key) {
            Some(i) => self.entries[i].1 = entry,
            None => self.entries.push((key, entry)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<LayoutEntry> {
        self.position(key).map(|i| self.entries.remove(i).1)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LayoutEntry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    /// Spec strings in display order
    pub fn spec_strings(&self) -> Vec<&str> {
        self.entries.iter().map(|(_, e)| e.string.as_str()).collect()
    }

    pub fn encode(&self, separator: LayoutSeparator) -> String {
        encode(self, separator)
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }
}

impl Serialize for LayoutConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, e) in &self.entries {
            map.serialize_entry(k, e)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for LayoutConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LayoutVisitor;

        impl<'de> Visitor<'de> for LayoutVisitor {
            type Value = LayoutConfig;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of panel keys to layout entries")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<LayoutConfig, A::Error> {
                let mut cfg = LayoutConfig::new();
                while let Some((k, e)) = access.next_entry::<String, LayoutEntry>()? {
                    cfg.insert(k, e.string);
                }
                Ok(cfg)
            }
        }

        deserializer.deserialize_map(LayoutVisitor)
    }
}

// ============================================================================
// Codec
// ============================================================================

/// Characters left readable in a query line; they are grammar, not data
const QUERY_SAFE: [(&str, char); 5] = [("%2C", ','), ("%3D", '='), ("%7C", '|'), ("%3A", ':'), ("%2F", '/')];

/// Join canonical spec strings in display order
///
/// Query lines are percent-escaped one at a time, so a `?`, `%`, `#` or
/// `&` inside a value cannot be mistaken for URL structure.
pub fn encode(cfg: &LayoutConfig, separator: LayoutSeparator) -> String {
    let lines = cfg.entries.iter().map(|(_, e)| match separator {
        LayoutSeparator::Newline => e.string.clone(),
        LayoutSeparator::Query => escape_query_line(&e.string),
    });
    let sep = separator.as_char().to_string();
    lines.collect::<Vec<_>>().join(&sep)
}

/// Split layout text into trimmed, non-blank spec lines
///
/// Query text is split on raw `?` first; each segment is percent-decoded
/// afterwards.
pub fn decode(text: &str, separator: LayoutSeparator) -> Vec<String> {
    text.split(separator.as_char())
        .map(|segment| match separator {
            LayoutSeparator::Newline => trim_boundaries(segment).to_string(),
            LayoutSeparator::Query => trim_boundaries(&unescape_query_line(segment)).to_string(),
        })
        .filter(|line| !line.is_empty())
        .collect()
}

/// Decode a URL search string (with or without its leading `?`)
///
/// Segments may be fully percent-encoded; `%2C` and `%3D` from browsers
/// that escape more than needed read back as `,` and `=`.
pub fn decode_query(search: &str) -> Vec<String> {
    decode(search, LayoutSeparator::Query)
}

fn escape_query_line(line: &str) -> String {
    let mut escaped = urlencoding::encode(line).into_owned();
    // Every '%' in the output starts an escape, so these only match real escapes
    for (code, c) in QUERY_SAFE {
        escaped = escaped.replace(code, &c.to_string());
    }
    escaped
}

fn unescape_query_line(segment: &str) -> String {
    match urlencoding::decode(segment) {
        Ok(text) => text.into_owned(),
        Err(e) => {
            tracing::debug!("Layout segment is not valid percent-encoded UTF-8: {}", e);
            segment.to_string()
        }
    }
}

/// Shareable link that re-creates the layout on load
pub fn share_url(base: &str, cfg: &LayoutConfig) -> String {
    if cfg.is_empty() {
        return base.to_string();
    }
    format!("{}?{}", base, encode(cfg, LayoutSeparator::Query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn sample() -> LayoutConfig {
        let mut cfg = LayoutConfig::new();
        cfg.insert("1-0", "cemba_cell,categorical_scatter,l1_tsne,CellSubClass");
        cfg.insert(
            "1-1",
            "higlass,multi_cell_type_2d,cell_types=CA3 Glut|Sst Gaba,region1=Gad1",
        );
        cfg
    }

    #[test]
    fn test_encode_newline() {
        assert_eq!(
            sample().encode(LayoutSeparator::Newline),
            "cemba_cell,categorical_scatter,l1_tsne,CellSubClass\n\
             higlass,multi_cell_type_2d,cell_types=CA3 Glut|Sst Gaba,region1=Gad1"
        );
    }

    #[test]
    fn test_share_url_escapes_spaces() {
        let url = share_url("http://localhost:3000/dynamic_browser", &sample());
        assert_eq!(
            url,
            "http://localhost:3000/dynamic_browser?cemba_cell,categorical_scatter,l1_tsne,CellSubClass\
             ?higlass,multi_cell_type_2d,cell_types=CA3%20Glut|Sst%20Gaba,region1=Gad1"
        );
    }

    #[test]
    fn test_decode_query_round_trip() {
        let cfg = sample();
        let query = format!("?{}", cfg.encode(LayoutSeparator::Query));
        let lines = decode_query(&query);
        assert_eq!(lines, cfg.spec_strings());
    }

    #[test]
    fn test_decode_query_handles_full_percent_encoding() {
        let lines = decode_query("?cemba_cell%2Ccontinuous_scatter%2Cl1_tsne%2Ccolor%3Dgene_mch%3AGad1");
        assert_eq!(
            lines,
            vec!["cemba_cell,continuous_scatter,l1_tsne,color=gene_mch:Gad1".to_string()]
        );
    }

    #[test]
    fn test_query_reserved_characters_survive_round_trip() {
        let mut cfg = LayoutConfig::new();
        cfg.insert("1-0", "cemba_cell,categorical_scatter,l1_tsne,color=a?b");
        cfg.insert("1-1", "cemba_cell,categorical_scatter,l1_tsne,label=a%2Cb&c#d");
        let url = share_url("https://wmb.test/", &cfg);
        assert_eq!(
            url,
            "https://wmb.test/?cemba_cell,categorical_scatter,l1_tsne,color=a%3Fb\
             ?cemba_cell,categorical_scatter,l1_tsne,label=a%252Cb%26c%23d"
        );

        let search = &url["https://wmb.test/".len()..];
        assert_eq!(decode_query(search), cfg.spec_strings());
    }

    #[test]
    fn test_query_lines_parse_back_to_same_spec() {
        let line = "cemba_cell,continuous_scatter,l1_tsne,color=gene_mch:Gad1?x,title=50%";
        let spec = crate::parse_spec_line(line).unwrap();
        let mut cfg = LayoutConfig::new();
        cfg.insert("1-0", spec.to_spec_string());

        let lines = decode_query(&format!("?{}", cfg.encode(LayoutSeparator::Query)));
        let reparsed = crate::parse_spec_line(&lines[0]).unwrap();
        assert_eq!(reparsed, spec);
    }

    #[test]
    fn test_decode_skips_blank_lines() {
        let lines = decode("\n a,b \r\n\n,c,d,\n", LayoutSeparator::Newline);
        assert_eq!(lines, vec!["a,b".to_string(), "c,d".to_string()]);
    }

    #[test]
    fn test_insert_existing_key_keeps_position() {
        let mut cfg = sample();
        cfg.insert("1-0", "cemba_cell,categorical_scatter,l1_umap,CellClass");
        assert_eq!(cfg.keys().collect::<Vec<_>>(), vec!["1-0", "1-1"]);
        assert_eq!(
            cfg.get("1-0").unwrap().string,
            "cemba_cell,categorical_scatter,l1_umap,CellClass"
        );
    }

    #[test]
    fn test_json_preserves_order() {
        let mut cfg = LayoutConfig::new();
        cfg.insert("2-0", "b");
        cfg.insert("1-0", "a");
        let json = serde_json::to_string(&cfg).unwrap();
        assert_eq!(json, r#"{"2-0":{"string":"b"},"1-0":{"string":"a"}}"#);
        let back: LayoutConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }

    fn canonical_line() -> impl Strategy<Value = String> {
        let positional = "[a-z][a-z0-9_]{0,8}";
        let keyword = ("[a-z][a-z_]{0,6}", "[A-Za-z0-9]([A-Za-z0-9: |?%#&/]{0,6}[A-Za-z0-9])?")
            .prop_map(|(k, v)| format!("{}={}", k, v));
        let field = prop_oneof![positional.prop_map(String::from), keyword];
        prop::collection::vec(field, 2..6).prop_map(|fields| fields.join(","))
    }

    proptest! {
        #[test]
        fn prop_encode_decode_encode_is_stable(
            lines in prop::collection::vec(canonical_line(), 0..6),
            use_query in any::<bool>(),
        ) {
            let separator = if use_query { LayoutSeparator::Query } else { LayoutSeparator::Newline };
            let mut cfg = LayoutConfig::new();
            for (i, line) in lines.iter().enumerate() {
                cfg.insert(format!("1-{}", i), line.clone());
            }
            let encoded = encode(&cfg, separator);

            let mut rebuilt = LayoutConfig::new();
            for (i, line) in decode(&encoded, separator).into_iter().enumerate() {
                rebuilt.insert(format!("1-{}", i), line);
            }
            prop_assert_eq!(encode(&rebuilt, separator), encoded);
            prop_assert_eq!(rebuilt, cfg);
        }
    }
}
