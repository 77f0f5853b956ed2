//! Submitted values as a tree of named entries, decoded from forms or JSON bodies.

use crate::codec;
use serde_json::Value;
use std::collections::BTreeMap;

/// Name of the pseudo-field that asks for a nested record to be deleted.
pub const DESTROY: &str = "_destroy";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetaValue {
    pub name: String,
    pub value: Value,
    /// Position for elements of an indexed list (`Addresses[2]`).
    pub index: Option<usize>,
    pub meta_values: MetaValues,
}

impl MetaValue {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        MetaValue {
            name: name.into(),
            value: value.into(),
            index: None,
            meta_values: MetaValues::default(),
        }
    }

    pub fn nested(name: impl Into<String>, index: Option<usize>, meta_values: MetaValues) -> Self {
        MetaValue {
            name: name.into(),
            value: Value::Null,
            index,
            meta_values,
        }
    }

    pub fn has_nested(&self) -> bool {
        !self.meta_values.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetaValues {
    pub values: Vec<MetaValue>,
}

impl MetaValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: MetaValue) {
        self.values.push(value);
    }

    pub fn with(mut self, value: MetaValue) -> Self {
        self.values.push(value);
        self
    }

    /// First entry named `name`.
    pub fn get(&self, name: &str) -> Option<&MetaValue> {
        self.values.iter().find(|v| v.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MetaValue> {
        self.values.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// `_destroy` present with anything but `""`, `0` or `false`.
    pub fn is_destroy(&self) -> bool {
        match self.get(DESTROY) {
            Some(v) => !matches!(codec::to_string(&v.value).as_str(), "" | "0" | "false"),
            None => false,
        }
    }

    /// Decodes form pairs such as `QorResource.Addresses[2].Address1=x`. Keys outside `prefix`
    /// are ignored; indexed elements are grouped and sorted by index; repeated keys collect
    /// into a list.
    pub fn from_form<K, V>(prefix: &str, pairs: &[(K, V)]) -> MetaValues
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut node = FormNode::default();
        let lead = format!("{}.", prefix);
        for (key, value) in pairs {
            let Some(path) = key.as_ref().strip_prefix(&lead) else {
                continue;
            };
            node.insert(path, value.as_ref());
        }
        node.into_meta_values()
    }

    /// Decodes a JSON object: nested objects become nested values, arrays of objects become
    /// indexed elements, everything else is a raw value.
    pub fn from_json(value: &Value) -> MetaValues {
        let mut out = MetaValues::new();
        let Value::Object(map) = value else {
            return out;
        };
        for (name, v) in map {
            match v {
                Value::Object(_) => out.push(MetaValue::nested(name.clone(), None, Self::from_json(v))),
                Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_object) => {
                    for (i, item) in items.iter().enumerate() {
                        out.push(MetaValue::nested(name.clone(), Some(i), Self::from_json(item)));
                    }
                }
                other => out.push(MetaValue::new(name.clone(), other.clone())),
            }
        }
        out
    }
}

impl<'a> IntoIterator for &'a MetaValues {
    type Item = &'a MetaValue;
    type IntoIter = std::slice::Iter<'a, MetaValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// Intermediate tree for form decoding. Entries keep first-seen order.
#[derive(Default)]
struct FormNode {
    entries: Vec<(String, FormEntry)>,
}

enum FormEntry {
    Value(Vec<String>),
    Nested(FormNode),
    Indexed(BTreeMap<usize, FormNode>),
}

impl FormNode {
    fn entry(&mut self, name: &str, make: impl FnOnce() -> FormEntry) -> &mut FormEntry {
        let pos = match self.entries.iter().position(|(n, _)| n == name) {
            Some(pos) => pos,
            None => {
                self.entries.push((name.to_string(), make()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[pos].1
    }

    fn insert(&mut self, path: &str, value: &str) {
        let (head, rest) = match path.split_once('.') {
            Some((h, r)) => (h, Some(r)),
            None => (path, None),
        };
        if let Some((name, index)) = parse_indexed(head) {
            let entry = self.entry(name, || FormEntry::Indexed(BTreeMap::new()));
            if let FormEntry::Indexed(elements) = entry {
                let element = elements.entry(index).or_default();
                if let Some(rest) = rest {
                    element.insert(rest, value);
                }
            }
            return;
        }
        match rest {
            Some(rest) => {
                let entry = self.entry(head, || FormEntry::Nested(FormNode::default()));
                if let FormEntry::Nested(child) = entry {
                    child.insert(rest, value);
                }
            }
            None => {
                let entry = self.entry(head, || FormEntry::Value(Vec::new()));
                if let FormEntry::Value(values) = entry {
                    values.push(value.to_string());
                }
            }
        }
    }

    fn into_meta_values(self) -> MetaValues {
        let mut out = MetaValues::new();
        for (name, entry) in self.entries {
            match entry {
                FormEntry::Value(mut values) => {
                    let value = if values.len() == 1 {
                        Value::String(values.remove(0))
                    } else {
                        Value::Array(values.into_iter().map(Value::String).collect())
                    };
                    out.push(MetaValue::new(name, value));
                }
                FormEntry::Nested(child) => {
                    out.push(MetaValue::nested(name, None, child.into_meta_values()));
                }
                FormEntry::Indexed(elements) => {
                    for (index, child) in elements {
                        out.push(MetaValue::nested(name.clone(), Some(index), child.into_meta_values()));
                    }
                }
            }
        }
        out
    }
}

/// `Addresses[2]` -> (`Addresses`, 2).
fn parse_indexed(segment: &str) -> Option<(&str, usize)> {
    let (name, rest) = segment.split_once('[')?;
    let index = rest.strip_suffix(']')?.parse().ok()?;
    Some((name, index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_indexed_form_pairs() {
        let pairs = vec![
            ("QorResource.Name", "jinzhu"),
            ("QorResource.Addresses[10].Address1", "ten"),
            ("QorResource.Addresses[2].ID", "3"),
            ("QorResource.Addresses[2]._destroy", "1"),
            ("QorResource.CreditCard.Number", "42"),
            ("QorResource.Languages", "1"),
            ("QorResource.Languages", "2"),
            ("other.Name", "ignored"),
        ];
        let values = MetaValues::from_form("QorResource", &pairs);

        let names: Vec<(&str, Option<usize>)> =
            values.iter().map(|v| (v.name.as_str(), v.index)).collect();
        assert_eq!(
            names,
            vec![
                ("Name", None),
                ("Addresses", Some(2)),
                ("Addresses", Some(10)),
                ("CreditCard", None),
                ("Languages", None),
            ]
        );
        assert_eq!(values.get("Name").unwrap().value, json!("jinzhu"));
        assert!(values.values[1].meta_values.is_destroy());
        assert!(!values.values[2].meta_values.is_destroy());
        assert_eq!(
            values.get("CreditCard").unwrap().meta_values.get("Number").unwrap().value,
            json!("42")
        );
        assert_eq!(values.get("Languages").unwrap().value, json!(["1", "2"]));
    }

    #[test]
    fn destroy_flags() {
        for (raw, expected) in [("1", true), ("true", true), ("0", false), ("", false), ("false", false)] {
            let values = MetaValues::new().with(MetaValue::new(DESTROY, raw));
            assert_eq!(values.is_destroy(), expected, "{raw}");
        }
        assert!(!MetaValues::new().is_destroy());
    }

    #[test]
    fn decodes_json_bodies() {
        let values = MetaValues::from_json(&json!({
            "Name": "jinzhu",
            "Languages": [1, 2],
            "Profile": {"Name": "p"},
            "Addresses": [{"Address1": "a"}, {"Address1": "b"}]
        }));
        assert_eq!(values.get("Languages").unwrap().value, json!([1, 2]));
        assert_eq!(values.get("Profile").unwrap().meta_values.get("Name").unwrap().value, json!("p"));
        let addresses: Vec<Option<usize>> = values
            .iter()
            .filter(|v| v.name == "Addresses")
            .map(|v| v.index)
            .collect();
        assert_eq!(addresses, vec![Some(0), Some(1)]);
    }

    #[test]
    fn json_bodies_keep_submission_order() {
        let values = MetaValues::from_json(&json!({"Name": "jinzhu", "Age": 28, "Role": "admin"}));
        let names: Vec<&str> = values.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["Name", "Age", "Role"]);
    }
}
