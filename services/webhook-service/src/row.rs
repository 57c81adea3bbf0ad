use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::audit::audit_json;

pub const ITEM_COUNT: usize = 8;
pub const RACE_COUNT: usize = 7;
pub const COLUMN_COUNT: usize = 4 + ITEM_COUNT + 2 + RACE_COUNT + 2;

pub const UNKNOWN_CLIENT: &str = "UnknownClient";
pub const UNKNOWN_CSU: &str = "UnknownCSU";
pub const UNKNOWN_NUMERIC_ID: &str = "UnknownNumericID";

const NUMERIC_ID_KEY: &str = "NumericId";
const GENDER_KEY: &str = "gender";
const AGE_KEY: &str = "age";
const OTHER_RACE_KEY: &str = "race_Other:";
const ITEM_KEY_PREFIX: &str =
    "Please indicate your level of agreement with the following items._item";
const ITEM_KEY_SUFFIX: &str = "_Column2";
const RACE_KEY_PREFIX: &str = "race_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(String),
    Integer(i64),
    Empty,
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Text(text) => serializer.serialize_str(text),
            Cell::Integer(value) => serializer.serialize_i64(*value),
            Cell::Empty => serializer.serialize_str(""),
        }
    }
}

impl From<Option<i64>> for Cell {
    fn from(value: Option<i64>) -> Self {
        value.map_or(Cell::Empty, Cell::Integer)
    }
}

impl From<Option<u8>> for Cell {
    fn from(value: Option<u8>) -> Self {
        value.map_or(Cell::Empty, |flag| Cell::Integer(i64::from(flag)))
    }
}

#[derive(Debug, Default, Clone)]
pub struct SourceHeaders {
    pub org_name: Option<String>,
    pub csu: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebhookRow {
    pub timestamp: String,
    pub client_name: String,
    pub csu: String,
    pub numeric_id: Cell,
    pub items: [Option<i64>; ITEM_COUNT],
    pub gender: Option<i64>,
    pub age: Option<i64>,
    pub race: [Option<u8>; RACE_COUNT],
    pub other_race: Cell,
    pub raw_payload: String,
}

impl WebhookRow {
    pub fn into_cells(self) -> Vec<Cell> {
        // Sheet column order: timestamp, client, CSU, numeric id, items 1-8,
        // gender, age, race 1-7, other race, raw payload.
        let mut cells = Vec::with_capacity(COLUMN_COUNT);
        cells.push(Cell::Text(self.timestamp));
        cells.push(Cell::Text(self.client_name));
        cells.push(Cell::Text(self.csu));
        cells.push(self.numeric_id);
        cells.extend(self.items.into_iter().map(Cell::from));
        cells.push(self.gender.into());
        cells.push(self.age.into());
        cells.extend(self.race.into_iter().map(Cell::from));
        cells.push(self.other_race);
        cells.push(Cell::Text(self.raw_payload));
        cells
    }
}

pub fn build_row(payload: &Value, headers: &SourceHeaders, received_at: DateTime<Utc>) -> WebhookRow {
    // Arrays and scalars carry no named fields; every column takes its fallback.
    let field = |key: &str| payload.as_object().and_then(|fields| fields.get(key));

    let items: [Option<i64>; ITEM_COUNT] = std::array::from_fn(|index| {
        coerce_int(field(&format!("{ITEM_KEY_PREFIX}{}{ITEM_KEY_SUFFIX}", index + 1)))
    });
    let race: [Option<u8>; RACE_COUNT] =
        std::array::from_fn(|index| coerce_flag(field(&format!("{RACE_KEY_PREFIX}{}", index + 1))));

    WebhookRow {
        timestamp: format_timestamp(received_at),
        client_name: headers
            .org_name
            .clone()
            .unwrap_or_else(|| UNKNOWN_CLIENT.to_string()),
        csu: headers.csu.clone().unwrap_or_else(|| UNKNOWN_CSU.to_string()),
        numeric_id: match field(NUMERIC_ID_KEY).filter(|value| !is_blank(value)) {
            Some(value) => verbatim(Some(value)),
            None => Cell::Text(UNKNOWN_NUMERIC_ID.to_string()),
        },
        items,
        gender: coerce_int(field(GENDER_KEY)),
        age: coerce_int(field(AGE_KEY)),
        race,
        other_race: verbatim(field(OTHER_RACE_KEY)),
        raw_payload: audit_json(payload),
    }
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

pub fn coerce_int(value: Option<&Value>) -> Option<i64> {
    // Native integers pass, integer strings are parsed, anything else is missing.
    match value? {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

pub fn coerce_flag(value: Option<&Value>) -> Option<u8> {
    let text = match value? {
        Value::Bool(flag) => return Some(u8::from(*flag)),
        Value::String(text) => text.to_lowercase(),
        Value::Number(number) => number.to_string(),
        _ => return None,
    };
    match text.trim() {
        "true" | "1" | "yes" | "y" => Some(1),
        "false" | "0" | "no" | "n" => Some(0),
        _ => None,
    }
}

fn is_blank(value: &Value) -> bool {
    // Null, false, zero and empty containers all count as "not supplied".
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    }
}

fn verbatim(value: Option<&Value>) -> Cell {
    match value {
        None | Some(Value::Null) => Cell::Empty,
        Some(Value::String(text)) => Cell::Text(text.clone()),
        Some(Value::Number(number)) => number
            .as_i64()
            .map_or_else(|| Cell::Text(number.to_string()), Cell::Integer),
        Some(other) => Cell::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn item_key(n: usize) -> String {
        format!("{ITEM_KEY_PREFIX}{n}{ITEM_KEY_SUFFIX}")
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap()
    }

    #[test]
    fn integer_coercion() {
        assert_eq!(coerce_int(Some(&json!("7"))), Some(7));
        assert_eq!(coerce_int(Some(&json!(7))), Some(7));
        assert_eq!(coerce_int(Some(&json!(" -3 "))), Some(-3));
        assert_eq!(coerce_int(Some(&json!(""))), None);
        assert_eq!(coerce_int(Some(&json!("   "))), None);
        assert_eq!(coerce_int(Some(&json!("abc"))), None);
        assert_eq!(coerce_int(Some(&json!("4.5"))), None);
        assert_eq!(coerce_int(Some(&json!(4.5))), None);
        assert_eq!(coerce_int(Some(&json!(true))), None);
        assert_eq!(coerce_int(Some(&Value::Null)), None);
        assert_eq!(coerce_int(None), None);
    }

    #[test]
    fn flag_coercion() {
        assert_eq!(coerce_flag(Some(&json!(true))), Some(1));
        assert_eq!(coerce_flag(Some(&json!(false))), Some(0));
        assert_eq!(coerce_flag(Some(&json!("No"))), Some(0));
        assert_eq!(coerce_flag(Some(&json!(" YES "))), Some(1));
        assert_eq!(coerce_flag(Some(&json!("y"))), Some(1));
        assert_eq!(coerce_flag(Some(&json!(1))), Some(1));
        assert_eq!(coerce_flag(Some(&json!("0"))), Some(0));
        assert_eq!(coerce_flag(Some(&json!("maybe"))), None);
        assert_eq!(coerce_flag(Some(&Value::Null)), None);
        assert_eq!(coerce_flag(None), None);
    }

    #[test]
    fn builds_full_survey_row_in_column_order() {
        let payload = json!({
            "NumericId": "42",
            "gender": "2",
            "age": "34",
            "race_1": true,
            "race_Other:": "Mixed",
            "Please indicate your level of agreement with the following items._item1_Column2": "5"
        });
        let headers = SourceHeaders {
            org_name: Some("Acme".to_string()),
            csu: Some("North".to_string()),
        };

        let cells = build_row(&payload, &headers, fixed_time()).into_cells();

        assert_eq!(cells.len(), COLUMN_COUNT);
        assert_eq!(cells[0], Cell::Text("2024-03-05T14:07:09.000000".to_string()));
        assert_eq!(cells[1], Cell::Text("Acme".to_string()));
        assert_eq!(cells[2], Cell::Text("North".to_string()));
        assert_eq!(cells[3], Cell::Text("42".to_string()));
        assert_eq!(cells[4], Cell::Integer(5));
        assert!(cells[5..12].iter().all(|cell| *cell == Cell::Empty));
        assert_eq!(cells[12], Cell::Integer(2));
        assert_eq!(cells[13], Cell::Integer(34));
        assert_eq!(cells[14], Cell::Integer(1));
        assert!(cells[15..21].iter().all(|cell| *cell == Cell::Empty));
        assert_eq!(cells[21], Cell::Text("Mixed".to_string()));
        assert_eq!(cells[22], Cell::Text(audit_json(&payload)));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let row = build_row(&json!({}), &SourceHeaders::default(), fixed_time());

        assert_eq!(row.client_name, UNKNOWN_CLIENT);
        assert_eq!(row.csu, UNKNOWN_CSU);
        assert_eq!(row.numeric_id, Cell::Text(UNKNOWN_NUMERIC_ID.to_string()));
        assert_eq!(row.items, [None; ITEM_COUNT]);
        assert_eq!(row.race, [None; RACE_COUNT]);
        assert_eq!(row.other_race, Cell::Empty);
        assert_eq!(row.raw_payload, "{}");
    }

    #[test]
    fn blank_numeric_id_uses_placeholder() {
        for value in [json!(""), Value::Null, json!(0), json!(false), json!([]), json!({})] {
            let row = build_row(&json!({ "NumericId": value }), &SourceHeaders::default(), fixed_time());
            assert_eq!(row.numeric_id, Cell::Text(UNKNOWN_NUMERIC_ID.to_string()));
        }

        let row = build_row(&json!({ "NumericId": 1234 }), &SourceHeaders::default(), fixed_time());
        assert_eq!(row.numeric_id, Cell::Integer(1234));
    }

    #[test]
    fn all_eight_items_map_to_their_own_columns() {
        let mut fields = serde_json::Map::new();
        for n in 1..=ITEM_COUNT {
            fields.insert(item_key(n), json!(n.to_string()));
        }
        let row = build_row(&Value::Object(fields), &SourceHeaders::default(), fixed_time());

        assert_eq!(row.items, [1, 2, 3, 4, 5, 6, 7, 8].map(Some));
    }

    #[test]
    fn non_object_payload_keeps_raw_text_only() {
        let payload = json!([1, 2, 3]);
        let row = build_row(&payload, &SourceHeaders::default(), fixed_time());

        assert_eq!(row.numeric_id, Cell::Text(UNKNOWN_NUMERIC_ID.to_string()));
        assert_eq!(row.gender, None);
        assert_eq!(row.raw_payload, "[1, 2, 3]");
    }

    #[test]
    fn raw_payload_preserves_key_order() {
        let payload: Value = serde_json::from_str(r#"{"zeta":1,"alpha":"a","mid":null}"#).unwrap();
        let row = build_row(&payload, &SourceHeaders::default(), fixed_time());

        assert_eq!(row.raw_payload, r#"{"zeta": 1, "alpha": "a", "mid": null}"#);
    }

    #[test]
    fn oversized_numeric_id_keeps_every_digit() {
        let payload: Value =
            serde_json::from_str(r#"{"NumericId": 123456789012345678901234, "name": "José"}"#)
                .unwrap();
        let row = build_row(&payload, &SourceHeaders::default(), fixed_time());

        assert_eq!(
            row.numeric_id,
            Cell::Text("123456789012345678901234".to_string())
        );
        assert_eq!(
            row.raw_payload,
            r#"{"NumericId": 123456789012345678901234, "name": "Jos\u00e9"}"#
        );
    }

    #[test]
    fn coercions_see_through_exact_number_text() {
        let payload: Value = serde_json::from_str(
            r#"{"gender": 2, "age": 99999999999999999999, "race_1": 1, "race_2": 1.0}"#,
        )
        .unwrap();
        let row = build_row(&payload, &SourceHeaders::default(), fixed_time());

        assert_eq!(row.gender, Some(2));
        assert_eq!(row.age, None);
        assert_eq!(row.race[0], Some(1));
        assert_eq!(row.race[1], None);
    }

    #[test]
    fn cells_serialize_for_raw_write() {
        let cells = vec![
            Cell::Text("a".to_string()),
            Cell::Integer(3),
            Cell::Empty,
        ];
        assert_eq!(serde_json::to_string(&cells).unwrap(), r#"["a",3,""]"#);
    }
}
