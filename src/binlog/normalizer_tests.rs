#[cfg(test)]
mod tests {
    use super::super::normalizer::*;
    use super::super::types::*;
    use serde_json::{json, Value};

    fn columns() -> Vec<ColumnMeta> {
        vec![
            ColumnMeta::new("id", ColumnKind::Integer),
            ColumnMeta::new("name", ColumnKind::Text),
            ColumnMeta::new("active", ColumnKind::Boolean),
        ]
    }

    fn row(id: i64, name: &str, active: i64) -> Vec<RawValue> {
        vec![
            RawValue::Numeric(id.to_string()),
            RawValue::Text(name.to_string()),
            RawValue::Int(active),
        ]
    }

    fn rows_event(action: Action, rows: Vec<Vec<RawValue>>) -> RowsEvent {
        RowsEvent {
            table: "users".to_string(),
            action,
            columns: columns(),
            rows,
        }
    }

    #[test]
    fn test_null_is_null_for_every_kind() {
        for kind in [
            ColumnKind::Text,
            ColumnKind::Date,
            ColumnKind::DateTime,
            ColumnKind::Boolean,
            ColumnKind::Bit,
            ColumnKind::Float,
            ColumnKind::Integer,
            ColumnKind::Other,
        ] {
            assert_eq!(coerce(kind, &RawValue::Null), Value::Null, "kind {:?}", kind);
        }
    }

    #[test]
    fn test_text_base64_payload_is_decoded() {
        let raw = RawValue::Bytes(b"aGVsbG8gd29ybGQ=".to_vec());
        assert_eq!(coerce(ColumnKind::Text, &raw), json!("hello world"));
    }

    #[test]
    fn test_text_invalid_base64_kept_as_text() {
        let raw = RawValue::Bytes(b"plain text!".to_vec());
        assert_eq!(coerce(ColumnKind::Text, &raw), json!("plain text!"));
    }

    #[test]
    fn test_text_string_value_unchanged() {
        let raw = RawValue::Text("aGVsbG8=".to_string());
        assert_eq!(coerce(ColumnKind::Text, &raw), json!("aGVsbG8="));
    }

    #[test]
    fn test_date_reformatted_at_midnight_utc() {
        let raw = RawValue::Text("2023-07-01".to_string());
        assert_eq!(coerce(ColumnKind::Date, &raw), json!("2023-07-01T00:00:00Z"));
    }

    #[test]
    fn test_date_unparseable_passes_through() {
        let raw = RawValue::Text("not-a-date".to_string());
        assert_eq!(coerce(ColumnKind::Date, &raw), json!("not-a-date"));

        let zero = RawValue::Text("0000-00-00".to_string());
        assert_eq!(coerce(ColumnKind::Date, &zero), json!("0000-00-00"));
    }

    #[test]
    fn test_date_without_zero_padding_passes_through() {
        let raw = RawValue::Text("2023-7-1".to_string());
        assert_eq!(coerce(ColumnKind::Date, &raw), json!("2023-7-1"));

        let spaced = RawValue::Text(" 2023-07-01".to_string());
        assert_eq!(coerce(ColumnKind::Date, &spaced), json!(" 2023-07-01"));
    }

    #[test]
    fn test_datetime_passes_through() {
        let raw = RawValue::Time("2023-07-01 12:34:56".to_string());
        assert_eq!(
            coerce(ColumnKind::DateTime, &raw),
            json!("2023-07-01 12:34:56")
        );
    }

    #[test]
    fn test_boolean_coercion() {
        assert_eq!(coerce(ColumnKind::Boolean, &RawValue::Int(1)), json!(true));
        assert_eq!(coerce(ColumnKind::Boolean, &RawValue::Bool(true)), json!(true));
        assert_eq!(coerce(ColumnKind::Boolean, &RawValue::Int(0)), json!(false));
        assert_eq!(coerce(ColumnKind::Boolean, &RawValue::Bool(false)), json!(false));
        assert_eq!(coerce(ColumnKind::Boolean, &RawValue::Int(7)), json!(false));
        assert_eq!(
            coerce(ColumnKind::Boolean, &RawValue::Text("yes".to_string())),
            json!(false)
        );
    }

    #[test]
    fn test_bit_from_bytes() {
        assert_eq!(coerce(ColumnKind::Bit, &RawValue::Bytes(vec![0x01])), json!(true));
        assert_eq!(coerce(ColumnKind::Bit, &RawValue::Bytes(vec![0x80, 0x00])), json!(true));
        assert_eq!(coerce(ColumnKind::Bit, &RawValue::Bytes(vec![0x00])), json!(false));
        assert_eq!(coerce(ColumnKind::Bit, &RawValue::Bytes(vec![0x00, 0x00])), json!(false));
        assert_eq!(coerce(ColumnKind::Bit, &RawValue::Bytes(vec![])), json!(false));
    }

    #[test]
    fn test_bit_from_bool_and_numbers() {
        assert_eq!(coerce(ColumnKind::Bit, &RawValue::Bool(true)), json!(true));
        assert_eq!(coerce(ColumnKind::Bit, &RawValue::Bool(false)), json!(false));
        assert_eq!(coerce(ColumnKind::Bit, &RawValue::UInt(1)), json!(true));
        assert_eq!(coerce(ColumnKind::Bit, &RawValue::Int(2)), json!(false));
    }

    #[test]
    fn test_float_from_numeric_token() {
        let value = coerce(ColumnKind::Float, &RawValue::Numeric("12.50".to_string()));
        assert!((value.as_f64().unwrap() - 12.5).abs() < f64::EPSILON);

        let bad = RawValue::Numeric("12.5.0".to_string());
        assert_eq!(coerce(ColumnKind::Float, &bad), json!("12.5.0"));

        assert_eq!(coerce(ColumnKind::Float, &RawValue::Float(0.25)), json!(0.25));
    }

    #[test]
    fn test_integer_from_numeric_token() {
        assert_eq!(
            coerce(ColumnKind::Integer, &RawValue::Numeric("9876543210".to_string())),
            json!(9876543210i64)
        );

        // Out of i64 range but within u64, still an exact number.
        let huge = RawValue::Numeric("18446744073709551615".to_string());
        assert_eq!(coerce(ColumnKind::Integer, &huge), json!(18446744073709551615u64));

        let wider = RawValue::Numeric("123456789012345678901234567890".to_string());
        assert_eq!(
            coerce(ColumnKind::Integer, &wider),
            json!("123456789012345678901234567890")
        );

        let fraction = RawValue::Numeric("12.75".to_string());
        assert_eq!(coerce(ColumnKind::Integer, &fraction), json!(12.75));

        assert_eq!(coerce(ColumnKind::Integer, &RawValue::Int(-3)), json!(-3));
    }

    #[test]
    fn test_other_passes_through() {
        assert_eq!(
            coerce(ColumnKind::Other, &RawValue::Text("{\"a\":1}".to_string())),
            json!("{\"a\":1}")
        );
        assert_eq!(
            coerce(ColumnKind::Other, &RawValue::Bytes(vec![0xde, 0xad])),
            json!("3q0=")
        );
    }

    #[test]
    fn test_insert_yields_one_record_per_row() {
        let event = rows_event(
            Action::Insert,
            vec![row(1, "alice", 1), row(2, "bob", 0), row(3, "carol", 1)],
        );

        let records: Vec<_> = normalize(&event).collect();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.before.is_none()));
        assert_eq!(records[1].table(), "users");

        let after = records[1].after.as_ref().unwrap();
        assert_eq!(after["id"], json!(2));
        assert_eq!(after["name"], json!("bob"));
        assert_eq!(after["active"], json!(false));
    }

    #[test]
    fn test_update_pairs_before_and_after() {
        let event = rows_event(
            Action::Update,
            vec![
                row(1, "alice", 1),
                row(1, "alicia", 1),
                row(2, "bob", 0),
                row(2, "bob", 1),
            ],
        );

        let records: Vec<_> = normalize(&event).collect();
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].before.as_ref().unwrap()["name"], json!("alice"));
        assert_eq!(records[0].after.as_ref().unwrap()["name"], json!("alicia"));
        assert_eq!(records[1].before.as_ref().unwrap()["active"], json!(false));
        assert_eq!(records[1].after.as_ref().unwrap()["active"], json!(true));
    }

    #[test]
    fn test_update_drops_unpaired_trailing_row() {
        let event = rows_event(
            Action::Update,
            vec![
                row(1, "alice", 1),
                row(1, "alicia", 1),
                row(2, "bob", 0),
            ],
        );

        let records: Vec<_> = normalize(&event).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].after.as_ref().unwrap()["id"], json!(1));

        let single = rows_event(Action::Update, vec![row(5, "eve", 0)]);
        assert_eq!(normalize(&single).count(), 0);
    }

    #[test]
    fn test_delete_yields_nothing() {
        let event = rows_event(Action::Delete, vec![row(1, "alice", 1)]);
        assert_eq!(normalize(&event).count(), 0);
    }

    #[test]
    fn test_bad_column_does_not_abort_row() {
        let columns = vec![
            ColumnMeta::new("born", ColumnKind::Date),
            ColumnMeta::new("score", ColumnKind::Integer),
        ];
        let row = vec![
            RawValue::Text("yesterday".to_string()),
            RawValue::Numeric("42".to_string()),
        ];

        let map = normalize_row("people", &columns, &row);
        assert_eq!(map["born"], json!("yesterday"));
        assert_eq!(map["score"], json!(42));
    }

    #[test]
    fn test_normalization_is_deterministic() {
        let event = rows_event(Action::Insert, vec![row(1, "alice", 1)]);
        let first: Vec<_> = normalize(&event).collect();
        let second: Vec<_> = normalize(&event).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_record_encoding_shape() {
        let event = rows_event(Action::Insert, vec![row(7, "zoe", 1)]);
        let record = normalize(&event).next().unwrap();

        let encoded: Value = serde_json::from_str(&record.encode().unwrap()).unwrap();
        assert_eq!(
            encoded,
            json!({
                "before": null,
                "after": {"id": 7, "name": "zoe", "active": true},
                "source": {"table": "users"}
            })
        );
    }

    #[test]
    fn test_column_kind_classification() {
        assert_eq!(ColumnKind::from_column_type("tinyint(1)"), ColumnKind::Boolean);
        assert_eq!(ColumnKind::from_column_type("tinyint(4)"), ColumnKind::Integer);
        assert_eq!(ColumnKind::from_column_type("bigint(20) unsigned"), ColumnKind::Integer);
        assert_eq!(ColumnKind::from_column_type("VARCHAR(255)"), ColumnKind::Text);
        assert_eq!(ColumnKind::from_column_type("enum('a','b')"), ColumnKind::Text);
        assert_eq!(ColumnKind::from_column_type("date"), ColumnKind::Date);
        assert_eq!(ColumnKind::from_column_type("timestamp(6)"), ColumnKind::DateTime);
        assert_eq!(ColumnKind::from_column_type("bit(1)"), ColumnKind::Bit);
        assert_eq!(ColumnKind::from_column_type("decimal(10,2)"), ColumnKind::Float);
        assert_eq!(ColumnKind::from_column_type("json"), ColumnKind::Other);
    }
}
