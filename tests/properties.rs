use jsonq::{get, get_integer, get_number, get_one, get_string, new_context, Record, Scalar};
use proptest::prelude::*;
use serde_json::{json, Value};

fn items(values: &[i64]) -> Value {
    let items: Vec<Value> = values.iter().map(|n| json!({"k": n})).collect();
    json!({ "items": items })
}

fn filtered(v: &Value, query: &str) -> Vec<Value> {
    get(v, query)
        .unwrap()
        .into_values()
        .into_iter()
        .cloned()
        .collect()
}

#[derive(Debug, Default)]
struct Counted {
    name: String,
    sets: usize,
}

impl Record for Counted {
    fn fields() -> &'static [jsonq::FieldSpec] {
        const FIELDS: &[jsonq::FieldSpec] = &[jsonq::FieldSpec {
            name: "name",
            path: "name",
            kind: jsonq::FieldKind::String,
        }];
        FIELDS
    }

    fn set_field(&mut self, _name: &str, value: Scalar) -> jsonq::Result<()> {
        self.name = jsonq::extract::convert("name", value)?;
        self.sets += 1;
        Ok(())
    }
}

proptest! {
    #[test]
    fn numeric_filters_agree_with_native_ordering(
        values in prop::collection::vec(-20i64..20, 0..12),
        pivot in -20i64..20,
    ) {
        let v = items(&values);
        let cases: [(&str, fn(i64, i64) -> bool); 6] = [
            ("<", |a, b| a < b),
            ("<=", |a, b| a <= b),
            (">", |a, b| a > b),
            (">=", |a, b| a >= b),
            ("==", |a, b| a == b),
            ("!=", |a, b| a != b),
        ];
        // Negative literals are not part of the grammar; shift the pivot.
        let shift = 20;
        let shifted: Vec<i64> = values.iter().map(|n| n + shift).collect();
        let v_shifted = items(&shifted);
        let literal = pivot + shift;
        for (op, holds) in cases {
            let got = filtered(&v_shifted, &format!("items[k{op}{literal}]"));
            let want: Vec<Value> = shifted
                .iter()
                .filter(|n| holds(**n, literal))
                .map(|n| json!({"k": n}))
                .collect();
            prop_assert_eq!(got, want, "operator {}", op);
        }
        prop_assert_eq!(filtered(&v, "items[k<0 || k>=0]").len(), values.len());
    }

    #[test]
    fn string_filters_agree_with_lexicographic_ordering(
        words in prop::collection::vec("[a-z]{0,4}", 0..10),
        pivot in "[a-z]{1,3}",
    ) {
        let v = json!({ "items": words.iter().map(|w| json!({"k": w})).collect::<Vec<_>>() });
        let below = filtered(&v, &format!(r#"items[k<"{pivot}"]"#));
        let rest = filtered(&v, &format!(r#"items[k>="{pivot}"]"#));
        prop_assert_eq!(below.len() + rest.len(), words.len());
        for item in &below {
            prop_assert!(item["k"].as_str().unwrap() < pivot.as_str());
        }
        for item in &rest {
            prop_assert!(item["k"].as_str().unwrap() >= pivot.as_str());
        }
    }

    #[test]
    fn equality_then_index_keeps_the_first_survivor(
        values in prop::collection::vec(0i64..4, 0..10),
        wanted in 0i64..4,
    ) {
        let v = items(&values);
        let all = filtered(&v, &format!("items[k=={wanted}]"));
        let first = filtered(&v, &format!("items[k=={wanted}][0]"));
        prop_assert_eq!(all.len(), values.iter().filter(|n| **n == wanted).count());
        prop_assert_eq!(first, all.into_iter().take(1).collect::<Vec<_>>());
    }

    #[test]
    fn integer_getter_truncates_the_number(x in -1.0e9f64..1.0e9) {
        let v = json!({"a": {"n": x}});
        let n = get_number(&v, "a.n").unwrap();
        prop_assert_eq!(get_integer(&v, "a.n").unwrap(), n.trunc() as i64);
    }

    #[test]
    fn lookups_return_the_stored_value(key in "[a-z][a-z0-9_]{0,6}", s in ".*") {
        let mut outer = serde_json::Map::new();
        outer.insert(key.clone(), Value::String(s.clone()));
        let v = json!({ "outer": outer });
        let path = format!("outer.{key}");
        prop_assert_eq!(get_one(&v, &path).unwrap(), &v["outer"][&key]);
        prop_assert_eq!(get_string(&v, &path).unwrap(), s.clone());
        prop_assert_eq!(get_string(&v, &path).unwrap(), s);
        prop_assert_eq!(get_string(&v, &format!("?outer.{key}x")).unwrap(), "");
    }

    #[test]
    fn one_record_per_selected_value(names in prop::collection::vec("[a-z]{1,5}", 0..8)) {
        let v = json!({ "people": names.iter().map(|n| json!({"name": n})).collect::<Vec<_>>() });
        let mut out: Vec<Counted> = Vec::new();
        new_context(&v)
            .select(r#"people[name!=""]"#)
            .extract(&mut out)
            .unwrap();
        prop_assert_eq!(out.len(), names.len());
        for (record, name) in out.iter().zip(&names) {
            prop_assert_eq!(&record.name, name);
            prop_assert_eq!(record.sets, 1);
        }
    }
}
