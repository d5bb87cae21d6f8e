//! `{key.path}` substitution over parsed JSON.
//!
//! Every string value (object keys excluded) has its tokens replaced by the
//! matching entry of the flattened site configuration. Tokens that are
//! unknown, or whose value is empty, zero, `false` or `null`, stay as
//! written.
use std::{borrow::Cow, collections::BTreeMap};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

static TOKEN: Lazy<Option<Regex>> = Lazy::new(|| match Regex::new(r"\{([^}]+)\}") {
    Ok(regex) => Some(regex),
    Err(err) => {
        log::error!("template token pattern failed to compile: {err}");
        None
    }
});

pub fn substitute_value(value: Value, vars: &BTreeMap<String, Value>) -> Value {
    match value {
        Value::String(text) => Value::String(substitute(&text, vars).into_owned()),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| substitute_value(item, vars))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, substitute_value(value, vars)))
                .collect(),
        ),
        other => other,
    }
}

pub fn substitute<'a>(text: &'a str, vars: &BTreeMap<String, Value>) -> Cow<'a, str> {
    let Some(token) = TOKEN.as_ref() else {
        return Cow::Borrowed(text);
    };
    token.replace_all(text, |caps: &Captures| {
        vars.get(&caps[1])
            .and_then(render)
            .unwrap_or_else(|| caps[0].to_string())
    })
}

fn render(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) if number.as_f64().is_some_and(|n| n != 0.0) => {
            Some(number.to_string())
        }
        Value::Bool(true) => Some(String::from("true")),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn vars() -> BTreeMap<String, Value> {
        BTreeMap::from([
            (String::from("github.username"), json!("octo")),
            (String::from("siteTitle"), json!("Octo's Portfolio")),
            (String::from("blank"), json!("")),
            (String::from("zero"), json!(0)),
            (String::from("speed"), json!(1.5)),
            (String::from("debug.enabled"), json!(false)),
        ])
    }

    #[test]
    fn replaces_known_tokens() {
        assert_eq!(
            substitute("https://github.com/{github.username}", &vars()),
            "https://github.com/octo"
        );
        assert_eq!(substitute("{siteTitle} / {speed}", &vars()), "Octo's Portfolio / 1.5");
    }

    #[test]
    fn leaves_unknown_and_falsy_tokens() {
        assert_eq!(substitute("{missing}", &vars()), "{missing}");
        assert_eq!(substitute("{blank}{zero}", &vars()), "{blank}{zero}");
        assert_eq!(substitute("{debug.enabled}", &vars()), "{debug.enabled}");
        assert_eq!(substitute("{} and {open", &vars()), "{} and {open");
    }

    #[test]
    fn untouched_text_is_borrowed() {
        assert!(matches!(
            substitute("no tokens here", &vars()),
            Cow::Borrowed("no tokens here")
        ));
    }

    #[test]
    fn walks_nested_values_but_not_keys() {
        let value = json!({
            "{siteTitle}": ["{github.username}", 3, { "inner": "{siteTitle}" }]
        });
        assert_eq!(
            substitute_value(value, &vars()),
            json!({
                "{siteTitle}": ["octo", 3, { "inner": "Octo's Portfolio" }]
            })
        );
    }
}
