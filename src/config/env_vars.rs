use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref ENV_VAR: Regex =
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)").unwrap();
}

/// Expand `${VAR}` and `$VAR` references. Unset variables expand to nothing.
pub fn expand_env_vars(value: &str) -> String {
    if !value.contains('$') {
        return value.to_string();
    }

    ENV_VAR
        .replace_all(value, |caps: &Captures<'_>| {
            let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            std::env::var(name).unwrap_or_default()
        })
        .into_owned()
}

pub(crate) fn expand_in_place(value: &mut String) {
    if value.contains('$') {
        *value = expand_env_vars(value);
    }
}

pub(crate) fn expand_option(value: &mut Option<String>) {
    if let Some(v) = value.as_mut() {
        expand_in_place(v);
    }
}
