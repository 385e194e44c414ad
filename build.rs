use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

const LOCALES_DIR: &str = "locales";
const DEFAULT_LOCALE: &str = "en";

fn main() {
    println!("cargo:rerun-if-changed={LOCALES_DIR}");

    let mut locales = BTreeMap::<String, BTreeMap<String, String>>::new();
    let entries = fs::read_dir(LOCALES_DIR).expect("locales directory must exist");
    for entry in entries {
        let path = entry.expect("locale entry must be readable").path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
            continue;
        }
        println!("cargo:rerun-if-changed={}", path.display());

        let Some(locale) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        let source = fs::read_to_string(&path).expect("locale file must be readable");
        let table = source
            .parse::<toml::Table>()
            .unwrap_or_else(|error| panic!("invalid locale file {}: {error}", path.display()));

        let mut messages = BTreeMap::new();
        flatten("", &table, &mut messages);
        locales.insert(locale.to_string(), messages);
    }

    assert!(
        locales.contains_key(DEFAULT_LOCALE),
        "default locale `{DEFAULT_LOCALE}` has no catalog file"
    );

    let mut generated = String::new();
    generated.push_str(&format!(
        "pub const DEFAULT_LOCALE: &str = {DEFAULT_LOCALE:?};\n\n"
    ));
    generated.push_str("pub static LOCALES: &[(&str, &[(&str, &str)])] = &[\n");
    for (locale, messages) in &locales {
        generated.push_str(&format!("    ({locale:?}, &[\n"));
        for (key, value) in messages {
            generated.push_str(&format!("        ({key:?}, {value:?}),\n"));
        }
        generated.push_str("    ]),\n");
    }
    generated.push_str("];\n");

    let out_dir = env::var("OUT_DIR").expect("OUT_DIR is set by cargo");
    fs::write(
        Path::new(&out_dir).join("calmform_i18n_generated.rs"),
        generated,
    )
    .expect("generated catalog must be writable");
}

fn flatten(prefix: &str, table: &toml::Table, out: &mut BTreeMap<String, String>) {
    for (key, value) in table {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            toml::Value::String(text) => {
                out.insert(full_key, text.clone());
            }
            toml::Value::Table(nested) => flatten(&full_key, nested, out),
            other => panic!("locale key `{full_key}` must be a string, found {other}"),
        }
    }
}
