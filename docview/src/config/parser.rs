//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use ini::{Ini, Properties};
use std::str::FromStr;
use std::time::Duration;

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::asset::QueryParams;
use crate::capability::CapabilitySet;
use crate::layout::ZoomValue;

const PLUGIN_SECTION_PREFIX: &str = "plugin.";

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_bool(section: &str, key: &str, value: &str) -> Result<bool, ConfigFileError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(invalid(section, key, value, "must be true or false")),
    }
}

fn parse_num<T: FromStr>(
    section: &str,
    key: &str,
    value: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, reason))
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Plugin config values are JSON scalars when they parse as such, strings otherwise.
fn plugin_value(value: &str) -> serde_json::Value {
    serde_json::from_str(value.trim())
        .unwrap_or_else(|_| serde_json::Value::String(value.trim().to_string()))
}

fn plugin_config(properties: &Properties) -> serde_json::Value {
    let map = properties
        .iter()
        .map(|(k, v)| (k.to_string(), plugin_value(v)))
        .collect::<serde_json::Map<_, _>>();
    serde_json::Value::Object(map)
}

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();
    let viewer = &mut config.viewer;

    // [viewer] section
    if let Some(section) = ini.section(Some("viewer")) {
        if let Some(v) = section.get("url") {
            viewer.url = non_empty(v);
        }
        if let Some(v) = section.get("id") {
            viewer.id = non_empty(v);
        }
        if let Some(v) = section.get("layout") {
            let v = v.trim().to_lowercase();
            if v.is_empty() {
                return Err(invalid("viewer", "layout", &v, "must name a layout mode"));
            }
            viewer.layout = v;
        }
        if let Some(v) = section.get("page") {
            let page: u32 = parse_num("viewer", "page", v, "must be a positive integer")?;
            if page == 0 {
                return Err(invalid("viewer", "page", v, "pages are numbered from 1"));
            }
            viewer.page = Some(page);
        }
        if let Some(v) = section.get("page_start") {
            viewer.page_start = Some(parse_num(
                "viewer",
                "page_start",
                v,
                "must be a positive integer",
            )?);
        }
        if let Some(v) = section.get("zoom") {
            let zoom: ZoomValue = v
                .parse()
                .map_err(|e: String| invalid("viewer", "zoom", v, &e))?;
            viewer.zoom = Some(zoom);
        }
        if let Some(v) = section.get("page_scale") {
            let scale: f64 = parse_num("viewer", "page_scale", v, "must be a number")?;
            if scale <= 0.0 {
                return Err(invalid("viewer", "page_scale", v, "must be greater than 0"));
            }
            viewer.page_scale = scale;
        }
        if let Some(v) = section.get("query") {
            viewer.query = non_empty(v).map(QueryParams::Raw);
        }
        if let Some(v) = section.get("event_capacity") {
            let capacity: usize = parse_num("viewer", "event_capacity", v, "must be a positive integer")?;
            viewer.event_capacity = capacity.max(1);
        }
    }

    // [query] section: structured parameters win over a raw viewer.query
    if let Some(section) = ini.section(Some("query")) {
        let pairs: Vec<(String, String)> = section
            .iter()
            .map(|(k, v)| (k.to_string(), v.trim().to_string()))
            .collect();
        if !pairs.is_empty() {
            viewer.query = Some(QueryParams::Pairs(pairs));
        }
    }

    // [templates] section
    if let Some(section) = ini.section(Some("templates")) {
        let templates = &mut viewer.templates;
        for (key, slot) in [
            ("metadata", &mut templates.metadata),
            ("stylesheet", &mut templates.stylesheet),
            ("svg", &mut templates.svg),
            ("img", &mut templates.img),
            ("text", &mut templates.text),
        ] {
            if let Some(v) = section.get(key) {
                *slot = non_empty(v)
                    .ok_or_else(|| invalid("templates", key, v, "must not be empty"))?;
            }
        }
    }

    // [features] section
    if let Some(section) = ini.section(Some("features")) {
        for (key, slot) in [
            ("enable_text_selection", &mut viewer.enable_text_selection),
            ("enable_links", &mut viewer.enable_links),
            ("enable_dragging", &mut viewer.enable_dragging),
            ("autoload_first_page", &mut viewer.autoload_first_page),
            ("conversion_is_complete", &mut viewer.conversion_is_complete),
        ] {
            if let Some(v) = section.get(key) {
                *slot = parse_bool("features", key, v)?;
            }
        }
    }

    // [assets] section
    if let Some(section) = ini.section(Some("assets")) {
        let assets = &mut viewer.assets;
        if let Some(v) = section.get("request_retries") {
            assets.retry.max_retries =
                parse_num("assets", "request_retries", v, "must be a non-negative integer")?;
        }
        if let Some(v) = section.get("retry_backoff_ms") {
            let ms: u64 = parse_num("assets", "retry_backoff_ms", v, "must be milliseconds")?;
            assets.retry.backoff = Duration::from_millis(ms);
        }
        if let Some(v) = section.get("max_inline_images") {
            assets.limits.max_inline_images =
                parse_num("assets", "max_inline_images", v, "must be a non-negative integer")?;
        }
        if let Some(v) = section.get("inline_image_size_cutoff") {
            assets.limits.inline_image_size_cutoff =
                parse_num("assets", "inline_image_size_cutoff", v, "must be a byte count")?;
        }
        if let Some(v) = section.get("max_text_boxes") {
            assets.limits.max_text_boxes =
                parse_num("assets", "max_text_boxes", v, "must be a non-negative integer")?;
        }
    }

    // [host] section: base facts first, then explicit predicate overrides
    if let Some(section) = ini.section(Some("host")) {
        let mut facts = [
            ("supports_svg", true),
            ("mobile", false),
            ("legacy", false),
        ];
        for (key, value) in facts.iter_mut() {
            if let Some(v) = section.get(*key) {
                *value = parse_bool("host", key, v)?;
            }
        }
        let mut host = CapabilitySet::for_host(facts[0].1, facts[1].1, facts[2].1);

        for (key, slot) in [
            ("subpixel_text", &mut host.supports_subpixel_text),
            ("namespace_fonts", &mut host.namespace_fonts),
            ("geometric_precision", &mut host.geometric_precision),
            ("remove_img_on_unload", &mut host.remove_img_on_unload),
            ("remove_svg_on_unload", &mut host.remove_svg_on_unload),
        ] {
            if let Some(v) = section.get(key) {
                *slot = parse_bool("host", key, v)?;
            }
        }
        if let Some(v) = section.get("page_load_range") {
            let range: u32 = parse_num("host", "page_load_range", v, "must be a positive integer")?;
            if range == 0 {
                return Err(invalid("host", "page_load_range", v, "must be at least 1"));
            }
            host.page_load_range = range;
        }
        config.host = host;
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("directory").and_then(non_empty) {
            config.logging.directory = v;
        }
        if let Some(v) = section.get("file").and_then(non_empty) {
            config.logging.file = v;
        }
    }

    // [plugin.<name>] sections, in file order
    for (name, properties) in ini.iter() {
        let Some(plugin) = name.and_then(|n| n.strip_prefix(PLUGIN_SECTION_PREFIX)) else {
            continue;
        };
        if plugin.is_empty() {
            return Err(invalid(name.unwrap_or_default(), "", "", "plugin name is empty"));
        }
        config
            .viewer
            .plugins
            .push((plugin.to_string(), plugin_config(properties)));
    }

    Ok(config)
}
