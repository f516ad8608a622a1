use crate::plist::Plist;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::SecondsFormat;

pub(crate) fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

pub(crate) trait XmlFragment {
    fn write_fragment(&self, depth: usize, out: &mut String);
}

impl XmlFragment for Plist {
    fn write_fragment(&self, depth: usize, out: &mut String) {
        let pad = "\t".repeat(depth);
        match self {
            Plist::Array(items) => {
                if items.is_empty() {
                    out.push_str(&format!("{}<array/>\n", pad));
                    return;
                }
                out.push_str(&format!("{}<array>\n", pad));
                for item in items {
                    item.write_fragment(depth + 1, out);
                }
                out.push_str(&format!("{}</array>\n", pad));
            }
            Plist::Dictionary(dict) => {
                if dict.is_empty() {
                    out.push_str(&format!("{}<dict/>\n", pad));
                    return;
                }
                out.push_str(&format!("{}<dict>\n", pad));
                for (key, value) in dict {
                    out.push_str(&format!("{}\t<key>{}</key>\n", pad, escape(key)));
                    value.write_fragment(depth + 1, out);
                }
                out.push_str(&format!("{}</dict>\n", pad));
            }
            Plist::Boolean(value) => {
                out.push_str(&format!("{}<{}/>\n", pad, if *value { "true" } else { "false" }));
            }
            Plist::Integer(value) => {
                out.push_str(&format!("{}<integer>{}</integer>\n", pad, value));
            }
            Plist::Float(value) => {
                out.push_str(&format!("{}<real>{}</real>\n", pad, value));
            }
            Plist::String(value) => {
                out.push_str(&format!("{}<string>{}</string>\n", pad, escape(value)));
            }
            Plist::Date(value) => {
                out.push_str(&format!(
                    "{}<date>{}</date>\n",
                    pad,
                    value.to_rfc3339_opts(SecondsFormat::Secs, true)
                ));
            }
            Plist::Data(value) => {
                if value.is_empty() {
                    out.push_str(&format!("{}<data/>\n", pad));
                } else {
                    out.push_str(&format!("{}<data>{}</data>\n", pad, STANDARD.encode(value)));
                }
            }
        }
    }
}
