//! XML property-list reader and writer.
//!
//! The reader accepts the subset of the Apple plist DTD that flat
//! documents use: `dict`, `array`, `key`, `string`, `integer`, `real`,
//! `date`, `true` and `false`. The writer emits the layout Xcode itself
//! writes: tab indentation, one element per line, empty containers in
//! self-closing form.

use std::fmt::Write as _;

use crate::error::{PlistError, Result};
use crate::value::{PlistDict, PlistValue};

pub(crate) const XML_HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";
pub(crate) const DOCTYPE: &str = "<!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\" \"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">";

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Start(String),
    End(String),
    Empty(String),
    Text(String),
}

fn scan(src: &str) -> Result<Vec<(Event, usize)>> {
    let mut events = Vec::new();
    let mut rest = src;
    let mut line = 1;

    let skip_past = |rest: &str, line: usize, terminator: &str| -> Result<usize> {
        rest.find(terminator)
            .map(|at| at + terminator.len())
            .ok_or_else(|| PlistError::malformed(line, format!("missing {terminator:?}")))
    };

    while !rest.is_empty() {
        let consumed = if rest.starts_with("<?") {
            skip_past(rest, line, "?>")?
        } else if rest.starts_with("<!--") {
            skip_past(rest, line, "-->")?
        } else if rest.starts_with("<!") {
            skip_past(rest, line, ">")?
        } else if let Some(tag) = rest.strip_prefix("</") {
            let end = skip_past(tag, line, ">")?;
            let name = tag[..end - 1].trim();
            events.push((Event::End(name.to_string()), line));
            end + 2
        } else if let Some(tag) = rest.strip_prefix('<') {
            let end = skip_past(tag, line, ">")?;
            let body = &tag[..end - 1];
            let (body, empty) = match body.strip_suffix('/') {
                Some(b) => (b, true),
                None => (body, false),
            };
            let name = body.split_whitespace().next().unwrap_or_default().to_string();
            if name.is_empty() {
                return Err(PlistError::malformed(line, "empty tag"));
            }
            events.push((if empty { Event::Empty(name) } else { Event::Start(name) }, line));
            end + 1
        } else {
            let end = rest.find('<').unwrap_or(rest.len());
            events.push((Event::Text(unescape(&rest[..end], line)?), line));
            end
        };
        line += rest[..consumed].matches('\n').count();
        rest = &rest[consumed..];
    }
    Ok(events)
}

fn unescape(text: &str, line: usize) -> Result<String> {
    if !text.contains('&') {
        return Ok(text.to_string());
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(at) = rest.find('&') {
        out.push_str(&rest[..at]);
        let after = &rest[at + 1..];
        let semi = after
            .find(';')
            .ok_or_else(|| PlistError::malformed(line, "unterminated entity"))?;
        let entity = &after[..semi];
        let c = match entity {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            _ => {
                let code = if let Some(hex) = entity.strip_prefix("#x") {
                    u32::from_str_radix(hex, 16).ok()
                } else if let Some(dec) = entity.strip_prefix('#') {
                    dec.parse().ok()
                } else {
                    None
                };
                code.and_then(char::from_u32).ok_or_else(|| {
                    PlistError::malformed(line, format!("unknown entity &{entity};"))
                })?
            }
        };
        out.push(c);
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

struct Events {
    items: Vec<(Event, usize)>,
    pos: usize,
}

impl Events {
    fn last_line(&self) -> usize {
        self.items.last().map_or(1, |(_, l)| *l)
    }

    /// Next event, skipping whitespace-only text between elements.
    fn next_element(&mut self) -> Result<(Event, usize)> {
        while let Some((event, line)) = self.items.get(self.pos).cloned() {
            self.pos += 1;
            match event {
                Event::Text(t) if t.trim().is_empty() => continue,
                Event::Text(t) => {
                    return Err(PlistError::malformed(line, format!("unexpected text {t:?}")))
                }
                other => return Ok((other, line)),
            }
        }
        Err(PlistError::malformed(self.last_line(), "unexpected end of document"))
    }

    /// Text content up to the closing tag `name`.
    fn text_until(&mut self, name: &str) -> Result<String> {
        let mut text = String::new();
        loop {
            match self.items.get(self.pos).cloned() {
                Some((Event::Text(t), _)) => text.push_str(&t),
                Some((Event::End(n), _)) if n == name => {
                    self.pos += 1;
                    return Ok(text);
                }
                Some((_, line)) => {
                    return Err(PlistError::malformed(line, format!("<{name}> must hold text only")))
                }
                None => {
                    return Err(PlistError::malformed(self.last_line(), format!("unterminated <{name}>")))
                }
            }
            self.pos += 1;
        }
    }

    fn value(&mut self, event: Event, line: usize) -> Result<PlistValue> {
        match event {
            Event::Empty(name) => match name.as_str() {
                "dict" => Ok(PlistValue::Dict(PlistDict::new())),
                "array" => Ok(PlistValue::Array(Vec::new())),
                "string" => Ok(PlistValue::String(String::new())),
                "true" => Ok(PlistValue::Bool(true)),
                "false" => Ok(PlistValue::Bool(false)),
                _ => Err(PlistError::UnsupportedElement(name)),
            },
            Event::Start(name) => match name.as_str() {
                "dict" => self.dict().map(PlistValue::Dict),
                "array" => {
                    let mut items = Vec::new();
                    loop {
                        match self.next_element()? {
                            (Event::End(n), _) if n == "array" => return Ok(PlistValue::Array(items)),
                            (event, line) => items.push(self.value(event, line)?),
                        }
                    }
                }
                "string" => self.text_until("string").map(PlistValue::String),
                "date" => self.text_until("date").map(|d| PlistValue::Date(d.trim().to_string())),
                "integer" => {
                    let text = self.text_until("integer")?;
                    text.trim()
                        .parse()
                        .map(PlistValue::Integer)
                        .map_err(|_| PlistError::malformed(line, format!("bad integer {text:?}")))
                }
                "real" => {
                    let text = self.text_until("real")?;
                    text.trim()
                        .parse()
                        .map(PlistValue::Real)
                        .map_err(|_| PlistError::malformed(line, format!("bad real {text:?}")))
                }
                "true" | "false" => {
                    self.text_until(&name)?;
                    Ok(PlistValue::Bool(name == "true"))
                }
                _ => Err(PlistError::UnsupportedElement(name)),
            },
            Event::End(name) => Err(PlistError::malformed(line, format!("unexpected </{name}>"))),
            Event::Text(t) => Err(PlistError::malformed(line, format!("unexpected text {t:?}"))),
        }
    }

    /// Entries of a `<dict>` whose start tag was consumed.
    fn dict(&mut self) -> Result<PlistDict> {
        let mut dict = PlistDict::new();
        loop {
            match self.next_element()? {
                (Event::End(n), _) if n == "dict" => return Ok(dict),
                (Event::Start(n), line) if n == "key" => {
                    let key = self.text_until("key")?;
                    let (event, vline) = self.next_element()?;
                    let value = self.value(event, vline)?;
                    if dict.insert(key.clone(), value).is_some() {
                        return Err(PlistError::malformed(line, format!("duplicate key {key:?}")));
                    }
                }
                (Event::Empty(n), line) if n == "key" => {
                    return Err(PlistError::malformed(line, "empty <key/>"));
                }
                (_, line) => return Err(PlistError::malformed(line, "expected <key> in <dict>")),
            }
        }
    }
}

/// Parse an XML plist whose root is a dictionary.
pub fn read(src: &str) -> Result<PlistDict> {
    let mut events = Events {
        items: scan(src)?,
        pos: 0,
    };
    match events.next_element()? {
        (Event::Start(n), _) if n == "plist" => {}
        (_, line) => return Err(PlistError::malformed(line, "expected <plist>")),
    }
    let (event, line) = events.next_element()?;
    let root = match events.value(event, line)? {
        PlistValue::Dict(dict) => dict,
        other => return Err(PlistError::RootNotDict(other.element_name().to_string())),
    };
    match events.next_element()? {
        (Event::End(n), _) if n == "plist" => {}
        (_, line) => return Err(PlistError::malformed(line, "expected </plist>")),
    }
    let trailing = events.items[events.pos..]
        .iter()
        .find(|(e, _)| !matches!(e, Event::Text(t) if t.trim().is_empty()));
    if let Some((_, line)) = trailing {
        return Err(PlistError::malformed(*line, "content after </plist>"));
    }
    Ok(root)
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    out
}

fn tabs(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push('\t');
    }
}

fn write_value(out: &mut String, value: &PlistValue, depth: usize) {
    match value {
        PlistValue::String(s) => {
            let _ = write!(out, "<string>{}</string>", escape(s));
        }
        PlistValue::Bool(true) => out.push_str("<true/>"),
        PlistValue::Bool(false) => out.push_str("<false/>"),
        PlistValue::Integer(i) => {
            let _ = write!(out, "<integer>{i}</integer>");
        }
        PlistValue::Real(r) => {
            let _ = write!(out, "<real>{r}</real>");
        }
        PlistValue::Date(d) => {
            let _ = write!(out, "<date>{}</date>", escape(d));
        }
        PlistValue::Array(items) if items.is_empty() => out.push_str("<array/>"),
        PlistValue::Array(items) => {
            out.push_str("<array>\n");
            for item in items {
                tabs(out, depth + 1);
                write_value(out, item, depth + 1);
                out.push('\n');
            }
            tabs(out, depth);
            out.push_str("</array>");
        }
        PlistValue::Dict(dict) => write_dict(out, dict, depth),
    }
}

fn write_dict(out: &mut String, dict: &PlistDict, depth: usize) {
    if dict.is_empty() {
        out.push_str("<dict/>");
        return;
    }
    out.push_str("<dict>\n");
    for (key, item) in dict {
        tabs(out, depth + 1);
        let _ = writeln!(out, "<key>{}</key>", escape(key));
        tabs(out, depth + 1);
        write_value(out, item, depth + 1);
        out.push('\n');
    }
    tabs(out, depth);
    out.push_str("</dict>");
}

/// Render a root dictionary as an XML plist.
pub fn write(root: &PlistDict) -> String {
    let mut out = String::new();
    out.push_str(XML_HEADER);
    out.push('\n');
    out.push_str(DOCTYPE);
    out.push_str("\n<plist version=\"1.0\">\n");
    write_dict(&mut out, root, 0);
    out.push_str("\n</plist>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
	<key>aps-environment</key>
	<string>development</string>
	<key>com.apple.developer.icloud-services</key>
	<array>
		<string>CloudDocuments</string>
		<string>CloudKit</string>
	</array>
	<key>com.apple.developer.siri</key>
	<true/>
	<key>count</key>
	<integer>3</integer>
	<key>empty</key>
	<dict/>
</dict>
</plist>
"#;

    #[test]
    fn reads_sample() {
        let dict = read(SAMPLE).unwrap();
        assert_eq!(dict.len(), 5);
        assert_eq!(dict["aps-environment"].as_str(), Some("development"));
        assert_eq!(dict["com.apple.developer.siri"], PlistValue::Bool(true));
        assert_eq!(dict["count"].as_integer(), Some(3));
        assert_eq!(
            dict["com.apple.developer.icloud-services"],
            PlistValue::from(vec!["CloudDocuments", "CloudKit"])
        );
        let keys: Vec<&str> = dict.keys().map(String::as_str).collect();
        assert_eq!(keys[0], "aps-environment");
        assert_eq!(keys[4], "empty");
    }

    #[test]
    fn writes_what_it_reads() {
        assert_eq!(write(&read(SAMPLE).unwrap()), SAMPLE);
    }

    #[test]
    fn empty_root_dict() {
        let text = write(&PlistDict::new());
        assert!(text.ends_with("<plist version=\"1.0\">\n<dict/>\n</plist>\n"));
        assert!(read(&text).unwrap().is_empty());
    }

    #[test]
    fn entities_round_trip() {
        let mut dict = PlistDict::new();
        dict.insert("k".into(), PlistValue::from("a < b && c > d"));
        let text = write(&dict);
        assert!(text.contains("<string>a &lt; b &amp;&amp; c &gt; d</string>"));
        assert_eq!(read(&text).unwrap(), dict);
        assert_eq!(unescape("&#65;&#x42;&quot;", 1).unwrap(), "AB\"");
    }

    #[test]
    fn string_whitespace_is_preserved() {
        let text = "<plist><dict><key>k</key><string>  spaced </string></dict></plist>";
        assert_eq!(read(text).unwrap()["k"].as_str(), Some("  spaced "));
    }

    #[test]
    fn rejects_unterminated_dict() {
        let err = read("<plist version=\"1.0\">\n<dict>\n\t<key>a</key>\n").unwrap_err();
        assert!(matches!(err, PlistError::Malformed { .. }));
    }

    #[test]
    fn rejects_data_elements() {
        let text = "<plist><dict><key>k</key><data>AAAA</data></dict></plist>";
        assert!(matches!(read(text), Err(PlistError::UnsupportedElement(n)) if n == "data"));
    }

    #[test]
    fn rejects_non_dict_root() {
        assert!(matches!(
            read("<plist><array/></plist>"),
            Err(PlistError::RootNotDict(_))
        ));
    }

    #[test]
    fn rejects_bad_integer() {
        let text = "<plist><dict><key>k</key><integer>x</integer></dict></plist>";
        assert!(matches!(read(text), Err(PlistError::Malformed { .. })));
    }
}
