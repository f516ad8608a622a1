use crate::error::Error;
use crate::plist::Plist;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use nom::IResult;
use nom::Parser;
use nom::branch::alt;
use nom::bytes::complete::{is_not, tag, take_until};
use nom::character::complete::{char, digit1, multispace0};
use nom::combinator::{map, map_res, opt, recognize, value};
use nom::multi::many0;
use nom::sequence::{delimited, pair, terminated};

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<").replace("&gt;", ">").replace("&amp;", "&")
}

fn parse_key(input: &str) -> IResult<&str, String> {
    let (input, _) = multispace0(input)?;
    map(
        delimited(tag("<key>"), take_until("<"), tag("</key>")),
        unescape,
    )
    .parse(input)
}

fn parse_string(input: &str) -> IResult<&str, String> {
    let (input, _) = multispace0(input)?;
    if input.starts_with("<string/>") {
        return value(String::new(), tag("<string/>")).parse(input);
    }
    map(
        delimited(tag("<string>"), take_until("<"), tag("</string>")),
        unescape,
    )
    .parse(input)
}

fn parse_float(input: &str) -> IResult<&str, f64> {
    let (input, _) = multispace0(input)?;
    map_res(
        delimited(tag("<real>"), take_until("<"), tag("</real>")),
        |text: &str| text.parse(),
    )
    .parse(input)
}

fn parse_date(input: &str) -> IResult<&str, DateTime<Utc>> {
    let (input, _) = multispace0(input)?;
    map_res(
        delimited(tag("<date>"), take_until("<"), tag("</date>")),
        |text: &str| DateTime::parse_from_rfc3339(text).map(DateTime::<Utc>::from),
    )
    .parse(input)
}

fn parse_data(input: &str) -> IResult<&str, Vec<u8>> {
    let (input, _) = multispace0(input)?;
    if input.starts_with("<data/>") {
        return value(Vec::new(), tag("<data/>")).parse(input);
    }
    map_res(
        delimited(tag("<data>"), take_until("<"), tag("</data>")),
        |text: &str| {
            let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            STANDARD.decode(compact)
        },
    )
    .parse(input)
}

fn parse_integer(input: &str) -> IResult<&str, i64> {
    let (input, _) = multispace0(input)?;
    map_res(
        delimited(
            tag("<integer>"),
            recognize(pair(opt(alt((char('-'), char('+')))), digit1)),
            tag("</integer>"),
        ),
        |text: &str| text.parse(),
    )
    .parse(input)
}

fn parse_boolean(input: &str) -> IResult<&str, bool> {
    let (input, _) = multispace0(input)?;
    alt((value(true, tag("<true/>")), value(false, tag("<false/>")))).parse(input)
}

fn parse_dict(input: &str) -> IResult<&str, IndexMap<String, Plist>> {
    let (input, _) = multispace0(input)?;
    if input.starts_with("<dict/>") {
        return value(IndexMap::new(), tag("<dict/>")).parse(input);
    }
    let (input, _) = tag("<dict>")(input)?;
    let (input, entries) = many0((parse_key, parse_value)).parse(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = tag("</dict>")(input)?;
    Ok((input, entries.into_iter().collect()))
}

fn parse_array(input: &str) -> IResult<&str, Vec<Plist>> {
    let (input, _) = multispace0(input)?;
    if input.starts_with("<array/>") {
        return value(Vec::new(), tag("<array/>")).parse(input);
    }
    let (input, _) = (tag("<array>"), multispace0).parse(input)?;
    let (input, values) = many0(parse_value).parse(input)?;
    let (input, _) = (multispace0, tag("</array>"), multispace0).parse(input)?;
    Ok((input, values))
}

fn parse_value(input: &str) -> IResult<&str, Plist> {
    let (input, _) = multispace0(input)?;
    if input.starts_with("<string>") || input.starts_with("<string/>") {
        map(parse_string, Plist::String).parse(input)
    } else if input.starts_with("<real>") {
        map(parse_float, Plist::Float).parse(input)
    } else if input.starts_with("<date>") {
        map(parse_date, Plist::Date).parse(input)
    } else if input.starts_with("<data>") || input.starts_with("<data/>") {
        map(parse_data, Plist::Data).parse(input)
    } else if input.starts_with("<integer>") {
        map(parse_integer, Plist::Integer).parse(input)
    } else if input.starts_with("<true") || input.starts_with("<false") {
        map(parse_boolean, Plist::Boolean).parse(input)
    } else if input.starts_with("<dict>") || input.starts_with("<dict/>") {
        map(parse_dict, Plist::Dictionary).parse(input)
    } else {
        map(parse_array, Plist::Array).parse(input)
    }
}

pub(crate) fn read(data: &[u8]) -> Result<Plist, Error> {
    let text = String::from_utf8_lossy(data);
    let input = text.as_ref();
    let (input, _) = take_until::<_, _, nom::error::Error<&str>>("<plist")(input)?; // skip declaration and DOCTYPE
    let (input, _) = terminated(is_not(">"), tag::<_, _, nom::error::Error<&str>>(">")).parse(input)?;
    let (input, value) = parse_value(input)?;
    let (_, _) = (multispace0, tag::<_, _, nom::error::Error<&str>>("</plist>"), multispace0).parse(input)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_document_with_all_value_kinds() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
	<key>AppIDName</key>
	<string>ipadump</string>
	<key>Platform</key>
	<array>
		<string>iOS</string>
		<string>xrOS</string>
	</array>
	<key>IsXcodeManaged</key>
	<false/>
	<key>TimeToLive</key>
	<integer>364</integer>
	<key>UUID</key>
	<string>de11add9-1726-41dd-a762-457f19c97aa2</string>
	<key>CreationDate</key>
	<date>2024-08-17T02:24:50Z</date>
	<key>Entitlements</key>
	<dict/>
</dict>
</plist>
"#;
        let value = read(xml.as_bytes()).unwrap();
        let Plist::Dictionary(dict) = value else {
            panic!("expected a dictionary root");
        };
        assert_eq!(dict["AppIDName"], Plist::from("ipadump"));
        assert_eq!(dict["TimeToLive"], Plist::Integer(364));
        assert_eq!(dict["IsXcodeManaged"], Plist::Boolean(false));
        let Plist::Array(platform) = &dict["Platform"] else {
            panic!("expected an array");
        };
        assert_eq!(platform.len(), 2);
        assert_eq!(dict["Entitlements"], Plist::Dictionary(IndexMap::new()));
    }

    #[test]
    fn reads_non_dictionary_root() {
        let xml = "<plist version=\"1.0\">\n<integer>-7</integer>\n</plist>";
        assert_eq!(read(xml.as_bytes()).unwrap(), Plist::Integer(-7));
    }

    #[test]
    fn decodes_base64_data_with_line_breaks() {
        let xml = "<plist version=\"1.0\">\n<data>\n3q2+\n7w==\n</data>\n</plist>";
        assert_eq!(
            read(xml.as_bytes()).unwrap(),
            Plist::Data(vec![0xDE, 0xAD, 0xBE, 0xEF])
        );
    }

    #[test]
    fn unescapes_entities() {
        let xml = "<plist version=\"1.0\">\n<string>a &lt; b &amp; c</string>\n</plist>";
        assert_eq!(read(xml.as_bytes()).unwrap(), Plist::from("a < b & c"));
    }

    #[test]
    fn rejects_unclosed_document() {
        let xml = "<plist version=\"1.0\">\n<dict>\n<key>A</key>\n<integer>1</integer>\n";
        assert!(read(xml.as_bytes()).is_err());
    }
}
