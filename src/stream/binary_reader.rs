use crate::error::Error;
use crate::plist::Plist;
use crate::stream::MAC_EPOCH;
use chrono::DateTime;
use indexmap::IndexMap;
use nom::IResult;
use nom::Parser;
use nom::bytes::complete::{tag, take};
use nom::combinator::map;
use nom::multi::count;
use nom::number::complete::{be_f32, be_f64, be_u8, be_u16, be_u32, be_u64};

const MAGIC: &[u8] = b"bplist00";
const TRAILER_LEN: usize = 32;
// Caps recursion on documents whose offset table points back into itself.
const MAX_DEPTH: usize = 512;

#[derive(Debug)]
struct Trailer {
    offset_size: u8,
    ref_size: u8,
    object_count: u64,
    root_object: u64,
    table_offset: u64,
}

pub(crate) fn read(data: &[u8]) -> Result<Plist, Error> {
    if data.len() < MAGIC.len() + TRAILER_LEN + 1 {
        return Err(Error::Corrupt("document shorter than header and trailer".into()));
    }
    let (_, _) = magic(data)?;
    let (_, trailer) = parse_trailer(&data[data.len() - TRAILER_LEN..])?;

    let table = data
        .get(trailer.table_offset as usize..)
        .ok_or_else(|| Error::Corrupt("offset table starts past end of document".into()))?;
    let table_len = trailer.object_count.saturating_mul(u64::from(trailer.offset_size));
    if table_len > table.len() as u64 {
        return Err(Error::Corrupt("offset table exceeds document".into()));
    }
    let (_, offsets) = offset_table(table, trailer.object_count as usize, trailer.offset_size)?;

    let root = *offsets
        .get(trailer.root_object as usize)
        .ok_or_else(|| Error::Corrupt("root object index out of range".into()))?;
    let (_, value) = object(data, root, &offsets, &trailer, 0)?;
    Ok(value)
}

fn magic(input: &[u8]) -> IResult<&[u8], &[u8]> {
    tag(MAGIC).parse(input)
}

fn parse_trailer(input: &[u8]) -> IResult<&[u8], Trailer> {
    let (input, _) = take(6u8).parse(input)?; // 5 unused bytes + sort version
    let (input, offset_size) = be_u8.parse(input)?;
    let (input, ref_size) = be_u8.parse(input)?;
    let (input, object_count) = be_u64.parse(input)?;
    let (input, root_object) = be_u64.parse(input)?;
    let (input, table_offset) = be_u64.parse(input)?;
    Ok((
        input,
        Trailer {
            offset_size,
            ref_size,
            object_count,
            root_object,
            table_offset,
        },
    ))
}

fn fail<T>(input: &[u8]) -> IResult<&[u8], T> {
    Err(nom::Err::Failure(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Fail,
    )))
}

fn sized_uint(input: &[u8], size: u8) -> IResult<&[u8], u64> {
    match size {
        1 => map(be_u8, u64::from).parse(input),
        2 => map(be_u16, u64::from).parse(input),
        4 => map(be_u32, u64::from).parse(input),
        8 => be_u64.parse(input),
        _ => fail(input),
    }
}

fn offset_table(input: &[u8], object_count: usize, offset_size: u8) -> IResult<&[u8], Vec<usize>> {
    let (input, offsets) = count(|i| sized_uint(i, offset_size), object_count).parse(input)?;
    Ok((input, offsets.into_iter().map(|o| o as usize).collect()))
}

fn object_refs<'a>(input: &'a [u8], len: usize, ref_size: u8) -> IResult<&'a [u8], Vec<usize>> {
    // Bound before the allocation inside `count`.
    if len.saturating_mul(ref_size as usize) > input.len() {
        return fail(input);
    }
    let (input, refs) = count(|i| sized_uint(i, ref_size), len).parse(input)?;
    Ok((input, refs.into_iter().map(|r| r as usize).collect()))
}

// Marker low nibbles of 0xF spill the real count into a trailing integer object.
fn length(input: &[u8], extra: u8) -> IResult<&[u8], usize> {
    if extra != 0x0F {
        return Ok((input, extra as usize));
    }
    let (input, marker) = be_u8.parse(input)?;
    if marker >> 4 != 0x1 {
        return fail(input);
    }
    let size = match marker & 0x0F {
        0 => 1,
        1 => 2,
        2 => 4,
        3 => 8,
        _ => return fail(input),
    };
    let (input, value) = sized_uint(input, size)?;
    Ok((input, value as usize))
}

fn object<'a>(
    data: &'a [u8],
    offset: usize,
    offsets: &[usize],
    trailer: &Trailer,
    depth: usize,
) -> IResult<&'a [u8], Plist> {
    if depth > MAX_DEPTH {
        return fail(data);
    }
    let input = match data.get(offset..) {
        Some(input) => input,
        None => return fail(data),
    };
    let (input, marker) = be_u8.parse(input)?;
    let extra = marker & 0x0F;
    match marker >> 4 {
        0x0 => boolean(input, extra),
        0x1 => integer(input, extra),
        0x2 => real(input, extra),
        0x3 => date(input),
        0x4 => data_bytes(input, extra),
        0x5 => ascii_string(input, extra),
        0x6 => utf16_string(input, extra),
        0xA => array(data, input, extra, offsets, trailer, depth),
        0xD => dictionary(data, input, extra, offsets, trailer, depth),
        _ => fail(input),
    }
}

fn boolean(input: &[u8], extra: u8) -> IResult<&[u8], Plist> {
    match extra {
        0x08 => Ok((input, Plist::Boolean(false))),
        0x09 => Ok((input, Plist::Boolean(true))),
        _ => fail(input),
    }
}

fn integer(input: &[u8], extra: u8) -> IResult<&[u8], Plist> {
    match extra {
        0 => map(be_u8, |v| Plist::Integer(i64::from(v))).parse(input),
        1 => map(be_u16, |v| Plist::Integer(i64::from(v))).parse(input),
        2 => map(be_u32, |v| Plist::Integer(i64::from(v))).parse(input),
        // 8-byte integers carry the sign in two's complement.
        3 => map(be_u64, |v| Plist::Integer(v as i64)).parse(input),
        _ => fail(input),
    }
}

fn real(input: &[u8], extra: u8) -> IResult<&[u8], Plist> {
    match extra {
        2 => map(be_f32, |v| Plist::Float(f64::from(v))).parse(input),
        3 => map(be_f64, Plist::Float).parse(input),
        _ => fail(input),
    }
}

fn date(input: &[u8]) -> IResult<&[u8], Plist> {
    let (rest, seconds) = be_f64.parse(input)?;
    let unix = seconds + MAC_EPOCH;
    let datetime = match DateTime::from_timestamp(unix as i64, (unix.fract() * 1e9) as u32) {
        Some(datetime) => datetime,
        None => return fail(input),
    };
    Ok((rest, Plist::Date(datetime)))
}

fn data_bytes(input: &[u8], extra: u8) -> IResult<&[u8], Plist> {
    let (input, len) = length(input, extra)?;
    let (input, bytes) = take(len).parse(input)?;
    Ok((input, Plist::Data(bytes.to_vec())))
}

fn ascii_string(input: &[u8], extra: u8) -> IResult<&[u8], Plist> {
    let (input, len) = length(input, extra)?;
    let (rest, bytes) = take(len).parse(input)?;
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok((rest, Plist::String(text.to_string()))),
        Err(_) => fail(input),
    }
}

fn utf16_string(input: &[u8], extra: u8) -> IResult<&[u8], Plist> {
    let (input, len) = length(input, extra)?;
    if len.saturating_mul(2) > input.len() {
        return fail(input);
    }
    let (rest, units) = count(be_u16, len).parse(input)?;
    match String::from_utf16(&units) {
        Ok(text) => Ok((rest, Plist::String(text))),
        Err(_) => fail(input),
    }
}

fn array<'a>(
    data: &'a [u8],
    input: &'a [u8],
    extra: u8,
    offsets: &[usize],
    trailer: &Trailer,
    depth: usize,
) -> IResult<&'a [u8], Plist> {
    let (input, len) = length(input, extra)?;
    let (input, refs) = object_refs(input, len, trailer.ref_size)?;
    let mut items = Vec::with_capacity(len);
    for object_ref in refs {
        let offset = match offsets.get(object_ref) {
            Some(offset) => *offset,
            None => return fail(input),
        };
        let (_, item) = object(data, offset, offsets, trailer, depth + 1)?;
        items.push(item);
    }
    Ok((input, Plist::Array(items)))
}

fn dictionary<'a>(
    data: &'a [u8],
    input: &'a [u8],
    extra: u8,
    offsets: &[usize],
    trailer: &Trailer,
    depth: usize,
) -> IResult<&'a [u8], Plist> {
    let (input, len) = length(input, extra)?;
    let (input, key_refs) = object_refs(input, len, trailer.ref_size)?;
    let (input, value_refs) = object_refs(input, len, trailer.ref_size)?;
    let mut dict = IndexMap::with_capacity(len);
    for (key_ref, value_ref) in key_refs.into_iter().zip(value_refs) {
        let key_offset = match offsets.get(key_ref) {
            Some(offset) => *offset,
            None => return fail(input),
        };
        let (_, key) = object(data, key_offset, offsets, trailer, depth + 1)?;
        let Plist::String(key) = key else {
            return fail(input);
        };
        let value_offset = match offsets.get(value_ref) {
            Some(offset) => *offset,
            None => return fail(input),
        };
        let (_, value) = object(data, value_offset, offsets, trailer, depth + 1)?;
        dict.insert(key, value);
    }
    Ok((input, Plist::Dictionary(dict)))
}

#[cfg(test)]
mod tests {
    use super::*;

    // {"A": 1}, laid out by hand: dict at 8, key at 11, value at 13, table at 15.
    #[test]
    fn decodes_minimal_fixture() {
        let mut data = Vec::new();
        data.extend_from_slice(b"bplist00");
        data.extend_from_slice(&[0xD1, 0x01, 0x02]);
        data.extend_from_slice(&[0x51, b'A']);
        data.extend_from_slice(&[0x10, 0x01]);
        data.extend_from_slice(&[0x08, 0x0B, 0x0D]);
        data.extend_from_slice(&[0, 0, 0, 0, 0, 0, 1, 1]);
        data.extend_from_slice(&3u64.to_be_bytes());
        data.extend_from_slice(&0u64.to_be_bytes());
        data.extend_from_slice(&15u64.to_be_bytes());

        let value = read(&data).unwrap();
        let mut expected = IndexMap::new();
        expected.insert("A".to_string(), Plist::Integer(1));
        assert_eq!(value, Plist::Dictionary(expected));
    }

    #[test]
    fn decodes_utf16_string_object() {
        let mut data = Vec::new();
        data.extend_from_slice(b"bplist00");
        data.extend_from_slice(&[0x61, 0x00, 0xE9]); // one UTF-16 unit: 'é'
        data.extend_from_slice(&[0x08]);
        data.extend_from_slice(&[0, 0, 0, 0, 0, 0, 1, 1]);
        data.extend_from_slice(&1u64.to_be_bytes());
        data.extend_from_slice(&0u64.to_be_bytes());
        data.extend_from_slice(&11u64.to_be_bytes());

        assert_eq!(read(&data).unwrap(), Plist::String("é".to_string()));
    }

    #[test]
    fn rejects_truncated_document() {
        assert!(read(b"bplist00").is_err());
    }

    #[test]
    fn rejects_offset_table_past_end() {
        let mut data = Vec::new();
        data.extend_from_slice(b"bplist00");
        data.extend_from_slice(&[0x09]); // lone boolean object
        data.extend_from_slice(&[0, 0, 0, 0, 0, 0, 1, 1]);
        data.extend_from_slice(&1u64.to_be_bytes());
        data.extend_from_slice(&0u64.to_be_bytes());
        data.extend_from_slice(&10_000u64.to_be_bytes());
        assert!(read(&data).is_err());
    }
}
