use crate::error::Error;
use crate::plist::Plist;
use crate::stream::MAC_EPOCH;
use chrono::{DateTime, Utc};
use std::io::Write;

// One entry in the flattened object table. Containers hold the indices of
// their children; scalars are serialized in place.
enum Node<'a> {
    Scalar(&'a Plist),
    Key(&'a str),
    Array(Vec<usize>),
    Dict(Vec<usize>, Vec<usize>),
}

pub(crate) struct BinaryWriter<'a> {
    objects: Vec<Node<'a>>,
}

impl<'a> BinaryWriter<'a> {
    pub fn new() -> Self {
        BinaryWriter { objects: Vec::new() }
    }

    pub fn write<W: Write>(mut self, value: &'a Plist, output: &mut W) -> Result<(), Error> {
        self.flatten(value);
        let ref_size = width_for((self.objects.len() - 1) as u64);

        let mut body = Vec::new();
        let mut offsets = Vec::with_capacity(self.objects.len());
        for node in &self.objects {
            offsets.push(MAGIC_LEN + body.len() as u64);
            push_node(node, ref_size, &mut body);
        }
        let table_offset = MAGIC_LEN + body.len() as u64;
        let offset_size = width_for(table_offset);

        let mut table = Vec::with_capacity(offsets.len() * offset_size as usize);
        for offset in &offsets {
            push_sized_uint(*offset, offset_size, &mut table);
        }

        let mut trailer = [0u8; 32];
        trailer[6] = offset_size;
        trailer[7] = ref_size;
        trailer[8..16].copy_from_slice(&(self.objects.len() as u64).to_be_bytes());
        // root object index is 0: the root is flattened first
        trailer[24..32].copy_from_slice(&table_offset.to_be_bytes());

        output.write_all(b"bplist00")?;
        output.write_all(&body)?;
        output.write_all(&table)?;
        output.write_all(&trailer)?;
        Ok(())
    }

    fn flatten(&mut self, value: &'a Plist) -> usize {
        let index = self.objects.len();
        match value {
            Plist::Array(items) => {
                self.objects.push(Node::Array(Vec::new()));
                let refs = items.iter().map(|item| self.flatten(item)).collect();
                self.objects[index] = Node::Array(refs);
            }
            Plist::Dictionary(dict) => {
                self.objects.push(Node::Dict(Vec::new(), Vec::new()));
                let key_refs = dict
                    .keys()
                    .map(|key| {
                        let key_index = self.objects.len();
                        self.objects.push(Node::Key(key.as_str()));
                        key_index
                    })
                    .collect();
                let value_refs = dict.values().map(|item| self.flatten(item)).collect();
                self.objects[index] = Node::Dict(key_refs, value_refs);
            }
            scalar => self.objects.push(Node::Scalar(scalar)),
        }
        index
    }
}

const MAGIC_LEN: u64 = 8;

fn push_node(node: &Node, ref_size: u8, out: &mut Vec<u8>) {
    match node {
        Node::Scalar(value) => push_scalar(value, out),
        Node::Key(key) => push_string(key, out),
        Node::Array(refs) => {
            push_marker(0xA, refs.len(), out);
            for object_ref in refs {
                push_sized_uint(*object_ref as u64, ref_size, out);
            }
        }
        Node::Dict(key_refs, value_refs) => {
            push_marker(0xD, key_refs.len(), out);
            for object_ref in key_refs.iter().chain(value_refs) {
                push_sized_uint(*object_ref as u64, ref_size, out);
            }
        }
    }
}

fn push_scalar(value: &Plist, out: &mut Vec<u8>) {
    match value {
        Plist::Boolean(value) => out.push(if *value { 0x09 } else { 0x08 }),
        Plist::Integer(value) => push_integer(*value, out),
        Plist::Float(value) => push_float(*value, out),
        Plist::String(value) => push_string(value, out),
        Plist::Date(value) => push_date(value, out),
        Plist::Data(value) => {
            push_marker(0x4, value.len(), out);
            out.extend_from_slice(value);
        }
        Plist::Array(_) | Plist::Dictionary(_) => {
            unreachable!("containers are flattened into Array/Dict nodes")
        }
    }
}

fn push_marker(code: u8, len: usize, out: &mut Vec<u8>) {
    if len < 0x0F {
        out.push(code << 4 | len as u8);
    } else {
        out.push(code << 4 | 0x0F);
        push_count(len, out);
    }
}

// A spilled count is encoded as a trailing integer object.
fn push_count(len: usize, out: &mut Vec<u8>) {
    if len <= 0xFF {
        out.push(0x10);
        out.push(len as u8);
    } else if len <= 0xFFFF {
        out.push(0x11);
        out.extend_from_slice(&(len as u16).to_be_bytes());
    } else if len <= 0xFFFF_FFFF {
        out.push(0x12);
        out.extend_from_slice(&(len as u32).to_be_bytes());
    } else {
        out.push(0x13);
        out.extend_from_slice(&(len as u64).to_be_bytes());
    }
}

fn push_integer(value: i64, out: &mut Vec<u8>) {
    if value < 0 {
        // negative integers always take the full 8 bytes
        out.push(0x13);
        out.extend_from_slice(&value.to_be_bytes());
    } else if value <= 0xFF {
        out.push(0x10);
        out.push(value as u8);
    } else if value <= 0xFFFF {
        out.push(0x11);
        out.extend_from_slice(&(value as u16).to_be_bytes());
    } else if value <= 0xFFFF_FFFF {
        out.push(0x12);
        out.extend_from_slice(&(value as u32).to_be_bytes());
    } else {
        out.push(0x13);
        out.extend_from_slice(&value.to_be_bytes());
    }
}

fn push_float(value: f64, out: &mut Vec<u8>) {
    let single = value as f32;
    if f64::from(single) == value {
        out.push(0x22);
        out.extend_from_slice(&single.to_be_bytes());
    } else {
        out.push(0x23);
        out.extend_from_slice(&value.to_be_bytes());
    }
}

fn push_date(value: &DateTime<Utc>, out: &mut Vec<u8>) {
    let unix = value.timestamp() as f64 + f64::from(value.timestamp_subsec_nanos()) / 1e9;
    out.push(0x33);
    out.extend_from_slice(&(unix - MAC_EPOCH).to_be_bytes());
}

fn push_string(value: &str, out: &mut Vec<u8>) {
    if value.is_ascii() {
        push_marker(0x5, value.len(), out);
        out.extend_from_slice(value.as_bytes());
    } else {
        let units: Vec<u16> = value.encode_utf16().collect();
        push_marker(0x6, units.len(), out);
        for unit in units {
            out.extend_from_slice(&unit.to_be_bytes());
        }
    }
}

fn width_for(max: u64) -> u8 {
    if max <= 0xFF {
        1
    } else if max <= 0xFFFF {
        2
    } else if max <= 0xFFFF_FFFF {
        4
    } else {
        8
    }
}

fn push_sized_uint(value: u64, size: u8, out: &mut Vec<u8>) {
    let bytes = value.to_be_bytes();
    out.extend_from_slice(&bytes[8 - size as usize..]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode(value: &Plist) -> Vec<u8> {
        let mut output = Cursor::new(Vec::new());
        BinaryWriter::new().write(value, &mut output).unwrap();
        output.into_inner()
    }

    #[test]
    fn lone_string_layout() {
        let bytes = encode(&Plist::from("A"));
        // magic, one object, one offset entry, trailer
        assert_eq!(bytes.len(), 8 + 2 + 1 + 32);
        assert_eq!(&bytes[8..10], &[0x51, b'A']);
        assert_eq!(bytes[10], 0x08); // offset of the single object
        assert_eq!(&bytes[bytes.len() - 8..], &10u64.to_be_bytes());
    }

    #[test]
    fn small_integer_takes_one_byte() {
        let bytes = encode(&Plist::Integer(7));
        assert_eq!(&bytes[8..10], &[0x10, 0x07]);
    }

    #[test]
    fn long_string_spills_count() {
        let text = "x".repeat(20);
        let bytes = encode(&Plist::from(text.as_str()));
        assert_eq!(&bytes[8..11], &[0x5F, 0x10, 20]);
    }
}
