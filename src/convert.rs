use crate::error::Error;
use crate::luagen;
use crate::matrix;
use crate::plist::Plist;
use std::fs;
use std::path::Path;

/// Source file holding the numbered color records.
pub const MATRIX_INPUT: &str = "lua/test.lua";
/// Generated Lua module.
pub const MATRIX_OUTPUT: &str = "lua/matrix_color_number.lua";
/// Binary property list consumed by the transcoder.
pub const PLIST_INPUT: &str = "data/Info.plist";
/// XML property list produced by the transcoder.
pub const PLIST_OUTPUT: &str = "data/Info.xml.plist";

/// Runs the whole extraction pipeline: read, extract, render, write.
/// Returns the number of keys that produced a table entry.
pub fn generate_matrix_file(input: &Path, output: &Path) -> Result<usize, Error> {
    let content = fs::read_to_string(input)?;
    let patterns = matrix::extract_patterns(&content);
    let lua = luagen::generate_matrix_table(&patterns);
    ensure_parent(output)?;
    fs::write(output, lua)?;
    Ok(patterns.len())
}

/// Re-encodes a property list as XML. Nothing is written when decoding fails.
pub fn transcode_plist(input: &Path, output: &Path) -> Result<(), Error> {
    let data = fs::read(input)?;
    let value = Plist::from_bytes(&data)?;
    ensure_parent(output)?;
    fs::write(output, value.to_xml())?;
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn generates_matrix_file_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("test.lua");
        let output = dir.path().join("out").join("matrix_color_number.lua");
        fs::write(&input, "1 : 1,2,255\n").unwrap();

        let count = generate_matrix_file(&input, &output).unwrap();
        assert_eq!(count, 1);

        let lua = fs::read_to_string(&output).unwrap();
        assert!(lua.contains("-- number 1"));
        assert!(lua.contains("{x = 1, y = 2, color = 0x0000FF}"));
        assert!(lua.ends_with("return matrix_color_number\n"));
    }

    #[test]
    fn missing_input_creates_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("absent.lua");
        let output = dir.path().join("matrix_color_number.lua");
        assert!(generate_matrix_file(&input, &output).is_err());
        assert!(!output.exists());
    }

    #[test]
    fn transcodes_binary_to_xml() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("Info.plist");
        let output = dir.path().join("Info.xml.plist");

        let mut dict = IndexMap::new();
        dict.insert("Version".to_string(), Plist::Integer(1));
        dict.insert("Name".to_string(), Plist::from("ipadump.com"));
        let value = Plist::Dictionary(dict);
        fs::write(&input, value.to_binary().unwrap()).unwrap();

        transcode_plist(&input, &output).unwrap();
        let xml = fs::read(&output).unwrap();
        assert!(xml.starts_with(b"<?xml"));
        assert_eq!(Plist::from_bytes(&xml).unwrap(), value);
    }

    #[test]
    fn corrupt_input_is_fatal_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("Info.plist");
        let output = dir.path().join("Info.xml.plist");
        fs::write(&input, b"bplist00garbage").unwrap();
        assert!(transcode_plist(&input, &output).is_err());
        assert!(!output.exists());
    }
}
