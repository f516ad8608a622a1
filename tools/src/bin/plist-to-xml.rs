//! Re-encodes data/Info.plist as data/Info.xml.plist.

use assetconv::convert;
use std::path::Path;
use std::process;

fn main() {
    let input = Path::new(convert::PLIST_INPUT);
    let output = Path::new(convert::PLIST_OUTPUT);
    match convert::transcode_plist(input, output) {
        Ok(()) => println!("Converted {} -> {}", convert::PLIST_INPUT, convert::PLIST_OUTPUT),
        Err(err) => {
            eprintln!("Error: {}", err);
            process::exit(1);
        }
    }
}
